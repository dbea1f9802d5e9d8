use crate::harness::Scenario;

#[test]
fn test_grouped_edits_form_one_revision() {
    Scenario::new("grouped_edits")
        .create_file("f.rs", b"0")
        .begin_change_set()
        .edit_file("f.rs", b"1")
        .edit_file("f.rs", b"2")
        .edit_file("f.rs", b"3")
        .end_change_set("Reformat")
        .assert_revision_names("f.rs", &[Some("Reformat"), None])
        .assert_content("f.rs", b"3")
        .assert_change_set_count(2)
        .run()
        .unwrap();
}

#[test]
fn test_nested_change_sets_commit_once() {
    Scenario::new("nested_change_sets")
        .begin_change_set()
        .create_file("a.txt", b"a")
        .begin_change_set()
        .create_file("b.txt", b"b")
        .end_change_set("Inner")
        .assert_change_set_count(0)
        .end_change_set("Outer")
        .assert_change_set_count(1)
        .assert_revision_names("b.txt", &[Some("Outer")])
        .assert_recent(&["Outer"])
        .run()
        .unwrap();
}

#[test]
fn test_empty_change_set_not_recorded() {
    Scenario::new("empty_change_set")
        .create_file("a.txt", b"a")
        .begin_change_set()
        .end_change_set("Nothing")
        .assert_change_set_count(1)
        .assert_recent(&[])
        .run()
        .unwrap();
}

#[test]
fn test_recent_lists_named_change_sets_newest_first() {
    Scenario::new("recent_named")
        .begin_change_set()
        .create_file("a.txt", b"a")
        .end_change_set("Add a")
        .create_file("unnamed.txt", b"u")
        .global_label("Just a label")
        .begin_change_set()
        .edit_file("a.txt", b"aa")
        .end_change_set("Edit a")
        .assert_recent(&["Edit a", "Add a"])
        .run()
        .unwrap();
}

#[test]
fn test_end_without_begin_fails() {
    let error = Scenario::new("end_without_begin")
        .end_change_set("Orphan")
        .run()
        .unwrap_err();
    assert!(error.contains("no change set in progress"), "{}", error);
}

#[test]
fn test_queries_ignore_open_change_set() {
    Scenario::new("open_change_set_hidden")
        .create_file("a.txt", b"committed")
        .begin_change_set()
        .edit_file("a.txt", b"pending")
        .assert_content("a.txt", b"committed")
        .assert_revision_count("a.txt", 1)
        .end_unnamed_change_set()
        .assert_content("a.txt", b"pending")
        .assert_revision_count("a.txt", 2)
        .run()
        .unwrap();
}
