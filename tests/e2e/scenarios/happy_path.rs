use crate::harness::{Assertion, Scenario};

#[test]
fn test_create_edit_and_read_back() {
    Scenario::new("create_edit_read")
        .create_file("notes.txt", b"first draft")
        .edit_file("notes.txt", b"second draft")
        .assert_exists("notes.txt")
        .assert_content("notes.txt", b"second draft")
        .assert_revision_count("notes.txt", 2)
        .assert_change_set_count(2)
        .run()
        .unwrap();
}

#[test]
fn test_rename_and_move_keep_history() {
    Scenario::new("rename_and_move")
        .create_directory("src")
        .create_file("src/a.rs", b"fn a() {}")
        .create_directory("lib")
        .move_entry("src/a.rs", "lib")
        .rename("lib/a.rs", "b.rs")
        .assert_exists("lib/b.rs")
        .assert_missing("src/a.rs")
        .assert_missing("lib/a.rs")
        .assert_content("lib/b.rs", b"fn a() {}")
        // create, move, rename
        .assert_revision_count("lib/b.rs", 3)
        .run()
        .unwrap();
}

#[test]
fn test_delete_removes_subtree() {
    Scenario::new("delete_subtree")
        .create_file("docs/guide.md", b"# Guide")
        .create_file("docs/api.md", b"# API")
        .delete("docs")
        .assert_missing("docs")
        .assert_missing("docs/guide.md")
        .assert_revision_count("docs/guide.md", 0)
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_recreated_path_has_fresh_history() {
    Scenario::new("recreated_path")
        .create_file("a.txt", b"old")
        .edit_file("a.txt", b"older")
        .delete("a.txt")
        .create_file("a.txt", b"new")
        .assert_content("a.txt", b"new")
        .assert_revision_count("a.txt", 1)
        .run()
        .unwrap();
}

#[test]
fn test_fixture_import() {
    Scenario::new("fixture_import")
        .from_fixture("default")
        .import_workspace("Import")
        .assert_exists("Cargo.toml")
        .assert_exists("src")
        .assert_content(
            "src/main.rs",
            b"fn main() {\n    println!(\"Hello, world!\");\n}\n",
        )
        .assert_content(
            "README.md",
            b"# Test Project\n\nThis is a default fixture for local history e2e tests.\n",
        )
        .assert_revision_names("src/main.rs", &[Some("Import")])
        .assert_recent(&["Import"])
        .assert_change_set_count(1)
        .run()
        .unwrap();
}

#[test]
fn test_invalid_operations_fail() {
    let error = Scenario::new("rename_missing")
        .rename("missing.txt", "other.txt")
        .run()
        .unwrap_err();
    assert!(error.contains("entry not found"), "{}", error);

    let error = Scenario::new("duplicate_create")
        .create_file("a.txt", b"1")
        .create_file("a.txt", b"2")
        .run()
        .unwrap_err();
    assert!(error.contains("already exists"), "{}", error);
}

#[test]
fn test_move_into_own_subtree_rejected() {
    Scenario::new("move_into_self")
        .create_directory("a")
        .create_directory("a/b")
        .assert(Assertion::Custom(Box::new(|history| {
            assert!(history.move_entry("a", "a/b").is_err());
            assert!(history.has_entry("a/b"));
            assert_eq!(history.change_list().len(), 2);
            Ok(())
        })))
        .run()
        .unwrap();
}
