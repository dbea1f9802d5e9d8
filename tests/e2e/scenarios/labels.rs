use crate::harness::{Assertion, Scenario};
use lh_core::{LabelKind, RevisionCause};

#[test]
fn test_global_label_appears_in_every_history() {
    Scenario::new("global_label")
        .create_file("a.txt", b"a")
        .create_file("b.txt", b"b")
        .global_label("Checkpoint")
        .edit_file("a.txt", b"a2")
        .assert_revision_names("a.txt", &[None, Some("Checkpoint"), None])
        .assert_revision_names("b.txt", &[Some("Checkpoint"), None])
        .run()
        .unwrap();
}

#[test]
fn test_path_label_covers_subtree_only() {
    Scenario::new("path_label")
        .create_file("d/x.txt", b"x")
        .create_file("y.txt", b"y")
        .label("d", "Before refactor")
        .assert_revision_names("d/x.txt", &[Some("Before refactor"), None])
        .assert_revision_names("y.txt", &[None])
        .run()
        .unwrap();
}

#[test]
fn test_label_follows_renamed_entry() {
    Scenario::new("label_follows_rename")
        .create_file("old.txt", b"content")
        .label("old.txt", "Stable")
        .rename("old.txt", "new.txt")
        .assert_revision_names("new.txt", &[None, Some("Stable"), None])
        .run()
        .unwrap();
}

#[test]
fn test_content_at_system_label() {
    Scenario::new("content_at_label")
        .create_file("f.txt", b"v1")
        .wait_hours(1)
        .mark("build")
        .system_label("Build")
        .wait_hours(1)
        .edit_file("f.txt", b"v2")
        .assert_content_at("f.txt", "build", Some(b"v1"))
        .assert_content("f.txt", b"v2")
        .assert(Assertion::Custom(Box::new(|history| {
            let revisions = history.revisions_for("f.txt")?;
            assert_eq!(
                revisions[1].cause(),
                RevisionCause::Label {
                    kind: LabelKind::System
                }
            );
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_content_before_first_revision_unavailable() {
    Scenario::new("content_before_creation")
        .mark("before")
        .wait_hours(1)
        .create_file("f.txt", b"v1")
        .assert_content_at("f.txt", "before", None)
        .run()
        .unwrap();
}
