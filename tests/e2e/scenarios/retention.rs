use crate::harness::{Assertion, Scenario};
use lh_core::RevisionCause;

#[test]
fn test_purge_folds_old_revisions() {
    Scenario::new("purge_folds_old")
        .create_file("f.txt", b"v1")
        .edit_file("f.txt", b"v2")
        .wait_days(10)
        .mark("recent")
        .edit_file("f.txt", b"v3")
        .purge_days(5)
        .assert_change_set_count(1)
        .assert_content("f.txt", b"v3")
        .assert_revision_count("f.txt", 2)
        .assert(Assertion::Custom(Box::new(|history| {
            let revisions = history.revisions_for("f.txt")?;
            assert_eq!(revisions[1].cause(), RevisionCause::Base);
            // The folded state keeps the newest dropped content only
            let oldest = history.byte_content("f.txt", |t: i64| t == revisions[1].timestamp())?;
            assert_eq!(oldest.as_deref(), Some(&b"v2"[..]));
            Ok(())
        })))
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_purge_with_default_retention() {
    Scenario::new("purge_default_retention")
        .create_file("old.txt", b"old")
        .wait_days(3)
        .create_file("mid.txt", b"mid")
        .wait_days(3)
        .create_file("new.txt", b"new")
        // Retention is 5 days: only the first change set is older
        .purge()
        .assert_change_set_count(2)
        .assert_exists("old.txt")
        .assert_revision_names("old.txt", &[None])
        .assert_revision_count("mid.txt", 1)
        .run()
        .unwrap();
}

#[test]
fn test_purge_is_idempotent() {
    Scenario::new("purge_idempotent")
        .create_file("a.txt", b"a")
        .edit_file("a.txt", b"b")
        .wait_days(10)
        .purge_days(5)
        .assert_change_set_count(0)
        .purge_days(5)
        .assert_change_set_count(0)
        .assert_content("a.txt", b"b")
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_retained_label_keeps_content() {
    Scenario::new("label_retains_content")
        .create_file("f.txt", b"v1")
        .wait_days(3)
        .mark("label")
        .global_label("Release")
        .wait_days(3)
        .edit_file("f.txt", b"v2")
        // Horizon falls between creation and label
        .purge_days(4)
        .assert_content_at("f.txt", "label", Some(b"v1"))
        .assert_content("f.txt", b"v2")
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_purge_survives_restart() {
    Scenario::new("purge_persists")
        .create_file("f.txt", b"v1")
        .edit_file("f.txt", b"v2")
        .wait_days(10)
        .edit_file("f.txt", b"v3")
        .purge_days(5)
        .save()
        .crash()
        .restart()
        .assert_change_set_count(1)
        .assert_content("f.txt", b"v3")
        .assert_revision_count("f.txt", 2)
        .assert_verify_clean()
        .run()
        .unwrap();
}
