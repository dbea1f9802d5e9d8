use crate::harness::{Assertion, Scenario};

#[test]
fn test_saved_changes_survive_crash() {
    Scenario::new("saved_survives")
        .create_file("a.txt", b"a1")
        .edit_file("a.txt", b"a2")
        .save()
        .assert(Assertion::Dirty(false))
        .crash()
        .restart()
        .assert_content("a.txt", b"a2")
        .assert_revision_count("a.txt", 2)
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_unsaved_changes_lost_on_crash() {
    Scenario::new("unsaved_lost")
        .create_file("saved.txt", b"saved")
        .save()
        .create_file("lost.txt", b"lost")
        .assert(Assertion::Dirty(true))
        .crash()
        .restart()
        .assert_exists("saved.txt")
        .assert_missing("lost.txt")
        .assert_change_set_count(1)
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_open_change_set_lost_on_crash() {
    Scenario::new("open_change_set_lost")
        .create_file("a.txt", b"a")
        .save()
        .begin_change_set()
        .edit_file("a.txt", b"pending")
        .create_file("b.txt", b"b")
        .crash()
        .restart()
        .assert_content("a.txt", b"a")
        .assert_missing("b.txt")
        .run()
        .unwrap();
}

#[test]
fn test_history_identical_after_restart() {
    Scenario::new("identical_after_restart")
        .create_file("src/lib.rs", b"pub fn one() {}")
        .label("src", "Stable")
        .begin_change_set()
        .edit_file("src/lib.rs", b"pub fn two() {}")
        .rename("src/lib.rs", "main.rs")
        .end_change_set("Refactor")
        .save()
        .crash()
        .restart()
        .assert_revision_names("src/main.rs", &[Some("Refactor"), Some("Stable"), None])
        .assert_recent(&["Refactor"])
        .assert_content("src/main.rs", b"pub fn two() {}")
        .run()
        .unwrap();
}

#[test]
fn test_ids_continue_after_restart() {
    Scenario::new("ids_continue")
        .create_file("a.txt", b"a")
        .save()
        .crash()
        .restart()
        .create_file("b.txt", b"b")
        .assert(Assertion::Custom(Box::new(|history| {
            let a = history.get_entry("a.txt")?.id();
            let b = history.get_entry("b.txt")?.id();
            assert!(b > a);
            let sets = history.change_list().change_sets();
            assert!(sets[1].id() > sets[0].id());
            Ok(())
        })))
        .save()
        .crash()
        .restart()
        .assert_content("a.txt", b"a")
        .assert_content("b.txt", b"b")
        .assert_verify_clean()
        .run()
        .unwrap();
}

#[test]
fn test_close_releases_lock() {
    Scenario::new("close_releases_lock")
        .create_file("a.txt", b"a")
        .assert(Assertion::Custom(Box::new(|history| {
            assert!(lh_core::LocalHistory::open(history.root()).is_err());
            history.save()?;
            history.close()?;
            history.close()?;
            let reopened = lh_core::LocalHistory::open(history.root())?;
            assert!(reopened.has_entry("a.txt"));
            Ok(())
        })))
        .run()
        .unwrap();
}
