use std::time::Duration;

use super::assertions::Assertion;

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // Workspace actions (recorded like a filesystem watcher would)
    ImportWorkspace {
        name: String,
    },
    CreateFile {
        path: String,
        content: Vec<u8>,
    },
    EditFile {
        path: String,
        content: Vec<u8>,
    },
    CreateDirectory {
        path: String,
    },
    Delete {
        path: String,
    },
    Rename {
        path: String,
        new_name: String,
    },
    Move {
        path: String,
        new_parent: String,
    },

    // Grouping
    BeginChangeSet,
    EndChangeSet {
        name: Option<String>,
    },

    // Labels
    Label {
        path: Option<String>,
        name: String,
    },
    SystemLabel {
        name: String,
    },

    // Maintenance
    Save,
    Purge {
        older_than: Duration,
    },
    PurgeWithConfig,

    // Time control
    Wait {
        duration: Duration,
    },
    WaitHours {
        hours: u64,
    },
    WaitDays {
        days: u64,
    },
    /// Remember the current clock value under a name
    Mark {
        name: String,
    },

    // Failure simulation
    Crash,
    Restart,

    // Assertions (can be interspersed)
    Assert {
        assertion: Assertion,
    },
}
