use std::io;
use std::time::Duration;

/// Failure of a single tracker invocation
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("timed out after {}s (failed to connect to server or slot)", .after.as_secs_f32())]
    Timeout {
        after: Duration,
        /// Whatever the tool wrote to stderr before it was killed
        stderr: String,
    },

    #[error("failed to start tracker process")]
    Spawn(#[source] io::Error),

    #[error("tracker process I/O failed")]
    Io(#[source] io::Error),

    #[error("cancelled because another slot failed")]
    Cancelled,
}

impl RunError {
    /// Captured stderr, if the failure carries any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Timeout { stderr, .. } if !stderr.trim().is_empty() => Some(stderr),
            _ => None,
        }
    }
}

/// Failure of a whole batch query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("could not find Archipelago Launcher")]
    LauncherNotFound,

    #[error("query for slot '{slot}' failed")]
    Slot {
        slot: String,
        #[source]
        source: RunError,
    },

    #[error("slot task failed")]
    Task(#[source] tokio::task::JoinError),
}
