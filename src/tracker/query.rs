use std::path::{Path, PathBuf};

/// Name of the launcher component that lists unchecked locations
const TRACKER_COMPONENT: &str = "Universal Tracker";

/// A program plus its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TrackerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// One slot's query against the shared server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub server: String,
    pub slot_name: String,
    pub credential: Option<String>,
    pub launcher_path: PathBuf,
}

impl SlotQuery {
    pub fn new(
        server: &str,
        slot_name: &str,
        credential: Option<&str>,
        launcher_path: &Path,
    ) -> Self {
        Self {
            server: server.to_string(),
            slot_name: slot_name.to_string(),
            credential: credential.filter(|c| !c.is_empty()).map(str::to_string),
            launcher_path: launcher_path.to_path_buf(),
        }
    }

    /// Build the launcher invocation for this slot
    pub fn command(&self) -> TrackerCommand {
        let mut command = TrackerCommand::new(&self.launcher_path)
            .arg(TRACKER_COMPONENT)
            .arg("--")
            .arg(format!("--connect={}", self.server))
            .arg("--nogui")
            .arg("--list");

        if let Some(password) = &self.credential {
            command = command.arg(format!("--password={}", password));
        }

        command.arg(format!("--name={}", self.slot_name))
    }
}
