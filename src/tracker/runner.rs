use std::collections::HashSet;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::query::TrackerCommand;
use crate::error::RunError;

/// Default per-slot deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Lines the tracker prints that are not locations
pub const DEFAULT_FILTER_LINES: &[&str] = &["found cached multiworld!"];

/// Set of output lines to suppress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseFilter {
    lines: HashSet<String>,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::from_lines(DEFAULT_FILTER_LINES.iter().copied())
    }
}

impl NoiseFilter {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_noise(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    /// Drop the banner line and every noise line, keeping order
    pub fn filter(&self, stdout: &str) -> Vec<String> {
        stdout
            .lines()
            .skip(1)
            .filter(|line| !self.is_noise(line))
            .map(str::to_string)
            .collect()
    }
}

/// Runs one tracker invocation with a deadline
#[derive(Debug, Clone)]
pub struct TrackerRunner {
    timeout: Duration,
    filter: Arc<NoiseFilter>,
}

impl Default for TrackerRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, NoiseFilter::default())
    }
}

/// How the wait on a child ended
enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Kill the child and wait for it, so nothing is left running
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to kill tracker process: {}", e);
    }
}

impl TrackerRunner {
    pub fn new(timeout: Duration, filter: NoiseFilter) -> Self {
        Self {
            timeout,
            filter: Arc::new(filter),
        }
    }

    /// Run the command and return its filtered stdout lines.
    ///
    /// The exit status is not inspected. If the deadline passes or `cancel`
    /// fires first, the child is killed and reaped before the error is
    /// returned. Dropping the returned future still sends a kill.
    pub async fn run(
        &self,
        command: &TrackerCommand,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RunError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RunError::Spawn)?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunError::Io(std::io::Error::other("stdout not captured")))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunError::Io(std::io::Error::other("stderr not captured")))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let outcome = tokio::select! {
            completed = tokio::time::timeout(self.timeout, async {
                let (out, err, status) = tokio::join!(
                    stdout.read_to_end(&mut stdout_buf),
                    stderr.read_to_end(&mut stderr_buf),
                    child.wait(),
                );
                out.and(err).and(status)
            }) => match completed {
                Ok(status) => Outcome::Exited(status),
                Err(_) => Outcome::TimedOut,
            },
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(status) => status.map_err(RunError::Io)?,
            Outcome::TimedOut => {
                terminate(&mut child).await;
                return Err(RunError::Timeout {
                    after: self.timeout,
                    stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
                });
            }
            Outcome::Cancelled => {
                debug!("cancelling {}", command.program.display());
                terminate(&mut child).await;
                return Err(RunError::Cancelled);
            }
        };

        let stderr_text = String::from_utf8_lossy(&stderr_buf);
        if !status.success() {
            warn!(
                "tracker exited with {:?}, keeping its output",
                status.code()
            );
        }
        if !stderr_text.trim().is_empty() {
            debug!("tracker stderr: {}", stderr_text.trim_end());
        }

        Ok(self.filter.filter(&String::from_utf8_lossy(&stdout_buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> TrackerCommand {
        TrackerCommand::new("sh").arg("-c").arg(script)
    }

    // ========================================
    // NoiseFilter Tests
    // ========================================

    #[test]
    fn test_filter_drops_banner_only() {
        let filter = NoiseFilter::default();
        let items = filter.filter("BANNER\nChest A\nChest B\n");
        assert_eq!(items, vec!["Chest A", "Chest B"]);
    }

    #[test]
    fn test_filter_removes_noise_anywhere() {
        let filter = NoiseFilter::default();
        let items = filter.filter(
            "BANNER\nfound cached multiworld!\nChest A\nfound cached multiworld!\nChest B",
        );
        assert_eq!(items, vec!["Chest A", "Chest B"]);
    }

    #[test]
    fn test_filter_matches_exact_lines_only() {
        let filter = NoiseFilter::default();
        let items = filter.filter("BANNER\nfound cached multiworld! (again)\n");
        assert_eq!(items, vec!["found cached multiworld! (again)"]);
    }

    #[test]
    fn test_filter_handles_crlf() {
        let filter = NoiseFilter::default();
        let items = filter.filter("BANNER\r\nfound cached multiworld!\r\nDoor C\r\n");
        assert_eq!(items, vec!["Door C"]);
    }

    #[test]
    fn test_filter_empty_output() {
        let filter = NoiseFilter::default();
        assert!(filter.filter("").is_empty());
        assert!(filter.filter("BANNER").is_empty());
    }

    #[test]
    fn test_custom_filter_set() {
        let filter = NoiseFilter::from_lines(["noise"]);
        let items = filter.filter("BANNER\nnoise\nfound cached multiworld!\n");
        assert_eq!(items, vec!["found cached multiworld!"]);
    }

    // ========================================
    // TrackerRunner Tests
    // ========================================

    #[tokio::test]
    async fn test_run_filters_output() {
        let runner = TrackerRunner::default();
        let items = runner
            .run(
                &sh("printf 'BANNER\\nfound cached multiworld!\\nChest A\\nChest B\\n'"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(items, vec!["Chest A", "Chest B"]);
    }

    #[tokio::test]
    async fn test_run_ignores_exit_code() {
        let runner = TrackerRunner::default();
        let items = runner
            .run(
                &sh("echo BANNER; echo 'Door C'; echo oops >&2; exit 3"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(items, vec!["Door C"]);
    }

    #[tokio::test]
    async fn test_run_spawn_failure() {
        let runner = TrackerRunner::default();
        let result = runner
            .run(
                &TrackerCommand::new("/nonexistent/ArchipelagoLauncher"),
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(RunError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_run_times_out_despite_output() {
        let runner = TrackerRunner::new(Duration::from_millis(300), NoiseFilter::default());
        let started = Instant::now();
        let result = runner
            .run(
                &sh("echo BANNER; echo 'Chest A'; echo waiting >&2; exec sleep 30"),
                &CancellationToken::new(),
            )
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        match result {
            Err(RunError::Timeout { after, stderr }) => {
                assert_eq!(after, Duration::from_millis(300));
                assert!(stderr.contains("waiting"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_cancel_kills_and_reaps_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("child.pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());

        let runner = TrackerRunner::new(Duration::from_secs(30), NoiseFilter::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watched = pid_file.clone();
        tokio::spawn(async move {
            while !watched.exists() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = runner.run(&sh(&script), &cancel).await;

        assert!(matches!(result, Err(RunError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[tokio::test]
    async fn test_run_already_cancelled_token() {
        let runner = TrackerRunner::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = runner.run(&sh("exec sleep 30"), &cancel).await;
        assert!(matches!(result, Err(RunError::Cancelled)));
    }
}
