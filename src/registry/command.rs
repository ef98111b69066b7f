//! External package-manager processes
//!
//! Backends that shell out (`yarn info`, `npm ls -g`) go through the
//! [`CommandRunner`] trait so tests can substitute canned output.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Create a successful output
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failed output
    pub fn failure(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Trait for running package manager commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` in `working_dir` and capture its output
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<CommandOutput>;
}

/// Default runner that executes real commands
///
/// Each call spawns its own process with its own working directory, so one
/// runner can serve concurrent queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    /// Create a new system command runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<CommandOutput> {
        debug!(program, ?args, dir = %working_dir.display(), "spawning");
        // kill_on_drop ties the child's lifetime to the future, so an aborted
        // query does not leave the process behind
        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        let output = CommandOutput::success("ok");
        assert!(output.success);
        assert_eq!(output.stdout, "ok");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_command_output_failure() {
        let output = CommandOutput::failure("", "boom");
        assert!(!output.success);
        assert_eq!(output.stderr, "boom");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemCommandRunner::new();
        let dir = tempfile::tempdir().unwrap();
        let result = runner
            .run("bumpscout-definitely-not-a-program", &[], dir.path())
            .await;
        assert!(result.is_err());
    }
}
