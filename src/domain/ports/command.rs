use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("binary not found: {0}")]
    NotFound(String),
    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("failed to run {program}: {reason}")]
    SpawnFailed { program: String, reason: String },
}

/// An external program invocation with a hard deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl CommandSpec {
    #[must_use]
    pub fn new<I, S>(program: &str, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// `program arg1 arg2`, for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Trimmed stdout.
    #[must_use]
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion or until its timeout.
    ///
    /// A non-zero exit is not an error; callers inspect [`CommandOutput`].
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if the binary is missing, cannot be spawned,
    /// or exceeds its timeout.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}
