use std::process::Stdio;

use async_trait::async_trait;

use crate::domain::ports::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Cap on captured output per stream; journal scans are the largest producer.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Runs external programs with `tokio::process`, killing them on timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

fn bounded(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_OUTPUT_BYTES)]).into_owned()
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %spec.display(), "spawning");
        let output = tokio::time::timeout(
            spec.timeout,
            tokio::process::Command::new(&spec.program)
                .args(&spec.args)
                .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CommandError::Timeout {
            program: spec.program.clone(),
            secs: spec.timeout.as_secs(),
        })?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound(spec.program.clone())
            } else {
                CommandError::SpawnFailed {
                    program: spec.program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: bounded(&output.stdout),
            stderr: bounded(&output.stderr),
        })
    }
}
