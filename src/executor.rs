use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::{io::AsyncWriteExt, process::Command};

/// Runs a command line and hands back what it printed.
///
/// Implementations return standard output with trailing whitespace trimmed,
/// and fail when the process cannot be started or exits non-zero. Output of a
/// failed process is never returned.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `argv`, writing `stdin` (if any) to the child before waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the command can't be spawned, exits with a
    /// non-zero status, or prints non-UTF-8 output.
    async fn execute(&self, argv: &[&str], stdin: Option<&str>) -> Result<String>;
}

/// Executor backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

#[async_trait]
impl CommandExecutor for TokioExecutor {
    async fn execute(&self, argv: &[&str], stdin: Option<&str>) -> Result<String> {
        let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;
        let command = argv.join(" ");
        tracing::debug!(%command, piped = stdin.is_some(), "executing");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::CommandSpawn {
                command: command.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|source| Error::CommandStdin {
                    command: command.clone(),
                    source,
                })?;
            // Dropping the handle closes the child's stdin
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| Error::CommandSpawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            tracing::warn!(%command, status = %output.status, %stderr, "command failed");
            return Err(Error::CommandFailed {
                command,
                status: output.status,
                stderr,
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|source| Error::CommandUtf8 {
                command: command.clone(),
                source,
            })?;
        tracing::trace!(%command, %stdout, "command output");
        Ok(stdout.trim_end().to_owned())
    }
}
