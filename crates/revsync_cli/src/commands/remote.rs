//! Spawning the command that reaches the remote side.

use super::CliError;
use revsync_engine::Channel;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// A running remote command wrapped as a protocol channel.
pub struct RemoteProcess {
    child: Child,
    channel: Channel<ChildStdout, ChildStdin>,
}

impl RemoteProcess {
    /// Starts `command`, speaking the protocol over its stdin and stdout.
    ///
    /// The command's stderr is inherited so remote diagnostics reach the
    /// user.
    pub fn spawn(command: &[String]) -> Result<Self, CliError> {
        let (program, args) = command.split_first().ok_or_else(|| CliError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;
        tracing::debug!(%program, ?args, "starting remote command");

        let spawn_error = |source| CliError::Spawn {
            command: program.clone(),
            source,
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error)?;

        let missing = || std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe not captured");
        let stdin = child.stdin.take().ok_or_else(|| spawn_error(missing()))?;
        let stdout = child.stdout.take().ok_or_else(|| spawn_error(missing()))?;

        Ok(Self {
            child,
            channel: Channel::new(stdout, stdin),
        })
    }

    /// Returns the protocol channel.
    pub fn channel(&mut self) -> &mut Channel<ChildStdout, ChildStdin> {
        &mut self.channel
    }

    /// Closes the channel and waits for the command to exit.
    pub fn finish(self) -> Result<(), CliError> {
        let Self { mut child, channel } = self;
        // Dropping the pipes lets the remote side see end of input.
        if let Err(e) = channel.into_inner() {
            tracing::debug!(error = %e, "flush on close failed");
        }
        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(CliError::RemoteExit(status))
        }
    }
}
