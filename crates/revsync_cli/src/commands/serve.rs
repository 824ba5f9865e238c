//! `serve`: the remote end of a session on stdin/stdout.

use super::{CliError, Options};
use revsync_engine::Channel;
use std::io;

/// Serves one session on the process's standard streams.
pub fn run(options: &Options) -> Result<(), CliError> {
    let mut channel = Channel::new(io::stdin().lock(), io::stdout().lock());
    let config = options.sync_config();
    revsync_engine::serve(&mut channel, &config, options.opener())?;
    channel.flush()?;
    Ok(())
}
