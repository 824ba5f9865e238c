//! revsync CLI
//!
//! Replicates git-style object graphs between two machines over any
//! bidirectional pipe, usually `ssh host revsync serve`.
//!
//! # Commands
//!
//! - `get` - Pull revisions of one remote repository into `--repo`
//! - `put` - Push revisions of `--repo` to one remote repository
//! - `sync` - Exchange every repository under two roots in both directions
//! - `serve` - Act as the remote end on stdin/stdout
//! - `scan` - Print the reachable roots of a repository
//! - `discover` - Print the repositories under a directory

mod commands;

use clap::{Parser, Subcommand};
use commands::Options;
use revsync_engine::DEFAULT_REPOSITORY_SUFFIX;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Efficient replication of object graphs over a pipe.
#[derive(Parser)]
#[command(name = "revsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Local repository for get and put
    #[arg(global = true, long, default_value = ".")]
    repo: PathBuf,

    /// Send every missing object instead of a thin slice
    #[arg(global = true, long)]
    full: bool,

    /// Show pack progress on stderr
    #[arg(global = true, long)]
    progress: bool,

    /// Directory suffix that marks a repository
    #[arg(global = true, long, default_value = DEFAULT_REPOSITORY_SUFFIX)]
    suffix: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull revisions from a remote repository
    Get {
        /// Repository directory on the remote side
        remote_dir: String,

        /// Revisions to pull, resolved remotely
        #[arg(required = true)]
        revs: Vec<String>,

        /// Command that reaches `revsync serve`
        #[arg(last = true, required = true)]
        remote: Vec<String>,
    },

    /// Push revisions to a remote repository
    Put {
        /// Repository directory on the remote side
        remote_dir: String,

        /// Revisions to push, resolved locally
        #[arg(required = true)]
        revs: Vec<String>,

        /// Command that reaches `revsync serve`
        #[arg(last = true, required = true)]
        remote: Vec<String>,
    },

    /// Sync every repository under two roots
    Sync {
        /// Local directory holding repositories
        local_root: PathBuf,

        /// Remote directory holding repositories
        remote_root: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Command that reaches `revsync serve`
        #[arg(last = true, required = true)]
        remote: Vec<String>,
    },

    /// Serve one session on stdin/stdout
    Serve,

    /// Print the reachable roots of a repository
    Scan {
        /// Repository directory
        repo: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the repositories under a directory
    Discover {
        /// Directory to search
        root: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout may carry the protocol, so logs go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = Options {
        full: cli.full,
        progress: cli.progress,
        suffix: cli.suffix,
    };

    match cli.command {
        Commands::Get {
            remote_dir,
            revs,
            remote,
        } => commands::fetch::get(&options, &cli.repo, &remote_dir, &revs, &remote)?,
        Commands::Put {
            remote_dir,
            revs,
            remote,
        } => commands::fetch::put(&options, &cli.repo, &remote_dir, &revs, &remote)?,
        Commands::Sync {
            local_root,
            remote_root,
            format,
            remote,
        } => commands::sync::run(&options, &local_root, &remote_root, &remote, &format)?,
        Commands::Serve => commands::serve::run(&options)?,
        Commands::Scan { repo, format } => commands::scan::run(&repo, &format)?,
        Commands::Discover { root, format } => commands::discover::run(&options, &root, &format)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn remote_command_follows_double_dash() {
        let cli = Cli::try_parse_from([
            "revsync", "get", "/srv/r.git", "main", "v1", "--", "ssh", "host", "revsync", "serve",
        ])
        .unwrap();
        match cli.command {
            Commands::Get {
                remote_dir,
                revs,
                remote,
            } => {
                assert_eq!(remote_dir, "/srv/r.git");
                assert_eq!(revs, vec!["main", "v1"]);
                assert_eq!(remote, vec!["ssh", "host", "revsync", "serve"]);
            }
            _ => panic!("expected get"),
        }
        assert_eq!(cli.repo, PathBuf::from("."));
        assert!(!cli.full);
    }

    #[test]
    fn remote_command_is_required() {
        assert!(Cli::try_parse_from(["revsync", "put", "/srv/r.git", "main"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "revsync", "sync", "/a", "/b", "--full", "--suffix", ".repo", "-v", "--", "cat",
        ])
        .unwrap();
        assert!(cli.full);
        assert!(cli.verbose);
        assert_eq!(cli.suffix, ".repo");
        assert!(matches!(cli.command, Commands::Sync { .. }));
    }
}
