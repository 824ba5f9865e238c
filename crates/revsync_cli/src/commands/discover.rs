//! `discover`: the repositories under a directory.

use super::{CliError, Options};
use revsync_engine::discover_repositories;
use std::path::Path;

/// Prints repository names relative to `root`.
pub fn run(options: &Options, root: &Path, format: &str) -> Result<(), CliError> {
    let names = discover_repositories(root, &options.suffix)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&names)?),
        _ => {
            for name in &names {
                println!("{name}");
            }
        }
    }
    Ok(())
}
