//! Init command - initialize configuration file.

use tilestash::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run() -> Result<(), CliError> {
    let existed = config_file_path().exists();
    let path = ConfigFile::ensure_exists()?;

    if existed {
        println!("Configuration file already exists: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Edit this file to customize TileStash settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
