//! Config Command
//!
//! Usage:
//!   unitforge config show [-g] [-f json]
//!   unitforge config path
//!   unitforge config init [-g] [--force]

use std::path::Path;

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged configuration, or the raw global file with `global`
pub fn show(config_path: Option<&Path>, global: bool, format: &str) -> Result<()> {
    if global {
        match ConfigLoader::global_config_path() {
            Some(path) if path.exists() => {
                println!("# Global Config: {}\n", path.display());
                println!("{}", std::fs::read_to_string(&path)?);
            }
            Some(_) => {
                println!("No global config found.");
                println!("Run 'unitforge config init --global' to create one.");
            }
            None => println!("Cannot determine global config directory."),
        }
        return Ok(());
    }

    let config = ConfigLoader::load_with(config_path)?;
    ConfigLoader::show_config(&config, format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();
    if global {
        let path = ConfigLoader::init_global(force)?;
        output.success("Initialized global configuration");
        println!("  Config: {}", path.display());
    } else {
        let root = std::env::current_dir()?;
        let path = ConfigLoader::init_project(&root, force)?;
        output.success("Initialized project configuration");
        println!("  Config: {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Build the project so target/classes exists");
        println!("  2. Run the structural extractor into .unitforge/parse");
        println!("  3. Run 'unitforge class <NAME>' or 'unitforge project'");
    }
    Ok(())
}
