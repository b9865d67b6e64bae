//! Config management CLI commands.

use crate::config::Config;
use anyhow::Result;

/// Show current configuration
pub async fn show() -> Result<()> {
    let config = Config::load().await?;

    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

/// Show configuration file path
pub async fn path() -> Result<()> {
    if let Some(global_path) = Config::global_config_path() {
        println!("Global config: {}", global_path.display());
    }

    if let Some(global_dir) = Config::global_config_dir() {
        println!("Config directory: {}", global_dir.display());
    }

    let cwd = std::env::current_dir()?;
    match Config::find_project_config(&cwd) {
        Some(project) => println!("Project config: {}", project.display()),
        None => println!("No project config found from {}", cwd.display()),
    }

    Ok(())
}

/// Initialize configuration file with defaults
pub async fn init() -> Result<()> {
    let config_path = Config::init().await?;
    println!(
        "Created default configuration file at: {}",
        config_path.display()
    );
    println!("\nAdjust reveal delays, think delimiters and the highlight theme there.");

    Ok(())
}
