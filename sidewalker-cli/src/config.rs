use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sidewalker_core::prelude::NetworkConfig;

/// Reads and validates the configuration file, or the defaults without one.
pub fn load(path: Option<&Path>) -> Result<NetworkConfig> {
    let Some(path) = path else {
        return Ok(NetworkConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    parse(&text).with_context(|| format!("Invalid configuration {}", path.display()))
}

fn parse(text: &str) -> Result<NetworkConfig> {
    let config: NetworkConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}
