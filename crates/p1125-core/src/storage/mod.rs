pub mod config;

pub use config::ConfigStorage;

use std::path::PathBuf;

use crate::{Error, Result};

pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("p1125"))
        .ok_or(Error::NoDirectory("config"))
}

pub fn init_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}
