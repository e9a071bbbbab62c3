use std::path::PathBuf;

use directories::ProjectDirs;

pub mod config;

pub use config::Config;

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "bulbai";
const APP_NAME: &str = "bulb";
const DB_FILENAME: &str = "bulb.sqlite3";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("invalid {name}={value:?}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// App-local user data directory (for durable application state).
pub fn user_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .ok_or(Error::MissingUserDataDir)?;
    Ok(dirs.data_local_dir().to_path_buf())
}

pub fn ensure_user_data_dir() -> Result<PathBuf> {
    let dir = user_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default location of the projects/messages/files database.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(ensure_user_data_dir()?.join(DB_FILENAME))
}
