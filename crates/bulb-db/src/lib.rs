mod database;
pub mod error;
pub mod files;
pub mod messages;
mod migration;
pub mod models;
pub mod projects;
pub mod store;

pub use error::{Error, Result};
pub use files::Files;
pub use messages::Messages;
pub use models::{NewMessage, Project, StoredFile, StoredMessage};
pub use projects::Projects;
pub use store::Store;
