pub mod file;
pub mod memory;

use std::path;

use crate::domain::models::SessionStoreBox;

pub struct SessionStoreManager {}

impl SessionStoreManager {
    /// Persists to `dir` when one is configured, otherwise keeps the session
    /// id in memory for the lifetime of the process.
    pub fn get(dir: &str) -> SessionStoreBox {
        if dir.trim().is_empty() {
            tracing::debug!("No session directory configured, session ids will not persist");
            return Box::<memory::MemorySessionStore>::default();
        }

        return Box::new(file::FileSessionStore::new(path::PathBuf::from(dir)));
    }
}
