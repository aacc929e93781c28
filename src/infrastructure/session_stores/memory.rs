#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::models::SessionStore;

/// Keeps the session id for the life of the process. Clones share the same
/// value.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    session_id: Arc<RwLock<Option<String>>>,
}

impl MemorySessionStore {
    pub fn with_session_id(session_id: &str) -> MemorySessionStore {
        return MemorySessionStore {
            session_id: Arc::new(RwLock::new(Some(session_id.to_string()))),
        };
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self) -> Result<Option<String>> {
        return Ok(self.session_id.read().await.clone());
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, session_id: &str) -> Result<()> {
        *self.session_id.write().await = Some(session_id.to_string());
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn clear(&self) -> Result<()> {
        *self.session_id.write().await = None;
        return Ok(());
    }
}
