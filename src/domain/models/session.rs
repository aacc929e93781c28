use anyhow::Result;
use async_trait::async_trait;

/// Durable home of the conversation session identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>>;

    async fn set(&self, session_id: &str) -> Result<()>;

    /// The only removal path, used when starting a new chat.
    async fn clear(&self) -> Result<()>;
}

pub type SessionStoreBox = Box<dyn SessionStore>;
