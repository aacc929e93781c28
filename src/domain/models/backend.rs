use std::io;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_derive::Deserialize;
use serde_derive::Serialize;

/// Raw response body, chunked however the transport delivered it.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: &str, session_id: Option<String>) -> ChatRequest {
        return ChatRequest {
            message: message.to_string(),
            session_id,
        };
    }
}

#[async_trait]
pub trait Backend {
    /// Used at startup to verify the agent API is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Sends one chat turn. Resolves once response headers were accepted,
    /// failing on transport errors and non-success statuses. The body is
    /// returned unparsed.
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
