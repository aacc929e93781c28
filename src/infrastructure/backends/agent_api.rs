#[cfg(test)]
#[path = "agent_api_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::StreamExt;
use futures::stream::TryStreamExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::ByteStream;
use crate::domain::models::ChatRequest;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

/// The marketing agent's HTTP API. Chat responses arrive as NDJSON over a
/// chunked body.
pub struct AgentApi {
    url: String,
    timeout: String,
}

impl Default for AgentApi {
    fn default() -> AgentApi {
        return AgentApi {
            url: Config::get(ConfigKey::ApiURL),
            timeout: Config::get(ConfigKey::HealthCheckTimeout),
        };
    }
}

#[async_trait]
impl Backend for AgentApi {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        if let Err(err) = res {
            tracing::error!(error = ?err, "Agent API is not running");
            bail!("Agent API is not running at {}", self.url);
        }

        let res = res?;
        if !res.status().is_success() {
            tracing::error!(status = res.status().as_u16(), "Agent API health check failed");
            bail!("Agent API health check failed with status {}", res.status());
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        tracing::debug!(
            has_session_id = request.session_id.is_some(),
            "Sending chat request"
        );

        let res = reqwest::Client::new()
            .post(format!("{url}/api/agent/chat", url = self.url))
            .json(&request)
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to make chat request to the agent API"
            );
            bail!("Failed to make chat request to the agent API");
        }

        let stream = res.bytes_stream().map_err(convert_err).boxed();
        return Ok(stream);
    }
}
