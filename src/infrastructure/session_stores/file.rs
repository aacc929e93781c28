#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::models::SessionStore;

pub const SESSION_FILE_NAME: &str = "chat_session_id";

pub struct FileSessionStore {
    pub dir: path::PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: path::PathBuf) -> FileSessionStore {
        return FileSessionStore { dir };
    }

    pub fn file_path(&self) -> path::PathBuf {
        return self.dir.join(SESSION_FILE_NAME);
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self) -> Result<Option<String>> {
        let file_path = self.file_path();
        if !file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(file_path).await?;
        let session_id = payload.trim();
        if session_id.is_empty() {
            return Ok(None);
        }

        return Ok(Some(session_id.to_string()));
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, session_id: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }

        let mut file = fs::File::create(self.file_path()).await?;
        file.write_all(session_id.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(session_id, "Saved session id");
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn clear(&self) -> Result<()> {
        let file_path = self.file_path();
        if !file_path.exists() {
            return Ok(());
        }

        fs::remove_file(file_path).await?;
        tracing::debug!("Cleared session id");
        return Ok(());
    }
}
