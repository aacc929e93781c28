#[cfg(test)]
#[path = "chat_controller_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use uuid::Uuid;

use super::LineFrameDecoder;
use super::MessageAccumulator;
use crate::domain::models::Author;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatRequest;
use crate::domain::models::ChatState;
use crate::domain::models::Conversation;
use crate::domain::models::ConversationUpdate;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::models::SessionStoreBox;
use crate::domain::models::StreamFragment;

pub const FALLBACK_MESSAGE: &str =
    "I'm having trouble connecting to the server. Please try again.";

/// Runs chat turns against the agent API and owns the conversation.
///
/// Turns take `&mut self`, so only one can ever be in flight. Every state
/// transition and conversation snapshot is published on the event channel.
pub struct ChatController {
    backend: BackendBox,
    sessions: SessionStoreBox,
    client_session_id: bool,
    conversation: Conversation,
    state: ChatState,
    tx: mpsc::UnboundedSender<Event>,
}

impl ChatController {
    pub fn new(
        backend: BackendBox,
        sessions: SessionStoreBox,
        client_session_id: bool,
        tx: mpsc::UnboundedSender<Event>,
    ) -> ChatController {
        return ChatController {
            backend,
            sessions,
            client_session_id,
            conversation: Conversation::default(),
            state: ChatState::Idle,
            tx,
        };
    }

    pub fn conversation(&self) -> &Conversation {
        return &self.conversation;
    }

    pub fn state(&self) -> ChatState {
        return self.state;
    }

    #[allow(clippy::implicit_return)]
    pub async fn health_check(&self) -> Result<()> {
        return self.backend.health_check().await;
    }

    fn set_state(&mut self, state: ChatState) -> Result<()> {
        tracing::debug!(from = %self.state, to = %state, "Chat state");
        self.state = state;
        self.tx.send(Event::ChatStateChanged(state))?;

        return Ok(());
    }

    fn update(&mut self, update: ConversationUpdate) -> Result<()> {
        return self.update_all(vec![update]);
    }

    /// Applies every update before publishing, so subscribers only ever see
    /// the combined snapshot.
    fn update_all(&mut self, updates: Vec<ConversationUpdate>) -> Result<()> {
        for update in updates {
            self.conversation = self.conversation.apply(update);
        }
        self.tx
            .send(Event::ConversationUpdated(self.conversation.clone()))?;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn load_session_id(&self) -> Option<String> {
        match self.sessions.get().await {
            Ok(session_id) => return session_id,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to read session id, starting without one");
                return None;
            }
        }
    }

    #[allow(clippy::implicit_return)]
    async fn save_session_id(&self, session_id: &str) {
        if let Err(err) = self.sessions.set(session_id).await {
            tracing::warn!(error = ?err, session_id, "Failed to persist session id");
        }
    }

    /// Forgets the session and starts over with an empty conversation.
    #[allow(clippy::implicit_return)]
    pub async fn new_chat(&mut self) -> Result<()> {
        if !self.state.accepts_input() {
            bail!("Cannot start a new chat while a turn is in progress");
        }

        self.sessions.clear().await?;
        self.conversation = Conversation::default();
        self.tx
            .send(Event::ConversationUpdated(self.conversation.clone()))?;

        return Ok(());
    }

    /// Runs one full turn. Network and server failures end up as a fallback
    /// message in the conversation rather than an error; only a closed event
    /// channel is reported back.
    #[allow(clippy::implicit_return)]
    pub async fn send(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if !self.state.accepts_input() {
            bail!("A chat turn is already in progress");
        }

        self.update(ConversationUpdate::Append(Message::new(Author::User, text)))?;
        self.set_state(ChatState::Sending)?;

        let mut accumulator: Option<MessageAccumulator> = None;
        let res = self.stream_turn(text, &mut accumulator).await;
        if let Err(err) = res {
            if self.tx.is_closed() {
                return Err(err);
            }

            tracing::error!(error = ?err, "Chat turn failed");
            self.set_state(ChatState::Failed)?;

            let fallback =
                Message::new_with_type(Author::Assistant, MessageType::Error, FALLBACK_MESSAGE);
            match accumulator {
                // The finished partial reply must never be published as the
                // latest message, or its quick replies would be offered.
                Some(accumulator) => {
                    self.update_all(accumulator.fail(fallback))?;
                }
                None => {
                    self.update(ConversationUpdate::Append(fallback))?;
                }
            }
        }

        self.set_state(ChatState::Idle)?;

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn stream_turn(
        &mut self,
        text: &str,
        accumulator: &mut Option<MessageAccumulator>,
    ) -> Result<()> {
        let mut session_id = self.load_session_id().await;
        if session_id.is_none() && self.client_session_id {
            let generated = Uuid::new_v4().to_string();
            self.save_session_id(&generated).await;
            session_id = Some(generated);
        }
        let mut needs_session_id = session_id.is_none();

        let stream = self
            .backend
            .open_stream(ChatRequest::new(text, session_id))
            .await?;

        self.set_state(ChatState::Streaming)?;
        let (acc, placeholder) = MessageAccumulator::start();
        self.update(placeholder)?;
        let acc = accumulator.insert(acc);

        let mut lines = FramedRead::new(StreamReader::new(stream), LineFrameDecoder::new());
        while let Some(line) = lines.next().await {
            let fragment = match StreamFragment::parse_line(&line?) {
                Some(fragment) => fragment,
                None => continue,
            };

            if needs_session_id {
                if let Some(server_session_id) = &fragment.session_id {
                    tracing::info!(session_id = %server_session_id, "Adopting server session id");
                    self.save_session_id(server_session_id).await;
                    needs_session_id = false;
                }
            }

            if let Some(err) = &fragment.error {
                tracing::error!(error = err.as_str(), node = ?fragment.node, "Agent reported an error");
            }

            if let Some(step) = fragment.progress() {
                self.update(acc.add_thought(step))?;
                continue;
            }

            self.update(acc.apply_delta(fragment.delta()))?;
        }

        self.update(acc.finish())?;
        tracing::debug!(deltas = acc.deltas(), "Chat turn complete");

        return Ok(());
    }
}
