use super::ChatState;
use super::Conversation;

pub enum Event {
    ChatStateChanged(ChatState),
    ConversationUpdated(Conversation),
    HealthCheckFailed(String),
}
