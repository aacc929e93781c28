#[cfg(test)]
#[path = "accumulator_test.rs"]
mod tests;

use crate::domain::models::ConversationUpdate;
use crate::domain::models::Message;
use crate::domain::models::MessageId;

/// Tracks the single in-flight assistant message of a turn and turns stream
/// fragments into conversation updates, in arrival order.
pub struct MessageAccumulator {
    id: MessageId,
    deltas: usize,
    received_text: bool,
}

impl MessageAccumulator {
    /// Creates the accumulator together with the update that appends its
    /// empty, streaming placeholder.
    pub fn start() -> (MessageAccumulator, ConversationUpdate) {
        let placeholder = Message::placeholder();
        let accumulator = MessageAccumulator {
            id: placeholder.id,
            deltas: 0,
            received_text: false,
        };

        return (accumulator, ConversationUpdate::Append(placeholder));
    }

    pub fn id(&self) -> MessageId {
        return self.id;
    }

    pub fn deltas(&self) -> usize {
        return self.deltas;
    }

    pub fn apply_delta(&mut self, text: &str) -> ConversationUpdate {
        self.deltas += 1;
        if !text.is_empty() {
            self.received_text = true;
        }

        return ConversationUpdate::AppendText {
            id: self.id,
            text: text.to_string(),
        };
    }

    pub fn add_thought(&self, step: &str) -> ConversationUpdate {
        return ConversationUpdate::AddThought {
            id: self.id,
            step: step.to_string(),
        };
    }

    pub fn finish(&self) -> ConversationUpdate {
        return ConversationUpdate::Finish { id: self.id };
    }

    /// Partial text survives a failed turn and the fallback follows it. With
    /// nothing received, the fallback takes the placeholder's place.
    pub fn fail(&self, fallback: Message) -> Vec<ConversationUpdate> {
        if self.received_text {
            return vec![self.finish(), ConversationUpdate::Append(fallback)];
        }

        return vec![ConversationUpdate::Replace {
            id: self.id,
            message: fallback,
        }];
    }
}
