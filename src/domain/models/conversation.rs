#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use super::Author;
use super::Message;
use super::MessageId;

pub enum ConversationUpdate {
    Append(Message),
    AppendText { id: MessageId, text: String },
    AddThought { id: MessageId, step: String },
    Finish { id: MessageId },
    Replace { id: MessageId, message: Message },
}

/// Immutable snapshot of the chat. Every change produces a new snapshot
/// through `apply`, so subscribers can hold on to old ones safely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn len(&self) -> usize {
        return self.messages.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.messages.is_empty();
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        return self.messages.iter().find(|msg| return msg.id == id);
    }

    pub fn last(&self) -> Option<&Message> {
        return self.messages.last();
    }

    /// The product form is shown while the latest message is from the
    /// assistant and asks for it. Any later message hides it again.
    pub fn form_requested(&self) -> bool {
        if let Some(msg) = self.last() {
            return msg.author == Author::Assistant && msg.directives().show_form;
        }

        return false;
    }

    /// Quick replies offered by the latest finished assistant message.
    pub fn quick_replies(&self) -> Vec<String> {
        if let Some(msg) = self.last() {
            if msg.author == Author::Assistant && !msg.is_streaming {
                return msg.directives().button_labels;
            }
        }

        return vec![];
    }

    pub fn apply(&self, update: ConversationUpdate) -> Conversation {
        let mut messages = self.messages.clone();

        match update {
            ConversationUpdate::Append(message) => {
                messages.push(message);
            }
            ConversationUpdate::AppendText { id, text } => {
                if let Some(msg) = find_streaming(&mut messages, id) {
                    msg.text += &text;
                }
            }
            ConversationUpdate::AddThought { id, step } => {
                if let Some(msg) = find_streaming(&mut messages, id) {
                    msg.thoughts.push(step);
                }
            }
            ConversationUpdate::Finish { id } => {
                if let Some(msg) = find_streaming(&mut messages, id) {
                    msg.is_streaming = false;
                }
            }
            ConversationUpdate::Replace { id, message } => {
                if let Some(idx) = messages.iter().position(|msg| return msg.id == id) {
                    messages[idx] = message;
                } else {
                    tracing::warn!(id = %id, "Replace target not found, appending instead");
                    messages.push(message);
                }
            }
        }

        return Conversation { messages };
    }
}

fn find_streaming(messages: &mut [Message], id: MessageId) -> Option<&mut Message> {
    let msg = messages.iter_mut().find(|msg| return msg.id == id);
    match msg {
        Some(msg) if msg.is_streaming => return Some(msg),
        Some(_) => {
            tracing::warn!(id = %id, "Ignoring update to a finished message");
            return None;
        }
        None => {
            tracing::warn!(id = %id, "Ignoring update to an unknown message");
            return None;
        }
    }
}
