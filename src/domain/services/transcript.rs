use std::collections::HashMap;

use crate::domain::models::Author;
use crate::domain::models::Conversation;
use crate::domain::models::MessageId;
use crate::domain::models::MessageType;

#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptLine {
    Header(String),
    Text(String),
    Error(String),
    Thought(String),
    /// 1-based number the user picks with `/button`.
    Button(usize, String),
    FormPrompt,
    Blank,
}

#[derive(Default)]
struct TranscriptEntry {
    header: bool,
    thoughts: usize,
    finished: bool,
}

/// Tracks what has already been printed so every Conversation snapshot only
/// yields the lines that are new since the previous one.
pub struct Transcript {
    cache: HashMap<MessageId, TranscriptEntry>,
    line_width: usize,
}

impl Transcript {
    pub fn new(line_width: usize) -> Transcript {
        return Transcript {
            cache: HashMap::new(),
            line_width,
        };
    }

    pub fn render(&mut self, conversation: &Conversation) -> Vec<TranscriptLine> {
        if conversation.is_empty() {
            self.cache.clear();
            return vec![];
        }

        let mut lines = vec![];
        let last_idx = conversation.len() - 1;

        for (idx, message) in conversation.messages().iter().enumerate() {
            let entry = self.cache.entry(message.id).or_default();
            if entry.finished {
                continue;
            }

            // The terminal already echoed whatever the user sent.
            if message.author == Author::User {
                entry.finished = true;
                continue;
            }

            let header_line = TranscriptLine::Header(message.author.to_string());

            if message.thoughts.len() > entry.thoughts {
                if !entry.header {
                    lines.push(header_line.clone());
                    entry.header = true;
                }
                for step in &message.thoughts[entry.thoughts..] {
                    lines.push(TranscriptLine::Thought(step.to_string()));
                }
                entry.thoughts = message.thoughts.len();
            }

            if message.is_streaming {
                continue;
            }

            entry.finished = true;
            let is_last = idx == last_idx;

            let directives = message.directives();

            // Nothing to show, but the form stays up even without a bubble.
            if directives.is_empty() {
                if is_last && conversation.form_requested() {
                    lines.push(TranscriptLine::FormPrompt);
                    lines.push(TranscriptLine::Blank);
                }
                continue;
            }

            if !entry.header {
                lines.push(header_line);
                entry.header = true;
            }

            if !directives.display_text.is_empty() {
                for line in message.as_string_lines(self.line_width) {
                    if message.message_type() == MessageType::Error {
                        lines.push(TranscriptLine::Error(line));
                    } else {
                        lines.push(TranscriptLine::Text(line));
                    }
                }
            }

            if is_last {
                for (btn_idx, label) in conversation.quick_replies().into_iter().enumerate() {
                    lines.push(TranscriptLine::Button(btn_idx + 1, label));
                }
                if conversation.form_requested() {
                    lines.push(TranscriptLine::FormPrompt);
                }
            }

            lines.push(TranscriptLine::Blank);
        }

        return lines;
    }
}
