#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

use std::env;

use anyhow::Result;
use owo_colors::OwoColorize;
use owo_colors::Stream;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::domain::models::Action;
use crate::domain::models::ChatState;
use crate::domain::models::Conversation;
use crate::domain::models::Event;
use crate::domain::models::SlashCommand;
use crate::domain::services::actions::help_text;
use crate::domain::services::Transcript;
use crate::domain::services::TranscriptLine;

pub const GREETING: &str = "Hello! I'm Emily, your personal marketing strategist. I'm so excited to help you launch your product! To get started, could you tell me a little bit about what you're building?";

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Nothing,
    Notice(String),
    Send {
        action: Action,
        echo: Option<String>,
    },
    Greet(Action),
    Quit,
}

fn line_width() -> usize {
    return env::var("COLUMNS")
        .ok()
        .and_then(|cols| return cols.parse::<usize>().ok())
        .unwrap_or(100)
        .saturating_sub(4)
        .max(20);
}

struct ChatView {
    state: ChatState,
    conversation: Conversation,
    transcript: Transcript,
    form: Option<Vec<String>>,
}

impl ChatView {
    fn new(line_width: usize) -> ChatView {
        return ChatView {
            state: ChatState::Idle,
            conversation: Conversation::default(),
            transcript: Transcript::new(line_width),
            form: None,
        };
    }

    fn busy_notice() -> Outcome {
        return Outcome::Notice("Emily is still answering, hang tight.".to_string());
    }

    fn send(&mut self, text: String, echo: Option<String>) -> Outcome {
        // Input stays locked until the controller reports the turn is over.
        self.state = ChatState::Sending;
        return Outcome::Send {
            action: Action::SendMessage(text),
            echo,
        };
    }

    fn handle_form_line(&mut self, line: &str) -> Outcome {
        if !line.trim().is_empty() {
            if let Some(form) = self.form.as_mut() {
                form.push(line.to_string());
            }
            return Outcome::Nothing;
        }

        let details = self.form.take().unwrap_or_default().join("\n");
        if details.trim().is_empty() {
            return Outcome::Notice("Product form cancelled.".to_string());
        }
        if !self.state.accepts_input() {
            return ChatView::busy_notice();
        }

        return self.send(details, None);
    }

    fn handle_command(&mut self, command: SlashCommand) -> Outcome {
        if command.is_quit() {
            return Outcome::Quit;
        }
        if command.is_help() {
            return Outcome::Notice(help_text());
        }
        if !self.state.accepts_input() {
            return ChatView::busy_notice();
        }

        if command.is_new_chat() {
            return Outcome::Greet(Action::NewChat());
        }

        if command.is_button() {
            let replies = self.conversation.quick_replies();
            if replies.is_empty() {
                return Outcome::Notice("There are no quick replies to pick from.".to_string());
            }

            let label = command
                .button_index()
                .and_then(|idx| return replies.get(idx).cloned());
            if let Some(label) = label {
                return self.send(label.clone(), Some(label));
            }

            return Outcome::Notice(format!(
                "Pick a quick reply between 1 and {}, for example /button 1.",
                replies.len()
            ));
        }

        if command.is_form() {
            if !self.conversation.form_requested() {
                return Outcome::Notice("Emily hasn't asked for product details yet.".to_string());
            }

            self.form = Some(vec![]);
            return Outcome::Notice(
                "Describe your product: name, what it does, who it's for, price. Finish with an empty line."
                    .to_string(),
            );
        }

        return Outcome::Nothing;
    }

    fn handle_input(&mut self, line: &str) -> Outcome {
        if self.form.is_some() {
            return self.handle_form_line(line);
        }

        let text = line.trim();
        if text.is_empty() {
            return Outcome::Nothing;
        }

        if let Some(command) = SlashCommand::parse(text) {
            return self.handle_command(command);
        }

        if !self.state.accepts_input() {
            return ChatView::busy_notice();
        }

        return self.send(text.to_string(), None);
    }

    fn handle_event(&mut self, event: Event) -> Vec<String> {
        match event {
            Event::ChatStateChanged(state) => {
                self.state = state;
                if state == ChatState::Sending {
                    return vec!["Emily is thinking..."
                        .if_supports_color(Stream::Stdout, |e| return e.dimmed())
                        .to_string()];
                }
                return vec![];
            }
            Event::ConversationUpdated(conversation) => {
                let lines = self
                    .transcript
                    .render(&conversation)
                    .into_iter()
                    .map(|line| return format_line(&line))
                    .collect::<Vec<String>>();
                self.conversation = conversation;
                return lines;
            }
            Event::HealthCheckFailed(err) => {
                return vec![format!(
                    "Warning: the agent API did not answer its health check ({err}). Messages may fail until it is up."
                )
                .if_supports_color(Stream::Stdout, |e| return e.yellow())
                .to_string()];
            }
        }
    }
}

fn format_line(line: &TranscriptLine) -> String {
    match line {
        TranscriptLine::Header(name) => {
            return format!("{name}:")
                .if_supports_color(Stream::Stdout, |e| return e.magenta())
                .to_string();
        }
        TranscriptLine::Text(text) => return format!("  {text}"),
        TranscriptLine::Error(text) => {
            return format!("  {text}")
                .if_supports_color(Stream::Stdout, |e| return e.red())
                .to_string();
        }
        TranscriptLine::Thought(step) => {
            return format!("  · {step}")
                .if_supports_color(Stream::Stdout, |e| return e.dimmed())
                .to_string();
        }
        TranscriptLine::Button(idx, label) => {
            return format!("  [{idx}] {label}")
                .if_supports_color(Stream::Stdout, |e| return e.cyan())
                .to_string();
        }
        TranscriptLine::FormPrompt => {
            return "  Type /form to share your product details."
                .if_supports_color(Stream::Stdout, |e| return e.yellow())
                .to_string();
        }
        TranscriptLine::Blank => return "".to_string(),
    }
}

fn print_greeting() {
    println!(
        "{}",
        "Emily:".if_supports_color(Stream::Stdout, |e| return e.magenta())
    );
    println!("  {GREETING}\n");
}

pub async fn start(
    tx: mpsc::UnboundedSender<Action>,
    rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut view = ChatView::new(line_width());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "{}",
        "Type /help for commands."
            .if_supports_color(Stream::Stdout, |e| return e.dimmed())
    );
    print_greeting();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };

                match view.handle_input(&line) {
                    Outcome::Nothing => (),
                    Outcome::Notice(notice) => println!("{notice}"),
                    Outcome::Send { action, echo } => {
                        if let Some(echo) = echo {
                            println!("> {echo}");
                        }
                        tracing::debug!(action = ?action, "Sending action");
                        tx.send(action)?;
                    }
                    Outcome::Greet(action) => {
                        tx.send(action)?;
                        println!();
                        print_greeting();
                    }
                    Outcome::Quit => break,
                }
            }
            event = rx.recv() => {
                let event = match event {
                    Some(event) => event,
                    None => break,
                };

                for line in view.handle_event(event) {
                    println!("{line}");
                }
            }
        }
    }

    return Ok(());
}
