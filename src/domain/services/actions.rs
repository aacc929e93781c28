#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;

use super::ChatController;
use crate::domain::models::Action;
use crate::domain::models::Event;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /button (/b) [NUMBER] - Sends the quick reply with the given number from Emily's last message.
- /form (/f) - Fills in the product details Emily asked for. Finish with an empty line.
- /new (/n) - Starts a new chat and forgets the current session.
- /quit /exit (/q) - Exit.
- /help (/h) - Provides this help menu.

Anything else you type is sent to Emily as a message.
        "#;

    return text.trim().to_string();
}

pub struct ActionsService {}

impl ActionsService {
    /// Feeds UI actions to the controller one at a time until the UI hangs up.
    pub async fn start(
        mut controller: ChatController,
        tx: mpsc::UnboundedSender<Event>,
        rx: &mut mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        if let Err(err) = controller.health_check().await {
            tracing::warn!(error = ?err, "Agent API health check failed");
            tx.send(Event::HealthCheckFailed(err.to_string()))?;
        }

        while let Some(action) = rx.recv().await {
            match action {
                Action::SendMessage(text) => {
                    controller.send(&text).await?;
                }
                Action::NewChat() => {
                    if let Err(err) = controller.new_chat().await {
                        tracing::error!(error = ?err, "Failed to start a new chat");
                    }
                }
            }
        }

        return Ok(());
    }
}
