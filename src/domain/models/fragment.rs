#[cfg(test)]
#[path = "fragment_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

/// One line of the agent's NDJSON response body.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamFragment {
    /// Parses a single complete line. Blank lines are skipped quietly, lines
    /// that aren't a fragment object are logged and skipped.
    pub fn parse_line(line: &str) -> Option<StreamFragment> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if !trimmed.starts_with('{') {
            tracing::warn!(line = trimmed, "Skipping stream line that is not a JSON object");
            return None;
        }

        match serde_json::from_str::<StreamFragment>(trimmed) {
            Ok(fragment) => {
                tracing::debug!(body = ?fragment, "Stream fragment");
                return Some(fragment);
            }
            Err(err) => {
                tracing::warn!(error = ?err, line = trimmed, "Skipping malformed stream line");
                return None;
            }
        }
    }

    /// Incremental assistant text carried by this fragment. Fragments without
    /// a response carry an empty delta.
    pub fn delta(&self) -> &str {
        if self.is_progress() {
            return "";
        }

        return self.response.as_deref().unwrap_or("");
    }

    pub fn is_progress(&self) -> bool {
        return self.kind.as_deref() == Some("progress");
    }

    /// Research progress step, when this fragment reports one.
    pub fn progress(&self) -> Option<&str> {
        if !self.is_progress() {
            return None;
        }

        return self.content.as_deref().filter(|step| return !step.is_empty());
    }
}
