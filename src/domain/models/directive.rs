#[cfg(test)]
#[path = "directive_test.rs"]
mod tests;

use serde_derive::Deserialize;
use serde_derive::Serialize;

pub const FORM_MARKER: &str = "<SHOW_PRODUCT_FORM>";
pub const BUTTONS_OPEN: &str = "<BUTTONS>";
pub const BUTTONS_CLOSE: &str = "</BUTTONS>";

/// What the UI should do with an assistant message, derived from its raw
/// text. Never stored; recompute it whenever the text changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveState {
    pub display_text: String,
    pub show_form: bool,
    pub button_labels: Vec<String>,
}

fn parse_labels(inner: &str) -> Vec<String> {
    return inner
        .split(',')
        .map(|label| return label.trim())
        .filter(|label| return !label.is_empty())
        .map(|label| return label.to_string())
        .collect();
}

/// Removes the first complete buttons span, returning its inner content.
/// An opening tag with no closing tag after it is left alone.
fn take_buttons_span(text: &mut String) -> Option<String> {
    let start = text.find(BUTTONS_OPEN)?;
    let inner_start = start + BUTTONS_OPEN.len();
    let inner_end = inner_start + text[inner_start..].find(BUTTONS_CLOSE)?;
    let inner = text[inner_start..inner_end].to_string();
    text.replace_range(start..inner_end + BUTTONS_CLOSE.len(), "");

    return Some(inner);
}

impl DirectiveState {
    pub fn parse(text: &str) -> DirectiveState {
        let mut display_text = text.to_string();
        let mut show_form = false;
        let mut button_labels: Option<Vec<String>> = None;

        // Removing one marker can splice the text around it into another, so
        // strip until nothing is left to find.
        loop {
            let mut changed = false;

            if display_text.contains(FORM_MARKER) {
                display_text = display_text.replace(FORM_MARKER, "");
                show_form = true;
                changed = true;
            }

            while let Some(inner) = take_buttons_span(&mut display_text) {
                if button_labels.is_none() {
                    button_labels = Some(parse_labels(&inner));
                }
                changed = true;
            }

            if !changed {
                break;
            }
        }

        return DirectiveState {
            display_text: display_text.trim().to_string(),
            show_form,
            button_labels: button_labels.unwrap_or_default(),
        };
    }

    /// Nothing to render: no text and no buttons.
    pub fn is_empty(&self) -> bool {
        return self.display_text.is_empty() && self.button_labels.is_empty();
    }
}
