use vault_extraction::model::Turn;

use crate::message::{ChatMessage, ChatRole};

/// Converts finished chat messages into model turns, oldest first.
///
/// Failed assistant messages and messages without text are left out so the
/// model never sees the user-facing failure notice as its own answer.
#[must_use]
pub fn history_turns(messages: &[ChatMessage]) -> Vec<Turn> {
    messages
        .iter()
        .filter(|msg| msg.error.is_none())
        .filter_map(|msg| {
            let text = msg.text();
            if text.trim().is_empty() {
                return None;
            }
            Some(match msg.role {
                ChatRole::User => Turn::user(text),
                ChatRole::Assistant => Turn::model(text),
            })
        })
        .collect()
}
