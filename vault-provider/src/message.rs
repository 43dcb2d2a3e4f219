//! Chat messages and the parts they are assembled from.

use chrono::{DateTime, Utc};
use chat_adapter::ToolCallState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text that replaces the assistant reply when a response fails.
pub const CHAT_FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while generating a response. Please try again.";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person asking.
    User,
    /// The model answering.
    Assistant,
}

/// A reasoning step, split into its structured pieces where possible.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningPart {
    /// Short heading of the step.
    pub title: Option<String>,
    /// What the model decided to do next.
    pub action: Option<String>,
    /// Stated confidence.
    pub confidence: Option<String>,
    /// Everything else.
    pub explanation: String,
}

impl ReasoningPart {
    /// Builds a reasoning part from a frame.
    ///
    /// Structured fields are taken as-is when any of them is present;
    /// otherwise they are recovered from `text` with [`parse`](Self::parse).
    #[must_use]
    pub fn from_frame(
        text: &str,
        title: Option<String>,
        action: Option<String>,
        confidence: Option<String>,
    ) -> Self {
        if title.is_none() && action.is_none() && confidence.is_none() {
            return Self::parse(text);
        }
        Self {
            title,
            action,
            confidence,
            explanation: text.trim().to_string(),
        }
    }

    /// Recovers title, action and confidence from free text.
    ///
    /// The first line is the title unless the text opens with a blank line.
    /// Lines starting with `Action:` or `Confidence:` (any case) fill those
    /// fields. The remaining lines form the explanation.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut part = Self::default();
        let mut lines = text.lines().peekable();

        if let Some(first) = lines.peek() {
            if !first.trim().is_empty() && !is_labelled(first, "action") && !is_labelled(first, "confidence") {
                part.title = Some(clean_title(first));
                lines.next();
            }
        }

        let mut explanation = Vec::new();
        for line in lines {
            if let Some(value) = labelled_value(line, "action") {
                part.action = Some(value);
            } else if let Some(value) = labelled_value(line, "confidence") {
                part.confidence = Some(value);
            } else {
                explanation.push(line);
            }
        }
        part.explanation = explanation.join("\n").trim().to_string();
        part
    }
}

fn clean_title(line: &str) -> String {
    line.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim()
        .to_string()
}

fn is_labelled(line: &str, label: &str) -> bool {
    labelled_value(line, label).is_some()
}

fn labelled_value(line: &str, label: &str) -> Option<String> {
    let trimmed = line.trim().trim_start_matches(['-', '*']).trim();
    let (head, tail) = trimmed.split_once(':')?;
    head.trim_matches('*')
        .trim()
        .eq_ignore_ascii_case(label)
        .then(|| tail.trim().trim_matches('*').trim().to_string())
}

/// Lifecycle of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ToolInvocationState {
    /// Arguments are still streaming in.
    PartialCall,
    /// Arguments are complete; the tool is running.
    Call,
    /// The tool returned.
    Result {
        /// Tool output.
        result: serde_json::Value,
    },
}

impl ToolInvocationState {
    /// Position in the `partial-call → call → result` progression.
    #[must_use]
    pub const fn stage(&self) -> ToolCallState {
        match self {
            Self::PartialCall => ToolCallState::PartialCall,
            Self::Call => ToolCallState::Call,
            Self::Result { .. } => ToolCallState::Result,
        }
    }

    fn from_frame(state: ToolCallState, result: Option<serde_json::Value>) -> Self {
        match state {
            ToolCallState::PartialCall => Self::PartialCall,
            ToolCallState::Call => Self::Call,
            ToolCallState::Result => Self::Result {
                result: result.unwrap_or(serde_json::Value::Null),
            },
        }
    }
}

/// A tool call made while answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// Identity the updates are keyed by.
    pub tool_call_id: String,
    /// Name of the tool.
    pub tool_name: String,
    /// Latest arguments.
    pub args: serde_json::Value,
    /// Where the call is in its lifecycle.
    pub state: ToolInvocationState,
}

/// A tool-call frame, ready to be applied to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallUpdate {
    /// Call identity; the tool name stands in when the server sends none.
    pub tool_call_id: Option<String>,
    /// Name of the tool.
    pub tool_name: String,
    /// Arguments so far.
    pub args: serde_json::Value,
    /// Reported state.
    pub state: ToolCallState,
    /// Output, for the `result` state.
    pub result: Option<serde_json::Value>,
}

/// One ordered piece of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A reasoning step.
    Reasoning(ReasoningPart),
    /// A tool call.
    ToolInvocation(ToolInvocation),
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique id.
    pub id: String,
    /// Author.
    pub role: ChatRole,
    /// Parts in arrival order.
    pub parts: Vec<MessagePart>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Provider failure detail, when the reply failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatMessage {
    fn new(role: ChatRole, parts: Vec<MessagePart>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            created_at: Utc::now(),
            error: None,
        }
    }

    /// A user message with one text part.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, vec![MessagePart::Text { text: text.into() }])
    }

    /// An empty assistant message to be filled by a stream.
    #[must_use]
    pub fn assistant() -> Self {
        Self::new(ChatRole::Assistant, Vec::new())
    }

    /// All text parts, concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool invocations, in order of first appearance.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.parts.iter().filter_map(|p| match p {
            MessagePart::ToolInvocation(t) => Some(t),
            _ => None,
        })
    }

    /// Appends to the last part if it is text, otherwise starts a new text part.
    pub fn append_text(&mut self, chunk: &str) {
        if let Some(MessagePart::Text { text }) = self.parts.last_mut() {
            text.push_str(chunk);
        } else {
            self.parts.push(MessagePart::Text {
                text: chunk.to_string(),
            });
        }
    }

    /// Appends a reasoning part.
    pub fn push_reasoning(&mut self, reasoning: ReasoningPart) {
        self.parts.push(MessagePart::Reasoning(reasoning));
    }

    /// Inserts or advances a tool invocation.
    ///
    /// Returns `false` when the update would move the call backwards; the
    /// invocation is left unchanged in that case.
    pub fn apply_tool_call(&mut self, update: ToolCallUpdate) -> bool {
        let id = update
            .tool_call_id
            .unwrap_or_else(|| update.tool_name.clone());
        let state = ToolInvocationState::from_frame(update.state, update.result);

        let existing = self.parts.iter_mut().find_map(|p| match p {
            MessagePart::ToolInvocation(t) if t.tool_call_id == id => Some(t),
            _ => None,
        });

        match existing {
            Some(invocation) if state.stage() < invocation.state.stage() => false,
            Some(invocation) => {
                invocation.tool_name = update.tool_name;
                invocation.args = update.args;
                invocation.state = state;
                true
            }
            None => {
                self.parts.push(MessagePart::ToolInvocation(ToolInvocation {
                    tool_call_id: id,
                    tool_name: update.tool_name,
                    args: update.args,
                    state,
                }));
                true
            }
        }
    }

    /// Replaces the content with [`CHAT_FAILURE_MESSAGE`], keeping `detail`.
    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        self.parts = vec![MessagePart::Text {
            text: CHAT_FAILURE_MESSAGE.to_string(),
        }];
        self.error = Some(detail.into());
    }
}
