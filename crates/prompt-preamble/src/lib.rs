//! Instruction preamble injection for chat completion requests.
//!
//! `prompt-preamble` guarantees that a conversation handed to a model starts
//! with a fixed instruction block in its system prompt. It sits between the
//! layer that builds a request from an inbound API call and the layer that
//! dispatches it to an inference backend, and it does nothing else: no I/O,
//! no shared state, no validation of the conversation itself.
//!
//! # Getting started
//!
//! ```
//! use prompt_preamble::{Message, MessageRole, apply_to_messages, IDENTITY_INSTRUCTION};
//!
//! let messages = apply_to_messages(vec![Message::user("hi")]);
//!
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].role, MessageRole::System);
//! assert_eq!(messages[0].content.as_deref(), Some(IDENTITY_INSTRUCTION.trim()));
//! ```
//!
//! # Where to find things
//!
//! - **Prefix a single prompt or a message list:** see [`ensure_prefix`],
//!   [`apply_to_messages`] and [`apply_in_place`], which all use the default
//!   [`IDENTITY_INSTRUCTION`].
//!
//! - **Use your own instruction text:** build an
//!   [`IdentityInjector`](preamble::IdentityInjector) with
//!   [`IdentityInjector::new`](preamble::IdentityInjector::new). It exposes
//!   the same operations plus [`apply_to_request`](preamble::IdentityInjector::apply_to_request).
//!
//! - **Work on an untyped JSON body:** see [`raw::apply_to_value`] and
//!   [`raw::apply_to_json`]. This is the only fallible path; malformed
//!   messages are rejected with [`InjectError`] and the body is left as it was.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`preamble`] | [`IdentityInjector`](preamble::IdentityInjector), the default instruction, typed prefix/apply operations |
//! | [`raw`] | Validating injection over `serde_json::Value` request bodies |
//! | [`error`] | [`InjectError`] for the untyped path |

pub mod error;
pub mod preamble;
pub mod raw;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::InjectError;
pub use preamble::{
    IDENTITY_INSTRUCTION, IdentityInjector, apply_in_place, apply_to_messages, ensure_prefix,
};

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body as received from a caller.
///
/// Only `model` and `messages` are modelled. Every other key (`stream`,
/// `temperature`, `tools`, ...) is kept verbatim in `extra` and written back
/// out, so a parsed-then-serialized request forwards what the caller sent.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
///
/// Roles outside the common four (`developer`, provider-specific ones) land
/// in `Other` and serialize back as the same string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
            MessageRole::Other(role) => write!(f, "{role}"),
        }
    }
}

/// A message in the conversation. Keys other than `role` and `content`
/// (`name`, `tool_calls`, `tool_call_id`, ...) ride along in `extra`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }
}
