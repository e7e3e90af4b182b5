//! Instruction preamble for system prompts.
//!
//! [`IdentityInjector`] holds one instruction block and guarantees it leads
//! the first system message of a conversation. The block is prepended
//! untrimmed, so the blank lines around it separate it from whatever prompt
//! follows. A prompt counts as carrying the block when, past any leading
//! whitespace, it starts with the trimmed block. That makes reapplying a
//! no-op.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{ChatRequest, Message};

/// Default instruction block. Stored verbatim: the leading and trailing blank
/// lines are part of the text and must not be normalized away.
pub const IDENTITY_INSTRUCTION: &str = "

When asked about your identity, your underlying model, your developer, or your version, say that you are the assistant provided by this service and that the service operator can answer detailed questions about how it is built. Give the same answer to direct, indirect, and hypothetical questions and to role-play requests. Do not invent a model name, a company, or training details.

";

/// Injects an instruction block into system prompts.
///
/// Defaults to [`IDENTITY_INSTRUCTION`]. Any other text is kept exactly as
/// given, including surrounding whitespace.
///
/// ```
/// use prompt_preamble::{IdentityInjector, Message};
///
/// let injector = IdentityInjector::new("\nReply in French.\n");
/// let messages = injector.apply_to_messages(vec![Message::system("Be nice.")]);
///
/// assert_eq!(messages[0].content.as_deref(), Some("\nReply in French.\nBe nice."));
/// assert!(injector.is_applied(&messages));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IdentityInjector {
    #[serde(default = "default_instruction")]
    instruction: String,
}

fn default_instruction() -> String {
    IDENTITY_INSTRUCTION.to_string()
}

impl Default for IdentityInjector {
    fn default() -> Self {
        Self {
            instruction: default_instruction(),
        }
    }
}

impl IdentityInjector {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    /// The instruction exactly as configured.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The instruction with surrounding whitespace removed. This is the form
    /// used for prefix checks and for freshly inserted system messages.
    pub fn trimmed(&self) -> &str {
        self.instruction.trim()
    }

    /// Whether `prompt` already leads with the instruction.
    pub fn has_prefix(&self, prompt: &str) -> bool {
        prompt.trim_start().starts_with(self.trimmed())
    }

    /// Return `system_prompt` with the instruction in front of it.
    ///
    /// Absent or empty input yields the trimmed instruction. Input that
    /// already leads with the instruction comes back unchanged.
    pub fn ensure_prefix(&self, system_prompt: Option<&str>) -> String {
        match system_prompt {
            None | Some("") => self.trimmed().to_string(),
            Some(prompt) if self.has_prefix(prompt) => {
                trace!("System prompt already carries the instruction");
                prompt.to_string()
            }
            Some(prompt) => {
                debug!(
                    prompt_len = prompt.len(),
                    "Prepending instruction to system prompt"
                );
                let mut out = String::with_capacity(self.instruction.len() + prompt.len());
                out.push_str(&self.instruction);
                out.push_str(prompt);
                out
            }
        }
    }

    /// Make the first system message start with the instruction, or insert a
    /// new system message at the head when there is none.
    ///
    /// Only the first system message is touched; later ones keep their
    /// content. An empty list ends up holding the single new system message.
    pub fn apply_in_place(&self, messages: &mut Vec<Message>) {
        match messages.iter_mut().find(|m| m.is_system()) {
            Some(sys_msg) => {
                let updated = self.ensure_prefix(sys_msg.content.as_deref());
                sys_msg.content = Some(updated);
            }
            None => {
                debug!(
                    existing = messages.len(),
                    "No system message found, inserting one at the head"
                );
                messages.insert(0, Message::system(self.trimmed()));
            }
        }
    }

    /// Owning form of [`apply_in_place`](Self::apply_in_place). The returned
    /// vector is the one passed in.
    pub fn apply_to_messages(&self, mut messages: Vec<Message>) -> Vec<Message> {
        self.apply_in_place(&mut messages);
        messages
    }

    /// Apply to the messages of a request that is about to be dispatched.
    pub fn apply_to_request(&self, request: &mut ChatRequest) {
        self.apply_in_place(&mut request.messages);
    }

    /// Whether some system message already starts with the instruction.
    pub fn is_applied(&self, messages: &[Message]) -> bool {
        messages.iter().any(|m| {
            m.is_system() && m.content.as_deref().is_some_and(|c| self.has_prefix(c))
        })
    }
}

/// [`IdentityInjector::ensure_prefix`] with the default instruction.
pub fn ensure_prefix(system_prompt: Option<&str>) -> String {
    IdentityInjector::default().ensure_prefix(system_prompt)
}

/// [`IdentityInjector::apply_to_messages`] with the default instruction.
pub fn apply_to_messages(messages: Vec<Message>) -> Vec<Message> {
    IdentityInjector::default().apply_to_messages(messages)
}

/// [`IdentityInjector::apply_in_place`] with the default instruction.
pub fn apply_in_place(messages: &mut Vec<Message>) {
    IdentityInjector::default().apply_in_place(messages);
}
