//! Transport-neutral chat contract.
//!
//! Defines the inbound event and outbound reply shapes exchanged between the
//! transport layer and the dialog layer. The dialog layer only ever consumes
//! these types; wire formats stay inside the transport crate.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates the content shapes an inbound chat event can carry.
pub enum ChatContent {
    /// Plain message text as typed by the sender.
    Text(String),
    /// Content no flow understands (documents, audio, stickers, ...).
    Unsupported { kind: String },
}

impl ChatContent {
    /// Returns the message text when this is a text event.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn kind_label(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Unsupported { kind } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ChatEvent` shared across apiary crates.
pub struct ChatEvent {
    /// Transport-level update id, used for offset tracking and log lines.
    pub update_id: u64,
    /// Conversation key; sessions and delivery ordering are scoped by it.
    pub chat_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_display: String,
    pub timestamp_ms: u64,
    pub content: ChatContent,
}

/// Validates that an inbound event carries the fields the dialog layer
/// depends on. Rejects events with empty routing keys or a zero timestamp.
pub fn validate_chat_event(event: &ChatEvent) -> Result<()> {
    if event.chat_id.trim().is_empty() {
        bail!("chat event has empty chat_id");
    }
    if event.sender_id.trim().is_empty() {
        bail!("chat event has empty sender_id");
    }
    if event.timestamp_ms == 0 {
        bail!("chat event has zero timestamp_ms");
    }
    if let ChatContent::Unsupported { kind } = &event.content {
        if kind.trim().is_empty() {
            bail!("chat event has unsupported content with empty kind");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Quick-reply keyboard: rows of button labels shown under the input box.
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn from_rows<R, L>(rows: R) -> Self
    where
        R: IntoIterator<Item = L>,
        L: IntoIterator<Item = &'static str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `OutboundReply` shared across apiary crates.
pub struct OutboundReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<ReplyKeyboard>,
}

impl OutboundReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: ReplyKeyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
