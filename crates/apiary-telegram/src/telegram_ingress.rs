//! Telegram update parsing and normalization into chat events.
//!
//! Raw `getUpdates` rows are converted into the transport-neutral event shape
//! the dialog layer consumes. Parse failures carry a stable reason code so
//! operators can trace malformed or unsupported updates in the logs.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use apiary_core::{validate_chat_event, ChatContent, ChatEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelegramIngressReasonCode {
    MissingMessage,
    MissingField,
    InvalidFieldType,
    InvalidTimestamp,
    InvalidNormalizedEvent,
}

impl TelegramIngressReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingMessage => "missing_message",
            Self::MissingField => "missing_field",
            Self::InvalidFieldType => "invalid_field_type",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidNormalizedEvent => "invalid_normalized_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramIngressParseError {
    pub code: TelegramIngressReasonCode,
    pub message: String,
}

impl Display for TelegramIngressParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for TelegramIngressParseError {}

/// Content keys checked, in order, when a message carries no text.
const NON_TEXT_CONTENT_KEYS: [&str; 9] = [
    "document",
    "audio",
    "photo",
    "sticker",
    "video",
    "video_note",
    "voice",
    "location",
    "contact",
];

/// Normalizes one `getUpdates` row into a chat event.
///
/// Only `message` updates are supported; edited messages, channel posts and
/// membership updates surface as [`TelegramIngressReasonCode::MissingMessage`]
/// so the poll loop can skip them while still advancing its offset.
pub fn parse_telegram_update(update: &Value) -> Result<ChatEvent, TelegramIngressParseError> {
    let update_object = as_object(
        update,
        TelegramIngressReasonCode::InvalidFieldType,
        "update must be a JSON object",
    )?;
    let update_id = required_u64_field(
        update_object,
        "update_id",
        TelegramIngressReasonCode::MissingField,
        "update.update_id",
    )?;
    let message = object_field(
        update_object,
        "message",
        TelegramIngressReasonCode::MissingMessage,
        "update.message",
    )?;
    let chat = object_field(
        message,
        "chat",
        TelegramIngressReasonCode::MissingField,
        "update.message.chat",
    )?;
    let from = object_field(
        message,
        "from",
        TelegramIngressReasonCode::MissingField,
        "update.message.from",
    )?;

    let timestamp_secs = required_u64_field(
        message,
        "date",
        TelegramIngressReasonCode::InvalidTimestamp,
        "update.message.date",
    )?;

    let content = match optional_string_field(message, "text") {
        Some(text) => ChatContent::Text(text),
        None => ChatContent::Unsupported {
            kind: detect_content_kind(message),
        },
    };

    let event = ChatEvent {
        update_id,
        chat_id: required_string_field(
            chat,
            "id",
            TelegramIngressReasonCode::MissingField,
            "update.message.chat.id",
        )?,
        sender_id: required_string_field(
            from,
            "id",
            TelegramIngressReasonCode::MissingField,
            "update.message.from.id",
        )?,
        sender_display: optional_string_field(from, "username")
            .or_else(|| optional_string_field(from, "first_name"))
            .unwrap_or_default(),
        timestamp_ms: timestamp_secs.saturating_mul(1000),
        content,
    };

    validate_chat_event(&event).map_err(|error| {
        parse_error(
            TelegramIngressReasonCode::InvalidNormalizedEvent,
            error.to_string(),
        )
    })?;
    Ok(event)
}

fn detect_content_kind(message: &Map<String, Value>) -> String {
    NON_TEXT_CONTENT_KEYS
        .iter()
        .find(|key| message.contains_key(**key))
        .map(|key| (*key).to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn as_object<'a>(
    value: &'a Value,
    code: TelegramIngressReasonCode,
    detail: &str,
) -> Result<&'a Map<String, Value>, TelegramIngressParseError> {
    value.as_object().ok_or_else(|| parse_error(code, detail))
}

fn object_field<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    code: TelegramIngressReasonCode,
    field_name: &str,
) -> Result<&'a Map<String, Value>, TelegramIngressParseError> {
    let value = parent
        .get(key)
        .ok_or_else(|| parse_error(code, format!("{field_name} is required")))?;
    as_object(
        value,
        TelegramIngressReasonCode::InvalidFieldType,
        &format!("{field_name} must be an object"),
    )
}

fn required_string_field(
    object: &Map<String, Value>,
    key: &str,
    code: TelegramIngressReasonCode,
    field_name: &str,
) -> Result<String, TelegramIngressParseError> {
    let parsed = optional_string_field(object, key);
    let Some(parsed) = parsed else {
        return Err(parse_error(code, format!("{field_name} is required")));
    };
    if parsed.trim().is_empty() {
        return Err(parse_error(code, format!("{field_name} cannot be empty")));
    }
    Ok(parsed)
}

fn required_u64_field(
    object: &Map<String, Value>,
    key: &str,
    code: TelegramIngressReasonCode,
    field_name: &str,
) -> Result<u64, TelegramIngressParseError> {
    let parsed = optional_u64_value(object.get(key));
    let Some(parsed) = parsed else {
        return Err(parse_error(code, format!("{field_name} is required")));
    };
    if parsed == 0 {
        return Err(parse_error(
            code,
            format!("{field_name} must be greater than 0"),
        ));
    }
    Ok(parsed)
}

fn optional_string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let value = object.get(key)?;
    match value {
        Value::String(raw) => Some(raw.trim().to_string()),
        Value::Number(raw) => Some(raw.to_string()),
        _ => None,
    }
}

fn optional_u64_value(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    match value {
        Value::Number(raw) => raw.as_u64(),
        Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn parse_error(
    code: TelegramIngressReasonCode,
    message: impl Into<String>,
) -> TelegramIngressParseError {
    TelegramIngressParseError {
        code,
        message: message.into(),
    }
}
