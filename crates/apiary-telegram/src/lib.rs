//! Telegram transport for the apiary assistant.
//!
//! Wraps the Bot API behind a retrying HTTP client, normalizes `getUpdates`
//! rows into transport-neutral chat events, and hosts the long-poll runtime
//! that feeds those events to the dialog layer and delivers its replies.

pub mod telegram_api_client;
pub mod telegram_ingress;
pub mod telegram_runtime;

pub use telegram_api_client::{TelegramApiClient, TelegramDeliveredReply};
pub use telegram_ingress::{
    parse_telegram_update, TelegramIngressParseError, TelegramIngressReasonCode,
};
pub use telegram_runtime::{
    TelegramPollReport, TelegramRuntime, TelegramRuntimeConfig, DEFAULT_TELEGRAM_API_BASE,
};
