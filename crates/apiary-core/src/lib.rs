//! Foundational types shared across apiary crates.
//!
//! Defines the transport-neutral chat contract (inbound events, outbound
//! replies, quick-reply keyboards) consumed by the dialog layer and produced
//! by the transport layer.

pub mod chat_contract;

pub use chat_contract::{
    validate_chat_event, ChatContent, ChatEvent, OutboundReply, ReplyKeyboard,
};
