//! Flow-start trigger classification.
//!
//! Slash commands and quick-reply button labels both start flows, but with
//! different dispatch precedence: commands always win over an armed
//! continuation, button labels lose to it.

use crate::dialog_prompts::{
    BUTTON_ADD_FAMILY, BUTTON_DELETE_FAMILY, BUTTON_HELP, BUTTON_REGISTER, BUTTON_RESET,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates the flow-start signals the dispatcher understands.
pub enum FlowTrigger {
    Start,
    Help,
    Register,
    AddFamily,
    DeleteFamily,
}

impl FlowTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Register => "register",
            Self::AddFamily => "add_family",
            Self::DeleteFamily => "delete_family",
        }
    }
}

/// Parses a slash command into its trigger. Only the leading token counts,
/// and a `@botname` mention suffix is stripped before matching, so
/// "/reg@ApiaryBot" and "/add_family 77" both fire their flows.
pub fn parse_command(text: &str) -> Option<FlowTrigger> {
    let token = text.trim().split_whitespace().next()?;
    let command = token.split_once('@').map_or(token, |(command, _)| command);
    match command {
        "/start" => Some(FlowTrigger::Start),
        "/help" => Some(FlowTrigger::Help),
        "/reg" => Some(FlowTrigger::Register),
        "/add_family" => Some(FlowTrigger::AddFamily),
        "/delete_family" => Some(FlowTrigger::DeleteFamily),
        _ => None,
    }
}

/// Parses a quick-reply button label into its trigger. "Reset" behaves like
/// `/start`.
pub fn parse_button(text: &str) -> Option<FlowTrigger> {
    match text.trim() {
        BUTTON_HELP => Some(FlowTrigger::Help),
        BUTTON_REGISTER => Some(FlowTrigger::Register),
        BUTTON_RESET => Some(FlowTrigger::Start),
        BUTTON_ADD_FAMILY => Some(FlowTrigger::AddFamily),
        BUTTON_DELETE_FAMILY => Some(FlowTrigger::DeleteFamily),
        _ => None,
    }
}
