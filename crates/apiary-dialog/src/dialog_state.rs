//! Conversation states for the dialog finite-state machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// Enumerates the per-chat conversation states. `Idle` means no session
/// exists; every other state arms a continuation for the next text message.
pub enum DialogState {
    #[default]
    Idle,
    /// Registration step 1: waiting for name, surname and position.
    AwaitingProfile,
    /// Registration step 2: waiting for a password.
    AwaitingPassword,
    /// Family-add: waiting for the comma-separated family line.
    AwaitingFamilyDetails,
    /// Family-delete: waiting for the family number.
    AwaitingDeleteNumber,
}

impl DialogState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingProfile => "awaiting_profile",
            Self::AwaitingPassword => "awaiting_password",
            Self::AwaitingFamilyDetails => "awaiting_family_details",
            Self::AwaitingDeleteNumber => "awaiting_delete_number",
        }
    }

    /// True when a continuation is armed for the chat.
    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_state_labels_are_stable() {
        assert_eq!(DialogState::Idle.as_str(), "idle");
        assert_eq!(DialogState::AwaitingPassword.as_str(), "awaiting_password");
        assert_eq!(
            DialogState::AwaitingFamilyDetails.as_str(),
            "awaiting_family_details"
        );
    }

    #[test]
    fn unit_only_idle_is_unarmed() {
        assert!(!DialogState::Idle.is_armed());
        assert!(DialogState::AwaitingProfile.is_armed());
        assert!(DialogState::AwaitingDeleteNumber.is_armed());
    }
}
