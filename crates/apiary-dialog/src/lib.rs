//! Conversation core for the apiary assistant.
//!
//! Holds the per-chat session store, the dialog state machine with its pure
//! transition function, the reply texts, and the router that ties them to
//! the persistence gateway. Everything here is transport-neutral: inbound
//! events come in as `apiary_core::ChatEvent`, replies go out as
//! `apiary_core::OutboundReply`.

pub mod dialog_prompts;
pub mod dialog_router;
pub mod dialog_session;
pub mod dialog_state;
pub mod dialog_transition;
pub mod dialog_triggers;

pub use dialog_router::{DialogOutcome, DialogRouter};
pub use dialog_session::{DialogSession, FieldMap, SessionStore, SessionStoreError};
pub use dialog_state::DialogState;
pub use dialog_transition::{
    transition, DialogEffect, DialogInput, SessionDirective, Transition, TransitionError,
};
pub use dialog_triggers::{parse_button, parse_command, FlowTrigger};
