//! Pure dialog transitions.
//!
//! `transition` maps the current state and one inbound input to the next
//! state plus an ordered list of effects, without touching the session
//! store, the database, or the transport. The router applies the result;
//! this module stays unit-testable in isolation.

use crate::dialog_prompts as prompts;
use crate::dialog_session::FieldMap;
use crate::dialog_state::DialogState;
use crate::dialog_triggers::FlowTrigger;
use apiary_core::OutboundReply;
use apiary_storage::FamilyDraft;
use thiserror::Error;

pub const FIELD_FIRST_NAME: &str = "first_name";
pub const FIELD_LAST_NAME: &str = "last_name";
pub const FIELD_POSITION: &str = "position";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One inbound input as seen by the state machine, already classified by
/// the dispatch precedence rules.
pub enum DialogInput<'a> {
    /// A flow-start signal (slash command or button label).
    Trigger(FlowTrigger),
    /// Free text routed to the armed continuation, or ignored while idle.
    Text(&'a str),
    /// Content no flow understands; must not disturb an armed continuation.
    Unsupported { kind: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
/// Side effects the router executes in order after applying a transition.
pub enum DialogEffect {
    /// Send a reply to the chat.
    Reply(OutboundReply),
    /// Upsert the sender's keeper profile, then confirm.
    SaveProfile {
        first_name: String,
        last_name: String,
        position: String,
        password: String,
    },
    /// Insert a validated family row, then confirm.
    InsertFamily(FamilyDraft),
    /// Delete one family by number; the router replies found or not-found.
    DeleteFamily { family_number: String },
}

impl DialogEffect {
    fn reply(text: impl Into<String>) -> Self {
        Self::Reply(OutboundReply::text(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the session record changes when a transition is applied.
pub enum SessionDirective {
    /// Leave the session exactly as it is.
    Keep,
    /// Install a fresh session in the next state with empty fields.
    Begin,
    /// Move the active session to the next state, applying field writes.
    Advance,
    /// Remove the session.
    End,
}

#[derive(Debug, Clone, PartialEq)]
/// Result of one transition: the next state, how to apply it to the
/// session, field writes (meaningful only with `Advance`), and effects.
pub struct Transition {
    pub next: DialogState,
    pub directive: SessionDirective,
    pub field_writes: Vec<(&'static str, String)>,
    pub effects: Vec<DialogEffect>,
}

impl Transition {
    fn keep(state: DialogState) -> Self {
        Self {
            next: state,
            directive: SessionDirective::Keep,
            field_writes: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn begin(next: DialogState) -> Self {
        Self {
            next,
            directive: SessionDirective::Begin,
            field_writes: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn advance(next: DialogState) -> Self {
        Self {
            next,
            directive: SessionDirective::Advance,
            field_writes: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn end() -> Self {
        Self {
            next: DialogState::Idle,
            directive: SessionDirective::End,
            field_writes: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn with_field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.field_writes.push((name, value.into()));
        self
    }

    fn with_effect(mut self, effect: DialogEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors from transitions whose preconditions were violated upstream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The password step fired without the profile fields collected in the
    /// previous step. Only a routing or session-store bug can cause this.
    #[error("password step fired without collected field '{0}'")]
    MissingProfileField(&'static str),
}

/// Maps `(state, input)` to the next state and effects. Total over all
/// state/input combinations; the only error is a violated precondition.
pub fn transition(
    state: DialogState,
    fields: &FieldMap,
    input: DialogInput<'_>,
) -> Result<Transition, TransitionError> {
    match input {
        DialogInput::Trigger(trigger) => Ok(apply_trigger(state, trigger)),
        DialogInput::Unsupported { .. } => Ok(Transition::keep(state)
            .with_effect(DialogEffect::reply(prompts::UNSUPPORTED_CONTENT))),
        DialogInput::Text(text) => match state {
            DialogState::Idle => Ok(Transition::keep(DialogState::Idle)),
            DialogState::AwaitingProfile => Ok(profile_step(text)),
            DialogState::AwaitingPassword => password_step(fields, text),
            DialogState::AwaitingFamilyDetails => Ok(family_details_step(text)),
            DialogState::AwaitingDeleteNumber => Ok(delete_number_step(text)),
        },
    }
}

fn apply_trigger(state: DialogState, trigger: FlowTrigger) -> Transition {
    match trigger {
        FlowTrigger::Start => Transition::end().with_effect(DialogEffect::Reply(
            OutboundReply::with_keyboard(prompts::GREETING, prompts::main_keyboard()),
        )),
        FlowTrigger::Help => {
            Transition::keep(state).with_effect(DialogEffect::reply(prompts::HELP))
        }
        FlowTrigger::Register => Transition::begin(DialogState::AwaitingProfile)
            .with_effect(DialogEffect::reply(prompts::REGISTRATION_PROMPT)),
        FlowTrigger::AddFamily => Transition::begin(DialogState::AwaitingFamilyDetails)
            .with_effect(DialogEffect::reply(prompts::FAMILY_PROMPT)),
        FlowTrigger::DeleteFamily => Transition::begin(DialogState::AwaitingDeleteNumber)
            .with_effect(DialogEffect::reply(prompts::DELETE_PROMPT)),
    }
}

/// Registration step 1. At least three whitespace-separated tokens: first
/// name, last name, and everything else joined as the position. Invalid
/// input re-arms the same step, with no retry limit.
fn profile_step(text: &str) -> Transition {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return Transition::keep(DialogState::AwaitingProfile)
            .with_effect(DialogEffect::reply(prompts::REGISTRATION_FORMAT_ERROR));
    }

    Transition::advance(DialogState::AwaitingPassword)
        .with_field(FIELD_FIRST_NAME, tokens[0])
        .with_field(FIELD_LAST_NAME, tokens[1])
        .with_field(FIELD_POSITION, tokens[2..].join(" "))
        .with_effect(DialogEffect::reply(prompts::PASSWORD_PROMPT))
}

/// Registration step 2. Any non-empty trimmed text is the password; the
/// profile is saved before the completion notice goes out.
fn password_step(fields: &FieldMap, text: &str) -> Result<Transition, TransitionError> {
    let password = text.trim();
    if password.is_empty() {
        return Ok(Transition::keep(DialogState::AwaitingPassword)
            .with_effect(DialogEffect::reply(prompts::PASSWORD_EMPTY_ERROR)));
    }

    let field = |name: &'static str| -> Result<String, TransitionError> {
        fields
            .get(name)
            .cloned()
            .ok_or(TransitionError::MissingProfileField(name))
    };

    Ok(Transition::end()
        .with_effect(DialogEffect::SaveProfile {
            first_name: field(FIELD_FIRST_NAME)?,
            last_name: field(FIELD_LAST_NAME)?,
            position: field(FIELD_POSITION)?,
            password: password.to_string(),
        })
        .with_effect(DialogEffect::reply(prompts::REGISTRATION_COMPLETE)))
}

/// Family-add continuation. Exactly four comma-separated segments with an
/// integer birth year; any failure terminates the flow without re-arming.
fn family_details_step(text: &str) -> Transition {
    let segments: Vec<&str> = text.split(',').map(str::trim).collect();
    if segments.len() != 4 {
        return Transition::end().with_effect(DialogEffect::reply(prompts::FAMILY_FORMAT_ERROR));
    }

    let birth_year: i64 = match segments[1].parse() {
        Ok(year) => year,
        Err(_) => {
            return Transition::end().with_effect(DialogEffect::reply(prompts::FAMILY_YEAR_ERROR));
        }
    };

    let family_number = segments[0].to_string();
    let confirmation = prompts::family_added(&family_number);
    Transition::end()
        .with_effect(DialogEffect::InsertFamily(FamilyDraft {
            family_number,
            birth_year,
            breed: segments[2].to_string(),
            species: segments[3].to_string(),
        }))
        .with_effect(DialogEffect::reply(confirmation))
}

/// Family-delete continuation. The trimmed text is the family number; the
/// router resolves found versus not-found.
fn delete_number_step(text: &str) -> Transition {
    Transition::end().with_effect(DialogEffect::DeleteFamily {
        family_number: text.trim().to_string(),
    })
}
