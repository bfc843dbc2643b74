//! Inbound event routing and effect execution.
//!
//! Dispatch precedence, highest first: slash commands, the armed
//! continuation for the sender's chat, quick-reply button labels. Non-text
//! content gets the fixed fallback reply and never touches session state.
//! Handling for one chat is serialized with a per-chat guard; distinct
//! chats proceed in parallel.

use crate::dialog_prompts as prompts;
use crate::dialog_session::{FieldMap, SessionStore};
use crate::dialog_state::DialogState;
use crate::dialog_transition::{transition, DialogEffect, DialogInput, SessionDirective};
use crate::dialog_triggers::{parse_button, parse_command};
use anyhow::{Context, Result};
use apiary_core::{validate_chat_event, ChatContent, ChatEvent, OutboundReply};
use apiary_storage::{Database, KeeperProfile};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq)]
/// Outcome of handling one inbound event: replies to deliver, in order,
/// and the chat's state after the transition.
pub struct DialogOutcome {
    pub replies: Vec<OutboundReply>,
    pub state_after: DialogState,
}

/// Routes inbound chat events through the state machine and runs the
/// resulting effects against the persistence gateway.
pub struct DialogRouter {
    database: Database,
    sessions: Arc<SessionStore>,
    chat_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DialogRouter {
    pub fn new(database: Database, sessions: Arc<SessionStore>) -> Self {
        Self {
            database,
            sessions,
            chat_guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Handles one inbound event end to end: classify, transition, apply
    /// the session change, run effects. Returns the replies to send.
    pub fn handle_event(&self, event: &ChatEvent) -> Result<DialogOutcome> {
        validate_chat_event(event)?;

        let guard = self.chat_guard(&event.chat_id);
        let _serialized = guard.lock().unwrap_or_else(PoisonError::into_inner);

        let chat_id = event.chat_id.as_str();
        let state = self.sessions.state(chat_id);

        let input = match &event.content {
            ChatContent::Unsupported { kind } => {
                debug!(chat_id, kind, state = state.as_str(), "unsupported content");
                DialogInput::Unsupported { kind }
            }
            ChatContent::Text(text) => {
                if let Some(trigger) = parse_command(text) {
                    debug!(chat_id, trigger = trigger.as_str(), "slash command");
                    DialogInput::Trigger(trigger)
                } else if state.is_armed() {
                    DialogInput::Text(text)
                } else if let Some(trigger) = parse_button(text) {
                    debug!(chat_id, trigger = trigger.as_str(), "button label");
                    DialogInput::Trigger(trigger)
                } else {
                    debug!(chat_id, "ignoring unmatched text while idle");
                    return Ok(DialogOutcome {
                        replies: Vec::new(),
                        state_after: state,
                    });
                }
            }
        };

        let fields = if state.is_armed() {
            self.sessions
                .fields(chat_id)
                .with_context(|| format!("armed state {} lost its session", state.as_str()))?
        } else {
            FieldMap::new()
        };

        let step = match transition(state, &fields, input) {
            Ok(step) => step,
            Err(violation) => {
                error!(chat_id, %violation, "dialog invariant violated; resetting chat");
                self.sessions.end(chat_id);
                return Ok(DialogOutcome {
                    replies: vec![OutboundReply::text(prompts::INTERNAL_ERROR)],
                    state_after: DialogState::Idle,
                });
            }
        };

        match step.directive {
            SessionDirective::Keep => {}
            SessionDirective::Begin => self.sessions.begin(chat_id, step.next),
            SessionDirective::Advance => {
                for (name, value) in &step.field_writes {
                    self.sessions
                        .set_field(chat_id, name, value.clone())
                        .with_context(|| format!("recording field '{name}'"))?;
                }
                self.sessions
                    .advance(chat_id, step.next)
                    .with_context(|| format!("advancing to {}", step.next.as_str()))?;
            }
            SessionDirective::End => {
                if let Some(discarded) = self.sessions.end(chat_id) {
                    debug!(
                        chat_id,
                        state = discarded.state.as_str(),
                        "session ended"
                    );
                }
            }
        }

        let replies = self.run_effects(event, step.effects);
        Ok(DialogOutcome {
            replies,
            state_after: self.sessions.state(chat_id),
        })
    }

    /// Runs effects in order. A failed storage effect logs, replies with
    /// the failure notice, and drops the remaining effects so a success
    /// confirmation is never sent without a commit behind it.
    fn run_effects(&self, event: &ChatEvent, effects: Vec<DialogEffect>) -> Vec<OutboundReply> {
        let chat_id = event.chat_id.as_str();
        let mut replies = Vec::new();

        for effect in effects {
            match effect {
                DialogEffect::Reply(reply) => replies.push(reply),
                DialogEffect::SaveProfile {
                    first_name,
                    last_name,
                    position,
                    password,
                } => {
                    let saved = self.save_profile(event, first_name, last_name, position, password);
                    if let Err(cause) = saved {
                        error!(chat_id, %cause, "keeper profile save failed");
                        replies.push(OutboundReply::text(prompts::STORAGE_FAILURE));
                        break;
                    }
                }
                DialogEffect::InsertFamily(draft) => {
                    match self.database.insert_family(&draft) {
                        Ok(family_id) => {
                            info!(
                                chat_id,
                                family_id,
                                family_number = draft.family_number.as_str(),
                                "bee family added"
                            );
                        }
                        Err(cause) => {
                            error!(chat_id, %cause, "bee family insert failed");
                            replies.push(OutboundReply::text(prompts::STORAGE_FAILURE));
                            break;
                        }
                    }
                }
                DialogEffect::DeleteFamily { family_number } => {
                    match self.database.delete_family_by_number(&family_number) {
                        Ok(true) => {
                            info!(
                                chat_id,
                                family_number = family_number.as_str(),
                                "bee family deleted"
                            );
                            replies.push(OutboundReply::text(prompts::family_deleted(
                                &family_number,
                            )));
                        }
                        Ok(false) => {
                            debug!(
                                chat_id,
                                family_number = family_number.as_str(),
                                "delete target not found"
                            );
                            replies.push(OutboundReply::text(prompts::family_not_found(
                                &family_number,
                            )));
                        }
                        Err(cause) => {
                            error!(chat_id, %cause, "bee family delete failed");
                            replies.push(OutboundReply::text(prompts::STORAGE_FAILURE));
                            break;
                        }
                    }
                }
            }
        }

        replies
    }

    fn save_profile(
        &self,
        event: &ChatEvent,
        first_name: String,
        last_name: String,
        position: String,
        password: String,
    ) -> Result<()> {
        let user_id: i64 = event
            .sender_id
            .trim()
            .parse()
            .with_context(|| format!("sender id '{}' is not numeric", event.sender_id))?;

        self.database.upsert_keeper(&KeeperProfile {
            user_id,
            first_name,
            last_name,
            position,
            password,
        })?;
        info!(chat_id = event.chat_id.as_str(), user_id, "keeper profile saved");
        Ok(())
    }

    fn chat_guard(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut guards = self
            .chat_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let guard = guards.entry(chat_id.to_string()).or_default().clone();
        // An entry owned only by the map has no handler in flight; drop it
        // so the map tracks just the chats being handled right now.
        guards.retain(|_, entry| Arc::strong_count(entry) > 1);
        guard
    }

    #[cfg(test)]
    pub(crate) fn chat_guard_count(&self) -> usize {
        self.chat_guards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
