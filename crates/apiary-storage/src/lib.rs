//! Persistence gateway over SQLite.
//!
//! Owns the single database handle for the process and exposes typed
//! operations for the two record kinds: keeper profiles and bee families.
//! Callers receive `StoreResult` values; no SQL leaves this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod database;

pub use database::Database;

/// Result type for persistence gateway operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage handle mutex poisoned")]
    HandlePoisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Registered keeper profile, keyed by the transport user id.
pub struct KeeperProfile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Stored bee family row. `family_number` is free text and not unique.
pub struct FamilyRecord {
    pub id: i64,
    pub family_number: String,
    pub birth_year: i64,
    pub breed: String,
    pub species: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Validated family fields ready for insertion.
pub struct FamilyDraft {
    pub family_number: String,
    pub birth_year: i64,
    pub breed: String,
    pub species: String,
}
