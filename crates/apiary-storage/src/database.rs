//! SQLite-backed `Database` handle with durable persistence.

use crate::{FamilyDraft, FamilyRecord, KeeperProfile, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Single owned storage handle, opened once at startup and cloned wherever
/// storage access is needed. All access goes through one connection guarded
/// by a mutex, so concurrent callers serialize at this boundary.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Self::from_connection(connection)
    }

    /// Opens an in-memory database; used by tests and local experiments.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> StoreResult<Self> {
        initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| StoreError::HandlePoisoned)
    }

    /// Inserts or replaces the profile row keyed by `user_id`.
    /// Re-registration overwrites the previous profile.
    pub fn upsert_keeper(&self, profile: &KeeperProfile) -> StoreResult<()> {
        let connection = self.connection()?;
        connection.execute(
            r#"
            INSERT OR REPLACE INTO keepers (user_id, first_name, last_name, position, password)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                profile.user_id,
                profile.first_name,
                profile.last_name,
                profile.position,
                profile.password,
            ],
        )?;
        Ok(())
    }

    pub fn find_keeper(&self, user_id: i64) -> StoreResult<Option<KeeperProfile>> {
        let connection = self.connection()?;
        let profile = connection
            .query_row(
                r#"
                SELECT user_id, first_name, last_name, position, password
                FROM keepers
                WHERE user_id = ?1
                "#,
                params![user_id],
                |row| {
                    Ok(KeeperProfile {
                        user_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        position: row.get(3)?,
                        password: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Inserts a family row and returns the generated id.
    pub fn insert_family(&self, draft: &FamilyDraft) -> StoreResult<i64> {
        let connection = self.connection()?;
        connection.execute(
            r#"
            INSERT INTO families (family_number, birth_year, breed, species)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                draft.family_number,
                draft.birth_year,
                draft.breed,
                draft.species,
            ],
        )?;
        Ok(connection.last_insert_rowid())
    }

    /// Returns the first family with the given number, lowest id when
    /// duplicates exist, or `None`.
    pub fn find_family_by_number(&self, family_number: &str) -> StoreResult<Option<FamilyRecord>> {
        let connection = self.connection()?;
        let record = connection
            .query_row(
                r#"
                SELECT id, family_number, birth_year, breed, species
                FROM families
                WHERE family_number = ?1
                ORDER BY id
                LIMIT 1
                "#,
                params![family_number],
                |row| {
                    Ok(FamilyRecord {
                        id: row.get(0)?,
                        family_number: row.get(1)?,
                        birth_year: row.get(2)?,
                        breed: row.get(3)?,
                        species: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Deletes exactly one family with the given number (lowest id when
    /// duplicates exist). Returns whether a row was found and removed.
    pub fn delete_family_by_number(&self, family_number: &str) -> StoreResult<bool> {
        let connection = self.connection()?;
        let removed = connection.execute(
            r#"
            DELETE FROM families
            WHERE id = (
                SELECT id FROM families WHERE family_number = ?1 ORDER BY id LIMIT 1
            )
            "#,
            params![family_number],
        )?;
        Ok(removed > 0)
    }

    pub fn family_count(&self) -> StoreResult<i64> {
        let connection = self.connection()?;
        let count = connection.query_row("SELECT COUNT(*) FROM families", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS keepers (
            user_id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            position TEXT NOT NULL,
            password TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS families (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            family_number TEXT NOT NULL,
            birth_year INTEGER NOT NULL,
            breed TEXT NOT NULL,
            species TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile(user_id: i64) -> KeeperProfile {
        KeeperProfile {
            user_id,
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            position: "senior apiary keeper".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn sample_draft(family_number: &str, breed: &str) -> FamilyDraft {
        FamilyDraft {
            family_number: family_number.to_string(),
            birth_year: 2020,
            breed: breed.to_string(),
            species: "Apis mellifera".to_string(),
        }
    }

    #[test]
    fn unit_open_in_memory_initializes_schema() {
        let database = Database::open_in_memory().expect("open");
        assert_eq!(database.family_count().expect("count"), 0);
        assert!(database.find_keeper(100).expect("find").is_none());
    }

    #[test]
    fn functional_upsert_keeper_overwrites_existing_profile() {
        let database = Database::open_in_memory().expect("open");
        database.upsert_keeper(&sample_profile(100)).expect("insert");

        let mut replacement = sample_profile(100);
        replacement.position = "junior keeper".to_string();
        replacement.password = "swordfish".to_string();
        database.upsert_keeper(&replacement).expect("upsert");

        let stored = database.find_keeper(100).expect("find").expect("present");
        assert_eq!(stored, replacement);
    }

    #[test]
    fn functional_insert_family_returns_generated_id() {
        let database = Database::open_in_memory().expect("open");
        let draft = FamilyDraft {
            family_number: "12345".to_string(),
            birth_year: 2020,
            breed: "Карпатка".to_string(),
            species: "Медонос".to_string(),
        };
        let id = database.insert_family(&draft).expect("insert");
        assert!(id > 0);

        let stored = database
            .find_family_by_number("12345")
            .expect("find")
            .expect("present");
        assert_eq!(stored.id, id);
        assert_eq!(stored.birth_year, 2020);
        assert_eq!(stored.breed, "Карпатка");
        assert_eq!(stored.species, "Медонос");
    }

    #[test]
    fn unit_find_family_prefers_lowest_id_on_duplicates() {
        let database = Database::open_in_memory().expect("open");
        let first = database
            .insert_family(&sample_draft("77", "Carnica"))
            .expect("insert");
        database
            .insert_family(&sample_draft("77", "Buckfast"))
            .expect("insert");

        let found = database
            .find_family_by_number("77")
            .expect("find")
            .expect("present");
        assert_eq!(found.id, first);
        assert_eq!(found.breed, "Carnica");
    }

    #[test]
    fn functional_delete_family_removes_exactly_one_match() {
        let database = Database::open_in_memory().expect("open");
        database
            .insert_family(&sample_draft("77", "Carnica"))
            .expect("insert");
        database
            .insert_family(&sample_draft("77", "Buckfast"))
            .expect("insert");

        let found = database.delete_family_by_number("77").expect("delete");
        assert!(found);
        assert_eq!(database.family_count().expect("count"), 1);

        let remaining = database
            .find_family_by_number("77")
            .expect("find")
            .expect("present");
        assert_eq!(remaining.breed, "Buckfast");
    }

    #[test]
    fn functional_delete_family_missing_number_reports_not_found() {
        let database = Database::open_in_memory().expect("open");
        database
            .insert_family(&sample_draft("77", "Carnica"))
            .expect("insert");

        let found = database.delete_family_by_number("9999").expect("delete");
        assert!(!found);
        assert_eq!(database.family_count().expect("count"), 1);
    }

    #[test]
    fn functional_open_persists_across_reopen() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state").join("apiary.db");

        {
            let database = Database::open(&path).expect("open");
            database
                .insert_family(&sample_draft("501", "Carnica"))
                .expect("insert");
        }

        let reopened = Database::open(&path).expect("reopen");
        assert_eq!(reopened.family_count().expect("count"), 1);
    }
}
