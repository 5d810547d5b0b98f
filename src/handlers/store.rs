use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// One user, as defined by `#/definitions/User`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_status: Option<i32>,
}

impl UserRecord {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: None,
            last_name: None,
            email: None,
            password: None,
            phone: None,
            user_status: None,
        }
    }
}

/// Result of [`UserStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    UsernameTaken,
}

/// In-memory user table keyed by username.
///
/// Readers share the lock; create/update/delete take it exclusively. A poisoned
/// lock is recovered since every write leaves the map consistent.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the sample user `user1`.
    pub fn seeded() -> Self {
        let store = Self::new();
        let mut user1 = UserRecord::new(123, "user1");
        user1.first_name = Some("User1".to_string());
        user1.last_name = Some("Lastname".to_string());
        user1.email = Some("user1@example.com".to_string());
        user1.user_status = Some(1);
        store.upsert(user1);
        store
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned()
    }

    /// Insert or replace by username. Returns true if a record was replaced.
    pub fn upsert(&self, record: UserRecord) -> bool {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        debug!(username = %record.username, "User stored");
        users.insert(record.username.clone(), record).is_some()
    }

    /// Insert all records under one write lock.
    pub fn upsert_all(&self, records: Vec<UserRecord>) -> usize {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let count = records.len();
        for record in records {
            users.insert(record.username.clone(), record);
        }
        debug!(count = count, "Users stored");
        count
    }

    /// Replace the record stored under `username`; the new record may rename it,
    /// unless another user already holds the new name.
    pub fn update(&self, username: &str, record: UserRecord) -> UpdateOutcome {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if !users.contains_key(username) {
            return UpdateOutcome::NotFound;
        }
        if record.username != username && users.contains_key(&record.username) {
            return UpdateOutcome::UsernameTaken;
        }
        users.remove(username);
        users.insert(record.username.clone(), record);
        UpdateOutcome::Updated
    }

    pub fn remove(&self, username: &str) -> Option<UserRecord> {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(username)
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
