// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `email_index`: normalized email → user_id
//! - `pending_funding`: user_id → () for users whose funding is `pending`
//!
//! redb runs one write transaction at a time, so checking `email_index` and
//! inserting inside the same write transaction makes email uniqueness hold
//! even for concurrent registrations.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::records::{FundingStatus, StoredUser};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: normalized email → user_id.
const EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index");

/// Funding queue: user_id of every user whose funding is `pending`.
const FUNDING_QUEUE: TableDefinition<&str, ()> = TableDefinition::new("pending_funding");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("email of user {0} cannot be changed")]
    EmailImmutable(String),
}

pub type UserDbResult<T> = Result<T, UserDbError>;

// =============================================================================
// UserDatabase
// =============================================================================

/// Embedded ACID user database.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> UserDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(FUNDING_QUEUE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new user.
    ///
    /// Fails with `AlreadyExists` if the email or id is taken; nothing is
    /// written in that case.
    pub fn insert(&self, user: &StoredUser) -> UserDbResult<()> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut email_idx = write_txn.open_table(EMAIL_INDEX)?;
            if email_idx.get(user.email.as_str())?.is_some() {
                return Err(UserDbError::AlreadyExists(format!("Email {}", user.email)));
            }

            let mut users = write_txn.open_table(USERS)?;
            if users.get(user.id.as_str())?.is_some() {
                return Err(UserDbError::AlreadyExists(format!("User {}", user.id)));
            }

            users.insert(user.id.as_str(), json.as_slice())?;
            email_idx.insert(user.email.as_str(), user.id.as_str())?;
        }
        sync_funding_queue(&write_txn, user)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user by id.
    pub fn get_by_id(&self, user_id: &str) -> UserDbResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by (already normalized) email.
    pub fn get_by_email(&self, email: &str) -> UserDbResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let email_idx = read_txn.open_table(EMAIL_INDEX)?;
        let user_id = match email_idx.get(email)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(user_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Whether an email is already registered.
    pub fn email_exists(&self, email: &str) -> UserDbResult<bool> {
        let read_txn = self.db.begin_read()?;
        let email_idx = read_txn.open_table(EMAIL_INDEX)?;
        Ok(email_idx.get(email)?.is_some())
    }

    /// Read-modify-write a user inside one write transaction.
    ///
    /// `updated_at` is bumped automatically. Changing the email is rejected.
    pub fn update<F>(&self, user_id: &str, apply: F) -> UserDbResult<StoredUser>
    where
        F: FnOnce(&mut StoredUser),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(USERS)?;

            let existing_bytes = {
                let existing = table
                    .get(user_id)?
                    .ok_or_else(|| UserDbError::NotFound(format!("User {user_id}")))?;
                existing.value().to_vec()
            };

            let mut user: StoredUser = serde_json::from_slice(&existing_bytes)?;
            let original_email = user.email.clone();
            apply(&mut user);
            if user.email != original_email {
                return Err(UserDbError::EmailImmutable(user_id.to_string()));
            }
            user.updated_at = Utc::now();

            let json = serde_json::to_vec(&user)?;
            table.insert(user_id, json.as_slice())?;
            user
        };
        sync_funding_queue(&write_txn, &updated)?;
        write_txn.commit()?;
        Ok(updated)
    }

    /// Set the funding status of a user.
    pub fn set_funding_status(&self, user_id: &str, status: FundingStatus) -> UserDbResult<StoredUser> {
        self.update(user_id, |user| user.funding = status)
    }

    /// All users whose on-chain funding is still pending.
    ///
    /// Reads the funding queue, so the cost follows the number of pending
    /// users rather than the size of the user table.
    pub fn list_pending_funding(&self) -> UserDbResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let queue = read_txn.open_table(FUNDING_QUEUE)?;
        let users = read_txn.open_table(USERS)?;

        let mut pending = Vec::new();
        for entry in queue.iter()? {
            let (user_id, _) = entry?;
            let Some(value) = users.get(user_id.value())? else {
                tracing::warn!(user_id = %user_id.value(), "Funding queue entry has no user record");
                continue;
            };
            match serde_json::from_slice::<StoredUser>(value.value()) {
                Ok(user) if user.funding == FundingStatus::Pending => pending.push(user),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable user record"),
            }
        }

        Ok(pending)
    }

    /// Number of entries in the funding queue.
    pub fn pending_funding_count(&self) -> UserDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let queue = read_txn.open_table(FUNDING_QUEUE)?;
        Ok(queue.iter()?.count() as u64)
    }

    /// Number of stored users.
    pub fn count(&self) -> UserDbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.iter()?.count() as u64)
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> UserDbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

/// Keep the funding queue in step with a user's funding status.
fn sync_funding_queue(write_txn: &WriteTransaction, user: &StoredUser) -> UserDbResult<()> {
    let mut queue = write_txn.open_table(FUNDING_QUEUE)?;
    if user.funding == FundingStatus::Pending {
        queue.insert(user.id.as_str(), ())?;
    } else {
        queue.remove(user.id.as_str())?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (UserDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("users.redb")).unwrap();
        (db, dir)
    }

    fn sample_user(email: &str) -> StoredUser {
        StoredUser::new(
            email.to_string(),
            "$2b$10$hash".to_string(),
            "Sample User".to_string(),
            Some("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string()),
            FundingStatus::NotRequested,
        )
    }

    #[test]
    fn insert_and_lookup() {
        let (db, _dir) = temp_db();
        let user = sample_user("a@x.com");
        db.insert(&user).unwrap();

        assert_eq!(db.get_by_id(&user.id).unwrap(), Some(user.clone()));
        assert_eq!(db.get_by_email("a@x.com").unwrap(), Some(user));
        assert!(db.email_exists("a@x.com").unwrap());
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn missing_user_is_none() {
        let (db, _dir) = temp_db();
        assert!(db.get_by_email("nobody@x.com").unwrap().is_none());
        assert!(db.get_by_id("nope").unwrap().is_none());
        assert!(!db.email_exists("nobody@x.com").unwrap());
    }

    #[test]
    fn duplicate_email_rejected_without_write() {
        let (db, _dir) = temp_db();
        db.insert(&sample_user("dup@x.com")).unwrap();

        let second = sample_user("dup@x.com");
        let result = db.insert(&second);
        assert!(matches!(result, Err(UserDbError::AlreadyExists(_))));
        assert!(db.get_by_id(&second.id).unwrap().is_none());
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn concurrent_inserts_keep_email_unique() {
        let (db, _dir) = temp_db();
        let db = std::sync::Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.insert(&sample_user("race@x.com")).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn update_bumps_updated_at() {
        let (db, _dir) = temp_db();
        let user = sample_user("u@x.com");
        db.insert(&user).unwrap();

        let now = Utc::now();
        let updated = db
            .update(&user.id, |u| u.last_login_at = Some(now))
            .unwrap();
        assert_eq!(updated.last_login_at, Some(now));
        assert!(updated.updated_at >= user.updated_at);

        let reloaded = db.get_by_id(&user.id).unwrap().unwrap();
        assert_eq!(reloaded.last_login_at, Some(now));
    }

    #[test]
    fn update_rejects_email_change() {
        let (db, _dir) = temp_db();
        let user = sample_user("fixed@x.com");
        db.insert(&user).unwrap();

        let result = db.update(&user.id, |u| u.email = "other@x.com".to_string());
        assert!(matches!(result, Err(UserDbError::EmailImmutable(_))));
        assert!(db.get_by_email("fixed@x.com").unwrap().is_some());
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let (db, _dir) = temp_db();
        let result = db.update("ghost", |_| {});
        assert!(matches!(result, Err(UserDbError::NotFound(_))));
    }

    #[test]
    fn pending_funding_listing() {
        let (db, _dir) = temp_db();
        let mut pending = sample_user("p@x.com");
        pending.funding = FundingStatus::Pending;
        db.insert(&pending).unwrap();
        db.insert(&sample_user("n@x.com")).unwrap();

        let listed = db.list_pending_funding().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);

        db.set_funding_status(
            &pending.id,
            FundingStatus::Funded {
                tx_hash: "0x01".into(),
            },
        )
        .unwrap();
        assert!(db.list_pending_funding().unwrap().is_empty());
        assert_eq!(db.pending_funding_count().unwrap(), 0);
    }

    #[test]
    fn funding_queue_follows_status_changes() {
        let (db, _dir) = temp_db();
        for i in 0..5 {
            db.insert(&sample_user(&format!("n{i}@x.com"))).unwrap();
        }
        let mut user = sample_user("q@x.com");
        user.funding = FundingStatus::Pending;
        db.insert(&user).unwrap();
        assert_eq!(db.pending_funding_count().unwrap(), 1);

        db.set_funding_status(&user.id, FundingStatus::Submitting).unwrap();
        assert_eq!(db.pending_funding_count().unwrap(), 0);
        assert!(db.list_pending_funding().unwrap().is_empty());

        db.set_funding_status(&user.id, FundingStatus::Pending).unwrap();
        let listed = db.list_pending_funding().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, user.id);

        // Unrelated updates keep the entry.
        db.update(&user.id, |u| u.last_login_at = Some(Utc::now())).unwrap();
        assert_eq!(db.pending_funding_count().unwrap(), 1);
    }

    #[test]
    fn failed_insert_leaves_queue_untouched() {
        let (db, _dir) = temp_db();
        db.insert(&sample_user("dup@x.com")).unwrap();

        let mut second = sample_user("dup@x.com");
        second.funding = FundingStatus::Pending;
        assert!(db.insert(&second).is_err());
        assert_eq!(db.pending_funding_count().unwrap(), 0);
    }

    #[test]
    fn open_reports_unusable_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = UserDatabase::open(&blocker.join("users.redb"));
        assert!(matches!(result, Err(UserDbError::Io(_))));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.redb");
        let user = sample_user("keep@x.com");
        {
            let db = UserDatabase::open(&path).unwrap();
            db.insert(&user).unwrap();
        }
        let db = UserDatabase::open(&path).unwrap();
        assert_eq!(db.get_by_email("keep@x.com").unwrap(), Some(user));
        db.health_check().unwrap();
    }
}
