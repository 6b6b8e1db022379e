//! # Redis
//!
//! Document store for accounts and exercise history.
//!
//! ## Layout
//!
//! - `users`: hash, account id -> account JSON
//! - `users:email`, `users:student_id`, `users:consultant_id`: hashes, value -> account id
//! - `progress:{userId}`: list of progress record JSON, append order
//!
//! ## Uniqueness
//!
//! Index entries are claimed with `HSETNX` before the account itself is written.
//! A failed claim releases whatever was already claimed, so two registrations
//! racing for the same email cannot both succeed.
//!
//! ## Updates
//!
//! Accounts are rewritten as whole documents, so every rewrite goes through
//! [`Database::update_account`], which holds `lock:users:{id}` (`SET NX PX`,
//! released by a compare-and-delete script) around the read-modify-write.
//!
//! ## Memory backend
//!
//! `REDIS_URL=memory` swaps Redis for a process-local map with the same
//! semantics. Tests run against it.
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
    time::Duration,
};

use chrono::Utc;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use tokio::{sync::RwLock, time::sleep};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Account, ProgressRecord, ProgressSummary, Role},
};

pub const MEMORY_URL: &str = "memory";

const USERS: &str = "users";
const EMAIL_INDEX: &str = "users:email";
const STUDENT_ID_INDEX: &str = "users:student_id";
const CONSULTANT_ID_INDEX: &str = "users:consultant_id";

const LOCK_TTL_MS: u64 = 5_000;
const LOCK_ATTEMPTS: u32 = 200;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

static RELEASE_LOCK: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            return redis.call('DEL', KEYS[1])
        end
        return 0
        ",
    )
});

fn progress_key(user_id: &Uuid) -> String {
    format!("progress:{user_id}")
}

fn lock_key(user_id: &Uuid) -> String {
    format!("lock:users:{user_id}")
}

async fn acquire_lock(
    connection: &mut ConnectionManager,
    lock: &str,
    token: &str,
    user_id: &Uuid,
) -> Result<(), AppError> {
    for _ in 0..LOCK_ATTEMPTS {
        let acquired: Option<String> = redis::cmd("SET")
            .arg(lock)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(LOCK_TTL_MS)
            .query_async(connection)
            .await?;

        if acquired.is_some() {
            return Ok(());
        }

        sleep(LOCK_RETRY_DELAY).await;
    }

    Err(AppError::LockTimeout(*user_id))
}

/// Parses a stored account, applies `update`, touches `updatedAt` and
/// returns the account with its new JSON.
fn apply_update<F>(json: &str, update: F) -> Result<(Account, String), AppError>
where
    F: FnOnce(&mut Account),
{
    let mut account: Account = serde_json::from_str(json)?;
    update(&mut account);
    account.user.updated_at = Utc::now();

    let json = serde_json::to_string(&account)?;
    Ok((account, json))
}

#[derive(Default)]
pub struct MemoryStore {
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
}

#[derive(Clone)]
pub enum Database {
    Redis(ConnectionManager),
    Memory(Arc<RwLock<MemoryStore>>),
}

pub async fn init_database(redis_url: &str) -> Result<Database, AppError> {
    if redis_url == MEMORY_URL {
        info!("Using in-memory store");
        return Ok(Database::memory());
    }

    let client = Client::open(redis_url)?;
    let connection_manager = ConnectionManager::new(client).await?;

    info!("Connected to Redis");
    Ok(Database::Redis(connection_manager))
}

impl Database {
    pub fn memory() -> Self {
        Database::Memory(Arc::new(RwLock::new(MemoryStore::default())))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                Ok(connection.hget(key, field).await?)
            }
            Database::Memory(store) => Ok(store
                .read()
                .await
                .hashes
                .get(key)
                .and_then(|hash| hash.get(field))
                .cloned()),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                let _: () = connection.hset(key, field, value).await?;
            }
            Database::Memory(store) => {
                store
                    .write()
                    .await
                    .hashes
                    .entry(key.to_string())
                    .or_default()
                    .insert(field.to_string(), value.to_string());
            }
        }

        Ok(())
    }

    /// True when the field was free and is now ours.
    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> Result<bool, AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                Ok(connection.hset_nx(key, field, value).await?)
            }
            Database::Memory(store) => {
                let mut store = store.write().await;
                let hash = store.hashes.entry(key.to_string()).or_default();

                if hash.contains_key(field) {
                    return Ok(false);
                }

                hash.insert(field.to_string(), value.to_string());
                Ok(true)
            }
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<(), AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                let _: () = connection.hdel(key, field).await?;
            }
            Database::Memory(store) => {
                if let Some(hash) = store.write().await.hashes.get_mut(key) {
                    hash.remove(field);
                }
            }
        }

        Ok(())
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>, AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                Ok(connection.hvals(key).await?)
            }
            Database::Memory(store) => Ok(store
                .read()
                .await
                .hashes
                .get(key)
                .map(|hash| hash.values().cloned().collect())
                .unwrap_or_default()),
        }
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                let _: () = connection.rpush(key, value).await?;
            }
            Database::Memory(store) => {
                store
                    .write()
                    .await
                    .lists
                    .entry(key.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        Ok(())
    }

    async fn lrange_all(&self, key: &str) -> Result<Vec<String>, AppError> {
        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                Ok(connection.lrange(key, 0, -1).await?)
            }
            Database::Memory(store) => Ok(store
                .read()
                .await
                .lists
                .get(key)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn claim_indexes(&self, account: &Account) -> Result<(), AppError> {
        let id = account.user.id.to_string();
        let user = &account.user;

        let indexes = [
            (EMAIL_INDEX, Some(&user.email), "Email"),
            (STUDENT_ID_INDEX, user.student_id.as_ref(), "Student ID"),
            (CONSULTANT_ID_INDEX, user.consultant_id.as_ref(), "Consultant ID"),
        ];

        let mut claimed = Vec::new();

        for (index, value, label) in indexes {
            let Some(value) = value else {
                continue;
            };

            if !self.hset_nx(index, value, &id).await? {
                for (index, value) in claimed.drain(..) {
                    self.hdel(index, value).await?;
                }
                return Err(AppError::Duplicate(label));
            }

            claimed.push((index, value));
        }

        Ok(())
    }

    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        self.claim_indexes(account).await?;

        let json = serde_json::to_string(account)?;
        self.hset(USERS, &account.user.id.to_string(), &json).await
    }

    /// Read-modify-write of one stored account under its lock. `None` when
    /// the account does not exist.
    pub async fn update_account<F>(
        &self,
        id: &Uuid,
        update: F,
    ) -> Result<Option<Account>, AppError>
    where
        F: FnOnce(&mut Account),
    {
        let field = id.to_string();

        match self {
            Database::Redis(connection) => {
                let mut connection = connection.clone();
                let lock = lock_key(id);
                let token = Uuid::new_v4().to_string();

                acquire_lock(&mut connection, &lock, &token, id).await?;
                let updated = self.rewrite_account(&field, update).await;
                let released: Result<i64, _> = RELEASE_LOCK
                    .key(&lock)
                    .arg(&token)
                    .invoke_async(&mut connection)
                    .await;

                let updated = updated?;
                released?;
                Ok(updated)
            }
            Database::Memory(store) => {
                let mut store = store.write().await;
                let Some(json) = store
                    .hashes
                    .get_mut(USERS)
                    .and_then(|users| users.get_mut(&field))
                else {
                    return Ok(None);
                };

                let (account, updated) = apply_update(json, update)?;
                *json = updated;
                Ok(Some(account))
            }
        }
    }

    async fn rewrite_account<F>(
        &self,
        field: &str,
        update: F,
    ) -> Result<Option<Account>, AppError>
    where
        F: FnOnce(&mut Account),
    {
        let Some(json) = self.hget(USERS, field).await? else {
            return Ok(None);
        };

        let (account, updated) = apply_update(&json, update)?;
        self.hset(USERS, field, &updated).await?;
        Ok(Some(account))
    }

    /// Writes the caller's copy of an account. Exercise counters are taken
    /// from the stored copy, as only [`Database::record_progress`] changes
    /// them. Indexed fields are never changed after creation.
    pub async fn save_account(&self, account: &mut Account) -> Result<(), AppError> {
        let changes = account.clone();

        let saved = self
            .update_account(&account.user.id, move |stored| {
                let counters = stored.user.progress.clone();
                let last_active = counters.last_active.max(changes.user.progress.last_active);

                *stored = changes;
                stored.user.progress = ProgressSummary {
                    last_active,
                    ..counters
                };
            })
            .await?
            .ok_or(AppError::NotFound("User not found"))?;

        *account = saved;
        Ok(())
    }

    pub async fn account(&self, id: &Uuid) -> Result<Option<Account>, AppError> {
        self.hget(USERS, &id.to_string())
            .await?
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(AppError::from)
    }

    async fn account_by_index(
        &self,
        index: &str,
        value: &str,
    ) -> Result<Option<Account>, AppError> {
        let Some(id) = self.hget(index, value).await? else {
            return Ok(None);
        };

        match Uuid::parse_str(&id) {
            Ok(id) => self.account(&id).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        self.account_by_index(EMAIL_INDEX, email).await
    }

    pub async fn account_by_student_id(
        &self,
        student_id: &str,
    ) -> Result<Option<Account>, AppError> {
        self.account_by_index(STUDENT_ID_INDEX, student_id).await
    }

    pub async fn consultant_id_taken(&self, consultant_id: &str) -> Result<bool, AppError> {
        Ok(self.hget(CONSULTANT_ID_INDEX, consultant_id).await?.is_some())
    }

    /// A teacher by consultant id, or by legacy employee id.
    pub async fn consultant(&self, consultant_id: &str) -> Result<Option<Account>, AppError> {
        if let Some(account) = self.account_by_index(CONSULTANT_ID_INDEX, consultant_id).await? {
            return Ok(Some(account).filter(|account| account.user.role == Role::Teacher));
        }

        Ok(self.accounts().await?.into_iter().find(|account| {
            account.user.role == Role::Teacher
                && account.user.employee_id.as_deref() == Some(consultant_id)
        }))
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, AppError> {
        self.hvals(USERS)
            .await?
            .iter()
            .map(|json| serde_json::from_str(json).map_err(AppError::from))
            .collect()
    }

    /// Appends the record and folds it into the owner's progress summary.
    /// `account` is refreshed with the stored result.
    pub async fn record_progress(
        &self,
        account: &mut Account,
        record: &ProgressRecord,
    ) -> Result<(), AppError> {
        let json = serde_json::to_string(record)?;
        self.rpush(&progress_key(&record.user_id), &json).await?;

        let saved = self
            .update_account(&record.user_id, |stored| {
                stored.user.progress.record(record.score, record.created_at);
            })
            .await?
            .ok_or(AppError::NotFound("User not found"))?;

        *account = saved;
        Ok(())
    }

    /// Oldest first.
    pub async fn progress(&self, user_id: &Uuid) -> Result<Vec<ProgressRecord>, AppError> {
        self.lrange_all(&progress_key(user_id))
            .await?
            .iter()
            .map(|json| serde_json::from_str(json).map_err(AppError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{ExerciseType, User};

    fn account(email: &str, student_id: Option<&str>) -> Account {
        let mut user = User::new(
            "Test".to_string(),
            "Student".to_string(),
            email.to_string(),
            Role::Student,
        );
        user.student_id = student_id.map(str::to_string);

        Account {
            password_hash: "hash".to_string(),
            user,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let database = Database::memory();
        let account = account("a@example.com", Some("S1"));
        database.insert_account(&account).await.unwrap();

        let by_id = database.account(&account.user.id).await.unwrap();
        let by_email = database.account_by_email("a@example.com").await.unwrap();
        let by_student = database.account_by_student_id("S1").await.unwrap();

        assert_eq!(by_id.as_ref(), Some(&account));
        assert_eq!(by_email.as_ref(), Some(&account));
        assert_eq!(by_student.as_ref(), Some(&account));
        assert!(database.account_by_email("b@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let database = Database::memory();
        database
            .insert_account(&account("a@example.com", None))
            .await
            .unwrap();

        let err = database
            .insert_account(&account("a@example.com", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Duplicate("Email")));
        assert_eq!(database.accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_claim_releases_earlier_indexes() {
        let database = Database::memory();
        database
            .insert_account(&account("a@example.com", Some("S1")))
            .await
            .unwrap();

        let err = database
            .insert_account(&account("b@example.com", Some("S1")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate("Student ID")));

        // b@example.com was claimed then released
        database
            .insert_account(&account("b@example.com", Some("S2")))
            .await
            .unwrap();
        assert_eq!(database.accounts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_consultant_by_employee_id() {
        let database = Database::memory();
        let mut teacher = account("t@example.com", None);
        teacher.user.role = Role::Teacher;
        teacher.user.employee_id = Some("EMP7".to_string());
        database.insert_account(&teacher).await.unwrap();

        let found = database.consultant("EMP7").await.unwrap();
        assert_eq!(found.map(|account| account.user.id), Some(teacher.user.id));
        assert!(database.consultant("CNS000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_progress_updates_summary() {
        let database = Database::memory();
        let mut account = account("a@example.com", Some("S1"));
        database.insert_account(&account).await.unwrap();

        for score in [60.0, 100.0] {
            let record = ProgressRecord::new(
                account.user.id,
                ExerciseType::Practice,
                score,
                30,
                None,
                json!({}),
            );
            database.record_progress(&mut account, &record).await.unwrap();
        }

        let records = database.progress(&account.user.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 60.0);

        let stored = database.account(&account.user.id).await.unwrap().unwrap();
        assert_eq!(stored.user.progress.completed_exercises, 2);
        assert!((stored.user.progress.average_score - 80.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_progress_keeps_every_exercise() {
        let database = Database::memory();
        let account = account("a@example.com", Some("S1"));
        database.insert_account(&account).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let database = database.clone();
                let mut stale = account.clone();

                tokio::spawn(async move {
                    let record = ProgressRecord::new(
                        stale.user.id,
                        ExerciseType::Quiz,
                        (i * 5) as f64,
                        10,
                        None,
                        json!({}),
                    );
                    database.record_progress(&mut stale, &record).await.unwrap();
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        let stored = database.account(&account.user.id).await.unwrap().unwrap();
        assert_eq!(stored.user.progress.completed_exercises, 20);
        assert_eq!(stored.user.progress.total_sessions, 20);
        assert!((stored.user.progress.average_score - 47.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_save_with_stale_copy_keeps_counters() {
        let database = Database::memory();
        let mut fresh = account("a@example.com", Some("S1"));
        database.insert_account(&fresh).await.unwrap();
        let mut stale = fresh.clone();

        let record = ProgressRecord::new(
            fresh.user.id,
            ExerciseType::Drawing,
            90.0,
            10,
            Some(80.0),
            json!({}),
        );
        database.record_progress(&mut fresh, &record).await.unwrap();
        assert_eq!(fresh.user.progress.completed_exercises, 1);

        stale.user.grade = Some("4".to_string());
        database.save_account(&mut stale).await.unwrap();

        let stored = database.account(&fresh.user.id).await.unwrap().unwrap();
        assert_eq!(stored.user.grade.as_deref(), Some("4"));
        assert_eq!(stored.user.progress.completed_exercises, 1);
        assert_eq!(stored.user.progress.average_score, 90.0);
        assert_eq!(stale, stored);
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let database = Database::memory();
        let updated = database
            .update_account(&Uuid::new_v4(), |account| account.user.is_active = false)
            .await
            .unwrap();

        assert!(updated.is_none());
    }
}
