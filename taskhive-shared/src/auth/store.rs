/// Credential model and storage boundary
///
/// This module defines the [`Credential`] record, the [`CredentialStore`]
/// trait every backing store implements, and an in-memory store used by tests
/// and embedders. The PostgreSQL implementation lives in
/// `crate::db::credentials`.
///
/// # Invariants
///
/// - `username` and `email` are unique across all credentials
/// - `is_active` starts false and only ever flips false -> true
/// - `password_hash` is an Argon2id PHC string, never a plaintext password
///
/// Uniqueness is enforced by the store at insert time. Callers never pre-check
/// for duplicates; the `StoreError::Conflict` returned from the write is the
/// authoritative signal.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Error type for credential storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A credential with the same username or email already exists
    #[error("Credential already exists: {0}")]
    Conflict(String),

    /// No credential matches the given identifier
    #[error("Credential not found")]
    NotFound,

    /// The backing store failed
    #[error("Storage failure: {0}")]
    Backend(String),
}

/// A stored credential record
///
/// The password is stored as an Argon2id hash, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    /// Unique integer identifier
    pub id: i64,

    /// Unique username
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2id password hash (PHC string format)
    pub password_hash: String,

    /// Whether the account has been activated
    ///
    /// Starts false; flips to true exactly once via `set_active`
    pub is_active: bool,

    /// When the credential was created
    pub created_at: DateTime<Utc>,

    /// When the credential was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a new credential
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Username (must be unique)
    pub username: String,

    /// Email address (must be unique)
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password!)
    pub password_hash: String,
}

/// Storage boundary for credentials
///
/// Implementations must enforce username/email uniqueness inside `insert` and
/// report duplicates as [`StoreError::Conflict`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a credential by username
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError>;

    /// Finds a credential by email address
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError>;

    /// Inserts a new credential
    ///
    /// The account starts inactive. Returns [`StoreError::Conflict`] if the
    /// username or email is already taken.
    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError>;

    /// Marks a credential as active
    ///
    /// Activation is monotonic; calling this on an already-active credential
    /// leaves it active.
    async fn set_active(&self, id: i64) -> Result<Credential, StoreError>;

    /// Replaces the stored password hash
    async fn update_password_hash(&self, id: i64, hash: &str) -> Result<Credential, StoreError>;
}

#[derive(Debug, Default)]
struct Arena {
    next_id: i64,
    rows: BTreeMap<i64, Credential>,
}

/// In-memory credential store
///
/// An arena of credentials keyed by integer id behind a mutex. Uniqueness is
/// enforced inside the locked insert, so concurrent sign-ups race safely.
/// Used by the test suites and available to embedders that don't need a
/// database.
///
/// # Example
///
/// ```
/// use taskhive_shared::auth::store::{CredentialStore, InMemoryCredentialStore, NewCredential};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryCredentialStore::new();
/// let credential = store
///     .insert(NewCredential {
///         username: "alice".to_string(),
///         email: "alice@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///     })
///     .await?;
/// assert!(!credential.is_active);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    arena: Mutex<Arena>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            arena: Mutex::new(Arena {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Arena>, StoreError> {
        self.arena
            .lock()
            .map_err(|_| StoreError::Backend("credential arena lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StoreError> {
        let arena = self.lock()?;
        Ok(arena
            .rows
            .values()
            .find(|c| c.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let arena = self.lock()?;
        Ok(arena.rows.values().find(|c| c.email == email).cloned())
    }

    async fn insert(&self, new: NewCredential) -> Result<Credential, StoreError> {
        let mut arena = self.lock()?;

        if arena.rows.values().any(|c| c.username == new.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if arena.rows.values().any(|c| c.email == new.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }

        let now = Utc::now();
        let id = arena.next_id;
        arena.next_id += 1;

        let credential = Credential {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        arena.rows.insert(id, credential.clone());

        Ok(credential)
    }

    async fn set_active(&self, id: i64) -> Result<Credential, StoreError> {
        let mut arena = self.lock()?;
        let credential = arena.rows.get_mut(&id).ok_or(StoreError::NotFound)?;

        credential.is_active = true;
        credential.updated_at = Utc::now();

        Ok(credential.clone())
    }

    async fn update_password_hash(&self, id: i64, hash: &str) -> Result<Credential, StoreError> {
        let mut arena = self.lock()?;
        let credential = arena.rows.get_mut(&id).ok_or(StoreError::NotFound)?;

        credential.password_hash = hash.to_string();
        credential.updated_at = Utc::now();

        Ok(credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_credential(username: &str, email: &str) -> NewCredential {
        NewCredential {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_starts_inactive() {
        let store = InMemoryCredentialStore::new();
        let credential = store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        assert_eq!(credential.id, 1);
        assert!(!credential.is_active);
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryCredentialStore::new();
        let a = store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");
        let b = store
            .insert(new_credential("bob", "bob@example.com"))
            .await
            .expect("insert should succeed");

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = InMemoryCredentialStore::new();
        store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        let result = store
            .insert(new_credential("alice", "other@example.com"))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(f)) if f == "username"));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryCredentialStore::new();
        store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        let result = store
            .insert(new_credential("alice2", "alice@example.com"))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(f)) if f == "email"));
    }

    #[tokio::test]
    async fn test_find_by_username_and_email() {
        let store = InMemoryCredentialStore::new();
        store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        assert!(store
            .find_by_username("alice")
            .await
            .expect("find should succeed")
            .is_some());
        assert!(store
            .find_by_username("nobody")
            .await
            .expect("find should succeed")
            .is_none());
        assert!(store
            .find_by_email("alice@example.com")
            .await
            .expect("find should succeed")
            .is_some());
    }

    #[tokio::test]
    async fn test_set_active_is_monotonic() {
        let store = InMemoryCredentialStore::new();
        let credential = store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        let activated = store
            .set_active(credential.id)
            .await
            .expect("set_active should succeed");
        assert!(activated.is_active);

        // A second activation leaves the flag set
        let again = store
            .set_active(credential.id)
            .await
            .expect("set_active should succeed");
        assert!(again.is_active);
    }

    #[tokio::test]
    async fn test_set_active_missing_id() {
        let store = InMemoryCredentialStore::new();
        let result = store.set_active(42).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_password_hash() {
        let store = InMemoryCredentialStore::new();
        let credential = store
            .insert(new_credential("alice", "alice@example.com"))
            .await
            .expect("insert should succeed");

        let updated = store
            .update_password_hash(credential.id, "$argon2id$replaced")
            .await
            .expect("update should succeed");
        assert_eq!(updated.password_hash, "$argon2id$replaced");
    }
}
