//! User record store boundary.
//!
//! Persistence is an external concern: the rest of the crate only ever sees
//! the [`UserStore`] trait, queried by login identifier. [`MemoryUserStore`]
//! is the reference implementation used by the bundled binary (seeded from
//! configuration) and by tests; production deployments implement the trait
//! over whatever actually holds their user records.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::Result;
use crate::types::{Identity, Role, UserId};

/// A stored user record: identity attributes plus the credential hash.
///
/// The secret is only ever held as an Argon2 hash. Records without a hash
/// exist (e.g. externally-authenticated principals) and can never pass
/// credential verification.
#[derive(Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub identifier: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
}

// Keep credential hashes out of debug output and logs.
impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("role", &self.role)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl From<&UserRecord> for Identity {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            identifier: record.identifier.clone(),
            display_name: record.display_name.clone(),
            role: record.role,
        }
    }
}

/// Read-only access to user records, keyed by login identifier.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up the record for `identifier`, or `None` if no such user exists.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>>;
}

/// In-memory [`UserStore`] implementation.
#[derive(Default)]
pub struct MemoryUserStore {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing record with the same identifier.
    pub fn insert(&self, record: UserRecord) {
        self.records.write().insert(record.identifier.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>> {
        Ok(self.records.read().get(identifier).cloned())
    }
}
