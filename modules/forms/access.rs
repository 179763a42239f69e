use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::connection::ClientIdentity;

/// Identities allowed to see or run a configured entry. Empty means everyone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessList {
    /// Usernames granted access.
    #[serde(default, rename = "allowed_users")]
    pub allowed: IndexSet<String>,
}

impl AccessList {
    /// Access list granting everyone.
    #[must_use]
    pub fn everyone() -> Self {
        Self::default()
    }

    /// Access list restricted to the given usernames.
    #[must_use]
    pub fn only<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: users.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the list imposes no restriction.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Authorization predicate evaluated per entry per render. Never cached.
pub trait AccessPolicy: Send + Sync {
    /// Whether `identity` may use an entry guarded by `access`.
    fn is_allowed(&self, access: &AccessList, identity: &ClientIdentity) -> bool;
}

/// Allow-list semantics over [`AccessList`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAccessPolicy;

impl AccessPolicy for ListAccessPolicy {
    fn is_allowed(&self, access: &AccessList, identity: &ClientIdentity) -> bool {
        access.is_open() || access.allowed.contains(&identity.username)
    }
}
