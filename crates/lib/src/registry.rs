//! In-memory registry of each user's favorite pets.
//!
//! Keyed by user id; each value is the ordered list last written for that user.
//! Lives for the process lifetime only. Cloning the registry clones the handle,
//! so every clone sees the same map.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Opaque user identifier.
pub type UserId = String;

/// Shared map from user id to favorite pets.
///
/// Each method takes the lock for a single operation only. Sequences of calls
/// (read, then write) are not atomic with respect to other handles.
#[derive(Debug, Clone, Default)]
pub struct UserRegistry {
    inner: Arc<RwLock<HashMap<UserId, Vec<String>>>>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's pets with `pets` (duplicates and empty names are kept as given).
    pub async fn set(&self, user_id: &str, pets: Vec<String>) {
        self.inner.write().await.insert(user_id.to_string(), pets);
    }

    /// Remove the user's entry. Missing users are ignored.
    pub async fn remove(&self, user_id: &str) {
        if self.inner.write().await.remove(user_id).is_none() {
            log::debug!("registry: no entry to remove for {}", user_id);
        }
    }

    /// The user's pets, or an empty list when the user has no entry.
    pub async fn get(&self, user_id: &str) -> Vec<String> {
        self.inner
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// True if the user has an entry (an entry may hold an empty list).
    pub async fn contains(&self, user_id: &str) -> bool {
        self.inner.read().await.contains_key(user_id)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
