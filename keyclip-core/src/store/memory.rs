//! In-memory secure storage implementation.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use zeroize::Zeroizing;

use super::{ItemQuery, SecureStorage};
use crate::config::Accessibility;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemKey {
    service: String,
    access_group: Option<String>,
    account: String,
}

struct StoredItem {
    value: Zeroizing<Vec<u8>>,
    accessibility: Accessibility,
}

/// In-memory secure storage for testing and development.
///
/// Mirrors the keychain's status semantics: duplicate inserts, missing
/// records and scoped deletes report the same statuses a platform store
/// would. Data is lost when the process exits and wiped when removed.
///
/// Access groups can be restricted with
/// [`with_access_groups`](Self::with_access_groups): inserting into a group
/// that is not allowed fails with `Status::MISSING_ENTITLEMENT`, and reads
/// from it find nothing.
///
/// # Thread Safety
///
/// This implementation uses interior mutability via `RwLock` and is
/// safe to share across threads.
pub struct MemoryStorage {
    items: RwLock<HashMap<ItemKey, StoredItem>>,
    default_access_group: Option<String>,
    allowed_access_groups: Option<HashSet<String>>,
    failure: RwLock<Option<Status>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage accepting any access group.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            default_access_group: None,
            allowed_access_groups: None,
            failure: RwLock::new(None),
        }
    }

    /// Create a memory storage that only grants the listed access groups.
    ///
    /// Records saved without an access group land in `default_group`, which
    /// is always allowed.
    pub fn with_access_groups<I, S>(default_group: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default_group = default_group.into();
        let mut allowed: HashSet<String> = allowed.into_iter().map(Into::into).collect();
        allowed.insert(default_group.clone());

        Self {
            default_access_group: Some(default_group),
            allowed_access_groups: Some(allowed),
            ..Self::new()
        }
    }

    /// Make every subsequent request fail with `status` until cleared with
    /// `None`.
    pub fn fail_with(&self, status: Option<Status>) {
        *self.failure.write() = status;
    }

    /// Accessibility a record was created with.
    pub fn accessibility_of(&self, query: &ItemQuery) -> Option<Accessibility> {
        let key = self.item_key(query).ok()?;
        self.items.read().get(&key).map(|item| item.accessibility)
    }

    /// Number of records across all scopes.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_failure(&self) -> Result<(), Status> {
        match *self.failure.read() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn resolve_group(&self, requested: Option<&str>) -> Option<String> {
        requested
            .map(str::to_string)
            .or_else(|| self.default_access_group.clone())
    }

    fn is_entitled(&self, group: Option<&str>) -> bool {
        match (&self.allowed_access_groups, group) {
            (Some(allowed), Some(group)) => allowed.contains(group),
            _ => true,
        }
    }

    fn item_key(&self, query: &ItemQuery) -> Result<ItemKey, Status> {
        let account = query.require_account()?;
        Ok(ItemKey {
            service: query.service.clone(),
            access_group: self.resolve_group(query.access_group.as_deref()),
            account: account.to_string(),
        })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("items_count", &self.len())
            .field("default_access_group", &self.default_access_group)
            .finish()
    }
}

impl SecureStorage for MemoryStorage {
    fn find(&self, query: &ItemQuery) -> Result<(), Status> {
        self.check_failure()?;
        let key = self.item_key(query)?;
        if self.items.read().contains_key(&key) {
            Ok(())
        } else {
            Err(Status::ITEM_NOT_FOUND)
        }
    }

    fn copy_data(&self, query: &ItemQuery) -> Result<Vec<u8>, Status> {
        self.check_failure()?;
        let key = self.item_key(query)?;
        self.items
            .read()
            .get(&key)
            .map(|item| item.value.to_vec())
            .ok_or(Status::ITEM_NOT_FOUND)
    }

    fn add(
        &self,
        query: &ItemQuery,
        accessibility: Accessibility,
        value: &[u8],
    ) -> Result<(), Status> {
        self.check_failure()?;
        let key = self.item_key(query)?;
        if !self.is_entitled(key.access_group.as_deref()) {
            return Err(Status::MISSING_ENTITLEMENT);
        }

        let mut items = self.items.write();
        if items.contains_key(&key) {
            return Err(Status::DUPLICATE_ITEM);
        }
        items.insert(
            key,
            StoredItem {
                value: Zeroizing::new(value.to_vec()),
                accessibility,
            },
        );
        Ok(())
    }

    fn update(&self, query: &ItemQuery, value: &[u8]) -> Result<(), Status> {
        self.check_failure()?;
        let key = self.item_key(query)?;
        let mut items = self.items.write();
        let item = items.get_mut(&key).ok_or(Status::ITEM_NOT_FOUND)?;
        item.value = Zeroizing::new(value.to_vec());
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), Status> {
        self.check_failure()?;

        if query.account.is_some() {
            let key = self.item_key(query)?;
            return match self.items.write().remove(&key) {
                Some(_) => Ok(()),
                None => Err(Status::ITEM_NOT_FOUND),
            };
        }

        let group = self.resolve_group(query.access_group.as_deref());
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|key, _| !(key.service == query.service && key.access_group == group));

        if items.len() < before {
            Ok(())
        } else {
            Err(Status::ITEM_NOT_FOUND)
        }
    }

    fn default_access_group(&self) -> Option<String> {
        self.default_access_group.clone()
    }
}
