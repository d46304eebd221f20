//! OS keyring-backed secure storage implementation.

use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ItemQuery, SecureStorage};
use crate::config::{Accessibility, DEFAULT_SERVICE};
use crate::status::Status;

/// Reserved account holding the per-scope key index.
const INDEX_ACCOUNT: &str = "pw.aska.KeyClip.index";

/// Keys stored in one `(service, access_group)` scope.
///
/// The keyring API cannot enumerate entries, so each scope records its own
/// keys to make scoped deletes possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScopeIndex {
    /// Version of the index format (for future migrations).
    version: u32,

    /// Stored keys and the accessibility they were created with.
    items: BTreeMap<String, Accessibility>,
}

impl Default for ScopeIndex {
    fn default() -> Self {
        Self {
            version: 1,
            items: BTreeMap::new(),
        }
    }
}

/// OS keyring-backed secure storage.
///
/// This storage uses the platform's native keyring service:
/// - macOS/iOS: Keychain
/// - Linux: kernel keyutils
/// - Windows: Credential Manager
///
/// # Entry Naming
///
/// Each record is a keyring entry whose user is the record's account. Its
/// keyring service is the query service, followed by `@{access_group}` when
/// an access group is set. `%` and `@` inside either part are escaped as
/// `%25` and `%40`, so no two scopes share a keyring service name. The
/// accessibility is recorded in the scope index only; the generic keyring
/// API has no attribute for it.
///
/// # Index Consistency
///
/// The index is written before the record and rolled back if the record
/// write fails, so every stored record is listed. An index that cannot be
/// decoded is logged and replaced; records it listed are registered again
/// the next time they are saved.
///
/// Index updates are serialized within the process. Concurrent writers in
/// other processes can race on the index.
pub struct KeyringStorage {
    index_lock: Mutex<()>,
}

impl KeyringStorage {
    /// Try to create a new keyring storage.
    ///
    /// Looks up a throwaway entry to check that the keyring answers. Returns
    /// `Status::NOT_AVAILABLE` if it does not.
    pub fn try_new() -> Result<Self, Status> {
        let available = Entry::new(DEFAULT_SERVICE, "availability_check")
            .and_then(|entry| entry.get_attributes().map(drop));

        match available {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(Self {
                index_lock: Mutex::new(()),
            }),
            Err(e) => {
                tracing::debug!("keyring backend not available: {}", e);
                Err(Status::NOT_AVAILABLE)
            }
        }
    }

    fn scoped_service(query: &ItemQuery) -> String {
        let service = escape_component(&query.service);
        match &query.access_group {
            Some(group) => format!("{}@{}", service, escape_component(group)),
            None => service,
        }
    }

    fn entry(service: &str, account: &str) -> Result<Entry, Status> {
        Entry::new(service, account).map_err(map_error)
    }

    /// Entry for a single-record query.
    fn item_entry(query: &ItemQuery) -> Result<Entry, Status> {
        let account = query.require_account()?;
        if account == INDEX_ACCOUNT {
            return Err(Status::PARAM);
        }
        Self::entry(&Self::scoped_service(query), account)
    }

    fn load_index(service: &str) -> Result<ScopeIndex, Status> {
        let entry = Self::entry(service, INDEX_ACCOUNT)?;
        match entry.get_secret() {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(index) => Ok(index),
                Err(e) => {
                    tracing::warn!(
                        "Corrupt keyring index for {} ({}), starting a new one. \
                         Records it listed are indexed again when next saved.",
                        service,
                        e
                    );
                    Ok(ScopeIndex::default())
                }
            },
            Err(keyring::Error::NoEntry) => Ok(ScopeIndex::default()),
            Err(e) => Err(map_error(e)),
        }
    }

    fn save_index(service: &str, index: &ScopeIndex) -> Result<(), Status> {
        let entry = Self::entry(service, INDEX_ACCOUNT)?;
        if index.items.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(map_error(e)),
            };
        }

        let bytes = serde_json::to_vec(index).map_err(|_| Status::DECODE)?;
        entry.set_secret(&bytes).map_err(map_error)
    }

    /// List `account` in its scope's index unless it is already there.
    ///
    /// Returns whether the index changed.
    fn register(
        service: &str,
        account: &str,
        accessibility: Accessibility,
    ) -> Result<bool, Status> {
        let mut index = Self::load_index(service)?;
        if index.items.contains_key(account) {
            return Ok(false);
        }
        index.items.insert(account.to_string(), accessibility);
        Self::save_index(service, &index)?;
        Ok(true)
    }

    /// Drop `account` from its scope's index.
    fn unregister(service: &str, account: &str) -> Result<(), Status> {
        let mut index = Self::load_index(service)?;
        if index.items.remove(account).is_some() {
            Self::save_index(service, &index)?;
        }
        Ok(())
    }

    /// Undo a registration after the record write failed.
    fn roll_back(service: &str, account: &str) {
        if let Err(status) = Self::unregister(service, account) {
            tracing::warn!(
                "Failed to remove {} from keyring index for {}: {}",
                account,
                service,
                status
            );
        }
    }
}

/// Escape the scope separator so distinct scopes never share a name.
fn escape_component(component: &str) -> String {
    component.replace('%', "%25").replace('@', "%40")
}

impl std::fmt::Debug for KeyringStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStorage").finish()
    }
}

impl SecureStorage for KeyringStorage {
    fn find(&self, query: &ItemQuery) -> Result<(), Status> {
        Self::item_entry(query)?
            .get_attributes()
            .map(drop)
            .map_err(map_error)
    }

    fn copy_data(&self, query: &ItemQuery) -> Result<Vec<u8>, Status> {
        Self::item_entry(query)?.get_secret().map_err(map_error)
    }

    fn add(
        &self,
        query: &ItemQuery,
        accessibility: Accessibility,
        value: &[u8],
    ) -> Result<(), Status> {
        let _guard = self.index_lock.lock();

        match self.find(query) {
            Ok(()) => return Err(Status::DUPLICATE_ITEM),
            Err(status) if status.is_not_found() => {}
            Err(status) => return Err(status),
        }

        let entry = Self::item_entry(query)?;
        let account = query.require_account()?;
        let service = Self::scoped_service(query);

        let registered = Self::register(&service, account, accessibility)?;
        if let Err(e) = entry.set_secret(value) {
            if registered {
                Self::roll_back(&service, account);
            }
            return Err(map_error(e));
        }
        Ok(())
    }

    fn update(&self, query: &ItemQuery, value: &[u8]) -> Result<(), Status> {
        let _guard = self.index_lock.lock();
        self.find(query)?;

        let entry = Self::item_entry(query)?;
        let account = query.require_account()?;
        let service = Self::scoped_service(query);

        // Records dropped from a replaced index are listed again here. Their
        // original accessibility is unknown, so the default is recorded.
        let registered = Self::register(&service, account, Accessibility::default())?;
        if let Err(e) = entry.set_secret(value) {
            if registered {
                Self::roll_back(&service, account);
            }
            return Err(map_error(e));
        }
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), Status> {
        let _guard = self.index_lock.lock();
        let service = Self::scoped_service(query);

        if query.account.is_some() {
            let account = query.require_account()?;
            let deleted = Self::item_entry(query)?.delete_credential();
            match deleted {
                Ok(()) => {
                    Self::unregister(&service, account)?;
                    return Ok(());
                }
                Err(keyring::Error::NoEntry) => {
                    Self::unregister(&service, account)?;
                    return Err(Status::ITEM_NOT_FOUND);
                }
                Err(e) => return Err(map_error(e)),
            }
        }

        let index = Self::load_index(&service)?;
        let mut removed = 0usize;
        for account in index.items.keys() {
            match Self::entry(&service, account)?.delete_credential() {
                Ok(()) => removed += 1,
                Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(map_error(e)),
            }
        }
        Self::save_index(&service, &ScopeIndex::default())?;

        tracing::debug!("cleared {} keyring entries for {}", removed, service);
        if removed == 0 {
            Err(Status::ITEM_NOT_FOUND)
        } else {
            Ok(())
        }
    }
}

/// Translate a keyring error into the matching keychain status.
fn map_error(error: keyring::Error) -> Status {
    match error {
        keyring::Error::NoEntry => Status::ITEM_NOT_FOUND,
        keyring::Error::NoStorageAccess(e) => {
            tracing::debug!("keyring storage not accessible: {}", e);
            Status::NOT_AVAILABLE
        }
        keyring::Error::BadEncoding(_) => Status::DECODE,
        keyring::Error::TooLong(attr, limit) => {
            tracing::debug!("keyring attribute {} longer than {}", attr, limit);
            Status::PARAM
        }
        keyring::Error::Invalid(attr, reason) => {
            tracing::debug!("invalid keyring attribute {}: {}", attr, reason);
            Status::PARAM
        }
        keyring::Error::Ambiguous(_) => Status::DUPLICATE_ITEM,
        keyring::Error::PlatformFailure(e) => {
            tracing::debug!("platform keyring failure: {}", e);
            Status::INTERNAL_COMPONENT
        }
        e => {
            tracing::debug!("keyring error: {}", e);
            Status::INTERNAL_COMPONENT
        }
    }
}
