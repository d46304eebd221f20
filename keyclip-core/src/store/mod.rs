//! Secure storage abstraction.
//!
//! This module provides:
//! - [`ItemQuery`] - Identifies one record, or every record in a scope
//! - [`SecureStorage`] - Trait for secure storage backends
//! - [`MemoryStorage`] - In-process implementation for testing
//! - [`KeyringStorage`] - OS keyring implementation (with `keyring-store` feature)
//! - [`default_storage`] - Helper to select a backend based on availability
//! - [`shared_storage`] - Process-wide backend used by rings built without one
//!
//! Every request answers with a [`Status`]: `Ok` for success, `Err` with the
//! backend's status code otherwise. Absence is `Err(Status::ITEM_NOT_FOUND)`;
//! turning it into `None`/`false` is the ring's job.

use std::sync::{Arc, OnceLock};

use crate::config::Accessibility;
use crate::status::Status;

mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use memory::MemoryStorage;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStorage;

/// Attributes selecting records in the secure store.
///
/// With `account` set the query matches at most one record. Without it, the
/// query matches every record in the `(service, access_group)` scope, which
/// is only meaningful for [`SecureStorage::delete`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemQuery {
    pub service: String,
    pub access_group: Option<String>,
    pub account: Option<String>,
}

impl ItemQuery {
    /// Query for a single record.
    pub fn item(service: &str, access_group: Option<&str>, account: &str) -> Self {
        Self {
            service: service.to_string(),
            access_group: access_group.map(str::to_string),
            account: Some(account.to_string()),
        }
    }

    /// Query for every record in a scope.
    pub fn scope(service: &str, access_group: Option<&str>) -> Self {
        Self {
            service: service.to_string(),
            access_group: access_group.map(str::to_string),
            account: None,
        }
    }

    /// Account of a single-record query, or `Status::PARAM`.
    pub(crate) fn require_account(&self) -> Result<&str, Status> {
        match self.account.as_deref() {
            Some(account) if !account.is_empty() => Ok(account),
            _ => Err(Status::PARAM),
        }
    }
}

/// Abstraction over secure storage backends.
///
/// Implementations include:
/// - [`MemoryStorage`] - In-process storage for testing
/// - [`KeyringStorage`] (with `keyring-store` feature) - OS keyring
///
/// All requests are synchronous and return a definitive status.
pub trait SecureStorage: Send + Sync {
    /// Check that a record matches without reading its value.
    fn find(&self, query: &ItemQuery) -> Result<(), Status>;

    /// Read the value of the matching record.
    fn copy_data(&self, query: &ItemQuery) -> Result<Vec<u8>, Status>;

    /// Insert a new record.
    ///
    /// Fails with `Status::DUPLICATE_ITEM` if the record already exists.
    fn add(
        &self,
        query: &ItemQuery,
        accessibility: Accessibility,
        value: &[u8],
    ) -> Result<(), Status>;

    /// Replace the value of an existing record, keeping its other attributes.
    ///
    /// Fails with `Status::ITEM_NOT_FOUND` if the record does not exist.
    fn update(&self, query: &ItemQuery, value: &[u8]) -> Result<(), Status>;

    /// Delete the matching record, or every record in scope when the query
    /// has no account.
    ///
    /// Fails with `Status::ITEM_NOT_FOUND` if nothing matched.
    fn delete(&self, query: &ItemQuery) -> Result<(), Status>;

    /// Access group records land in when none is requested.
    fn default_access_group(&self) -> Option<String> {
        None
    }
}

/// Create a secure storage backend with automatic selection.
///
/// - With the `keyring-store` feature, tries [`KeyringStorage`] and falls
///   back to [`MemoryStorage`] with a warning if the keyring is unavailable.
/// - Otherwise returns [`MemoryStorage`].
pub fn default_storage() -> Arc<dyn SecureStorage> {
    #[cfg(feature = "keyring-store")]
    match KeyringStorage::try_new() {
        Ok(storage) => {
            tracing::debug!("Using OS keyring for secure storage");
            return Arc::new(storage);
        }
        Err(status) => {
            tracing::warn!(
                "Keyring unavailable ({}), falling back to memory storage. \
                 Records will not persist across restarts.",
                status
            );
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    tracing::warn!(
        "keyring-store feature not enabled. \
         Using memory storage; records will not persist across restarts."
    );

    Arc::new(MemoryStorage::new())
}

/// Backend shared by every ring built without an explicit storage.
///
/// Selected once with [`default_storage`] on first use, so rings built later
/// see the same records even when the memory fallback is in effect.
pub fn shared_storage() -> Arc<dyn SecureStorage> {
    static SHARED: OnceLock<Arc<dyn SecureStorage>> = OnceLock::new();
    SHARED.get_or_init(default_storage).clone()
}
