//! Process-wide default ring.
//!
//! The free functions in this module mirror [`Ring`]'s operations against a
//! lazily built default ring, for callers that need no configuration:
//!
//! ```rust,ignore
//! keyclip::save_text("token", "s3cr3t")?;
//! let token = keyclip::load_text("token")?;
//! ```
//!
//! The default ring is built on first use from [`RingConfig::load`], falling
//! back to defaults if the configuration file cannot be read. Replace it with
//! [`set_default`]. The [`set_print_error`] flag only affects calls made
//! through these functions; rings built elsewhere keep their own setting.

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::builder::Builder;
use crate::config::RingConfig;
use crate::error::Result;
use crate::ring::Ring;

static DEFAULT_RING: RwLock<Option<Ring>> = parking_lot::const_rwlock(None);
static PRINT_ERROR: AtomicBool = AtomicBool::new(false);

fn build_default() -> Ring {
    match RingConfig::load() {
        Ok(config) => Builder::from_config(config).build(),
        Err(e) => {
            tracing::warn!("Failed to load ring configuration ({}), using defaults", e);
            Builder::new().build()
        }
    }
}

/// The current default ring, built on first use.
pub fn default_ring() -> Ring {
    let print_error = print_error();
    if let Some(ring) = DEFAULT_RING.read().as_ref() {
        return ring.with_print_error(print_error);
    }

    let mut slot = DEFAULT_RING.write();
    slot.get_or_insert_with(build_default)
        .with_print_error(print_error)
}

/// Replace the default ring for subsequent calls.
///
/// Returns the previous default, if one had been built.
pub fn set_default(ring: Ring) -> Option<Ring> {
    DEFAULT_RING.write().replace(ring)
}

/// Drop the default ring; the next call rebuilds it from configuration.
pub fn reset_default() -> Option<Ring> {
    DEFAULT_RING.write().take()
}

/// Log failures of calls made through the default ring.
pub fn set_print_error(print_error: bool) {
    PRINT_ERROR.store(print_error, Ordering::Relaxed);
}

pub fn print_error() -> bool {
    PRINT_ERROR.load(Ordering::Relaxed)
}

/// Access group the default ring's backend uses when none is configured.
pub fn default_access_group() -> Option<String> {
    default_ring().default_access_group()
}

/// See [`Ring::exists`].
#[track_caller]
pub fn exists(key: &str) -> Result<bool> {
    default_ring().exists(key)
}

/// See [`Ring::save_bytes`].
#[track_caller]
pub fn save_bytes(key: &str, data: &[u8]) -> Result<()> {
    default_ring().save_bytes(key, data)
}

/// See [`Ring::save_text`].
#[track_caller]
pub fn save_text(key: &str, text: &str) -> Result<()> {
    default_ring().save_text(key, text)
}

/// See [`Ring::save_mapping`].
#[track_caller]
pub fn save_mapping<T>(key: &str, mapping: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    default_ring().save_mapping(key, mapping)
}

/// See [`Ring::load_bytes`].
#[track_caller]
pub fn load_bytes(key: &str) -> Result<Option<Vec<u8>>> {
    default_ring().load_bytes(key)
}

/// See [`Ring::load_text`].
#[track_caller]
pub fn load_text(key: &str) -> Result<Option<String>> {
    default_ring().load_text(key)
}

/// See [`Ring::load_mapping`].
#[track_caller]
pub fn load_mapping(key: &str) -> Result<Option<Map<String, Value>>> {
    default_ring().load_mapping(key)
}

/// See [`Ring::load_with`].
#[track_caller]
pub fn load_with<T, F>(key: &str, success: F) -> Result<Option<T>>
where
    F: FnOnce(Map<String, Value>) -> T,
{
    default_ring().load_with(key, success)
}

/// See [`Ring::load_json`].
#[track_caller]
pub fn load_json<T: DeserializeOwned>(key: &str) -> Result<Option<T>> {
    default_ring().load_json(key)
}

/// See [`Ring::delete`].
#[track_caller]
pub fn delete(key: &str) -> Result<bool> {
    default_ring().delete(key)
}

/// See [`Ring::clear`].
#[track_caller]
pub fn clear() -> Result<bool> {
    default_ring().clear()
}
