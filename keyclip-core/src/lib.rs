//! # KeyClip
//!
//! Convenience wrapper around the operating system's secure credential store.
//!
//! This crate provides:
//! - [`Builder`] and [`Ring`] - a configured handle bound to a service,
//!   access group and accessibility policy
//! - Byte, UTF-8 text and JSON object accessors over stored records
//! - A process-wide default ring behind free functions ([`save_text`],
//!   [`load_text`], ...)
//! - The [`SecureStorage`] backend trait with OS keyring and in-memory
//!   implementations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keyclip::{Accessibility, Builder};
//!
//! let ring = Builder::new()
//!     .service("com.example.app")
//!     .accessibility(Accessibility::WhenUnlocked)
//!     .build();
//!
//! ring.save_mapping("account", &serde_json::json!({ "name": "aska" }))?;
//! let name = ring.load_with("account", |account| account["name"].to_string())?;
//!
//! // Or through the default ring:
//! keyclip::save_text("token", "s3cr3t")?;
//! assert!(keyclip::exists("token")?);
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod global;
pub mod ring;
pub mod status;
pub mod store;

// Re-export commonly used types at crate root
pub use builder::Builder;

pub use config::{
    Accessibility,
    ConfigError,
    DEFAULT_SERVICE,
    RingConfig,
};

pub use error::{KeyClipError, Result};

pub use ring::{ErrorHook, Ring};

pub use status::Status;

pub use store::{
    ItemQuery,
    MemoryStorage,
    SecureStorage,
    default_storage,
    shared_storage,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStorage;

pub use global::{
    clear,
    default_access_group,
    default_ring,
    delete,
    exists,
    load_bytes,
    load_json,
    load_mapping,
    load_text,
    load_with,
    print_error,
    reset_default,
    save_bytes,
    save_mapping,
    save_text,
    set_default,
    set_print_error,
};
