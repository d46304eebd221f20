//! Fluent ring configuration.

use std::sync::Arc;

use crate::config::{Accessibility, RingConfig};
use crate::error::KeyClipError;
use crate::ring::{ErrorHook, Ring};
use crate::store::{SecureStorage, shared_storage};

/// Accumulates settings and builds an immutable [`Ring`].
///
/// Every setter consumes the builder and returns it, so calls chain:
///
/// ```rust,ignore
/// use keyclip::{Accessibility, Builder};
///
/// let ring = Builder::new()
///     .service("com.example.app")
///     .access_group("TEAMID.com.example.shared")
///     .accessibility(Accessibility::AfterFirstUnlock)
///     .print_error(true)
///     .build();
/// ```
///
/// Unset fields keep the [`RingConfig`] defaults. Without an explicit
/// [`storage`](Self::storage) the ring uses [`shared_storage`].
#[derive(Clone, Default)]
pub struct Builder {
    config: RingConfig,
    storage: Option<Arc<dyn SecureStorage>>,
    on_error: Option<ErrorHook>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one read from disk.
    pub fn from_config(config: RingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.config.service = service.into();
        self
    }

    pub fn access_group(mut self, access_group: impl Into<String>) -> Self {
        self.config.access_group = Some(access_group.into());
        self
    }

    /// Accessibility given to records this ring inserts.
    pub fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.config.accessibility = accessibility;
        self
    }

    /// Log every failed operation through `tracing`.
    pub fn print_error(mut self, print_error: bool) -> Self {
        self.config.print_error = print_error;
        self
    }

    /// Observe every error before the ring returns it.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&KeyClipError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Use a specific secure storage backend.
    pub fn storage(mut self, storage: Arc<dyn SecureStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Ring {
        let storage = self.storage.unwrap_or_else(shared_storage);
        tracing::debug!(
            service = %self.config.service,
            access_group = ?self.config.access_group,
            accessibility = %self.config.accessibility,
            "Building ring"
        );
        Ring::new(self.config, storage, self.on_error)
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("storage", &self.storage.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
