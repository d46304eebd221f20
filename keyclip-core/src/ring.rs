//! Configured handle over the secure store.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::panic::Location;
use std::sync::Arc;

use crate::config::{Accessibility, RingConfig};
use crate::error::{KeyClipError, Result};
use crate::status::Status;
use crate::store::{ItemQuery, SecureStorage};

/// Callback observing every error a ring returns.
pub type ErrorHook = Arc<dyn Fn(&KeyClipError) + Send + Sync>;

/// A handle bound to one `(service, access_group, accessibility)` triple.
///
/// Rings are built with a [`Builder`](crate::Builder) and are immutable.
/// Cloning is cheap; clones share the storage backend and error hook.
///
/// Every operation returns `Ok(None)` or `Ok(false)` when the record is
/// absent and an error for any other failure. Before an error is returned it
/// is logged when `print_error` is on and handed to the `on_error` hook when
/// one is set.
///
/// # Example
///
/// ```rust,ignore
/// use keyclip::{Accessibility, Builder};
///
/// let ring = Builder::new()
///     .service("com.example.app")
///     .accessibility(Accessibility::WhenUnlocked)
///     .build();
///
/// ring.save_text("token", "s3cr3t")?;
/// assert_eq!(ring.load_text("token")?.as_deref(), Some("s3cr3t"));
/// ```
#[derive(Clone)]
pub struct Ring {
    config: RingConfig,
    storage: Arc<dyn SecureStorage>,
    on_error: Option<ErrorHook>,
}

impl Ring {
    pub(crate) fn new(
        config: RingConfig,
        storage: Arc<dyn SecureStorage>,
        on_error: Option<ErrorHook>,
    ) -> Self {
        Self {
            config,
            storage,
            on_error,
        }
    }

    pub fn service(&self) -> &str {
        &self.config.service
    }

    pub fn access_group(&self) -> Option<&str> {
        self.config.access_group.as_deref()
    }

    pub fn accessibility(&self) -> Accessibility {
        self.config.accessibility
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Access group the backend puts records in when the ring has none.
    pub fn default_access_group(&self) -> Option<String> {
        self.storage.default_access_group()
    }

    /// Copy of this ring that also prints errors when `print_error` is set.
    pub(crate) fn with_print_error(&self, print_error: bool) -> Self {
        let mut ring = self.clone();
        ring.config.print_error |= print_error;
        ring
    }

    /// Check whether a record exists for `key` without reading it.
    #[track_caller]
    pub fn exists(&self, key: &str) -> Result<bool> {
        let caller = Location::caller();
        self.observe(caller, self.find(key))
    }

    /// Store raw bytes under `key`.
    ///
    /// An existing record keeps its accessibility; only the value changes.
    /// New records get the ring's accessibility and access group.
    #[track_caller]
    pub fn save_bytes(&self, key: &str, data: &[u8]) -> Result<()> {
        let caller = Location::caller();
        self.observe(caller, self.put(key, data))
    }

    /// Store `text` as UTF-8 under `key`.
    #[track_caller]
    pub fn save_text(&self, key: &str, text: &str) -> Result<()> {
        let caller = Location::caller();
        self.observe(caller, self.put(key, text.as_bytes()))
    }

    /// Store a JSON object under `key`.
    ///
    /// Fails with [`KeyClipError::NotAMapping`] if `mapping` does not
    /// serialize to a JSON object.
    #[track_caller]
    pub fn save_mapping<T>(&self, key: &str, mapping: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let caller = Location::caller();
        let result = encode_mapping(mapping).and_then(|bytes| self.put(key, &bytes));
        self.observe(caller, result)
    }

    #[track_caller]
    pub fn load_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let caller = Location::caller();
        self.observe(caller, self.fetch(key))
    }

    /// Load the value under `key` as UTF-8 text.
    #[track_caller]
    pub fn load_text(&self, key: &str) -> Result<Option<String>> {
        let caller = Location::caller();
        let result = self
            .fetch(key)
            .and_then(|data| data.map(String::from_utf8).transpose().map_err(Into::into));
        self.observe(caller, result)
    }

    /// Load the value under `key` as a JSON object.
    #[track_caller]
    pub fn load_mapping(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        let caller = Location::caller();
        self.observe(caller, self.fetch_mapping(key))
    }

    /// Load the JSON object under `key` and convert it with `success`.
    #[track_caller]
    pub fn load_with<T, F>(&self, key: &str, success: F) -> Result<Option<T>>
    where
        F: FnOnce(Map<String, Value>) -> T,
    {
        let caller = Location::caller();
        self.observe(caller, self.fetch_mapping(key).map(|m| m.map(success)))
    }

    /// Load the JSON value under `key` and deserialize it into `T`.
    #[track_caller]
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let caller = Location::caller();
        let result = self.fetch(key).and_then(|data| {
            data.map(|bytes| serde_json::from_slice(&bytes))
                .transpose()
                .map_err(Into::into)
        });
        self.observe(caller, result)
    }

    /// Remove the record under `key`.
    ///
    /// Returns `Ok(false)` if there was nothing to remove.
    #[track_caller]
    pub fn delete(&self, key: &str) -> Result<bool> {
        let caller = Location::caller();
        let result = absent_as_false(self.storage.delete(&self.query(key)));
        self.observe(caller, result)
    }

    /// Remove every record in this ring's service and access group.
    ///
    /// Returns `Ok(false)` if the scope was already empty.
    #[track_caller]
    pub fn clear(&self) -> Result<bool> {
        let caller = Location::caller();
        let query = ItemQuery::scope(&self.config.service, self.access_group());
        self.observe(caller, absent_as_false(self.storage.delete(&query)))
    }

    fn query(&self, key: &str) -> ItemQuery {
        ItemQuery::item(&self.config.service, self.access_group(), key)
    }

    fn find(&self, key: &str) -> Result<bool> {
        absent_as_false(self.storage.find(&self.query(key)))
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let query = self.query(key);
        if self.find(key)? {
            self.storage.update(&query, data)?;
        } else {
            self.storage.add(&query, self.config.accessibility, data)?;
        }
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.storage.copy_data(&self.query(key)) {
            Ok(data) => Ok(Some(data)),
            Err(status) if status.is_not_found() => Ok(None),
            Err(status) => Err(status.into()),
        }
    }

    fn fetch_mapping(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        let Some(data) = self.fetch(key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&data)? {
            Value::Object(map) => Ok(Some(map)),
            other => Err(KeyClipError::NotAMapping {
                found: json_kind(&other),
            }),
        }
    }

    fn observe<T>(&self, caller: &'static Location<'static>, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.report(caller, error);
        }
        result
    }

    fn report(&self, caller: &'static Location<'static>, error: &KeyClipError) {
        if self.config.print_error {
            tracing::error!(
                location = %caller,
                service = %self.config.service,
                status = error.status().map(Status::code),
                "[KeyClip] {}",
                error.message()
            );
        }
        if let Some(hook) = &self.on_error {
            hook(error);
        }
    }
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("service", &self.config.service)
            .field("access_group", &self.config.access_group)
            .field("accessibility", &self.config.accessibility)
            .field("print_error", &self.config.print_error)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

fn absent_as_false(result: std::result::Result<(), Status>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(status) if status.is_not_found() => Ok(false),
        Err(status) => Err(status.into()),
    }
}

fn encode_mapping<T: Serialize + ?Sized>(mapping: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(mapping)?;
    if !value.is_object() {
        return Err(KeyClipError::NotAMapping {
            found: json_kind(&value),
        });
    }
    Ok(serde_json::to_vec(&value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
