//! Credential provider trait and the reloadable credential store.
//!
//! [`CredentialStore`] owns the identity-to-secret mapping. The active mapping
//! is an immutable [`CredentialSnapshot`] behind an [`ArcSwap`]: readers load
//! the current pointer without taking a lock, and a reload builds a complete
//! new snapshot before swapping it in with a single pointer store. A failed
//! reload leaves the previous snapshot in place.
//!
//! The source document is a JSON object:
//!
//! ```json
//! { "svc-a": "secret-a", "svc-b": "secret-b" }
//! ```
//!
//! Duplicate identities resolve to the last occurrence in the document.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::LoadError;

/// Shared secret bytes for one identity.
///
/// `Debug` is redacted, and there is no `Display` or `Serialize`.
#[derive(Clone)]
pub struct Secret(Bytes);

impl Secret {
    /// Wrap raw secret bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The raw key bytes. Only signing code should call this.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(Bytes::from(value))
    }
}

/// Trait for looking up the secret of an identity.
///
/// An unknown identity is an ordinary outcome, reported as `None`.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret for `identity`, if the identity is known.
    fn get_secret(&self, identity: &str) -> Option<Secret>;
}

/// An immutable, complete identity-to-secret mapping.
#[derive(Debug, Default)]
pub struct CredentialSnapshot {
    secrets: HashMap<String, Secret>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CredentialSnapshot {
    /// Number of identities in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the snapshot holds no identities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// When the snapshot was built from its source, if it came from one.
    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}

#[derive(Debug, Default)]
struct LoadMetadata {
    last_loaded_at: Option<DateTime<Utc>>,
    last_load_error: Option<String>,
}

/// Operator-facing view of the store's state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStoreStatus {
    /// Where the store reads credentials from.
    pub source_path: PathBuf,
    /// Number of identities in the active snapshot.
    pub identities: usize,
    /// When the active snapshot was last loaded successfully.
    pub last_loaded_at: Option<DateTime<Utc>>,
    /// The error from the most recent failed load, cleared by the next success.
    pub last_load_error: Option<String>,
}

/// Reloadable identity-to-secret store.
///
/// # Examples
///
/// ```
/// use signgate_auth::CredentialStore;
///
/// let store = CredentialStore::from_credentials([("svc-a", "secret-a")]);
/// assert!(store.get("svc-a").is_some());
/// assert!(store.get("svc-b").is_none());
/// ```
#[derive(Debug)]
pub struct CredentialStore {
    source_path: PathBuf,
    active: ArcSwap<CredentialSnapshot>,
    metadata: Mutex<LoadMetadata>,
}

impl CredentialStore {
    /// Create an empty store that will read from `source_path` on reload.
    pub fn empty(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            active: ArcSwap::from_pointee(CredentialSnapshot::default()),
            metadata: Mutex::new(LoadMetadata::default()),
        }
    }

    /// Create a store holding the given credentials, with no backing source.
    pub fn from_credentials<I, S>(credentials: impl IntoIterator<Item = (I, S)>) -> Self
    where
        I: Into<String>,
        S: Into<Secret>,
    {
        let secrets = credentials
            .into_iter()
            .map(|(identity, secret)| (identity.into(), secret.into()))
            .collect();
        let store = Self::empty(PathBuf::new());
        store.active.store(Arc::new(CredentialSnapshot {
            secrets,
            loaded_at: None,
        }));
        store
    }

    /// Load a store from the JSON document at `source_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the source is unreadable, malformed, or holds an
    /// invalid entry. The error is returned to the caller, never raised as a panic.
    pub async fn load(source_path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let store = Self::empty(source_path);
        store.reload().await?;
        Ok(store)
    }

    /// Re-read the source and atomically replace the active snapshot.
    ///
    /// On failure the previous snapshot stays active and the error is recorded
    /// in [`status`](Self::status). Returns the number of identities loaded.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the new source cannot be turned into a snapshot.
    pub async fn reload(&self) -> Result<usize, LoadError> {
        match read_snapshot(&self.source_path).await {
            Ok(snapshot) => {
                let count = snapshot.len();
                let loaded_at = snapshot.loaded_at;

                let mut metadata = self.metadata.lock();
                self.active.store(Arc::new(snapshot));
                metadata.last_loaded_at = loaded_at;
                metadata.last_load_error = None;
                drop(metadata);

                info!(
                    source = %self.source_path.display(),
                    identities = count,
                    "loaded credentials"
                );
                Ok(count)
            }
            Err(err) => {
                warn!(
                    source = %self.source_path.display(),
                    error = %err,
                    "credential reload failed, keeping previous snapshot"
                );
                self.metadata.lock().last_load_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Look up the secret for `identity` in the active snapshot.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<Secret> {
        self.active.load().secrets.get(identity).cloned()
    }

    /// The active snapshot. Holding it keeps that version alive across reloads.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CredentialSnapshot> {
        self.active.load_full()
    }

    /// The path the store reloads from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Current status for operators.
    #[must_use]
    pub fn status(&self) -> CredentialStoreStatus {
        let identities = self.active.load().len();
        let metadata = self.metadata.lock();
        CredentialStoreStatus {
            source_path: self.source_path.clone(),
            identities,
            last_loaded_at: metadata.last_loaded_at,
            last_load_error: metadata.last_load_error.clone(),
        }
    }
}

impl CredentialProvider for CredentialStore {
    fn get_secret(&self, identity: &str) -> Option<Secret> {
        self.get(identity)
    }
}

/// Read and validate a complete snapshot from `path`.
async fn read_snapshot(path: &Path) -> Result<CredentialSnapshot, LoadError> {
    let raw = tokio::fs::read(path).await.map_err(|source| LoadError::Read {
        path: path.to_owned(),
        source,
    })?;
    let secrets = parse_credentials(path, &raw)?;
    Ok(CredentialSnapshot {
        secrets,
        loaded_at: Some(Utc::now()),
    })
}

/// Parse a credential document into an identity-to-secret map.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] for a document that is not an object of strings,
/// and [`LoadError::Invalid`] for an empty identity, an identity containing `:`,
/// or an empty secret.
pub fn parse_credentials(path: &Path, raw: &[u8]) -> Result<HashMap<String, Secret>, LoadError> {
    // serde's map visitor inserts in document order, so the last duplicate wins.
    let entries: HashMap<String, String> =
        serde_json::from_slice(raw).map_err(|e| LoadError::Parse {
            path: path.to_owned(),
            line: e.line(),
            column: e.column(),
        })?;

    let invalid = |reason: String| LoadError::Invalid {
        path: path.to_owned(),
        reason,
    };

    entries
        .into_iter()
        .map(|(identity, secret)| {
            if identity.trim().is_empty() {
                return Err(invalid("an identity is empty".to_owned()));
            }
            if identity.contains(':') {
                return Err(invalid("an identity contains `:`".to_owned()));
            }
            if secret.is_empty() {
                return Err(invalid("an identity has an empty secret".to_owned()));
            }
            Ok((identity, Secret::from(secret)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_source(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn rewrite(file: &tempfile::NamedTempFile, contents: &str) {
        std::fs::write(file.path(), contents).unwrap();
    }

    #[tokio::test]
    async fn test_should_load_credentials_from_file() {
        let file = write_source(r#"{"svc-a": "secret-a", "svc-b": "secret-b"}"#);
        let store = CredentialStore::load(file.path()).await.unwrap();

        assert_eq!(store.get("svc-a").unwrap().expose(), b"secret-a");
        assert_eq!(store.get("svc-b").unwrap().expose(), b"secret-b");
        assert!(store.get("svc-c").is_none());

        let status = store.status();
        assert_eq!(status.identities, 2);
        assert!(status.last_loaded_at.is_some());
        assert!(status.last_load_error.is_none());
    }

    #[tokio::test]
    async fn test_should_let_last_duplicate_identity_win() {
        let file = write_source(r#"{"svc-a": "first", "svc-a": "second"}"#);
        let store = CredentialStore::load(file.path()).await.unwrap();
        assert_eq!(store.get("svc-a").unwrap().expose(), b"second");
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_should_report_unreadable_source() {
        let result = CredentialStore::load("/nonexistent/signgate/credentials.json").await;
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }

    #[tokio::test]
    async fn test_should_report_malformed_source_without_leaking_values() {
        let file = write_source(r#"{"svc-a": "hunter2", "svc-b": 42}"#);
        let err = CredentialStore::load(file.path()).await.unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_should_reject_invalid_entries() {
        for doc in [r#"{"": "x"}"#, r#"{"svc:a": "x"}"#, r#"{"svc-a": ""}"#] {
            let file = write_source(doc);
            let result = CredentialStore::load(file.path()).await;
            assert!(matches!(result, Err(LoadError::Invalid { .. })), "{doc}");
        }
    }

    #[tokio::test]
    async fn test_should_not_name_identity_in_invalid_entry_error() {
        let file = write_source(r#"{"admin-root": "", "svc:ops": "x"}"#);
        let err = CredentialStore::load(file.path()).await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, LoadError::Invalid { .. }));
        assert!(!message.contains("admin-root"));
        assert!(!message.contains("svc:ops"));
    }

    #[tokio::test]
    async fn test_should_keep_snapshot_when_reload_fails() {
        let file = write_source(r#"{"svc-a": "secret-a"}"#);
        let store = CredentialStore::load(file.path()).await.unwrap();
        let loaded_at = store.status().last_loaded_at;

        rewrite(&file, "{ not json");
        assert!(store.reload().await.is_err());

        assert_eq!(store.get("svc-a").unwrap().expose(), b"secret-a");
        let status = store.status();
        assert_eq!(status.identities, 1);
        assert_eq!(status.last_loaded_at, loaded_at);
        assert!(status.last_load_error.is_some());
    }

    #[tokio::test]
    async fn test_should_drop_removed_identity_on_reload() {
        let file = write_source(r#"{"svc-a": "secret-a", "svc-b": "secret-b"}"#);
        let store = CredentialStore::load(file.path()).await.unwrap();

        rewrite(&file, r#"{"svc-a": "rotated"}"#);
        assert_eq!(store.reload().await.unwrap(), 1);

        assert!(store.get("svc-b").is_none());
        assert_eq!(store.get("svc-a").unwrap().expose(), b"rotated");
        assert!(store.status().last_load_error.is_none());
    }

    #[tokio::test]
    async fn test_should_keep_held_snapshot_alive_across_reload() {
        let file = write_source(r#"{"svc-a": "secret-a"}"#);
        let store = CredentialStore::load(file.path()).await.unwrap();
        let before = store.snapshot();

        rewrite(&file, r#"{"svc-b": "secret-b"}"#);
        store.reload().await.unwrap();

        assert_eq!(before.len(), 1);
        assert!(store.get("svc-a").is_none());
        assert!(store.get("svc-b").is_some());
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let store = CredentialStore::from_credentials([("svc-a", "hunter2")]);
        let debug = format!("{store:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_should_implement_credential_provider() {
        let store = CredentialStore::from_credentials([("svc-a", "secret-a")]);
        let provider: &dyn CredentialProvider = &store;
        assert!(provider.get_secret("svc-a").is_some());
        assert!(provider.get_secret("nobody").is_none());
    }
}
