//! Per-request storage and record-store construction.
//!
//! The caller's credential is passed through to the hosted services as-is;
//! nothing here inspects or validates it.

use crate::config::{MetadataProvider, Settings, StorageProvider};
use crate::error::{Result, TldwError};
use crate::metadata::{PostgrestRecordStore, RecordStore, SqliteRecordStore};
use crate::storage::{Buckets, LocalObjectStore, MemoryObjectStore, ObjectStore, SupabaseObjectStore};
use std::sync::Arc;
use tracing::debug;

/// Opaque access token forwarded to storage and metadata services.
#[derive(Clone, Default)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Builds the stores a pipeline stage works against.
pub trait Backend: Send + Sync {
    fn object_store(&self, credential: &Credential) -> Result<Arc<dyn ObjectStore>>;

    fn record_store(&self, credential: &Credential) -> Result<Arc<dyn RecordStore>>;
}

/// Backend assembled from [`Settings`].
///
/// Supabase providers get a fresh client per credential. Local, memory and
/// SQLite providers are shared across requests.
pub struct ConfiguredBackend {
    buckets: Buckets,
    supabase: Option<(String, String)>,
    shared_objects: Option<Arc<dyn ObjectStore>>,
    shared_records: Option<Arc<dyn RecordStore>>,
}

impl ConfiguredBackend {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let buckets = Buckets::from_settings(&settings.storage);
        let supabase = match (settings.storage.resolved_url(), settings.storage.resolved_api_key()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        };

        let shared_objects: Option<Arc<dyn ObjectStore>> = match settings.storage.provider {
            StorageProvider::Supabase => None,
            StorageProvider::Local => Some(Arc::new(LocalObjectStore::new(
                &settings.local_storage_dir(),
                buckets.clone(),
            ))),
            StorageProvider::Memory => Some(Arc::new(MemoryObjectStore::new())),
        };

        let shared_records: Option<Arc<dyn RecordStore>> = match settings.metadata.provider {
            MetadataProvider::Supabase => None,
            MetadataProvider::Sqlite => Some(Arc::new(SqliteRecordStore::new(&settings.sqlite_path())?)),
        };

        let needs_supabase = shared_objects.is_none() || shared_records.is_none();
        if needs_supabase && supabase.is_none() {
            return Err(TldwError::Config(
                "Supabase provider selected but SUPABASE_URL / SUPABASE_KEY are not set".to_string(),
            ));
        }

        debug!(
            storage = %settings.storage.provider,
            metadata = %settings.metadata.provider,
            "Backend configured"
        );

        Ok(Self {
            buckets,
            supabase,
            shared_objects,
            shared_records,
        })
    }

    fn supabase(&self) -> Result<(&str, &str)> {
        self.supabase
            .as_ref()
            .map(|(url, key)| (url.as_str(), key.as_str()))
            .ok_or_else(|| TldwError::Config("Supabase credentials are not configured".to_string()))
    }
}

impl Backend for ConfiguredBackend {
    fn object_store(&self, credential: &Credential) -> Result<Arc<dyn ObjectStore>> {
        if let Some(store) = &self.shared_objects {
            return Ok(store.clone());
        }
        let (url, key) = self.supabase()?;
        Ok(Arc::new(SupabaseObjectStore::new(
            url,
            key,
            credential.token(),
            self.buckets.clone(),
        )?))
    }

    fn record_store(&self, credential: &Credential) -> Result<Arc<dyn RecordStore>> {
        if let Some(store) = &self.shared_records {
            return Ok(store.clone());
        }
        let (url, key) = self.supabase()?;
        Ok(Arc::new(PostgrestRecordStore::new(url, key, credential.token())?))
    }
}

/// Backend that hands out the same stores regardless of credential.
pub struct StaticBackend {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
}

impl StaticBackend {
    pub fn new(objects: Arc<dyn ObjectStore>, records: Arc<dyn RecordStore>) -> Self {
        Self { objects, records }
    }
}

impl Backend for StaticBackend {
    fn object_store(&self, _credential: &Credential) -> Result<Arc<dyn ObjectStore>> {
        Ok(self.objects.clone())
    }

    fn record_store(&self, _credential: &Credential) -> Result<Arc<dyn RecordStore>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_is_redacted() {
        let credential = Credential::new("secret-jwt");
        assert_eq!(format!("{:?}", credential), "Credential(<redacted>)");
        assert_eq!(credential.token(), "secret-jwt");
    }

    #[test]
    fn test_local_backend_shares_stores() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.provider = StorageProvider::Local;
        settings.storage.local_dir = dir.path().join("objects").to_string_lossy().into_owned();
        settings.metadata.provider = MetadataProvider::Sqlite;
        settings.metadata.sqlite_path = dir.path().join("meta.db").to_string_lossy().into_owned();

        let backend = ConfiguredBackend::from_settings(&settings).unwrap();
        let a = backend.object_store(&Credential::new("a")).unwrap();
        let b = backend.object_store(&Credential::new("b")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(backend.record_store(&Credential::default()).is_ok());
    }

    #[test]
    fn test_supabase_backend_with_explicit_credentials() {
        let mut settings = Settings::default();
        settings.storage.url = Some("https://proj.supabase.co".to_string());
        settings.storage.api_key = Some("anon".to_string());

        let backend = ConfiguredBackend::from_settings(&settings).unwrap();
        assert!(backend.object_store(&Credential::new("jwt")).is_ok());
        assert!(backend.record_store(&Credential::new("jwt")).is_ok());
    }
}
