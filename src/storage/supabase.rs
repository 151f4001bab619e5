//! Supabase Storage REST client.
//!
//! Requests carry the project API key plus the caller's access token, so
//! bucket policies are evaluated for the user who triggered the pipeline.

use super::{Buckets, Namespace, ObjectEntry, ObjectStore};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

/// Page size for listings. Matches the per-video segment cap.
const LIST_LIMIT: usize = 1000;

/// Placeholder object Supabase keeps in otherwise empty folders.
const EMPTY_FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Object store backed by Supabase Storage.
pub struct SupabaseObjectStore {
    client: reqwest::Client,
    base: Url,
    api_key: String,
    access_token: String,
    buckets: Buckets,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    /// Folders come back without an id.
    #[serde(default)]
    id: Option<serde_json::Value>,
}

impl SupabaseObjectStore {
    pub fn new(base_url: &str, api_key: &str, access_token: &str, buckets: Buckets) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| TldwError::Config(format!("Invalid Supabase URL {base_url}: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base,
            api_key: api_key.to_string(),
            access_token: access_token.to_string(),
            buckets,
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TldwError::Config(format!("Supabase URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, namespace: Namespace, key: &str) -> Result<Url> {
        let bucket = self.buckets.name(namespace);
        self.endpoint(
            ["storage", "v1", "object", bucket]
                .into_iter()
                .chain(key.split('/').filter(|s| !s.is_empty())),
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }
}

/// Supabase reports missing objects either as 404 or as 400 with a not-found body.
fn is_not_found(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    let body = body.to_lowercase();
    status == StatusCode::BAD_REQUEST && (body.contains("not_found") || body.contains("not found"))
}

async fn error_from(response: Response, namespace: Namespace, key: &str) -> TldwError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if is_not_found(status, &body) {
        TldwError::ObjectNotFound(format!("{}/{}", namespace, key))
    } else {
        TldwError::Storage(format!("{}/{} returned {}: {}", namespace, key, status, body))
    }
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, namespace: Namespace, key: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.object_url(namespace, key)?;

        let response = self
            .authorize(self.client.post(url))
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, content_type(key))
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response, namespace, key).await);
        }

        debug!("Uploaded {}/{}", namespace, key);
        Ok(())
    }

    async fn download(&self, namespace: Namespace, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(namespace, key)?;

        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response, namespace, key).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn list(&self, namespace: Namespace, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let bucket = self.buckets.name(namespace);
        let url = self.endpoint(["storage", "v1", "object", "list", bucket])?;

        let response = self
            .authorize(self.client.post(url))
            .json(&json!({
                "prefix": prefix.trim_end_matches('/'),
                "limit": LIST_LIMIT,
                "offset": 0,
                "sortBy": { "column": "name", "order": "asc" },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response, namespace, prefix).await);
        }

        let listed: Vec<ListEntry> = response.json().await?;
        let mut entries: Vec<ObjectEntry> = listed
            .into_iter()
            .filter(|e| e.id.is_some() && e.name != EMPTY_FOLDER_PLACEHOLDER)
            .map(|e| ObjectEntry { name: e.name })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(entries)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<()> {
        let url = self.object_url(namespace, key)?;

        let response = self.authorize(self.client.delete(url)).send().await?;
        if !response.status().is_success() {
            return Err(error_from(response, namespace, key).await);
        }

        Ok(())
    }
}

fn content_type(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
