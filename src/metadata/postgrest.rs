//! Supabase PostgREST record store.

use super::{Filter, Record, RecordStore, Table};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use tracing::{debug, instrument};
use url::Url;

/// Record store backed by the Supabase REST API (`/rest/v1`).
pub struct PostgrestRecordStore {
    client: reqwest::Client,
    base: Url,
    api_key: String,
    access_token: String,
}

impl PostgrestRecordStore {
    pub fn new(base_url: &str, api_key: &str, access_token: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| TldwError::Config(format!("Invalid Supabase URL {base_url}: {e}")))?;

        Ok(Self {
            client: reqwest::Client::new(),
            base,
            api_key: api_key.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn table_url(&self, table: Table) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TldwError::Config(format!("Supabase URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(["rest", "v1", table.name()]);
        Ok(url)
    }

    /// `?select=*&col=eq.value` for each filter pair.
    fn select_url(&self, table: Table, filter: &Filter<'_>) -> Result<Url> {
        let mut url = self.table_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, value) in filter {
                query.append_pair(column, &format!("eq.{}", value));
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl RecordStore for PostgrestRecordStore {
    #[instrument(skip(self))]
    async fn select(&self, table: Table, filter: &Filter<'_>) -> Result<Vec<Record>> {
        for (column, _) in filter {
            table.check_column(column)?;
        }
        let url = self.select_url(table, filter)?;

        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TldwError::RecordStore(format!(
                "select from {} returned {}: {}",
                table, status, body
            )));
        }

        let rows: Vec<Record> = response.json().await?;
        debug!("Selected {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: Table, row: Record) -> Result<()> {
        for column in row.keys() {
            table.check_column(column)?;
        }
        let url = self.table_url(table)?;

        let response = self
            .authorize(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TldwError::RecordStore(format!(
                "insert into {} returned {}: {}",
                table, status, body
            )));
        }

        debug!("Inserted row into {}", table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_url() {
        let store = PostgrestRecordStore::new("https://proj.supabase.co", "anon", "jwt").unwrap();
        let url = store
            .select_url(Table::UserVideos, &[("videoId", "abc123"), ("userId", "u1")])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://proj.supabase.co/rest/v1/user_videos?select=*&videoId=eq.abc123&userId=eq.u1"
        );
    }

    #[test]
    fn test_table_url() {
        let store = PostgrestRecordStore::new("https://proj.supabase.co/", "anon", "jwt").unwrap();
        assert_eq!(
            store.table_url(Table::Users).unwrap().as_str(),
            "https://proj.supabase.co/rest/v1/users"
        );
    }
}
