//! Idempotent user/video registration.
//!
//! Each row is checked before it is inserted. The check and the insert are
//! separate calls, so two concurrent registrations of the same pair can
//! both insert.

use super::{record, RecordStore, Table};
use crate::error::{with_timeout, Result, TldwError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Which rows a registration created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registration {
    pub user_created: bool,
    pub video_created: bool,
    pub association_created: bool,
}

impl Registration {
    pub fn created_any(&self) -> bool {
        self.user_created || self.video_created || self.association_created
    }
}

/// Ensures user, video and association rows exist.
pub struct MetadataRegistrar {
    store: Arc<dyn RecordStore>,
    timeout: Option<Duration>,
}

impl MetadataRegistrar {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every store call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register `user_id` as having submitted `video_id`.
    ///
    /// The first failing read or write aborts the remaining steps.
    #[instrument(skip(self, email))]
    pub async fn register(&self, user_id: &str, email: &str, video_id: &str) -> Result<Registration> {
        let user_created = self
            .ensure(
                Table::Users,
                &[("userId", user_id)],
                &[("userId", user_id), ("email", email)],
            )
            .await?;

        let video_created = self
            .ensure(Table::Videos, &[("videoId", video_id)], &[("videoId", video_id)])
            .await?;

        let pair = [("videoId", video_id), ("userId", user_id)];
        let association_created = self.ensure(Table::UserVideos, &pair, &pair).await?;

        let registration = Registration {
            user_created,
            video_created,
            association_created,
        };
        info!(?registration, "Metadata registered");
        Ok(registration)
    }

    /// Insert `row` unless a row matching `filter` exists. Returns whether it inserted.
    async fn ensure(
        &self,
        table: Table,
        filter: &[(&str, &str)],
        row: &[(&str, &str)],
    ) -> Result<bool> {
        let existing = with_timeout(self.timeout, "record select", self.store.select(table, filter))
            .await
            .map_err(|e| TldwError::Registrar(format!("checking {}: {}", table, e)))?;

        if !existing.is_empty() {
            debug!("{} row already present", table);
            return Ok(false);
        }

        with_timeout(
            self.timeout,
            "record insert",
            self.store.insert(table, record(row.iter().copied())),
        )
        .await
        .map_err(|e| TldwError::Registrar(format!("inserting into {}: {}", table, e)))?;

        debug!("Inserted {} row", table);
        Ok(true)
    }
}
