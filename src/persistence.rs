//! Durable snapshots of the result sets, the seen-id set and the last job.
//!
//! Every value is stored as JSON under a fixed key in the SQLite `kv_store`
//! table. Result sets are kept as their encoded line form so that a snapshot
//! reads the same as the export file.
use crate::codec;
use crate::db::{self, Pool};
use crate::job::JobRequest;
use crate::model::{Kind, RecordId, Row};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

pub const SEEN_IDS_KEY: &str = "seen_ids";
pub const LAST_JOB_KEY: &str = "last_job";

pub fn results_key(kind: Kind) -> String {
    format!("results:{}", kind.as_str())
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, kind: Kind, rows: &[Row]) -> Result<()>;

    /// Persisted rows for `kind`, or empty when nothing was saved yet.
    async fn load(&self, kind: Kind) -> Result<Vec<Row>>;

    async fn save_seen(&self, ids: &[RecordId]) -> Result<()>;

    async fn load_seen(&self) -> Result<Vec<RecordId>>;

    async fn save_job(&self, job: &JobRequest) -> Result<()>;

    async fn load_job(&self) -> Result<Option<JobRequest>>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshots {
    pool: Pool,
}

impl SqliteSnapshots {
    /// Open (and migrate) the database at `database_url`.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = db::init_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = db::get_value(&self.pool, key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt snapshot under key {}", key))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshots {
    async fn save(&self, kind: Kind, rows: &[Row]) -> Result<()> {
        let lines: Vec<String> = rows.iter().map(codec::encode).collect();
        let json = serde_json::to_string(&lines)?;
        db::put_value(&self.pool, &results_key(kind), &json).await?;
        debug!(%kind, rows = rows.len(), "snapshot saved");
        Ok(())
    }

    async fn load(&self, kind: Kind) -> Result<Vec<Row>> {
        let lines: Vec<String> = self
            .load_json(&results_key(kind))
            .await?
            .unwrap_or_default();
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            match codec::decode(&line) {
                Ok(row) => rows.push(row),
                Err(err) => warn!(%kind, ?err, line = %line, "skipping unreadable snapshot line"),
            }
        }
        Ok(rows)
    }

    async fn save_seen(&self, ids: &[RecordId]) -> Result<()> {
        let json = serde_json::to_string(ids)?;
        db::put_value(&self.pool, SEEN_IDS_KEY, &json).await
    }

    async fn load_seen(&self) -> Result<Vec<RecordId>> {
        Ok(self.load_json(SEEN_IDS_KEY).await?.unwrap_or_default())
    }

    async fn save_job(&self, job: &JobRequest) -> Result<()> {
        let json = serde_json::to_string(job)?;
        db::put_value(&self.pool, LAST_JOB_KEY, &json).await
    }

    async fn load_job(&self) -> Result<Option<JobRequest>> {
        self.load_json(LAST_JOB_KEY).await
    }
}
