//! Dedup/merge store: the two result sets, the seen-id set, and the rule that
//! every successful mutation is persisted before it is reported.
use crate::codec;
use crate::model::{Kind, RecordId, Row};
use crate::ordering;
use crate::persistence::SnapshotStore;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist {kind} snapshot: {source:#}")]
    Persist {
        kind: Kind,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to load persisted snapshots: {0:#}")]
    Load(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row admitted at `index` of its result set.
    Inserted { index: usize, id: Option<RecordId> },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(Row),
    OutOfRange { len: usize },
}

pub struct Store<P> {
    persistence: P,
    seen: BTreeSet<RecordId>,
    hidden: Vec<Row>,
    public: Vec<Row>,
}

impl<P: SnapshotStore> Store<P> {
    /// Seed both result sets and the seen-id set from `persistence`.
    ///
    /// Snapshots written by older builds may be unsorted or hold duplicates;
    /// they are normalised here with the same first-writer-wins rule as
    /// `insert`.
    #[instrument(skip_all)]
    pub async fn load(persistence: P) -> Result<Self, StoreError> {
        let mut seen: BTreeSet<RecordId> = persistence
            .load_seen()
            .await
            .map_err(StoreError::Load)?
            .into_iter()
            .collect();

        let mut sets = Vec::with_capacity(2);
        let mut admitted = BTreeSet::new();
        for kind in Kind::ALL {
            let mut rows = persistence.load(kind).await.map_err(StoreError::Load)?;
            rows.retain(|row| match codec::extract_id(row) {
                Some(id) => admitted.insert(id),
                None => true,
            });
            rows.sort_by(ordering::compare);
            sets.push(rows);
        }
        seen.extend(admitted);
        let public = sets.pop().unwrap_or_default();
        let hidden = sets.pop().unwrap_or_default();

        info!(
            hidden = hidden.len(),
            public = public.len(),
            seen = seen.len(),
            "store seeded from snapshots"
        );
        Ok(Self {
            persistence,
            seen,
            hidden,
            public,
        })
    }

    pub fn rows(&self, kind: Kind) -> &[Row] {
        match kind {
            Kind::Hidden => &self.hidden,
            Kind::Public => &self.public,
        }
    }

    pub fn len(&self, kind: Kind) -> usize {
        self.rows(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.public.is_empty()
    }

    pub fn seen_ids(&self) -> &BTreeSet<RecordId> {
        &self.seen
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.seen.contains(id)
    }

    /// Seen ids in ascending order, as sent in the `exclude_ids` hint.
    pub fn exclude_ids(&self) -> Vec<String> {
        self.seen.iter().map(|id| id.0.clone()).collect()
    }

    fn rows_mut(&mut self, kind: Kind) -> &mut Vec<Row> {
        match kind {
            Kind::Hidden => &mut self.hidden,
            Kind::Public => &mut self.public,
        }
    }

    /// Admit `row` unless its id was seen before. Rows without an id are
    /// always admitted and never deduplicated.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn insert(&mut self, kind: Kind, row: Row) -> Result<InsertOutcome, StoreError> {
        let id = codec::extract_id(&row);
        if let Some(id) = &id {
            if self.seen.contains(id) {
                debug!(%id, "duplicate record skipped");
                return Ok(InsertOutcome::Skipped(SkipReason::DuplicateId));
            }
        }

        let rows = self.rows_mut(kind);
        let index = ordering::insertion_index(rows, &row);
        rows.insert(index, row);
        if let Some(id) = &id {
            self.seen.insert(id.clone());
        }

        if let Err(err) = self.persist(kind, id.is_some()).await {
            self.rows_mut(kind).remove(index);
            if let Some(id) = &id {
                self.seen.remove(id);
            }
            // The rows snapshot may already hold the row if only the seen-id
            // write failed.
            if let Err(resave) = self.persistence.save(kind, self.rows(kind)).await {
                warn!(?resave, "failed to restore snapshot after rollback");
            }
            return Err(err);
        }
        Ok(InsertOutcome::Inserted { index, id })
    }

    /// Remove the row at `index`. Its id stays seen, so the record is not
    /// re-admitted when the producer offers it again.
    #[instrument(skip_all, fields(kind = %kind, index = index))]
    pub async fn delete(&mut self, kind: Kind, index: usize) -> Result<DeleteOutcome, StoreError> {
        let rows = self.rows_mut(kind);
        if index >= rows.len() {
            return Ok(DeleteOutcome::OutOfRange { len: rows.len() });
        }
        let removed = rows.remove(index);

        if let Err(err) = self.persist(kind, false).await {
            self.rows_mut(kind).insert(index, removed);
            return Err(err);
        }
        Ok(DeleteOutcome::Deleted(removed))
    }

    /// Merge a batch of raw lines (one-shot fetch) through `insert`. Lines
    /// that fail to decode are counted and skipped.
    pub async fn merge_lines(
        &mut self,
        kind: Kind,
        lines: &[String],
    ) -> Result<MergeReport, StoreError> {
        let mut report = MergeReport::default();
        for line in lines {
            match codec::decode(line) {
                Ok(row) => match self.insert(kind, row).await? {
                    InsertOutcome::Inserted { .. } => report.inserted += 1,
                    InsertOutcome::Skipped(_) => report.skipped += 1,
                },
                Err(_) => report.malformed += 1,
            }
        }
        Ok(report)
    }

    async fn persist(&self, kind: Kind, seen_changed: bool) -> Result<(), StoreError> {
        self.persistence
            .save(kind, self.rows(kind))
            .await
            .map_err(|source| StoreError::Persist { kind, source })?;
        if seen_changed {
            let ids: Vec<RecordId> = self.seen.iter().cloned().collect();
            self.persistence
                .save_seen(&ids)
                .await
                .map_err(|source| StoreError::Persist { kind, source })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub skipped: usize,
    pub malformed: usize,
}
