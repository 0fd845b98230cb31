use crate::model::{NewPrediction, OwnerId, PredictionRecord, is_valid_confidence};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// History length shown on the dashboard.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;
/// Largest page a caller may request.
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Not authorized to access the record store")]
    Unauthorized,
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Durable, owner-scoped storage of prediction records.
///
/// Every call may fail or stall; callers must not assume anything was written
/// unless `insert` returned the stored record.
#[async_trait(?Send)]
pub trait RecordStore: Send + Sync {
    /// Assigns id and creation timestamp.
    async fn insert(&self, record: NewPrediction) -> Result<PredictionRecord, StoreError>;

    /// At most `limit` records, newest first. Records created at the same
    /// instant come back latest-inserted first.
    async fn list_by_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Counts every record of the owner regardless of status.
    async fn count_by_owner(&self, owner: OwnerId) -> Result<u64, StoreError>;
}

pub fn validate_new(record: &NewPrediction) -> Result<(), StoreError> {
    if !is_valid_confidence(record.confidence) {
        return Err(StoreError::Constraint(format!(
            "confidence {} outside [0, 1]",
            record.confidence
        )));
    }
    if record.predicted_label.trim().is_empty() {
        return Err(StoreError::Constraint("predicted label is empty".into()));
    }
    Ok(())
}

#[derive(Default)]
pub struct MemoryRecordStore {
    rows: Mutex<Vec<PredictionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_at(
        &self,
        record: NewPrediction,
        created_at: DateTime<Utc>,
    ) -> Result<PredictionRecord, StoreError> {
        validate_new(&record)?;
        let stored = PredictionRecord::from_new(record, Uuid::new_v4(), created_at);
        self.rows()?.push(stored.clone());
        log::debug!("Stored prediction {} for owner {}", stored.id, stored.owner_id);
        Ok(stored)
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<PredictionRecord>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait(?Send)]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: NewPrediction) -> Result<PredictionRecord, StoreError> {
        self.insert_at(record, Utc::now())
    }

    async fn list_by_owner(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StoreError> {
        let rows = self.rows()?;
        // Reverse insertion order first so the stable sort keeps later inserts ahead on ties.
        let mut records: Vec<PredictionRecord> = rows
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn count_by_owner(&self, owner: OwnerId) -> Result<u64, StoreError> {
        let rows = self.rows()?;
        Ok(rows.iter().filter(|r| r.owner_id == owner).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalysisResult, ImageRef, PlantCategory, PredictionStatus};

    fn new_record(owner: OwnerId, label: &str, confidence: f32) -> NewPrediction {
        NewPrediction {
            owner_id: owner,
            image_ref: ImageRef::from_bytes(label.as_bytes()),
            plant_category: PlantCategory::Potato,
            predicted_label: label.to_string(),
            confidence,
            status: PredictionStatus::Completed,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let store = MemoryRecordStore::new();
        let owner = OwnerId(Uuid::new_v4());
        let result = AnalysisResult::new("Late Blight", 0.91).unwrap();
        let new = NewPrediction::completed(
            owner,
            ImageRef::from_bytes(b"leaf"),
            PlantCategory::Potato,
            &result,
        );

        let a = store.insert(new.clone()).await.unwrap();
        let b = store.insert(new).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.created_at >= a.created_at);
        assert_eq!(a.predicted_label, "Late Blight");
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_confidence() {
        let store = MemoryRecordStore::new();
        let owner = OwnerId(Uuid::new_v4());
        let err = store.insert(new_record(owner, "Healthy", 1.5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.count_by_owner(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_limited() {
        let store = MemoryRecordStore::new();
        let owner = OwnerId(Uuid::new_v4());
        for i in 0..8 {
            store
                .insert(new_record(owner, &format!("label-{i}"), 0.5))
                .await
                .unwrap();
        }

        let recent = store.list_by_owner(owner, DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 5);
        let labels: Vec<_> = recent.iter().map(|r| r.predicted_label.as_str()).collect();
        assert_eq!(labels, vec!["label-7", "label-6", "label-5", "label-4", "label-3"]);
        for pair in recent.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_equal_timestamps_list_latest_insert_first() {
        let store = MemoryRecordStore::new();
        let owner = OwnerId(Uuid::new_v4());
        let instant = Utc::now();
        let earlier = instant - chrono::Duration::seconds(1);
        store.insert_at(new_record(owner, "older", 0.5), earlier).unwrap();
        for label in ["first", "second", "third"] {
            store.insert_at(new_record(owner, label, 0.5), instant).unwrap();
        }

        let recent = store.list_by_owner(owner, 10).await.unwrap();
        let labels: Vec<_> = recent.iter().map(|r| r.predicted_label.as_str()).collect();
        assert_eq!(labels, vec!["third", "second", "first", "older"]);

        let top = store.list_by_owner(owner, 2).await.unwrap();
        assert_eq!(top[0].predicted_label, "third");
        assert_eq!(top[1].predicted_label, "second");
    }

    #[tokio::test]
    async fn test_reads_are_scoped_by_owner() {
        let store = MemoryRecordStore::new();
        let alice = OwnerId(Uuid::new_v4());
        let bob = OwnerId(Uuid::new_v4());
        store.insert(new_record(alice, "Healthy", 0.93)).await.unwrap();
        store.insert(new_record(alice, "Early Blight", 0.87)).await.unwrap();
        store.insert(new_record(bob, "Late Blight", 0.91)).await.unwrap();

        assert_eq!(store.count_by_owner(alice).await.unwrap(), 2);
        assert_eq!(store.count_by_owner(bob).await.unwrap(), 1);
        let bobs = store.list_by_owner(bob, 10).await.unwrap();
        assert!(bobs.iter().all(|r| r.owner_id == bob));
    }

    #[tokio::test]
    async fn test_count_includes_every_status() {
        let store = MemoryRecordStore::new();
        let owner = OwnerId(Uuid::new_v4());
        let mut failed = new_record(owner, "Unknown", 0.0);
        failed.status = PredictionStatus::Failed;
        let mut pending = new_record(owner, "Pending", 0.0);
        pending.status = PredictionStatus::Pending;
        store.insert(failed).await.unwrap();
        store.insert(pending).await.unwrap();
        store.insert(new_record(owner, "Healthy", 0.93)).await.unwrap();
        assert_eq!(store.count_by_owner(owner).await.unwrap(), 3);
    }
}
