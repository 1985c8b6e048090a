use crate::models::{LocationId, UpdateInstruction, UpdateOutcome};
use crate::services::metrics::record_batch_outcome;
use crate::services::{LocationError, LocationSnapshot, LocationStore};
use std::sync::Arc;

/// Applies a batch of partial updates, one record at a time.
///
/// Records are independent: a bad id, an instruction with nothing to
/// change, a no-op update, or a store error fails that record only.
#[derive(Clone)]
pub struct BatchReconciler {
    store: Arc<dyn LocationStore>,
    snapshot: LocationSnapshot,
}

impl BatchReconciler {
    pub fn new(store: Arc<dyn LocationStore>, snapshot: LocationSnapshot) -> Self {
        Self { store, snapshot }
    }

    pub async fn apply(&self, batch: &[UpdateInstruction]) -> Result<UpdateOutcome, LocationError> {
        let mut outcome = UpdateOutcome::default();

        for instruction in batch {
            match self.apply_one(instruction).await {
                Ok(modified) if modified > 0 => {
                    outcome.record_updated(instruction.id.as_str(), modified)
                }
                Ok(_) => outcome.record_failed(instruction.id.as_str()),
                Err(e) => {
                    tracing::warn!(id = %instruction.id, error = %e, "Location update failed");
                    outcome.record_failed(instruction.id.as_str());
                }
            }
        }

        if outcome.is_empty() {
            return Err(LocationError::NotFound);
        }

        record_batch_outcome(&outcome);
        tracing::info!(
            updated = outcome.updated_ids.len(),
            failed = outcome.failed_ids.len(),
            modified = outcome.updated_count,
            "Batch update applied"
        );

        if !outcome.updated_ids.is_empty() {
            self.snapshot.invalidate().await;
        }

        Ok(outcome)
    }

    /// Modified count for one instruction; 0 when nothing was written.
    async fn apply_one(&self, instruction: &UpdateInstruction) -> Result<u64, LocationError> {
        let id: LocationId = instruction.id.parse()?;

        let changes = instruction.changes();
        if changes.is_empty() {
            tracing::debug!(id = %id, "Update instruction carries no fields");
            return Ok(0);
        }

        self.store.update_if_changed(&id, &changes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use crate::services::{InMemoryCache, InMemoryLocationStore, KeyValueCache};
    use std::collections::HashSet;
    use std::time::Duration;

    const KEY: &str = "cached_db_locations";
    const FIRST: &str = "67d562e3d9f2d225ca4d9918";
    const SECOND: &str = "67d562e3d9f2d225ca4d9919";

    fn location(id: &str, name: &str) -> Location {
        Location {
            id: id.into(),
            name: name.into(),
            latitude: 1.1,
            longitude: 1.1,
            marker_color: "FFFFFF".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn rename(id: &str, name: &str) -> UpdateInstruction {
        UpdateInstruction {
            id: id.into(),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    fn reconciler() -> (BatchReconciler, Arc<InMemoryLocationStore>, Arc<InMemoryCache>) {
        let store = Arc::new(InMemoryLocationStore::with_locations(vec![
            location(FIRST, "test"),
            location(SECOND, "test2"),
        ]));
        let cache = Arc::new(InMemoryCache::new());
        let snapshot =
            LocationSnapshot::new(store.clone(), cache.clone(), KEY, Duration::from_secs(30));
        (BatchReconciler::new(store.clone(), snapshot), store, cache)
    }

    fn assert_partition(batch: &[UpdateInstruction], outcome: &UpdateOutcome) {
        assert_eq!(
            outcome.updated_ids.len() + outcome.failed_ids.len(),
            batch.len()
        );
        let updated: HashSet<_> = outcome.updated_ids.iter().collect();
        assert!(outcome.failed_ids.iter().all(|id| !updated.contains(id)));
    }

    #[tokio::test]
    async fn real_change_and_no_op_split_into_updated_and_failed() {
        let (reconciler, store, _cache) = reconciler();
        let batch = vec![rename(FIRST, "renamed"), rename(SECOND, "test2")];

        let outcome = reconciler.apply(&batch).await.unwrap();

        assert_eq!(outcome.updated_ids, vec![FIRST.to_string()]);
        assert_eq!(outcome.failed_ids, vec![SECOND.to_string()]);
        assert_eq!(outcome.updated_count, 1);
        assert_partition(&batch, &outcome);

        let stored = store.find_by_id(&FIRST.parse().unwrap()).await.unwrap();
        assert_eq!(stored.name, "renamed");
    }

    #[tokio::test]
    async fn malformed_ids_fail_without_touching_the_store() {
        let (reconciler, store, _cache) = reconciler();
        let batch = vec![rename("test", "x"), rename("", "y")];

        let outcome = reconciler.apply(&batch).await.unwrap();

        assert_eq!(outcome.failed_ids, vec!["test".to_string(), String::new()]);
        assert!(outcome.updated_ids.is_empty());
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn instruction_with_only_zero_values_fails() {
        let (reconciler, store, _cache) = reconciler();
        let batch = vec![UpdateInstruction {
            id: FIRST.into(),
            name: Some(String::new()),
            latitude: Some(0.0),
            longitude: Some(0.0),
            marker_color: None,
        }];

        let outcome = reconciler.apply(&batch).await.unwrap();

        assert_eq!(outcome.failed_ids, vec![FIRST.to_string()]);
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_but_well_formed_id_fails() {
        let (reconciler, _store, _cache) = reconciler();
        let missing = LocationId::generate().to_string();

        let outcome = reconciler.apply(&[rename(&missing, "x")]).await.unwrap();

        assert_eq!(outcome.failed_ids, vec![missing]);
    }

    #[tokio::test]
    async fn store_errors_fail_each_record() {
        let (reconciler, store, _cache) = reconciler();
        store.set_unavailable(true);
        let batch = vec![rename(FIRST, "a"), rename(SECOND, "b")];

        let outcome = reconciler.apply(&batch).await.unwrap();

        assert_eq!(outcome.failed_ids.len(), 2);
        assert_partition(&batch, &outcome);
    }

    #[tokio::test]
    async fn empty_batch_is_not_found() {
        let (reconciler, _store, _cache) = reconciler();

        let err = reconciler.apply(&[]).await.unwrap_err();
        assert!(matches!(err, LocationError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_ids_are_reported_per_instruction() {
        let (reconciler, _store, _cache) = reconciler();
        let batch = vec![rename(FIRST, "once"), rename(FIRST, "once")];

        let outcome = reconciler.apply(&batch).await.unwrap();

        assert_eq!(outcome.updated_ids, vec![FIRST.to_string()]);
        assert_eq!(outcome.failed_ids, vec![FIRST.to_string()]);
    }

    #[tokio::test]
    async fn success_invalidates_the_snapshot() {
        let (reconciler, _store, cache) = reconciler();
        cache.set(KEY, "{\"locations\":[]}", Duration::from_secs(30)).await.unwrap();

        reconciler.apply(&[rename(FIRST, "renamed")]).await.unwrap();

        assert!(cache.peek(KEY).is_none());
    }

    #[tokio::test]
    async fn total_failure_leaves_the_snapshot_alone() {
        let (reconciler, _store, cache) = reconciler();
        cache.set(KEY, "{\"locations\":[]}", Duration::from_secs(30)).await.unwrap();

        reconciler.apply(&[rename(FIRST, "test")]).await.unwrap();

        assert_eq!(cache.deletes(), 0);
        assert!(cache.peek(KEY).is_some());
    }
}
