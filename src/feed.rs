// src/feed.rs

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;
use crate::store::{
    ChangeEvent, ChangeKind, Collection, Query, RecordStore, Subscription, decode_rows,
};

/// Records that carry a stable, unique identifier.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// Merges a stream of change events into a previously fetched ordered
/// snapshot, keeping the in-memory sequence consistent with what a fresh
/// fetch-and-sort would produce.
pub struct Reconciler<T> {
    records: Vec<T>,
}

impl<T: Keyed + DeserializeOwned> Reconciler<T> {
    /// Starts from one full read, already sorted per the defining order of
    /// the collection.
    pub fn from_snapshot(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies one change notification.
    ///
    /// * Insert: prepend. Models descending-creation-time insertion without
    ///   re-sorting; assumes the feed delivers inserts in commit order.
    /// * Update: replace in place by id; an unmatched update is dropped,
    ///   never promoted to an insert.
    /// * Delete: remove by id; no-op when absent. The payload may carry
    ///   only the id.
    ///
    /// Update and Delete are idempotent under redelivery. Insert is not:
    /// the upstream feed must not redeliver inserts.
    pub fn apply(&mut self, event: ChangeEvent) {
        match event.kind {
            ChangeKind::Insert => match serde_json::from_value::<T>(event.record) {
                Ok(record) => self.records.insert(0, record),
                Err(e) => tracing::warn!("Skipping malformed insert event: {:?}", e),
            },
            ChangeKind::Update => match serde_json::from_value::<T>(event.record) {
                Ok(record) => {
                    match self.records.iter_mut().find(|held| held.key() == record.key()) {
                        Some(held) => *held = record,
                        None => tracing::debug!("Dropping update for unknown record #{}", record.key()),
                    }
                }
                Err(e) => tracing::warn!("Skipping malformed update event: {:?}", e),
            },
            ChangeKind::Delete => match event.record.get("id").and_then(Value::as_i64) {
                Some(id) => self.records.retain(|held| held.key() != id),
                None => tracing::warn!("Skipping delete event without an id"),
            },
        }
    }
}

/// A reconciled view of a collection plus the live subscription feeding it.
///
/// Owns the subscription handle, so dropping the feed (or calling
/// [`close`](Self::close)) releases it on every exit path of the view.
pub struct LiveFeed<T> {
    reconciler: Reconciler<T>,
    subscription: Subscription,
}

impl<T: Keyed + DeserializeOwned> LiveFeed<T> {
    /// Performs the initial full read and opens the subscription.
    pub async fn open(
        store: &dyn RecordStore,
        collection: Collection,
        query: Query,
    ) -> Result<Self, AppError> {
        let rows = store.fetch(collection, query).await?;
        let records = decode_rows(collection, rows)?;
        let subscription = store.subscribe(collection).await?;

        Ok(Self {
            reconciler: Reconciler::from_snapshot(records),
            subscription,
        })
    }

    pub fn records(&self) -> &[T] {
        self.reconciler.records()
    }

    /// Applies every change already delivered, without waiting.
    /// Returns how many events were applied.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.try_next() {
            self.reconciler.apply(event);
            applied += 1;
        }
        applied
    }

    /// Waits for one change and applies it. Returns `false` once the feed
    /// has ended; the caller may reopen explicitly, no automatic
    /// resubscription happens here.
    pub async fn next_change(&mut self) -> bool {
        match self.subscription.next_event().await {
            Some(event) => {
                self.reconciler.apply(event);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_live()
    }

    /// Releases the subscription. Idempotent; also happens on drop.
    pub fn close(&mut self) {
        self.subscription.end();
    }
}
