// src/store/memory.rs

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::error::AppError;
use crate::store::{
    ChangeEvent, ChangeKind, Collection, Query, RecordStore, SessionUser, StoredObject,
    Subscription,
};

const FEED_CAPACITY: usize = 64;

/// In-process record store.
///
/// Backs the integration tests and the demo binary: collections are plain
/// vectors of raw rows, the change feed is a per-collection broadcast
/// channel, and uploaded objects live in a map. Semantics match the hosted
/// service closely enough that the service layer cannot tell them apart.
///
/// Locks are never held across an await point. A poisoned lock implies a
/// prior panic in this process, so guard acquisition unwraps.
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
    feeds: Mutex<HashMap<Collection, broadcast::Sender<ChangeEvent>>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    user: RwLock<Option<SessionUser>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            feeds: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            user: RwLock::new(None),
        }
    }

    /// Establishes a session, so `current_user` reports this user from now
    /// on. The hosted service does this through its auth flow.
    pub fn sign_in(&self, user: SessionUser) {
        *self.user.write().unwrap() = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap() = None;
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, AtomicOrdering::Relaxed)
    }

    /// Keeps the id counter ahead of externally supplied ids.
    fn reserve_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, AtomicOrdering::Relaxed);
    }

    fn publish(&self, collection: Collection, event: ChangeEvent) {
        let feeds = self.feeds.lock().unwrap();
        if let Some(sender) = feeds.get(&collection) {
            // No receivers is fine; nobody is watching this collection.
            let _ = sender.send(event);
        }
    }

    /// Fills in the id and the creation-time column the way the hosted
    /// service does with column defaults.
    fn apply_defaults(&self, collection: Collection, record: &mut Value) -> Result<(), AppError> {
        let object = record
            .as_object_mut()
            .ok_or_else(|| AppError::WriteRejected("record must be a JSON object".to_string()))?;

        match object.get("id") {
            Some(id) => {
                if let Some(id) = id.as_i64() {
                    self.reserve_id(id);
                }
            }
            None => {
                object.insert("id".to_string(), json!(self.allocate_id()));
            }
        }

        if let Some(field) = collection.timestamp_field()
            && !object.contains_key(field)
        {
            object.insert(field.to_string(), json!(Utc::now()));
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compares two rows on one column. Numbers compare numerically, strings
/// lexicographically (which orders RFC 3339 timestamps and ISO dates
/// correctly); a missing column sorts first.
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, collection: Collection, query: Query) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().unwrap();
        let mut rows: Vec<Value> = collections
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filter.as_ref().is_none_or(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_field(a, b, order.field);
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, collection: Collection, mut record: Value) -> Result<Value, AppError> {
        self.apply_defaults(collection, &mut record)?;

        self.collections
            .write()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(record.clone());

        self.publish(collection, ChangeEvent::new(ChangeKind::Insert, record.clone()));
        Ok(record)
    }

    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<(), AppError> {
        for record in records {
            self.insert(collection, record).await?;
        }
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, AppError> {
        let patch = patch
            .as_object()
            .ok_or_else(|| AppError::WriteRejected("patch must be a JSON object".to_string()))?
            .clone();

        let updated = {
            let mut collections = self.collections.write().unwrap();
            let rows = collections
                .get_mut(&collection)
                .ok_or_else(|| AppError::NotFound(format!("{} #{}", collection, id)))?;

            let row = rows
                .iter_mut()
                .find(|row| record_id(row) == Some(id))
                .ok_or_else(|| AppError::NotFound(format!("{} #{}", collection, id)))?;

            let object = row
                .as_object_mut()
                .ok_or_else(|| AppError::WriteRejected("stored record is not an object".to_string()))?;
            for (key, value) in patch {
                object.insert(key, value);
            }
            row.clone()
        };

        self.publish(collection, ChangeEvent::new(ChangeKind::Update, updated.clone()));
        Ok(updated)
    }

    async fn remove(&self, collection: Collection, id: i64) -> Result<(), AppError> {
        {
            let mut collections = self.collections.write().unwrap();
            let rows = collections
                .get_mut(&collection)
                .ok_or_else(|| AppError::NotFound(format!("{} #{}", collection, id)))?;

            let index = rows
                .iter()
                .position(|row| record_id(row) == Some(id))
                .ok_or_else(|| AppError::NotFound(format!("{} #{}", collection, id)))?;
            rows.remove(index);
        }

        // Delete notifications carry only the row id, like the hosted feed.
        self.publish(collection, ChangeEvent::new(ChangeKind::Delete, json!({ "id": id })));
        Ok(())
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, AppError> {
        let mut source = {
            let mut feeds = self.feeds.lock().unwrap();
            feeds
                .entry(collection)
                .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
                .subscribe()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    event = source.recv() => match event {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "Change feed for {} lagged, {} events skipped",
                                collection,
                                skipped
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Ok(Subscription::new(rx, stop_tx))
    }

    async fn current_user(&self) -> Option<SessionUser> {
        self.user.read().unwrap().clone()
    }

    async fn upload_file(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, AppError> {
        let key = format!("{}/{}", bucket, name);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(AppError::WriteRejected(format!(
                "object '{}' already exists",
                key
            )));
        }
        objects.insert(key.clone(), bytes);

        Ok(StoredObject {
            bucket: bucket.to_string(),
            name: name.to_string(),
            public_url: format!("memory://storage/{}", key),
        })
    }
}
