// src/store/rest.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use url::Url;

use crate::error::AppError;
use crate::store::{
    ChangeEvent, ChangeKind, Collection, Filter, Query, RecordStore, SessionUser, StoredObject,
    Subscription,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// PostgREST-style binding to the hosted data service.
///
/// CRUD maps onto `/rest/v1/<table>`, storage onto `/storage/v1/object`,
/// session lookup onto `/auth/v1/user`. The change feed is a polling diff:
/// the service's websocket feed is not consumed here, but the subscription
/// contract (a stream of insert/update/delete events) is honored.
pub struct RestStore {
    client: Client,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
    poll_interval: Duration,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ValidationFailed(format!("invalid service URL: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.to_string(),
            access_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Attaches the signed-in user's access token. Requests then act with
    /// the user's rights and `current_user` resolves their session.
    pub fn with_session(mut self, access_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::SourceUnavailable(format!("invalid endpoint path: {}", e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        request
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn table_url(&self, collection: Collection, query: &Query) -> Result<Url, AppError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", collection.name()))?;
        {
            let mut pairs = url.query_pairs_mut();
            match &query.filter {
                Some(Filter::Eq(field, value)) => {
                    pairs.append_pair(field, &format!("eq.{}", plain(value)));
                }
                Some(Filter::ILike(field, needle)) => {
                    pairs.append_pair(field, &format!("ilike.*{}*", needle));
                }
                None => {}
            }
            if let Some(order) = query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", order.field, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    /// Raw fetch shared by `fetch` and the polling feed.
    async fn fetch_rows(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Value>, AppError> {
        let url = self.table_url(collection, query)?;
        let response = self.authorize(self.client.get(url)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to fetch {}: {} {}", collection, status, body);
            return Err(AppError::SourceUnavailable(format!(
                "{} fetch returned {}",
                collection, status
            )));
        }

        Ok(response.json().await?)
    }
}

/// Renders a filter value the way PostgREST expects it: strings without
/// their JSON quotes, everything else as-is.
fn plain(value: &Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

/// Maps a refused write to the error taxonomy.
fn write_error(collection: Collection, status: StatusCode, body: String) -> AppError {
    tracing::error!("Write to {} refused: {} {}", collection, status, body);
    if status == StatusCode::NOT_FOUND {
        AppError::NotFound(format!("{}: {}", collection, body))
    } else if status.is_server_error() {
        AppError::SourceUnavailable(format!("{} write returned {}", collection, status))
    } else {
        AppError::WriteRejected(format!("{} write returned {}: {}", collection, status, body))
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn fetch(&self, collection: Collection, query: Query) -> Result<Vec<Value>, AppError> {
        self.fetch_rows(collection, &query).await
    }

    async fn insert(&self, collection: Collection, record: Value) -> Result<Value, AppError> {
        let url = self.table_url(collection, &Query::new())?;
        let response = self
            .authorize(self.client.post(url))
            .header("Prefer", "return=representation")
            .json(&json!([record]))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(collection, status, body));
        }

        let mut rows: Vec<Value> = response.json().await?;
        rows.pop().ok_or_else(|| {
            AppError::WriteRejected(format!("{} insert returned no representation", collection))
        })
    }

    async fn insert_many(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<(), AppError> {
        let url = self.table_url(collection, &Query::new())?;
        let response = self
            .authorize(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(&records)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(collection, status, body));
        }
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Value,
    ) -> Result<Value, AppError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", collection.name()))?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

        let response = self
            .authorize(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(collection, status, body));
        }

        let mut rows: Vec<Value> = response.json().await?;
        // An empty representation means the filter matched nothing.
        rows.pop()
            .ok_or_else(|| AppError::NotFound(format!("{} #{}", collection, id)))
    }

    async fn remove(&self, collection: Collection, id: i64) -> Result<(), AppError> {
        let mut url = self.endpoint(&format!("rest/v1/{}", collection.name()))?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));

        let response = self
            .authorize(self.client.delete(url))
            .header("Prefer", "return=representation")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(write_error(collection, status, body));
        }

        let rows: Vec<Value> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(format!("{} #{}", collection, id)));
        }
        Ok(())
    }

    async fn subscribe(&self, collection: Collection) -> Result<Subscription, AppError> {
        // Take the baseline now so the subscription only reports changes
        // that happen after it was opened.
        let baseline = self.fetch_rows(collection, &Query::new()).await?;
        let mut known: HashMap<i64, Value> = index_by_id(baseline);

        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let poller = RestStore {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            poll_interval: self.poll_interval,
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a fresh interval completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                let rows = match poller.fetch_rows(collection, &Query::new()).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        // A dropped poll is a silent feed gap, not a teardown.
                        tracing::warn!("Change feed poll for {} failed: {}", collection, e);
                        continue;
                    }
                };

                let current = index_by_id(rows);
                let mut closed = false;

                for event in diff_events(&known, &current) {
                    if tx.send(event).is_err() {
                        closed = true;
                        break;
                    }
                }

                if closed {
                    break;
                }
                known = current;
            }
        });

        Ok(Subscription::new(rx, stop_tx))
    }

    async fn current_user(&self) -> Option<SessionUser> {
        let token = self.access_token.as_deref()?;
        let url = self.endpoint("auth/v1/user").ok()?;

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!("Session lookup returned {}", response.status());
            return None;
        }

        response.json().await.ok()
    }

    async fn upload_file(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, AppError> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", bucket, name))?;
        let response = self
            .authorize(self.client.post(url))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CACHE_CONTROL, "max-age=3600")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Upload to {}/{} refused: {} {}", bucket, name, status, body);
            return Err(AppError::WriteRejected(format!(
                "upload to {} returned {}",
                bucket, status
            )));
        }

        let public_url = self.endpoint(&format!("storage/v1/object/public/{}/{}", bucket, name))?;
        Ok(StoredObject {
            bucket: bucket.to_string(),
            name: name.to_string(),
            public_url: public_url.to_string(),
        })
    }
}

fn index_by_id(rows: Vec<Value>) -> HashMap<i64, Value> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(Value::as_i64)?;
            Some((id, row))
        })
        .collect()
}

/// Computes the change events between two polled snapshots.
///
/// Events are emitted in ascending id order within each kind, inserts
/// first. Serial ids follow commit order, so a prepend-per-insert consumer
/// ends up with the newest row on top even when one poll picks up several
/// new rows at once.
fn diff_events(known: &HashMap<i64, Value>, current: &HashMap<i64, Value>) -> Vec<ChangeEvent> {
    let mut inserts: Vec<(i64, &Value)> = Vec::new();
    let mut updates: Vec<(i64, &Value)> = Vec::new();
    for (id, record) in current {
        match known.get(id) {
            None => inserts.push((*id, record)),
            Some(previous) if previous != record => updates.push((*id, record)),
            Some(_) => {}
        }
    }
    inserts.sort_by_key(|(id, _)| *id);
    updates.sort_by_key(|(id, _)| *id);

    let mut deletes: Vec<i64> = known
        .keys()
        .filter(|id| !current.contains_key(id))
        .copied()
        .collect();
    deletes.sort_unstable();

    let mut events = Vec::with_capacity(inserts.len() + updates.len() + deletes.len());
    events.extend(
        inserts
            .into_iter()
            .map(|(_, record)| ChangeEvent::new(ChangeKind::Insert, record.clone())),
    );
    events.extend(
        updates
            .into_iter()
            .map(|(_, record)| ChangeEvent::new(ChangeKind::Update, record.clone())),
    );
    events.extend(
        deletes
            .into_iter()
            .map(|id| ChangeEvent::new(ChangeKind::Delete, json!({ "id": id }))),
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_diff_emits_inserts_oldest_first() {
        // Two rows committed within one poll window; id order is commit
        // order regardless of how the map iterates.
        let known = HashMap::new();
        let current = index_by_id(vec![
            json!({ "id": 2, "message": "newer" }),
            json!({ "id": 1, "message": "older" }),
        ]);

        let events = diff_events(&known, &current);

        let ids: Vec<i64> = events
            .iter()
            .map(|e| e.record["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Insert));
    }

    #[test]
    fn poll_diff_separates_updates_and_deletes() {
        let known = index_by_id(vec![
            json!({ "id": 1, "message": "keep" }),
            json!({ "id": 2, "message": "stale" }),
            json!({ "id": 3, "message": "gone" }),
        ]);
        let current = index_by_id(vec![
            json!({ "id": 1, "message": "keep" }),
            json!({ "id": 2, "message": "fresh" }),
        ]);

        let events = diff_events(&known, &current);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::Update);
        assert_eq!(events[0].record["message"], "fresh");
        assert_eq!(events[1].kind, ChangeKind::Delete);
        assert_eq!(events[1].record, json!({ "id": 3 }));
    }
}
