//! Document store capability consumed by the item service.
//!
//! # Design
//! The service never reaches for a global database handle. It receives an
//! `Arc<dyn DocumentStore>` at construction, so the binary and the tests can
//! plug in whichever backend they need. `MemoryStore` is the in-process
//! backend; `TimeoutStore` wraps any backend with a per-call deadline.
//!
//! Writes are expressed as `DocumentWrite` values. A field may hold the
//! `FieldValue::ServerTimestamp` sentinel, which the store resolves to its own
//! clock when the write commits. The caller only learns the resolved value by
//! reading the document back.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Stored field set of a single document. The id is not part of it.
pub type Document = Map<String, Value>;

/// A document together with the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

/// Value assigned to a field by a write.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    /// Resolved to the store's clock at commit time.
    ServerTimestamp,
}

/// Field assignments applied by `add` or `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    fields: Vec<(String, FieldValue)>,
}

impl DocumentWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field.into(), FieldValue::Json(value.into()));
        self
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.push(field.into(), FieldValue::ServerTimestamp);
        self
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // A later assignment to the same field wins.
    fn push(&mut self, field: String, value: FieldValue) {
        self.fields.retain(|(existing, _)| *existing != field);
        self.fields.push((field, value));
    }
}

impl FromIterator<(String, Value)> for DocumentWrite {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |write, (field, value)| write.set(field, value))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} does not exist")]
    Missing(String),

    #[error("store operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("document {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

/// Per-document CRUD primitives of a schemaless collection.
///
/// Each call is atomic for the document it touches. Nothing spans documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<DocumentSnapshot>, StoreError>;

    async fn get_all(&self) -> Result<Vec<DocumentSnapshot>, StoreError>;

    /// Stores a new document under a store-generated id and returns that id.
    async fn add(&self, write: DocumentWrite) -> Result<String, StoreError>;

    /// Merges `write` into an existing document. Only the top-level fields
    /// named by the write change. Fails with `StoreError::Missing` when the
    /// document does not exist.
    async fn update(&self, id: &str, write: DocumentWrite) -> Result<(), StoreError>;

    /// Removes a document. Deleting an id that does not exist is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<String, Document>,
    last_stamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Next server timestamp, strictly after every stamp issued before it
    /// at the precision it is stored with.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn apply(&mut self, document: &mut Document, write: DocumentWrite) {
        // One stamp per commit, shared by every sentinel in the write.
        let mut stamp = None;
        for (field, value) in write.fields {
            let value = match value {
                FieldValue::Json(value) => value,
                FieldValue::ServerTimestamp => {
                    let at = *stamp.get_or_insert_with(|| self.next_stamp());
                    Value::String(format_timestamp(at))
                }
            };
            document.insert(field, value);
        }
    }
}

/// Timestamps are stored as RFC 3339 UTC strings with microsecond precision.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// In-process document store.
///
/// Documents are kept in id order, which is also the order `get_all`
/// returns them in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        let state = self.state.read().await;
        Ok(state.documents.get(id).map(|data| DocumentSnapshot {
            id: id.to_string(),
            data: data.clone(),
        }))
    }

    async fn get_all(&self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .map(|(id, data)| DocumentSnapshot {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn add(&self, write: DocumentWrite) -> Result<String, StoreError> {
        let mut state = self.state.write().await;
        let id = loop {
            let candidate = Uuid::new_v4().simple().to_string();
            if !state.documents.contains_key(&candidate) {
                break candidate;
            }
        };
        let mut document = Document::new();
        state.apply(&mut document, write);
        state.documents.insert(id.clone(), document);
        Ok(id)
    }

    async fn update(&self, id: &str, write: DocumentWrite) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut document = state
            .documents
            .remove(id)
            .ok_or_else(|| StoreError::Missing(id.to_string()))?;
        state.apply(&mut document, write);
        state.documents.insert(id.to_string(), document);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.state.write().await.documents.remove(id);
        Ok(())
    }
}

/// Applies a deadline to every call of the wrapped store.
///
/// An expired deadline surfaces as `StoreError::Timeout`, never as an
/// absent document.
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S: DocumentStore> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn guard<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.limit, call)
            .await
            .map_err(|_| StoreError::Timeout {
                operation,
                after: self.limit,
            })?
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for TimeoutStore<S> {
    async fn get(&self, id: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.guard("get", self.inner.get(id)).await
    }

    async fn get_all(&self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.guard("get_all", self.inner.get_all()).await
    }

    async fn add(&self, write: DocumentWrite) -> Result<String, StoreError> {
        self.guard("add", self.inner.add(write)).await
    }

    async fn update(&self, id: &str, write: DocumentWrite) -> Result<(), StoreError> {
        self.guard("update", self.inner.update(id, write)).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.guard("delete", self.inner.delete(id)).await
    }
}
