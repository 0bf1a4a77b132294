//! Item operations on top of an injected document store.
//!
//! # Design
//! `ItemService` holds no per-request state: every call goes to the store and
//! nothing is cached or locked in between. Concurrent updates of the same item
//! race in the store and the last committed merge wins; the update response is
//! whatever the re-read observes.
//!
//! Create writes `createdAt` as a server timestamp sentinel, which cannot be
//! read back from the write confirmation. `CreateResponse` decides whether the
//! response reports a wall-clock approximation or pays for a re-read.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::{Operation, ServiceError};
use crate::model::{
    DeleteConfirmation, Item, ItemPatch, NewItem, CREATED_AT, DESCRIPTION, NAME, UPDATED_AT,
};
use crate::store::{DocumentStore, DocumentWrite, StoreError};

/// How Create reports `createdAt` in its immediate response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CreateResponse {
    /// Report the service's wall clock. The stored stamp may differ slightly.
    #[default]
    WallClock,
    /// Re-read the new document and report the stored stamp.
    ReadBack,
}

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn DocumentStore>,
    create_response: CreateResponse,
}

impl ItemService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            create_response: CreateResponse::default(),
        }
    }

    pub fn with_create_response(mut self, create_response: CreateResponse) -> Self {
        self.create_response = create_response;
        self
    }

    pub async fn list(&self) -> Result<Vec<Item>, ServiceError> {
        let snapshots = self
            .store
            .get_all()
            .await
            .map_err(|e| store_failure(Operation::List, e))?;
        let items = snapshots
            .into_iter()
            .map(Item::from_snapshot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| store_failure(Operation::List, e))?;
        tracing::debug!(count = items.len(), "listed items");
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> Result<Item, ServiceError> {
        let id = require_id(id)?;
        self.read(Operation::Get, id).await
    }

    pub async fn create(&self, input: NewItem) -> Result<Item, ServiceError> {
        let (name, description) = input.validate()?;

        let write = DocumentWrite::new()
            .set(NAME, name.clone())
            .set(DESCRIPTION, description.clone())
            .server_timestamp(CREATED_AT);
        let id = self
            .store
            .add(write)
            .await
            .map_err(|e| store_failure(Operation::Create, e))?;
        tracing::debug!(%id, "created item");

        match self.create_response {
            CreateResponse::ReadBack => self.read(Operation::Create, &id).await,
            CreateResponse::WallClock => Ok(Item {
                id,
                name,
                description,
                created_at: Utc::now(),
                updated_at: None,
                extra: Default::default(),
            }),
        }
    }

    /// Merges `patch` into the item and returns the stored result.
    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<Item, ServiceError> {
        let id = require_id(id)?;
        let write = patch.into_write()?.server_timestamp(UPDATED_AT);

        self.ensure_exists(Operation::Update, id).await?;
        self.store
            .update(id, write)
            .await
            .map_err(|e| store_failure(Operation::Update, e))?;
        tracing::debug!(%id, "updated item");

        self.read(Operation::Update, id).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteConfirmation, ServiceError> {
        let id = require_id(id)?;
        // The store deletes unknown ids silently, so existence is checked first.
        self.ensure_exists(Operation::Delete, id).await?;
        self.store
            .delete(id)
            .await
            .map_err(|e| store_failure(Operation::Delete, e))?;
        tracing::debug!(%id, "deleted item");
        Ok(DeleteConfirmation::default())
    }

    async fn read(&self, operation: Operation, id: &str) -> Result<Item, ServiceError> {
        let snapshot = self
            .store
            .get(id)
            .await
            .map_err(|e| store_failure(operation, e))?
            .ok_or(ServiceError::NotFound)?;
        Item::from_snapshot(snapshot).map_err(|e| store_failure(operation, e))
    }

    async fn ensure_exists(&self, operation: Operation, id: &str) -> Result<(), ServiceError> {
        match self.store.get(id).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ServiceError::NotFound),
            Err(e) => Err(store_failure(operation, e)),
        }
    }
}

fn require_id(id: &str) -> Result<&str, ServiceError> {
    if id.trim().is_empty() {
        return Err(ServiceError::missing_id());
    }
    Ok(id)
}

fn store_failure(operation: Operation, source: StoreError) -> ServiceError {
    if !matches!(source, StoreError::Missing(_)) {
        tracing::error!(?operation, error = %source, "{}", operation.failure_message());
    }
    ServiceError::from_store(operation, source)
}

/// Parses a request body for the service. An empty body reads as `{}`.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ServiceError> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::InvalidArgument(format!("Invalid JSON body: {e}")))?
    };
    serde_json::from_value(value)
        .map_err(|e| ServiceError::InvalidArgument(format!("Invalid request body: {e}")))
}
