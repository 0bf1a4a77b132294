//! Item payloads exchanged between the HTTP adapter and the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::store::{DocumentSnapshot, DocumentWrite, StoreError};

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Keys a patch can never set: the identity and the server-owned stamps.
const RESERVED: [&str; 3] = ["id", CREATED_AT, UPDATED_AT];

/// An item as returned to callers: the stored fields plus the document id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields written by earlier patches that the service does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Decodes a stored document and attaches its id.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, StoreError> {
        let DocumentSnapshot { id, data } = snapshot;
        let mut item: Item =
            serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::Malformed {
                id: id.clone(),
                reason: e.to_string(),
            })?;
        item.id = id;
        Ok(item)
    }
}

/// Create input. Both fields are optional at the wire level so that a
/// missing name is reported by validation rather than by the JSON decoder.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            description,
        }
    }

    /// Returns the accepted `(name, description)` pair.
    pub fn validate(self) -> Result<(String, String), ServiceError> {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ServiceError::InvalidArgument("Item name is required".to_string()))?;
        Ok((name, self.description.unwrap_or_default()))
    }
}

/// Merge patch for an existing item: any JSON object.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ItemPatch(pub Map<String, Value>);

impl ItemPatch {
    /// Checks the fields the service interprets and turns the rest into a
    /// store write. Reserved keys are dropped.
    pub fn into_write(self) -> Result<DocumentWrite, ServiceError> {
        let mut fields = self.0;
        for key in RESERVED {
            if fields.remove(key).is_some() {
                tracing::debug!(field = key, "ignoring reserved field in patch");
            }
        }

        if let Some(name) = fields.get(NAME) {
            match name.as_str() {
                Some(name) if !name.trim().is_empty() => {}
                Some(_) => {
                    return Err(ServiceError::InvalidArgument(
                        "Item name cannot be empty".to_string(),
                    ))
                }
                None => {
                    return Err(ServiceError::InvalidArgument(
                        "Item name must be a string".to_string(),
                    ))
                }
            }
        }
        if let Some(description) = fields.get(DESCRIPTION) {
            if !description.is_string() {
                return Err(ServiceError::InvalidArgument(
                    "Item description must be a string".to_string(),
                ));
            }
        }

        Ok(fields.into_iter().collect())
    }
}

impl From<Map<String, Value>> for ItemPatch {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}

impl Default for DeleteConfirmation {
    fn default() -> Self {
        Self {
            message: "Item deleted successfully".to_string(),
        }
    }
}
