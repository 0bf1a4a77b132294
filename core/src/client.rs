//! Stateless request builder and response parser for the items API.
//!
//! # Design
//! `ItemsClient` holds only a `base_url`. Each operation is split into a
//! `build_*` method producing an `HttpRequest` and a `parse_*` method
//! consuming an `HttpResponse`; the caller performs the round trip in
//! between.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{CreateItem, DeleteConfirmation, ErrorBody, Item, UpdateItem};

/// Characters escaped in a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct ItemsClient {
    base_url: String,
}

impl ItemsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection(&self) -> String {
        format!("{}/items", self.base_url)
    }

    fn member(&self, id: &str) -> String {
        format!("{}/items/{}", self.base_url, utf8_percent_encode(id, SEGMENT))
    }

    pub fn build_list_items(&self) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.collection())
    }

    pub fn build_get_item(&self, id: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.member(id))
    }

    /// Fails with `ApiError::Validation` when the name is blank.
    pub fn build_create_item(&self, input: &CreateItem) -> Result<HttpRequest, ApiError> {
        require_name(&input.name)?;
        let body = to_json(input)?;
        Ok(HttpRequest::json(HttpMethod::Post, self.collection(), body))
    }

    /// Fails with `ApiError::Validation` when a supplied name is blank.
    pub fn build_update_item(&self, id: &str, input: &UpdateItem) -> Result<HttpRequest, ApiError> {
        if let Some(name) = &input.name {
            require_name(name)?;
        }
        let body = to_json(input)?;
        Ok(HttpRequest::json(HttpMethod::Put, self.member(id), body))
    }

    pub fn build_delete_item(&self, id: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Delete, self.member(id))
    }

    pub fn parse_list_items(&self, response: HttpResponse) -> Result<Vec<Item>, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_get_item(&self, response: HttpResponse) -> Result<Item, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    pub fn parse_create_item(&self, response: HttpResponse) -> Result<Item, ApiError> {
        check_status(&response, 201)?;
        from_json(&response.body)
    }

    pub fn parse_update_item(&self, response: HttpResponse) -> Result<Item, ApiError> {
        check_status(&response, 200)?;
        from_json(&response.body)
    }

    /// Returns the server's confirmation message.
    pub fn parse_delete_item(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        let confirmation: DeleteConfirmation = from_json(&response.body)?;
        Ok(confirmation.message)
    }
}

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Item name is required".to_string()));
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn from_json<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the matching `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    // Error bodies are `{"error": ...}`; anything else is passed on raw.
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .map(|body| body.error)
        .unwrap_or_else(|_| response.body.clone());
    Err(match response.status {
        400 => ApiError::InvalidArgument(message),
        404 => ApiError::NotFound(message),
        405 => ApiError::MethodNotAllowed,
        status => ApiError::HttpError { status, message },
    })
}
