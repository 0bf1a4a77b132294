//! HTTP service exposing the `items` collection.
//!
//! # Overview
//! Five endpoints (list, get, create, update, delete) are served by axum and
//! forwarded to `ItemService`, which owns validation and talks to an injected
//! `DocumentStore`.
//!
//! # Design
//! - Bodies are taken as raw bytes and decoded by the service layer, so a
//!   malformed body gets the same `{"error": ...}` shape as every other
//!   rejection.
//! - Each path answers methods it does not serve with 405 before any store
//!   call. HEAD is refused explicitly, since axum would otherwise run the GET
//!   handler for it.
//! - `/items/` is routed explicitly so an empty identifier is reported as a
//!   missing id rather than as an unknown route.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

use std::future::Future;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, Method, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::ServiceError;
pub use model::{DeleteConfirmation, Item, ItemPatch, NewItem};
pub use service::{CreateResponse, ItemService};
pub use store::{DocumentStore, MemoryStore, TimeoutStore};

use service::parse_body;

pub fn app(service: ItemService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/items",
            get(list_items)
                .post(create_item)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/items/",
            get(get_item_without_id)
                .put(update_item_without_id)
                .delete(delete_item_without_id)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/items/{id}",
            get(get_item)
                .put(update_item)
                .delete(delete_item)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

pub async fn run(listener: TcpListener, service: ItemService) -> Result<(), std::io::Error> {
    axum::serve(listener, app(service)).await
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn run_until<F>(
    listener: TcpListener,
    service: ItemService,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_items(State(service): State<ItemService>) -> Result<Json<Vec<Item>>, ServiceError> {
    service.list().await.map(Json)
}

async fn create_item(
    State(service): State<ItemService>,
    body: Bytes,
) -> Result<(StatusCode, Json<Item>), ServiceError> {
    let input: NewItem = parse_body(&body)?;
    let item = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ServiceError> {
    service.get(&id).await.map(Json)
}

async fn update_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Item>, ServiceError> {
    let patch: ItemPatch = parse_body(&body)?;
    service.update(&id, patch).await.map(Json)
}

async fn delete_item(
    State(service): State<ItemService>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>, ServiceError> {
    service.delete(&id).await.map(Json)
}

async fn get_item_without_id() -> ServiceError {
    ServiceError::missing_id()
}

async fn update_item_without_id() -> ServiceError {
    ServiceError::missing_id()
}

async fn delete_item_without_id() -> ServiceError {
    ServiceError::missing_id()
}

async fn method_not_allowed() -> ServiceError {
    ServiceError::MethodNotAllowed
}

async fn route_not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}
