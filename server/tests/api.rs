use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use items_server::store::{DocumentSnapshot, DocumentWrite, StoreError};
use items_server::{app, DocumentStore, Item, ItemService, MemoryStore};
use serde_json::Value;
use tower::ServiceExt;

/// Memory store that counts every call made to it.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, id: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.touch();
        self.inner.get(id).await
    }

    async fn get_all(&self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.touch();
        self.inner.get_all().await
    }

    async fn add(&self, write: DocumentWrite) -> Result<String, StoreError> {
        self.touch();
        self.inner.add(write).await
    }

    async fn update(&self, id: &str, write: DocumentWrite) -> Result<(), StoreError> {
        self.touch();
        self.inner.update(id, write).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.touch();
        self.inner.delete(id).await
    }
}

/// Store whose backend is down.
struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn get(&self, _id: &str) -> Result<Option<DocumentSnapshot>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get_all(&self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn add(&self, _write: DocumentWrite) -> Result<String, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn update(&self, _id: &str, _write: DocumentWrite) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

fn memory_app() -> Router {
    app(ItemService::new(Arc::new(MemoryStore::new())))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
    let body: Value = body_json(response).await;
    body["error"].as_str().unwrap().to_string()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn create(app: &Router, body: &str) -> Item {
    let resp = send(app, json_request("POST", "/items", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- list ---

#[tokio::test]
async fn list_items_empty() {
    let resp = memory_app()
        .oneshot(empty_request("GET", "/items"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let items: Vec<Item> = body_json(resp).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn list_items_returns_every_created_item() {
    let app = memory_app();
    for name in ["alpha", "beta", "gamma"] {
        create(&app, &format!(r#"{{"name":"{name}"}}"#)).await;
    }

    let resp = send(&app, empty_request("GET", "/items")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let items: Vec<Item> = body_json(resp).await;
    let mut names: Vec<_> = items.iter().map(|i| i.name.clone()).collect();
    names.sort();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
}

// --- create ---

#[tokio::test]
async fn create_item_returns_201() {
    let app = memory_app();
    let item = create(&app, r#"{"name":"Lamp","description":"Desk lamp"}"#).await;
    assert!(!item.id.is_empty());
    assert_eq!(item.name, "Lamp");
    assert_eq!(item.description, "Desk lamp");
    assert!(item.updated_at.is_none());
}

#[tokio::test]
async fn create_item_defaults_description() {
    let item = create(&memory_app(), r#"{"name":"x"}"#).await;
    assert_eq!(item.description, "");
}

#[tokio::test]
async fn create_item_without_name_returns_400() {
    let app = memory_app();
    for body in [r#"{}"#, r#"{"name":""}"#, ""] {
        let resp = send(&app, json_request("POST", "/items", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(error_message(resp).await, "Item name is required");
    }
}

#[tokio::test]
async fn create_item_malformed_json_returns_400() {
    let resp = send(&memory_app(), json_request("POST", "/items", "{not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(resp).await.starts_with("Invalid JSON body"));
}

// --- get ---

#[tokio::test]
async fn get_item_not_found() {
    let resp = send(&memory_app(), empty_request("GET", "/items/unknown")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(resp).await, "Item not found");
}

#[tokio::test]
async fn missing_id_returns_400() {
    let app = memory_app();
    for method in ["GET", "PUT", "DELETE"] {
        let resp = send(&app, json_request(method, "/items/", "{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{method}");
        assert_eq!(error_message(resp).await, "Item ID is required");
    }
}

// --- update ---

#[tokio::test]
async fn update_item_not_found() {
    let resp = send(
        &memory_app(),
        json_request("PUT", "/items/unknown", r#"{"name":"Nope"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_item_merges_fields() {
    let app = memory_app();
    let created = create(&app, r#"{"name":"A","description":"B"}"#).await;

    let resp = send(
        &app,
        json_request("PUT", &format!("/items/{}", created.id), r#"{"description":"C"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Item = body_json(resp).await;
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "A");
    assert_eq!(updated.description, "C");
    assert!(updated.updated_at.unwrap() > updated.created_at);
}

#[tokio::test]
async fn update_item_keeps_unknown_fields() {
    let app = memory_app();
    let created = create(&app, r#"{"name":"A"}"#).await;
    let uri = format!("/items/{}", created.id);

    send(&app, json_request("PUT", &uri, r#"{"colour":"red"}"#)).await;
    let resp = send(&app, empty_request("GET", &uri)).await;
    let body: Value = body_json(resp).await;
    assert_eq!(body["colour"], "red");
    assert_eq!(body["name"], "A");
    assert_eq!(body["id"], created.id.as_str());
}

#[tokio::test]
async fn update_item_rejects_non_object_body() {
    let app = memory_app();
    let created = create(&app, r#"{"name":"A"}"#).await;
    let resp = send(
        &app,
        json_request("PUT", &format!("/items/{}", created.id), r#"["name"]"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delete ---

#[tokio::test]
async fn delete_item_not_found() {
    let resp = send(&memory_app(), empty_request("DELETE", "/items/unknown")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- method restriction ---

#[tokio::test]
async fn wrong_methods_return_405_without_touching_the_store() {
    let store = Arc::new(CountingStore::default());
    let app = app(ItemService::new(store.clone()));

    for (method, uri) in [
        ("PUT", "/items"),
        ("DELETE", "/items"),
        ("PATCH", "/items"),
        ("POST", "/items/abc"),
        ("PATCH", "/items/abc"),
        ("POST", "/items/"),
    ] {
        let resp = send(&app, json_request(method, uri, r#"{"name":"x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        assert_eq!(error_message(resp).await, "Method Not Allowed");
    }
    // HEAD responses carry no body, so only the status is observable.
    for uri in ["/items", "/items/", "/items/abc"] {
        let resp = send(&app, empty_request("HEAD", uri)).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "HEAD {uri}");
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let resp = send(&memory_app(), empty_request("GET", "/widgets")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(resp).await, "Not Found");
}

// --- store failures ---

#[tokio::test]
async fn store_failure_returns_500_without_leaking_cause() {
    let app = app(ItemService::new(Arc::new(UnavailableStore)));

    let resp = send(&app, empty_request("GET", "/items")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(resp).await, "Failed to fetch items");

    let resp = send(&app, json_request("POST", "/items", r#"{"name":"x"}"#)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = error_message(resp).await;
    assert_eq!(message, "Failed to create item");
    assert!(!message.contains("connection refused"));
}

// --- cors ---

#[tokio::test]
async fn responses_allow_any_origin() {
    let request = Request::builder()
        .uri("/items")
        .header(http::header::ORIGIN, "https://example.com")
        .body(String::new())
        .unwrap();
    let resp = send(&memory_app(), request).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn preflight_is_answered() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/items/abc")
        .header(http::header::ORIGIN, "https://example.com")
        .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .header(http::header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(String::new())
        .unwrap();
    let resp = send(&memory_app(), request).await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()[http::header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    assert!(resp
        .headers()
        .get(http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let app = memory_app();

    // create
    let created = create(&app, r#"{"name":"Walk dog"}"#).await;
    let id = created.id.clone();
    let uri = format!("/items/{id}");

    // list: should contain the one item
    let resp = send(&app, empty_request("GET", "/items")).await;
    let items: Vec<Item> = body_json(resp).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id);

    // get
    let resp = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Item = body_json(resp).await;
    assert_eq!(fetched.name, "Walk dog");
    assert!(fetched.updated_at.is_none());

    // update: partial: only name
    let resp = send(&app, json_request("PUT", &uri, r#"{"name":"Walk cat"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Item = body_json(resp).await;
    assert_eq!(updated.name, "Walk cat");
    assert_eq!(updated.description, ""); // unchanged
    assert_eq!(updated.created_at, fetched.created_at);

    // delete
    let resp = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Item deleted successfully");

    // get and delete after delete: 404
    let resp = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete: empty
    let resp = send(&app, empty_request("GET", "/items")).await;
    let items: Vec<Item> = body_json(resp).await;
    assert!(items.is_empty());
}
