//! Client core for the items service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and keeps a local mirror of
//! the collection in step with confirmed server results.
//!
//! # Design
//! - `ItemsClient` is stateless; it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `ItemMirror` owns the client's view of the collection and records
//!   failures instead of guessing at their effect.
//! - DTOs are defined independently from the server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod mirror;
pub mod types;

pub use client::ItemsClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use mirror::ItemMirror;
pub use types::{CreateItem, DeleteConfirmation, Item, UpdateItem};
