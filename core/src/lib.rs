//! Client-side data access for the picfeed photo-sharing app.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and serializes image uploads
//! through a single-flight queue.
//!
//! # Design
//! - `PicClient` is stateless; it holds only the base URL.
//! - `DeliveryCoordinator` is a synchronous state machine: it hands out at
//!   most one upload `Dispatch` at a time and advances on completion. The
//!   FFI layer drives it directly from the native host.
//! - `UploadHandle` runs the coordinator on a tokio task over a
//!   `Transport`; `DataManager` bundles it with the record queries and the
//!   `EventBus` for Rust hosts.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod manager;
pub mod store;
pub mod transport;
pub mod types;
pub mod upload;

pub use client::PicClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError};
pub use events::{DataEvent, EventBus};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use manager::DataManager;
pub use store::RecordStore;
pub use transport::Transport;
pub use types::{Image, Location, NewUser, User};
pub use upload::{
    DeliveryCoordinator, DeliveryState, Dispatch, Geolocation, ImageFormat, JobId, PendingImage, UploadHandle,
    UploadJob, UploadSnapshot,
};
