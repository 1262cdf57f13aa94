//! REST API client module for the tareas backend.
//!
//! This module provides the `ApiClient` for communicating with the API.
//! Every request carries the stored access token as a bearer credential;
//! a 401 triggers one silent refresh through `/refresh` before the request
//! is replayed.

pub mod client;
pub mod error;
pub mod request;

pub use client::{ApiClient, LogRedirect, LoginRedirect};
pub use error::{parse_retry_after, ApiError};
pub use request::{PendingRequest, RequestBody};
