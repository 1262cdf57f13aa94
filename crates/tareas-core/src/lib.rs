//! Core library for tareas.
//!
//! This crate contains everything the front ends share:
//!
//! - `api`: the authenticated HTTP client (bearer attach, refresh-on-401)
//! - `auth`: token storage backends and the login/logout session service
//! - `tasks`: the task controller with request spacing and 429 retry
//! - `models`: wire types for users, tasks and password checks
//! - `config`: persisted application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod tasks;

pub use api::{ApiClient, ApiError, LoginRedirect};
pub use auth::{AuthService, TokenStorage};
pub use config::Config;
pub use tasks::{RetryPolicy, TaskController};
