//! Authentication module for managing credentials and sessions.
//!
//! This module provides:
//! - `TokenStorage`: key-value slots for the access/refresh token pair,
//!   with memory, file and OS keychain backends
//! - `AuthService`: login, registration, logout and session restore
//!
//! Tokens live until logout, until a refresh fails, or until a new login
//! overwrites them. No expiry is tracked client-side.

pub mod session;
pub mod storage;

pub use session::AuthService;
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, TokenStorage};
