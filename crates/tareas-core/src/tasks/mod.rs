//! Task list state and the request policy around it.
//!
//! `TaskController` owns the local copy of the task list. Listing is spaced
//! (at most one call per minimum interval) and every task operation retries
//! on 429 with the server-requested delay, up to a fixed number of retries.

pub mod controller;
pub mod retry;

pub use controller::TaskController;
pub use retry::{RetryPolicy, RetryState};
