//! Chat-completion client for the external text-generation service.
//!
//! Components take a [`ChatClient`] by reference (dependency injection); the
//! concrete [`HttpChatClient`] is constructed once at process start from
//! [`crate::config::AppConfig`]. [`MockChatClient`] serves tests and mock
//! evaluation runs.

mod client;
mod mock;

pub use client::*;
pub use mock::*;
