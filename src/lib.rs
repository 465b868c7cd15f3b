//! Planflow turns a free-text vision statement into a structured project
//! plan (outcomes → benefits → deliverables → tasks), generated and kept
//! consistent by an external chat-completion service, persisted in SQLite,
//! and served over HTTP. A separate evaluation harness measures the
//! generation service's latency, cost, JSON validity, propagation
//! consistency, and output diversity offline.

pub mod api;
pub mod config;
pub mod csvio;
pub mod db;
pub mod eval;
pub mod export;
pub mod gantt;
pub mod llm;
pub mod models;
pub mod plan;
pub mod retrieval;
