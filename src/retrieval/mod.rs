//! Client for the external vector-store retrieval service.
//!
//! The store is an external read-mostly index: request handling only queries
//! it, and the idempotent `populate` load step (upsert by id) is the sole
//! writer. Collections are namespaced by purpose: [`PROJECTS_COLLECTION`] for
//! prior project documents, [`TEAMS_COLLECTION`] for organizational team
//! descriptions.

mod client;
mod sample;

pub use client::*;
pub use sample::*;

/// Collection of prior project documents.
pub const PROJECTS_COLLECTION: &str = "projects";

/// Collection of organizational team descriptions.
pub const TEAMS_COLLECTION: &str = "organizational_teams";
