//! Plan generation and reconciliation.
//!
//! The flow is one-way: vision text → retrieval context → prompt → chat
//! service → JSON → validated draft → storage. Reconciliation reuses the same
//! pipeline after applying a single leaf edit, and replaces the stored tree
//! transactionally. Parsing ([`coerce`]) and schema validation ([`validate`])
//! are shared by both paths so a malformed or schema-invalid response can
//! never reach the store.

pub mod coerce;
pub mod generator;
pub mod prompt;
pub mod reconciler;
pub mod schema;
pub mod validate;

pub use coerce::{coerce_object, ParseFailure};
pub use generator::{generate, GenerateError};
pub use reconciler::{reconcile, ReconcileError};
pub use schema::{BenefitDraft, DeliverableDraft, OutcomeDraft, PlanDraft, TaskDraft};
pub use validate::{validate_plan, PlanValidateError};
