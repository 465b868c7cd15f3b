//! Offline evaluation harness.
//!
//! An independent batch consumer of the same generation service as the live
//! path: repeated calls with timing/cost accounting, JSON validity and
//! completeness checks, forward/backward propagation consistency over
//! before/after document pairs, and output-diversity sampling across
//! temperatures. Per-row failures are recorded, never fatal; results land as
//! CSV reports, a plain-text summary, and SVG charts.

pub mod completeness;
pub mod diversity;
pub mod document;
pub mod perf;
pub mod propagation;
pub mod reliability;
pub mod report;
pub mod scalability;
pub mod textsim;

pub use completeness::{check_completeness, run_completeness, CompletenessReport};
pub use document::PlanDocument;
pub use propagation::{check_propagation, run_propagation, PairOutcome, PropagationReport, UpdateType};
pub use textsim::{similarity, textify};
