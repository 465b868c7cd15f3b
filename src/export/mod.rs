//! Downloadable plan documents.
//!
//! Two documents are produced per project: a Communications Plan (objective,
//! stakeholder table, channel list) and a Financial Plan (summary, stages,
//! expenses, monthly cashflow, tolerances, governance). Content comes from
//! the generation service and is normalized defensively; when the call fails
//! or returns junk, hand-authored defaults take over so a download always
//! succeeds. Both render as CSV documents.

mod comm;
mod facts;
mod financial;
mod table;

pub use comm::*;
pub use facts::*;
pub use financial::*;
pub use table::{parse_money, rows_from_any};
