use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work under a deliverable.
///
/// `deliverable_id` is nullable: a task may exist unattached, though plan
/// generation always attaches the tasks it produces. Dates are optional; when
/// both are absent the Gantt renderer derives a display-only span from
/// `duration_days` and never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub deliverable_id: Option<Uuid>,
    pub name: String,
    pub responsible_team: String,
    /// Estimated effort in days; always positive.
    pub duration_days: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub position: i64,
}
