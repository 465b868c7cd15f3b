//! Gantt schedule derivation and SVG rendering.
//!
//! Dates are display-only: tasks without stored dates get a rolling span
//! derived from `duration_days`, and nothing computed here is ever persisted.

mod schedule;
mod svg;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Task;

pub use schedule::{build_rows, GanttRow};
pub use svg::render_svg;

/// The Gantt payload served to clients: an inline SVG document plus the
/// task-number → task-name map used for the legend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttChart {
    pub svg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub task_map: HashMap<String, String>,
}

/// Render the Gantt chart for a project's tasks.
pub fn render_gantt(tasks: &[Task], today: NaiveDate) -> GanttChart {
    let rows = build_rows(tasks, today);
    if rows.is_empty() {
        return GanttChart {
            svg: None,
            message: Some("No tasks found.".to_string()),
            task_map: HashMap::new(),
        };
    }

    let task_map = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (format!("Task {}", i + 1), r.task.clone()))
        .collect();

    GanttChart {
        svg: Some(render_svg(&rows)),
        message: None,
        task_map,
    }
}
