use chrono::{Days, NaiveDate};

use crate::models::Task;

/// One renderable bar: a task with a guaranteed positive span.
#[derive(Debug, Clone, PartialEq)]
pub struct GanttRow {
    pub task: String,
    pub team: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Build rows from stored tasks.
///
/// Tasks with both dates use them as-is. Otherwise the span is derived from
/// `duration_days` on a rolling schedule: each undated task starts the day
/// after the previous one ends, beginning at `today`. Every row ends strictly
/// after it starts.
pub fn build_rows(tasks: &[Task], today: NaiveDate) -> Vec<GanttRow> {
    let mut rows = Vec::with_capacity(tasks.len());
    let mut rolling = today;

    for t in tasks {
        let (start, mut end) = match (t.start_date, t.end_date) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                let days = t.duration_days.max(1) as u64;
                let start = t.start_date.unwrap_or(rolling);
                let end = start + Days::new(days);
                rolling = end + Days::new(1);
                (start, end)
            }
        };
        if end <= start {
            end = start + Days::new(1);
        }

        let name = if t.name.is_empty() {
            "Untitled Task".to_string()
        } else {
            t.name.clone()
        };
        let team = if t.responsible_team.is_empty() {
            "Unassigned".to_string()
        } else {
            t.responsible_team.clone()
        };
        rows.push(GanttRow {
            task: name,
            team,
            start,
            end,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn task(duration: i64, start: Option<&str>, end: Option<&str>) -> Task {
        Task {
            id: Uuid::new_v4(),
            deliverable_id: None,
            name: "t".to_string(),
            responsible_team: "T".to_string(),
            duration_days: duration,
            start_date: start.map(|s| s.parse().unwrap()),
            end_date: end.map(|s| s.parse().unwrap()),
            position: 0,
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stored_dates_are_used_verbatim() {
        let rows = build_rows(
            &[task(5, Some("2025-02-01"), Some("2025-02-10"))],
            d("2025-01-01"),
        );
        assert_eq!(rows[0].start, d("2025-02-01"));
        assert_eq!(rows[0].end, d("2025-02-10"));
    }

    #[test]
    fn undated_tasks_roll_forward_from_today() {
        let rows = build_rows(&[task(7, None, None), task(3, None, None)], d("2025-01-01"));
        assert_eq!(rows[0].start, d("2025-01-01"));
        assert_eq!(rows[0].end, d("2025-01-08"));
        // Next task starts the day after the previous one ends.
        assert_eq!(rows[1].start, d("2025-01-09"));
        assert_eq!(rows[1].end, d("2025-01-12"));
    }

    #[test]
    fn inverted_stored_dates_are_clamped_to_one_day() {
        let rows = build_rows(
            &[task(5, Some("2025-02-10"), Some("2025-02-10"))],
            d("2025-01-01"),
        );
        assert_eq!(rows[0].start, d("2025-02-10"));
        assert_eq!(rows[0].end, d("2025-02-11"));
    }

    #[test]
    fn start_without_end_uses_duration() {
        let rows = build_rows(&[task(4, Some("2025-03-01"), None)], d("2025-01-01"));
        assert_eq!(rows[0].start, d("2025-03-01"));
        assert_eq!(rows[0].end, d("2025-03-05"));
    }
}
