use chrono::{Datelike, NaiveDate};

use super::schedule::GanttRow;

/// Shared bar palette; cycled when there are more than twelve tasks.
const PALETTE: &[&str] = &[
    "#4A90E2", "#50E3C2", "#F5A623", "#D0021B", "#7B61FF", "#417505", "#B8E986", "#F8E71C",
    "#BD10E0", "#7ED321", "#9013FE", "#F56A79",
];

const WIDTH: i64 = 1100;
const LEFT: i64 = 140;
const RIGHT: i64 = 20;
const TOP: i64 = 40;
const BOTTOM: i64 = 20;

/// Render rows as a standalone SVG document: month gridlines, one colored
/// bar per task, "Task N" labels down the left edge.
pub fn render_svg(rows: &[GanttRow]) -> String {
    let start_min = rows.iter().map(|r| r.start).min().expect("rows non-empty");
    let end_max = rows.iter().map(|r| r.end).max().expect("rows non-empty");
    let total_days = (end_max - start_min).num_days().max(1);

    let height = 90 + 28 * rows.len() as i64;
    let x_for = |d: NaiveDate| -> i64 {
        LEFT + (d - start_min).num_days() * (WIDTH - LEFT - RIGHT) / total_days
    };

    let mut svg = Vec::new();
    svg.push(format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#f8f9fb\"/>"
    ));

    // Month gridlines from the first of the start month through the end.
    let mut cur = NaiveDate::from_ymd_opt(start_min.year(), start_min.month(), 1)
        .expect("first of month is always valid");
    while cur <= end_max {
        let x = x_for(cur);
        svg.push(format!(
            "<line x1=\"{x}\" y1=\"{TOP}\" x2=\"{x}\" y2=\"{}\" stroke=\"#ddd\" stroke-dasharray=\"3,3\"/>",
            height - BOTTOM
        ));
        svg.push(format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#666\">{}</text>",
            x + 4,
            TOP - 8,
            cur.format("%b %Y")
        ));
        cur = if cur.month() == 12 {
            NaiveDate::from_ymd_opt(cur.year() + 1, 1, 1).expect("january is valid")
        } else {
            NaiveDate::from_ymd_opt(cur.year(), cur.month() + 1, 1).expect("first of month is valid")
        };
    }

    for (i, r) in rows.iter().enumerate() {
        let y = TOP + 20 + i as i64 * 28;
        let x1 = x_for(r.start);
        let x2 = x_for(r.end);
        let color = PALETTE[i % PALETTE.len()];
        svg.push(format!(
            "<rect x=\"{x1}\" y=\"{y}\" width=\"{}\" height=\"14\" fill=\"{color}\" \
             stroke=\"#333\" stroke-width=\"1\" rx=\"3\" ry=\"3\"/>",
            (x2 - x1).max(2)
        ));
        svg.push(format!(
            "<text x=\"10\" y=\"{}\" font-size=\"12\" fill=\"#333\">Task {}</text>",
            y + 12,
            i + 1
        ));
    }

    svg.push("</svg>".to_string());
    svg.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(start: &str, end: &str) -> GanttRow {
        GanttRow {
            task: "t".to_string(),
            team: "T".to_string(),
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
        }
    }

    #[test]
    fn svg_contains_month_labels_and_bars() {
        let rows = vec![row("2025-01-05", "2025-02-20"), row("2025-02-01", "2025-03-01")];
        let svg = render_svg(&rows);
        assert!(svg.contains("Jan 2025"));
        assert!(svg.contains("Feb 2025"));
        assert_eq!(svg.matches("<rect").count(), 3); // background + 2 bars
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn bars_cycle_the_palette() {
        let rows: Vec<GanttRow> = (0..13).map(|_| row("2025-01-01", "2025-01-10")).collect();
        let svg = render_svg(&rows);
        // 13th bar reuses the first palette color; both occurrences present.
        assert_eq!(svg.matches("#4A90E2").count(), 2);
    }
}
