//! Report files: accuracy CSVs, plain-text summary, latency histogram SVG.

use std::path::Path;

use crate::csvio;

use super::completeness::CompletenessReport;
use super::perf::CallRecord;
use super::propagation::{PairOutcome, PropagationReport};

/// Write the accuracy reports: completeness CSV, propagation CSV, and the
/// combined plain-text summary. Returns the summary text.
pub fn save_accuracy_reports(
    completeness: &CompletenessReport,
    propagation: &PropagationReport,
    out_dir: &Path,
) -> std::io::Result<String> {
    std::fs::create_dir_all(out_dir)?;

    let mut comp_rows = vec![vec![
        "file".to_string(),
        "status".to_string(),
        "missing_tags".to_string(),
    ]];
    for row in &completeness.rows {
        comp_rows.push(vec![
            row.file.clone(),
            row.status.to_string(),
            row.detail.clone(),
        ]);
    }
    std::fs::write(
        out_dir.join("accuracy_completeness_report.csv"),
        csvio::render(&comp_rows),
    )?;

    let mut prop_rows = vec![vec![
        "id".to_string(),
        "update_type".to_string(),
        "result".to_string(),
        "error".to_string(),
        "metric_1".to_string(),
        "metric_2".to_string(),
        "metric_3".to_string(),
    ]];
    for row in &propagation.rows {
        let (result, error) = match &row.outcome {
            PairOutcome::Pass => ("PASS".to_string(), String::new()),
            PairOutcome::Fail => ("FAIL".to_string(), String::new()),
            PairOutcome::Error(e) => ("ERROR".to_string(), e.clone()),
        };
        let metric = |i: usize| row.metrics.get(i).cloned().unwrap_or_default();
        prop_rows.push(vec![
            row.id.clone(),
            row.update_type.clone(),
            result,
            error,
            metric(0),
            metric(1),
            metric(2),
        ]);
    }
    std::fs::write(
        out_dir.join("accuracy_propagation_report.csv"),
        csvio::render(&prop_rows),
    )?;

    let summary = format!(
        "=== Completeness ===\n\
         Files: {}\n\
         Complete: {}\n\
         Completeness %: {:.2}\n\n\
         === Propagation ===\n\
         Pairs: {}\n\
         Passed: {}\n\
         Pass %: {:.2}\n",
        completeness.total_files,
        completeness.complete_count,
        completeness.completeness_pct(),
        propagation.pairs_total,
        propagation.passed,
        propagation.passed_pct(),
    );
    std::fs::write(out_dir.join("accuracy_summary.txt"), &summary)?;
    Ok(summary)
}

/// Render a latency histogram as an SVG bar chart.
pub fn latency_histogram_svg(records: &[CallRecord], bins: usize) -> String {
    let latencies: Vec<f64> = records.iter().map(|r| r.latency_s).collect();
    histogram_svg(&latencies, bins, "Latency distribution", "seconds")
}

/// Generic histogram SVG: `bins` equal-width buckets over the value range.
pub fn histogram_svg(values: &[f64], bins: usize, title: &str, x_label: &str) -> String {
    const W: i64 = 640;
    const H: i64 = 400;
    const L: i64 = 50;
    const R: i64 = 20;
    const T: i64 = 40;
    const B: i64 = 50;

    let bins = bins.max(1);
    let mut svg = vec![format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{W}\" height=\"{H}\">\
         <rect width=\"100%\" height=\"100%\" fill=\"#f8f9fb\"/>\
         <text x=\"{}\" y=\"24\" font-size=\"14\" fill=\"#333\">{title}</text>",
        L
    )];

    if values.is_empty() {
        svg.push(format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"#666\">no data</text>",
            W / 2 - 20,
            H / 2
        ));
        svg.push("</svg>".to_string());
        return svg.concat();
    }

    let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = (hi - lo).max(f64::EPSILON);

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / span) * bins as f64) as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    let plot_w = W - L - R;
    let plot_h = H - T - B;
    let bar_w = plot_w / bins as i64;
    for (i, &count) in counts.iter().enumerate() {
        let bar_h = (count as i64 * plot_h) / max_count as i64;
        let x = L + i as i64 * bar_w;
        let y = T + plot_h - bar_h;
        svg.push(format!(
            "<rect x=\"{x}\" y=\"{y}\" width=\"{}\" height=\"{bar_h}\" \
             fill=\"#4A90E2\" stroke=\"#333\" stroke-width=\"0.5\"/>",
            (bar_w - 1).max(1)
        ));
    }

    svg.push(format!(
        "<text x=\"{L}\" y=\"{}\" font-size=\"11\" fill=\"#666\">{lo:.2}</text>\
         <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"#666\">{hi:.2}</text>\
         <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"#333\">{x_label}</text>",
        H - B + 16,
        W - R - 40,
        H - B + 16,
        W / 2 - 30,
        H - B + 34,
    ));
    svg.push("</svg>".to_string());
    svg.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::completeness::CompletenessRow;
    use crate::eval::propagation::PairResult;

    #[test]
    fn writes_all_three_report_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let completeness = CompletenessReport {
            total_files: 2,
            complete_count: 1,
            rows: vec![
                CompletenessRow {
                    file: "a.json".to_string(),
                    status: "OK",
                    detail: String::new(),
                },
                CompletenessRow {
                    file: "b.json".to_string(),
                    status: "MISSING",
                    detail: "Tasks".to_string(),
                },
            ],
        };
        let propagation = PropagationReport {
            pairs_total: 1,
            passed: 1,
            rows: vec![PairResult {
                id: "1".to_string(),
                update_type: "vision_edit".to_string(),
                outcome: PairOutcome::Pass,
                metrics: vec!["s_vision=1.000".to_string()],
            }],
        };

        let summary = save_accuracy_reports(&completeness, &propagation, dir.path()).unwrap();
        assert!(summary.contains("Completeness %: 50.00"));
        assert!(summary.contains("Pass %: 100.00"));
        for file in [
            "accuracy_completeness_report.csv",
            "accuracy_propagation_report.csv",
            "accuracy_summary.txt",
        ] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
        let prop = std::fs::read_to_string(dir.path().join("accuracy_propagation_report.csv"))
            .unwrap();
        assert!(prop.contains("1,vision_edit,PASS,,s_vision=1.000"));
    }

    #[test]
    fn histogram_handles_empty_and_uniform_data() {
        let empty = histogram_svg(&[], 20, "t", "x");
        assert!(empty.contains("no data"));

        let uniform = histogram_svg(&[1.0, 1.0, 1.0], 10, "t", "x");
        assert!(uniform.contains("<rect"));
        assert!(uniform.ends_with("</svg>"));
    }
}
