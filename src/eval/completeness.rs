//! Completeness check: all five required fields present and non-empty.

use std::path::Path;

use super::document::{PlanDocument, REQUIRED_FIELDS};

/// One row of the completeness report: file name, status, detail.
#[derive(Debug, Clone)]
pub struct CompletenessRow {
    pub file: String,
    /// "OK", "MISSING", or "ERROR".
    pub status: &'static str,
    /// Comma-joined missing fields, or the read error.
    pub detail: String,
}

/// Aggregate completeness results over a directory of documents.
#[derive(Debug, Clone)]
pub struct CompletenessReport {
    pub total_files: usize,
    pub complete_count: usize,
    pub rows: Vec<CompletenessRow>,
}

impl CompletenessReport {
    pub fn completeness_pct(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            100.0 * self.complete_count as f64 / self.total_files as f64
        }
    }
}

/// Check one document: complete iff every required field is present and
/// non-empty (not null, not "", not []). Returns the exact missing fields.
pub fn check_completeness(doc: &PlanDocument) -> (bool, Vec<&'static str>) {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !doc.field_present(f))
        .collect();
    (missing.is_empty(), missing)
}

/// Check every `*.json` file in a directory, in name order. Unreadable files
/// are recorded as errors and do not abort the batch.
pub fn run_completeness(dir: &Path) -> CompletenessReport {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();

    let mut rows = Vec::with_capacity(files.len());
    let mut complete_count = 0;

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let doc: Result<PlanDocument, String> = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()));

        match doc {
            Ok(doc) => {
                let (ok, missing) = check_completeness(&doc);
                if ok {
                    complete_count += 1;
                }
                rows.push(CompletenessRow {
                    file: name,
                    status: if ok { "OK" } else { "MISSING" },
                    detail: missing.join(","),
                });
            }
            Err(e) => rows.push(CompletenessRow {
                file: name,
                status: "ERROR",
                detail: e,
            }),
        }
    }

    CompletenessReport {
        total_files: files.len(),
        complete_count,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> PlanDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn complete_document_passes() {
        let (ok, missing) = check_completeness(&doc(
            r#"{"Vision": "v", "Outcomes": ["o"], "Benefits": ["b"],
                "Deliverables": ["d"], "Tasks": ["t"]}"#,
        ));
        assert!(ok);
        assert!(missing.is_empty());
    }

    #[test]
    fn null_empty_string_and_empty_list_are_missing() {
        let (ok, missing) = check_completeness(&doc(
            r#"{"Vision": "", "Outcomes": [], "Benefits": null, "Deliverables": ["d"]}"#,
        ));
        assert!(!ok);
        assert_eq!(missing, vec!["Vision", "Outcomes", "Benefits", "Tasks"]);
    }

    #[test]
    fn batch_run_counts_errors_separately() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"Vision": "v", "Outcomes": ["o"], "Benefits": ["b"],
                "Deliverables": ["d"], "Tasks": ["t"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"Vision": "v"}"#).unwrap();
        std::fs::write(dir.path().join("c.json"), "not json at all").unwrap();

        let report = run_completeness(dir.path());
        assert_eq!(report.total_files, 3);
        assert_eq!(report.complete_count, 1);
        assert_eq!(report.rows[0].status, "OK");
        assert_eq!(report.rows[1].status, "MISSING");
        assert_eq!(report.rows[1].detail, "Outcomes,Benefits,Deliverables,Tasks");
        assert_eq!(report.rows[2].status, "ERROR");
        assert!((report.completeness_pct() - 33.33).abs() < 0.01);
    }
}
