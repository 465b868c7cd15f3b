//! Forward/backward propagation consistency over before/after document pairs.
//!
//! A material change to an upstream field (Vision, Tasks) must be reflected
//! in its downstream fields (Outcomes/Benefits, Deliverables). Pairs where
//! the upstream field did not materially change pass automatically.

use std::path::{Path, PathBuf};

use super::document::PlanDocument;
use super::textsim::{similarity, textify};
use crate::csvio;

/// Upstream field materially changed when similarity drops below this.
pub const VISION_CHANGED_SIM_TH: f64 = 0.80;
pub const TASKS_CHANGED_SIM_TH: f64 = 0.85;

/// Downstream field counted as changed when similarity drops below this.
pub const DOWNSTREAM_CHANGED_SIM_TH: f64 = 0.95;
pub const DELIVERABLES_CHANGED_SIM_TH: f64 = 0.95;

/// Which upstream field a pair edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    VisionEdit,
    TasksEdit,
}

impl UpdateType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vision_edit" => Some(Self::VisionEdit),
            "tasks_edit" => Some(Self::TasksEdit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisionEdit => "vision_edit",
            Self::TasksEdit => "tasks_edit",
        }
    }
}

/// The verdict for one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Pass,
    Fail,
    Error(String),
}

/// One row of the propagation report.
#[derive(Debug, Clone)]
pub struct PairResult {
    pub id: String,
    pub update_type: String,
    pub outcome: PairOutcome,
    /// Up to three "name=value" similarity metrics.
    pub metrics: Vec<String>,
}

/// Aggregate propagation results.
///
/// Error rows stay in `pairs_total` but never in `passed`, so unreadable
/// pairs drag the pass rate down rather than disappearing.
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub pairs_total: usize,
    pub passed: usize,
    pub rows: Vec<PairResult>,
}

impl PropagationReport {
    pub fn passed_pct(&self) -> f64 {
        if self.pairs_total == 0 {
            0.0
        } else {
            100.0 * self.passed as f64 / self.pairs_total as f64
        }
    }
}

/// Check one before/after pair.
///
/// `vision_edit`: material iff sim(Vision) < 0.80, then at least one of
/// Outcomes/Benefits must show sim < 0.95. `tasks_edit`: material iff
/// sim(Tasks) < 0.85, then Deliverables must show sim < 0.95. Pairs without
/// a material upstream change pass regardless of downstream.
pub fn check_propagation(
    before: &PlanDocument,
    after: &PlanDocument,
    update: UpdateType,
) -> (bool, Vec<String>) {
    match update {
        UpdateType::VisionEdit => {
            let s_vision = similarity(&textify(&before.vision), &textify(&after.vision));
            let s_outcomes = similarity(&textify(&before.outcomes), &textify(&after.outcomes));
            let s_benefits = similarity(&textify(&before.benefits), &textify(&after.benefits));
            let materially_changed = s_vision < VISION_CHANGED_SIM_TH;
            let downstream_changed = s_outcomes < DOWNSTREAM_CHANGED_SIM_TH
                || s_benefits < DOWNSTREAM_CHANGED_SIM_TH;
            let ok = !materially_changed || downstream_changed;
            (
                ok,
                vec![
                    format!("s_vision={s_vision:.3}"),
                    format!("s_outcomes={s_outcomes:.3}"),
                    format!("s_benefits={s_benefits:.3}"),
                ],
            )
        }
        UpdateType::TasksEdit => {
            let s_tasks = similarity(&textify(&before.tasks), &textify(&after.tasks));
            let s_deliv = similarity(
                &textify(&before.deliverables),
                &textify(&after.deliverables),
            );
            let materially_changed = s_tasks < TASKS_CHANGED_SIM_TH;
            let downstream_changed = s_deliv < DELIVERABLES_CHANGED_SIM_TH;
            let ok = !materially_changed || downstream_changed;
            (
                ok,
                vec![
                    format!("s_tasks={s_tasks:.3}"),
                    format!("s_deliverables={s_deliv:.3}"),
                ],
            )
        }
    }
}

/// Run the propagation check over a pairs CSV
/// (`id, update_type, before_path, after_path`).
///
/// The reader is tolerant: headers are lowercased and trimmed, relative
/// document paths are resolved against the CSV's directory and its parent,
/// and every bad row becomes an Error result instead of aborting.
pub fn run_propagation(pairs_csv: &Path) -> PropagationReport {
    let Ok(text) = std::fs::read_to_string(pairs_csv) else {
        return PropagationReport::default();
    };
    let rows = csvio::parse(&text);
    if rows.is_empty() {
        return PropagationReport::default();
    }

    let headers: Vec<String> = rows[0].iter().map(|h| h.trim().to_lowercase()).collect();
    let col = |name: &str| headers.iter().position(|h| h == name);
    let (Some(id_col), Some(type_col), Some(before_col), Some(after_col)) = (
        col("id"),
        col("update_type"),
        col("before_path"),
        col("after_path"),
    ) else {
        let missing: Vec<&str> = ["id", "update_type", "before_path", "after_path"]
            .into_iter()
            .filter(|n| col(n).is_none())
            .collect();
        return PropagationReport {
            pairs_total: 0,
            passed: 0,
            rows: vec![PairResult {
                id: "?".to_string(),
                update_type: "?".to_string(),
                outcome: PairOutcome::Error(format!("Missing columns: {}", missing.join(", "))),
                metrics: vec![],
            }],
        };
    };

    let base = pairs_csv.parent().unwrap_or(Path::new("."));
    let mut report = PropagationReport::default();

    for row in &rows[1..] {
        report.pairs_total += 1;
        let cell = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");
        let id = cell(id_col).to_string();
        let utype = cell(type_col).to_string();
        let bpath = cell(before_col);
        let apath = cell(after_col);

        let mut errs: Vec<String> = Vec::new();
        if id.is_empty() {
            errs.push("missing id".to_string());
        }
        if utype.is_empty() {
            errs.push("missing update_type".to_string());
        }
        if bpath.is_empty() {
            errs.push("missing before_path".to_string());
        }
        if apath.is_empty() {
            errs.push("missing after_path".to_string());
        }

        let before_p = resolve_existing(base, bpath);
        let after_p = resolve_existing(base, apath);
        if !bpath.is_empty() && !before_p.exists() {
            errs.push(format!("not found: {}", before_p.display()));
        }
        if !apath.is_empty() && !after_p.exists() {
            errs.push(format!("not found: {}", after_p.display()));
        }

        if !errs.is_empty() {
            report.rows.push(PairResult {
                id: if id.is_empty() { "?".to_string() } else { id },
                update_type: if utype.is_empty() {
                    "?".to_string()
                } else {
                    utype
                },
                outcome: PairOutcome::Error(errs.join("; ")),
                metrics: vec![],
            });
            continue;
        }

        let Some(update) = UpdateType::parse(&utype) else {
            report.rows.push(PairResult {
                id,
                update_type: utype,
                outcome: PairOutcome::Error("unknown update_type".to_string()),
                metrics: vec![],
            });
            continue;
        };

        let pair = read_doc(&before_p).and_then(|b| read_doc(&after_p).map(|a| (b, a)));
        let (before, after) = match pair {
            Ok(p) => p,
            Err(e) => {
                report.rows.push(PairResult {
                    id,
                    update_type: utype,
                    outcome: PairOutcome::Error(e),
                    metrics: vec![],
                });
                continue;
            }
        };

        let (ok, metrics) = check_propagation(&before, &after, update);
        if ok {
            report.passed += 1;
        }
        report.rows.push(PairResult {
            id,
            update_type: utype,
            outcome: if ok { PairOutcome::Pass } else { PairOutcome::Fail },
            metrics,
        });
    }

    report
}

fn read_doc(path: &Path) -> Result<PlanDocument, String> {
    std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
}

/// Resolve a path string against the CSV's directory, then its parent.
/// Returns the first existing candidate, or the first candidate for a
/// clearer error message.
fn resolve_existing(base: &Path, path_str: &str) -> PathBuf {
    let p = Path::new(path_str);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    let candidates = [base.join(p), base.parent().unwrap_or(base).join(p)];
    for c in &candidates {
        if c.exists() {
            return c.clone();
        }
    }
    candidates[0].clone()
}
