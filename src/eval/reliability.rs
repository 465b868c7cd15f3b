//! Reliability and diversity sampling across temperatures.
//!
//! Each prompt runs `repeats` times at each temperature; outputs are parsed,
//! checked for completeness, and compared pairwise per field. One summary row
//! per (prompt, temperature) lands in the reliability CSV.

use std::path::Path;

use crate::csvio;
use crate::llm::ChatClient;

use super::completeness::check_completeness;
use super::diversity::{compare_batch, PairwiseStats};
use super::document::PlanDocument;
use super::perf::{percentile_p95, round3, round6, PerfRecorder};

/// Well-behaved vision statements.
pub const CORE_PROMPTS: &[(&str, &str)] = &[
    (
        "p1_normal",
        "Transition from a manual to fully automated product launch process.",
    ),
    (
        "p2_normal",
        "Transition the client service team away from administrative activities towards generating sales.",
    ),
    (
        "p3_normal",
        "Consolidate disparate data sources into a single source of truth.",
    ),
];

/// Stress prompts: terse, vague, very long, self-contradictory.
pub const EDGE_PROMPTS: &[(&str, &str)] = &[
    ("p4_short", "Automate launch."),
    ("p5_vague", "Make things better for sales."),
    (
        "p6_long",
        "Our company operates across six regions with fragmented processes for product ideation, \
         market research, regulatory review, and coordinated release activities. We want to introduce \
         a unified operating model that standardizes gates, artifacts, and responsibilities across PM, \
         Engineering, QA, Legal, and Sales Enablement. The new process must integrate with our data \
         warehouse, automate compliance evidence capture, and support parallel pilot launches while \
         maintaining audit trails and risk sign-offs. Success criteria include shorter cycle time, \
         fewer defects, and better traceability.",
    ),
    (
        "p7_conflict",
        "Cut scope but deliver twice as many features next sprint.",
    ),
];

/// Default sampling temperatures.
pub const DEFAULT_TEMPS: &[f32] = &[0.0, 0.2, 0.7];

/// Default runs per (prompt, temperature).
pub const DEFAULT_REPEATS: usize = 5;

/// One summary row of the reliability report.
#[derive(Debug, Clone)]
pub struct ReliabilityRow {
    pub prompt_id: String,
    pub category: String,
    pub temperature: f32,
    pub model: String,
    pub n_calls: usize,
    pub json_ok_rate: f64,
    pub schema_ok_rate: f64,
    pub lat_mean: Option<f64>,
    pub lat_p95: Option<f64>,
    pub lat_max: Option<f64>,
    pub tokens_in_mean: f64,
    pub tokens_out_mean: f64,
    pub est_cost_mean_gbp: f64,
    pub pairwise_pairs: usize,
    pub sim_vision: Option<PairwiseStats>,
    pub sim_outcomes: Option<PairwiseStats>,
    pub sim_benefits: Option<PairwiseStats>,
    pub sim_deliverables: Option<PairwiseStats>,
    pub sim_tasks: Option<PairwiseStats>,
}

/// Run the reliability suite: every prompt at every temperature, `repeats`
/// times each. Parse failures mark the call, never abort the suite.
pub async fn run_reliability(
    client: &dyn ChatClient,
    recorder: &PerfRecorder,
    prompts: &[(&str, &str, &str)],
    temps: &[f32],
    repeats: usize,
) -> Vec<ReliabilityRow> {
    let mut rows = Vec::new();

    for &temp in temps {
        for &(pid, category, prompt) in prompts {
            let mut records = Vec::with_capacity(repeats);
            let mut parsed: Vec<Option<PlanDocument>> = Vec::with_capacity(repeats);

            for _ in 0..repeats {
                let (text, mut rec) = recorder
                    .call_with_timing(client, prompt, temp, &format!("reliability:{pid}"))
                    .await;
                let doc: Option<PlanDocument> =
                    text.as_deref().and_then(|t| serde_json::from_str(t).ok());
                rec.ok = Some(doc.is_some());
                rec.schema_ok =
                    Some(doc.as_ref().is_some_and(|d| check_completeness(d).0));
                records.push(rec);
                parsed.push(doc);
            }

            let mut lats: Vec<f64> = records.iter().map(|r| r.latency_s).collect();
            lats.sort_by(|a, b| a.partial_cmp(b).expect("latencies are finite"));
            let n = records.len().max(1);
            let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len().max(1) as f64;

            let sims = compare_batch(&parsed);
            rows.push(ReliabilityRow {
                prompt_id: pid.to_string(),
                category: category.to_string(),
                temperature: temp,
                model: client.model().to_string(),
                n_calls: records.len(),
                json_ok_rate: round3(
                    records.iter().filter(|r| r.ok == Some(true)).count() as f64 / n as f64,
                ),
                schema_ok_rate: round3(
                    records.iter().filter(|r| r.schema_ok == Some(true)).count() as f64
                        / n as f64,
                ),
                lat_mean: (!lats.is_empty()).then(|| round3(mean(&lats))),
                lat_p95: (!lats.is_empty()).then(|| round3(percentile_p95(&lats))),
                lat_max: lats.last().copied().map(round3),
                tokens_in_mean: mean(
                    &records
                        .iter()
                        .map(|r| r.tokens_in.unwrap_or(0) as f64)
                        .collect::<Vec<_>>(),
                ),
                tokens_out_mean: mean(
                    &records
                        .iter()
                        .map(|r| r.tokens_out.unwrap_or(0) as f64)
                        .collect::<Vec<_>>(),
                ),
                est_cost_mean_gbp: round6(mean(
                    &records.iter().map(|r| r.est_cost).collect::<Vec<_>>(),
                )),
                pairwise_pairs: sims.pairs,
                sim_vision: sims.vision,
                sim_outcomes: sims.outcomes,
                sim_benefits: sims.benefits,
                sim_deliverables: sims.deliverables,
                sim_tasks: sims.tasks,
            });
        }
    }
    rows
}

/// All prompts with their categories, in suite order.
pub fn default_prompts() -> Vec<(&'static str, &'static str, &'static str)> {
    CORE_PROMPTS
        .iter()
        .map(|&(id, p)| (id, "core", p))
        .chain(EDGE_PROMPTS.iter().map(|&(id, p)| (id, "edge", p)))
        .collect()
}

/// Render reliability rows as the summary CSV.
pub fn reliability_csv(rows: &[ReliabilityRow]) -> String {
    let header = [
        "prompt_id",
        "category",
        "temperature",
        "model",
        "n_calls",
        "json_ok_rate",
        "schema_ok_rate",
        "lat_mean",
        "lat_p95",
        "lat_max",
        "tokens_in_mean",
        "tokens_out_mean",
        "est_cost_mean_gbp",
        "pairwise_pairs",
        "sim_vision_mean",
        "sim_vision_std",
        "sim_outcomes_mean",
        "sim_outcomes_std",
        "sim_benefits_mean",
        "sim_benefits_std",
        "sim_deliverables_mean",
        "sim_deliverables_std",
        "sim_tasks_mean",
        "sim_tasks_std",
    ];

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    let sim_cells = |s: &Option<PairwiseStats>, pairs: usize| -> (String, String) {
        match s {
            Some(stats) if pairs > 0 => (
                round3(stats.mean).to_string(),
                round3(stats.std).to_string(),
            ),
            _ => (String::new(), String::new()),
        }
    };

    let mut out = vec![header.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
    for row in rows {
        let (vm, vs) = sim_cells(&row.sim_vision, row.pairwise_pairs);
        let (om, os) = sim_cells(&row.sim_outcomes, row.pairwise_pairs);
        let (bm, bs) = sim_cells(&row.sim_benefits, row.pairwise_pairs);
        let (dm, ds) = sim_cells(&row.sim_deliverables, row.pairwise_pairs);
        let (tm, tsd) = sim_cells(&row.sim_tasks, row.pairwise_pairs);
        out.push(vec![
            row.prompt_id.clone(),
            row.category.clone(),
            row.temperature.to_string(),
            row.model.clone(),
            row.n_calls.to_string(),
            row.json_ok_rate.to_string(),
            row.schema_ok_rate.to_string(),
            opt(row.lat_mean),
            opt(row.lat_p95),
            opt(row.lat_max),
            round3(row.tokens_in_mean).to_string(),
            round3(row.tokens_out_mean).to_string(),
            row.est_cost_mean_gbp.to_string(),
            row.pairwise_pairs.to_string(),
            vm,
            vs,
            om,
            os,
            bm,
            bs,
            dm,
            ds,
            tm,
            tsd,
        ]);
    }
    csvio::render(&out)
}

/// Write the summary CSV into the output directory.
pub fn write_reliability_summary(rows: &[ReliabilityRow], out_dir: &Path) -> std::io::Result<std::path::PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = out_dir.join(format!("reliability_summary_{stamp}.csv"));
    std::fs::write(&path, reliability_csv(rows))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    const COMPLETE: &str = r#"{"vision": "Automate the launch process",
        "outcomes": ["Faster launches"], "benefits": ["Less manual work"],
        "deliverables": ["Launch pipeline"], "tasks": ["Build the pipeline"]}"#;

    #[tokio::test]
    async fn identical_outputs_report_unit_similarity() {
        let client = MockChatClient::with_default(COMPLETE);
        let recorder = PerfRecorder::new(None);
        let rows = run_reliability(
            &client,
            &recorder,
            &[("p1", "core", "a vision")],
            &[0.0],
            3,
        )
        .await;

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.n_calls, 3);
        assert_eq!(row.json_ok_rate, 1.0);
        assert_eq!(row.schema_ok_rate, 1.0);
        assert_eq!(row.pairwise_pairs, 3);
        assert_eq!(row.sim_vision.unwrap().mean, 1.0);
        assert_eq!(row.sim_tasks.unwrap().std, 0.0);
    }

    #[tokio::test]
    async fn single_run_has_no_pairs() {
        let client = MockChatClient::with_default(COMPLETE);
        let recorder = PerfRecorder::new(None);
        let rows = run_reliability(
            &client,
            &recorder,
            &[("p1", "core", "a vision")],
            &[0.2],
            1,
        )
        .await;
        assert_eq!(rows[0].pairwise_pairs, 0);
        assert!(rows[0].sim_vision.is_none());
    }

    #[tokio::test]
    async fn unparseable_output_lowers_ok_rate() {
        let client = MockChatClient::with_responses(
            vec![COMPLETE.to_string(), "not json".to_string()],
            COMPLETE,
        );
        let recorder = PerfRecorder::new(None);
        let rows = run_reliability(
            &client,
            &recorder,
            &[("p1", "core", "a vision")],
            &[0.2],
            2,
        )
        .await;
        assert_eq!(rows[0].json_ok_rate, 0.5);
        assert_eq!(rows[0].pairwise_pairs, 0);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = reliability_csv(&[]);
        assert!(csv.starts_with("prompt_id,category,temperature"));
    }

    #[test]
    fn default_prompt_suite_covers_core_and_edge() {
        let prompts = default_prompts();
        assert_eq!(prompts.len(), 7);
        assert!(prompts.iter().any(|(id, cat, _)| *id == "p1_normal" && *cat == "core"));
        assert!(prompts.iter().any(|(id, cat, _)| *id == "p7_conflict" && *cat == "edge"));
    }
}
