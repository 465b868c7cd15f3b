//! Timed generation calls with token and cost accounting.
//!
//! Every call is appended as one JSON line to `api_metrics.jsonl` under the
//! evaluation output directory, so later summarization runs over the full
//! history rather than one session.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::llm::{ChatClient, ChatRequest, TokenUsage};

/// System instruction for evaluation calls: a flat five-field JSON document.
pub const EVAL_SYSTEM_PROMPT: &str = "Return ONLY valid JSON (no surrounding text, no backticks). \
    Required keys: vision (string), outcomes (array of strings), \
    benefits (array of strings), deliverables (array of strings), \
    tasks (array of strings). No extra keys, no comments.";

/// GBP per 1K tokens, keyed by model. Unknown models cost 0.0.
const PRICES_PER_1K_GBP: &[(&str, f64, f64)] = &[
    // (model, input, output)
    ("gpt-4o", 0.00198, 0.00790),
];

/// Estimate the GBP cost of one call from its token usage.
pub fn estimate_cost_gbp(usage: &TokenUsage, model: &str) -> f64 {
    let Some((_, input, output)) = PRICES_PER_1K_GBP.iter().find(|(m, _, _)| *m == model) else {
        return 0.0;
    };
    (usage.prompt_tokens as f64 / 1000.0) * input + (usage.completion_tokens as f64 / 1000.0) * output
}

/// One timed call, as logged and summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub ts: String,
    pub feature: String,
    pub model: String,
    pub temperature: f32,
    pub latency_s: f64,
    pub tokens_in: Option<u64>,
    pub tokens_out: Option<u64>,
    pub est_cost: f64,
    pub currency: String,
    pub raw_len: usize,
    pub pricing_applied: bool,
    /// JSON well-formedness; filled by the runner after parsing.
    pub ok: Option<bool>,
    /// Schema conformance; filled by the runner after checking.
    pub schema_ok: Option<bool>,
}

/// Issues timed calls and appends records to a JSONL metrics log.
pub struct PerfRecorder {
    log_path: Option<PathBuf>,
}

impl PerfRecorder {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self { log_path }
    }

    /// Default log location under the evaluation output directory.
    pub fn default_log_path(out_dir: &Path) -> PathBuf {
        out_dir.join("api_metrics.jsonl")
    }

    /// Issue one timed call. Service failures yield `(None, record)` with the
    /// latency still measured; the batch carries on.
    pub async fn call_with_timing(
        &self,
        client: &dyn ChatClient,
        prompt: &str,
        temperature: f32,
        feature: &str,
    ) -> (Option<String>, CallRecord) {
        let request = ChatRequest {
            system: EVAL_SYSTEM_PROMPT.to_string(),
            user: prompt.to_string(),
            temperature,
        };

        let started = Instant::now();
        let result = client.chat(&request).await;
        let latency_s = round3(started.elapsed().as_secs_f64());

        let (text, usage) = match result {
            Ok(response) => (Some(response.text), response.usage),
            Err(e) => {
                tracing::warn!(feature, error = %e, "evaluation call failed");
                (None, TokenUsage::default())
            }
        };

        let model = client.model().to_string();
        let record = CallRecord {
            ts: chrono::Utc::now().to_rfc3339(),
            feature: feature.to_string(),
            model: model.clone(),
            temperature,
            latency_s,
            tokens_in: text.as_ref().map(|_| usage.prompt_tokens),
            tokens_out: text.as_ref().map(|_| usage.completion_tokens),
            est_cost: round6(estimate_cost_gbp(&usage, &model)),
            currency: "GBP".to_string(),
            raw_len: text.as_deref().map(str::len).unwrap_or(0),
            pricing_applied: PRICES_PER_1K_GBP.iter().any(|(m, _, _)| *m == model),
            ok: None,
            schema_ok: None,
        };

        self.append(&record);
        (text, record)
    }

    /// Append an (possibly updated) record to the log.
    pub fn append(&self, record: &CallRecord) {
        let Some(ref path) = self.log_path else {
            return;
        };
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "could not append metrics record");
        }
    }
}

/// Latency summary over a set of records.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub max: f64,
}

/// Summarize call latencies: mean, median, p95 (index `0.95 * (n-1)` over the
/// sorted sample), max. None when there are no records.
pub fn summarise_latencies(records: &[CallRecord]) -> Option<LatencySummary> {
    let mut xs: Vec<f64> = records.iter().map(|r| r.latency_s).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.partial_cmp(b).expect("latencies are finite"));
    let n = xs.len();
    let mean = xs.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        xs[n / 2]
    } else {
        (xs[n / 2 - 1] + xs[n / 2]) / 2.0
    };
    Some(LatencySummary {
        n,
        mean: round3(mean),
        median: round3(median),
        p95: round3(percentile_p95(&xs)),
        max: round3(xs[n - 1]),
    })
}

/// p95 of an ascending-sorted sample.
pub fn percentile_p95(sorted: &[f64]) -> f64 {
    let idx = (0.95 * (sorted.len() - 1) as f64) as usize;
    sorted[idx]
}

pub(crate) fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub(crate) fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    #[test]
    fn known_model_prices_apply() {
        let usage = TokenUsage {
            prompt_tokens: 1000,
            completion_tokens: 1000,
        };
        let cost = estimate_cost_gbp(&usage, "gpt-4o");
        assert!((cost - (0.00198 + 0.00790)).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_costs_nothing() {
        let usage = TokenUsage {
            prompt_tokens: 1000,
            completion_tokens: 1000,
        };
        assert_eq!(estimate_cost_gbp(&usage, "some-new-model"), 0.0);
    }

    #[test]
    fn latency_summary_percentiles() {
        let records: Vec<CallRecord> = (1..=100)
            .map(|i| CallRecord {
                ts: String::new(),
                feature: String::new(),
                model: String::new(),
                temperature: 0.0,
                latency_s: i as f64,
                tokens_in: None,
                tokens_out: None,
                est_cost: 0.0,
                currency: "GBP".to_string(),
                raw_len: 0,
                pricing_applied: false,
                ok: None,
                schema_ok: None,
            })
            .collect();
        let summary = summarise_latencies(&records).unwrap();
        assert_eq!(summary.n, 100);
        assert_eq!(summary.mean, 50.5);
        assert_eq!(summary.median, 50.5);
        // index floor(0.95 * 99) = 94 -> value 95.
        assert_eq!(summary.p95, 95.0);
        assert_eq!(summary.max, 100.0);
    }

    #[test]
    fn empty_records_summarise_to_none() {
        assert!(summarise_latencies(&[]).is_none());
    }

    #[tokio::test]
    async fn timed_call_logs_jsonl() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("api_metrics.jsonl");
        let recorder = PerfRecorder::new(Some(log.clone()));
        let client = MockChatClient::with_default(r#"{"vision": "v"}"#);

        let (text, record) = recorder
            .call_with_timing(&client, "a prompt", 0.2, "perf-test")
            .await;
        assert!(text.is_some());
        assert_eq!(record.tokens_in, Some(700));
        assert_eq!(record.tokens_out, Some(2200));

        let logged = std::fs::read_to_string(&log).unwrap();
        let parsed: CallRecord = serde_json::from_str(logged.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.feature, "perf-test");
    }

    #[tokio::test]
    async fn failed_call_still_produces_record() {
        let recorder = PerfRecorder::new(None);
        let client = MockChatClient::failing();
        let (text, record) = recorder
            .call_with_timing(&client, "a prompt", 0.2, "perf-test")
            .await;
        assert!(text.is_none());
        assert_eq!(record.tokens_in, None);
        assert_eq!(record.raw_len, 0);
    }
}
