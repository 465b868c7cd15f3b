//! Bounded-concurrency load test against the generation service.
//!
//! Fires fixed fan-out batches of identical calls and measures per-call
//! latency and failure rate. Test tooling only; the live request path has no
//! internal concurrency of its own.

use std::sync::Arc;
use std::time::Instant;

use crate::csvio;
use crate::llm::{ChatClient, ChatRequest};

use super::perf::{percentile_p95, round3};

/// Default fan-out levels.
pub const DEFAULT_LEVELS: &[usize] = &[5, 10, 20, 50];

/// Default repeats per level.
pub const DEFAULT_REPEATS: usize = 3;

const LOAD_PROMPT: &str =
    "Generate a concise project outline from this vision: consolidate reporting systems.";

/// Aggregate results for one fan-out level.
#[derive(Debug, Clone)]
pub struct LevelStats {
    pub concurrent: usize,
    pub total_requests: usize,
    pub avg_latency_s: f64,
    pub p95_latency_s: f64,
    pub failure_rate_pct: f64,
}

/// Run the load test: for each level, `repeats` batches of `level` concurrent
/// calls. Failures count toward the failure rate; they never abort the run.
pub async fn run_scalability(
    client: Arc<dyn ChatClient>,
    levels: &[usize],
    repeats: usize,
    temperature: f32,
) -> Vec<LevelStats> {
    let mut stats = Vec::with_capacity(levels.len());

    for &level in levels {
        let mut latencies: Vec<f64> = Vec::with_capacity(level * repeats);
        let mut successes = 0usize;

        for _ in 0..repeats {
            let mut handles = Vec::with_capacity(level);
            for _ in 0..level {
                let client = Arc::clone(&client);
                handles.push(tokio::spawn(async move {
                    let request = ChatRequest {
                        system: String::new(),
                        user: LOAD_PROMPT.to_string(),
                        temperature,
                    };
                    let started = Instant::now();
                    let ok = client.chat(&request).await.is_ok();
                    (started.elapsed().as_secs_f64(), ok)
                }));
            }
            for handle in handles {
                // A panicked task counts as a failed request.
                let (latency, ok) = handle.await.unwrap_or((0.0, false));
                latencies.push(latency);
                successes += ok as usize;
            }
        }

        let total = latencies.len();
        let avg = latencies.iter().sum::<f64>() / total.max(1) as f64;
        let mut sorted = latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("latencies are finite"));
        let p95 = if sorted.is_empty() {
            0.0
        } else {
            percentile_p95(&sorted)
        };
        let failure_rate = 100.0 * (1.0 - successes as f64 / total.max(1) as f64);

        tracing::info!(
            level,
            avg = round3(avg),
            p95 = round3(p95),
            failure_pct = round3(failure_rate),
            "scalability batch complete"
        );
        stats.push(LevelStats {
            concurrent: level,
            total_requests: total,
            avg_latency_s: round3(avg),
            p95_latency_s: round3(p95),
            failure_rate_pct: round3(failure_rate),
        });
    }
    stats
}

/// Render level stats as CSV.
pub fn scalability_csv(stats: &[LevelStats]) -> String {
    let mut rows = vec![vec![
        "ConcurrentUsers".to_string(),
        "TotalRequests".to_string(),
        "AvgLatency_s".to_string(),
        "P95Latency_s".to_string(),
        "FailureRate_pct".to_string(),
    ]];
    for s in stats {
        rows.push(vec![
            s.concurrent.to_string(),
            s.total_requests.to_string(),
            s.avg_latency_s.to_string(),
            s.p95_latency_s.to_string(),
            s.failure_rate_pct.to_string(),
        ]);
    }
    csvio::render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    #[tokio::test]
    async fn counts_every_request_per_level() {
        let client: Arc<dyn ChatClient> =
            Arc::new(MockChatClient::with_default(r#"{"vision": "v"}"#));
        let stats = run_scalability(client, &[2, 4], 3, 0.2).await;

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].total_requests, 6);
        assert_eq!(stats[1].total_requests, 12);
        assert_eq!(stats[0].failure_rate_pct, 0.0);
    }

    #[tokio::test]
    async fn failures_show_in_the_rate() {
        let client: Arc<dyn ChatClient> = Arc::new(MockChatClient::failing());
        let stats = run_scalability(client, &[3], 1, 0.2).await;
        assert_eq!(stats[0].failure_rate_pct, 100.0);
    }

    #[test]
    fn csv_header_matches_columns() {
        let csv = scalability_csv(&[]);
        assert!(csv.starts_with("ConcurrentUsers,TotalRequests"));
    }
}
