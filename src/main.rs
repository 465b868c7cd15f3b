use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planflow::api::{self, AppState};
use planflow::config::AppConfig;
use planflow::db::Database;
use planflow::eval;
use planflow::eval::perf::PerfRecorder;
use planflow::llm::{ChatClient, HttpChatClient, MockChatClient};
use planflow::retrieval::{RetrievalClient, SeedDocument, PROJECTS_COLLECTION, TEAMS_COLLECTION};

#[derive(Parser)]
#[command(name = "planflow")]
#[command(about = "Vision-to-plan service with an offline evaluation harness")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Planflow HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// SQLite database path (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Load seed documents into the retrieval service (idempotent upsert)
    Populate {
        /// JSON file: {"projects": [{id, document}...], "organizational_teams": [...]}
        #[arg(long)]
        file: PathBuf,
    },
    /// Offline evaluation of the generation service
    Eval {
        #[command(subcommand)]
        command: EvalCommands,
    },
}

#[derive(Subcommand)]
enum EvalCommands {
    /// Completeness over a directory of documents + propagation over a pairs CSV
    Accuracy {
        /// Directory of generated *.json documents
        #[arg(long)]
        outputs: PathBuf,

        /// Pairs CSV (id, update_type, before_path, after_path)
        #[arg(long)]
        pairs: PathBuf,
    },
    /// Repeated sampling across temperatures: validity, latency, cost, diversity
    Reliability {
        /// Runs per (prompt, temperature)
        #[arg(long, default_value_t = eval::reliability::DEFAULT_REPEATS)]
        repeats: usize,

        /// Serve a canned response from this file instead of calling the service
        #[arg(long)]
        mock: Option<PathBuf>,
    },
    /// Timed trials over the fixed prompt set: latency and JSON validity
    Perf {
        /// Trials per prompt
        #[arg(long, default_value = "5")]
        n: usize,

        /// Serve a canned response from this file instead of calling the service
        #[arg(long)]
        mock: Option<PathBuf>,
    },
    /// Concurrent fan-out load test against the generation service
    Scalability {
        /// Comma-separated fan-out levels
        #[arg(long, default_value = "5,10,20,50")]
        levels: String,

        /// Batches per level
        #[arg(long, default_value_t = eval::scalability::DEFAULT_REPEATS)]
        repeats: usize,

        /// Serve a canned response from this file instead of calling the service
        #[arg(long)]
        mock: Option<PathBuf>,
    },
}

/// Prompts for the perf trials.
const PERF_PROMPTS: &[&str] = &[
    "Transition from a manual to fully automated product launch process.",
    "Consolidate disparate data sources into a single source of truth.",
    "Transition the client service team away from administrative activities towards sales.",
];

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "planflow=debug,tower_http=debug".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build a chat client: canned responses when `mock` is given, HTTP otherwise.
fn chat_client(config: &AppConfig, mock: Option<&PathBuf>) -> anyhow::Result<Arc<dyn ChatClient>> {
    match mock {
        Some(path) => {
            let canned = std::fs::read_to_string(path)?;
            Ok(Arc::new(MockChatClient::with_default(canned)))
        }
        None => Ok(Arc::new(HttpChatClient::new(
            config.llm.base_url.clone(),
            config.llm.api_key.clone(),
            config.llm.model.clone(),
        ))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = AppConfig::from_env();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(&config, port, db).await,
        None => serve(&config, 3000, None).await,
        Some(Commands::Populate { file }) => populate(&config, &file).await,
        Some(Commands::Eval { command }) => run_eval(&config, command).await,
    }
}

async fn serve(config: &AppConfig, port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting Planflow server on port {}", port);

    let db = match db_path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    let state = AppState {
        db,
        chat: chat_client(config, None)?,
        retrieval: config
            .retrieval_url
            .as_ref()
            .map(|url| Arc::new(RetrievalClient::new(url.clone()))),
    };
    let app = api::create_router(state, config.api_key.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    tracing::info!("Planflow server listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(serde::Deserialize)]
struct SeedFile {
    #[serde(default)]
    projects: Vec<SeedDocument>,
    #[serde(default)]
    organizational_teams: Vec<SeedDocument>,
}

async fn populate(config: &AppConfig, file: &PathBuf) -> anyhow::Result<()> {
    let url = config
        .retrieval_url
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("PLANFLOW_RETRIEVAL_URL is not set"))?;
    let client = RetrievalClient::new(url.clone());

    let seeds: SeedFile = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    let projects = client.upsert(PROJECTS_COLLECTION, &seeds.projects).await?;
    let teams = client
        .upsert(TEAMS_COLLECTION, &seeds.organizational_teams)
        .await?;
    println!("Upserted {projects} project documents and {teams} team documents");
    Ok(())
}

async fn run_eval(config: &AppConfig, command: EvalCommands) -> anyhow::Result<()> {
    let out_dir = config.eval_output_dir.clone();
    std::fs::create_dir_all(&out_dir)?;

    match command {
        EvalCommands::Accuracy { outputs, pairs } => {
            let completeness = eval::run_completeness(&outputs);
            let propagation = eval::run_propagation(&pairs);
            let summary =
                eval::report::save_accuracy_reports(&completeness, &propagation, &out_dir)?;
            println!("{summary}");
            println!("Reports written to {}", out_dir.display());
        }
        EvalCommands::Reliability { repeats, mock } => {
            let client = chat_client(config, mock.as_ref())?;
            let recorder = PerfRecorder::new(Some(PerfRecorder::default_log_path(&out_dir)));
            let prompts = eval::reliability::default_prompts();
            let rows = eval::reliability::run_reliability(
                client.as_ref(),
                &recorder,
                &prompts,
                eval::reliability::DEFAULT_TEMPS,
                repeats,
            )
            .await;
            let path = eval::reliability::write_reliability_summary(&rows, &out_dir)?;
            println!("Reliability summary written to: {}", path.display());
        }
        EvalCommands::Perf { n, mock } => {
            let client = chat_client(config, mock.as_ref())?;
            let recorder = PerfRecorder::new(Some(PerfRecorder::default_log_path(&out_dir)));

            let mut records = Vec::new();
            for prompt in PERF_PROMPTS {
                for _ in 0..n {
                    let (text, mut rec) = recorder
                        .call_with_timing(client.as_ref(), prompt, 0.2, "vision2plan")
                        .await;
                    let doc: Option<eval::PlanDocument> =
                        text.as_deref().and_then(|t| serde_json::from_str(t).ok());
                    rec.ok = Some(doc.is_some());
                    rec.schema_ok =
                        Some(doc.as_ref().is_some_and(|d| eval::check_completeness(d).0));
                    records.push(rec);
                }
            }

            let total = records.len().max(1);
            let well_formed = records.iter().filter(|r| r.ok == Some(true)).count();
            let schema_valid = records.iter().filter(|r| r.schema_ok == Some(true)).count();
            let mean_cost =
                records.iter().map(|r| r.est_cost).sum::<f64>() / total as f64;

            if let Some(summary) = eval::perf::summarise_latencies(&records) {
                println!(
                    "Latency: n={} mean={}s median={}s p95={}s max={}s",
                    summary.n, summary.mean, summary.median, summary.p95, summary.max
                );
            }
            println!(
                "JSON success: well_formed {:.1}% schema_valid {:.1}%",
                100.0 * well_formed as f64 / total as f64,
                100.0 * schema_valid as f64 / total as f64
            );
            println!("Mean estimated cost per call: \u{a3}{mean_cost:.6}");

            let svg = eval::report::latency_histogram_svg(&records, 20);
            let svg_path = out_dir.join("latency_hist.svg");
            std::fs::write(&svg_path, svg)?;
            println!("Saved: {}", svg_path.display());
        }
        EvalCommands::Scalability {
            levels,
            repeats,
            mock,
        } => {
            let levels: Vec<usize> = levels
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            let client = chat_client(config, mock.as_ref())?;
            let stats =
                eval::scalability::run_scalability(client, &levels, repeats, 0.2).await;
            for s in &stats {
                println!(
                    "[n={:>3}] avg={:.2}s  p95={:.2}s  fail={:.1}%",
                    s.concurrent, s.avg_latency_s, s.p95_latency_s, s.failure_rate_pct
                );
            }
            let csv_path = out_dir.join("scalability_results.csv");
            std::fs::write(&csv_path, eval::scalability::scalability_csv(&stats))?;
            println!("Saved CSV -> {}", csv_path.display());
        }
    }
    Ok(())
}
