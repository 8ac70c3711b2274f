//! addsvc command line client.
//!
//! Runs `sum` or `concat` through the fully decorated endpoint chain and
//! prints one JSON line per call. Repeating a call is the quickest way to
//! watch the rate limiter and circuit breaker at work:
//!
//! ```text
//! addsvc --repeat 3 sum 1 2
//! addsvc --metrics --config addsvc.toml concat foo bar
//! ```

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use addsvc_endpoints::addsvc::{BasicService, Endpoints};
use addsvc_endpoints::config::{load_config, ServiceConfig};
use addsvc_endpoints::endpoint::{Context, EndpointError, Outcome, Reply};
use addsvc_endpoints::observability::logging::init_logging;
use addsvc_endpoints::observability::metrics::init_metrics;
use addsvc_endpoints::observability::MetricsRecorder;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

#[derive(Parser)]
#[command(name = "addsvc")]
#[command(about = "Call the add service through its middleware chain", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of times to issue the call
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Per-call deadline in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Print Prometheus metrics after the calls
    #[arg(short, long)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add two integers
    Sum {
        #[arg(allow_negative_numbers = true)]
        a: i64,
        #[arg(allow_negative_numbers = true)]
        b: i64,
    },
    /// Concatenate two strings
    Concat { a: String, b: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        config = ?cli.config,
        repeat = cli.repeat,
        "addsvc v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = if cli.metrics || config.observability.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    let endpoints = Endpoints::new(
        Arc::new(BasicService),
        &config.endpoints,
        Arc::new(MetricsRecorder),
    );

    // Ctrl-C cancels whatever call is in flight.
    let (root, cancel) = Context::background().with_cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    for attempt in 1..=cli.repeat {
        let mut ctx = root.with_request_id(uuid::Uuid::new_v4());
        if let Some(ms) = cli.timeout_ms {
            ctx = ctx.with_timeout(Duration::from_millis(ms));
        }

        let line = match &cli.command {
            Commands::Sum { a, b } => {
                render("sum", attempt, endpoints.sum(ctx, *a, *b).await)
            }
            Commands::Concat { a, b } => render(
                "concat",
                attempt,
                endpoints.concat(ctx, a.as_str(), b.as_str()).await,
            ),
        };
        println!("{line}");

        if root.is_cancelled() {
            break;
        }
    }

    if let Some(handle) = metrics {
        print!("{}", handle.render());
    }

    tracing::info!("addsvc done");
    Ok(())
}

fn render<T: Serialize, E: Display>(
    method: &str,
    attempt: u32,
    result: Result<Reply<T, E>, EndpointError>,
) -> serde_json::Value {
    let outcome = Outcome::of(&result);
    match result {
        Ok(Reply::Success(value)) => json!({
            "method": method,
            "attempt": attempt,
            "outcome": outcome.as_str(),
            "value": value,
        }),
        Ok(Reply::Failed(err)) => json!({
            "method": method,
            "attempt": attempt,
            "outcome": outcome.as_str(),
            "error": err.to_string(),
        }),
        Err(err) => json!({
            "method": method,
            "attempt": attempt,
            "outcome": outcome.as_str(),
            "kind": err.kind(),
            "error": err.to_string(),
        }),
    }
}
