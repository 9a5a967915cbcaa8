//! redbench: benchmark a RESP server from the command line
//!
//! Runs the selected built-in tests one after another against the target
//! and prints a report for each. The process exits non-zero as soon as a
//! run records a connection error.

use redbench::config::Config;
use redbench::{Bench, BenchError, TcpConnector};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    // Initialize logging; stdout is reserved for reports
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        requests = config.bench.requests,
        clients = config.bench.clients,
        pipeline = config.bench.pipeline,
        handshake = !config.handshake.is_empty(),
        tests = config.tests.len(),
        "Starting redbench"
    );

    match run(&config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        // Already written to stderr by the runner
        Err(BenchError::Connect { .. }) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Benchmark failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run every configured test; `Ok(false)` when a run recorded errors
async fn run(config: &Config) -> Result<bool, BenchError> {
    let connector = TcpConnector::new(config.addr());
    let mut bench = Bench::new(config.bench.clone());

    for command in &config.tests {
        let fill = command.filler(config.data_size, config.keyspace);
        let summary = bench
            .run(command.name(), &connector, &config.handshake, fill)
            .await?;
        if summary.failed {
            return Ok(false);
        }
    }

    Ok(true)
}

