//! Benchmark coordinator.
//!
//! A run goes through these phases:
//! - plan: split the requests across clients
//! - connect: dial and prepare every client in order; the first client
//!   failing to connect aborts the run, later ones are just skipped
//! - run: one task per client, progress polled from shared counters
//! - report: histogram and rate once every worker has finished, then the
//!   per-client errors in client order
//!
//! Nothing here holds a lock. Workers own their latency slots and hand them
//! back through their join handles.

mod counters;
mod plan;
mod report;
mod worker;

pub use counters::{SharedCounters, Snapshot};
pub use plan::ClientPlan;
pub use report::{histogram, write_progress, HistogramLine, Report};

use crate::connect::Connect;
use crate::error::BenchError;
use crate::fill::Fill;
use crate::prepare::Prepare;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use worker::Worker;

/// Options for a benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Total requests across all clients
    pub requests: usize,
    /// Number of parallel connections
    pub clients: usize,
    /// Requests sent per batch on one connection
    pub pipeline: usize,
    /// Print only the final rate
    pub quiet: bool,
    /// Print a single CSV line per run
    pub csv: bool,
    /// How often live progress is refreshed
    pub progress_interval: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            requests: 100_000,
            clients: 50,
            pipeline: 1,
            quiet: false,
            csv: false,
            progress_interval: Duration::from_millis(200),
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.clients == 0 {
            return Err(BenchError::InvalidConfig(
                "client count must be at least 1".to_string(),
            ));
        }
        if self.pipeline == 0 {
            return Err(BenchError::InvalidConfig(
                "pipeline depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of one benchmark run
#[derive(Debug)]
pub struct Summary {
    /// Final counter values
    pub snapshot: Snapshot,
    /// Every client's plan with its recorded latencies
    pub plans: Vec<ClientPlan>,
    /// Errors recorded per client, in client order
    pub errors: Vec<(usize, BenchError)>,
    /// Whether any client recorded an error
    pub failed: bool,
}

impl Summary {
    /// Completed requests per second
    pub fn rate(&self) -> f64 {
        self.snapshot.rate()
    }
}

/// Runs benchmarks and writes their reports.
pub struct Bench {
    config: BenchConfig,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
}

impl Bench {
    /// Create a runner writing to the process's stdout and stderr
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }

    /// Redirect report and error output
    pub fn with_output<O, E>(mut self, stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        self.stdout = Box::new(stdout);
        self.stderr = Box::new(stderr);
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run one benchmark named `name`.
    ///
    /// Returns `Err` only when the run could not start: bad options, or the
    /// first client failing to connect. Errors on individual clients are
    /// reported in the returned summary.
    pub async fn run<C, P, F>(
        &mut self,
        name: &str,
        connector: &C,
        prepare: &P,
        fill: F,
    ) -> Result<Summary, BenchError>
    where
        C: Connect,
        P: Prepare<C::Stream>,
        F: Fill,
    {
        self.config.validate()?;
        let BenchConfig {
            requests,
            clients,
            pipeline,
            ..
        } = self.config;

        info!(
            name,
            addr = connector.addr(),
            requests,
            clients,
            pipeline,
            "Starting benchmark"
        );

        let plans = ClientPlan::split(requests, clients);
        let mut errors: Vec<Option<BenchError>> = (0..clients).map(|_| None).collect();
        let mut conns = Vec::with_capacity(clients);

        for client in 0..clients {
            let mut conn = match connector.connect(client).await {
                Ok(conn) => conn,
                Err(source) => {
                    let err = BenchError::Connect {
                        addr: connector.addr().to_string(),
                        source,
                    };
                    if client == 0 {
                        // The target is unreachable, nothing to measure
                        writeln!(self.stderr, "{}", err).map_err(BenchError::Output)?;
                        return Err(err);
                    }
                    warn!(client, error = %err, "Connection failed");
                    errors[client] = Some(err);
                    conns.push(None);
                    continue;
                }
            };

            if prepare.prepare(&mut conn).await {
                debug!(client, "Connection ready");
                conns.push(Some(conn));
            } else {
                warn!(client, "Connection rejected by prepare step");
                if let Err(e) = conn.shutdown().await {
                    debug!(client, error = %e, "Shutdown failed");
                }
                conns.push(None);
            }
        }

        let counters = SharedCounters::new(clients);
        let fill = Arc::new(fill);
        let started = Instant::now();

        let handles: Vec<_> = plans
            .into_iter()
            .zip(conns)
            .map(|(plan, conn)| {
                let worker = Worker {
                    plan,
                    pipeline,
                    fill: Arc::clone(&fill),
                    counters: Arc::clone(&counters),
                    started,
                };
                tokio::spawn(worker.run(conn))
            })
            .collect();

        while counters.running() > 0 {
            if !self.config.csv {
                write_progress(&mut self.stdout, name, counters.snapshot().rate())
                    .map_err(BenchError::Output)?;
            }
            tokio::time::sleep(self.config.progress_interval).await;
        }

        let mut plans = Vec::with_capacity(clients);
        let mut finished = Vec::with_capacity(clients);
        for (client, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(outcome) => {
                    if let Some(e) = outcome.error {
                        errors[client] = Some(e);
                    }
                    plans.push(outcome.plan);
                    finished.extend(outcome.conn);
                }
                Err(e) => {
                    errors[client] = Some(BenchError::Worker(e.to_string()));
                    plans.push(ClientPlan {
                        client,
                        latencies: Vec::new(),
                    });
                }
            }
        }

        let snapshot = counters.snapshot();
        let report = Report {
            name,
            config: &self.config,
            snapshot: &snapshot,
            plans: &plans,
        };
        report.write(&mut self.stdout).map_err(BenchError::Output)?;

        let errors: Vec<(usize, BenchError)> = errors
            .into_iter()
            .enumerate()
            .filter_map(|(client, err)| err.map(|e| (client, e)))
            .collect();
        for (_, err) in &errors {
            writeln!(self.stderr, "{}", err).map_err(BenchError::Output)?;
            // Every client failed the same way when nothing completed
            if snapshot.completed == 0 {
                break;
            }
        }

        for mut conn in finished {
            if let Err(e) = conn.shutdown().await {
                debug!(error = %e, "Shutdown failed");
            }
        }

        info!(
            name,
            completed = snapshot.completed,
            rate = snapshot.rate(),
            errors = errors.len(),
            "Benchmark finished"
        );

        Ok(Summary {
            snapshot,
            plans,
            failed: !errors.is_empty(),
            errors,
        })
    }
}
