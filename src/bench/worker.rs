//! Per-connection benchmark worker.
//!
//! A worker owns one connection and pushes its plan through it in
//! pipelined batches. Pipelining hides the latency of individual requests,
//! so each batch's round-trip time is split evenly across its requests.

use super::counters::SharedCounters;
use super::plan::ClientPlan;
use crate::error::BenchError;
use crate::fill::Fill;
use crate::resp::Decoder;
use bytes::BytesMut;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

/// Initial request buffer size
const BUFFER_SIZE: usize = 16 * 1024;

/// What a worker hands back to the coordinator when it ends
#[derive(Debug)]
pub(crate) struct WorkerOutcome<S> {
    /// The plan with every completed request's latency filled in
    pub plan: ClientPlan,
    /// Error that stopped the worker, if any
    pub error: Option<BenchError>,
    /// The connection, returned so the coordinator can close it
    pub conn: Option<S>,
}

pub(crate) struct Worker<F> {
    pub plan: ClientPlan,
    pub pipeline: usize,
    pub fill: Arc<F>,
    pub counters: Arc<SharedCounters>,
    /// When the run started
    pub started: Instant,
}

impl<F: Fill> Worker<F> {
    /// Run the plan over `conn`.
    ///
    /// With no connection the plan is left untouched. The running count is
    /// decremented however the worker ends.
    pub async fn run<S>(mut self, conn: Option<S>) -> WorkerOutcome<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let _running = self.counters.worker_guard();

        let Some(conn) = conn else {
            return WorkerOutcome {
                plan: self.plan,
                error: None,
                conn: None,
            };
        };

        let mut stream = BufReader::new(conn);
        let error = self.drive(&mut stream).await.err();

        let client = self.plan.client;
        match &error {
            Some(e) => debug!(
                client,
                error = %e,
                completed = self.plan.completed(),
                "Worker stopped"
            ),
            None => debug!(client, requests = self.plan.requests(), "Worker finished"),
        }

        WorkerOutcome {
            plan: self.plan,
            error,
            conn: Some(stream.into_inner()),
        }
    }

    async fn drive<S>(&mut self, stream: &mut BufReader<S>) -> Result<(), BenchError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(BUFFER_SIZE);
        let mut decoder = Decoder::new();
        let requests = self.plan.requests();
        let mut done = 0;

        while done < requests {
            let batch = self.pipeline.min(requests - done);

            buf.clear();
            for _ in 0..batch {
                self.fill.fill(&mut buf);
            }

            let start = Instant::now();
            stream.write_all(&buf).await?;
            stream.flush().await?;
            decoder.consume(stream, batch).await?;
            let elapsed = start.elapsed();

            let per_request =
                Duration::from_nanos((elapsed.as_nanos() / batch as u128) as u64);
            for slot in &mut self.plan.latencies[done..done + batch] {
                *slot = Some(per_request);
            }

            self.counters
                .record_batch(buf.len(), batch, elapsed, self.started.elapsed());
            trace!(client = self.plan.client, batch, ?elapsed, "Batch complete");

            done += batch;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::append_command;
    use std::io;

    const PING: &[u8] = b"*1\r\n$4\r\nPING\r\n";

    fn worker(requests: usize, pipeline: usize) -> (Worker<impl Fill>, Arc<SharedCounters>) {
        let counters = SharedCounters::new(1);
        let plan = ClientPlan::split(requests, 1).remove(0);
        let fill = |buf: &mut BytesMut| append_command(buf, &["PING"]);
        let worker = Worker {
            plan,
            pipeline,
            fill: Arc::new(fill),
            counters: Arc::clone(&counters),
            started: Instant::now(),
        };
        (worker, counters)
    }

    #[tokio::test]
    async fn test_pipelined_batches() {
        let (worker, counters) = worker(3, 2);
        let conn = tokio_test::io::Builder::new()
            .write(&[PING, PING].concat())
            .read(b"+PONG\r\n+PONG\r\n")
            .write(PING)
            .read(b"+PONG\r\n")
            .build();

        let outcome = worker.run(Some(conn)).await;
        assert!(outcome.error.is_none());
        assert!(outcome.conn.is_some());
        assert_eq!(outcome.plan.completed(), 3);
        // Both requests of the first batch share its time
        assert_eq!(outcome.plan.latencies[0], outcome.plan.latencies[1]);

        let snap = counters.snapshot();
        assert_eq!(snap.completed, 3);
        assert_eq!(snap.payload_bytes, 3 * PING.len() as u64);
        assert_eq!(snap.running, 0);
    }

    #[tokio::test]
    async fn test_protocol_error_keeps_partial_latencies() {
        let (worker, counters) = worker(3, 1);
        let conn = tokio_test::io::Builder::new()
            .write(PING)
            .read(b"+PONG\r\n")
            .write(PING)
            .read(b"!bad\r\n")
            .build();

        let outcome = worker.run(Some(conn)).await;
        assert!(matches!(outcome.error, Some(BenchError::Protocol(_))));
        assert!(outcome.plan.latencies[0].is_some());
        assert_eq!(outcome.plan.latencies[1..], [None, None]);

        let snap = counters.snapshot();
        assert_eq!(snap.completed, 1);
        assert_eq!(snap.running, 0);
    }

    #[tokio::test]
    async fn test_write_error_stops_worker() {
        let (worker, counters) = worker(2, 2);
        let conn = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
            .build();

        let outcome = worker.run(Some(conn)).await;
        assert!(matches!(outcome.error, Some(BenchError::Io(_))));
        assert_eq!(outcome.plan.completed(), 0);
        assert_eq!(counters.snapshot().completed, 0);
    }

    #[tokio::test]
    async fn test_error_replies_count_as_completed() {
        let (worker, counters) = worker(2, 2);
        let conn = tokio_test::io::Builder::new()
            .write(&[PING, PING].concat())
            .read(b"-ERR unknown command\r\n$-1\r\n")
            .build();

        let outcome = worker.run(Some(conn)).await;
        assert!(outcome.error.is_none());
        assert_eq!(counters.snapshot().completed, 2);
    }

    #[tokio::test]
    async fn test_missing_connection() {
        let (worker, counters) = worker(5, 2);
        let outcome = worker.run::<tokio_test::io::Mock>(None).await;

        assert!(outcome.error.is_none());
        assert!(outcome.conn.is_none());
        assert_eq!(outcome.plan.requests(), 5);
        assert_eq!(outcome.plan.completed(), 0);
        assert_eq!(counters.snapshot().running, 0);
    }
}
