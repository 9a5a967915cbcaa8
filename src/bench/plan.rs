//! Per-connection request plans.

use std::time::Duration;

/// Work assigned to one connection.
///
/// Every request has a latency slot. A slot stays `None` until its batch
/// completes, so requests cut short by a connection failure are never
/// confused with zero-latency requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPlan {
    /// Connection index
    pub client: usize,
    /// Latency of each assigned request
    pub latencies: Vec<Option<Duration>>,
}

impl ClientPlan {
    fn new(client: usize, requests: usize) -> Self {
        Self {
            client,
            latencies: vec![None; requests],
        }
    }

    /// Split `total` requests across `clients` connections.
    ///
    /// Every connection gets `total / clients`; the remainder goes entirely
    /// to the last one.
    pub fn split(total: usize, clients: usize) -> Vec<ClientPlan> {
        if clients == 0 {
            return Vec::new();
        }
        let per_client = total / clients;
        let extra = total % clients;

        (0..clients)
            .map(|client| {
                let requests = if client == clients - 1 {
                    per_client + extra
                } else {
                    per_client
                };
                ClientPlan::new(client, requests)
            })
            .collect()
    }

    /// Number of requests assigned to this connection
    pub fn requests(&self) -> usize {
        self.latencies.len()
    }

    /// Number of requests that completed
    pub fn completed(&self) -> usize {
        self.latencies.iter().filter(|l| l.is_some()).count()
    }
}
