//! redbench: a pipelined load generator for RESP servers
//!
//! Opens many connections to a server speaking the Redis protocol, drives
//! each with pipelined requests and reports throughput and a latency
//! distribution.
//!
//! Features:
//! - Reply decoding that validates framing without buffering payloads
//! - Lock-free progress counters shared by all connections
//! - Pluggable request payloads (`Fill`), connection setup (`Prepare`) and
//!   dialing (`Connect`)
//! - Text, quiet and CSV reports

pub mod bench;
pub mod commands;
pub mod config;
pub mod connect;
pub mod error;
pub mod fill;
pub mod prepare;
pub mod resp;

pub use bench::{Bench, BenchConfig, Summary};
pub use connect::{Connect, TcpConnector};
pub use error::BenchError;
pub use fill::Fill;
pub use prepare::{Handshake, NoPrepare, Prepare};
pub use resp::{append_command, encode_command};
