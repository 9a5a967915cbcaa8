//! RESP (Redis Serialization Protocol) support for the load generator.
//!
//! Only the two halves a benchmark client needs are implemented:
//! - `encoder`: serialize a command as an array of bulk strings
//! - `decoder`: validate and skip replies without materializing them

pub mod decoder;
pub mod encoder;

pub use decoder::Decoder;
pub use encoder::{append_command, encode_command};
