//! Built-in benchmark tests.
//!
//! Each test is a `Fill` implementation producing one command per call.
//! Keys cycle through the configured keyspace so that runs with a keyspace
//! touch many keys; with no keyspace every request hits the same key.

use crate::fill::Fill;
use crate::resp::append_command;
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};

/// Keys written by one MSET request
const MSET_KEYS: usize = 10;

/// Commands the built-in tests can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Set,
    Get,
    Incr,
    Lpush,
    Rpush,
    Lpop,
    Rpop,
    Sadd,
    Hset,
    Spop,
    Mset,
}

impl Command {
    /// Every built-in test, in the order they run by default
    pub const ALL: [Command; 12] = [
        Command::Ping,
        Command::Set,
        Command::Get,
        Command::Incr,
        Command::Lpush,
        Command::Rpush,
        Command::Lpop,
        Command::Rpop,
        Command::Sadd,
        Command::Hset,
        Command::Spop,
        Command::Mset,
    ];

    /// Name used on the command line and in reports
    pub fn name(self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Set => "SET",
            Command::Get => "GET",
            Command::Incr => "INCR",
            Command::Lpush => "LPUSH",
            Command::Rpush => "RPUSH",
            Command::Lpop => "LPOP",
            Command::Rpop => "RPOP",
            Command::Sadd => "SADD",
            Command::Hset => "HSET",
            Command::Spop => "SPOP",
            Command::Mset => "MSET (10 keys)",
        }
    }

    /// Look a test up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Command> {
        let name = name.trim();
        Command::ALL.into_iter().find(|cmd| {
            cmd.name()
                .split_whitespace()
                .next()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Build the fill callback for this test
    pub fn filler(self, data_size: usize, keyspace: u64) -> CommandFill {
        CommandFill {
            command: self,
            value: vec![b'x'; data_size],
            keyspace,
            counter: AtomicU64::new(0),
        }
    }
}

/// Fill callback for a built-in test
#[derive(Debug)]
pub struct CommandFill {
    command: Command,
    value: Vec<u8>,
    keyspace: u64,
    counter: AtomicU64,
}

impl CommandFill {
    fn next_key(&self, prefix: &str) -> String {
        let n = if self.keyspace > 0 {
            self.counter.fetch_add(1, Ordering::Relaxed) % self.keyspace
        } else {
            0
        };
        format!("{}:{:012}", prefix, n)
    }
}

impl Fill for CommandFill {
    fn fill(&self, buf: &mut BytesMut) {
        let value = self.value.as_slice();

        match self.command {
            Command::Ping => append_command(buf, &["PING"]),
            Command::Set => {
                let key = self.next_key("key");
                append_command(buf, &[&b"SET"[..], key.as_bytes(), value]);
            }
            Command::Get => {
                let key = self.next_key("key");
                append_command(buf, &["GET", key.as_str()]);
            }
            Command::Incr => {
                let key = self.next_key("counter");
                append_command(buf, &["INCR", key.as_str()]);
            }
            Command::Lpush => append_command(buf, &[&b"LPUSH"[..], &b"mylist"[..], value]),
            Command::Rpush => append_command(buf, &[&b"RPUSH"[..], &b"mylist"[..], value]),
            Command::Lpop => append_command(buf, &["LPOP", "mylist"]),
            Command::Rpop => append_command(buf, &["RPOP", "mylist"]),
            Command::Sadd => {
                let member = self.next_key("element");
                append_command(buf, &["SADD", "myset", member.as_str()]);
            }
            Command::Hset => {
                let field = self.next_key("element");
                append_command(buf, &[&b"HSET"[..], &b"myhash"[..], field.as_bytes(), value]);
            }
            Command::Spop => append_command(buf, &["SPOP", "myset"]),
            Command::Mset => {
                let keys: Vec<String> = (0..MSET_KEYS).map(|_| self.next_key("key")).collect();
                let mut args: Vec<&[u8]> = Vec::with_capacity(1 + 2 * MSET_KEYS);
                args.push(b"MSET");
                for key in &keys {
                    args.push(key.as_bytes());
                    args.push(value);
                }
                append_command(buf, &args);
            }
        }
    }
}
