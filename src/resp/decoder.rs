//! RESP reply decoder.
//!
//! The benchmark only needs to know that a well-formed reply arrived, so the
//! decoder validates framing and throws payload bytes away. Bulk payloads are
//! skipped by length and never copied into memory.
//!
//! Nested arrays are walked without recursion: an array header of `M`
//! elements simply adds `M` to the number of replies still owed, so a
//! hostile server cannot grow the stack by nesting deeply.

use crate::error::BenchError;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest header or status line accepted before the reply is rejected
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reply decoder with a reusable line buffer.
#[derive(Debug, Default)]
pub struct Decoder {
    line: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            line: Vec::with_capacity(128),
        }
    }

    /// Consume exactly `count` complete replies from `reader`.
    ///
    /// Error replies (`-ERR ...`) are part of the payload and count as
    /// complete replies. Bytes consumed before a failure are not unread.
    pub async fn consume<R>(&mut self, reader: &mut R, count: usize) -> Result<(), BenchError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut owed = count as u64;

        while owed > 0 {
            owed -= 1;
            self.read_line(reader).await?;

            match self.line[0] {
                b'+' | b':' | b'-' => {}
                b'$' => {
                    let len = parse_length(self.body())?;
                    // Negative length is a null bulk string with no payload
                    if len >= 0 {
                        skip(reader, len as u64 + 2).await?;
                    }
                }
                b'*' => {
                    let len = parse_length(self.body())?;
                    if len > 0 {
                        owed = owed
                            .checked_add(len as u64)
                            .ok_or_else(|| BenchError::protocol("array length overflow"))?;
                    }
                }
                _ => return Err(BenchError::invalid_response()),
            }
        }

        Ok(())
    }

    /// Read one reply and require it to be a simple status (`+OK`).
    ///
    /// An error reply is surfaced with its message.
    pub async fn expect_ok<R>(&mut self, reader: &mut R) -> Result<(), BenchError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.read_line(reader).await?;
        let text = String::from_utf8_lossy(self.body()).into_owned();

        match self.line[0] {
            b'+' => Ok(()),
            b'-' => Err(BenchError::Protocol(text)),
            _ => Err(BenchError::protocol(format!(
                "unexpected reply: {}{}",
                self.line[0] as char, text
            ))),
        }
    }

    /// Read one terminated line into the line buffer
    async fn read_line<R>(&mut self, reader: &mut R) -> Result<(), BenchError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.line.clear();
        let n = (&mut *reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut self.line)
            .await?;

        if n == 0 {
            return Err(unexpected_eof());
        }
        if self.line.last() != Some(&b'\n') {
            if self.line.len() >= MAX_LINE_LENGTH {
                return Err(BenchError::protocol("reply line too long"));
            }
            return Err(unexpected_eof());
        }
        Ok(())
    }

    /// Current line without its type marker and terminator
    fn body(&self) -> &[u8] {
        let line = &self.line[1.min(self.line.len())..];
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    }
}

fn parse_length(digits: &[u8]) -> Result<i64, BenchError> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            BenchError::protocol(format!(
                "invalid length: {}",
                String::from_utf8_lossy(digits)
            ))
        })
}

/// Discard exactly `n` bytes from the reader
async fn skip<R>(reader: &mut R, n: u64) -> Result<(), BenchError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = (&mut *reader).take(n);
    let skipped = tokio::io::copy_buf(&mut limited, &mut tokio::io::sink()).await?;
    if skipped < n {
        return Err(unexpected_eof());
    }
    Ok(())
}

fn unexpected_eof() -> BenchError {
    BenchError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed mid-reply",
    ))
}
