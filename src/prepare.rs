//! Per-connection setup run before benchmarking starts.

use crate::resp::{append_command, Decoder};
use bytes::BytesMut;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

/// Accepts or rejects a freshly established connection.
///
/// A rejected connection is closed and its client performs no requests.
pub trait Prepare<S>: Sync {
    fn prepare(&self, conn: &mut S) -> impl Future<Output = bool> + Send;
}

/// Accepts every connection as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrepare;

impl<S: Send> Prepare<S> for NoPrepare {
    async fn prepare(&self, _conn: &mut S) -> bool {
        true
    }
}

/// Authenticates and selects a database on each connection.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub user: Option<String>,
    pub password: Option<String>,
    pub db: Option<u32>,
}

impl Handshake {
    /// Whether the handshake sends anything at all
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.db.is_none()
    }

    /// Commands sent on every new connection, and how many there are
    fn commands(&self) -> (BytesMut, usize) {
        let mut buf = BytesMut::new();
        let mut count = 0;

        if let Some(password) = &self.password {
            match &self.user {
                Some(user) => {
                    append_command(&mut buf, &["AUTH", user.as_str(), password.as_str()])
                }
                None => append_command(&mut buf, &["AUTH", password.as_str()]),
            }
            count += 1;
        }
        if let Some(db) = self.db {
            append_command(&mut buf, &["SELECT".to_string(), db.to_string()]);
            count += 1;
        }

        (buf, count)
    }
}

impl<S> Prepare<S> for Handshake
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn prepare(&self, conn: &mut S) -> bool {
        let (buf, count) = self.commands();
        if count == 0 {
            return true;
        }

        if let Err(e) = conn.write_all(&buf).await {
            warn!(error = %e, "Handshake write failed");
            return false;
        }

        // The server only answers what was sent, so nothing is left buffered
        let mut reader = BufReader::new(conn);
        let mut decoder = Decoder::new();
        for _ in 0..count {
            if let Err(e) = decoder.expect_ok(&mut reader).await {
                warn!(error = %e, "Handshake rejected");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_prepare_accepts() {
        let mut conn = tokio_test::io::Builder::new().build();
        assert!(NoPrepare.prepare(&mut conn).await);
    }

    #[tokio::test]
    async fn test_empty_handshake_sends_nothing() {
        let mut conn = tokio_test::io::Builder::new().build();
        let handshake = Handshake::default();
        assert!(handshake.is_empty());
        assert!(handshake.prepare(&mut conn).await);
    }

    #[tokio::test]
    async fn test_auth_and_select() {
        let mut conn = tokio_test::io::Builder::new()
            .write(b"*2\r\n$4\r\nAUTH\r\n$6\r\nsecret\r\n*2\r\n$6\r\nSELECT\r\n$1\r\n3\r\n")
            .read(b"+OK\r\n+OK\r\n")
            .build();
        let handshake = Handshake {
            user: None,
            password: Some("secret".to_string()),
            db: Some(3),
        };
        assert!(handshake.prepare(&mut conn).await);
    }

    #[tokio::test]
    async fn test_acl_auth_rejected() {
        let mut conn = tokio_test::io::Builder::new()
            .write(b"*3\r\n$4\r\nAUTH\r\n$5\r\nalice\r\n$5\r\nwrong\r\n")
            .read(b"-WRONGPASS invalid username-password pair\r\n")
            .build();
        let handshake = Handshake {
            user: Some("alice".to_string()),
            password: Some("wrong".to_string()),
            db: None,
        };
        assert!(!handshake.prepare(&mut conn).await);
    }
}
