//! Connection establishment.

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::trace;

/// Opens the connection for one benchmark client.
pub trait Connect {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open the connection for client number `client`
    fn connect(&self, client: usize) -> impl Future<Output = io::Result<Self::Stream>> + Send;

    /// Address reported in connection errors
    fn addr(&self) -> &str;
}

/// Plain TCP connector for a `host:port` target
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new<S: Into<String>>(addr: S) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, client: usize) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await?;
        // Small pipelined writes must not wait on Nagle
        stream.set_nodelay(true)?;
        trace!(client, addr = %self.addr, "Connected");
        Ok(stream)
    }

    fn addr(&self) -> &str {
        &self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let connector = TcpConnector::new(addr.clone());
        let stream = connector.connect(0).await.unwrap();
        assert!(stream.nodelay().unwrap());
        assert_eq!(connector.addr(), addr);
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(TcpConnector::new(addr).connect(0).await.is_err());
    }
}
