//! Request payload callbacks.

use bytes::BytesMut;

/// Appends exactly one encoded command to a buffer.
///
/// Called once per pipelined request, concurrently from every worker. The
/// buffer belongs to the caller and must not be retained.
pub trait Fill: Send + Sync + 'static {
    fn fill(&self, buf: &mut BytesMut);
}

impl<F> Fill for F
where
    F: Fn(&mut BytesMut) + Send + Sync + 'static,
{
    fn fill(&self, buf: &mut BytesMut) {
        self(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::append_command;

    #[test]
    fn test_closure_fill() {
        let fill = |buf: &mut BytesMut| append_command(buf, &["PING"]);
        let mut buf = BytesMut::new();
        Fill::fill(&fill, &mut buf);
        Fill::fill(&fill, &mut buf);
        assert_eq!(&buf[..], b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n");
    }
}
