//! RESP command encoder.
//!
//! Commands are always sent as an array of bulk strings:
//! `*<argc>\r\n` followed by `$<len>\r\n<arg>\r\n` per argument.

use bytes::BytesMut;

/// Append one command to an existing buffer
pub fn append_command<A: AsRef<[u8]>>(buf: &mut BytesMut, args: &[A]) {
    buf.extend_from_slice(b"*");
    buf.extend_from_slice(args.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        buf.extend_from_slice(b"$");
        buf.extend_from_slice(arg.len().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
}

/// Encode one command into a fresh buffer
pub fn encode_command<A: AsRef<[u8]>>(args: &[A]) -> BytesMut {
    let mut buf = BytesMut::new();
    append_command(&mut buf, args);
    buf
}
