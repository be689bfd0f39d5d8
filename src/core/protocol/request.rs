// src/core/protocol/request.rs

//! The client-facing request framing: `*<argc>\r\n` followed by `argc` bulk arguments.
//!
//! `RequestCodec` decodes requests from clients and encodes `RespFrame` replies back to
//! them, so a single `Framed` value drives a whole client connection. A malformed frame
//! is surfaced as [`Incoming::Malformed`] rather than a decoder error: the stream keeps
//! going and only genuine I/O failures end it.

use super::resp_frame::{
    CRLF, CRLF_LEN, MAX_BULK_STRING_SIZE, MAX_FRAME_ELEMENTS, RespFrame, RespFrameCodec,
};
use crate::core::ProxyError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound for a single header line (`*<n>` or `$<n>`), CRLF included.
const MAX_HEADER_LINE: usize = 64 * 1024;

/// One parsed client request: the command name followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    parts: Vec<Bytes>,
    name: String,
}

impl Request {
    pub fn new(parts: Vec<Bytes>) -> Self {
        let name = parts
            .first()
            .map(|n| String::from_utf8_lossy(n).to_ascii_uppercase())
            .unwrap_or_default();
        Self { parts, name }
    }

    /// Builds a request from anything convertible into `Bytes`, e.g. `["GET", "key"]`.
    pub fn from_parts<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self::new(parts.into_iter().map(Into::into).collect())
    }

    /// The uppercased command name, or an empty string for an empty request.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of elements including the command name.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[Bytes] {
        self.parts.get(1..).unwrap_or(&[])
    }

    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Writes the request in wire framing. Argument lengths are byte lengths.
    pub fn encode(&self, dst: &mut BytesMut) {
        let mut int_buf = itoa::Buffer::new();
        let payload: usize = self.parts.iter().map(|p| p.len() + 16).sum();
        dst.reserve(payload + 16);
        dst.extend_from_slice(b"*");
        dst.extend_from_slice(int_buf.format(self.parts.len()).as_bytes());
        dst.extend_from_slice(CRLF);
        for part in &self.parts {
            dst.extend_from_slice(b"$");
            dst.extend_from_slice(int_buf.format(part.len()).as_bytes());
            dst.extend_from_slice(CRLF);
            dst.extend_from_slice(part);
            dst.extend_from_slice(CRLF);
        }
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.to_vec()
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", String::from_utf8_lossy(part))?;
        }
        Ok(())
    }
}

/// What the decoder produced from the inbound byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request(Request),
    /// The bytes up to and including the offending line were discarded.
    Malformed(ProxyError),
}

/// Decodes client requests and encodes replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = Incoming;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut cursor = 0;
        match parse_request(src, &mut cursor) {
            Ok(parts) => {
                src.advance(cursor);
                Ok(Some(Incoming::Request(Request::new(parts))))
            }
            Err(ProxyError::IncompleteData) => Ok(None),
            Err(e) => {
                src.advance(cursor);
                Ok(Some(Incoming::Malformed(e)))
            }
        }
    }
}

impl Encoder<RespFrame> for RequestCodec {
    type Error = ProxyError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        RespFrameCodec.encode(item, dst)
    }
}

/// Parses one full request starting at `cursor`. On success and on framing errors the
/// cursor points past everything that was consumed; on `IncompleteData` it is meaningless.
fn parse_request(src: &[u8], cursor: &mut usize) -> Result<Vec<Bytes>, ProxyError> {
    let count = read_header(src, cursor, b'*')?;
    if count > MAX_FRAME_ELEMENTS {
        return Err(ProxyError::Framing(format!(
            "invalid multibulk length {count}"
        )));
    }

    let mut parts = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let len = read_header(src, cursor, b'$')?;
        if len > MAX_BULK_STRING_SIZE {
            return Err(ProxyError::Framing(format!("invalid bulk length {len}")));
        }

        let start = *cursor;
        let end = start + len;
        if src.len() < end + CRLF_LEN {
            return Err(ProxyError::IncompleteData);
        }
        *cursor = end + CRLF_LEN;
        if &src[end..end + CRLF_LEN] != CRLF {
            return Err(ProxyError::Framing(
                "bulk argument is not terminated by CRLF".to_string(),
            ));
        }
        parts.push(Bytes::copy_from_slice(&src[start..end]));
    }
    Ok(parts)
}

/// Reads a `<sigil><non-negative integer>\r\n` header line.
fn read_header(src: &[u8], cursor: &mut usize, sigil: u8) -> Result<usize, ProxyError> {
    let line = read_line(src, cursor)?;
    match line.first() {
        Some(&b) if b == sigil => {}
        _ => {
            return Err(ProxyError::Framing(format!(
                "expected '{}', got '{}'",
                sigil as char,
                String::from_utf8_lossy(line)
            )));
        }
    }

    let digits = &line[1..];
    std::str::from_utf8(digits)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| {
            ProxyError::Framing(format!(
                "invalid length '{}'",
                String::from_utf8_lossy(digits)
            ))
        })
}

/// Returns the next line without its CRLF and moves the cursor past it.
fn read_line<'a>(src: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], ProxyError> {
    let rest = &src[*cursor..];
    let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
        if rest.len() > MAX_HEADER_LINE {
            *cursor = src.len();
            return Err(ProxyError::Framing("header line too long".to_string()));
        }
        return Err(ProxyError::IncompleteData);
    };

    *cursor += newline + 1;
    match rest[..newline].strip_suffix(b"\r") {
        Some(line) => Ok(line),
        None => Err(ProxyError::Framing(
            "header line is not terminated by CRLF".to_string(),
        )),
    }
}
