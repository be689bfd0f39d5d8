// src/core/protocol/resp_frame.rs

//! Implements the RESP reply frame and the codec used to write replies to clients and
//! to read replies coming back from backend nodes.

use crate::core::ProxyError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The CRLF (Carriage Return, Line Feed) sequence used to terminate lines in RESP.
pub(crate) const CRLF: &[u8] = b"\r\n";
pub(crate) const CRLF_LEN: usize = 2;

// Protocol-level limits to prevent denial-of-service attacks.
pub(crate) const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024; // Max elements in an array.
pub(crate) const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024; // 512MB max bulk string size.
const MAX_RECURSION_DEPTH: usize = 256; // Limit recursion to prevent stack overflow.

/// A single reply frame in the RESP protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// The fixed `+OK` acknowledgement.
    pub fn ok() -> Self {
        RespFrame::SimpleString("OK".into())
    }

    /// Builds an error reply from a proxy error.
    pub fn error(err: &ProxyError) -> Self {
        RespFrame::Error(err.to_string())
    }

    /// True for `-ERR ...` style replies.
    pub fn is_error(&self) -> bool {
        matches!(self, RespFrame::Error(_))
    }

    /// A convenience method to encode a frame into a `Vec<u8>`.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, ProxyError> {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// A `tokio_util::codec` implementation for encoding and decoding `RespFrame`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = ProxyError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut int_buf = itoa::Buffer::new();
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Error(s) => {
                dst.extend_from_slice(b"-");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                dst.extend_from_slice(b":");
                dst.extend_from_slice(int_buf.format(i).as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BulkString(b) => {
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(int_buf.format(b.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => {
                dst.extend_from_slice(b"$-1\r\n");
            }
            RespFrame::NullArray => {
                dst.extend_from_slice(b"*-1\r\n");
            }
            RespFrame::Array(arr) => {
                dst.extend_from_slice(b"*");
                dst.extend_from_slice(int_buf.format(arr.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                for frame in arr {
                    self.encode(frame, dst)?;
                }
            }
        }
        Ok(())
    }
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = ProxyError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut bytes = &src[..];
        match self.decode_recursive(&mut bytes, 0) {
            Ok(frame) => {
                let len = src.len() - bytes.len();
                src.advance(len);
                Ok(Some(frame))
            }
            // `IncompleteData` means we need more bytes before a full frame is available.
            Err(ProxyError::IncompleteData) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl RespFrameCodec {
    fn decode_recursive(&self, bytes: &mut &[u8], depth: usize) -> Result<RespFrame, ProxyError> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(ProxyError::Framing(
                "reply nesting depth limit exceeded".to_string(),
            ));
        }

        if bytes.is_empty() {
            return Err(ProxyError::IncompleteData);
        }

        match bytes[0] {
            b'+' => self.parse_simple_string(bytes),
            b'-' => self.parse_error(bytes),
            b':' => self.parse_integer(bytes),
            b'$' => self.parse_bulk_string(bytes),
            b'*' => self.parse_array(bytes, depth),
            other => Err(ProxyError::Framing(format!(
                "unexpected reply type byte '{}'",
                other.escape_ascii()
            ))),
        }
    }

    /// Finds the next CRLF and returns the line, advancing past it.
    fn parse_line<'a>(&self, bytes: &mut &'a [u8]) -> Result<&'a [u8], ProxyError> {
        if let Some(pos) = find_crlf(bytes) {
            let line = &bytes[..pos];
            *bytes = &bytes[pos + CRLF_LEN..];
            Ok(line)
        } else {
            Err(ProxyError::IncompleteData)
        }
    }

    fn parse_simple_string(&self, bytes: &mut &[u8]) -> Result<RespFrame, ProxyError> {
        *bytes = &bytes[1..];
        let line = self.parse_line(bytes)?;
        Ok(RespFrame::SimpleString(
            String::from_utf8_lossy(line).to_string(),
        ))
    }

    fn parse_error(&self, bytes: &mut &[u8]) -> Result<RespFrame, ProxyError> {
        *bytes = &bytes[1..];
        let line = self.parse_line(bytes)?;
        Ok(RespFrame::Error(String::from_utf8_lossy(line).to_string()))
    }

    fn parse_integer(&self, bytes: &mut &[u8]) -> Result<RespFrame, ProxyError> {
        *bytes = &bytes[1..];
        let line = self.parse_line(bytes)?;
        let i = parse_signed(line)?;
        Ok(RespFrame::Integer(i))
    }

    fn parse_bulk_string(&self, bytes: &mut &[u8]) -> Result<RespFrame, ProxyError> {
        *bytes = &bytes[1..];
        let line = self.parse_line(bytes)?;
        let str_len = parse_signed(line)?;

        if str_len == -1 {
            return Ok(RespFrame::Null);
        }
        if str_len < 0 || str_len as usize > MAX_BULK_STRING_SIZE {
            return Err(ProxyError::Framing(format!("invalid bulk length {str_len}")));
        }

        let str_len = str_len as usize;
        if bytes.len() < str_len + CRLF_LEN {
            return Err(ProxyError::IncompleteData);
        }
        if &bytes[str_len..str_len + CRLF_LEN] != CRLF {
            return Err(ProxyError::Framing(
                "bulk payload is not terminated by CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&bytes[..str_len]);
        *bytes = &bytes[str_len + CRLF_LEN..];
        Ok(RespFrame::BulkString(data))
    }

    fn parse_array(&self, bytes: &mut &[u8], depth: usize) -> Result<RespFrame, ProxyError> {
        *bytes = &bytes[1..];
        let line = self.parse_line(bytes)?;
        let arr_len = parse_signed(line)?;

        if arr_len == -1 {
            return Ok(RespFrame::NullArray);
        }
        if arr_len < 0 || arr_len as usize > MAX_FRAME_ELEMENTS {
            return Err(ProxyError::Framing(format!("invalid array length {arr_len}")));
        }

        let arr_len = arr_len as usize;
        let mut frames = Vec::with_capacity(arr_len.min(1024));
        for _ in 0..arr_len {
            frames.push(self.decode_recursive(bytes, depth + 1)?);
        }
        Ok(RespFrame::Array(frames))
    }
}

fn parse_signed(line: &[u8]) -> Result<i64, ProxyError> {
    std::str::from_utf8(line)
        .map_err(|_| ProxyError::Framing("length is not valid UTF-8".to_string()))?
        .parse::<i64>()
        .map_err(|_| {
            ProxyError::Framing(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(line)
            ))
        })
}

/// Helper function to find the next CRLF sequence in a buffer.
pub(crate) fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(CRLF_LEN).position(|window| window == CRLF)
}
