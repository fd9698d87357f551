//! Binary event-stream framing.
//!
//! Frame layout (all integers big-endian):
//!
//! ```text
//! +------------+-------------+-------------+---------+------+-------------+
//! | total len  | headers len | prelude crc | headers | body | message crc |
//! | u32        | u32         | u32         |         |      | u32         |
//! +------------+-------------+-------------+---------+------+-------------+
//! ```
//!
//! The prelude CRC covers the first eight bytes; the message CRC covers
//! everything before it. Headers are `name-len u8, name, value-type u8,
//! value-len u16, value` tuples.

use super::headers::{
    Header, HeaderValue, CONTENT_TYPE_OCTET_STREAM, EVENT_TYPE_AUDIO, HEADER_CONTENT_TYPE,
    HEADER_EVENT_TYPE, HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT, TYPE_BYTE_ARRAY, TYPE_STRING,
};
use thiserror::Error;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("declared length {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("prelude checksum mismatch")]
    PreludeChecksum,

    #[error("message checksum mismatch")]
    MessageChecksum,

    #[error("header block overruns its declared length")]
    HeaderOverrun,

    #[error("unsupported header value type {0}")]
    UnsupportedHeaderType(u8),

    #[error("header name is not valid UTF-8")]
    InvalidHeaderName,
}

/// A framed message: typed headers plus a binary body.
#[derive(Debug, Clone)]
pub struct WireFrame {
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl WireFrame {
    pub fn new(headers: Vec<Header>, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Outbound audio frame: PCM16 body with the standard event headers.
    pub fn audio_event(pcm: Vec<u8>) -> Self {
        Self::new(
            vec![
                Header::string(HEADER_MESSAGE_TYPE, MESSAGE_TYPE_EVENT),
                Header::string(HEADER_EVENT_TYPE, EVENT_TYPE_AUDIO),
                Header::string(HEADER_CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM),
            ],
            pcm,
        )
    }

    /// First string header with the given name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .and_then(|h| h.value.as_str())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut header_bytes = Vec::new();
        for header in &self.headers {
            header_bytes.push(header.name.len() as u8);
            header_bytes.extend_from_slice(header.name.as_bytes());
            match &header.value {
                HeaderValue::String(s) => {
                    header_bytes.push(TYPE_STRING);
                    header_bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
                    header_bytes.extend_from_slice(s.as_bytes());
                }
                HeaderValue::Bytes(b) => {
                    header_bytes.push(TYPE_BYTE_ARRAY);
                    header_bytes.extend_from_slice(&(b.len() as u16).to_be_bytes());
                    header_bytes.extend_from_slice(b);
                }
            }
        }

        let total_len = PRELUDE_LEN + header_bytes.len() + self.body.len() + CRC_LEN;
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&(total_len as u32).to_be_bytes());
        out.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
        let prelude_crc = crc32fast::hash(&out[..8]);
        out.extend_from_slice(&prelude_crc.to_be_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&self.body);
        let message_crc = crc32fast::hash(&out);
        out.extend_from_slice(&message_crc.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < PRELUDE_LEN + CRC_LEN {
            return Err(FrameError::Truncated {
                needed: PRELUDE_LEN + CRC_LEN,
                have: buf.len(),
            });
        }

        let total_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let headers_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        let prelude_crc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        if crc32fast::hash(&buf[..8]) != prelude_crc {
            return Err(FrameError::PreludeChecksum);
        }
        if total_len != buf.len() {
            return Err(FrameError::LengthMismatch {
                declared: total_len,
                actual: buf.len(),
            });
        }
        if PRELUDE_LEN + headers_len + CRC_LEN > total_len {
            return Err(FrameError::HeaderOverrun);
        }

        let message_crc = u32::from_be_bytes([
            buf[total_len - 4],
            buf[total_len - 3],
            buf[total_len - 2],
            buf[total_len - 1],
        ]);
        if crc32fast::hash(&buf[..total_len - 4]) != message_crc {
            return Err(FrameError::MessageChecksum);
        }

        let headers = parse_headers(&buf[PRELUDE_LEN..PRELUDE_LEN + headers_len])?;
        let body = buf[PRELUDE_LEN + headers_len..total_len - CRC_LEN].to_vec();

        Ok(Self { headers, body })
    }
}

fn parse_headers(mut buf: &[u8]) -> Result<Vec<Header>, FrameError> {
    let mut headers = Vec::new();

    while !buf.is_empty() {
        let name_len = buf[0] as usize;
        if buf.len() < 1 + name_len + 1 {
            return Err(FrameError::HeaderOverrun);
        }
        let name = std::str::from_utf8(&buf[1..1 + name_len])
            .map_err(|_| FrameError::InvalidHeaderName)?
            .to_string();
        let value_type = buf[1 + name_len];
        buf = &buf[1 + name_len + 1..];

        let value = match value_type {
            TYPE_STRING | TYPE_BYTE_ARRAY => {
                if buf.len() < 2 {
                    return Err(FrameError::HeaderOverrun);
                }
                let value_len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
                if buf.len() < 2 + value_len {
                    return Err(FrameError::HeaderOverrun);
                }
                let raw = &buf[2..2 + value_len];
                buf = &buf[2 + value_len..];
                if value_type == TYPE_STRING {
                    HeaderValue::String(
                        std::str::from_utf8(raw)
                            .map_err(|_| FrameError::InvalidHeaderName)?
                            .to_string(),
                    )
                } else {
                    HeaderValue::Bytes(raw.to_vec())
                }
            }
            other => return Err(FrameError::UnsupportedHeaderType(other)),
        };

        headers.push(Header { name, value });
    }

    Ok(headers)
}
