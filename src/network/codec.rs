//! Line codec for telnet-style clients.
//!
//! Reads `\n`-terminated lines (a trailing `\r` is stripped) and writes lines
//! terminated with `\r\n`. Input is decoded as UTF-8 with invalid sequences
//! replaced.
//!
//! Over-long lines are not fatal: the codec discards bytes until the next
//! newline and reports the line as [`Inbound::TooLong`].

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

/// A decoded unit of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Line(String),
    /// A line exceeded the limit and was dropped. `length` counts the bytes
    /// discarded, terminator included.
    TooLong { length: usize },
}

/// Line-based codec with a maximum line length.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
    /// Bytes thrown away from the current over-long line, if any.
    discarding: Option<usize>,
}

impl LineCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: None,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn text(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }
}

impl Decoder for LineCodec {
    type Item = Inbound;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, TransportError> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();

            // Room for the terminator on top of the content limit
            if src.len() > self.max_len + 2 {
                *self.discarding.get_or_insert(0) += src.len();
                src.clear();
                self.next_index = 0;
            }
            return Ok(None);
        };

        let raw = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if let Some(discarded) = self.discarding.take() {
            return Ok(Some(Inbound::TooLong {
                length: discarded + raw.len(),
            }));
        }

        let line = Self::text(&raw);
        if line.len() > self.max_len {
            return Ok(Some(Inbound::TooLong { length: raw.len() }));
        }
        Ok(Some(Inbound::Line(line)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Inbound>, TransportError> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        self.next_index = 0;
        let rest = src.split_to(src.len());
        if let Some(discarded) = self.discarding.take() {
            return Ok(Some(Inbound::TooLong {
                length: discarded + rest.len(),
            }));
        }
        if rest.is_empty() {
            return Ok(None);
        }
        Ok(Some(Inbound::Line(Self::text(&rest))))
    }
}

impl Encoder<String> for LineCodec {
    type Error = TransportError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), TransportError> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
