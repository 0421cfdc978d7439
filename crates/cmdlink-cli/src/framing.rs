//! COBS framing for byte-stream links.
//!
//! The core protocol assumes a link that delivers whole frames. Over a raw
//! byte stream (TCP, a serial port, an RFCOMM channel) frames are delimited
//! with Consistent Overhead Byte Stuffing: each frame is COBS-encoded so it
//! contains no zero bytes, then terminated with a single `0x00`.
//!
//! [`CobsCodec`] plugs this into [`tokio_util::codec::Framed`].

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Frame delimiter on the wire.
pub const DELIMITER: u8 = 0x00;

/// Default ceiling for a decoded frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Errors raised while framing.
#[derive(Error, Debug)]
pub enum FramingError {
    /// Encoded data violates COBS
    #[error("invalid COBS frame: {0}")]
    Invalid(&'static str),

    /// No delimiter within the allowed frame length
    #[error("frame exceeds {0} bytes")]
    TooLong(usize),

    /// Underlying stream error
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// COBS-encode `input` into `dst` (without the trailing delimiter).
pub fn encode(input: &[u8], dst: &mut BytesMut) {
    dst.reserve(input.len() + input.len() / 254 + 2);

    let mut code_idx = dst.len();
    dst.put_u8(0);
    let mut code: u8 = 1;

    for &byte in input {
        if byte == 0 {
            dst[code_idx] = code;
            code_idx = dst.len();
            dst.put_u8(0);
            code = 1;
        } else {
            dst.put_u8(byte);
            code += 1;
            if code == 0xFF {
                dst[code_idx] = code;
                code_idx = dst.len();
                dst.put_u8(0);
                code = 1;
            }
        }
    }

    dst[code_idx] = code;
}

/// Decode one COBS block (delimiter already stripped).
pub fn decode(input: &[u8]) -> Result<Vec<u8>, FramingError> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let code = usize::from(input[i]);
        if code == 0 {
            return Err(FramingError::Invalid("zero byte inside frame"));
        }
        i += 1;

        let end = i + code - 1;
        let block = input
            .get(i..end)
            .ok_or(FramingError::Invalid("block runs past end of frame"))?;
        out.extend_from_slice(block);
        i = end;

        if code < 0xFF && i < input.len() {
            out.push(0);
        }
    }

    Ok(out)
}

/// Tokio codec for zero-delimited COBS frames.
#[derive(Debug, Clone)]
pub struct CobsCodec {
    max_frame_len: usize,
    /// Bytes of `src` already scanned for a delimiter
    scanned: usize,
}

impl Default for CobsCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CobsCodec {
    /// Create a codec with the default frame ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a codec that rejects decoded frames larger than `max`.
    #[must_use]
    pub fn with_max_frame_len(max: usize) -> Self {
        Self {
            max_frame_len: max,
            scanned: 0,
        }
    }

    /// Longest encoded frame that can decode to `max_frame_len` bytes.
    fn max_encoded_len(&self) -> usize {
        self.max_frame_len + self.max_frame_len / 254 + 1
    }
}

impl Decoder for CobsCodec {
    type Item = Vec<u8>;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src[self.scanned..].iter().position(|&b| b == DELIMITER) else {
                self.scanned = src.len();
                if src.len() > self.max_encoded_len() {
                    return Err(FramingError::TooLong(self.max_frame_len));
                }
                return Ok(None);
            };

            let end = self.scanned + pos;
            self.scanned = 0;
            let encoded = src.split_to(end);
            src.advance(1);

            // Back-to-back delimiters carry no frame
            if encoded.is_empty() {
                continue;
            }
            if encoded.len() > self.max_encoded_len() {
                return Err(FramingError::TooLong(self.max_frame_len));
            }

            return decode(&encoded).map(Some);
        }
    }
}

impl Encoder<Vec<u8>> for CobsCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_len {
            return Err(FramingError::TooLong(self.max_frame_len));
        }
        encode(&item, dst);
        dst.put_u8(DELIMITER);
        Ok(())
    }
}
