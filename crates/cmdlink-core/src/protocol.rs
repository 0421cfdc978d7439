//! Cmdlink wire protocol.
//!
//! The link below this layer delivers whole, already de-framed byte frames.
//! Three kinds of frame cross it:
//!
//! ## Size Announcement (peer → receiver)
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────┐
//! │        Total size        │   (ignored extras)   │
//! │  4 bytes, little-endian  │                      │
//! └──────────────────────────┴──────────────────────┘
//! ```
//!
//! ## Chunk (peer → receiver)
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────┐
//! │         Payload          │       CRC-32         │
//! │      (n - 4 bytes)       │ 4 bytes, little-end. │
//! └──────────────────────────┴──────────────────────┘
//! ```
//!
//! ## Control Reply (receiver → peer)
//!
//! Raw ASCII with no terminator: `SIZE_ACK`, `ACK` or `ERR`.

use std::fmt;

use crate::checksum::{self, CHECKSUM_LEN};
use crate::error::{Error, Result};

/// Length of the size field at the start of a size announcement.
pub const SIZE_FIELD_LEN: usize = 4;

/// Control replies sent by the receiving session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Buffer allocated, start streaming chunks
    SizeAck,
    /// Chunk accepted, send the next one
    Ack,
    /// Chunk rejected, restart from the beginning
    Err,
}

impl Reply {
    /// Wire representation of the reply.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::SizeAck => b"SIZE_ACK",
            Self::Ack => b"ACK",
            Self::Err => b"ERR",
        }
    }

    /// Parse a reply frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] if the frame is not a known reply.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        match frame {
            b"SIZE_ACK" => Ok(Self::SizeAck),
            b"ACK" => Ok(Self::Ack),
            b"ERR" => Ok(Self::Err),
            other => Err(Error::UnexpectedReply(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SizeAck => "SIZE_ACK",
            Self::Ack => "ACK",
            Self::Err => "ERR",
        })
    }
}

/// Decode the total transfer size from a size announcement.
///
/// Returns `None` for frames shorter than [`SIZE_FIELD_LEN`]; bytes past the
/// size field are ignored.
#[must_use]
pub fn decode_size(frame: &[u8]) -> Option<usize> {
    let field: [u8; SIZE_FIELD_LEN] = frame.get(..SIZE_FIELD_LEN)?.try_into().ok()?;
    usize::try_from(u32::from_le_bytes(field)).ok()
}

/// Encode a size announcement.
///
/// # Errors
///
/// Returns an error if `size` does not fit the 32-bit size field.
pub fn encode_size_frame(size: usize) -> Result<[u8; SIZE_FIELD_LEN]> {
    let size = u32::try_from(size).map_err(|_| Error::TransferTooLarge {
        size,
        limit: u32::MAX as usize,
    })?;
    Ok(size.to_le_bytes())
}

/// Build a chunk frame: the payload followed by its little-endian CRC-32.
#[must_use]
pub fn encode_chunk_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&checksum::checksum(payload).to_le_bytes());
    frame
}

/// Split a chunk frame into its payload and trailing checksum.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`] if the frame is shorter than the
/// checksum trailer.
pub fn split_chunk_frame(frame: &[u8]) -> Result<(&[u8], u32)> {
    if frame.len() < CHECKSUM_LEN {
        return Err(Error::MalformedFrame(format!(
            "chunk of {} bytes is shorter than its {CHECKSUM_LEN}-byte checksum",
            frame.len()
        )));
    }

    let (payload, trailer) = frame.split_at(frame.len() - CHECKSUM_LEN);
    let mut crc = [0u8; CHECKSUM_LEN];
    crc.copy_from_slice(trailer);
    Ok((payload, u32::from_le_bytes(crc)))
}
