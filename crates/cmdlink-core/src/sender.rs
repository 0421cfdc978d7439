//! Sending side of the transfer protocol.
//!
//! The sender announces the payload size, then answers every `SIZE_ACK` or
//! `ACK` with the next chunk. An `ERR` means the receiver rewound to offset
//! zero, so the sender starts over from the first chunk, up to a bounded
//! number of times.
//!
//! The sender is transport-agnostic: it produces frames and consumes replies,
//! leaving the actual I/O to the caller.

use crate::checksum::CHECKSUM_LEN;
use crate::error::{Error, Result};
use crate::protocol::{self, Reply};

/// Where the sender is in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Nothing sent yet
    Idle,
    /// Size announced, waiting for `SIZE_ACK`
    AwaitingSizeAck,
    /// Chunk sent, waiting for `ACK` or `ERR`
    AwaitingAck,
    /// Every chunk acknowledged
    Done,
}

/// What the caller should do after a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderStep {
    /// Transmit this frame and wait for the next reply
    Send(Vec<u8>),
    /// The transfer is complete
    Done,
}

/// Drives one payload through the chunked transfer protocol.
#[derive(Debug, Clone)]
pub struct TransferSender {
    data: Vec<u8>,
    chunk_payload: usize,
    /// Start of the next chunk to send
    offset: usize,
    /// Bytes the receiver has acknowledged
    acked: usize,
    retries: u32,
    max_retries: u32,
    state: SenderState,
}

impl TransferSender {
    /// Create a sender for `data`.
    ///
    /// `chunk_size` is the largest frame the link accepts, checksum included.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` leaves no room for payload, or if the
    /// payload is too large for the 32-bit size field.
    pub fn new(data: Vec<u8>, chunk_size: usize, max_retries: u32) -> Result<Self> {
        if chunk_size <= CHECKSUM_LEN {
            return Err(Error::InvalidConfig {
                key: "chunk_size".to_string(),
                reason: format!("must be larger than the {CHECKSUM_LEN}-byte checksum"),
            });
        }
        protocol::encode_size_frame(data.len())?;

        Ok(Self {
            data,
            chunk_payload: chunk_size - CHECKSUM_LEN,
            offset: 0,
            acked: 0,
            retries: 0,
            max_retries,
            state: SenderState::Idle,
        })
    }

    /// Produce the size announcement that opens the exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload length does not fit the size field.
    pub fn start(&mut self) -> Result<Vec<u8>> {
        let frame = protocol::encode_size_frame(self.data.len())?;
        tracing::debug!("announcing {} bytes", self.data.len());
        self.offset = 0;
        self.acked = 0;
        self.state = SenderState::AwaitingSizeAck;
        Ok(frame.to_vec())
    }

    /// Parse a reply frame and advance.
    ///
    /// # Errors
    ///
    /// See [`TransferSender::on_reply`].
    pub fn on_reply_frame(&mut self, frame: &[u8]) -> Result<SenderStep> {
        let reply = Reply::parse(frame)?;
        self.on_reply(reply)
    }

    /// Advance on a reply from the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReply`] for a reply that does not fit the
    /// current state, or [`Error::RetriesExhausted`] once the receiver has
    /// rejected the transfer more than `max_retries` times.
    pub fn on_reply(&mut self, reply: Reply) -> Result<SenderStep> {
        match (self.state, reply) {
            (SenderState::AwaitingSizeAck, Reply::SizeAck) => Ok(self.next_chunk()),
            (SenderState::AwaitingAck, Reply::Ack) => {
                self.acked = self.offset;
                Ok(self.next_chunk())
            }
            (SenderState::AwaitingAck, Reply::Err) => {
                self.retries += 1;
                if self.retries > self.max_retries {
                    tracing::warn!("receiver rejected transfer {} times", self.retries);
                    return Err(Error::RetriesExhausted(self.max_retries));
                }
                tracing::info!(
                    "receiver rejected chunk, restarting ({}/{})",
                    self.retries,
                    self.max_retries
                );
                self.offset = 0;
                self.acked = 0;
                Ok(self.next_chunk())
            }
            (state, reply) => Err(Error::UnexpectedReply(format!(
                "{reply} while {state:?}"
            ))),
        }
    }

    fn next_chunk(&mut self) -> SenderStep {
        if self.offset >= self.data.len() {
            tracing::debug!("all {} bytes acknowledged", self.data.len());
            self.state = SenderState::Done;
            return SenderStep::Done;
        }

        let end = (self.offset + self.chunk_payload).min(self.data.len());
        let frame = protocol::encode_chunk_frame(&self.data[self.offset..end]);
        tracing::trace!(offset = self.offset, len = end - self.offset, "sending chunk");
        self.offset = end;
        self.state = SenderState::AwaitingAck;
        SenderStep::Send(frame)
    }

    /// Current state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Bytes acknowledged by the receiver and the total to send.
    pub fn progress(&self) -> (usize, usize) {
        (self.acked, self.data.len())
    }

    /// Whole-transfer restarts so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Payload bytes carried by each full chunk.
    pub fn chunk_payload(&self) -> usize {
        self.chunk_payload
    }
}
