//! Transfer session state machine.
//!
//! A session receives one payload at a time over a framed link:
//!
//! 1. **WaitingForSize** - the peer announces the total size (first 4 bytes,
//!    little-endian). Shorter frames are ignored.
//! 2. **AllocatingMemory** - a buffer of exactly that size is reserved. On
//!    success the session replies `SIZE_ACK`; on failure it stays parked here
//!    until the peer announces a new size.
//! 3. **ReceivingData** - every frame is a chunk followed by its CRC-32. A good
//!    chunk is appended and answered with `ACK`; a bad one rewinds the whole
//!    transfer to offset zero and is answered with `ERR`.
//!
//! Once the announced number of bytes has been received the session fires
//! `receive_complete` then `transfer_ended` and returns to `WaitingForSize`.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::checksum;
use crate::error::{Error, Result};
use crate::events::{NoopEvents, SessionEvents};
use crate::link::FrameSink;
use crate::protocol::{self, Reply};

/// Receive state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Waiting for the peer to announce the transfer size
    WaitingForSize,
    /// Size known, receive buffer not yet allocated
    AllocatingMemory,
    /// Streaming verified chunks into the receive buffer
    ReceivingData,
}

/// What happens to the receive buffer once a transfer completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferPolicy {
    /// Keep the payload in the session until the owner releases it or a new
    /// size is negotiated
    #[default]
    Retain,
    /// Hand the payload to the caller and drop the session's buffer
    Release,
}

/// Tunables for a [`TransferSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Largest size a peer may announce
    pub max_transfer_size: usize,
    /// Buffer handling after completion
    pub buffer_policy: BufferPolicy,
    /// Abandon an in-progress transfer after this long without frames
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_transfer_size: crate::DEFAULT_MAX_TRANSFER_SIZE,
            buffer_policy: BufferPolicy::Retain,
            idle_timeout: None,
        }
    }
}

/// Result of feeding one frame to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame too short to be a size announcement
    Ignored,
    /// Size accepted, buffer allocated, `SIZE_ACK` sent
    SizeAccepted,
    /// Size announced but the buffer could not be allocated
    Stalled,
    /// Chunk verified and appended, `ACK` sent
    ChunkAccepted,
    /// Chunk rejected, offset rewound to zero, `ERR` sent
    ChunkRejected,
    /// All bytes received.
    ///
    /// Under [`BufferPolicy::Release`] the assembled payload is moved out
    /// here; under [`BufferPolicy::Retain`] this is `None` and the payload is
    /// read through [`TransferSession::payload`].
    Complete(Option<Vec<u8>>),
}

/// Receiving side of the chunked transfer protocol.
pub struct TransferSession<L, E = NoopEvents> {
    link: L,
    events: E,
    options: SessionOptions,
    state: TransferState,
    buffer: Vec<u8>,
    /// Bytes the current buffer was sized for; appends never exceed it
    capacity: usize,
    total_size: usize,
    last_activity: Option<Instant>,
    last_error: Option<Error>,
}

impl<L, E> std::fmt::Debug for TransferSession<L, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession")
            .field("state", &self.state)
            .field("total_size", &self.total_size)
            .field("received_len", &self.buffer.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<L: FrameSink> TransferSession<L, NoopEvents> {
    /// Create a session that sends replies on `link` and fires no events.
    pub fn new(link: L, options: SessionOptions) -> Self {
        Self::with_events(link, NoopEvents, options)
    }
}

impl<L: FrameSink, E: SessionEvents> TransferSession<L, E> {
    /// Create a session with an events sink.
    pub fn with_events(link: L, events: E, options: SessionOptions) -> Self {
        Self {
            link,
            events,
            options,
            state: TransferState::WaitingForSize,
            buffer: Vec::new(),
            capacity: 0,
            total_size: 0,
            last_activity: None,
            last_error: None,
        }
    }

    /// Feed one de-framed frame into the state machine.
    pub fn handle_frame(&mut self, frame: &[u8]) -> FrameOutcome {
        self.last_activity = Some(Instant::now());

        match self.state {
            TransferState::WaitingForSize | TransferState::AllocatingMemory => {
                let Some(size) = protocol::decode_size(frame) else {
                    let len = frame.len();
                    self.events.debug(&format!("ignoring {len}-byte frame, no size yet"));
                    return FrameOutcome::Ignored;
                };
                self.announce_size(size);
                self.allocate()
            }
            TransferState::ReceivingData => self.receive_chunk(frame),
        }
    }

    /// Abandon an in-progress transfer that has been idle for longer than
    /// the configured timeout. Returns `true` if the session was reset.
    pub fn poll_idle(&mut self, now: Instant) -> bool {
        let Some(timeout) = self.options.idle_timeout else {
            return false;
        };
        if self.state == TransferState::WaitingForSize {
            return false;
        }
        let Some(last) = self.last_activity else {
            return false;
        };
        if now.saturating_duration_since(last) < timeout {
            return false;
        }

        tracing::warn!(
            received = self.buffer.len(),
            total = self.total_size,
            "transfer idle for {:?}, abandoning",
            timeout
        );
        let was_receiving = self.state == TransferState::ReceivingData;
        self.last_error = Some(Error::IdleTimeout(timeout.as_secs()));
        self.events.error();
        if was_receiving {
            self.events.transfer_ended();
        }
        self.reset();
        true
    }

    /// Drop any in-progress transfer and wait for a new size announcement.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.total_size = 0;
        self.last_activity = None;
        self.state = TransferState::WaitingForSize;
    }

    /// Current state.
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Announced size of the transfer in progress, or 0 when idle.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Verified bytes received so far (or retained from the last transfer).
    pub fn received_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes assembled so far, or the retained payload of the last transfer.
    pub fn payload(&self) -> &[u8] {
        &self.buffer
    }

    /// Move the retained payload out of the session.
    pub fn take_payload(&mut self) -> Vec<u8> {
        self.capacity = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Free the retained buffer.
    ///
    /// Has no effect while a transfer is in progress.
    pub fn release_buffer(&mut self) {
        if self.state == TransferState::WaitingForSize {
            self.buffer = Vec::new();
            self.capacity = 0;
        }
    }

    /// The most recent failure recorded by the session.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Events sink.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Mutable events sink.
    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    /// Outbound link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable outbound link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the session, returning its link and events sink.
    pub fn into_parts(self) -> (L, E) {
        (self.link, self.events)
    }

    fn announce_size(&mut self, size: usize) {
        self.events.debug(&format!("size announced: {size} bytes"));
        self.buffer.clear();
        self.total_size = size;
        self.state = TransferState::AllocatingMemory;
    }

    fn allocate(&mut self) -> FrameOutcome {
        match self.reserve(self.total_size) {
            Ok(()) => {
                self.events.debug(&format!("allocated {} bytes", self.total_size));
                self.state = TransferState::ReceivingData;
                self.events.transfer_started();
                self.send_reply(Reply::SizeAck);

                if self.total_size == 0 {
                    self.complete()
                } else {
                    FrameOutcome::SizeAccepted
                }
            }
            Err(e) => {
                tracing::warn!("receive buffer allocation failed: {e}");
                self.last_error = Some(e);
                self.events.error();
                FrameOutcome::Stalled
            }
        }
    }

    fn reserve(&mut self, size: usize) -> Result<()> {
        if size > self.options.max_transfer_size {
            return Err(Error::TransferTooLarge {
                size,
                limit: self.options.max_transfer_size,
            });
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        if buffer.capacity() > size.saturating_mul(2) {
            buffer = Vec::new();
        }
        buffer
            .try_reserve_exact(size)
            .map_err(|_| Error::AllocationFailed(size))?;

        self.buffer = buffer;
        self.capacity = size;
        Ok(())
    }

    fn receive_chunk(&mut self, frame: &[u8]) -> FrameOutcome {
        self.events.debug(&format!("chunk of {} bytes received", frame.len()));

        let (payload, expected) = match protocol::split_chunk_frame(frame) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!("rejecting chunk: {e}");
                return self.reject();
            }
        };

        tracing::trace!(expected = format_args!("{expected:08X}"), "chunk checksum");
        if !checksum::verify(payload, expected) {
            tracing::warn!(
                offset = self.buffer.len(),
                "chunk checksum mismatch, rewinding transfer"
            );
            return self.reject();
        }

        let remaining = self.capacity - self.buffer.len();
        if payload.len() > remaining {
            tracing::warn!(
                len = payload.len(),
                remaining,
                "chunk overflows the announced size, rewinding transfer"
            );
            return self.reject();
        }

        self.events
            .debug(&format!("appending at offset {}", self.buffer.len()));
        self.buffer.extend_from_slice(payload);
        self.send_reply(Reply::Ack);

        if self.buffer.len() >= self.total_size {
            self.complete()
        } else {
            FrameOutcome::ChunkAccepted
        }
    }

    fn reject(&mut self) -> FrameOutcome {
        self.buffer.clear();
        self.send_reply(Reply::Err);
        FrameOutcome::ChunkRejected
    }

    fn complete(&mut self) -> FrameOutcome {
        self.events.receive_complete();
        self.events.transfer_ended();
        self.total_size = 0;
        self.last_activity = None;
        self.state = TransferState::WaitingForSize;

        match self.options.buffer_policy {
            BufferPolicy::Retain => FrameOutcome::Complete(None),
            BufferPolicy::Release => FrameOutcome::Complete(Some(self.take_payload())),
        }
    }

    fn send_reply(&mut self, reply: Reply) {
        if let Err(e) = self.link.send_frame(reply.as_bytes()) {
            tracing::warn!("failed to send {reply}: {e}");
            self.last_error = Some(e);
            self.events.error();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventLog};
    use crate::protocol::encode_chunk_frame;

    fn session() -> TransferSession<Vec<Vec<u8>>, EventLog> {
        TransferSession::with_events(Vec::new(), EventLog::new(), SessionOptions::default())
    }

    fn size_frame(size: u32) -> Vec<u8> {
        size.to_le_bytes().to_vec()
    }

    fn replies(session: &TransferSession<Vec<Vec<u8>>, EventLog>) -> Vec<&[u8]> {
        session.link().iter().map(Vec::as_slice).collect()
    }

    #[test]
    fn test_four_byte_size_frame_accepted() {
        let mut s = session();
        let outcome = s.handle_frame(&size_frame(10));

        assert_eq!(outcome, FrameOutcome::SizeAccepted);
        assert_eq!(s.state(), TransferState::ReceivingData);
        assert_eq!(s.total_size(), 10);
        assert_eq!(replies(&s), vec![b"SIZE_ACK".as_slice()]);
        assert_eq!(s.events().lifecycle(), vec![Event::TransferStarted]);
    }

    #[test]
    fn test_three_byte_frame_ignored() {
        let mut s = session();
        let outcome = s.handle_frame(&[10, 0, 0]);

        assert_eq!(outcome, FrameOutcome::Ignored);
        assert_eq!(s.state(), TransferState::WaitingForSize);
        assert!(s.link().is_empty());
        assert!(s.events().lifecycle().is_empty());
    }

    #[test]
    fn test_chunks_reassemble_payload() {
        let payload = b"A0 1.0 2.0\nB2 3.5\nA0 -7\n";
        let mut s = session();
        s.handle_frame(&size_frame(payload.len() as u32));

        let chunks: Vec<&[u8]> = payload.chunks(5).collect();
        let (last, head) = chunks.split_last().unwrap();
        for chunk in head {
            assert_eq!(
                s.handle_frame(&encode_chunk_frame(chunk)),
                FrameOutcome::ChunkAccepted
            );
        }
        assert_eq!(
            s.handle_frame(&encode_chunk_frame(last)),
            FrameOutcome::Complete(None)
        );

        assert_eq!(s.payload(), payload);
        assert_eq!(s.received_len(), payload.len());
        assert_eq!(s.state(), TransferState::WaitingForSize);
        assert_eq!(s.total_size(), 0);
        assert_eq!(
            s.events().lifecycle(),
            vec![
                Event::TransferStarted,
                Event::ReceiveComplete,
                Event::TransferEnded
            ]
        );
    }

    #[test]
    fn test_checksum_mismatch_rewinds_to_zero() {
        let mut s = session();
        s.handle_frame(&size_frame(8));
        s.handle_frame(&encode_chunk_frame(b"abcd"));
        assert_eq!(s.received_len(), 4);

        let mut bad = encode_chunk_frame(b"efgh");
        bad[0] ^= 0xFF;
        assert_eq!(s.handle_frame(&bad), FrameOutcome::ChunkRejected);

        assert_eq!(s.received_len(), 0);
        assert_eq!(s.state(), TransferState::ReceivingData);
        assert_eq!(s.link().last().unwrap(), b"ERR");
        assert!(!s.events().lifecycle().contains(&Event::Error));

        s.handle_frame(&encode_chunk_frame(b"abcd"));
        let outcome = s.handle_frame(&encode_chunk_frame(b"efgh"));
        assert_eq!(outcome, FrameOutcome::Complete(None));
        assert_eq!(s.payload(), b"abcdefgh");
    }

    #[test]
    fn test_short_frame_while_receiving_is_not_a_size() {
        let mut s = session();
        s.handle_frame(&size_frame(16));
        s.handle_frame(&encode_chunk_frame(b"1234"));

        assert_eq!(s.handle_frame(&[1, 2]), FrameOutcome::ChunkRejected);
        assert_eq!(s.state(), TransferState::ReceivingData);
        assert_eq!(s.total_size(), 16);
        assert_eq!(
            s.events().lifecycle(),
            vec![Event::TransferStarted],
            "no second allocation"
        );
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut s = session();
        s.handle_frame(&size_frame(4));
        assert_eq!(
            s.handle_frame(&encode_chunk_frame(b"too long")),
            FrameOutcome::ChunkRejected
        );
        assert_eq!(s.received_len(), 0);
        assert_eq!(s.link().last().unwrap(), b"ERR");
    }

    #[test]
    fn test_allocation_failure_stalls_until_new_size() {
        let options = SessionOptions {
            max_transfer_size: 32,
            ..Default::default()
        };
        let mut s = TransferSession::with_events(Vec::new(), EventLog::new(), options);

        assert_eq!(s.handle_frame(&size_frame(64)), FrameOutcome::Stalled);
        assert_eq!(s.state(), TransferState::AllocatingMemory);
        assert!(s.link().is_empty());
        assert_eq!(s.events().lifecycle(), vec![Event::Error]);
        assert!(matches!(
            s.last_error(),
            Some(Error::TransferTooLarge { size: 64, limit: 32 })
        ));

        assert_eq!(s.handle_frame(&[0]), FrameOutcome::Ignored);
        assert_eq!(s.state(), TransferState::AllocatingMemory);

        assert_eq!(s.handle_frame(&size_frame(8)), FrameOutcome::SizeAccepted);
        assert_eq!(s.state(), TransferState::ReceivingData);
        assert_eq!(replies(&s), vec![b"SIZE_ACK".as_slice()]);
    }

    #[test]
    fn test_zero_size_transfer_completes_immediately() {
        let mut s = session();
        assert_eq!(s.handle_frame(&size_frame(0)), FrameOutcome::Complete(None));
        assert_eq!(s.state(), TransferState::WaitingForSize);
        assert_eq!(replies(&s), vec![b"SIZE_ACK".as_slice()]);
        assert!(s.payload().is_empty());
    }

    #[test]
    fn test_release_policy_hands_over_payload() {
        let options = SessionOptions {
            buffer_policy: BufferPolicy::Release,
            ..Default::default()
        };
        let mut s = TransferSession::new(Vec::new(), options);
        s.handle_frame(&size_frame(3));
        let outcome = s.handle_frame(&encode_chunk_frame(b"A0\n"));

        assert_eq!(outcome, FrameOutcome::Complete(Some(b"A0\n".to_vec())));
        assert!(s.payload().is_empty());
    }

    #[test]
    fn test_retained_buffer_replaced_by_next_transfer() {
        let mut s = session();
        s.handle_frame(&size_frame(2));
        s.handle_frame(&encode_chunk_frame(b"A0"));
        assert_eq!(s.payload(), b"A0");

        s.handle_frame(&size_frame(2));
        assert_eq!(s.received_len(), 0);
        s.handle_frame(&encode_chunk_frame(b"B2"));
        assert_eq!(s.payload(), b"B2");
    }

    #[test]
    fn test_release_buffer_ignored_mid_transfer() {
        let mut s = session();
        s.handle_frame(&size_frame(8));
        s.handle_frame(&encode_chunk_frame(b"abcd"));
        s.release_buffer();
        assert_eq!(s.received_len(), 4);
    }

    #[test]
    fn test_idle_timeout_resets_session() {
        let options = SessionOptions {
            idle_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let mut s = TransferSession::with_events(Vec::new(), EventLog::new(), options);
        s.handle_frame(&size_frame(8));
        s.handle_frame(&encode_chunk_frame(b"abcd"));

        let now = Instant::now();
        assert!(!s.poll_idle(now));
        assert!(s.poll_idle(now + Duration::from_secs(6)));

        assert_eq!(s.state(), TransferState::WaitingForSize);
        assert_eq!(s.received_len(), 0);
        assert!(matches!(s.last_error(), Some(Error::IdleTimeout(5))));
        assert_eq!(
            s.events().lifecycle(),
            vec![Event::TransferStarted, Event::Error, Event::TransferEnded]
        );
    }

    #[test]
    fn test_idle_timeout_disabled_by_default() {
        let mut s = session();
        s.handle_frame(&size_frame(8));
        assert!(!s.poll_idle(Instant::now() + Duration::from_secs(3600)));
        assert_eq!(s.state(), TransferState::ReceivingData);
    }

    struct FailingLink;

    impl FrameSink for FailingLink {
        fn send_frame(&mut self, _frame: &[u8]) -> Result<()> {
            Err(Error::LinkSend("port closed".into()))
        }
    }

    #[test]
    fn test_reply_failure_reported_but_state_advances() {
        let mut s =
            TransferSession::with_events(FailingLink, EventLog::new(), SessionOptions::default());
        assert_eq!(s.handle_frame(&size_frame(4)), FrameOutcome::SizeAccepted);
        assert_eq!(s.state(), TransferState::ReceivingData);
        assert!(matches!(s.last_error(), Some(Error::LinkSend(_))));
        assert_eq!(s.events().lifecycle(), vec![Event::TransferStarted, Event::Error]);
    }
}
