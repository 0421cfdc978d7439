//! Outbound side of the framed link.
//!
//! The byte-framing scheme and the physical stream belong to the transport;
//! the core only needs a way to hand over a whole frame for transmission.

use crate::error::Result;

/// Accepts whole frames for transmission to the peer.
pub trait FrameSink {
    /// Queue or transmit one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot take the frame.
    fn send_frame(&mut self, frame: &[u8]) -> Result<()>;
}

/// Collects frames in memory, one entry per frame.
impl FrameSink for Vec<Vec<u8>> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.push(frame.to_vec());
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send_frame(frame)
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send_frame(frame)
    }
}
