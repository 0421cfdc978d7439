//! Receiving side glue: a transfer session feeding a command dispatcher.
//!
//! [`CommandReceiver`] owns both halves and runs the batch inside the same
//! call that completes the transfer, so the receive buffer is never reused
//! while handlers are still reading from it.

use std::time::Instant;

use crate::command::{parse_commands, BatchReport, Dispatcher};
use crate::events::{NoopEvents, SessionEvents};
use crate::link::FrameSink;
use crate::session::{FrameOutcome, SessionOptions, TransferSession};

/// Runs each completed transfer as a command batch.
#[derive(Debug)]
pub struct CommandReceiver<L, E = NoopEvents> {
    session: TransferSession<L, E>,
    dispatcher: Dispatcher,
    last_report: Option<BatchReport>,
    batches: u64,
}

impl<L: FrameSink> CommandReceiver<L, NoopEvents> {
    /// Create a receiver without lifecycle notifications.
    pub fn new(link: L, dispatcher: Dispatcher, options: SessionOptions) -> Self {
        Self::from_session(TransferSession::new(link, options), dispatcher)
    }
}

impl<L: FrameSink, E: SessionEvents> CommandReceiver<L, E> {
    /// Create a receiver around an existing session.
    pub fn from_session(session: TransferSession<L, E>, dispatcher: Dispatcher) -> Self {
        Self {
            session,
            dispatcher,
            last_report: None,
            batches: 0,
        }
    }

    /// Feed one frame. Returns the batch report when the frame completed a
    /// transfer.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<&BatchReport> {
        match self.session.handle_frame(frame) {
            FrameOutcome::Complete(released) => {
                let started = Instant::now();
                let (mut commands, payload_size) = match released {
                    Some(bytes) => (parse_commands(&bytes), bytes.len()),
                    None => {
                        let bytes = self.session.payload();
                        (parse_commands(bytes), bytes.len())
                    }
                };

                tracing::info!(
                    "transfer complete ({payload_size} bytes), executing {} commands",
                    commands.len()
                );
                self.dispatcher.execute_all(&mut commands);

                let report = BatchReport {
                    commands,
                    payload_size,
                    elapsed: started.elapsed(),
                };
                tracing::info!("{}", report.summary());

                self.batches += 1;
                self.last_report = Some(report);
                self.last_report.as_ref()
            }
            _ => None,
        }
    }

    /// Forward an idle check to the session.
    pub fn poll_idle(&mut self, now: Instant) -> bool {
        self.session.poll_idle(now)
    }

    /// Report of the most recent batch.
    pub fn last_report(&self) -> Option<&BatchReport> {
        self.last_report.as_ref()
    }

    /// Number of batches executed so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// The underlying session.
    pub fn session(&self) -> &TransferSession<L, E> {
        &self.session
    }

    /// Mutable access to the underlying session.
    pub fn session_mut(&mut self) -> &mut TransferSession<L, E> {
        &mut self.session
    }

    /// The handler registry.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
