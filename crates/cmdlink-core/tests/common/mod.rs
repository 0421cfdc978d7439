//! Common test utilities for `cmdlink` integration tests.
//!
//! This module wires a [`TransferSender`] to a [`CommandReceiver`] through an
//! in-memory link so tests can exercise the full exchange.

#![allow(dead_code)]

use cmdlink_core::command::{BatchReport, Command, Dispatcher, HandlerResult};
use cmdlink_core::events::SessionEvents;
use cmdlink_core::receiver::CommandReceiver;
use cmdlink_core::sender::{SenderStep, TransferSender};

/// Everything that happened during one pumped exchange.
#[derive(Debug, Default)]
pub struct Exchange {
    /// Replies the receiver sent, in order
    pub replies: Vec<Vec<u8>>,
    /// Report of the batch, if the transfer completed
    pub report: Option<BatchReport>,
}

/// Build a command script with `lines` commands alternating between `A0` and
/// `B2`.
pub fn command_script(lines: usize) -> Vec<u8> {
    let mut script = String::new();
    for i in 0..lines {
        let name = if i % 2 == 0 { "A0" } else { "B2" };
        script.push_str(&format!("{name} {i} {}.5 -{}\n", i * 2, i + 1));
    }
    script.into_bytes()
}

/// Dispatcher with `A0` and `B2` registered as no-op handlers.
pub fn demo_dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("A0", |_: &mut Command| -> HandlerResult { Ok(()) });
    dispatcher.register("B2", |_: &mut Command| -> HandlerResult { Ok(()) });
    dispatcher
}

/// Run a complete exchange. `tamper` sees every frame the sender emits
/// (with its sequence number) and may corrupt it before delivery.
pub fn pump<E, F>(
    sender: &mut TransferSender,
    receiver: &mut CommandReceiver<Vec<Vec<u8>>, E>,
    mut tamper: F,
) -> cmdlink_core::Result<Exchange>
where
    E: SessionEvents,
    F: FnMut(usize, &mut Vec<u8>),
{
    let mut exchange = Exchange::default();
    let mut frame = sender.start()?;
    let mut seq = 0;

    loop {
        tamper(seq, &mut frame);
        seq += 1;

        if let Some(report) = receiver.handle_frame(&frame) {
            exchange.report = Some(report.clone());
        }

        let replies: Vec<Vec<u8>> = receiver.session_mut().link_mut().drain(..).collect();
        assert_eq!(replies.len(), 1, "receiver must answer every frame exactly once");
        let reply = replies.into_iter().next().expect("one reply");

        let step = sender.on_reply_frame(&reply);
        exchange.replies.push(reply);
        match step? {
            SenderStep::Send(next) => frame = next,
            SenderStep::Done => return Ok(exchange),
        }
    }
}
