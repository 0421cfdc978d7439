//! # Cmdlink Core Library
//!
//! `cmdlink-core` implements a reliable chunked-transfer protocol layered over
//! an unreliable, framed point-to-point link, together with the command batch
//! interpreter that consumes the assembled payload.
//!
//! ## Features
//!
//! - **Size negotiation**: the peer announces the total size before streaming
//! - **Verified chunks**: every chunk carries a trailing CRC-32
//! - **Whole-offset retry**: a corrupt chunk rewinds the transfer to zero
//! - **Command batches**: line-oriented commands dispatched to named handlers
//!
//! ## Modules
//!
//! - [`checksum`] - CRC-32 integrity checker
//! - [`command`] - Command model, parser and dispatcher
//! - [`config`] - Configuration management
//! - [`events`] - Session lifecycle notifications
//! - [`link`] - Outbound frame sink abstraction
//! - [`protocol`] - Frame layouts and control replies
//! - [`receiver`] - Session + dispatcher glue for the receiving side
//! - [`sender`] - Peer side of the transfer protocol
//! - [`session`] - Transfer session state machine
//!
//! ## Example
//!
//! ```rust,ignore
//! use cmdlink_core::command::Dispatcher;
//! use cmdlink_core::receiver::CommandReceiver;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register("A0", |cmd: &mut Command| {
//!     println!("A0 with {:?}", cmd.parameters);
//!     Ok(())
//! });
//!
//! let mut receiver = CommandReceiver::new(link, dispatcher, SessionOptions::default());
//! if let Some(report) = receiver.handle_frame(&frame) {
//!     println!("{}", report.summary());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod checksum;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod session;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum frame size on the link, checksum included
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Default ceiling for a negotiated transfer (1 MB)
pub const DEFAULT_MAX_TRANSFER_SIZE: usize = 1024 * 1024;

/// Default TCP address for the `listen` and `send` commands
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:52560";

/// Default number of whole-transfer restarts a sender attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;
