//! Send command implementation.
//!
//! Reads a command file and pushes it to a listening receiver, one chunk per
//! acknowledgement.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use cmdlink_core::sender::{SenderStep, TransferSender};

use super::SendArgs;
use crate::framing::CobsCodec;
use crate::ui;

/// Totals for a finished transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    /// Payload size
    pub bytes: usize,
    /// Frames written, size announcement included
    pub frames: usize,
    /// Whole-transfer restarts
    pub retries: u32,
}

/// Run the send command.
pub async fn run(args: SendArgs) -> Result<()> {
    let config = super::load_config();

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let chunk_size = args.chunk_size.unwrap_or(config.link.chunk_size);
    let max_retries = args.retries.unwrap_or(config.sender.max_retries);
    let sender = TransferSender::new(data, chunk_size, max_retries)?;

    let addr = args.addr.as_deref().unwrap_or(&config.link.listen_addr);
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to {addr}"))?;
    tracing::debug!("Connected to {addr}");

    let started = Instant::now();
    let summary = transfer(stream, sender, chunk_size, config.link.reply_timeout).await?;

    if !args.quiet {
        println!(
            "Sent {} to {} in {} frames ({} restarts, {} ms)",
            ui::format_size(summary.bytes),
            addr,
            summary.frames,
            summary.retries,
            started.elapsed().as_millis()
        );
    }
    Ok(())
}

/// Drive `sender` over a byte stream until the receiver has acknowledged
/// every chunk.
pub async fn transfer<S>(
    stream: S,
    mut sender: TransferSender,
    chunk_size: usize,
    reply_timeout: Duration,
) -> Result<SendSummary>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, CobsCodec::with_max_frame_len(chunk_size));
    let mut frames = 1;

    framed.send(sender.start()?).await.context("Failed to send size")?;

    loop {
        let reply = tokio::time::timeout(reply_timeout, framed.next())
            .await
            .map_err(|_| anyhow::anyhow!("No reply within {reply_timeout:?}"))?
            .ok_or_else(|| anyhow::anyhow!("Receiver closed the connection"))?
            .context("Failed to read reply")?;

        match sender.on_reply_frame(&reply)? {
            SenderStep::Send(frame) => {
                framed.send(frame).await.context("Failed to send chunk")?;
                frames += 1;
                let (acked, total) = sender.progress();
                tracing::debug!("{acked}/{total} bytes acknowledged");
            }
            SenderStep::Done => break,
        }
    }

    Ok(SendSummary {
        bytes: sender.progress().1,
        frames,
        retries: sender.retries(),
    })
}
