//! Listen command implementation.
//!
//! Accepts one TCP connection at a time, runs the receiving side of the
//! transfer protocol over COBS framing and executes every completed transfer
//! through the demo handlers.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use cmdlink_core::config::Config;
use cmdlink_core::events::TracingEvents;
use cmdlink_core::receiver::CommandReceiver;
use cmdlink_core::session::{SessionOptions, TransferSession};

use super::ListenArgs;
use crate::framing::CobsCodec;
use crate::{handlers, ui};

/// How batch reports are printed.
#[derive(Debug, Clone, Copy)]
pub struct ReportMode {
    /// Print a report after each batch
    pub enabled: bool,
    /// Print JSON instead of text
    pub json: bool,
}

/// Run the listen command.
pub async fn run(args: ListenArgs) -> Result<()> {
    let config = super::load_config();

    let mut options = config.session_options();
    if let Some(idle) = &args.idle_timeout {
        options.idle_timeout = Some(parse_idle_timeout(idle)?);
    }
    let report = ReportMode {
        enabled: config.report.print_report && !args.quiet,
        json: args.json,
    };

    let addr = args.addr.as_deref().unwrap_or(&config.link.listen_addr);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!("Connection from {peer}");

        if let Err(e) = serve(stream, &config, options.clone(), report).await {
            tracing::warn!("Connection from {peer} ended: {e:#}");
        } else {
            tracing::info!("Connection from {peer} closed");
        }

        if args.once {
            return Ok(());
        }
    }
}

/// Parse `--idle-timeout`. Zero is rejected: it would abandon every transfer
/// between two frames.
fn parse_idle_timeout(value: &str) -> Result<Duration> {
    let idle = cmdlink_core::config::parse_duration(value)
        .ok_or_else(|| anyhow::anyhow!("Invalid idle timeout: {value}"))?;
    if idle.is_zero() {
        anyhow::bail!("Idle timeout must be greater than zero");
    }
    Ok(idle)
}

/// Run the receiving side over one byte stream until the peer disconnects.
pub async fn serve<S>(
    stream: S,
    config: &Config,
    options: SessionOptions,
    report: ReportMode,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let idle_timeout = options.idle_timeout;
    let mut framed = Framed::new(stream, CobsCodec::with_max_frame_len(config.link.chunk_size));
    let session = TransferSession::with_events(Vec::<Vec<u8>>::new(), TracingEvents, options);
    let mut receiver = CommandReceiver::from_session(session, handlers::demo_dispatcher());

    loop {
        let next = match idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, framed.next()).await {
                Ok(next) => next,
                Err(_) => {
                    receiver.poll_idle(Instant::now());
                    continue;
                }
            },
            None => framed.next().await,
        };

        let Some(frame) = next else {
            return Ok(receiver.batches());
        };
        let frame = frame.context("Failed to read frame")?;

        let completed = receiver.handle_frame(&frame).cloned();

        let replies = std::mem::take(receiver.session_mut().link_mut());
        for reply in replies {
            framed.send(reply).await.context("Failed to send reply")?;
        }

        if let Some(batch) = completed {
            if report.enabled {
                ui::print_report(&batch, report.json)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cmdlink_core::sender::{SenderStep, TransferSender};

    use super::*;

    const QUIET: ReportMode = ReportMode {
        enabled: false,
        json: false,
    };

    #[test]
    fn test_parse_idle_timeout() {
        assert_eq!(parse_idle_timeout("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_idle_timeout("0s").is_err());
        assert!(parse_idle_timeout("0m").is_err());
        assert!(parse_idle_timeout("soon").is_err());
    }

    #[tokio::test]
    async fn test_serve_executes_sent_batch() {
        let (client, server) = tokio::io::duplex(4096);
        let config = Config::default();
        let options = config.session_options();

        let server_task =
            tokio::spawn(async move { serve(server, &Config::default(), options, QUIET).await });

        let mut framed = Framed::new(client, CobsCodec::new());
        let mut sender =
            TransferSender::new(b"A0 1 2\nECHO 3\n".repeat(20), config.link.chunk_size, 3)
                .unwrap();

        framed.send(sender.start().unwrap()).await.unwrap();
        loop {
            let reply = framed.next().await.unwrap().unwrap();
            match sender.on_reply_frame(&reply).unwrap() {
                SenderStep::Send(frame) => framed.send(frame).await.unwrap(),
                SenderStep::Done => break,
            }
        }
        drop(framed);

        let batches = server_task.await.unwrap().unwrap();
        assert_eq!(batches, 1);
    }

    #[tokio::test]
    async fn test_serve_idle_timeout_answers_new_size() {
        let (client, server) = tokio::io::duplex(1024);
        let config = Config::default();
        let mut options = config.session_options();
        options.idle_timeout = Some(Duration::from_millis(20));

        let server_task =
            tokio::spawn(async move { serve(server, &Config::default(), options, QUIET).await });

        let mut framed = Framed::new(client, CobsCodec::new());
        framed.send(vec![8, 0, 0, 0]).await.unwrap();
        assert_eq!(framed.next().await.unwrap().unwrap(), b"SIZE_ACK");

        // Stall until the session gives up, then start over.
        tokio::time::sleep(Duration::from_millis(80)).await;
        framed.send(vec![2, 0, 0, 0]).await.unwrap();
        assert_eq!(framed.next().await.unwrap().unwrap(), b"SIZE_ACK");

        drop(framed);
        assert_eq!(server_task.await.unwrap().unwrap(), 0);
    }
}
