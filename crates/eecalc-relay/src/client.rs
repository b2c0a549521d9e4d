//! Client side of the relay connection.
//!
//! [`connect`] joins a sheet and spawns two tasks bridging the socket to a
//! pair of unbounded channels. Both channel ends can be used from outside the
//! runtime, so a synchronous UI loop can `try_recv` and `send` directly.
//! Outgoing frames the relay would refuse are dropped before sending.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;

use eecalc_core::protocol::{decode_line, encode_line};
use eecalc_core::{ClientMessage, SyncEvent};

use crate::error::Result;
use crate::frame::{FrameReader, MAX_FRAME_BYTES, MAX_SNAPSHOT_FRAME_BYTES};

/// A joined sheet. Dropping `outbound` closes the connection's write side.
pub struct RelayConnection {
    pub outbound: mpsc::UnboundedSender<SyncEvent>,
    pub inbound: mpsc::UnboundedReceiver<SyncEvent>,
}

impl RelayConnection {
    /// Queue an event for the relay. Returns false once the connection is gone.
    pub fn send(&self, event: SyncEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}

/// Dial the relay and join `sheet`. Must be called within a tokio runtime.
pub async fn connect(addr: impl ToSocketAddrs, sheet: &str) -> Result<RelayConnection> {
    let stream = TcpStream::connect(addr).await?;
    let peer = stream.peer_addr()?;
    let (read, mut write) = stream.into_split();

    let join = encode_line(&ClientMessage::Join {
        sheet: sheet.to_string(),
    })?;
    write.write_all(join.as_bytes()).await?;
    tracing::info!(%peer, %sheet, "joined relay");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SyncEvent>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<SyncEvent>();

    tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let Some(message) = ClientMessage::from_event(event) else {
                continue;
            };
            let line = match encode_line(&message) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode frame");
                    continue;
                }
            };
            if line.len() > MAX_FRAME_BYTES {
                tracing::warn!(bytes = line.len(), max = MAX_FRAME_BYTES, "frame too large; not sent");
                continue;
            }
            if let Err(e) = write.write_all(line.as_bytes()).await {
                tracing::warn!(error = %e, "relay write failed");
                break;
            }
        }
        tracing::debug!("relay writer stopped");
    });

    tokio::spawn(async move {
        let mut lines = FrameReader::new(BufReader::new(read), MAX_SNAPSHOT_FRAME_BYTES);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match decode_line::<SyncEvent>(&line) {
                    Ok(event) => {
                        if in_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "malformed frame from relay skipped"),
                },
                Ok(None) => {
                    tracing::info!("relay closed the connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "relay read failed");
                    break;
                }
            }
        }
    });

    Ok(RelayConnection {
        outbound: out_tx,
        inbound: in_rx,
    })
}
