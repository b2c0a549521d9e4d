//! TCP relay server.
//!
//! One task per connection. A connection must send `join` first; it is then
//! answered with a `sheet` snapshot and becomes a member of that namespace.
//! A member that falls behind the namespace's broadcast channel is sent a
//! fresh snapshot. Frames longer than [`MAX_FRAME_BYTES`] close the
//! connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast::error::RecvError;

use eecalc_core::protocol::{decode_line, encode_line};
use eecalc_core::{ClientMessage, SyncEvent};

use crate::error::{RelayError, Result};
use crate::frame::{FrameReader, MAX_FRAME_BYTES};
use crate::namespace::{ConnId, Namespace, Namespaces};

pub struct RelayServer {
    listener: TcpListener,
    namespaces: Arc<Namespaces>,
    next_conn: AtomicU64,
}

impl RelayServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::bind_with(addr, Namespaces::new()).await
    }

    /// Bind with a caller-built namespace table, e.g. a smaller channel capacity.
    pub async fn bind_with(addr: impl ToSocketAddrs, namespaces: Namespaces) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(RelayServer {
            listener,
            namespaces: Arc::new(namespaces),
            next_conn: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn namespaces(&self) -> Arc<Namespaces> {
        self.namespaces.clone()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "relay listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
            let namespaces = self.namespaces.clone();
            tokio::spawn(async move {
                match handle_connection(stream, peer, conn, namespaces).await {
                    Ok(()) => tracing::info!(conn, %peer, "disconnected"),
                    Err(e) => tracing::warn!(conn, %peer, error = %e, "connection ended with error"),
                }
            });
        }
    }
}

async fn write_frame(write: &mut OwnedWriteHalf, event: &SyncEvent) -> Result<()> {
    let line = encode_line(event)?;
    write.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn: ConnId,
    namespaces: Arc<Namespaces>,
) -> Result<()> {
    tracing::info!(conn, %peer, "connected");
    let (read, mut write) = stream.into_split();
    let mut lines = FrameReader::new(BufReader::new(read), MAX_FRAME_BYTES);

    let namespace: Arc<Namespace> = loop {
        let Some(line) = lines.next_line().await? else {
            return Err(RelayError::ClosedBeforeJoin);
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_line::<ClientMessage>(&line) {
            Ok(ClientMessage::Join { sheet }) => break namespaces.get_or_create(&sheet),
            Ok(_) => tracing::warn!(conn, "frame before join dropped"),
            Err(e) => tracing::warn!(conn, error = %e, "malformed frame skipped"),
        }
    };

    let (cells, mut rx) = namespace.join();
    tracing::info!(
        conn,
        sheet = %namespace.name(),
        cells = cells.len(),
        members = namespace.member_count(),
        "joined"
    );
    write_frame(&mut write, &SyncEvent::Sheet { cells }).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match decode_line::<ClientMessage>(&line) {
                    Ok(ClientMessage::Join { sheet }) => {
                        tracing::warn!(conn, %sheet, "already joined; join ignored");
                    }
                    Ok(message) => {
                        if let Some(event) = message.into_event() {
                            namespace.publish(conn, event);
                        }
                    }
                    Err(e) => tracing::warn!(conn, error = %e, "malformed frame skipped"),
                }
            }
            received = rx.recv() => match received {
                Ok(relayed) if relayed.from == conn => {}
                Ok(relayed) => write_frame(&mut write, &relayed.event).await?,
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(conn, lagged = n, "connection lagged behind; resending sheet");
                    let (cells, fresh) = namespace.join();
                    rx = fresh;
                    write_frame(&mut write, &SyncEvent::Sheet { cells }).await?;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
