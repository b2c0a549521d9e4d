//! Relay behaviour over loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use eecalc_core::SyncEvent;
use eecalc_core::protocol::decode_line;
use eecalc_core::sheet::CellList;
use eecalc_relay::{MAX_FRAME_BYTES, Namespaces, RelayServer, connect};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

async fn start_relay() -> SocketAddr {
    start_relay_with(Namespaces::new()).await
}

async fn start_relay_with(namespaces: Namespaces) -> SocketAddr {
    let server = RelayServer::bind_with("127.0.0.1:0", namespaces).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

struct RawClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl RawClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        RawClient {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    /// Connect, join `sheet` and return the snapshot cells.
    async fn join(addr: SocketAddr, sheet: &str) -> (Self, Vec<String>) {
        let mut client = Self::connect(addr).await;
        client
            .send(&format!(r#"{{"type":"join","sheet":"{sheet}"}}"#))
            .await;
        match client.recv().await {
            SyncEvent::Sheet { cells } => (client, cells),
            other => panic!("expected sheet, got {other:?}"),
        }
    }

    async fn send(&mut self, line: &str) {
        self.write.write_all(line.as_bytes()).await.unwrap();
        self.write.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> SyncEvent {
        let line = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for frame")
            .unwrap()
            .expect("connection closed");
        decode_line(&line).unwrap()
    }

    async fn assert_closed(&mut self) {
        let next = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for close");
        assert!(!matches!(next, Ok(Some(_))), "connection still open");
    }

    async fn assert_quiet(&mut self) {
        assert!(
            timeout(QUIET, self.lines.next_line()).await.is_err(),
            "unexpected frame"
        );
    }
}

fn edit(number: usize, content: &str) -> SyncEvent {
    SyncEvent::EditCell {
        number,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_join_receives_blank_sheet() {
    let addr = start_relay().await;
    let (_client, cells) = RawClient::join(addr, "fresh").await;
    assert_eq!(cells, vec![""]);
}

#[tokio::test]
async fn test_edit_is_relayed_to_others_but_not_echoed() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, _) = RawClient::join(addr, "lab").await;

    a.send(r#"{"type":"edit cell","number":0,"content":"2+2"}"#)
        .await;

    assert_eq!(b.recv().await, edit(0, "2+2"));
    a.assert_quiet().await;
}

#[tokio::test]
async fn test_late_joiner_gets_mirror() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, _) = RawClient::join(addr, "lab").await;

    a.send(r#"{"type":"edit cell","number":0,"content":"a=1"}"#)
        .await;
    a.send(r#"{"type":"edit cell","number":2,"content":"a+2"}"#)
        .await;
    a.send(r#"{"type":"delete cell","number":1}"#).await;
    // b seeing the delete means the relay has applied all three.
    b.recv().await;
    b.recv().await;
    assert_eq!(b.recv().await, SyncEvent::DeleteCell { number: 1 });

    let (_c, cells) = RawClient::join(addr, "lab").await;
    assert_eq!(cells, vec!["a=1", "a+2"]);
}

#[tokio::test]
async fn test_malformed_lines_do_not_close_connection() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, _) = RawClient::join(addr, "lab").await;

    a.send("this is not json").await;
    a.send(r#"{"type":"delete cell","number":-4}"#).await;
    a.send(r#"{"type":"edit cell","number":0,"content":"ok"}"#)
        .await;

    assert_eq!(b.recv().await, edit(0, "ok"));
}

#[tokio::test]
async fn test_frames_before_join_are_dropped() {
    let addr = start_relay().await;
    let mut early = RawClient::connect(addr).await;
    early
        .send(r#"{"type":"edit cell","number":0,"content":"sneaky"}"#)
        .await;
    early.send(r#"{"type":"join","sheet":"lab"}"#).await;
    assert_eq!(early.recv().await, SyncEvent::Sheet { cells: vec!["".into()] });
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "one").await;
    let (mut b, _) = RawClient::join(addr, "two").await;

    a.send(r#"{"type":"edit cell","number":0,"content":"1"}"#)
        .await;
    b.assert_quiet().await;

    let (_c, cells) = RawClient::join(addr, "two").await;
    assert_eq!(cells, vec![""]);
}

#[tokio::test]
async fn test_client_connection_round_trip() {
    let addr = start_relay().await;
    let mut a = connect(addr, "lab").await.unwrap();
    let mut b = connect(addr, "lab").await.unwrap();

    let first = timeout(WAIT, a.inbound.recv()).await.unwrap().unwrap();
    assert_eq!(first, SyncEvent::Sheet { cells: vec!["".into()] });
    let first = timeout(WAIT, b.inbound.recv()).await.unwrap().unwrap();
    assert!(matches!(first, SyncEvent::Sheet { .. }));

    assert!(a.send(edit(1, "V=5")));
    let got = timeout(WAIT, b.inbound.recv()).await.unwrap().unwrap();
    assert_eq!(got, edit(1, "V=5"));
}

#[tokio::test]
async fn test_second_join_is_ignored() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, _) = RawClient::join(addr, "lab").await;

    a.send(r#"{"type":"join","sheet":"other"}"#).await;
    a.send(r#"{"type":"edit cell","number":0,"content":"still lab"}"#)
        .await;

    assert_eq!(b.recv().await, edit(0, "still lab"));
    a.assert_quiet().await;
    let (_c, cells) = RawClient::join(addr, "other").await;
    assert_eq!(cells, vec![""]);
}

#[tokio::test]
async fn test_lagging_member_is_resynchronised() {
    let addr = start_relay_with(Namespaces::with_capacity(1)).await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, cells) = RawClient::join(addr, "lab").await;

    let burst: String = (0..64)
        .map(|n| format!("{{\"type\":\"edit cell\",\"number\":{n},\"content\":\"{n}\"}}\n"))
        .collect();
    a.write.write_all(burst.as_bytes()).await.unwrap();

    let expected: Vec<String> = (0..64).map(|n| n.to_string()).collect();
    let mut view = CellList::new();
    view.full_replace(&cells);
    let converged = timeout(WAIT, async {
        while view.texts() != expected {
            match b.recv().await {
                SyncEvent::Sheet { cells } => view.full_replace(&cells),
                SyncEvent::EditCell { number, content } => {
                    view.insert_at_or_grow(number, &content);
                }
                SyncEvent::DeleteCell { number } => {
                    view.delete_now(number);
                }
            }
        }
    })
    .await;
    assert!(converged.is_ok(), "member diverged: {:?}", view.texts());
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let addr = start_relay().await;
    let (mut a, _) = RawClient::join(addr, "lab").await;
    let (mut b, _) = RawClient::join(addr, "lab").await;

    let huge = format!(
        r#"{{"type":"edit cell","number":0,"content":"{}"}}"#,
        "x".repeat(MAX_FRAME_BYTES)
    );
    let _ = a.write.write_all(huge.as_bytes()).await;
    let _ = a.write.write_all(b"\n").await;

    a.assert_closed().await;
    b.assert_quiet().await;
    let (_c, cells) = RawClient::join(addr, "lab").await;
    assert_eq!(cells, vec![""]);
}

#[tokio::test]
async fn test_client_connection_drops_oversized_edit() {
    let addr = start_relay().await;
    let mut a = connect(addr, "lab").await.unwrap();
    let mut b = connect(addr, "lab").await.unwrap();
    timeout(WAIT, a.inbound.recv()).await.unwrap().unwrap();
    timeout(WAIT, b.inbound.recv()).await.unwrap().unwrap();

    assert!(a.send(edit(0, &"x".repeat(MAX_FRAME_BYTES))));
    assert!(a.send(edit(0, "ok")));
    let got = timeout(WAIT, b.inbound.recv()).await.unwrap().unwrap();
    assert_eq!(got, edit(0, "ok"));
}
