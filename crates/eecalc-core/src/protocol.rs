//! Sync protocol between clients and the relay.
//!
//! The wire format is JSONL (newline-delimited JSON). Every frame is an object
//! tagged by `"type"`:
//!
//! | type          | direction        | fields              |
//! |---------------|------------------|---------------------|
//! | `join`        | client → relay   | `sheet`             |
//! | `sheet`       | relay → client   | `cells`             |
//! | `edit cell`   | both             | `number`, `content` |
//! | `delete cell` | both             | `number`            |
//!
//! Cells are addressed by index only. There is no stable cell identity and no
//! version number: two clients that disagree on the number of cells will apply
//! the next event to different cells until a fresh `sheet` arrives.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where an operation came from.
///
/// Local operations are sent to the relay; remote ones were received from it
/// and must not be sent back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Local,
    Remote,
}

/// Ordered cell texts, enough to rebuild a sheet. Results are never transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: Vec<String>,
    /// Display name, carried by starters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Snapshot {
    pub fn new(cells: Vec<String>) -> Self {
        Snapshot { cells, title: None }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Events that change a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Full snapshot, sent by the relay on join.
    #[serde(rename = "sheet")]
    Sheet { cells: Vec<String> },
    #[serde(rename = "edit cell")]
    EditCell { number: usize, content: String },
    #[serde(rename = "delete cell")]
    DeleteCell { number: usize },
}

/// Frames a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Enter a sheet namespace. Must precede every other frame.
    #[serde(rename = "join")]
    Join { sheet: String },
    #[serde(rename = "edit cell")]
    EditCell { number: usize, content: String },
    #[serde(rename = "delete cell")]
    DeleteCell { number: usize },
}

impl ClientMessage {
    /// The sheet event carried by this frame, if any.
    pub fn into_event(self) -> Option<SyncEvent> {
        match self {
            ClientMessage::Join { .. } => None,
            ClientMessage::EditCell { number, content } => {
                Some(SyncEvent::EditCell { number, content })
            }
            ClientMessage::DeleteCell { number } => Some(SyncEvent::DeleteCell { number }),
        }
    }

    /// Wrap an outbound event. Snapshots only flow relay → client.
    pub fn from_event(event: SyncEvent) -> Option<Self> {
        match event {
            SyncEvent::Sheet { .. } => None,
            SyncEvent::EditCell { number, content } => {
                Some(ClientMessage::EditCell { number, content })
            }
            SyncEvent::DeleteCell { number } => Some(ClientMessage::DeleteCell { number }),
        }
    }
}

/// Encode a frame as one JSON line, including the trailing newline.
pub fn encode_line<T: Serialize>(frame: &T) -> Result<String> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}

/// Decode one JSON line (surrounding whitespace is ignored).
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T> {
    Ok(serde_json::from_str(line.trim())?)
}
