//! Length-capped JSON-lines reading.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use eecalc_core::sheet::MAX_CELLS;

use crate::error::{RelayError, Result};

/// Longest line a client may send the relay, terminator excluded.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Longest line the relay may send a client. A snapshot carries at most
/// [`MAX_CELLS`] cells, each of which arrived in one client frame.
pub const MAX_SNAPSHOT_FRAME_BYTES: usize = MAX_CELLS * MAX_FRAME_BYTES;

/// Reads newline-terminated frames, refusing any longer than `max` bytes.
///
/// `next_line` is cancel safe: bytes read before a cancelled call are kept
/// and the next call continues the same line.
pub struct FrameReader<R> {
    inner: R,
    max: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, max: usize) -> Self {
        FrameReader {
            inner,
            max,
            buf: Vec::new(),
        }
    }

    /// The next line without its terminator, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let remaining = (self.max + 1).saturating_sub(self.buf.len()) as u64;
        (&mut self.inner)
            .take(remaining)
            .read_until(b'\n', &mut self.buf)
            .await?;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if self.buf.len() > self.max {
            self.buf.clear();
            return Err(RelayError::FrameTooLarge { max: self.max });
        } else if self.buf.is_empty() {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.buf);
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }
}
