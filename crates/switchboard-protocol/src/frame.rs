//! Incremental framing: raw stream bytes in, complete frames out.
//!
//! A stream read can return half a frame, several frames glued together,
//! or both. [`FrameReader`] keeps whatever is left after the last
//! terminator and prepends it to the next read, so each frame comes out
//! whole no matter how the transport chunked it.

use crate::codec::TERMINATOR;

/// Default upper bound on a single frame, terminator excluded.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Per-connection frame accumulator.
///
/// Frames longer than the configured maximum are dropped. If the pending
/// partial frame grows past the maximum, its bytes are thrown away and the
/// reader skips input up to the next terminator before framing again, so
/// a peer that never sends a terminator cannot grow the buffer without
/// bound. The number of bytes thrown away is reported by
/// [`take_discarded`](Self::take_discarded).
#[derive(Debug)]
pub struct FrameReader {
    buf: Vec<u8>,
    max_frame_len: usize,
    discarding: bool,
    discarded: usize,
}

impl FrameReader {
    /// Creates a reader with [`DEFAULT_MAX_FRAME_LEN`].
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a reader that drops frames longer than `max_frame_len`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_len,
            discarding: false,
            discarded: 0,
        }
    }

    /// Feeds newly read bytes and returns every frame they complete, in
    /// stream order, without terminators.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut input = bytes;

        if self.discarding {
            match find_terminator(input) {
                Some(pos) => {
                    self.discarded += pos + 1;
                    input = &input[pos + 1..];
                    self.discarding = false;
                }
                None => {
                    self.discarded += input.len();
                    return Vec::new();
                }
            }
        }

        self.buf.extend_from_slice(input);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = find_terminator(&self.buf[start..]) {
            let end = start + offset;
            if end - start > self.max_frame_len {
                self.discarded += end - start + 1;
            } else {
                frames.push(self.buf[start..end].to_vec());
            }
            start = end + 1;
        }
        self.buf.drain(..start);

        if self.buf.len() > self.max_frame_len {
            self.discarded += self.buf.len();
            self.buf.clear();
            self.discarding = true;
        }

        frames
    }

    /// Returns and resets the count of bytes dropped for exceeding the
    /// maximum frame length.
    pub fn take_discarded(&mut self) -> usize {
        std::mem::take(&mut self.discarded)
    }

    /// Bytes of an incomplete frame currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == TERMINATOR)
}
