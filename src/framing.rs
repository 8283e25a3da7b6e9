//! Wire framing: `u32 big-endian length || protobuf bytes`.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. The parser
//! accumulates raw socket reads and extracts complete frames through a
//! two-state machine:
//! - `WaitingForLength`: need at least 4 bytes
//! - `WaitingForPayload`: length parsed, need N more payload bytes
//!
//! No partial frame is ever handed out.

use bytes::{Bytes, BytesMut};

use crate::error::{PluginError, Result};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum frame size (16 MB). Anything larger on this protocol
/// is a corrupted stream, not a real message.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Parsing state.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the complete 4-byte length prefix.
    WaitingForLength,
    /// Prefix parsed, waiting for the payload bytes.
    WaitingForPayload { remaining: usize },
}

/// Accumulator that turns an arbitrarily chunked byte stream back into
/// whole frames.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_frame_size: u32,
}

impl FrameBuffer {
    /// Create a frame buffer with the default size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a frame buffer with a custom size limit.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForLength,
            max_frame_size,
        }
    }

    /// Push raw bytes and extract every frame they complete.
    ///
    /// Partial data stays buffered for the next push. Returns an error
    /// only when a declared length exceeds the size limit, which is a
    /// protocol-fatal condition.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::WaitingForLength => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let length = u32::from_be_bytes(
                    self.buffer[..LENGTH_PREFIX_SIZE]
                        .try_into()
                        .expect("buffer holds the full prefix"),
                );
                if length > self.max_frame_size {
                    return Err(PluginError::Read(format!(
                        "frame length {} exceeds maximum {}",
                        length, self.max_frame_size
                    )));
                }

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                if length == 0 {
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForPayload {
                    remaining: length as usize,
                };
                self.try_extract_one()
            }

            State::WaitingForPayload { remaining } => {
                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(remaining).freeze();
                self.state = State::WaitingForLength;
                Ok(Some(payload))
            }
        }
    }

    /// Number of buffered bytes not yet part of a complete frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer holds no partial data.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a complete frame as a contiguous byte vector.
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}
