//! Dedicated writer task: the serialized write half of the socket.
//!
//! Every outbound message is framed up front and handed to a single
//! task through an mpsc channel, so frame writes are atomic — the
//! 4-byte length prefix and its payload are always submitted together
//! and frames from concurrent handlers never interleave.
//!
//! ```text
//! handler 1 ─┐
//! handler 2 ─┼─► mpsc::Sender<OutboundFrame> ─► writer task ─► socket
//! engine    ─┘
//! ```
//!
//! The task batches frames that are already queued and writes them with
//! vectored I/O to keep syscall counts down.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PluginError, Result};
use crate::framing::LENGTH_PREFIX_SIZE;

/// Channel capacity for the outbound frame queue.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Maximum frames coalesced into a single vectored write.
const MAX_BATCH_SIZE: usize = 64;

/// A message framed and ready to go on the wire.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Pre-encoded big-endian length prefix.
    prefix: [u8; LENGTH_PREFIX_SIZE],
    /// Encoded message bytes.
    payload: Bytes,
}

impl OutboundFrame {
    /// Frame an encoded message.
    pub fn new(payload: Bytes) -> Self {
        Self {
            prefix: (payload.len() as u32).to_be_bytes(),
            payload,
        }
    }

    /// Total size on the wire (prefix + payload).
    #[inline]
    pub fn size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

/// Handle for queueing frames onto the writer task.
pub type FrameSender = mpsc::Sender<OutboundFrame>;

/// Spawn the writer task over the socket's write half.
///
/// The task exits cleanly when every `FrameSender` clone is dropped,
/// and with an error when the socket write side fails.
pub fn spawn_writer_task<W>(writer: W) -> (FrameSender, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer));
    (tx, task)
}

/// Main writer loop: drain the channel, batch, write.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(frame) => frame,
            // Channel closed, clean shutdown.
            None => return Ok(()),
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(frame) => batch.push(frame),
                Err(_) => break,
            }
        }

        write_batch(&mut writer, &batch).await?;
    }
}

/// Write a batch of frames with vectored I/O, handling partial writes.
async fn write_batch<W>(writer: &mut W, batch: &[OutboundFrame]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if batch.is_empty() {
        return Ok(());
    }

    let total_size: usize = batch.iter().map(|f| f.size()).sum();
    let mut total_written = 0;

    while total_written < total_size {
        let slices = build_remaining_slices(batch, total_written);
        let written = writer
            .write_vectored(&slices)
            .await
            .map_err(|e| PluginError::Write(e.to_string()))?;
        if written == 0 {
            return Err(PluginError::Write("write_vectored returned 0".to_string()));
        }
        total_written += written;
    }

    writer
        .flush()
        .await
        .map_err(|e| PluginError::Write(e.to_string()))
}

/// Build the IoSlice array for the data not yet written.
fn build_remaining_slices(batch: &[OutboundFrame], skip_bytes: usize) -> Vec<IoSlice<'_>> {
    let mut slices = Vec::with_capacity(batch.len() * 2);
    let mut skipped = 0;

    for frame in batch {
        let prefix_end = skipped + LENGTH_PREFIX_SIZE;
        if skip_bytes < prefix_end {
            let start = skip_bytes.saturating_sub(skipped);
            slices.push(IoSlice::new(&frame.prefix[start..]));
        }
        skipped = prefix_end;

        if !frame.payload.is_empty() {
            let payload_end = skipped + frame.payload.len();
            if skip_bytes < payload_end {
                let start = skip_bytes.saturating_sub(skipped);
                slices.push(IoSlice::new(&frame.payload[start..]));
            }
            skipped = payload_end;
        }
    }

    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_outbound_frame_prefix() {
        let frame = OutboundFrame::new(Bytes::from_static(b"hello"));
        assert_eq!(frame.prefix, [0, 0, 0, 5]);
        assert_eq!(frame.size(), LENGTH_PREFIX_SIZE + 5);
    }

    #[test]
    fn test_outbound_frame_empty() {
        let frame = OutboundFrame::new(Bytes::new());
        assert_eq!(frame.prefix, [0, 0, 0, 0]);
        assert_eq!(frame.size(), LENGTH_PREFIX_SIZE);
    }

    #[tokio::test]
    async fn test_single_frame_reaches_peer_intact() {
        let (client, mut server) = duplex(4096);
        let (tx, _task) = spawn_writer_task(client);

        tx.send(OutboundFrame::new(Bytes::from_static(b"hello")))
            .await
            .unwrap();

        let mut buf = vec![0u8; 64];
        tokio::time::sleep(Duration::from_millis(10)).await;
        let n = server.read(&mut buf).await.unwrap();

        assert_eq!(&buf[..n], b"\x00\x00\x00\x05hello");
    }

    #[tokio::test]
    async fn test_frames_never_interleave() {
        let (client, mut server) = duplex(64 * 1024);
        let (tx, _task) = spawn_writer_task(client);

        for i in 0..20u8 {
            let payload = Bytes::from(vec![i; 32]);
            tx.send(OutboundFrame::new(payload)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut parser = crate::framing::FrameBuffer::new();
        let mut buf = vec![0u8; 8192];
        let mut frames = Vec::new();
        while frames.len() < 20 {
            let n = server.read(&mut buf).await.unwrap();
            frames.extend(parser.push(&buf[..n]).unwrap());
        }

        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(&frame[..], vec![i as u8; 32].as_slice());
        }
    }

    #[tokio::test]
    async fn test_writer_shutdown_on_channel_close() {
        let (client, _server) = duplex(4096);
        let (tx, task) = spawn_writer_task(client);

        drop(tx);

        let result = task.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_write_batch_multiple() {
        let mut buf = Cursor::new(Vec::new());
        let batch: Vec<_> = (0..5u8)
            .map(|i| OutboundFrame::new(Bytes::from(vec![i; 3])))
            .collect();

        write_batch(&mut buf, &batch).await.unwrap();

        assert_eq!(buf.into_inner().len(), 5 * (LENGTH_PREFIX_SIZE + 3));
    }

    #[test]
    fn test_build_remaining_slices_partial_prefix() {
        let batch = vec![OutboundFrame::new(Bytes::from_static(b"hello"))];

        let slices = build_remaining_slices(&batch, 2);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), LENGTH_PREFIX_SIZE - 2);
        assert_eq!(slices[1].len(), 5);
    }

    #[test]
    fn test_build_remaining_slices_skip_into_payload() {
        let batch = vec![OutboundFrame::new(Bytes::from_static(b"hello"))];

        let slices = build_remaining_slices(&batch, LENGTH_PREFIX_SIZE + 3);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].len(), 2);
    }
}
