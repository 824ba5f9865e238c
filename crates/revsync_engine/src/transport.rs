//! Byte channel between the two sides of a sync.
//!
//! A [`Channel`] pairs a reader and a writer: stdin/stdout of a spawned
//! command, a socket, or the in-memory pipes used by tests. Output is
//! buffered so a whole query frontier goes out in one write, and the buffer
//! is flushed before every blocking read so the two sides never wait on each
//! other.

use crate::error::{SyncError, SyncResult};
use revsync_protocol::{ControlMessage, Frame, PayloadReader, PayloadWriter};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};

/// A bidirectional, ordered byte channel.
#[derive(Debug)]
pub struct Channel<R: Read, W: Write> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
}

impl<R: Read, W: Write> Channel<R, W> {
    /// Creates a channel over a reader and a writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        }
    }

    /// Queues a frame for sending.
    pub fn write_frame(&mut self, frame: &Frame) -> SyncResult<()> {
        frame.write_to(&mut self.writer)?;
        Ok(())
    }

    /// Flushes pending output, then reads the next frame.
    pub fn read_frame(&mut self) -> SyncResult<Frame> {
        self.flush()?;
        Ok(Frame::read_from(&mut self.reader)?)
    }

    /// Reads the next frame and fails unless it equals `expected`.
    pub fn expect_frame(&mut self, expected: Frame) -> SyncResult<()> {
        let frame = self.read_frame()?;
        if frame == expected {
            Ok(())
        } else {
            Err(SyncError::unexpected(expected.name(), frame.name()))
        }
    }

    /// Sends a control message and flushes.
    pub fn send(&mut self, message: &ControlMessage) -> SyncResult<()> {
        message.write_to(&mut self.writer)?;
        self.flush()
    }

    /// Flushes pending output, then reads the next control message.
    pub fn recv(&mut self) -> SyncResult<ControlMessage> {
        self.flush()?;
        Ok(ControlMessage::read_from(&mut self.reader)?)
    }

    /// Flushes pending output.
    pub fn flush(&mut self) -> SyncResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Starts a chunked payload on the outgoing side.
    pub fn payload_writer(&mut self, chunk_size: usize) -> PayloadWriter<&mut BufWriter<W>> {
        PayloadWriter::new(&mut self.writer, chunk_size)
    }

    /// Flushes pending output and starts reading a chunked payload.
    pub fn payload_reader(&mut self) -> SyncResult<PayloadReader<&mut BufReader<R>>> {
        self.flush()?;
        Ok(PayloadReader::new(&mut self.reader))
    }

    /// Flushes and returns the underlying reader and writer.
    pub fn into_inner(mut self) -> SyncResult<(R, W)> {
        self.flush()?;
        let writer = self
            .writer
            .into_inner()
            .map_err(|e| SyncError::Channel(e.into_error()))?;
        Ok((self.reader.into_inner(), writer))
    }
}

/// Sending half of an in-memory pipe.
#[derive(Debug)]
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Receiving half of an in-memory pipe. Reports end of stream once the
/// writer is dropped and all data was read.
#[derive(Debug)]
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.pos == self.buf.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Creates a unidirectional in-memory pipe.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            buf: Vec::new(),
            pos: 0,
        },
    )
}

/// A channel over in-memory pipes.
pub type MemoryChannel = Channel<PipeReader, PipeWriter>;

/// Creates two connected in-memory channels.
///
/// Each side must run on its own thread; writes never block but reads do.
pub fn memory_duplex() -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = pipe();
    let (b_tx, a_rx) = pipe();
    (Channel::new(a_rx, a_tx), Channel::new(b_rx, b_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_protocol::{ObjectId, Service};

    #[test]
    fn frames_cross_the_duplex() {
        let (mut a, mut b) = memory_duplex();
        let id = ObjectId::from_bytes([0xab; 20]);
        a.write_frame(&Frame::Query(id)).unwrap();
        a.write_frame(&Frame::Transfer).unwrap();
        a.flush().unwrap();

        assert_eq!(b.read_frame().unwrap(), Frame::Query(id));
        b.expect_frame(Frame::Transfer).unwrap();
    }

    #[test]
    fn unexpected_frame_is_a_violation() {
        let (mut a, mut b) = memory_duplex();
        a.write_frame(&Frame::Flip).unwrap();
        a.flush().unwrap();
        let err = b.expect_frame(Frame::Transfer).unwrap_err();
        assert!(
            matches!(err, SyncError::ProtocolViolation(ref m) if m == "expected transfer, found flip")
        );
    }

    #[test]
    fn messages_cross_the_duplex() {
        let (mut a, mut b) = memory_duplex();
        let open = ControlMessage::Open {
            root: "/srv/git".into(),
            service: Service::Sync,
        };
        a.send(&open).unwrap();
        assert_eq!(b.recv().unwrap(), open);
    }

    #[test]
    fn dropped_peer_reads_as_channel_error() {
        let (a, mut b) = memory_duplex();
        drop(a);
        let err = b.read_frame().unwrap_err();
        assert!(matches!(err, SyncError::Channel(_)));
    }

    #[test]
    fn payload_round_trip_keeps_stream_aligned() {
        let (mut a, mut b) = memory_duplex();
        let mut writer = a.payload_writer(4);
        writer.write_all(b"hello payload").unwrap();
        writer.finish().unwrap();
        a.write_frame(&Frame::Flip).unwrap();
        a.flush().unwrap();

        let mut received = Vec::new();
        let mut reader = b.payload_reader().unwrap();
        reader.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"hello payload");
        b.expect_frame(Frame::Flip).unwrap();
    }

    #[test]
    fn pipe_reports_eof_after_writer_drop() {
        let (mut tx, mut rx) = pipe();
        tx.write_all(b"ab").unwrap();
        drop(tx);
        let mut out = Vec::new();
        rx.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ab");
    }
}
