//! Chunked framing for the bulk slice payload.
//!
//! After a `Transfer` frame the serializing side streams the slice as
//! chunks: a big-endian `u32` length followed by that many bytes. A zero
//! length ends the payload; [`ABORT_MARKER`] voids it. Readers see a plain
//! byte stream that hits end-of-file at the terminator, so a store can
//! consume "until end of stream" while the channel stays usable afterwards.

use std::io::{self, Read, Write};

/// Default size of one payload chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Largest chunk a reader accepts.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Chunk length announcing that the sender gave up on the payload.
pub const ABORT_MARKER: u32 = u32::MAX;

const END_MARKER: u32 = 0;

/// Writes a payload as length-prefixed chunks.
#[derive(Debug)]
pub struct PayloadWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    chunk_size: usize,
    bytes_written: u64,
}

impl<W: Write> PayloadWriter<W> {
    /// Creates a payload writer emitting chunks of at most `chunk_size` bytes.
    pub fn new(inner: W, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        Self {
            inner,
            buf: Vec::with_capacity(chunk_size),
            chunk_size,
            bytes_written: 0,
        }
    }

    /// Payload bytes accepted so far (excluding chunk headers).
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Emits buffered data and the end marker.
    pub fn finish(mut self) -> io::Result<u64> {
        self.emit()?;
        self.inner.write_all(&END_MARKER.to_be_bytes())?;
        self.inner.flush()?;
        Ok(self.bytes_written)
    }

    /// Drops buffered data and emits the abort marker.
    pub fn abort(mut self) -> io::Result<()> {
        self.buf.clear();
        self.inner.write_all(&ABORT_MARKER.to_be_bytes())?;
        self.inner.flush()
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.inner
            .write_all(&(self.buf.len() as u32).to_be_bytes())?;
        self.inner.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }
}

impl<W: Write> Write for PayloadWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.chunk_size - self.buf.len();
        let taken = data.len().min(room);
        self.buf.extend_from_slice(&data[..taken]);
        self.bytes_written += taken as u64;
        if self.buf.len() == self.chunk_size {
            self.emit()?;
        }
        Ok(taken)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()?;
        self.inner.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Open,
    Finished,
    Aborted,
}

/// Reads a chunked payload, reporting end-of-file at the terminator.
#[derive(Debug)]
pub struct PayloadReader<R: Read> {
    inner: R,
    remaining: usize,
    state: ReadState,
    bytes_read: u64,
}

impl<R: Read> PayloadReader<R> {
    /// Creates a payload reader positioned at the first chunk header.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
            state: ReadState::Open,
            bytes_read: 0,
        }
    }

    /// Payload bytes delivered so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns true once the end marker was read.
    pub fn is_finished(&self) -> bool {
        self.state == ReadState::Finished
    }

    /// Returns true if the sender voided the payload.
    pub fn is_aborted(&self) -> bool {
        self.state == ReadState::Aborted
    }

    /// Discards everything up to the end or abort marker.
    ///
    /// Afterwards the underlying stream is positioned right after the
    /// payload.
    pub fn drain(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 8192];
        loop {
            match self.read(&mut scratch) {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(_) if self.is_aborted() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        let mut header = [0u8; 4];
        self.inner.read_exact(&mut header)?;
        match u32::from_be_bytes(header) {
            END_MARKER => self.state = ReadState::Finished,
            ABORT_MARKER => self.state = ReadState::Aborted,
            len if len as usize > MAX_CHUNK_SIZE => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("payload chunk of {len} bytes exceeds limit"),
                ));
            }
            len => self.remaining = len as usize,
        }
        Ok(())
    }
}

impl<R: Read> Read for PayloadReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.state {
                ReadState::Finished => return Ok(0),
                ReadState::Aborted => {
                    return Err(io::Error::other("payload aborted by sender"));
                }
                ReadState::Open if self.remaining == 0 => self.next_chunk()?,
                ReadState::Open => break,
            }
        }
        let want = buf.len().min(self.remaining);
        let got = self.inner.read(&mut buf[..want])?;
        if got == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside a payload chunk",
            ));
        }
        self.remaining -= got;
        self.bytes_read += got as u64;
        Ok(got)
    }
}
