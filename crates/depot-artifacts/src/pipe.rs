//! A bounded in-process byte pipe.
//!
//! Archive streaming runs a producer and a consumer on separate threads:
//! one side serializes the tar+gzip stream, the other consumes it. The
//! two are joined by this pipe, a bounded channel of byte chunks with an
//! error lane: a failing producer closes the pipe with its error, and the
//! consumer observes that error from its next read.

use std::io::{self, Read, Write};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Number of in-flight chunks the pipe buffers before writes block.
const PIPE_DEPTH: usize = 16;

type Chunk = io::Result<Vec<u8>>;

/// Create a connected pipe. Dropping the writer signals EOF to the reader;
/// dropping the reader makes subsequent writes fail with `BrokenPipe`.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (sender, receiver) = sync_channel::<Chunk>(PIPE_DEPTH);
    (
        PipeWriter { sender },
        PipeReader {
            receiver,
            buffer: Vec::new(),
            pos: 0,
        },
    )
}

/// Write half of the pipe.
pub struct PipeWriter {
    sender: SyncSender<Chunk>,
}

impl PipeWriter {
    /// Close the pipe with an error. The reader observes the error after
    /// consuming any chunks already in flight.
    pub fn fail(self, error: io::Error) {
        // The reader may already be gone; nothing left to signal then.
        let _ = self.sender.send(Err(error));
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sender
            .send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader was dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read half of the pipe.
pub struct PipeReader {
    receiver: Receiver<Chunk>,
    buffer: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.buffer.len() {
                let n = (self.buffer.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }

            match self.receiver.recv() {
                Ok(Ok(chunk)) => {
                    self.buffer = chunk;
                    self.pos = 0;
                }
                Ok(Err(error)) => return Err(error),
                // All writers dropped: end of stream.
                Err(_) => return Ok(0),
            }
        }
    }
}
