//! Line-delimited stdio transport to a plugin process.
//!
//! Requests are written to the child's stdin as single newline-terminated
//! lines and flushed immediately. Responses are read from the child's stdout
//! by a background thread that forwards complete lines over a channel, which
//! lets [`Transport::receive`] enforce a deadline on an otherwise blocking
//! read.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{ChildStdin, ChildStdout};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::TransportError;

/// One-line-out/one-line-in message exchange with a plugin process.
///
/// Implemented by [`LineTransport`] in production; tests substitute scripted
/// doubles.
pub trait Transport {
    /// Sends one payload line, terminated by a newline and flushed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if writing to the child fails.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Receives the next response line, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TimedOut`] when the deadline expires,
    /// [`TransportError::Closed`] when the child closed its output stream,
    /// and [`TransportError::Io`] when reading failed.
    fn receive(&mut self, timeout: Duration) -> Result<String, TransportError>;
}

/// Production transport over a child process's standard streams.
pub struct LineTransport {
    writer: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
}

impl LineTransport {
    /// Creates a transport from captured child stream handles.
    #[must_use]
    pub fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            writer: stdin,
            lines: spawn_reader(stdout),
        }
    }
}

impl Transport for LineTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(payload)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<String, TransportError> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(error)) => Err(TransportError::Io(error)),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::TimedOut { timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl std::fmt::Debug for LineTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTransport").finish_non_exhaustive()
    }
}

/// Forwards complete stdout lines to the returned receiver until EOF.
///
/// Dropping all senders on EOF is what turns a dead child into
/// [`TransportError::Closed`] on the receive side.
fn spawn_reader(stdout: impl Read + Send + 'static) -> Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for read in reader.lines() {
            if let Ok(text) = &read {
                // Stray blank lines are not part of the protocol.
                if text.trim().is_empty() {
                    continue;
                }
            }
            let failed = read.is_err();
            if tx.send(read).is_err() || failed {
                return;
            }
        }
    });
    rx
}
