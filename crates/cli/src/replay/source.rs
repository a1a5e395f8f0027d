//! JSON-lines event source

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use contracts::LifecycleEvent;
use tracing::{debug, warn};

use crate::error::CliError;

/// How often a waiting reader re-checks the stop flag
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lines read ahead of the replay loop
const READ_AHEAD_LINES: usize = 64;

/// Reads one `LifecycleEvent` per line
///
/// Lines are read on a background thread so a stop request is honoured
/// even while the underlying stream (typically stdin) has nothing to read.
/// Blank lines are skipped; lines that do not parse are logged, counted and
/// skipped.
pub struct EventSource {
    name: String,
    lines: Receiver<io::Result<String>>,
    line_no: usize,
    malformed: u64,
}

impl EventSource {
    /// Open a file, or stdin when the path is "-"
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let name = path.display().to_string();
        if name == "-" {
            return Self::from_reader("stdin", BufReader::new(io::stdin()));
        }

        let file = File::open(path).map_err(|e| CliError::event_source(&name, e))?;
        Self::from_reader(name, BufReader::new(file))
    }

    /// Start reading `reader` on a dedicated `event-source` thread
    ///
    /// The thread stops at end of stream, on the first read error, or once
    /// the source is dropped and its next line has nowhere to go.
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl BufRead + Send + 'static,
    ) -> Result<Self, CliError> {
        let name = name.into();
        let (tx, lines) = mpsc::sync_channel(READ_AHEAD_LINES);

        let thread_source = name.clone();
        thread::Builder::new()
            .name("event-source".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
                debug!(source = %thread_source, "Event source reader stopped");
            })
            .map_err(|e| CliError::event_source(&name, e))?;

        Ok(Self {
            name,
            lines,
            line_no: 0,
            malformed: 0,
        })
    }

    /// Next well-formed event, or `None` at end of stream or once `stop` is set
    pub fn next_event(&mut self, stop: &AtomicBool) -> Result<Option<LifecycleEvent>, CliError> {
        loop {
            if stop.load(Ordering::Acquire) {
                return Ok(None);
            }

            let line = match self.lines.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(line) => line?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str(line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    self.malformed += 1;
                    warn!(
                        source = %self.name,
                        line = self.line_no,
                        error = %e,
                        "Skipping malformed event"
                    );
                }
            }
        }
    }

    /// Lines skipped because they did not parse
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

/// Reader fed through a channel; blocks while the channel is empty and
/// reports end of stream once every sender is gone
#[cfg(test)]
pub(crate) struct ChannelReader(pub(crate) mpsc::Receiver<Vec<u8>>);

#[cfg(test)]
impl io::Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.recv() {
            Ok(bytes) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Err(_) => Ok(0),
        }
    }
}
