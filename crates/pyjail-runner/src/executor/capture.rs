//! Bounded capture of child output.

use std::io::Read;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const CHUNK_BYTES: usize = 8 * 1024;

/// Bytes kept from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Captured {
    pub(crate) bytes: Vec<u8>,
    pub(crate) truncated: bool,
}

impl Captured {
    pub(crate) fn into_text(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Background reader that keeps the first `cap` bytes and discards the rest,
/// so the child never blocks on a full pipe.
#[derive(Debug)]
pub(crate) struct CaptureHandle {
    buffer: Arc<Mutex<Captured>>,
    finished: Receiver<()>,
}

impl CaptureHandle {
    pub(crate) fn spawn(stream: Option<impl Read + Send + 'static>, cap: usize) -> Self {
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let (done, finished) = mpsc::channel();
        if let Some(reader) = stream {
            let shared = Arc::clone(&buffer);
            thread::spawn(move || {
                read_bounded(reader, cap, &shared);
                done.send(()).ok();
            });
        }
        Self { buffer, finished }
    }

    /// Waits up to `patience` for end of stream, then returns what was
    /// captured so far.
    pub(crate) fn finish(self, patience: Duration) -> Captured {
        self.finished.recv_timeout(patience).ok();
        let captured = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        captured.clone()
    }
}

fn read_bounded(mut reader: impl Read, cap: usize, buffer: &Mutex<Captured>) {
    let mut chunk = [0_u8; CHUNK_BYTES];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        let mut captured = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let room = cap.saturating_sub(captured.bytes.len());
        let kept = read.min(room);
        captured
            .bytes
            .extend(chunk.iter().take(kept).copied());
        if kept < read {
            captured.truncated = true;
        }
    }
}
