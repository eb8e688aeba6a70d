//! Connection handler double for listener tests.

use std::io::{BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

use super::{ConnectionHandler, ConnectionStream};

/// Reads one line per connection, records it, and answers `ack`.
#[derive(Default)]
pub(crate) struct LineRecorder {
    lines: Mutex<Vec<String>>,
}

impl LineRecorder {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("recorder mutex poisoned").clone()
    }
}

impl ConnectionHandler for LineRecorder {
    fn handle(&self, stream: ConnectionStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return;
        }
        self.lines
            .lock()
            .expect("recorder mutex poisoned")
            .push(line.trim_end().to_owned());
        reader.get_mut().write_all(b"ack\n").ok();
    }
}
