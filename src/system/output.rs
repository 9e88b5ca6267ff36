// src/system/output.rs

//! Byte sinks for MATLAB output and build log lines.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Destination for build log lines and MATLAB process output.
pub type OutputSink = Box<dyn Write + Send>;

/// Writes a line to a log sink. A failing sink never aborts a run.
pub fn write_line(sink: &mut dyn Write, text: &str) {
    if let Err(e) = writeln!(sink, "{}", text).and_then(|_| sink.flush()) {
        log::warn!("Failed to write to build log: {}", e);
    }
}

/// An in-memory sink that stays readable after being handed to a runner.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a boxed handle writing into this same buffer.
    pub fn sink(&self) -> OutputSink {
        Box::new(self.clone())
    }

    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        match self.inner.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_is_visible_through_clones() {
        let buffer = SharedBuffer::new();
        let mut sink = buffer.sink();
        write_line(&mut sink, "hello");
        sink.write_all(b"world").unwrap();
        assert_eq!(buffer.contents(), "hello\nworld");
    }
}
