use std::sync::{PoisonError, RwLock};

use super::{Writer, WriterError};

/// A writer that keeps every line in memory.
///
/// Primarily useful for tests: meters can be exercised against a `MemoryWriter` and the resulting lines asserted on
/// directly.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    lines: RwLock<Vec<String>>,
}

impl MemoryWriter {
    /// Creates an empty `MemoryWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all lines written so far, in the order they were written.
    ///
    /// The snapshot is a copy: later writes or resets do not affect it.
    pub fn lines(&self) -> Vec<String> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the most recently written line, if any.
    pub fn last_line(&self) -> Option<String> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    /// Returns the number of lines written so far.
    pub fn len(&self) -> usize {
        self.lines.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no lines have been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all lines.
    pub fn reset(&self) {
        self.lines.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Writer for MemoryWriter {
    fn write(&self, line: &str) {
        self.lines.write().unwrap_or_else(PoisonError::into_inner).push(line.to_string());
    }

    fn close(&self) -> Result<(), WriterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::MemoryWriter;
    use crate::writer::Writer;

    #[test]
    fn keeps_lines_in_order() {
        let writer = MemoryWriter::new();
        assert!(writer.is_empty());
        assert_eq!(writer.last_line(), None);

        writer.write("c:one:1");
        writer.write("c:two:1");

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.lines(), vec!["c:one:1".to_string(), "c:two:1".to_string()]);
        assert_eq!(writer.last_line().as_deref(), Some("c:two:1"));
    }

    #[test]
    fn snapshots_are_copies() {
        let writer = MemoryWriter::new();
        writer.write("c:one:1");

        let snapshot = writer.lines();
        writer.write("c:two:1");
        writer.reset();

        assert_eq!(snapshot, vec!["c:one:1".to_string()]);
    }

    #[test]
    fn reset_clears() {
        let writer = MemoryWriter::new();
        writer.write("c:one:1");
        writer.reset();
        assert!(writer.lines().is_empty());

        writer.write("c:two:1");
        assert_eq!(writer.lines(), vec!["c:two:1".to_string()]);
    }

    #[test]
    fn concurrent_writes_are_not_lost() {
        const THREADS: usize = 64;

        let writer = Arc::new(MemoryWriter::new());
        let handles = (0..THREADS)
            .map(|i| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || writer.write(&format!("c:thread_{i}:1")))
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = writer.lines();
        assert_eq!(lines.len(), THREADS);

        let expected = (0..THREADS).map(|i| format!("c:thread_{i}:1")).collect::<HashSet<_>>();
        assert_eq!(lines.into_iter().collect::<HashSet<_>>(), expected);

        writer.reset();
        assert!(writer.lines().is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let writer = MemoryWriter::new();
        assert!(writer.close().is_ok());
        assert!(writer.close().is_ok());
    }
}
