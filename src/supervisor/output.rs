//! Bounded, mutex-guarded line buffer shared between a capture task and the UI

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct OutputLines {
    lines: VecDeque<String>,
    max_lines: usize,
    dropped: u64,
}

/// Read side of a server's captured output. Cheap to clone; never mutates the contents.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    inner: Arc<Mutex<OutputLines>>,
}

/// The single write side of a buffer, owned by one capture task. Not `Clone`.
#[derive(Debug)]
pub struct OutputWriter {
    inner: Arc<Mutex<OutputLines>>,
}

/// Create a fresh buffer and its only writer
pub fn buffer(max_lines: usize) -> (OutputBuffer, OutputWriter) {
    let inner = Arc::new(Mutex::new(OutputLines {
        lines: VecDeque::new(),
        max_lines: max_lines.max(1),
        dropped: 0,
    }));

    (
        OutputBuffer {
            inner: Arc::clone(&inner),
        },
        OutputWriter { inner },
    )
}

fn lock(inner: &Mutex<OutputLines>) -> MutexGuard<'_, OutputLines> {
    // every update is a single push/pop, so a poisoned guard is still consistent
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OutputBuffer {
    /// Buffer with no writer, used before a server is first started
    pub fn empty(max_lines: usize) -> Self {
        buffer(max_lines).0
    }

    /// Current contents joined by newlines
    pub fn snapshot(&self) -> String {
        let guard = lock(&self.inner);
        guard
            .lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Last `n` lines, oldest first
    pub fn tail(&self, n: usize) -> Vec<String> {
        let guard = lock(&self.inner);
        let skip = guard.lines.len().saturating_sub(n);
        guard.lines.iter().skip(skip).cloned().collect()
    }

    pub fn line_count(&self) -> usize {
        lock(&self.inner).lines.len()
    }

    /// Lines discarded because the buffer was full
    pub fn dropped_lines(&self) -> u64 {
        lock(&self.inner).dropped
    }
}

impl OutputWriter {
    pub fn push_line(&self, line: String) {
        let mut guard = lock(&self.inner);
        if guard.lines.len() >= guard.max_lines {
            guard.lines.pop_front();
            guard.dropped += 1;
        }
        guard.lines.push_back(line);
    }
}
