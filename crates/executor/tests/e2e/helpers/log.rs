//! Log capture and ordering assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stagerun_core::{LogSink, Logger, MemorySink};

/// In-memory sink that also counts flushes, so tests can check the log was
/// closed.
#[derive(Debug, Clone, Default)]
pub struct CapturedLog {
    memory: MemorySink,
    flushes: Arc<AtomicUsize>,
}

impl LogSink for CapturedLog {
    fn write(&self, block: &str) {
        self.memory.write(block);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
impl CapturedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(&self) -> Logger {
        Logger::direct(Arc::new(self.clone()))
    }

    pub fn lines(&self) -> Vec<String> {
        self.memory.lines()
    }

    pub fn blocks(&self) -> Vec<String> {
        self.memory.blocks()
    }

    pub fn contents(&self) -> String {
        self.memory.contents()
    }

    pub fn was_closed(&self) -> bool {
        self.flushes.load(Ordering::SeqCst) > 0
    }

    /// Index of the first line starting with `prefix`.
    ///
    /// # Panics
    ///
    /// Panics if no line matches.
    pub fn position(&self, prefix: &str) -> usize {
        let lines = self.lines();
        lines
            .iter()
            .position(|line| line.starts_with(prefix))
            .unwrap_or_else(|| panic!("no log line starts with {prefix:?}; log was:\n{}", lines.join("\n")))
    }

    pub fn contains_line(&self, prefix: &str) -> bool {
        self.lines().iter().any(|line| line.starts_with(prefix))
    }

    /// Asserts the given prefixes appear in this order.
    pub fn assert_order(&self, prefixes: &[&str]) {
        let positions: Vec<usize> = prefixes.iter().map(|p| self.position(p)).collect();
        for pair in positions.windows(2) {
            assert!(
                pair[0] < pair[1],
                "expected log order {prefixes:?}, got positions {positions:?}; log was:\n{}",
                self.contents()
            );
        }
    }
}
