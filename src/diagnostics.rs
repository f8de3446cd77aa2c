//! Diagnostic sink consumed by the reconciliation core.
//!
//! The reconciler and merger never touch the global logger. They report what
//! they observe through a [`Diagnostics`] implementation owned by the caller:
//! [`LogDiagnostics`] forwards to the `log` facade, [`RecordingDiagnostics`]
//! keeps the messages in memory.

use std::cell::RefCell;

use log::Level;

const TARGET: &str = "table_audit::diagnostics";

pub trait Diagnostics {
    fn emit(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: TARGET, level, "{message}");
    }
}

#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: RefCell<Vec<(Level, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries.borrow().clone()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}
