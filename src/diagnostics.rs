//! Diagnostic sink passed into each import component.
//!
//! Components never log through a global; they hold an
//! `Arc<dyn Diagnostics>`. The binary uses [`TracingDiagnostics`], tests use
//! [`CapturedDiagnostics`] to assert on what was reported.

use std::sync::{Arc, Mutex};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
}

pub trait Diagnostics: Send + Sync {
    fn emit(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }
}

/// Forwards every diagnostic to a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl TracingDiagnostics {
    pub fn shared() -> Arc<dyn Diagnostics> {
        Arc::new(Self)
    }
}

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!(target: "wp_sql_import", "{}", message),
            Level::Info => tracing::info!(target: "wp_sql_import", "{}", message),
            Level::Warn => tracing::warn!(target: "wp_sql_import", "{}", message),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CapturedDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl CapturedDiagnostics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Messages reported at exactly `level`, in emission order.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Diagnostics for CapturedDiagnostics {
    fn emit(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}
