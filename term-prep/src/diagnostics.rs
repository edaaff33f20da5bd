//! Run-scoped diagnostics.
//!
//! Profiling and loading report progress, fatal input problems and rejected
//! cells through a [`DiagnosticSink`] handed to them at construction time.
//! Every message has one of three shapes, serialized as
//!
//! ```text
//! {"status":"INFO","descr":"Analyzing data phase 1..."}
//! {"status":"FATAL","descr":"First row is empty, ..."}
//! {"status":"DATA","descr":[12,3]}
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::logging::LogConfig;

/// Maximum number of messages a single run forwards to the log.
pub const MAX_LOGGED_MESSAGES: usize = 1000;

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "descr")]
pub enum Diagnostic {
    /// Progress or informational message.
    #[serde(rename = "INFO")]
    Info(String),
    /// The run cannot continue because of the input.
    #[serde(rename = "FATAL")]
    Fatal(String),
    /// A cell (row, column) was rejected. For truncated rows the column is
    /// the number of fields actually found.
    #[serde(rename = "DATA")]
    DataError(usize, usize),
}

/// Destination for diagnostics produced while profiling or loading.
pub trait DiagnosticSink: Send + Sync {
    /// Records one message.
    fn emit(&self, diagnostic: Diagnostic);

    /// Records an informational message.
    fn info(&self, msg: &str) {
        self.emit(Diagnostic::Info(msg.to_string()));
    }

    /// Records a fatal input problem.
    fn fatal(&self, msg: &str) {
        self.emit(Diagnostic::Fatal(msg.to_string()));
    }

    /// Records a rejected cell.
    fn data_error(&self, row: usize, col: usize) {
        self.emit(Diagnostic::DataError(row, col));
    }
}

/// Forwards diagnostics to `tracing`, dropping everything past
/// [`MAX_LOGGED_MESSAGES`].
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    config: LogConfig,
    emitted: AtomicUsize,
}

impl TracingDiagnostics {
    /// Creates a sink with the given logging configuration.
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            emitted: AtomicUsize::new(0),
        }
    }
}

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Diagnostic::DataError(..) = diagnostic {
            if !self.config.log_data_errors {
                return;
            }
        }
        if self.emitted.fetch_add(1, Ordering::Relaxed) >= MAX_LOGGED_MESSAGES {
            return;
        }
        match diagnostic {
            Diagnostic::Info(msg) => info!(descr = %msg, "status=INFO"),
            Diagnostic::Fatal(msg) => error!(
                descr = %crate::logging::truncate_message(&msg, self.config.max_message_length),
                "status=FATAL"
            ),
            Diagnostic::DataError(row, col) => warn!(row, col, "status=DATA"),
        }
    }
}

/// Writes each diagnostic as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesDiagnostics<W: Write + Send> {
    writer: Mutex<W>,
    emitted: AtomicUsize,
}

impl<W: Write + Send> JsonLinesDiagnostics<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            emitted: AtomicUsize::new(0),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> DiagnosticSink for JsonLinesDiagnostics<W> {
    fn emit(&self, diagnostic: Diagnostic) {
        if self.emitted.fetch_add(1, Ordering::Relaxed) >= MAX_LOGGED_MESSAGES {
            return;
        }
        let line = match serde_json::to_string(&diagnostic) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize diagnostic");
                return;
            }
        };
        if let Ok(mut w) = self.writer.lock() {
            // diagnostics are best effort; a closed stderr must not abort a load
            let _ = writeln!(w, "{line}");
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    messages: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn messages(&self) -> Vec<Diagnostic> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded (row, col) data errors.
    pub fn data_errors(&self) -> Vec<(usize, usize)> {
        self.messages()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::DataError(row, col) => Some((row, col)),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(diagnostic);
        }
    }
}
