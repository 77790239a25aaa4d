//! User-visible log
//!
//! Every report the client makes to the person in front of it goes through one
//! [`LogSink`]. Entries are mirrored to `tracing` at the matching level and delivered
//! to whoever renders the log (a text area in the page, a terminal, a test).

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use vidsense_core::{Severity, VidsenseError};

/// One line of the user-visible log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Severity tag
    pub severity: Severity,
    /// Message text
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity,
            self.message
        )
    }
}

/// What the log renderer receives
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// Append an entry
    Entry(LogEntry),
    /// Wipe the visible log
    Cleared,
}

/// Handle for writing to the user-visible log
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: Option<mpsc::UnboundedSender<LogRecord>>,
}

impl LogSink {
    /// Create a sink and the receiver its records are delivered to
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that only mirrors to `tracing`
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Record an informational entry
    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message.into());
    }

    /// Record a warning
    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message.into());
    }

    /// Record an error
    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message.into());
    }

    /// Record an error at the severity it carries
    pub fn report(&self, err: &VidsenseError) {
        self.log(err.severity(), format!("{} ({})", err, err.error_code()));
    }

    /// Wipe the visible log
    pub fn clear(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(LogRecord::Cleared);
        }
    }

    fn log(&self, severity: Severity, message: String) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
        if let Some(tx) = &self.tx {
            // A closed renderer must never break the caller
            let _ = tx.send(LogRecord::Entry(LogEntry {
                timestamp: Utc::now(),
                severity,
                message,
            }));
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::disabled()
    }
}
