//! # vidsense Diagnostics
//!
//! Logging for the vidsense detection client: `tracing` subscriber set-up and the
//! severity-tagged log shown to the user.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod log_sink;

// Re-export main types
pub use debug_logger::init_logging;
pub use log_sink::{LogEntry, LogRecord, LogSink};

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use vidsense_core::{Severity, VidsenseError};

    #[test]
    fn test_entries_carry_severity() {
        let (sink, mut rx) = LogSink::channel();
        sink.info("Starting video");
        sink.warning("Answer dropped");
        sink.error("Camera unavailable");

        let severities: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|record| match record {
                LogRecord::Entry(entry) => entry.severity,
                LogRecord::Cleared => panic!("unexpected clear"),
            })
            .collect();
        assert_eq!(
            severities,
            vec![Severity::Info, Severity::Warning, Severity::Error]
        );
    }

    #[test]
    fn test_report_uses_error_severity() {
        let (sink, mut rx) = LogSink::channel();
        sink.report(&VidsenseError::NoDeviceSelected);
        sink.report(&VidsenseError::Transport {
            reason: "socket closed".to_string(),
        });

        match rx.try_recv().unwrap() {
            LogRecord::Entry(entry) => {
                assert_eq!(entry.severity, Severity::Warning);
                assert!(entry.message.contains("NO_DEVICE_SELECTED"));
            }
            other => panic!("unexpected record {:?}", other),
        }
        match rx.try_recv().unwrap() {
            LogRecord::Entry(entry) => assert_eq!(entry.severity, Severity::Error),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_clear_record() {
        let (sink, mut rx) = LogSink::channel();
        sink.clear();
        assert_eq!(rx.try_recv().unwrap(), LogRecord::Cleared);
    }

    #[test]
    fn test_closed_receiver_is_harmless() {
        let (sink, rx) = LogSink::channel();
        drop(rx);
        sink.error("nobody is listening");
        sink.clear();
        LogSink::disabled().info("mirrored only");
    }

    #[test]
    fn test_entry_display() {
        let (sink, mut rx) = LogSink::channel();
        sink.info("hello");
        let LogRecord::Entry(entry) = rx.try_recv().unwrap() else {
            panic!("expected entry");
        };
        assert!(entry.to_string().ends_with("info: hello"));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        assert_ok!(init_logging("debug"));
        assert_eq!(assert_ok!(init_logging("debug")), false);
    }

    #[test]
    fn test_init_logging_rejects_bad_filter() {
        if std::env::var("RUST_LOG").is_err() {
            assert_err!(init_logging("vidsense=notalevel"));
        }
    }
}
