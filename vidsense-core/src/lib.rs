//! # vidsense Core
//!
//! Shared foundation of the vidsense detection client: the error taxonomy every
//! component reports through, the session identity used to isolate clients sharing a
//! relay, the session tokens that invalidate stale asynchronous work, and the detection
//! event data model.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod detection;
pub mod error;
pub mod session;

// Re-export main types
pub use detection::{BoundingBox, Detection, DetectionEvent};
pub use error::{ErrorCategory, Severity, VidsenseError};
pub use session::{SessionId, SessionToken, TokenGenerator};

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_token_generator_monotonic() {
        let mut tokens = TokenGenerator::new();
        assert!(!tokens.is_current(SessionToken::NONE));

        let first = tokens.bump();
        assert!(tokens.is_current(first));

        let second = tokens.bump();
        assert!(second > first);
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        assert_eq!(tokens.current(), second);
    }

    #[test]
    fn test_session_id_generation() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(a.matches(a.as_str()));
        assert!(!a.matches(b.as_str()));
    }

    #[test]
    fn test_bounding_box_scale() {
        let bbox = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        let scaled = bbox.scale(0.5, 0.5);
        assert_eq!(scaled, BoundingBox::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(scaled.width(), 50.0);
        assert_eq!(scaled.height(), 50.0);
    }

    #[test]
    fn test_detection_label() {
        let mut detection = Detection {
            bounding_box: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            confidence: 0.876,
            class_id: 0,
            class_name: Some("person".to_string()),
        };
        assert_eq!(detection.label(), "0 person 0.88");

        detection.class_name = None;
        assert_eq!(detection.label(), "0 0.88");
    }

    #[test]
    fn test_detection_event_parse() {
        let raw = r#"{
            "sessionId": "abc",
            "referenceWidth": 640,
            "referenceHeight": 480,
            "detections": [
                {"boundingBox": {"x1": 1, "y1": 2, "x2": 3, "y2": 4}, "confidence": 0.9, "classId": 2, "className": "car"}
            ]
        }"#;

        let event = assert_ok!(DetectionEvent::parse(raw));
        assert_eq!(event.session_id, "abc");
        assert_eq!(event.reference_width, 640.0);
        assert_eq!(event.detections.len(), 1);
        assert_eq!(event.detections[0].class_name.as_deref(), Some("car"));
    }

    #[test]
    fn test_detection_event_snake_case_aliases() {
        let raw = r#"{"session_id": "abc", "reference_width": 320, "reference_height": 240,
            "detections": [{"bbox": {"x1": 0, "y1": 0, "x2": 1, "y2": 1}, "confidence": 0.5, "class_id": 7}]}"#;

        let event = assert_ok!(DetectionEvent::parse(raw));
        assert_eq!(event.detections[0].class_id, 7);
        assert!(event.detections[0].class_name.is_none());
    }

    #[test]
    fn test_detection_event_parse_errors() {
        let err = assert_err!(DetectionEvent::parse("{not json"));
        assert_eq!(err.error_code(), "INVALID_MESSAGE");
        assert_eq!(err.category(), ErrorCategory::Negotiation);

        let zero = r#"{"sessionId": "abc", "referenceWidth": 0, "referenceHeight": 480}"#;
        assert_err!(DetectionEvent::parse(zero));
    }

    #[test]
    fn test_error_taxonomy() {
        let err = VidsenseError::NoDeviceSelected;
        assert_eq!(err.category(), ErrorCategory::UserInput);
        assert_eq!(err.severity(), Severity::Warning);

        let err = VidsenseError::SignalingOutOfOrder {
            message_kind: "ice_candidate".to_string(),
        };
        assert_eq!(err.error_code(), "SIGNALING_OUT_OF_ORDER");
        assert_eq!(err.severity(), Severity::Warning);

        let err = VidsenseError::Teardown {
            resource: "peer connection".to_string(),
            reason: "already closed".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ResourceTeardown);
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.to_string().contains("peer connection"));
    }
}
