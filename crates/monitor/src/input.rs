//! JSON-lines input from the vision pipeline

use dms::{AlertLevel, FrameLandmarks};
use serde::Deserialize;

/// One line of session input
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    /// `{"manualAlert": 2}`
    Manual {
        #[serde(rename = "manualAlert")]
        manual_alert: AlertLevel,
    },
    /// Landmarks of one frame; no points means no face
    Frame(FrameLandmarks),
    /// `null`
    NoFace,
}

/// Parse a line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<InputLine>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame() {
        let line = r#"{"timestamp_ms":40,"points":[{"x":0.1,"y":0.2,"z":0.0}]}"#;
        match parse_line(line).unwrap() {
            Some(InputLine::Frame(frame)) => {
                assert_eq!(frame.timestamp_ms, 40);
                assert_eq!(frame.points.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn parses_manual_alert() {
        match parse_line(r#"{"manualAlert":3}"#).unwrap() {
            Some(InputLine::Manual { manual_alert }) => {
                assert_eq!(manual_alert, AlertLevel::Critical)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn null_means_no_face() {
        assert!(matches!(parse_line("null").unwrap(), Some(InputLine::NoFace)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line("[1, 2]").is_err());
    }
}
