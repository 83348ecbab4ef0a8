//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Canvas width and snapping tolerance. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// The palette column is laid out against the right edge.
    pub canvas_width: f64,
    /// Squared distance within which a drag locks onto a connection point.
    pub snap_range: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            snap_range: 100.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let c = EditorConfig::from_json(r#"{"canvas_width": 1024}"#).unwrap();
        assert_eq!(c.canvas_width, 1024.0);
        assert_eq!(c.snap_range, 100.0);
        assert!(EditorConfig::from_json("[").is_err());
        // Unknown keys are ignored rather than rejected.
        assert_eq!(EditorConfig::from_json(r#"{"canvas_height": 600}"#).unwrap(), EditorConfig::default());
    }
}
