use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedBox;

/// One detection as reported by the inference engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Normalized box, origin bottom-left.
    #[serde(rename = "box")]
    pub normalized_box: NormalizedBox,
    pub confidence: f32,
    /// Top-ranked class label; absent for unclassified proposals.
    #[serde(default)]
    pub label: Option<String>,
}

impl RawDetection {
    pub fn new(normalized_box: NormalizedBox, confidence: f32, label: Option<&str>) -> Self {
        Self {
            normalized_box,
            confidence,
            label: label.map(str::to_string),
        }
    }
}
