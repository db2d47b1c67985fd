use serde::{Deserialize, Serialize};

/// One uploaded image, held in memory for the length of a single predict call.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PredictionRequest {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Normalized classification outcome.
///
/// `label` is never empty and `probability`, when present, is within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub probability: Option<f64>,
}

impl PredictionResult {
    pub fn new(label: impl Into<String>, probability: Option<f64>) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }

    /// Label followed by the rounded percentage, e.g. `Blight (87%)`.
    pub fn display_text(&self) -> String {
        match self.probability {
            Some(p) => format!("{} ({}%)", self.label, (p * 100.0).round() as i64),
            None => self.label.clone(),
        }
    }
}

/// The two text slots shown by the widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySlots {
    pub prediction: String,
    pub remedies: String,
}

impl DisplaySlots {
    pub fn new(prediction: impl Into<String>, remedies: impl Into<String>) -> Self {
        Self {
            prediction: prediction.into(),
            remedies: remedies.into(),
        }
    }
}
