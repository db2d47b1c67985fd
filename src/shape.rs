//! Normalization of the remote endpoint's response body.
//!
//! Inference servers in the wild answer with one of several JSON layouts.
//! Each accepted layout is a [`ResponseShape`] variant; [`ResponseShape::detect`]
//! tries them in priority order and the first one that matches wins.

use serde_json::Value;
use tracing::warn;

use crate::errors::PredictionError;
use crate::models::PredictionResult;

#[derive(Debug, PartialEq)]
pub enum ResponseShape<'a> {
    /// `{ "predictions": [{ "label": .., "probability": .. }, ..] }`
    Predictions { first: &'a Value },
    /// `{ "top_k": ["..", ..], "probs": [.., ..] }`
    TopK { label: &'a Value, probs: Option<&'a Value> },
    /// `{ "class": "..", "confidence": 0..100 }`
    Class { class: &'a str, confidence: Option<&'a Value> },
    /// `{ "label": "..", "probability": .. }`
    Label { label: &'a str, probability: Option<&'a Value> },
}

impl<'a> ResponseShape<'a> {
    pub fn detect(data: &'a Value) -> Option<Self> {
        let first_of = |key: &str| {
            data.get(key)
                .and_then(Value::as_array)
                .and_then(|items| items.first())
        };

        if let Some(first) = first_of("predictions") {
            return Some(Self::Predictions { first });
        }
        if let Some(label) = first_of("top_k") {
            return Some(Self::TopK {
                label,
                probs: data.get("probs"),
            });
        }
        if let Some(class) = data.get("class").and_then(Value::as_str) {
            return Some(Self::Class {
                class,
                confidence: data.get("confidence"),
            });
        }
        if let Some(label) = data.get("label").and_then(Value::as_str) {
            return Some(Self::Label {
                label,
                probability: data.get("probability"),
            });
        }
        None
    }

    pub fn into_result(self) -> Result<PredictionResult, PredictionError> {
        let (label, probability) = match self {
            Self::Predictions { first } => (
                first.get("label").and_then(Value::as_str),
                first.get("probability").and_then(Value::as_f64),
            ),
            Self::TopK { label, probs } => (
                label.as_str(),
                probs
                    .and_then(Value::as_array)
                    .and_then(|p| p.first())
                    .and_then(Value::as_f64),
            ),
            Self::Class { class, confidence } => (
                Some(class),
                confidence.and_then(Value::as_f64).map(|c| c / 100.0),
            ),
            Self::Label { label, probability } => {
                (Some(label), probability.and_then(Value::as_f64))
            }
        };

        let label = label
            .filter(|l| !l.trim().is_empty())
            .ok_or(PredictionError::UnrecognizedShape)?;

        Ok(PredictionResult::new(label, probability.map(unit_interval)))
    }
}

fn unit_interval(p: f64) -> f64 {
    if (0.0..=1.0).contains(&p) {
        return p;
    }
    warn!(probability = p, "probability outside [0, 1], clamping");
    p.clamp(0.0, 1.0)
}

/// Map a parsed response body to a prediction.
pub fn normalize(data: &Value) -> Result<PredictionResult, PredictionError> {
    ResponseShape::detect(data)
        .ok_or(PredictionError::UnrecognizedShape)?
        .into_result()
}
