use crate::errors::PredictionError;
use crate::models::PredictionRequest;

#[derive(Debug)]
pub enum Readiness {
    Ready(PredictionRequest),
    NotReady,
}

impl Readiness {
    pub fn into_result(self) -> Result<PredictionRequest, PredictionError> {
        match self {
            Readiness::Ready(file) => Ok(file),
            Readiness::NotReady => Err(PredictionError::NotReady),
        }
    }
}

/// Ready only when exactly one file was selected. A part with neither a
/// file name nor content is what a browser submits for an empty file input.
pub fn validate(selection: Vec<PredictionRequest>) -> Readiness {
    let mut files: Vec<PredictionRequest> = selection
        .into_iter()
        .filter(|f| !(f.filename.is_empty() && f.bytes.is_empty()))
        .collect();

    match (files.pop(), files.is_empty()) {
        (Some(file), true) => Readiness::Ready(file),
        _ => Readiness::NotReady,
    }
}
