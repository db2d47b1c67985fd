//! Predict-and-normalize flow.
//!
//! One invocation walks `Idle → Validating → {Simulating | Requesting} →
//! Normalizing → {Succeeded | Failed}`; [`Phase`] names those states and each
//! transition is emitted as a debug event inside the invocation's span.

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Mode;
use crate::errors::PredictionError;
use crate::models::{DisplaySlots, PredictionRequest, PredictionResult};
use crate::remedy::remedy_for;
use crate::shape::normalize;
use crate::transport::PredictionTransport;
use crate::validator::validate;

/// Labels the simulator draws from.
pub const SIMULATED_LABELS: [&str; 4] = ["Powdery Mildew", "Leaf Spot", "Blight", "Healthy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Simulating,
    Requesting,
    Normalizing,
    Succeeded,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::Simulating => "simulating",
            Phase::Requesting => "requesting",
            Phase::Normalizing => "normalizing",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "predict phase");
}

pub struct Resolver {
    mode: Mode,
    transport: Arc<dyn PredictionTransport>,
}

impl Resolver {
    pub fn new(mode: Mode, transport: Arc<dyn PredictionTransport>) -> Self {
        Self { mode, transport }
    }

    /// Produce a label for an already-validated file.
    pub async fn resolve(
        &self,
        file: &PredictionRequest,
    ) -> Result<PredictionResult, PredictionError> {
        match &self.mode {
            Mode::Simulated => {
                enter(Phase::Simulating);
                Ok(simulate())
            }
            Mode::Remote { endpoint } => self.request(endpoint, file).await,
        }
    }

    async fn request(
        &self,
        endpoint: &str,
        file: &PredictionRequest,
    ) -> Result<PredictionResult, PredictionError> {
        if endpoint.trim().is_empty() {
            return Err(PredictionError::Configuration);
        }

        enter(Phase::Requesting);
        let resp = self.transport.post_image(endpoint, file).await?;
        if !resp.is_success() {
            return Err(PredictionError::Http {
                status: resp.status,
            });
        }

        enter(Phase::Normalizing);
        let data: serde_json::Value = serde_json::from_slice(&resp.body).map_err(|e| {
            PredictionError::MalformedResponse {
                reason: e.to_string(),
            }
        })?;
        normalize(&data)
    }

    /// Validate the selection, resolve it and render both display slots.
    ///
    /// Never fails: errors become the prediction text with an empty remedy.
    pub async fn predict(&self, selection: Vec<PredictionRequest>) -> DisplaySlots {
        let invocation = Uuid::new_v4();
        let span = info_span!("predict", %invocation);

        async move {
            enter(Phase::Idle);
            enter(Phase::Validating);
            let outcome = match validate(selection).into_result() {
                Ok(file) => self.resolve(&file).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(result) => {
                    enter(Phase::Succeeded);
                    info!(label = %result.label, probability = ?result.probability, "prediction resolved");
                    DisplaySlots::new(result.display_text(), remedy_for(&result.label))
                }
                Err(e) => {
                    enter(Phase::Failed);
                    error!(error = %e, "prediction failed");
                    DisplaySlots::new(e.to_string(), "")
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn simulate() -> PredictionResult {
    let label = SIMULATED_LABELS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Healthy");
    PredictionResult::new(label, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned transport that counts how often it was called.
    struct MockTransport {
        reply: Result<TransportResponse, String>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn json(status: u16, body: serde_json::Value) -> Arc<Self> {
            Self::raw(status, body.to_string().into_bytes())
        }

        fn raw(status: u16, body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(TransportResponse { status, body }),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PredictionTransport for MockTransport {
        async fn post_image(
            &self,
            _endpoint: &str,
            _request: &PredictionRequest,
        ) -> Result<TransportResponse, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(|reason| PredictionError::Network { reason })
        }
    }

    fn remote() -> Mode {
        Mode::Remote {
            endpoint: "http://inference.local/predict".to_string(),
        }
    }

    fn leaf() -> PredictionRequest {
        PredictionRequest::new("leaf.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    #[actix_web::test]
    async fn remote_class_shape_renders_label_and_remedy() {
        let transport = MockTransport::json(200, json!({ "class": "Blight", "confidence": 87 }));
        let resolver = Resolver::new(remote(), transport.clone());

        let result = resolver.resolve(&leaf()).await.unwrap();
        assert_eq!(result, PredictionResult::new("Blight", Some(0.87)));

        let slots = resolver.predict(vec![leaf()]).await;
        assert_eq!(slots.prediction, "Blight (87%)");
        assert_eq!(slots.remedies, "Apply copper-based sprays, crop rotation helps.");
    }

    #[actix_web::test]
    async fn remote_top_k_shape() {
        let transport = MockTransport::json(200, json!({ "top_k": ["Healthy"], "probs": [0.99] }));
        let resolver = Resolver::new(remote(), transport.clone());
        let result = resolver.resolve(&leaf()).await.unwrap();
        assert_eq!(result, PredictionResult::new("Healthy", Some(0.99)));
    }

    #[actix_web::test]
    async fn remote_predictions_shape() {
        let transport = MockTransport::json(
            200,
            json!({ "predictions": [{ "label": "Leaf Spot", "probability": 0.64 }] }),
        );
        let resolver = Resolver::new(remote(), transport.clone());
        let result = resolver.resolve(&leaf()).await.unwrap();
        assert_eq!(result, PredictionResult::new("Leaf Spot", Some(0.64)));
    }

    #[actix_web::test]
    async fn remote_label_shape() {
        let transport = MockTransport::json(200, json!({ "label": "Powdery Mildew" }));
        let resolver = Resolver::new(remote(), transport.clone());
        let result = resolver.resolve(&leaf()).await.unwrap();
        assert_eq!(result, PredictionResult::new("Powdery Mildew", None));
    }

    #[actix_web::test]
    async fn empty_object_is_unrecognized() {
        let transport = MockTransport::json(200, json!({}));
        let resolver = Resolver::new(remote(), transport.clone());
        let err = resolver.resolve(&leaf()).await.unwrap_err();
        assert!(matches!(err, PredictionError::UnrecognizedShape));
    }

    #[actix_web::test]
    async fn non_success_status_wins_over_body() {
        let transport = MockTransport::json(503, json!({ "class": "Blight", "confidence": 90 }));
        let resolver = Resolver::new(remote(), transport.clone());
        let err = resolver.resolve(&leaf()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Http { status: 503 }));

        let slots = resolver.predict(vec![leaf()]).await;
        assert_eq!(slots, DisplaySlots::new("HTTP 503", ""));
    }

    #[actix_web::test]
    async fn invalid_json_is_malformed() {
        let transport = MockTransport::raw(200, b"<html>oops</html>".to_vec());
        let resolver = Resolver::new(remote(), transport.clone());
        let err = resolver.resolve(&leaf()).await.unwrap_err();
        assert!(matches!(err, PredictionError::MalformedResponse { .. }));
    }

    #[actix_web::test]
    async fn transport_failure_is_reported_not_fatal() {
        let transport = MockTransport::failing("connection refused");
        let resolver = Resolver::new(remote(), transport.clone());

        let slots = resolver.predict(vec![leaf()]).await;
        assert_eq!(slots.prediction, "network error: connection refused");
        assert!(slots.remedies.is_empty());

        // The resolver stays usable for the next attempt.
        resolver.predict(vec![leaf()]).await;
        assert_eq!(transport.calls(), 2);
    }

    #[actix_web::test]
    async fn empty_endpoint_is_configuration_error_without_network() {
        let transport = MockTransport::json(200, json!({ "label": "Blight" }));
        let resolver = Resolver::new(
            Mode::Remote {
                endpoint: String::new(),
            },
            transport.clone(),
        );
        let err = resolver.resolve(&leaf()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Configuration));
        assert_eq!(err.to_string(), "Backend URL not configured");
        assert_eq!(transport.calls(), 0);
    }

    #[actix_web::test]
    async fn no_selection_is_not_ready_without_network() {
        let transport = MockTransport::json(200, json!({ "label": "Blight" }));
        let resolver = Resolver::new(remote(), transport.clone());
        let slots = resolver.predict(Vec::new()).await;
        assert_eq!(slots, DisplaySlots::new("Please select an image first", ""));
        assert_eq!(transport.calls(), 0);
    }

    #[actix_web::test]
    async fn simulated_without_selection_is_not_ready() {
        let transport = MockTransport::failing("unused");
        let resolver = Resolver::new(Mode::Simulated, transport.clone());
        let slots = resolver.predict(Vec::new()).await;
        assert_eq!(slots.prediction, "Please select an image first");
        assert_eq!(transport.calls(), 0);
    }

    #[actix_web::test]
    async fn simulated_labels_stay_in_fixed_set() {
        let transport = MockTransport::failing("unused");
        let resolver = Resolver::new(Mode::Simulated, transport.clone());
        for _ in 0..200 {
            let result = resolver.resolve(&leaf()).await.unwrap();
            assert!(SIMULATED_LABELS.contains(&result.label.as_str()));
            assert_eq!(result.probability, None);
        }
        assert_eq!(transport.calls(), 0);
    }

    #[actix_web::test]
    async fn simulated_prediction_renders_matching_remedy() {
        let transport = MockTransport::failing("unused");
        let resolver = Resolver::new(Mode::Simulated, transport.clone());
        let slots = resolver.predict(vec![leaf()]).await;
        assert_eq!(slots.remedies, remedy_for(&slots.prediction));
    }

    #[test]
    fn phases_display_lowercase() {
        assert_eq!(Phase::Requesting.to_string(), "requesting");
        assert_eq!(Phase::Failed.to_string(), "failed");
    }
}
