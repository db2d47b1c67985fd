//! The single network hop to the inference endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::errors::PredictionError;
use crate::models::PredictionRequest;

/// Multipart field name the endpoint reads the image from.
pub const FILE_FIELD: &str = "file";

/// Media type sent when the upload declared none, or an unparseable one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Raw status and body of the endpoint's answer.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// POST `request` to `endpoint` once. Only transport-level failures are
    /// errors here; HTTP status handling is the caller's business.
    async fn post_image(
        &self,
        endpoint: &str,
        request: &PredictionRequest,
    ) -> Result<TransportResponse, PredictionError>;
}

/// reqwest-backed transport. One attempt, no timeout.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

fn net_err(e: reqwest::Error) -> PredictionError {
    PredictionError::Network {
        reason: e.to_string(),
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    async fn post_image(
        &self,
        endpoint: &str,
        request: &PredictionRequest,
    ) -> Result<TransportResponse, PredictionError> {
        let part = || Part::bytes(request.bytes.clone()).file_name(request.filename.clone());
        let part = match part().mime_str(&request.content_type) {
            Ok(part) => part,
            Err(_) => {
                warn!(content_type = %request.content_type, "invalid media type, sending as binary");
                part().mime_str(FALLBACK_CONTENT_TYPE).map_err(net_err)?
            }
        };
        let form = Form::new().part(FILE_FIELD, part);

        let resp = self
            .client
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(net_err)?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(net_err)?.to_vec();
        debug!(status, bytes = body.len(), "prediction endpoint answered");

        Ok(TransportResponse { status, body })
    }
}
