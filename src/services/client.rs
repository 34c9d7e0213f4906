//! Request client for the remote analysis service.
//!
//! One call performs exactly one multipart exchange; retrying is the session's job.

use crate::domain::constants::{ANALYZE_PATH, HEALTH_PATH};
use crate::domain::errors::AnalysisError;
use crate::domain::models::{AnalysisInput, AnalysisResult, ImageBlob};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// The seam between the session and whatever performs the remote analysis.
pub trait AnalysisService {
    fn analyze(
        &self,
        input: &AnalysisInput,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField<'a> {
    Image(&'a ImageBlob),
    Text(String),
}

/// Multipart fields for one request, in wire order.
pub fn form_fields(input: &AnalysisInput) -> Vec<(&'static str, FormField<'_>)> {
    let mut fields = vec![
        ("front_image", FormField::Image(&input.front)),
        ("side_image", FormField::Image(&input.side)),
    ];
    if let Some(point) = input.override_point {
        fields.push(("tr_x", FormField::Text(point.x.to_string())));
        fields.push(("tr_y", FormField::Text(point.y.to_string())));
    }
    fields.push(("gender", FormField::Text(input.gender.as_str().to_string())));
    fields
}

fn image_part(blob: &ImageBlob) -> Result<Part, AnalysisError> {
    Part::bytes(blob.bytes.to_vec())
        .file_name(blob.file_name.clone())
        .mime_str(&blob.mime)
        .map_err(|e| AnalysisError::Transport(format!("invalid mime type {}: {}", blob.mime, e)))
}

fn build_form(input: &AnalysisInput) -> Result<Form, AnalysisError> {
    let mut form = Form::new();
    for (name, field) in form_fields(input) {
        form = match field {
            FormField::Image(blob) => form.part(name, image_part(blob)?),
            FormField::Text(value) => form.text(name, value),
        };
    }
    Ok(form)
}

/// Decodes a success body, rejecting shapes that miss required fields or core images.
pub fn parse_analysis_response(body: &[u8]) -> Result<AnalysisResult, AnalysisError> {
    let result: AnalysisResult = serde_json::from_slice(body)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    let missing = result.missing_core_images();
    if !missing.is_empty() {
        return Err(AnalysisError::MalformedResponse(format!(
            "annotated_images missing {}",
            missing.join(", ")
        )));
    }
    if !result.ok {
        tracing::warn!("analysis service returned ok=false with a success status");
    }
    Ok(result)
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct HealthBody {
    ok: bool,
}

impl HttpAnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<bool, AnalysisError> {
        let resp = self
            .http
            .get(self.endpoint(HEALTH_PATH))
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        let health: HealthBody = serde_json::from_slice(&bytes)
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
        Ok(health.ok)
    }
}

impl AnalysisService for HttpAnalysisClient {
    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, AnalysisError> {
        let form = build_form(input)?;
        let url = self.endpoint(ANALYZE_PATH);
        tracing::debug!(
            url = %url,
            front_bytes = input.front.len(),
            side_bytes = input.side.len(),
            manual_tr = input.override_point.is_some(),
            "posting analysis request"
        );
        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "analysis service rejected request");
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;
        parse_analysis_response(&bytes)
    }
}
