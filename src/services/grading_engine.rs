use std::fmt;
use std::time::Duration;

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{GradingApiMode, GradingSettings};
use crate::core::metrics;
use crate::schemas::rubric::Rubric;

const MAX_UPSTREAM_BODY_CHARS: usize = 4_000;

/// Which endpoint layout the deployed grading engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ApiShape {
    /// Path-style API: `/health`, `/api/grade_answer`, `/api/generate_excel`.
    Legacy,
    /// REST API under `/api/v1/grading/`.
    Versioned,
}

impl ApiShape {
    pub(crate) fn detect(base_url: &str, versioned_marker: &str) -> Self {
        if !versioned_marker.is_empty() && base_url.contains(versioned_marker) {
            Self::Versioned
        } else {
            Self::Legacy
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Versioned => "versioned",
        }
    }

    fn health_path(self) -> &'static str {
        match self {
            Self::Legacy => "/health",
            Self::Versioned => "/api/v1/grading/health",
        }
    }

    fn status_path(self) -> Option<&'static str> {
        match self {
            Self::Legacy => None,
            Self::Versioned => Some("/api/v1/grading/status"),
        }
    }

    fn grade_path(self) -> &'static str {
        match self {
            Self::Legacy => "/api/grade_answer",
            Self::Versioned => "/api/v1/grading/grade-answer",
        }
    }

    fn report_sheet_path(self) -> &'static str {
        match self {
            Self::Legacy => "/api/generate_excel",
            Self::Versioned => "/api/v1/grading/generate-excel",
        }
    }

    fn upload_key_path(self) -> Option<&'static str> {
        match self {
            Self::Legacy => None,
            Self::Versioned => Some("/api/v1/grading/upload-key"),
        }
    }
}

impl fmt::Display for ApiShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the client needs, resolved once at startup.
#[derive(Debug, Clone)]
pub(crate) struct GradingEngineConfig {
    pub(crate) base_url: String,
    pub(crate) shape: ApiShape,
    pub(crate) grade_timeout: Duration,
    pub(crate) health_timeout: Duration,
    pub(crate) report_timeout: Duration,
    pub(crate) key_timeout: Duration,
}

impl GradingEngineConfig {
    pub(crate) fn new(base_url: impl Into<String>, shape: ApiShape) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            shape,
            grade_timeout: Duration::from_secs(120),
            health_timeout: Duration::from_secs(5),
            report_timeout: Duration::from_secs(60),
            key_timeout: Duration::from_secs(60),
        }
    }

    pub(crate) fn from_settings(settings: &GradingSettings) -> Self {
        let shape = match settings.api_mode {
            GradingApiMode::Legacy => ApiShape::Legacy,
            GradingApiMode::Versioned => ApiShape::Versioned,
            GradingApiMode::Auto => ApiShape::detect(&settings.base_url, &settings.versioned_marker),
        };

        Self {
            grade_timeout: Duration::from_secs(settings.grade_timeout_seconds),
            health_timeout: Duration::from_secs(settings.health_timeout_seconds),
            report_timeout: Duration::from_secs(settings.report_timeout_seconds),
            key_timeout: Duration::from_secs(settings.key_timeout_seconds),
            ..Self::new(settings.base_url.clone(), shape)
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Diagnostic payload for a failed engine call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EngineFailure {
    pub(crate) message: String,
    pub(crate) upstream_status: Option<u16>,
    pub(crate) upstream_body: Option<Value>,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upstream_status {
            Some(status) => write!(f, "{} (upstream status {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("{operation} is not supported by the {shape} grading API")]
    Unsupported { operation: &'static str, shape: ApiShape },
    #[error("grading engine call failed: {0}")]
    Failed(EngineFailure),
}

impl EngineError {
    fn failed(
        message: impl Into<String>,
        upstream_status: Option<u16>,
        upstream_body: Option<Value>,
    ) -> Self {
        Self::Failed(EngineFailure { message: message.into(), upstream_status, upstream_body })
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EngineHealth {
    pub(crate) healthy: bool,
    pub(crate) status_code: Option<u16>,
    pub(crate) detail: Option<Value>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EngineStatus {
    pub(crate) status: &'static str,
    pub(crate) healthy: bool,
    pub(crate) detail: Option<Value>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct BackendInfo {
    pub(crate) base_url: String,
    pub(crate) shape: ApiShape,
    pub(crate) grade_timeout_seconds: u64,
}

/// Named file forwarded to the engine.
#[derive(Debug, Clone)]
pub(crate) struct EngineFile {
    pub(crate) file_name: String,
    pub(crate) bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct GradeAnswerRequest<'a> {
    pub(crate) answer: EngineFile,
    pub(crate) key: EngineFile,
    pub(crate) rubric: &'a Rubric,
    pub(crate) total_marks: f64,
    pub(crate) student_name: &'a str,
    pub(crate) student_email: &'a str,
}

/// What a successful grading call yields: the report URL and the per-question
/// results exactly as the engine sent them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GradingOutcome {
    pub(crate) report_url: String,
    pub(crate) results: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportRow {
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) total_marks: f64,
    pub(crate) obtained_marks: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportSheet {
    pub(crate) excel_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QaPair {
    pub(crate) question: String,
    pub(crate) answer: String,
    #[serde(default)]
    pub(crate) marks: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct GradingEngineClient {
    client: Client,
    config: GradingEngineConfig,
}

impl GradingEngineClient {
    pub(crate) fn new(config: GradingEngineConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build grading engine client")?;

        tracing::info!(
            base_url = %config.base_url,
            engine_shape = %config.shape,
            "Grading engine client configured"
        );

        Ok(Self { client, config })
    }

    pub(crate) fn shape(&self) -> ApiShape {
        self.config.shape
    }

    pub(crate) fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            base_url: self.config.base_url.clone(),
            shape: self.config.shape,
            grade_timeout_seconds: self.config.grade_timeout.as_secs(),
        }
    }

    /// Never fails; transport errors are reported as unhealthy.
    pub(crate) async fn check_health(&self) -> EngineHealth {
        let url = self.config.url(self.config.shape.health_path());
        let response = self.client.get(&url).timeout(self.config.health_timeout).send().await;

        let health = match response {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                EngineHealth {
                    healthy: status.is_success(),
                    status_code: Some(status.as_u16()),
                    detail: parse_body(&body),
                    error: None,
                }
            }
            Err(err) => EngineHealth {
                healthy: false,
                status_code: None,
                detail: None,
                error: Some(describe_transport_error(&err)),
            },
        };

        metrics::record_engine_request("health", health.healthy);
        health
    }

    /// The legacy API has no status endpoint and is reported healthy.
    pub(crate) async fn status(&self) -> EngineStatus {
        let Some(path) = self.config.shape.status_path() else {
            return EngineStatus { status: "legacy", healthy: true, detail: None, error: None };
        };

        let url = self.config.url(path);
        let response = self.client.get(&url).timeout(self.config.health_timeout).send().await;

        let status = match response {
            Ok(resp) => {
                let code = resp.status();
                let body = resp.text().await.unwrap_or_default();
                EngineStatus {
                    status: "versioned",
                    healthy: code.is_success(),
                    detail: parse_body(&body),
                    error: (!code.is_success()).then(|| format!("status endpoint returned {code}")),
                }
            }
            Err(err) => EngineStatus {
                status: "versioned",
                healthy: false,
                detail: None,
                error: Some(describe_transport_error(&err)),
            },
        };

        metrics::record_engine_request("status", status.healthy);
        status
    }

    pub(crate) async fn grade_answer(
        &self,
        request: GradeAnswerRequest<'_>,
    ) -> Result<GradingOutcome, EngineError> {
        let rubric = serde_json::to_string(request.rubric)
            .map_err(|err| EngineError::failed(format!("failed to encode rubric: {err}"), None, None))?;

        let form = Form::new()
            .part("answer_file", file_part(request.answer)?)
            .part("key_file", file_part(request.key)?)
            .text("rubric", rubric)
            .text("total_marks", request.total_marks.to_string())
            .text("student_name", request.student_name.to_string())
            .text("student_email", request.student_email.to_string());

        let url = self.config.url(self.config.shape.grade_path());
        let builder = self.client.post(&url).timeout(self.config.grade_timeout).multipart(form);
        let result = self.send_json("grade_answer", builder).await.and_then(parse_grading_response);

        metrics::record_engine_request("grade_answer", result.is_ok());
        result
    }

    pub(crate) async fn generate_report_sheet(
        &self,
        rows: &[ReportRow],
    ) -> Result<ReportSheet, EngineError> {
        let url = self.config.url(self.config.shape.report_sheet_path());
        let builder = self
            .client
            .post(&url)
            .timeout(self.config.report_timeout)
            .json(&json!({ "submissions": rows }));

        let result = self.send_json("generate_report_sheet", builder).await.and_then(|(status, body)| {
            body.get("excelUrl")
                .or_else(|| body.get("excel_url"))
                .and_then(Value::as_str)
                .map(|url| ReportSheet { excel_url: url.to_string() })
                .ok_or_else(|| {
                    EngineError::failed("report response is missing excelUrl", Some(status), Some(body))
                })
        });

        metrics::record_engine_request("generate_report_sheet", result.is_ok());
        result
    }

    /// Versioned API only; the legacy shape fails before any request is made.
    pub(crate) async fn upload_answer_key(&self, key: EngineFile) -> Result<Vec<QaPair>, EngineError> {
        let Some(path) = self.config.shape.upload_key_path() else {
            return Err(EngineError::Unsupported {
                operation: "upload_answer_key",
                shape: self.config.shape,
            });
        };

        let form = Form::new().part("key_file", file_part(key)?);
        let builder =
            self.client.post(self.config.url(path)).timeout(self.config.key_timeout).multipart(form);

        let result = self.send_json("upload_answer_key", builder).await.and_then(|(status, body)| {
            body.get("qa_pairs")
                .cloned()
                .and_then(|pairs| serde_json::from_value::<Vec<QaPair>>(pairs).ok())
                .ok_or_else(|| {
                    EngineError::failed("key response is missing qa_pairs", Some(status), Some(body))
                })
        });

        metrics::record_engine_request("upload_answer_key", result.is_ok());
        result
    }

    /// Sends the request and returns `(status, json body)` for 2xx answers.
    async fn send_json(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<(u16, Value), EngineError> {
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(operation, error = %err, "Grading engine request failed");
            EngineError::failed(describe_transport_error(&err), None, None)
        })?;

        let status = response.status();
        let raw_body = response.text().await.map_err(|err| {
            EngineError::failed(format!("failed to read response: {err}"), Some(status.as_u16()), None)
        })?;
        let body = parse_body(&raw_body);

        if !status.is_success() {
            let message = body
                .as_ref()
                .map(extract_error_message)
                .unwrap_or_else(|| format!("grading engine returned {status}"));
            tracing::warn!(operation, status = status.as_u16(), %message, "Grading engine rejected request");
            return Err(EngineError::failed(message, Some(status.as_u16()), body));
        }

        match body {
            Some(body @ Value::Object(_)) => Ok((status.as_u16(), body)),
            other => Err(EngineError::failed(
                "grading engine returned a non-object body",
                Some(status.as_u16()),
                other,
            )),
        }
    }
}

fn parse_grading_response((status, body): (u16, Value)) -> Result<GradingOutcome, EngineError> {
    let report_url = body.get("pdf_url").and_then(Value::as_str).filter(|url| !url.is_empty());
    let results = body.get("results").and_then(Value::as_array);

    match (report_url, results) {
        (Some(report_url), Some(results)) => {
            Ok(GradingOutcome { report_url: report_url.to_string(), results: results.clone() })
        }
        (None, _) => Err(EngineError::failed(
            "grading response is missing pdf_url",
            Some(status),
            Some(body),
        )),
        (_, None) => Err(EngineError::failed(
            "grading response has no results array",
            Some(status),
            Some(body),
        )),
    }
}

fn file_part(file: EngineFile) -> Result<Part, EngineError> {
    let mime = mime_for(&file.file_name);
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(mime)
        .map_err(|err| EngineError::failed(format!("invalid upload part: {err}"), None, None))
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// JSON when it parses, otherwise the (truncated) raw text.
fn parse_body(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw)
        .ok()
        .or_else(|| Some(Value::String(raw.chars().take(MAX_UPSTREAM_BODY_CHARS).collect())))
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "grading engine timed out".to_string()
    } else if err.is_connect() {
        format!("grading engine unreachable: {err}")
    } else {
        format!("grading engine request failed: {err}")
    }
}

fn extract_error_message(payload: &Value) -> String {
    if let Some(text) = payload.as_str() {
        return text.to_string();
    }
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .unwrap_or("unknown grading engine error")
        .to_string()
}
