use std::path::Path;

use axum::extract::multipart::Field;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::config::StorageSettings;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Checks the extension against the allow-list and that the MIME type, when
/// the client sent one, is not contradicting it.
pub(crate) fn validate_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime.is_empty() || mime == "application/octet-stream" || mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "pdf" => mime == "application/pdf",
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "txt" => mime.starts_with("text/plain"),
        "doc" => mime == "application/msword",
        "docx" => {
            mime == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => false,
    }
}

/// An uploaded file read fully into memory.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// Reads a file field chunk by chunk, enforcing the upload size limit and the
/// extension allow-list.
pub(crate) async fn read_upload(
    mut field: Field<'_>,
    storage: &StorageSettings,
) -> Result<UploadedFile, ApiError> {
    let label = field.name().unwrap_or("file").to_string();
    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("{label} must be a file upload")))?;
    let content_type = field.content_type().unwrap_or_default().to_string();
    validate_upload(&filename, &content_type, &storage.allowed_upload_extensions)?;

    let max_bytes = storage.max_upload_size_mb * 1024 * 1024;
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| ApiError::BadRequest(format!("Failed to read {label}")))?
    {
        if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(ApiError::BadRequest(format!(
                "File size exceeds {}MB limit",
                storage.max_upload_size_mb
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(ApiError::BadRequest(format!("{label} is empty")));
    }

    let content_type =
        if content_type.is_empty() { "application/octet-stream".to_string() } else { content_type };
    Ok(UploadedFile { filename, content_type, bytes })
}

pub(crate) async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    let label = field.name().unwrap_or("field").to_string();
    field
        .text()
        .await
        .map(|text| text.trim().to_string())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {label}")))
}

pub(crate) fn required(value: Option<String>, label: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{label} is required")))
}
