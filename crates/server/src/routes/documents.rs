use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use service::{
    keys,
    schema::{self, SubstratePatch},
    DocumentStore,
};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubstrateRequest {
    pub file_name: String,
    pub thickness: serde_json::Number,
    pub material: String,
}

/// Accept a multipart upload, persist it, and return the substrate field
/// extracted from the document.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read file part: {e}")))?;
            file = Some((name, bytes));
            break;
        }
    }
    let (name, bytes) = file.ok_or_else(|| ApiError::bad_request("missing file part"))?;

    if name.is_empty() {
        return Err(ApiError::bad_request("empty file name"));
    }
    if !keys::has_allowed_extension(&name) {
        return Err(ApiError::bad_request(format!(
            "only .{} files are accepted",
            keys::ALLOWED_EXTENSION
        )));
    }

    // Upload always persists before inspecting the content.
    state.store.put(&name, &bytes).await?;
    info!(file = %name, len = bytes.len(), "document uploaded");

    let doc: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::unprocessable(format!("{} is not valid JSON: {}", name, e)))?;
    let substrate = schema::substrate(&doc)?;
    Ok(Json(serde_json::json!({ "substrate1": substrate })))
}

/// Patch `thickness` and `material` on the substrate field of a stored
/// document, rewriting it in place.
pub async fn update_substrate(
    State(state): State<AppState>,
    Json(req): Json<UpdateSubstrateRequest>,
) -> Result<String, ApiError> {
    let patch = SubstratePatch {
        thickness: req.thickness,
        material: req.material,
    };
    state
        .store
        .update(&req.file_name, |doc| schema::apply_patch(doc, &patch))
        .await?;
    info!(file = %req.file_name, "substrate1 updated");
    Ok("Substrate1 updated successfully.".to_string())
}

/// Stream a stored document back as a downloadable attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.store.read(&file_name).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];
    Ok((headers, bytes))
}
