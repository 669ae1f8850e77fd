use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{
    scanner::services::{parse_artifact_info, ArtifactInfo, ImagePayload, ScannerError},
    state::AppState,
    users::handlers::json_body,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    pub image_data: Option<String>,
}

pub fn scanner_routes() -> Router<AppState> {
    Router::new()
        .route("/scanner/identify", post(identify))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

fn reject(e: ScannerError) -> (StatusCode, String) {
    match e {
        ScannerError::NotConfigured => {
            error!("scanner called without OPENROUTER_API_KEY");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "OpenRouter API key not configured".into(),
            )
        }
        ScannerError::Http(err) => {
            error!(error = %err, "vision service request failed");
            (StatusCode::BAD_GATEWAY, "Failed to reach vision service".into())
        }
        ScannerError::Upstream { status, body } => {
            let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, format!("Failed to analyze image: {body}"))
        }
        ScannerError::EmptyResponse => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No response from vision service".into(),
        ),
    }
}

#[instrument(skip(state, payload))]
pub async fn identify(
    State(state): State<AppState>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> Result<Json<ArtifactInfo>, (StatusCode, String)> {
    let body = json_body(payload)?;
    let Some(raw) = body.image_data.filter(|d| !d.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "Image data is required".into()));
    };
    let Some(image) = ImagePayload::from_data_url(&raw) else {
        warn!("image data without payload");
        return Err((StatusCode::BAD_REQUEST, "Invalid image data".into()));
    };

    let text = state.scanner.identify(&image).await.map_err(reject)?;
    let info = parse_artifact_info(&text);
    info!(name = %info.name, is_artifact = info.is_artifact, "artifact identified");
    Ok(Json(info))
}
