use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::dto::{LoginRequest, SignupRequest},
    state::AppState,
    users::{
        handlers::{json_body, reject},
        repo_types::PublicUser,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let payload = json_body(payload)?;
    // Email stays case-sensitive; only surrounding whitespace is dropped.
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        warn!("signup with missing fields");
        return Err((StatusCode::BAD_REQUEST, "Missing required fields".into()));
    }

    let user = state
        .users
        .create_user(name, email, &payload.password)
        .await
        .map_err(reject)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let payload = json_body(payload)?;
    let email = payload.email.trim();

    if email.is_empty() || payload.password.is_empty() {
        warn!("login with missing fields");
        return Err((StatusCode::BAD_REQUEST, "Missing required fields".into()));
    }

    let user = state
        .users
        .authenticate(email, &payload.password)
        .await
        .map_err(|e| {
            warn!(error = %e, "login rejected");
            reject(e)
        })?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(user))
}
