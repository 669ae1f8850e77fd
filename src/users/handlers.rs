use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{Ack, MuseumStatusQuery, ReviewRequest, UserQuery, VisitedRequest, WishlistRequest},
        repo_types::{MuseumId, MuseumStatus, PublicUser, ReviewEntry, VisitEntry},
        services::{now_rfc3339, UserError},
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile))
        .route("/user/wishlist", get(get_wishlist).post(update_wishlist))
        .route("/user/visited", get(get_visited).post(add_visited))
        .route("/user/reviews", get(get_reviews).post(add_review))
        .route("/user/museum-status", get(get_museum_status))
}

/// Maps service failures onto HTTP statuses.
pub(crate) fn reject(e: UserError) -> (StatusCode, String) {
    match e {
        UserError::NotFound => (StatusCode::NOT_FOUND, "User not found".into()),
        UserError::EmailTaken => (StatusCode::CONFLICT, "Email already exists".into()),
        UserError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".into())
        }
        UserError::Storage(e) => {
            error!(error = %e, "user store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "User data temporarily unavailable".into(),
            )
        }
        UserError::Hash(e) => {
            error!(error = %e, "password hashing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
        }
    }
}

/// A body that does not deserialize is a bad request, whatever the cause.
pub(crate) fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, (StatusCode, String)> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "request body rejected");
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".into())
            }
            _ => (StatusCode::BAD_REQUEST, "Invalid request body".into()),
        }
    })
}

fn require_user(user_id: Option<String>) -> Result<String, (StatusCode, String)> {
    match user_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => Ok(id),
        None => {
            warn!("request without user id");
            Err((StatusCode::UNAUTHORIZED, "User ID required".into()))
        }
    }
}

fn require_museum(museum_id: Option<MuseumId>) -> Result<MuseumId, (StatusCode, String)> {
    match museum_id.filter(|m| *m != 0) {
        Some(m) => Ok(m),
        None => Err((StatusCode::BAD_REQUEST, "Museum ID required".into())),
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<PublicUser> {
    let user_id = q
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "User ID required".to_string()))?;
    let user = state.users.get_user(&user_id).await.map_err(reject)?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn get_wishlist(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Vec<MuseumId>> {
    let user_id = require_user(q.user_id)?;
    let wishlist = state.users.wishlist(&user_id).await.map_err(reject)?;
    Ok(Json(wishlist))
}

#[instrument(skip(state, payload))]
pub async fn update_wishlist(
    State(state): State<AppState>,
    payload: Result<Json<WishlistRequest>, JsonRejection>,
) -> ApiResult<Ack> {
    let body = json_body(payload)?;
    let user_id = require_user(body.user_id)?;
    let (Some(museum_id), Some(action)) = (body.museum_id.filter(|m| *m != 0), body.action)
    else {
        return Err((StatusCode::BAD_REQUEST, "Missing museumId or action".into()));
    };

    state
        .users
        .update_wishlist(&user_id, museum_id, action)
        .await
        .map_err(reject)?;
    info!(%user_id, museum_id, ?action, "wishlist updated");
    Ok(Json(Ack::ok()))
}

#[instrument(skip(state))]
pub async fn get_visited(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Vec<VisitEntry>> {
    let user_id = require_user(q.user_id)?;
    let visited = state.users.visited(&user_id).await.map_err(reject)?;
    Ok(Json(visited))
}

#[instrument(skip(state, payload))]
pub async fn add_visited(
    State(state): State<AppState>,
    payload: Result<Json<VisitedRequest>, JsonRejection>,
) -> ApiResult<Ack> {
    let body = json_body(payload)?;
    let user_id = require_user(body.user_id)?;
    let museum_id = body
        .museum_id
        .filter(|m| *m != 0)
        .ok_or((StatusCode::BAD_REQUEST, "Missing museumId".to_string()))?;
    let date = body
        .date
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(now_rfc3339);

    state
        .users
        .add_visited(&user_id, museum_id, date)
        .await
        .map_err(reject)?;
    info!(%user_id, museum_id, "visit recorded");
    Ok(Json(Ack::ok()))
}

#[instrument(skip(state))]
pub async fn get_reviews(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> ApiResult<Vec<ReviewEntry>> {
    let user_id = require_user(q.user_id)?;
    let reviews = state.users.reviews(&user_id).await.map_err(reject)?;
    Ok(Json(reviews))
}

#[instrument(skip(state, payload))]
pub async fn add_review(
    State(state): State<AppState>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Ack> {
    let body = json_body(payload)?;
    let user_id = require_user(body.user_id)?;
    let (Some(museum_id), Some(rating)) = (body.museum_id.filter(|m| *m != 0), body.rating)
    else {
        return Err((StatusCode::BAD_REQUEST, "Missing museumId or rating".into()));
    };
    if !(1..=5).contains(&rating) {
        warn!(%user_id, rating, "rating out of range");
        return Err((
            StatusCode::BAD_REQUEST,
            "Rating must be between 1 and 5".into(),
        ));
    }

    state
        .users
        .add_review(&user_id, museum_id, rating as u8, body.notes.unwrap_or_default())
        .await
        .map_err(reject)?;
    info!(%user_id, museum_id, rating, "review saved");
    Ok(Json(Ack::ok()))
}

#[instrument(skip(state))]
pub async fn get_museum_status(
    State(state): State<AppState>,
    Query(q): Query<MuseumStatusQuery>,
) -> ApiResult<MuseumStatus> {
    let user_id = require_user(q.user_id)?;
    let museum_id = require_museum(q.museum_id)?;
    let status = state
        .users
        .museum_status(&user_id, museum_id)
        .await
        .map_err(reject)?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_user_id_is_unauthorized() {
        assert_eq!(require_user(None).unwrap_err().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            require_user(Some("  ".into())).unwrap_err().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(require_user(Some("abc".into())).unwrap(), "abc");
    }

    #[test]
    fn zero_museum_id_counts_as_missing() {
        assert_eq!(require_museum(Some(0)).unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(require_museum(None).unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(require_museum(Some(12)).unwrap(), 12);
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(reject(UserError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(reject(UserError::EmailTaken).0, StatusCode::CONFLICT);
        assert_eq!(reject(UserError::InvalidCredentials).0, StatusCode::UNAUTHORIZED);
        let io = crate::storage::StoreError::Io {
            path: "users.json".into(),
            source: std::io::Error::other("disk gone"),
        };
        assert_eq!(reject(UserError::Storage(io)).0, StatusCode::SERVICE_UNAVAILABLE);
    }
}
