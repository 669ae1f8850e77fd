use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{museums::repo::Museum, state::AppState, users::repo_types::MuseumId};

#[derive(Debug, Deserialize)]
pub struct MuseumSearch {
    pub search: Option<String>,
    pub state: Option<String>,
}

pub fn museum_routes() -> Router<AppState> {
    Router::new()
        .route("/museums", get(list_museums))
        .route("/museums/states", get(list_states))
        .route("/museums/:id", get(get_museum))
}

#[instrument(skip(state))]
pub async fn list_museums(
    State(state): State<AppState>,
    Query(q): Query<MuseumSearch>,
) -> Json<Vec<Museum>> {
    let hits = state
        .museums
        .search(q.search.as_deref(), q.state.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(hits)
}

pub async fn list_states(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.museums.states().into_iter().map(String::from).collect())
}

#[instrument(skip(state))]
pub async fn get_museum(
    State(state): State<AppState>,
    Path(id): Path<MuseumId>,
) -> Result<Json<Museum>, (StatusCode, String)> {
    state
        .museums
        .get(id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Museum not found".into()))
}
