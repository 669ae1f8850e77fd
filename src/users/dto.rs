use serde::{Deserialize, Serialize};

use crate::users::{repo_types::MuseumId, services::WishlistAction};

/// `?userId=` on every read route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuseumStatusQuery {
    pub user_id: Option<String>,
    pub museum_id: Option<MuseumId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub user_id: Option<String>,
    pub museum_id: Option<MuseumId>,
    pub action: Option<WishlistAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedRequest {
    pub user_id: Option<String>,
    pub museum_id: Option<MuseumId>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub user_id: Option<String>,
    pub museum_id: Option<MuseumId>,
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
