use serde::{Deserialize, Serialize};

pub type MuseumId = u32;

/// User record as persisted in the user store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,        // exact-match unique key
    pub password_hash: String, // Argon2 PHC string, never leaves the service
    pub points: u64,
    #[serde(default)]
    pub wishlist: Vec<MuseumId>,
    #[serde(default)]
    pub visited: Vec<VisitEntry>,
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisitEntry {
    pub museum_id: MuseumId,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub museum_id: MuseumId,
    pub date: String,
    pub rating: u8,
    pub notes: String,
}

/// Public part of the user returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub points: u64,
    pub wishlist: Vec<MuseumId>,
    pub visited: Vec<VisitEntry>,
    pub reviews: Vec<ReviewEntry>,
}

impl From<UserRecord> for PublicUser {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            points: r.points,
            wishlist: r.wishlist,
            visited: r.visited,
            reviews: r.reviews,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MuseumStatus {
    pub in_wishlist: bool,
    pub is_visited: bool,
}
