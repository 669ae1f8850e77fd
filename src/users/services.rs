use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::storage::{StoreError, UserRepository};
use crate::users::repo_types::{
    MuseumId, MuseumStatus, PublicUser, ReviewEntry, UserRecord, VisitEntry,
};

pub const WISHLIST_POINTS: u64 = 10;
pub const VISIT_POINTS: u64 = 50;
pub const REVIEW_POINTS: u64 = 25;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Hash(#[from] PasswordError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WishlistAction {
    Add,
    Remove,
}

lazy_static! {
    // Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password("museum-guide-dummy-password").ok();
}

pub(crate) fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// Adds `museum_id` to the wishlist. Returns the points earned.
fn wishlist_add(user: &mut UserRecord, museum_id: MuseumId) -> u64 {
    if user.wishlist.contains(&museum_id) {
        return 0;
    }
    user.wishlist.push(museum_id);
    WISHLIST_POINTS
}

fn wishlist_remove(user: &mut UserRecord, museum_id: MuseumId) -> u64 {
    user.wishlist.retain(|m| *m != museum_id);
    0
}

/// First visit wins; later visits to the same museum change nothing.
fn record_visit(user: &mut UserRecord, museum_id: MuseumId, date: String) -> u64 {
    if user.visited.iter().any(|v| v.museum_id == museum_id) {
        return 0;
    }
    user.visited.push(VisitEntry { museum_id, date });
    VISIT_POINTS
}

/// Upserts by museum. Only a new review earns points.
fn upsert_review(
    user: &mut UserRecord,
    museum_id: MuseumId,
    date: String,
    rating: u8,
    notes: String,
) -> u64 {
    let entry = ReviewEntry {
        museum_id,
        date,
        rating,
        notes,
    };
    match user.reviews.iter_mut().find(|r| r.museum_id == museum_id) {
        Some(existing) => {
            *existing = entry;
            0
        }
        None => {
            user.reviews.push(entry);
            REVIEW_POINTS
        }
    }
}

/// Operations over the user store.
///
/// Every call loads the whole collection; mutations save it back before
/// returning. Mutations inside one process are serialized, so two requests
/// touching the same store cannot overwrite each other's changes. Separate
/// processes sharing one file are not coordinated.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    write_lock: Arc<Mutex<()>>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self {
            repo,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, UserError> {
        let password_hash = hash_password(password)?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.repo.load().await?;
        if users.iter().any(|u| u.email == email) {
            warn!(email = %email, "email already registered");
            return Err(UserError::EmailTaken);
        }

        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            points: 0,
            wishlist: Vec::new(),
            visited: Vec::new(),
            reviews: Vec::new(),
        };
        users.push(user.clone());
        self.repo.save(&users).await?;

        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user.into())
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<PublicUser, UserError> {
        let users = self.repo.load().await?;
        let Some(user) = users.into_iter().find(|u| u.email == email) else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            debug!("login for unknown email");
            return Err(UserError::InvalidCredentials);
        };

        let ok = verify_password(password, &user.password_hash).map_err(|e| {
            error!(error = %e, user_id = %user.id, "stored password hash unreadable");
            UserError::Hash(e)
        })?;
        if !ok {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(UserError::InvalidCredentials);
        }
        Ok(user.into())
    }

    pub async fn get_user(&self, id: &str) -> Result<PublicUser, UserError> {
        self.find(id).await?.map(Into::into).ok_or(UserError::NotFound)
    }

    pub async fn update_wishlist(
        &self,
        id: &str,
        museum_id: MuseumId,
        action: WishlistAction,
    ) -> Result<(), UserError> {
        self.mutate(id, |user| match action {
            WishlistAction::Add => wishlist_add(user, museum_id),
            WishlistAction::Remove => wishlist_remove(user, museum_id),
        })
        .await
    }

    pub async fn add_visited(
        &self,
        id: &str,
        museum_id: MuseumId,
        date: String,
    ) -> Result<(), UserError> {
        self.mutate(id, |user| record_visit(user, museum_id, date))
            .await
    }

    /// `rating` is trusted to be within 1..=5; callers validate it.
    pub async fn add_review(
        &self,
        id: &str,
        museum_id: MuseumId,
        rating: u8,
        notes: String,
    ) -> Result<(), UserError> {
        let date = now_rfc3339();
        self.mutate(id, |user| upsert_review(user, museum_id, date, rating, notes))
            .await
    }

    pub async fn wishlist(&self, id: &str) -> Result<Vec<MuseumId>, UserError> {
        Ok(self.find(id).await?.map(|u| u.wishlist).unwrap_or_default())
    }

    pub async fn visited(&self, id: &str) -> Result<Vec<VisitEntry>, UserError> {
        Ok(self.find(id).await?.map(|u| u.visited).unwrap_or_default())
    }

    pub async fn reviews(&self, id: &str) -> Result<Vec<ReviewEntry>, UserError> {
        Ok(self.find(id).await?.map(|u| u.reviews).unwrap_or_default())
    }

    pub async fn museum_status(
        &self,
        id: &str,
        museum_id: MuseumId,
    ) -> Result<MuseumStatus, UserError> {
        let Some(user) = self.find(id).await? else {
            return Ok(MuseumStatus::default());
        };
        Ok(MuseumStatus {
            in_wishlist: user.wishlist.contains(&museum_id),
            is_visited: user.visited.iter().any(|v| v.museum_id == museum_id),
        })
    }

    async fn find(&self, id: &str) -> Result<Option<UserRecord>, UserError> {
        let users = self.repo.load().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    /// Load, apply `f` to the user, add the points it returns, save.
    async fn mutate<F>(&self, id: &str, f: F) -> Result<(), UserError>
    where
        F: FnOnce(&mut UserRecord) -> u64,
    {
        let _guard = self.write_lock.lock().await;
        let mut users = self.repo.load().await?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(UserError::NotFound)?;

        let earned = f(user);
        user.points = user.points.saturating_add(earned);
        debug!(user_id = %id, earned, points = user.points, "user updated");

        self.repo.save(&users).await?;
        Ok(())
    }
}
