//! User lookup and profile mutations.
//!
//! Account credentials belong to the auth provider; this module only keeps the
//! user document that the rest of the app reads.

use log::debug;
use serde_json::Value;

use crate::{
    errors::{RepoError, ValidationError},
    id::generate_user_id,
    models::{USERS, User, now_millis},
    store::{DocumentStore, PatchOp, Query},
    validators::{is_valid_url, validate_registration},
};

/// Balls granted per top-up.
pub const BALLS_PER_TOP_UP: i64 = 5;

pub struct UserRepository<S> {
    store: S,
}

impl<S> UserRepository<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Exact, case-sensitive match on `username`.
    pub async fn username_exists(&self, candidate: &str) -> Result<bool, RepoError> {
        let query = Query::new().where_eq("username", candidate);
        let matches = self.store.query(USERS, &query).await?;
        Ok(!matches.is_empty())
    }

    /// Validates the form, refuses a taken username, then writes the user document.
    pub async fn register(&self, username: &str, email: &str) -> Result<User, RepoError> {
        validate_registration(username, email)?;
        if self.username_exists(username).await? {
            return Err(RepoError::UsernameTaken {
                username: username.to_string(),
            });
        }

        let user = User {
            id: generate_user_id(),
            username: username.to_string(),
            email: email.to_string(),
            balls: 0,
            date: now_millis(),
            avatar: None,
        };
        self.store.set(USERS, &user.id, serde_json::to_value(&user)?).await?;
        debug!("registered user {} as {}", user.id, user.username);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, RepoError> {
        match self.store.get(USERS, user_id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    pub async fn require_user(&self, user_id: &str) -> Result<User, RepoError> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| RepoError::not_found(USERS, user_id))
    }

    /// Tops up the user's balls and returns the refreshed user.
    pub async fn add_balls(&self, user_id: &str) -> Result<User, RepoError> {
        self.store
            .update(USERS, user_id, &[PatchOp::increment("balls", BALLS_PER_TOP_UP)])
            .await?;
        self.require_user(user_id).await
    }

    pub async fn update_avatar(&self, user_id: &str, avatar: &str) -> Result<User, RepoError> {
        if !is_valid_url(avatar) {
            return Err(ValidationError::single("avatar", "validation.url", "value must be a valid URL").into());
        }
        self.store
            .update(USERS, user_id, &[PatchOp::assign("avatar", Value::from(avatar))])
            .await?;
        self.require_user(user_id).await
    }
}
