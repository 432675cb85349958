//! Post repository: create, list, watch, like, dunk and delete posts.

use log::{debug, info};
use rand::Rng;
use serde_json::json;

use crate::{
    errors::RepoError,
    id::generate_post_id,
    models::{POSTS, Post, now_millis},
    notify::{Confirm, Notification, Notifier},
    store::{DocumentStore, LiveQuery, PatchOp, Query, SortOrder},
};

/// A dunk succeeds with probability `1 / DEFAULT_DUNK_ODDS`.
pub const DEFAULT_DUNK_ODDS: u32 = 5;
/// The draw in `[0, odds)` that lands a dunk.
pub const WINNING_DRAW: u32 = 1;

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this post?";

/// Which posts a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    /// Posts by this author that have been dunked.
    DunkedBy(String),
}

impl PostFilter {
    pub fn dunked_by(uid: impl Into<String>) -> Self {
        Self::DunkedBy(uid.into())
    }

    /// Store query for this filter, always newest first.
    pub fn to_query(&self) -> Query {
        let query = Query::new().order_by("date", SortOrder::Desc);
        match self {
            Self::All => query,
            Self::DunkedBy(uid) => query.where_eq("uid", uid.as_str()).where_eq("isDunked", true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DunkOutcome {
    /// The post was already dunked; nothing was drawn or written.
    AlreadyDunked,
    /// This attempt dunked the post.
    Dunked,
    Missed { draw: u32, odds: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation gate was declined; the store was not touched.
    Declined,
}

pub struct PostRepository<S, N> {
    store: S,
    notifier: N,
    odds: u32,
}

impl<S, N> PostRepository<S, N>
where
    S: DocumentStore,
    N: Notifier,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            odds: DEFAULT_DUNK_ODDS,
        }
    }

    /// Overrides the dunk odds. Odds must leave room for the winning draw.
    pub fn with_odds(mut self, odds: u32) -> Result<Self, RepoError> {
        if odds <= WINNING_DRAW {
            return Err(RepoError::InvalidRequest {
                message: format!("dunk odds must be greater than {WINNING_DRAW}, got {odds}"),
            });
        }
        self.odds = odds;
        Ok(self)
    }

    pub fn odds(&self) -> u32 {
        self.odds
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn create_post(&self, content: impl Into<String>, uid: impl Into<String>) -> Result<Post, RepoError> {
        let post = Post {
            id: generate_post_id(),
            uid: uid.into(),
            content: content.into(),
            date: now_millis(),
            likes: Vec::new(),
            is_dunked: false,
        };
        self.store.set(POSTS, &post.id, serde_json::to_value(&post)?).await?;
        debug!("created post {}", post.id);
        self.notifier.notify(Notification::success("Your post was successfully added"));
        Ok(post)
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>, RepoError> {
        match self.store.get(POSTS, post_id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document)?)),
            None => Ok(None),
        }
    }

    pub async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, RepoError> {
        let documents = self.store.query(POSTS, &filter.to_query()).await?;
        documents
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(RepoError::from))
            .collect()
    }

    /// Live form of [`PostRepository::list_posts`].
    pub fn watch_posts(&self, filter: &PostFilter) -> LiveQuery<S, Post> {
        LiveQuery::new(self.store.clone(), POSTS, filter.to_query())
    }

    /// Adds or removes `uid` from the post's likes, trusting the caller's `currently_liked`.
    /// Returns the liked state the caller should now display.
    pub async fn toggle_like(&self, post_id: &str, uid: &str, currently_liked: bool) -> Result<bool, RepoError> {
        let op = if currently_liked {
            PatchOp::array_remove("likes", uid)
        } else {
            PatchOp::array_union("likes", uid)
        };
        self.store.update(POSTS, post_id, &[op]).await?;
        Ok(!currently_liked)
    }

    pub async fn attempt_dunk(&self, post_id: &str) -> Result<DunkOutcome, RepoError> {
        let odds = self.odds;
        self.dunk_with_draw(post_id, || rand::thread_rng().gen_range(0..odds)).await
    }

    /// Same as [`PostRepository::attempt_dunk`] with a caller-supplied random source.
    pub async fn attempt_dunk_with<R>(&self, post_id: &str, rng: &mut R) -> Result<DunkOutcome, RepoError>
    where
        R: Rng,
    {
        let odds = self.odds;
        self.dunk_with_draw(post_id, || rng.gen_range(0..odds)).await
    }

    // Read, check, draw, conditionally write. Not atomic: two concurrent attempts can
    // both read `isDunked == false` and both report success.
    async fn dunk_with_draw(&self, post_id: &str, draw: impl FnOnce() -> u32) -> Result<DunkOutcome, RepoError> {
        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| RepoError::not_found(POSTS, post_id))?;
        if post.is_dunked {
            return Ok(DunkOutcome::AlreadyDunked);
        }

        let draw = draw();
        if draw == WINNING_DRAW {
            self.store
                .update(POSTS, post_id, &[PatchOp::assign("isDunked", json!(true))])
                .await?;
            info!("post {post_id} dunked");
            self.notifier.notify(Notification::success("Your dunk attempt was successful"));
            Ok(DunkOutcome::Dunked)
        } else {
            self.notifier.notify(Notification::success(format!(
                "Your dunk attempt was not successful (you have a 1 in {} chance)",
                self.odds
            )));
            Ok(DunkOutcome::Missed { draw, odds: self.odds })
        }
    }

    pub async fn delete_post<C>(&self, post_id: &str, confirm: &C) -> Result<DeleteOutcome, RepoError>
    where
        C: Confirm + ?Sized,
    {
        if !confirm.confirm(DELETE_PROMPT) {
            return Ok(DeleteOutcome::Declined);
        }
        self.store.delete(POSTS, post_id).await?;
        debug!("deleted post {post_id}");
        self.notifier.notify(Notification::info("Post deleted!"));
        Ok(DeleteOutcome::Deleted)
    }
}
