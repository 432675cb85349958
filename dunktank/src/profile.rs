use serde::Serialize;

use crate::{
    errors::RepoError,
    models::{Post, User},
    notify::Notifier,
    posts::{PostFilter, PostRepository},
    store::DocumentStore,
    users::UserRepository,
};

pub const PROFILE_ROUTE: &str = "/protected/profile";

/// Everything the profile page shows: the user, their dunked posts, and whether
/// the viewer may change the avatar.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub dunked_posts: Vec<Post>,
    pub joined: String,
    pub avatar_link: String,
    pub can_edit: bool,
}

impl ProfileView {
    pub async fn load<S, N>(
        users: &UserRepository<S>,
        posts: &PostRepository<S, N>,
        profile_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Self, RepoError>
    where
        S: DocumentStore,
        N: Notifier,
    {
        let user = users.require_user(profile_id).await?;
        let dunked_posts = posts.list_posts(&PostFilter::dunked_by(profile_id)).await?;
        Ok(Self::assemble(user, dunked_posts, viewer_id))
    }

    pub fn assemble(user: User, dunked_posts: Vec<Post>, viewer_id: Option<&str>) -> Self {
        let joined = joined_label(&user);
        let avatar_link = avatar_link(&user.id);
        let can_edit = viewer_id == Some(user.id.as_str());
        Self {
            user,
            dunked_posts,
            joined,
            avatar_link,
            can_edit,
        }
    }

    pub fn dunked_count(&self) -> usize {
        self.dunked_posts.len()
    }
}

pub fn avatar_link(user_id: &str) -> String {
    format!("{PROFILE_ROUTE}/{user_id}")
}

/// Join month, e.g. "March 2024".
pub fn joined_label(user: &User) -> String {
    user.joined_at()
        .map(|at| at.format("%B %Y").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
