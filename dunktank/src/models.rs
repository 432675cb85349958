//! Documents stored by DunkTank.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const POSTS: &str = "posts";
pub const USERS: &str = "users";

/// An anonymous post. The author stays hidden until the post is dunked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub uid: String,
    pub content: String,
    /// Creation time, epoch milliseconds.
    pub date: i64,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(rename = "isDunked", default)]
    pub is_dunked: bool,
}

impl Post {
    pub fn is_liked_by(&self, uid: &str) -> bool {
        self.likes.iter().any(|like| like == uid)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// The author id, revealed only once the post has been dunked.
    pub fn revealed_author(&self) -> Option<&str> {
        self.is_dunked.then_some(self.uid.as_str())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub balls: u64,
    /// Join time, epoch milliseconds.
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.date)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
