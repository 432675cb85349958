//! DunkTank core library.
//!
//! Anonymous posts that other users can "dunk" for a one-in-five chance of
//! revealing the author. Repositories sit on top of a [`store::DocumentStore`];
//! the in-memory store backs tests and demos, the Redis store backs deployments.

pub mod errors;
pub mod id;
pub mod keys;
pub mod models;
pub mod notify;
pub mod posts;
pub mod profile;
pub mod store;
pub mod users;
pub mod validators;

pub use errors::*;
pub use models::{POSTS, Post, USERS, User};
pub use notify::{Confirm, LogNotifier, Notification, NotificationLog, NotificationStatus, Notifier};
pub use posts::{DEFAULT_DUNK_ODDS, DeleteOutcome, DunkOutcome, PostFilter, PostRepository};
pub use profile::ProfileView;
pub use store::{ChangeEvent, ChangeKind, DocumentStore, LiveQuery, MemoryStore, PatchOp, Query, RedisStore, SortOrder};
pub use users::{BALLS_PER_TOP_UP, UserRepository};

// Re-export redis so callers don't need to depend on a specific redis version.
pub use redis;
