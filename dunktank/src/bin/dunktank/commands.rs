use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Subcommand;
use dunktank::{
    Confirm, DeleteOutcome, DocumentStore, DunkOutcome, Notifier, PostFilter, PostRepository, ProfileView,
    UserRepository,
};

use crate::output::{OutputManager, PostList};

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user document after checking the username is free
    Register {
        username: String,
        email: String,
    },
    /// Check whether a username is already taken
    UsernameExists { username: String },
    /// Publish an anonymous post
    Post {
        /// Author user id
        #[arg(long = "as")]
        author: String,
        content: String,
    },
    /// Show every post, newest first
    Feed {
        /// Keep the feed open and redraw it whenever posts change
        #[arg(long)]
        watch: bool,
    },
    /// Show the dunked posts of one user
    Dunked { uid: String },
    /// Like a post
    Like {
        post_id: String,
        #[arg(long = "as")]
        uid: String,
    },
    /// Remove your like from a post
    Unlike {
        post_id: String,
        #[arg(long = "as")]
        uid: String,
    },
    /// Throw a ball at a post: a lucky throw reveals its author
    Dunk { post_id: String },
    /// Delete a post after confirmation
    Delete {
        post_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show a user's profile and dunked posts
    Profile {
        user_id: String,
        /// Id of the user looking at the profile
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Get more balls (5 per call)
    AddBalls { user_id: String },
    /// Change a user's avatar
    Avatar { user_id: String, url: String },
    /// What DunkTank is
    About,
}

/// Asks on stdin; anything other than "y" or "yes" declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

pub async fn handle_command<S, N>(
    command: Commands,
    posts: &PostRepository<S, N>,
    users: &UserRepository<S>,
    output: &OutputManager,
    confirm: &dyn Confirm,
) -> Result<()>
where
    S: DocumentStore,
    N: Notifier,
{
    match command {
        Commands::Register { username, email } => {
            let user = users.register(&username, &email).await.context("Registration failed")?;
            output.success(&format!("Welcome to the tank, {}", user.username));
            output.display(&user)?;
        }
        Commands::UsernameExists { username } => {
            if users.username_exists(&username).await? {
                output.warning(&format!("Username '{username}' is taken"));
            } else {
                output.success(&format!("Username '{username}' is available"));
            }
        }
        Commands::Post { author, content } => {
            let post = posts.create_post(content, author).await?;
            output.info(&format!("Post id: {}", post.id));
        }
        Commands::Feed { watch: false } => {
            let feed = posts.list_posts(&PostFilter::All).await?;
            output.display(&PostList(feed))?;
        }
        Commands::Feed { watch: true } => {
            watch_feed(posts, output).await?;
        }
        Commands::Dunked { uid } => {
            let feed = posts.list_posts(&PostFilter::dunked_by(uid)).await?;
            output.display(&PostList(feed))?;
        }
        Commands::Like { post_id, uid } => {
            posts.toggle_like(&post_id, &uid, false).await?;
            output.success("Liked");
        }
        Commands::Unlike { post_id, uid } => {
            posts.toggle_like(&post_id, &uid, true).await?;
            output.success("Like removed");
        }
        Commands::Dunk { post_id } => {
            if posts.attempt_dunk(&post_id).await? == DunkOutcome::AlreadyDunked {
                output.info("That post has already been dunked");
            }
        }
        Commands::Delete { post_id, yes } => {
            let always = |_: &str| true;
            let gate: &dyn Confirm = if yes { &always } else { confirm };
            if posts.delete_post(&post_id, gate).await? == DeleteOutcome::Declined {
                output.info("Nothing deleted");
            }
        }
        Commands::Profile { user_id, viewer } => {
            let view = ProfileView::load(users, posts, &user_id, viewer.as_deref()).await?;
            output.display(&view)?;
        }
        Commands::AddBalls { user_id } => {
            let user = users.add_balls(&user_id).await?;
            output.success(&format!("{} now has {} balls", user.username, user.balls));
        }
        Commands::Avatar { user_id, url } => {
            let user = users.update_avatar(&user_id, &url).await?;
            output.success(&format!("Avatar updated for {}", user.username));
        }
        Commands::About => print_about(output),
    }
    Ok(())
}

async fn watch_feed<S, N>(posts: &PostRepository<S, N>, output: &OutputManager) -> Result<()>
where
    S: DocumentStore,
    N: Notifier,
{
    let mut live = posts.watch_posts(&PostFilter::All);
    output.info("Watching the feed, press Ctrl-C to stop");
    loop {
        tokio::select! {
            update = live.next() => match update {
                Some(Ok(feed)) => {
                    output.heading(&format!("{} posts", feed.len()));
                    output.display(&PostList(feed))?;
                }
                Some(Err(err)) => return Err(err).context("Feed subscription failed"),
                None => {
                    output.warning("Change feed closed");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

pub fn print_about(output: &OutputManager) {
    output.heading("About DunkTank");
    output.paragraph(
        "DunkTank is a place to post anonymously. Anyone can try to dunk a post by throwing a ball at it: \
         each throw has a 1 in 5 chance of revealing the author to everyone.",
    );
    output.heading("Ideas for later");
    for idea in [
        "Require email verification",
        "Moderation: reporting posts and banning users",
        "Comments on posts",
        "Account deletion",
    ] {
        output.bullet(idea);
    }
}
