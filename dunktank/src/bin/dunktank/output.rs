use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use dunktank::{Notification, NotificationStatus, Notifier, Post, ProfileView, User};
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Trait for data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        self.line(ICONS.success, THEME.success, message);
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    pub fn warning(&self, message: &str) {
        self.line(ICONS.warning, THEME.warning, message);
    }

    pub fn info(&self, message: &str) {
        self.line(ICONS.info, THEME.info, message);
    }

    /// Display a heading
    pub fn heading(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.chars().count()))
            } else {
                format!("\n{}", text.color(THEME.primary).bold())
            };
            println!("{output}");
        }
    }

    /// Display a bullet list item
    pub fn bullet(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("  {} {text}", ICONS.bullet)
            } else {
                format!("  {} {text}", ICONS.bullet.color(THEME.muted))
            };
            println!("{output}");
        }
    }

    pub fn paragraph(&self, text: &str) {
        if !self.options.quiet {
            println!("{text}");
        }
    }

    fn line(&self, icon: &str, color: colored::Color, message: &str) {
        if self.options.quiet {
            return;
        }
        let output = if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        };
        println!("{output}");
    }
}

impl Notifier for OutputManager {
    fn notify(&self, notification: Notification) {
        match notification.status {
            NotificationStatus::Success => self.success(&notification.title),
            NotificationStatus::Info => self.info(&notification.title),
            NotificationStatus::Warning => self.warning(&notification.title),
            NotificationStatus::Error => self.error(&notification.title),
        }
    }
}

fn themed_table(options: &GlobalOptions) -> Table {
    let mut table = Table::new();
    if !options.no_color {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    } else {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    }
    table
}

fn header_cells(options: &GlobalOptions, headers: &[&str]) -> Vec<Cell> {
    headers
        .iter()
        .map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect()
}

fn author_label(post: &Post) -> String {
    post.revealed_author().unwrap_or("anonymous").to_string()
}

fn posted_label(post: &Post) -> String {
    post.created_at()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// A feed of posts, newest first.
#[derive(Serialize)]
#[serde(transparent)]
pub struct PostList(pub Vec<Post>);

impl TableDisplay for PostList {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        if self.0.is_empty() {
            table.add_row(vec![Cell::new("No posts yet")]);
            return table;
        }
        table.set_header(header_cells(options, &["Id", "Author", "Posted", "Likes", "Dunked", "Content"]));
        for post in &self.0 {
            table.add_row(vec![
                Cell::new(&post.id),
                Cell::new(author_label(post)),
                Cell::new(posted_label(post)),
                Cell::new(post.like_count()),
                Cell::new(if post.is_dunked { ICONS.ball } else { "" }),
                Cell::new(&post.content),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|post| format!("{} [{}] {}", post.id, author_label(post), post.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TableDisplay for User {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        table.set_header(header_cells(options, &["Field", "Value"]));
        table.add_row(vec![Cell::new("Id"), Cell::new(&self.id)]);
        table.add_row(vec![Cell::new("Username"), Cell::new(&self.username)]);
        table.add_row(vec![Cell::new("Email"), Cell::new(&self.email)]);
        table.add_row(vec![Cell::new("Balls"), Cell::new(self.balls)]);
        table.add_row(vec![Cell::new("Avatar"), Cell::new(self.avatar.as_deref().unwrap_or("-"))]);
        table
    }

    fn to_compact(&self) -> String {
        format!("{} {} balls={}", self.id, self.username, self.balls)
    }
}

impl TableDisplay for ProfileView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        table.set_header(header_cells(options, &["Profile", ""]));
        table.add_row(vec![Cell::new("Username"), Cell::new(&self.user.username)]);
        table.add_row(vec![Cell::new("Posts (that have been dunked)"), Cell::new(self.dunked_count())]);
        table.add_row(vec![Cell::new("Joined"), Cell::new(&self.joined)]);
        table.add_row(vec![Cell::new("Number of balls available"), Cell::new(self.user.balls)]);
        table.add_row(vec![Cell::new("Avatar"), Cell::new(&self.avatar_link)]);
        if self.can_edit {
            table.add_row(vec![Cell::new(""), Cell::new("You can change this avatar")]);
        }
        for post in &self.dunked_posts {
            table.add_row(vec![Cell::new(posted_label(post)), Cell::new(&post.content)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} dunked={} joined={} balls={}",
            self.user.username,
            self.dunked_count(),
            self.joined,
            self.user.balls
        )
    }
}
