mod commands;
mod context;
mod output;
mod theme;

use anyhow::{Context, Result};
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use dunktank::{PostRepository, RedisStore, UserRepository};
use std::fmt::Write;
use std::path::PathBuf;

use commands::{Commands, StdinConfirm, handle_command, print_about};
use context::DunkTankConfig;
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL (used when the config keeps the ${REDIS_URL} default)"),
    ("DUNKTANK_CONFIG", "Path to the config file (default: ./dunktank.toml)"),
    ("RUST_LOG", "Log filter, e.g. dunktank=debug"),
];

const USAGE_EXAMPLES: &[&str] = &[
    "dunktank register peter peter@example.com",
    "dunktank post --as <user-id> \"nobody will know this was me\"",
    "dunktank feed --watch",
    "dunktank dunk <post-id>",
    "dunktank profile <user-id> --viewer <user-id>",
];

#[derive(Parser)]
#[command(name = "dunktank")]
#[command(version)]
#[command(
    about = "Post anonymously, dunk other posts to reveal who wrote them",
    long_about = r#"DunkTank command line client.

Every post starts anonymous. Throwing a ball at a post has a 1 in 5 chance of
dunking it, which reveals the author to everyone.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Config file path
    #[arg(long, env = "DUNKTANK_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let matches = build_cli_command()
            .styles(help_styles())
            .try_get_matches()
            .and_then(|matches| Cli::from_arg_matches(&matches));
        match matches {
            Ok(cli) => cli,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                let _ = err.print();
                std::process::exit(0);
            }
            Err(err) => err.exit(),
        }
    }
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    Cli::command()
        .after_long_help(render_appendix(use_color))
        .color(if use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        })
}

fn render_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let _ = writeln!(buffer, "{}", stylize("Examples:", theme.highlight, true, use_color));
    for example in USAGE_EXAMPLES {
        let arrow = stylize(ICONS.arrow, theme.secondary, false, use_color);
        let _ = writeln!(buffer, "  {arrow} {}", stylize(example, theme.secondary, false, use_color));
    }
    buffer.push('\n');

    let _ = writeln!(buffer, "{}", stylize("Environment Variables:", theme.highlight, true, use_color));
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();

    if let Err(err) = execute(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Commands::About = cli.command {
        print_about(&output);
        return Ok(());
    }

    let config = DunkTankConfig::load(cli.config.as_deref())?;
    let url = config.redis_url();
    log::debug!("connecting to {url} with prefix {}", config.store.prefix);
    let store = RedisStore::connect(&url, config.store.prefix.clone())
        .await
        .with_context(|| format!("Failed to connect to Redis at {url}"))?;

    let posts = PostRepository::new(store.clone(), &output).with_odds(config.dunk.odds)?;
    let users = UserRepository::new(store);

    handle_command(cli.command, &posts, &users, &output, &StdinConfirm).await
}
