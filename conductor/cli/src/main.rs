//! Course Chat - Terminal Surface
//!
//! A line-oriented terminal client for the course conversation service.
//! It shows the course catalogue, asks about a chosen course and streams
//! the reply as it arrives.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local service on the default port
//! course-chat
//!
//! # Another service
//! course-chat --base-url http://courses.internal:5000
//!
//! # With config file
//! course-chat --config ~/.config/course-chat/config.toml
//!
//! # Verbose logging (goes to stderr)
//! RUST_LOG=coursechat_core=debug course-chat
//! ```
//!
//! Inside the client, `/help` lists the commands. Ctrl-C cancels the
//! response in progress, or quits when nothing is running. Piped input is
//! fine: at end of input the client waits for the last reply, then exits.

mod app;
mod commands;
mod display;

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use coursechat_core::{load_config_from_path, Conductor, ConfigOverrides, HttpBackend};

use app::App;
use display::DisplayState;

/// Course Chat - ask a conversation service about university courses
#[derive(Parser, Debug)]
#[command(name = "course-chat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the conversation service
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "COURSE_CHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Give up if the first byte of a reply takes longer than this
    #[arg(long, value_name = "MS")]
    first_byte_timeout_ms: Option<u64>,

    /// Give up if a reply goes silent for longer than this
    #[arg(long, value_name = "MS")]
    inter_chunk_timeout_ms: Option<u64>,

    /// Print replies as HTML instead of plain text
    #[arg(long)]
    show_html: bool,

    /// Wrap width for committed replies
    #[arg(short = 'w', long, default_value_t = 80)]
    width: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "COURSE_CHAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

/// Initialize logging
///
/// Logs go to stderr so they never interleave with streamed text.
fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("course_chat={level},coursechat_core={level}"))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

/// Read stdin lines on a task so the main loop can select over them
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let overrides = ConfigOverrides {
        base_url: args.base_url.clone(),
        first_byte_timeout_ms: args.first_byte_timeout_ms,
        inter_chunk_timeout_ms: args.inter_chunk_timeout_ms,
    };
    let config = load_config_from_path(args.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    info!(
        base_url = %config.base_url,
        source = %config.base_url_source,
        "Configuration loaded"
    );

    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let (tx, rx) = mpsc::channel(256);
    let conductor = Conductor::new(backend, config, tx);
    let display = DisplayState::new(args.width, args.show_html);
    let mut app = App::new(conductor, rx, display, io::stdout().is_terminal());

    let mut stdout = io::stdout();
    app.start(&mut stdout).await?;
    app.run(spawn_stdin_reader(), &mut stdout).await
}
