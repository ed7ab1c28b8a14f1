use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use senpai_core::code::render_message_html;
use senpai_core::{
    detect_language, is_code_bearing, parse, split_fenced, AskClient, ChatSession, Config,
    FileCandidate, Message, RenderContext, Theme, SEND_FAILURE_TEXT,
};
use tracing::{error, info};

mod app;
mod chat_view;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "senpai", version, about = "Chat with the Senpai AI assistant from the terminal")]
struct Cli {
    /// Backend base URL; `/ask` is appended
    #[arg(long, global = true, env = "SENPAI_BACKEND_URL")]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the chat UI (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Message text
        message: String,
        /// Attach a file (repeatable)
        #[arg(short, long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },
    /// Print the markup for a reply read from a file or stdin
    Render {
        path: Option<PathBuf>,
        /// light or dark
        #[arg(long, value_parser = parse_theme)]
        theme: Option<Theme>,
    },
    /// Show or update the saved configuration
    Config {
        /// Persist this backend URL
        #[arg(long = "set-backend-url", value_name = "URL")]
        set_backend_url: Option<String>,
        /// Persist a theme (light or dark)
        #[arg(long = "set-theme", value_parser = parse_theme)]
        set_theme: Option<Theme>,
        /// Persist the reveal speed, in milliseconds per character
        #[arg(long = "set-reveal-interval", value_name = "MS")]
        set_reveal_interval: Option<u64>,
    },
}

fn parse_theme(s: &str) -> std::result::Result<Theme, String> {
    Theme::from_str(s).ok_or_else(|| format!("unknown theme {:?}, expected light or dark", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let _guard = logging::init_file();
            let config = load_config(cli.backend_url)?;
            run_chat(config).await
        }
        Command::Ask { message, files } => {
            logging::init_stderr();
            let config = load_config(cli.backend_url)?;
            ask(&config, message, &files).await
        }
        Command::Render { path, theme } => {
            logging::init_stderr();
            let config = load_config(cli.backend_url)?;
            render(path.as_deref(), theme.unwrap_or_else(|| config.initial_theme()))
        }
        Command::Config { set_backend_url, set_theme, set_reveal_interval } => {
            logging::init_stderr();
            configure(set_backend_url, set_theme, set_reveal_interval)
        }
    }
}

/// File and environment settings, with the command line taking precedence.
fn load_config(backend_url: Option<String>) -> Result<Config> {
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = backend_url {
        config.backend_url = Some(url);
    }
    Ok(config)
}

async fn run_chat(config: Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = tui::EventHandler::new();
    let mut app = App::new(&config, events.sender());
    info!(theme = app.session.theme().as_str(), "chat started");

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!("chat closed");
    result
}

async fn ask(config: &Config, message: String, files: &[PathBuf]) -> Result<()> {
    let mut session = ChatSession::new(config.initial_theme());

    let mut candidates = Vec::new();
    for path in files {
        candidates.push(FileCandidate::from_path(path).await?);
    }
    let report = session.stage_all(candidates);
    if !report.is_clean() {
        for rejection in &report.rejected {
            eprintln!("{}", rejection);
        }
        bail!("{} file(s) rejected", report.rejected.len());
    }

    session.input = message;
    let Some(outbound) = session.begin_send() else {
        bail!("Nothing to send: the message is empty and no files are attached");
    };

    let client = AskClient::new(&config.backend_base());
    let response = match client.ask(&outbound).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "request failed");
            bail!(SEND_FAILURE_TEXT);
        }
    };

    print_reply(&response.into_message());
    Ok(())
}

/// Plain-terminal rendition of a reply: markup stripped, code printed raw
/// between labelled rules.
fn print_reply(message: &Message) {
    if let Some(image) = &message.image {
        if let Some(uri) = image.source_uri() {
            if uri.starts_with("data:") {
                println!("[{}: {} embedded]", image.alt_text(), image.mime_type);
            } else {
                println!("[{}: {}]", image.alt_text(), uri);
            }
        }
        if let Some(name) = &image.special_recipient {
            println!("✨ Special message for {}", name);
        }
    }

    if !is_code_bearing(&message.text) {
        println!("{}", parse(&message.text).plain_text());
        return;
    }

    let segments = split_fenced(&message.text);
    if !segments.preamble.is_empty() {
        println!("{}\n", parse(segments.preamble).plain_text());
    }
    println!("--- {} ---", detect_language(&message.text).to_uppercase());
    println!("{}", segments.code);
    println!("---");
    if !segments.postamble.is_empty() {
        println!("\n{}", parse(segments.postamble).plain_text());
    }
}

fn render(path: Option<&Path>, theme: Theme) -> Result<()> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let ctx = RenderContext::new(theme);
    println!("{}", render_message_html(&Message::assistant(text), &ctx));
    Ok(())
}

fn configure(
    backend_url: Option<String>,
    theme: Option<Theme>,
    reveal_interval_ms: Option<u64>,
) -> Result<()> {
    let path = Config::get_config_path()?;
    // Only file values; environment overrides never get written back
    let mut config = Config::load_from(&path)?;

    let changed = backend_url.is_some() || theme.is_some() || reveal_interval_ms.is_some();
    if let Some(url) = backend_url {
        config.backend_url = Some(url);
    }
    if let Some(theme) = theme {
        config.theme = Some(theme);
    }
    if let Some(ms) = reveal_interval_ms {
        config.reveal_interval_ms = Some(ms);
    }
    if changed {
        config.save_to(&path)?;
        info!(path = %path.display(), "config saved");
    }

    println!("Config file: {}", path.display());
    println!("backend_url: {}", config.backend_url.as_deref().unwrap_or("(not set)"));
    println!("theme: {}", config.initial_theme().as_str());
    println!("reveal_interval_ms: {}", config.reveal_interval().as_millis());
    Ok(())
}
