pub mod noninteractive;
pub mod output;
pub mod sanitize;
pub mod tui;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::client::{ChatService, HttpChatService};
use crate::core::config::{load_config, AppConfig};
use crate::core::credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use crate::session::SessionController;

#[derive(Parser, Debug)]
#[command(
    name = "graphchat",
    version,
    about = "Terminal client for the code-graph chat assistant"
)]
pub struct Cli {
    /// Send one message and print the reply (non-interactive mode)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Attach a file to the message; may be used without --prompt
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print the stored conversation and exit
    #[arg(long, conflicts_with_all = ["prompt", "file"])]
    pub history: bool,

    /// Output format for non-interactive mode
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Directory searched for graphchat.json
    #[arg(short = 'c', long = "cwd")]
    pub working_dir: Option<PathBuf>,

    /// Override the service base URL
    #[arg(long, value_name = "URL", env = "GRAPHCHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Store an access token and exit
    #[arg(long, value_name = "TOKEN", conflicts_with = "logout")]
    pub set_token: Option<String>,

    /// Remove the stored access token and exit
    #[arg(long)]
    pub logout: bool,

    /// Hide progress notes on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn is_interactive(&self) -> bool {
        self.prompt.is_none()
            && self.file.is_none()
            && !self.history
            && self.set_token.is_none()
            && !self.logout
    }
}

/// Everything a front end needs: the resolved configuration and the session
/// controller wired to the HTTP service and the credential store.
pub struct App {
    pub config: AppConfig,
    pub controller: SessionController,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let service: Arc<dyn ChatService> = Arc::new(HttpChatService::new(&config));
        let controller = SessionController::new(service, credential_store(&config));
        Self { config, controller }
    }
}

/// An environment token wins over the stored one and is never written to disk.
fn credential_store(config: &AppConfig) -> Arc<dyn CredentialStore> {
    match &config.token {
        Some(token) => Arc::new(MemoryCredentialStore::new(Some(token.clone()))),
        None => Arc::new(FileCredentialStore::new(config.credentials_path())),
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.working_dir.clone())?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    config.debug |= cli.debug;

    init_logging(&config, cli.is_interactive())?;
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    if let Some(token) = &cli.set_token {
        return set_token(&config, token, cli.quiet);
    }
    if cli.logout {
        return logout(&config, cli.quiet);
    }

    let mut app = App::new(config);

    if cli.history {
        return noninteractive::run_history(&app, cli.output_format).await;
    }
    if cli.prompt.is_some() || cli.file.is_some() {
        return noninteractive::run_prompt(
            &mut app,
            cli.prompt.as_deref().unwrap_or_default(),
            cli.file.as_deref(),
            cli.output_format,
            cli.quiet,
        )
        .await;
    }

    tui::run(app).await
}

/// Log to stderr, or to a file under the data directory while the TUI owns
/// the terminal.
fn init_logging(config: &AppConfig, to_file: bool) -> Result<()> {
    let filter = EnvFilter::new(if config.debug { "debug" } else { "warn" });

    if to_file {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating {}", config.data_dir.display()))?;
        let path = config.log_path();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn set_token(config: &AppConfig, token: &str, quiet: bool) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("token must not be empty");
    }
    let store = FileCredentialStore::new(config.credentials_path());
    store.set(token)?;
    if !quiet {
        output::print_note(&format!("Token saved to {}", store.path().display()));
        if config.token.is_some() {
            output::print_warning("GRAPHCHAT_TOKEN is set and takes precedence");
        }
    }
    Ok(())
}

fn logout(config: &AppConfig, quiet: bool) -> Result<()> {
    FileCredentialStore::new(config.credentials_path()).remove()?;
    if !quiet {
        output::print_note("Logged out");
        if config.token.is_some() {
            output::print_warning("GRAPHCHAT_TOKEN is still set in the environment");
        }
    }
    Ok(())
}
