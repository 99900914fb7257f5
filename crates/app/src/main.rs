mod mpv;
mod tui;
mod ui;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumina_catalog::{Catalog, SpotifyCatalog};
use lumina_core::{config, AppConfig, FileTokenStorage, Session, Track};
use lumina_recommend::{ask_dj, GeminiRecommender};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lumina",
    about = "Search the catalog, play previews, and ask the DJ for a mood"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the terminal player (default).
    Run,
    Search {
        query: String,
    },
    Releases,
    Recommend {
        mood: String,
    },
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    Doctor,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    Set { token: String },
    Clear,
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Config {
        action: ConfigAction::Init,
    } = cmd
    {
        init_config(&cfg_path)?;
        println!("Initialized config at {}", cfg_path.display());
        return Ok(());
    }

    let cfg = load_or_default(&cfg_path)?;
    match cmd {
        Commands::Run => {
            let log_path = config::data_dir().join("lumina.log");
            init_logging(&cfg.log_level, Some(&log_path))?;
            eprintln!("lumina log: {}", log_path.display());
            tui::run(cfg, cfg_path).await
        }
        Commands::Search { query } => {
            init_logging(&cfg.log_level, None)?;
            let catalog = build_catalog(&cfg)?;
            let tracks = catalog.search_tracks(&query).await?;
            print_tracks(&tracks);
            Ok(())
        }
        Commands::Releases => {
            init_logging(&cfg.log_level, None)?;
            let catalog = build_catalog(&cfg)?;
            let tracks = catalog.new_releases().await?;
            print_tracks(&tracks);
            Ok(())
        }
        Commands::Recommend { mood } => {
            init_logging(&cfg.log_level, None)?;
            let catalog = build_catalog(&cfg)?;
            let recommender = GeminiRecommender::new(&cfg.recommend)?;
            for item in ask_dj(&recommender, &catalog, &mood).await {
                let rec = &item.recommendation;
                match &item.track {
                    Some(t) if t.is_playable() => {
                        println!("{} - {}  [{}]  {}", rec.artist, rec.title, t.duration, rec.reason)
                    }
                    Some(_) => println!("{} - {}  [no preview]  {}", rec.artist, rec.title, rec.reason),
                    None => println!("{} - {}  [not in catalog]  {}", rec.artist, rec.title, rec.reason),
                }
            }
            Ok(())
        }
        Commands::Token { action } => {
            init_logging(&cfg.log_level, None)?;
            token(&cfg, action)
        }
        Commands::Doctor => {
            init_logging(&cfg.log_level, None)?;
            doctor(&cfg).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn token_storage(cfg: &AppConfig) -> FileTokenStorage {
    FileTokenStorage::new(cfg.token_path_or_default())
}

fn open_session(cfg: &AppConfig) -> Arc<Session> {
    Arc::new(Session::new(Box::new(token_storage(cfg))))
}

fn build_catalog(cfg: &AppConfig) -> Result<SpotifyCatalog> {
    SpotifyCatalog::new(open_session(cfg), cfg.catalog.clone())
        .context("failed to build catalog client")
}

fn print_tracks(tracks: &[Track]) {
    if tracks.is_empty() {
        println!("No results found");
        return;
    }
    for t in tracks {
        let marker = if t.is_playable() { "" } else { "  (no preview)" };
        println!("{:>5}  {} - {}  [{}]{}", t.duration, t.artist, t.title, t.album, marker);
    }
}

fn token(cfg: &AppConfig, action: TokenAction) -> Result<()> {
    let storage = token_storage(cfg);
    let path = storage.path().to_path_buf();
    let session = Session::new(Box::new(storage));
    match action {
        TokenAction::Set { token } => {
            session.set_token(&token);
            if session.has_valid_token() {
                println!("Token saved to {}", path.display());
            } else {
                println!("Token saved but it is too short to be a valid access token");
            }
        }
        TokenAction::Clear => {
            session.clear_token();
            println!("Token cleared");
        }
        TokenAction::Status => {
            println!("token file: {}", path.display());
            println!(
                "session: {}",
                if session.has_valid_token() {
                    "live"
                } else {
                    "expired or missing"
                }
            );
        }
    }
    Ok(())
}

async fn doctor(cfg: &AppConfig) -> Result<()> {
    println!("== lumina doctor ==");

    let session = open_session(cfg);
    let live = session.has_valid_token();
    println!(
        "Catalog token: {}",
        if live { "present" } else { "missing or invalid" }
    );

    if live {
        let catalog = SpotifyCatalog::new(session.clone(), cfg.catalog.clone())?;
        match catalog.new_releases().await {
            Ok(tracks) => println!(
                "Catalog API ({}): reachable, {} new releases",
                catalog.name(),
                tracks.len()
            ),
            Err(err) => println!("Catalog API ({}): {err}", catalog.name()),
        }
    } else {
        println!("Catalog API: skipped (no session)");
    }

    match find_in_path(&cfg.player.mpv_binary) {
        Some(path) => println!("mpv: {}", path.display()),
        None => println!("mpv: '{}' not found in PATH; previews will not play", cfg.player.mpv_binary),
    }

    let recommender = GeminiRecommender::new(&cfg.recommend)?;
    println!(
        "Generative API key: {}",
        if recommender.has_api_key() {
            "configured"
        } else {
            "missing; the DJ will answer with its fallback list"
        }
    );
    Ok(())
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|p| p.is_file())
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("lumina").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

pub(crate) fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_config(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn parse_config(data: &str) -> Result<AppConfig> {
    Ok(toml::from_str(data)?)
}

/// Stderr for one-shot commands; a log file for the TUI so the screen stays clean.
fn init_logging(log_level: &str, file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init();
        }
    }
    Ok(())
}

pub(crate) async fn spawn_reload_watchers(
    path: PathBuf,
    poll_ms: u64,
    tx: mpsc::Sender<()>,
) -> Result<()> {
    let tx_poll = tx.clone();
    tokio::spawn(async move {
        let mut known_mtime = file_mtime(&path);
        let sleep = Duration::from_millis(poll_ms.max(2_000));
        loop {
            tokio::time::sleep(sleep).await;
            let current = file_mtime(&path);
            if current.is_some() && current != known_mtime {
                known_mtime = current;
                info!(path = %path.display(), "config file changed");
                let _ = tx_poll.send(()).await;
            }
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let tx_hup = tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::hangup()) {
                while sig.recv().await.is_some() {
                    let _ = tx_hup.send(()).await;
                }
            }
        });
    }

    Ok(())
}

fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    let non_blank = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_blank("LUMINA_LOG_LEVEL") {
        cfg.log_level = v;
    }
    if let Some(v) = non_blank("LUMINA_TOKEN_PATH") {
        cfg.token_path = Some(PathBuf::from(v));
    }
    if let Some(v) = non_blank("LUMINA_GENAI_API_KEY").or_else(|| non_blank("API_KEY")) {
        cfg.recommend.api_key = Some(v);
    }
}
