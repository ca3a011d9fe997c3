use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sparkchat_core::credentials::{API_KEY_NAME, SYSTEM_PROMPT_NAME};
use sparkchat_core::{
    ChatSession, Config, CredentialStore, Credentials, FileCredentialStore, OpenAIClient,
};
use sparkchat_cli::input;
use sparkchat_cli::render;
use sparkchat_cli::repl::Repl;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[clap(name = "sparkchat", author, version = "0.1.0", about = "Spark Chat terminal client")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, global = true, help = "Path to config.toml")]
    config: Option<PathBuf>,

    #[clap(long, global = true, help = "Where the API key and system prompt are stored")]
    credentials_file: Option<PathBuf>,

    #[clap(long, global = true, help = "Base URL of the OpenAI-compatible API")]
    api_base: Option<String>,

    #[clap(long, global = true, help = "Seconds to wait for a reply")]
    timeout: Option<u64>,

    #[clap(long, short, global = true, help = "Log level [default: info]")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat (default command)
    Chat,
    /// Send one message on a fresh conversation and print the reply
    Ask {
        #[clap(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Manage stored settings
    Config {
        #[clap(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Save the API key
    SetKey { key: String },
    /// Save the system prompt
    SetPrompt {
        #[clap(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the stored settings with the key masked
    Show,
    /// Show where the config and credentials files live
    Path,
    /// Print a config.toml holding the default values
    Default,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path).await?;
    if let Some(api_base) = &cli.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(path) = &cli.credentials_file {
        config.credentials_file = Some(path.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;

    let log_level_filter = config.log_level_filter()?;
    match &cli.command {
        Some(Commands::Config { .. }) => {
            env_logger::Builder::new()
                .filter_level(log_level_filter)
                .init();
        }
        _ => {
            // Interactive and one-shot output stay clean; logs go to a file.
            let log_file = open_log_file()?;
            env_logger::Builder::new()
                .filter_level(log_level_filter)
                .target(env_logger::Target::Pipe(Box::new(log_file)))
                .init();
        }
    }

    log::debug!("Loaded config from {}: {:?}", config_path.display(), config);

    match cli.command {
        Some(Commands::Ask { text }) => run_ask(&config, &text.join(" ")).await,
        Some(Commands::Config { action }) => handle_config_command(&config, &config_path, action),
        Some(Commands::Chat) | None => run_chat(&config).await,
    }
}

fn open_log_file() -> Result<std::fs::File> {
    let log_dir = dirs::cache_dir()
        .context("Could not determine cache directory")?
        .join("sparkchat");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("sparkchat.log"))
        .context("Failed to open sparkchat.log")?;
    Ok(log_file)
}

fn open_store(config: &Config) -> Result<FileCredentialStore> {
    let path = config.credentials_path()?;
    Ok(FileCredentialStore::open(path)?)
}

async fn run_chat(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    let chat = ChatSession::new(Box::new(store), notification_tx)?
        .with_request_timeout(config.request_timeout());
    let client = OpenAIClient::new().with_api_base(&config.api_base);

    let (interrupt_tx, interrupt_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_tx.send(()).is_err() {
                break;
            }
        }
    });

    let mut repl = Repl::new(
        chat,
        &client,
        notification_rx,
        &config.api_base,
        std::io::stdout(),
    );
    repl.run(input::stdin_lines()?, interrupt_rx).await
}

async fn run_ask(config: &Config, text: &str) -> Result<()> {
    let store = open_store(config)?;
    let (notification_tx, mut notification_rx) = mpsc::unbounded_channel();
    let mut chat = ChatSession::new(Box::new(store), notification_tx)?
        .with_request_timeout(config.request_timeout());
    let client = OpenAIClient::new().with_api_base(&config.api_base);

    log::info!("Running one-shot ask in session {}", chat.session_id());
    let result = chat
        .send_message(text, &client)
        .await
        .map(|reply| reply.content().to_string());

    while let Ok(notification) = notification_rx.try_recv() {
        eprintln!("{}", render::format_notification(&notification));
    }

    let reply = result?;
    println!("{}", reply);
    Ok(())
}

fn handle_config_command(
    config: &Config,
    config_path: &std::path::Path,
    action: ConfigCommands,
) -> Result<()> {
    match action {
        ConfigCommands::SetKey { key } => {
            let mut store = open_store(config)?;
            store.set(API_KEY_NAME, &key)?;
            println!("API key saved to {}", store.path().display());
        }
        ConfigCommands::SetPrompt { text } => {
            let mut store = open_store(config)?;
            store.set(SYSTEM_PROMPT_NAME, &text.join(" "))?;
            println!("System prompt saved to {}", store.path().display());
        }
        ConfigCommands::Show => {
            let store = open_store(config)?;
            let credentials = Credentials::load(&store)?;
            println!("{}", render::settings(&credentials, &config.api_base));
            println!("Request timeout: {}s", config.request_timeout_secs);
        }
        ConfigCommands::Path => {
            println!("Config file: {}", config_path.display());
            println!("Credentials file: {}", config.credentials_path()?.display());
        }
        ConfigCommands::Default => {
            println!("{}", Config::serialize_default());
        }
    }

    Ok(())
}
