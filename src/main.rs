use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pokerlog_gateway::api::{ApiServer, ApiState};
use pokerlog_gateway::channels::WhatsAppChannel;
use pokerlog_gateway::db::{self, AccountRepo, TournamentRepo};
use pokerlog_gateway::identity;
use pokerlog_gateway::llm::{OpenAiChat, WhisperClient};
use pokerlog_gateway::media::HttpMediaFetcher;
use pokerlog_gateway::{Config, ConversationRouter, Services};

/// Pokerlog - WhatsApp bot for logging poker sessions
#[derive(Parser)]
#[command(name = "pokerlog", version, about)]
struct Cli {
    /// Config file (default: ~/.config/pokerlog/config.toml)
    #[arg(short, long, env = "POKERLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the webhook server (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Register a player
    AddAccount {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Phone number, local or international
        #[arg(short, long)]
        phone: String,
    },
    /// Add a tournament to the schedule
    AddTournament {
        #[arg(short, long)]
        name: String,
        /// Local start time, "YYYY-MM-DD HH:MM"
        #[arg(short, long)]
        starts_at: String,
        #[arg(long)]
        venue: Option<String>,
        #[arg(long)]
        buy_in: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,pokerlog_gateway=info",
        1 => "info,pokerlog_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::AddAccount { name, phone } => add_account(&config, &name, &phone),
        Command::AddTournament {
            name,
            starts_at,
            venue,
            buy_in,
        } => add_tournament(&config, &name, &starts_at, venue.as_deref(), buy_in),
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    let timeout = config.pipeline.call_timeout;

    let api_key = config.require_openai_key()?;
    let (instance_id, token) = config.require_whatsapp()?;

    let pool = db::init(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    let services = Services {
        chat: Arc::new(OpenAiChat::new(&config.openai.base_url, api_key.clone(), timeout)?),
        stt: Arc::new(WhisperClient::new(
            &config.openai.base_url,
            api_key,
            config.openai.transcription_model.clone(),
            config.openai.transcription_language.clone(),
            timeout,
        )?),
        fetcher: Arc::new(HttpMediaFetcher::new(timeout)?),
        channel: Arc::new(WhatsAppChannel::new(
            &config.whatsapp.api_url,
            instance_id,
            token,
            timeout,
        )?),
    };

    tracing::info!(
        port,
        db = %config.db_path.display(),
        chat_model = %config.openai.chat_model,
        vision_model = %config.openai.vision_model,
        dispatch_retries = config.pipeline.dispatch_retries,
        "starting pokerlog gateway"
    );

    let router = ConversationRouter::new(&config, &pool, services);
    let state = ApiState {
        db: pool,
        router,
        webhook_token: config.server.webhook_token.clone(),
    };

    ApiServer::new(state, port).run().await?;
    Ok(())
}

fn add_account(config: &Config, name: &str, phone: &str) -> anyhow::Result<()> {
    let canonical = identity::canonical_phone(phone, &config.pipeline.country_code)
        .with_context(|| format!("not a phone number: {phone}"))?;

    let pool = db::init(&config.db_path)?;
    let account = AccountRepo::new(pool).create(name, &canonical)?;

    println!("Registered {} ({}) as {}", account.display_name, account.phone, account.id);
    Ok(())
}

fn add_tournament(
    config: &Config,
    name: &str,
    starts_at: &str,
    venue: Option<&str>,
    buy_in: Option<f64>,
) -> anyhow::Result<()> {
    let starts_at = NaiveDateTime::parse_from_str(starts_at, "%Y-%m-%d %H:%M")
        .with_context(|| format!("expected \"YYYY-MM-DD HH:MM\", got {starts_at:?}"))?;
    if buy_in.is_some_and(|b| b < 0.0) {
        anyhow::bail!("buy-in cannot be negative");
    }

    let pool = db::init(&config.db_path)?;
    let tournament = TournamentRepo::new(pool).create(name, starts_at, venue, buy_in)?;

    println!("Scheduled {} at {} ({})", tournament.name, tournament.starts_at, tournament.id);
    Ok(())
}
