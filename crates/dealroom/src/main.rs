//! # dealroom
//!
//! Terminal chat client: joins the room between an applicant and their
//! sales manager, sends each stdin line as a message, and prints inbound
//! messages with humanized times.

#![deny(unsafe_code)]

use anyhow::{Context, Result, bail};
use clap::Parser;
use dealroom::cli::{ChatArgs, Cli, Command, HistoryArgs};
use dealroom::render;
use dealroom_client::{ChatSession, ConnectionState, SessionClient, TransportConfig, events};
use dealroom_core::{Message, Normalizer};
use dealroom_settings::DealroomSettings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Load `--settings` into the global cache, or fall back to the default
/// file lookup on first use.
fn load_settings(cli: &Cli) -> Result<&'static DealroomSettings> {
    if let Some(path) = &cli.settings {
        let loaded = dealroom_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        if dealroom_settings::init_settings(loaded).is_err() {
            bail!("settings were already initialized");
        }
    }
    Ok(dealroom_settings::get_settings())
}

fn normalizer(settings: &DealroomSettings) -> Normalizer {
    Normalizer::default().with_default_name(settings.display.default_name.clone())
}

async fn run_chat(args: &ChatArgs, settings: &DealroomSettings) -> Result<()> {
    let endpoint = args
        .endpoint(settings)
        .context("Failed to resolve realtime endpoint")?;
    let (me, other) = args.participants();
    let style = settings.display.clock_style;
    let normalizer = normalizer(settings);

    let mut client = SessionClient::websocket(&endpoint, TransportConfig::from(&settings.transport));
    let _ = client.subscribe(events::CONNECT_ERROR, |data| {
        eprintln!("connect error: {}", data["message"].as_str().unwrap_or("unknown"));
    });
    let mut chat = ChatSession::new(client, normalizer.clone(), me, other, args.role.sender_kind());
    if let Some(name) = &args.name {
        chat = chat.with_self_name(name.clone());
    }
    if let Some(name) = &args.their_name {
        chat = chat.with_counterpart_name(name.clone());
    }

    let (tx, mut inbox) = mpsc::unbounded_channel::<Message>();
    let _ = chat.on_message(move |message| drop(tx.send(message)));
    let handle = chat.open();

    if !handle.connected().await {
        bail!("could not connect to {endpoint}");
    }
    eprintln!("connected to {endpoint}; type a message and press enter (Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut state = handle.watch_state();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if !chat.send(&chat.compose(line)) {
                    eprintln!("(not sent: message is empty)");
                }
            }
            Some(message) = inbox.recv() => {
                println!("{}", render::format_line(&message, &normalizer, style));
            }
            changed = state.changed() => {
                if changed.is_err() || handle.state() == ConnectionState::Disconnected {
                    eprintln!("connection lost");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    chat.close();
    Ok(())
}

fn run_history(args: &HistoryArgs, settings: &DealroomSettings) -> Result<()> {
    let json = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let lines = render::render_history(
        &json,
        &normalizer(settings),
        args.name.as_deref(),
        settings.display.clock_style,
    )
    .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings first: the log level comes from them.
    let settings = load_settings(&cli)?;
    dealroom_core::logging::init_subscriber(&settings.logging.level);
    tracing::debug!(environment = %settings.realtime.environment, "settings loaded");

    match &cli.command {
        Command::Chat(args) => run_chat(args, settings).await,
        Command::History(args) => run_history(args, settings),
    }
}
