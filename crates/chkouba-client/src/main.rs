//! chkouba-client - headless table client
//!
//! connects to a game over websocket, runs the full client core against a
//! logging surface and reads moves from stdin.

mod headless;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chkouba_client::layout::Point;
use chkouba_client::{protocol, Client, ClientConfig, PointerEvent, Surface};

use headless::HeadlessSurface;

#[derive(Parser)]
#[command(name = "chkouba-client")]
#[command(about = "headless chkouba table client")]
struct Cli {
    /// config file (default: <config dir>/chkouba/client.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// seat name, overrides the config
    #[arg(short, long)]
    name: Option<String>,

    /// server base url, e.g. ws://127.0.0.1:8000
    #[arg(short, long)]
    url: Option<String>,

    /// game id to join
    #[arg(short, long)]
    game: Option<String>,

    /// log filter used when RUST_LOG is unset
    #[arg(long, default_value = "chkouba_client=info")]
    log: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::load_default()?,
    };
    if let Some(name) = cli.name {
        config.player_name = name;
    }
    if let Some(url) = cli.url {
        config.server.url = url;
    }
    if let Some(game) = cli.game {
        config.server.game_id = game;
    }
    config.validate()?;

    let endpoint = config.ws_endpoint();
    tracing::info!(%endpoint, "connecting");
    let (ws, _response) = connect_async(&endpoint)
        .await
        .with_context(|| format!("connecting to {}", endpoint))?;
    let (mut sink, mut stream) = ws.split();

    let (tx, mut completions) = mpsc::unbounded_channel();
    let mut client = Client::new(config, HeadlessSurface::new(tx))?;
    client.connected();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    print_help();

    loop {
        for msg in client.drain_outbound() {
            let text = protocol::encode(&msg)?;
            tracing::debug!(%text, "send");
            if let Err(e) = sink.send(Message::Text(text)).await {
                return Err(client.connection_lost(e.to_string()).into());
            }
        }

        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = client.handle_text(&text) {
                        tracing::warn!(error = %e, "dropping frame");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_else(|| "closed".into());
                    return Err(client.connection_lost(reason).into());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(client.connection_lost(e.to_string()).into()),
                None => return Err(client.connection_lost("stream ended").into()),
            },
            Some(ticket) = completions.recv() => client.on_complete(ticket),
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !run_command(&mut client, line.trim()) {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    for msg in client.drain_outbound() {
        sink.send(Message::Text(protocol::encode(&msg)?)).await.ok();
    }
    sink.close().await.ok();
    Ok(())
}

fn print_help() {
    tracing::info!("commands: play <card> | drag <card> | start | next | reset | hand | quit");
}

/// returns false to quit
fn run_command<S: Surface>(client: &mut Client<S>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("play"), Some(card)) => {
            let event = PointerEvent::Tap {
                card: card.into(),
                held_ms: 0,
            };
            if let Err(rejected) = client.on_pointer(event) {
                tracing::warn!(?rejected, "move not sent");
            }
        }
        (Some("drag"), Some(card)) => {
            let viewport = client.config().viewport;
            let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
            let _ = client.on_pointer(PointerEvent::DragStart { card: card.into() });
            if let Err(rejected) = client.on_pointer(PointerEvent::DragRelease {
                card: card.into(),
                at: center,
            }) {
                tracing::warn!(?rejected, "move not sent");
            }
        }
        (Some("start"), _) => client.start_game(),
        (Some("next"), _) => client.next_round(),
        (Some("reset"), _) => client.request_reset(),
        (Some("hand"), _) => match client.snapshot() {
            Some(snap) => {
                let local = client.local_seat();
                let hand: Vec<String> = snap
                    .seats
                    .get(local)
                    .map(|s| s.hand.iter().map(|c| c.id.to_string()).collect())
                    .unwrap_or_default();
                let table: Vec<String> = snap.table.iter().map(|c| c.id.to_string()).collect();
                tracing::info!(hand = %hand.join(" "), table = %table.join(" "), "cards");
            }
            None => tracing::info!("no state yet"),
        },
        (Some("quit"), _) | (Some("exit"), _) => return false,
        (None, _) => {}
        _ => print_help(),
    }
    true
}
