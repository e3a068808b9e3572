//! Lighting Client CLI - talks to the lighting controller over WebSocket.
//!
//! This is the main binary entry point. See the `lighting_client` library
//! for the core functionality.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lighting_client::copy::deep_copy;
use lighting_client::protocol::{Command, EffectSettings, GlobalPatch};
use lighting_client::ws::WsConnector;
use lighting_client::{Config, ConnectionManager, DeviceState, SharedState};

/// How long one-shot commands wait for the socket to open.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `update-effect` waits for the effect catalog before sending unchecked.
const CATALOG_TIMEOUT: Duration = Duration::from_secs(3);

/// How long one-shot commands wait for their frame to be written.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "lighting-client")]
#[command(about = "Control plane for the LED lighting controller")]
#[command(version)]
struct Cli {
    /// Controller WebSocket URL (overrides config and LIGHTING_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stay connected and print every state change
    Watch {
        /// Print each snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change brightness, power, or follow-sun
    SetGlobal {
        /// Brightness (0-255)
        #[arg(long)]
        brightness: Option<u8>,
        /// Turn the strips on or off
        #[arg(long)]
        on: Option<bool>,
        /// Follow sunrise and sunset
        #[arg(long)]
        follow_sun: Option<bool>,
    },
    /// Set an effect's parameters on a strip
    UpdateEffect {
        /// Strip identifier
        #[arg(long)]
        strip: String,
        /// Effect name
        #[arg(long)]
        effect: String,
        /// Parameter values as a JSON object, e.g. '{"Speed": 3}'
        #[arg(long)]
        config: String,
    },
    /// Remove an effect from a strip
    RemoveEffect {
        /// Strip identifier
        #[arg(long)]
        strip: String,
        /// Effect name
        #[arg(long)]
        effect: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let state = SharedState::new();
    let manager = ConnectionManager::new(WsConnector, &config, Arc::clone(&state)).spawn();

    let result = match command {
        Commands::Watch { json } => watch(&state, json).await,
        Commands::SetGlobal {
            brightness,
            on,
            follow_sun,
        } => {
            let patch = GlobalPatch {
                brightness,
                on,
                follow_sun,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change: pass --brightness, --on or --follow-sun");
            }
            wait_connected(&state).await?;
            deliver(&state, Command::UpdateGlobal(patch)).await
        }
        Commands::UpdateEffect {
            strip,
            effect,
            config,
        } => {
            let settings: EffectSettings =
                serde_json::from_str(&config).context("--config must be a JSON object")?;
            wait_connected(&state).await?;

            // The controller announces its catalog shortly after the socket opens
            if !state
                .wait_until(CATALOG_TIMEOUT, |s| s.effect_catalog.is_some())
                .await
            {
                log::warn!("No effect catalog after {:?}; sending unchecked", CATALOG_TIMEOUT);
            }
            match state.snapshot().effect(&effect) {
                Some(descriptor) => descriptor.validate(&settings)?,
                None => log::warn!("Effect '{}' not in catalog; sending unchecked", effect),
            }
            deliver(
                &state,
                Command::UpdateEffect {
                    strip,
                    effect,
                    config: settings,
                },
            )
            .await
        }
        Commands::RemoveEffect { strip, effect } => {
            wait_connected(&state).await?;
            deliver(&state, Command::RemoveEffect { strip, effect }).await
        }
    };

    manager.abort();
    result
}

/// Print state changes until Ctrl-C.
async fn watch(state: &SharedState, json: bool) -> Result<()> {
    let mut rx = state.subscribe();
    print_snapshot(&rx.borrow_and_update().clone(), json)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down...");
                return Ok(());
            }
            changed = rx.changed() => {
                changed.context("state store dropped")?;
                let snapshot = rx.borrow_and_update().clone();
                print_snapshot(&snapshot, json)?;
            }
        }
    }
}

fn print_snapshot(snapshot: &DeviceState, json: bool) -> Result<()> {
    if json {
        let value = deep_copy(&serde_json::to_value(snapshot)?);
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    let effects = snapshot.effect_catalog.as_ref().map_or(0, Vec::len);
    let strips = snapshot.strip_config.as_ref().map_or(0, |c| c.len());
    match &snapshot.global_stats {
        Some(stats) => println!(
            "link={:?} networks={} effects={} strips={} brightness={} on={} follow_sun={}",
            snapshot.link,
            snapshot.networks.len(),
            effects,
            strips,
            stats.brightness,
            stats.on,
            stats.follow_sun
        ),
        None => println!(
            "link={:?} networks={} effects={} strips={}",
            snapshot.link,
            snapshot.networks.len(),
            effects,
            strips
        ),
    }
    Ok(())
}

async fn wait_connected(state: &SharedState) -> Result<()> {
    if !state.wait_until(CONNECT_TIMEOUT, DeviceState::connected).await {
        anyhow::bail!("Controller not reachable after {:?}", CONNECT_TIMEOUT);
    }
    Ok(())
}

/// Send `command` and wait until it has been written to the socket.
async fn deliver(state: &SharedState, command: Command) -> Result<()> {
    let kind = command.kind();
    match tokio::time::timeout(WRITE_TIMEOUT, state.deliver(&command)).await {
        Ok(true) => {
            println!("Sent {}", kind);
            Ok(())
        }
        Ok(false) => anyhow::bail!("Connection lost before '{}' was written", kind),
        Err(_) => anyhow::bail!("Timed out writing '{}' after {:?}", kind, WRITE_TIMEOUT),
    }
}
