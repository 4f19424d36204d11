//! Building Relay CLI
//!
//! Runs the relay, watches it like a kiosk would, or pushes sensor codes.

use building_relay::{
    client::{self, HttpFeed},
    server, BuildingCatalog, ClientConfig, RelayConfig, SensorOverrides, VERSION,
};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "building-relay")]
#[command(version = VERSION)]
#[command(about = "Touch-sensor to active-building relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingest and query endpoints
    Serve {
        /// Ingest WebSocket host (env: WS_HOST)
        #[arg(long)]
        ws_host: Option<String>,

        /// Ingest WebSocket port (env: WS_PORT)
        #[arg(long)]
        ws_port: Option<u16>,

        /// Query HTTP host (env: HTTP_HOST)
        #[arg(long)]
        http_host: Option<String>,

        /// Query HTTP port (env: HTTP_PORT)
        #[arg(long)]
        http_port: Option<u16>,

        /// Cap for building identifiers (env: BUILDING_COUNT)
        #[arg(long)]
        building_count: Option<i64>,

        /// Highest accepted sensor code (env: SENSOR_MAX)
        #[arg(long)]
        sensor_max: Option<i64>,

        /// Sensor overrides as code=building pairs, or "reference" (env: SENSOR_OVERRIDES)
        #[arg(long)]
        sensor_overrides: Option<SensorOverrides>,

        /// Allowed CORS origin (env: CORS_ORIGIN)
        #[arg(long)]
        cors_origin: Option<String>,
    },

    /// Poll the relay and print status changes
    Watch {
        /// Relay base URL (env: VITE_BACKEND_URL or BACKEND_URL)
        #[arg(long)]
        backend_url: Option<String>,

        /// Poll interval in milliseconds (env: POLL_INTERVAL_MS)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Send raw sensor codes to the ingest endpoint
    Send {
        /// Ingest URL (env: VITE_WS_URL or WS_URL)
        #[arg(long)]
        url: Option<String>,

        /// Payloads to send, one frame each
        #[arg(required = true)]
        codes: Vec<String>,
    },

    /// Show effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("building_relay=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            ws_host,
            ws_port,
            http_host,
            http_port,
            building_count,
            sensor_max,
            sensor_overrides,
            cors_origin,
        } => {
            let mut config = RelayConfig::from_env()?;
            if let Some(host) = ws_host {
                config.ws_host = host;
            }
            if let Some(port) = ws_port {
                config.ws_port = port;
            }
            if let Some(host) = http_host {
                config.http_host = host;
            }
            if let Some(port) = http_port {
                config.http_port = port;
            }
            if let Some(count) = building_count {
                config.building_count = count;
            }
            if let Some(max) = sensor_max {
                config.sensor_max = max;
            }
            if let Some(overrides) = sensor_overrides {
                config.sensor_overrides = overrides;
            }
            if let Some(origin) = cors_origin {
                config.cors_origin = origin;
            }
            cmd_serve(config.validate()?).await
        }
        Commands::Watch {
            backend_url,
            interval_ms,
        } => {
            let mut config = ClientConfig::from_env()?;
            if let Some(url) = backend_url {
                config.backend_url = url;
            }
            if let Some(ms) = interval_ms {
                config.poll_interval = Duration::from_millis(ms);
            }
            cmd_watch(config.validate()?).await
        }
        Commands::Send { url, codes } => {
            let mut config = ClientConfig::from_env()?;
            if let Some(url) = url {
                config.ws_url = url;
            }
            cmd_send(&config, &codes).await
        }
        Commands::Config => cmd_config(),
    }
}

async fn cmd_serve(config: RelayConfig) -> anyhow::Result<()> {
    println!("Building Relay v{VERSION}");
    println!("  Building count: {}", config.building_count);
    println!("  Sensor range: 0..={}", config.sensor_max);
    if !config.sensor_overrides.is_empty() {
        println!("  Sensor overrides: enabled");
    }
    println!("  CORS origin: {}", config.cors_origin);
    println!();

    let mut stop = ctrlc_channel()?;
    let handle = server::run(config).await?;

    println!("Ingest: ws://{}", handle.ingest_addr());
    println!("Query:  http://{}/api/building", handle.query_addr());
    println!();
    println!("Press Ctrl+C to stop");

    let _ = stop.wait_for(|stopping| *stopping).await;
    handle.shutdown().await;
    Ok(())
}

async fn cmd_watch(config: ClientConfig) -> anyhow::Result<()> {
    let feed = HttpFeed::from_config(&config);
    println!("Polling {} every {}ms", feed.endpoint(), config.poll_interval.as_millis());
    println!("Press Ctrl+C to stop");
    println!();

    let mut stop = ctrlc_channel()?;
    let handle = client::mount(feed, BuildingCatalog::default(), config.poll_interval);
    let mut updates = handle.subscribe();

    print_state(&updates.borrow_and_update());
    loop {
        tokio::select! {
            _ = stop.wait_for(|stopping| *stopping) => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_state(&updates.borrow_and_update());
            }
        }
    }

    handle.unmount().await;
    Ok(())
}

async fn cmd_send(config: &ClientConfig, codes: &[String]) -> anyhow::Result<()> {
    let greeting = client::send_codes(&config.ws_url, codes).await?;
    if let Some(greeting) = greeting {
        println!("Relay says: {greeting}");
    }
    println!("Sent {} payload(s) to {}", codes.len(), config.ws_url);
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let relay = RelayConfig::from_env()?;
    let client = ClientConfig::from_env()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "relay": relay,
            "client": client,
        }))?
    );
    Ok(())
}

fn print_state(state: &building_relay::PollState) {
    println!("[{:?}] {} | {}", state.status, state.status_line(), state.detail_line());
}

/// Set up Ctrl+C handler.
fn ctrlc_channel() -> anyhow::Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = tx.send(true);
    })?;
    Ok(rx)
}
