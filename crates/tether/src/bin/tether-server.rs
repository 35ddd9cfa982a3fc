//! Tether relay server
//!
//! Rendezvous and signaling relay for browser peers.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:8080, snapshot in ./rooms.json
//! tether-server
//!
//! # Quieter janitor, no persistence across restarts
//! tether-server --sweep-interval 120 --no-snapshot
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tether::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "tether-server")]
#[command(about = "Rendezvous and signaling relay for browser peers")]
#[command(version)]
struct Args {
    /// Address to listen on (WebSocket and HTTP share the port)
    #[arg(short, long, env = "TETHER_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// JSON file the room registry is saved to and restored from
    #[arg(short, long, env = "TETHER_SNAPSHOT", default_value = "rooms.json")]
    snapshot: PathBuf,

    /// Run without reading or writing a snapshot
    #[arg(long, env = "TETHER_NO_SNAPSHOT")]
    no_snapshot: bool,

    /// Save an empty snapshot on shutdown
    #[arg(long, env = "TETHER_CLEAR_ON_SHUTDOWN")]
    clear_on_shutdown: bool,

    /// Seconds between janitor sweeps (0 disables the janitor)
    #[arg(long, env = "TETHER_SWEEP_INTERVAL", default_value_t = 60)]
    sweep_interval: u64,

    /// Seconds without a heartbeat before a peer is dropped
    #[arg(long, env = "TETHER_LIVENESS_TIMEOUT", default_value_t = 30.0)]
    liveness_timeout: f64,

    /// Seconds after which a room is deleted regardless of activity
    #[arg(long, env = "TETHER_MAX_ROOM_AGE", default_value_t = 3600.0)]
    max_room_age: f64,

    /// Chance that a heartbeat also triggers a sweep
    #[arg(long, env = "TETHER_HEARTBEAT_SWEEP_PROBABILITY", default_value_t = 0.01)]
    heartbeat_sweep_probability: f64,

    /// Seconds a socket may stay silent before it is closed
    #[arg(long, env = "TETHER_IDLE_TIMEOUT", default_value_t = 60)]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let mut builder = TetherServer::builder()
        .bind(&args.bind)
        .presence_config(PresenceConfig {
            liveness_timeout_secs: args.liveness_timeout,
            max_room_age_secs: args.max_room_age,
            heartbeat_sweep_probability: args.heartbeat_sweep_probability,
            ..PresenceConfig::default()
        })
        .session_config(SessionConfig {
            idle_timeout_secs: args.idle_timeout,
        })
        .janitor_config(JanitorConfig::with_interval(args.sweep_interval))
        .clear_snapshot_on_shutdown(args.clear_on_shutdown);

    if args.no_snapshot {
        info!("persistence disabled");
    } else {
        info!(path = %args.snapshot.display(), "using snapshot file");
        builder = builder.snapshot_path(args.snapshot);
    }

    let server = builder.build().await?;
    info!(addr = %server.local_addr()?, "listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
