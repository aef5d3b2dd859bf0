use std::time::Duration;

use clap::Parser;
use ridebus::prelude::*;
use tracing_subscriber::EnvFilter;

/// Ride the Bus game server.
#[derive(Parser, Debug)]
#[command(
    name = "ridebus-server",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
)]
struct Args {
    /// Interface to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Rows in each room's pyramid.
    #[arg(long, env = "RIDEBUS_PYRAMID_ROWS", default_value_t = 5)]
    pyramid_rows: usize,

    /// Cards dealt to each player.
    #[arg(long, env = "RIDEBUS_HAND_SIZE", default_value_t = 4)]
    hand_size: usize,

    /// Accept card plays from players whose turn it isn't.
    #[arg(long, env = "RIDEBUS_ALLOW_OUT_OF_TURN")]
    allow_out_of_turn: bool,

    /// Seconds a new peer gets to complete the WebSocket upgrade.
    #[arg(long, env = "RIDEBUS_HANDSHAKE_TIMEOUT_SECS", default_value_t = 10)]
    handshake_timeout_secs: u64,

    /// Send an ERROR message back when a request is rejected.
    #[arg(long, env = "RIDEBUS_NOTIFY_REJECTIONS")]
    notify_rejections: bool,
}

impl Args {
    fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            pyramid_rows: self.pyramid_rows,
            hand_size: self.hand_size,
            rules: Rules {
                enforce_turn_order: !self.allow_out_of_turn,
                ..Rules::default()
            },
            ..RoomSettings::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), RideBusError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let server = RideBusServer::builder()
        .bind(&addr)
        .room_settings(args.room_settings())
        .notify_rejections(args.notify_rejections)
        .handshake_timeout(Duration::from_secs(args.handshake_timeout_secs))
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("received interrupt signal");
        })
        .await
}
