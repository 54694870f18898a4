//! Runnable Seabattle server with in-process collaborators.
//!
//! Rooms, the resume cache, and the pub/sub relay all live in memory, and
//! the identity token is taken as the player name. Connect with any
//! WebSocket client, send a name, then follow the prompts.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use seabattle::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "sea-battle-server")]
#[command(about = "Two-player Battleship over WebSocket text frames")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Number of open rooms to create at startup (room-1, room-2, ...)
    #[arg(short, long, default_value = "3")]
    rooms: usize,

    /// Side length of every board (4 to 26 columns)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u8).range(4..=26))]
    board_size: u8,

    /// Seconds a placed-out player waits for the opponent's fleet
    #[arg(long, default_value = "20")]
    ready_timeout_secs: u64,
}

/// Uses the token as the player name. Development only.
struct DevIdentity {
    directory: Arc<InMemoryDirectory>,
}

impl IdentityProvider for DevIdentity {
    async fn identify(&self, token: &str) -> Result<PlayerId, SessionError> {
        let name = token.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(SessionError::AuthFailed("token must be a single word".into()));
        }
        Ok(PlayerId::new(name))
    }

    async fn active_room(&self, player: &PlayerId) -> Result<Option<RoomId>, SessionError> {
        self.directory
            .active_room_for(player)
            .await
            .map_err(|e| SessionError::Unavailable(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    let directory = Arc::new(InMemoryDirectory::new());
    for n in 1..=args.rooms {
        directory.create_room(RoomId::new(format!("room-{n}"))).await;
    }

    let config = GameConfig {
        board_size: usize::from(args.board_size),
        ready_timeout: Duration::from_secs(args.ready_timeout_secs),
        ..GameConfig::default()
    };

    let server = SeabattleServerBuilder::new()
        .bind(&args.bind)
        .config(config)
        .build(
            DevIdentity {
                directory: Arc::clone(&directory),
            },
            directory,
            InMemoryCache::new(),
            Arc::new(LocalPubSub::new()),
        )
        .await?;

    tracing::info!(addr = %server.local_addr()?, rooms = args.rooms, "sea battle server listening");
    server.run().await?;
    Ok(())
}
