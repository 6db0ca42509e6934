mod client;
mod database;
mod logging;
mod shutdown;

use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init_logger();

    let db = database::init_database().await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut client = client::create_serenity_client(db, shutdown_rx).await?;
    let shard_manager = client.shard_manager.clone();

    let result = shutdown::run_until_shutdown(client.start(), || async move {
        info!("Bot is shutting down!");
        // Background tasks watch this and finish their current step.
        let _ = shutdown_tx.send(true);
        shard_manager.shutdown_all().await;
    })
    .await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
