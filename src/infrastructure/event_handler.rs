use std::{
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use poise::serenity_prelude::{Context, FullEvent};
use tracing::{debug, info, warn};

use crate::{
    Error,
    fantasy::stats::{NbaStatsApi, configured_season, run_refresh_loop},
    infrastructure::botdata::Data,
};

/// Starts the stats refresh and resumes auction timers. Runs on the first ready event only; reconnects fire ready
/// again.
async fn start_background_tasks(ctx: &Context, data: &Data) {
    if data.background_started.swap(true, Ordering::SeqCst) {
        return;
    }

    let season = configured_season();
    info!(%season, "Starting NBA stats refresh");
    tokio::spawn(run_refresh_loop(
        NbaStatsApi::new(data.http_client.clone(), season),
        data.players.clone(),
        data.db_pool.clone(),
        data.shutdown.clone(),
    ));

    if let Err(e) = data.auction_timers.resume_all(Arc::clone(&ctx.http)).await {
        warn!("Failed to resume auction timers: {}", e);
    }
}

pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            info!("Bot is ready. Logged in as {}", data_about_bot.user.name);
            start_background_tasks(ctx, data).await;
        }
        FullEvent::InteractionCreate { interaction } => {
            let ping = match framework
                .shard_manager
                .runners
                .lock()
                .await
                .get(&ctx.shard_id)
            {
                Some(runner) => runner.latency.unwrap_or(Duration::ZERO),
                None => {
                    tracing::error!("current shard is not in shard_manager.runners, this shouldn't happen");
                    Duration::ZERO
                }
            };
            if ping > Duration::default() {
                debug!("Ping measured for interaction type {:?}: {:?}", interaction.kind(), ping)
            }
        }
        _ => {}
    }
    Ok(())
}
