/*!

Background timers that close auctions.

Every active auction has one timer task. It wakes every ten seconds, and closes the auction once its end time has
passed. Timers of auctions that were active when the bot stopped are resumed once the bot is ready again.

*/

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use poise::serenity_prelude::{EditMessage, Http};
use sea_orm::DbErr;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    Error,
    auction::{
        embed::{auction_embed, closing_announcement, closing_log},
        ladder::Auction,
        repository::{self, AuctionSettings},
    },
    infrastructure::{
        guild_store::GuildStore,
        util::{shutdown_requested, unix_now},
    },
};

pub const TICK: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq, Eq)]
pub enum Tick {
    StillOpen,
    /// Closed elsewhere (bid buyout, `auction end`, `auction cancel`) or deleted.
    Finished,
    /// This tick closed the auction.
    Closed(Auction),
}

/// Checks one auction against the clock, closing it under the guild lock when it is due.
pub async fn tick(store: &GuildStore, auction_id: &str, now: i64) -> Result<Tick, DbErr> {
    let Some(peek) = repository::find(store.db(), auction_id).await? else {
        return Ok(Tick::Finished);
    };
    let _guard = store.lock(peek.guild_id).await;
    let Some(mut auction) = repository::find(store.db(), auction_id).await? else {
        return Ok(Tick::Finished);
    };
    if auction.status.is_terminal() {
        return Ok(Tick::Finished);
    }
    match auction.expire_if_due(now) {
        Some(status) => {
            info!(auction = auction_id, %status, "Auction closed by timer");
            repository::save(store.db(), &auction).await?;
            Ok(Tick::Closed(auction))
        }
        None => Ok(Tick::StillOpen),
    }
}

/// Re-renders the auction message and announces the result in the auction and log channels.
pub async fn announce_close(http: &Http, store: &GuildStore, auction: &Auction) -> Result<(), Error> {
    let recent = repository::recent_bids(store.db(), &auction.id, 3).await?;
    if let Some(message_id) = auction.message_id {
        if let Err(e) = auction
            .channel_id
            .edit_message(http, message_id, EditMessage::new().embed(auction_embed(auction, &recent)))
            .await
        {
            debug!(auction = %auction.id, "Could not update auction message: {}", e);
        }
    }
    auction.channel_id.say(http, closing_announcement(auction)).await?;

    let settings: AuctionSettings = store.get(auction.guild_id).await?;
    if let Some(log_channel) = settings.log_channel {
        log_channel.say(http, closing_log(auction)).await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuctionTimers {
    store: GuildStore,
    shutdown: watch::Receiver<bool>,
    running: Arc<Mutex<HashSet<String>>>,
}

impl AuctionTimers {
    pub fn new(store: GuildStore, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            shutdown,
            running: Arc::default(),
        }
    }

    fn claim(&self, auction_id: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(auction_id.to_string())
    }

    fn release(&self, auction_id: &str) {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(auction_id);
    }

    /// Starts the timer of `auction_id` unless one is already running.
    pub fn spawn(&self, http: Arc<Http>, auction_id: String) {
        if !self.claim(&auction_id) {
            debug!(auction = %auction_id, "Timer already running");
            return;
        }
        let timers = self.clone();
        tokio::spawn(async move {
            timers.run(&http, &auction_id).await;
            timers.release(&auction_id);
        });
    }

    /// Restarts the timers of every active auction.
    pub async fn resume_all(&self, http: Arc<Http>) -> Result<usize, DbErr> {
        let active = repository::all_active(self.store.db()).await?;
        let count = active.len();
        for auction in active {
            self.spawn(http.clone(), auction.id);
        }
        if count > 0 {
            info!("Resumed {} auction timer(s)", count);
        }
        Ok(count)
    }

    async fn run(&self, http: &Http, auction_id: &str) {
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(TICK) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    debug!(auction = auction_id, "Timer stopped for shutdown");
                    return;
                }
            }

            match tick(&self.store, auction_id, unix_now()).await {
                Ok(Tick::StillOpen) => continue,
                Ok(Tick::Finished) => return,
                Ok(Tick::Closed(auction)) => {
                    if let Err(e) = announce_close(http, &self.store, &auction).await {
                        warn!(auction = auction_id, "Failed to announce auction result: {}", e);
                    }
                    return;
                }
                Err(e) => warn!(auction = auction_id, "Auction timer tick failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, GuildId, UserId};

    use super::*;
    use crate::{
        auction::ladder::{AuctionStatus, NewAuction},
        infrastructure::guild_store::test_support::memory_db,
    };

    async fn stored_auction(store: &GuildStore) -> Auction {
        let auction = Auction::open(
            NewAuction {
                id: "t1".into(),
                guild_id: GuildId::new(1),
                channel_id: ChannelId::new(2),
                item: "Card".into(),
                duration_mins: 1,
                min_bid: 5,
                min_increment: 1,
                buyout: None,
                created_by: UserId::new(3),
            },
            1_000,
        )
        .unwrap();
        repository::insert(store.db(), &auction).await.unwrap();
        auction
    }

    #[tokio::test]
    async fn tick_closes_only_when_due() {
        let store = GuildStore::new(memory_db().await);
        let auction = stored_auction(&store).await;

        assert_eq!(tick(&store, &auction.id, 1_030).await.unwrap(), Tick::StillOpen);
        match tick(&store, &auction.id, 1_060).await.unwrap() {
            Tick::Closed(closed) => assert_eq!(closed.status, AuctionStatus::Expired),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(tick(&store, &auction.id, 1_070).await.unwrap(), Tick::Finished);
    }

    #[tokio::test]
    async fn tick_leaves_cancelled_auctions_alone() {
        let store = GuildStore::new(memory_db().await);
        let mut auction = stored_auction(&store).await;
        auction.cancel().unwrap();
        repository::save(store.db(), &auction).await.unwrap();

        assert_eq!(tick(&store, &auction.id, 9_999).await.unwrap(), Tick::Finished);
        assert_eq!(
            repository::find(store.db(), &auction.id).await.unwrap().unwrap().status,
            AuctionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn unknown_auction_is_finished() {
        let store = GuildStore::new(memory_db().await);
        assert_eq!(tick(&store, "missing", 0).await.unwrap(), Tick::Finished);
    }

    #[tokio::test]
    async fn a_timer_is_claimed_once() {
        let (_tx, rx) = watch::channel(false);
        let timers = AuctionTimers::new(GuildStore::new(memory_db().await), rx);
        assert!(timers.claim("a"));
        assert!(!timers.claim("a"));
        timers.release("a");
        assert!(timers.claim("a"));
    }
}
