use std::{
    collections::HashMap,
    sync::{Arc, RwLock, atomic::AtomicBool},
    time::Instant,
};

use reqwest::Client;
use sea_orm::DatabaseConnection;
use tokio::sync::watch;

use crate::{
    auction::timer::AuctionTimers,
    fantasy::stats::PlayerCache,
    infrastructure::{guild_store::GuildStore, sessions::SessionRegistry},
};

pub struct Data {
    pub db_pool: DatabaseConnection,
    /// Start instants of running commands, keyed by invocation id.
    pub invoc_time: RwLock<HashMap<u64, Instant>>,
    pub sessions: SessionRegistry,
    pub guild_store: GuildStore,
    pub players: PlayerCache,
    pub http_client: Client,
    pub f1_drivers: Arc<Vec<String>>,
    pub auction_timers: AuctionTimers,
    pub shutdown: watch::Receiver<bool>,
    /// Set once the stats refresh and auction timers have been started.
    pub background_started: AtomicBool,
}

impl Data {
    pub fn new(
        db_pool: DatabaseConnection,
        http_client: Client,
        f1_drivers: Vec<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let guild_store = GuildStore::new(db_pool.clone());
        Self {
            auction_timers: AuctionTimers::new(guild_store.clone(), shutdown.clone()),
            db_pool,
            invoc_time: Default::default(),
            sessions: SessionRegistry::default(),
            guild_store,
            players: PlayerCache::default(),
            http_client,
            f1_drivers: Arc::new(f1_drivers),
            shutdown,
            background_started: AtomicBool::new(false),
        }
    }
}
