/*!

One-for-one player trades between managers.

A trade is proposed by one manager and accepted or declined by the other. Ownership and slot fit are checked again at
acceptance because rosters can change while a trade is pending; a trade that no longer holds is marked failed.

*/

use std::{fmt, str::FromStr};

use poise::serenity_prelude::{GuildId, UserId};
use sea_orm::{DbErr, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use crate::{
    fantasy::{
        league::{RosterError, earned_by, positions_of},
        repository::{self, LeagueSettings, RosterEntry},
        slots::{Position, is_feasible},
        stats::{NbaPlayer, PlayerCache},
    },
    infrastructure::{guild_store::GuildStore, ids::mention_user},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Declined => "declined",
            TradeStatus::Cancelled => "cancelled",
            TradeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown trade status `{0}`")]
pub struct UnknownTradeStatus(String);

impl FromStr for TradeStatus {
    type Err = UnknownTradeStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradeStatus::Pending),
            "accepted" => Ok(TradeStatus::Accepted),
            "declined" => Ok(TradeStatus::Declined),
            "cancelled" => Ok(TradeStatus::Cancelled),
            "failed" => Ok(TradeStatus::Failed),
            other => Err(UnknownTradeStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub id: String,
    pub guild_id: GuildId,
    pub proposer: UserId,
    pub target: UserId,
    /// Leaves the proposer's roster.
    pub offered_player: i64,
    /// Leaves the target's roster.
    pub requested_player: i64,
    pub status: TradeStatus,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("You can't trade with yourself.")]
    SelfTrade,
    #[error("{} hasn't joined the league.", mention_user(*.0))]
    NotInLeague(UserId),
    #[error("**{0}** is not on your roster.")]
    NotYours(String),
    #[error("**{name}** is not on {who}'s roster.", name = .1, who = mention_user(*.0))]
    NotTheirs(UserId, String),
    #[error("No trade `{0}` in this server.")]
    NotFound(String),
    #[error("That trade is already {0}.")]
    NotPending(TradeStatus),
    #[error("Only {} can do that.", mention_user(*.0))]
    NotParty(UserId),
    #[error("Trade failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn owns(entry: &Option<RosterEntry>, user_id: UserId) -> bool {
    entry.as_ref().is_some_and(|e| e.user_id == user_id)
}

pub async fn propose(
    store: &GuildStore,
    guild_id: GuildId,
    proposer: UserId,
    target: UserId,
    give: &NbaPlayer,
    get: &NbaPlayer,
    now: i64,
) -> Result<Trade, TradeError> {
    if proposer == target {
        return Err(TradeError::SelfTrade);
    }
    let _guard = store.lock(guild_id).await;
    let db = store.db();
    let settings: LeagueSettings = store.get(guild_id).await?;
    if !settings.active {
        return Err(RosterError::NotActive.into());
    }
    if repository::find_member(db, guild_id, proposer).await?.is_none() {
        return Err(RosterError::NotMember.into());
    }
    if repository::find_member(db, guild_id, target).await?.is_none() {
        return Err(TradeError::NotInLeague(target));
    }
    if !owns(&repository::owner_of(db, guild_id, give.id).await?, proposer) {
        return Err(TradeError::NotYours(give.name.clone()));
    }
    if !owns(&repository::owner_of(db, guild_id, get.id).await?, target) {
        return Err(TradeError::NotTheirs(target, get.name.clone()));
    }

    let trade = Trade {
        id: short_id(),
        guild_id,
        proposer,
        target,
        offered_player: give.id,
        requested_player: get.id,
        status: TradeStatus::Pending,
        created_at: now,
        resolved_at: None,
    };
    repository::insert_trade(db, &trade).await?;
    info!(guild = %guild_id, trade = %trade.id, "Trade proposed");
    Ok(trade)
}

async fn pending_trade(store: &GuildStore, guild_id: GuildId, id: &str) -> Result<Trade, TradeError> {
    let trade = repository::find_trade(store.db(), guild_id, id)
        .await?
        .ok_or_else(|| TradeError::NotFound(id.to_string()))?;
    if trade.status != TradeStatus::Pending {
        return Err(TradeError::NotPending(trade.status));
    }
    Ok(trade)
}

async fn resolve(
    store: &GuildStore,
    mut trade: Trade,
    status: TradeStatus,
    now: i64,
) -> Result<Trade, TradeError> {
    trade.status = status;
    trade.resolved_at = Some(now);
    repository::save_trade(store.db(), &trade).await?;
    info!(guild = %trade.guild_id, trade = %trade.id, %status, "Trade resolved");
    Ok(trade)
}

/// Why the swap can no longer happen, if it cannot.
async fn swap_blocker(
    store: &GuildStore,
    cache: &PlayerCache,
    settings: &LeagueSettings,
    trade: &Trade,
) -> Result<Option<String>, DbErr> {
    let db = store.db();
    let offered = repository::owner_of(db, trade.guild_id, trade.offered_player).await?;
    let requested = repository::owner_of(db, trade.guild_id, trade.requested_player).await?;
    if !owns(&offered, trade.proposer) || !owns(&requested, trade.target) {
        return Ok(Some("one of the players changed teams.".to_string()));
    }

    for (user_id, leaving, arriving) in [
        (trade.proposer, trade.offered_player, trade.requested_player),
        (trade.target, trade.requested_player, trade.offered_player),
    ] {
        let mut roster = repository::roster(db, trade.guild_id, user_id).await?;
        roster.retain(|e| e.player_id != leaving);
        let mut positions = positions_of(cache, &roster);
        positions.push(cache.get(arriving).map(|p| p.position).unwrap_or(Position::UTIL));
        if !is_feasible(&settings.slots, &positions) {
            return Ok(Some(format!("{}'s roster has no slot for the incoming player.", mention_user(user_id))));
        }
    }
    Ok(None)
}

/// Accepts a pending trade as its target. Both players change teams at their current fantasy points, and what each
/// earned for its old manager is banked.
pub async fn accept(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    user_id: UserId,
    id: &str,
    now: i64,
) -> Result<Trade, TradeError> {
    let _guard = store.lock(guild_id).await;
    let trade = pending_trade(store, guild_id, id).await?;
    if trade.target != user_id {
        return Err(TradeError::NotParty(trade.target));
    }
    let settings: LeagueSettings = store.get(guild_id).await?;
    if let Some(reason) = swap_blocker(store, cache, &settings, &trade).await? {
        resolve(store, trade, TradeStatus::Failed, now).await?;
        return Err(TradeError::Failed(reason));
    }

    let txn = store.db().begin().await?;
    for (from, to, player_id) in [
        (trade.proposer, trade.target, trade.offered_player),
        (trade.target, trade.proposer, trade.requested_player),
    ] {
        if let Some(entry) = repository::owner_of(&txn, guild_id, player_id).await? {
            repository::bank(&txn, guild_id, from, earned_by(cache, &settings.weights, &entry)).await?;
        }
        repository::delete_roster_entry(&txn, guild_id, player_id).await?;
        let acquired_fp = cache
            .get(player_id)
            .map(|p| p.fantasy_points(&settings.weights))
            .unwrap_or(0.0);
        repository::insert_roster_entry(
            &txn,
            guild_id,
            &RosterEntry {
                user_id: to,
                player_id,
                acquired_fp,
                acquired_at: now,
            },
        )
        .await?;
    }
    txn.commit().await?;

    resolve(store, trade, TradeStatus::Accepted, now).await
}

pub async fn decline(store: &GuildStore, guild_id: GuildId, user_id: UserId, id: &str, now: i64) -> Result<Trade, TradeError> {
    let _guard = store.lock(guild_id).await;
    let trade = pending_trade(store, guild_id, id).await?;
    if trade.target != user_id {
        return Err(TradeError::NotParty(trade.target));
    }
    resolve(store, trade, TradeStatus::Declined, now).await
}

pub async fn cancel(store: &GuildStore, guild_id: GuildId, user_id: UserId, id: &str, now: i64) -> Result<Trade, TradeError> {
    let _guard = store.lock(guild_id).await;
    let trade = pending_trade(store, guild_id, id).await?;
    if trade.proposer != user_id {
        return Err(TradeError::NotParty(trade.proposer));
    }
    resolve(store, trade, TradeStatus::Cancelled, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fantasy::{
            league::{add_player, drop_player, join, setup},
            stats::test_support::player,
        },
        infrastructure::guild_store::test_support::memory_db,
    };

    const GUILD: GuildId = GuildId::new(1);
    const ALICE: UserId = UserId::new(10);
    const BOB: UserId = UserId::new(11);

    /// Alice has the guard (1), Bob has the center (2).
    async fn league(slots: Vec<Position>) -> (GuildStore, PlayerCache) {
        let store = GuildStore::new(memory_db().await);
        setup(&store, GUILD).await.unwrap();
        store
            .update(GUILD, |s: &mut LeagueSettings| s.slots = slots)
            .await
            .unwrap();
        join(&store, GUILD, ALICE, 0).await.unwrap();
        join(&store, GUILD, BOB, 0).await.unwrap();
        let cache = PlayerCache::default();
        cache.replace(
            vec![
                player(1, "Guard", Position::PG, 50.0),
                player(2, "Center", Position::C, 60.0),
                player(3, "Other Center", Position::C, 10.0),
            ],
            0,
        );
        add_player(&store, &cache, GUILD, ALICE, &cache.get(1).unwrap(), 0).await.unwrap();
        add_player(&store, &cache, GUILD, BOB, &cache.get(2).unwrap(), 0).await.unwrap();
        (store, cache)
    }

    async fn propose_swap(store: &GuildStore, cache: &PlayerCache) -> Trade {
        propose(store, GUILD, ALICE, BOB, &cache.get(1).unwrap(), &cache.get(2).unwrap(), 5)
            .await
            .unwrap()
    }

    #[test]
    fn statuses_parse_back() {
        for status in [
            TradeStatus::Pending,
            TradeStatus::Accepted,
            TradeStatus::Declined,
            TradeStatus::Cancelled,
            TradeStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TradeStatus>().unwrap(), status);
        }
        assert!("open".parse::<TradeStatus>().is_err());
    }

    #[test]
    fn ownership_errors_name_player_and_manager() {
        assert_eq!(
            TradeError::NotTheirs(BOB, "Luka Doncic".into()).to_string(),
            format!("**Luka Doncic** is not on <@{}>'s roster.", BOB.get())
        );
        assert_eq!(
            TradeError::NotYours("Jalen Brunson".into()).to_string(),
            "**Jalen Brunson** is not on your roster."
        );
    }

    #[tokio::test]
    async fn proposals_check_ownership() {
        let (store, cache) = league(vec![Position::UTIL, Position::UTIL]).await;
        let guard = cache.get(1).unwrap();
        let center = cache.get(2).unwrap();
        assert!(matches!(
            propose(&store, GUILD, ALICE, ALICE, &guard, &center, 0).await,
            Err(TradeError::SelfTrade)
        ));
        assert!(matches!(
            propose(&store, GUILD, ALICE, BOB, &center, &guard, 0).await,
            Err(TradeError::NotYours(_))
        ));
        assert!(matches!(
            propose(&store, GUILD, ALICE, BOB, &guard, &cache.get(3).unwrap(), 0).await,
            Err(TradeError::NotTheirs(u, _)) if u == BOB
        ));
        assert!(matches!(
            propose(&store, GUILD, ALICE, UserId::new(99), &guard, &center, 0).await,
            Err(TradeError::NotInLeague(_))
        ));
    }

    #[tokio::test]
    async fn accepting_swaps_players_and_banks_points() {
        let (store, cache) = league(vec![Position::UTIL, Position::UTIL]).await;
        let trade = propose_swap(&store, &cache).await;
        assert_eq!(trade.id.len(), 8);

        cache.replace(
            vec![player(1, "Guard", Position::PG, 58.0), player(2, "Center", Position::C, 63.0)],
            1,
        );
        assert!(matches!(
            accept(&store, &cache, GUILD, ALICE, &trade.id, 9).await,
            Err(TradeError::NotParty(u)) if u == BOB
        ));
        let done = accept(&store, &cache, GUILD, BOB, &trade.id, 9).await.unwrap();
        assert_eq!(done.status, TradeStatus::Accepted);
        assert_eq!(done.resolved_at, Some(9));

        let db = store.db();
        let guard = repository::owner_of(db, GUILD, 1).await.unwrap().unwrap();
        assert_eq!(guard.user_id, BOB);
        assert_eq!(guard.acquired_fp, 58.0);
        assert_eq!(repository::owner_of(db, GUILD, 2).await.unwrap().unwrap().user_id, ALICE);
        assert_eq!(repository::find_member(db, GUILD, ALICE).await.unwrap().unwrap().banked_fp, 8.0);
        assert_eq!(repository::find_member(db, GUILD, BOB).await.unwrap().unwrap().banked_fp, 3.0);

        assert!(matches!(
            decline(&store, GUILD, BOB, &trade.id, 10).await,
            Err(TradeError::NotPending(TradeStatus::Accepted))
        ));
    }

    #[tokio::test]
    async fn accept_fails_when_a_player_moved() {
        let (store, cache) = league(vec![Position::UTIL, Position::UTIL]).await;
        let trade = propose_swap(&store, &cache).await;
        drop_player(&store, &cache, GUILD, BOB, 2).await.unwrap();

        assert!(matches!(
            accept(&store, &cache, GUILD, BOB, &trade.id, 9).await,
            Err(TradeError::Failed(_))
        ));
        let stored = repository::find_trade(store.db(), GUILD, &trade.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TradeStatus::Failed);
        assert_eq!(repository::owner_of(store.db(), GUILD, 1).await.unwrap().unwrap().user_id, ALICE);
    }

    #[tokio::test]
    async fn accept_fails_when_the_swap_does_not_fit() {
        // Alice already holds a center, and the league seats only one.
        let (store, cache) = league(vec![Position::PG, Position::C]).await;
        add_player(&store, &cache, GUILD, ALICE, &cache.get(3).unwrap(), 0).await.unwrap();
        let trade = propose_swap(&store, &cache).await;
        assert!(matches!(
            accept(&store, &cache, GUILD, BOB, &trade.id, 9).await,
            Err(TradeError::Failed(reason)) if reason.contains("<@10>")
        ));
    }

    #[tokio::test]
    async fn only_the_proposer_cancels_and_only_the_target_declines() {
        let (store, cache) = league(vec![Position::UTIL, Position::UTIL]).await;
        let trade = propose_swap(&store, &cache).await;
        assert_eq!(repository::pending_trades_for(store.db(), GUILD, BOB).await.unwrap().len(), 1);
        assert!(matches!(
            cancel(&store, GUILD, BOB, &trade.id, 1).await,
            Err(TradeError::NotParty(u)) if u == ALICE
        ));
        assert!(matches!(
            decline(&store, GUILD, ALICE, &trade.id, 1).await,
            Err(TradeError::NotParty(u)) if u == BOB
        ));
        assert_eq!(cancel(&store, GUILD, ALICE, &trade.id, 1).await.unwrap().status, TradeStatus::Cancelled);
        assert!(repository::pending_trades_for(store.db(), GUILD, BOB).await.unwrap().is_empty());
        assert!(matches!(
            accept(&store, &cache, GUILD, BOB, "nope", 1).await,
            Err(TradeError::NotFound(_))
        ));
    }
}
