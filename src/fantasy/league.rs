/*!

League membership, free agency and standings.

Every roster change runs under the guild lock so two managers cannot claim the same player and a roster cannot grow
past what its slots can seat.

*/

use poise::serenity_prelude::{GuildId, UserId};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use tracing::info;

use crate::{
    fantasy::{
        repository::{self, LeagueSettings, Member, RosterEntry},
        scoring::{ScoringWeights, earned, round1},
        slots::{Lineup, Position, assign, is_feasible},
        stats::{NbaPlayer, PlayerCache},
    },
    infrastructure::{
        guild_store::{GuildRecord, GuildStore},
        ids::mention_user,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Fantasy league is not active in this server. An admin must run `fantasy setup` first.")]
    NotActive,
    #[error("You haven't joined the league yet. Use `fantasy join`.")]
    NotMember,
    #[error("You have already joined the league!")]
    AlreadyMember,
    #[error("🔒 Free Agency is currently locked by the admins.")]
    Locked,
    #[error("Your roster is full (max {0}). Drop someone first.")]
    Full(usize),
    #[error("That player is already on {}'s team!", mention_user(*.0))]
    Taken(UserId),
    #[error("**{0}** does not fit any open roster slot.")]
    NoFit(String),
    #[error("That player is not on your roster.")]
    NotOnRoster,
    #[error("{}'s current roster would not fit those slots.", mention_user(*.0))]
    Unseated(UserId),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Positions of rostered players. Players missing from the stats table count as UTIL.
pub fn positions_of(cache: &PlayerCache, entries: &[RosterEntry]) -> Vec<Position> {
    entries
        .iter()
        .map(|e| cache.get(e.player_id).map(|p| p.position).unwrap_or(Position::UTIL))
        .collect()
}

/// Whether `incoming` can join a roster currently holding `current`.
pub fn check_fit(slots: &[Position], current: &[Position], incoming: &NbaPlayer) -> Result<(), RosterError> {
    if current.len() >= slots.len() {
        return Err(RosterError::Full(slots.len()));
    }
    let mut players = current.to_vec();
    players.push(incoming.position);
    if !is_feasible(slots, &players) {
        return Err(RosterError::NoFit(incoming.name.clone()));
    }
    Ok(())
}

/// Points a rostered player has earned so far. Players missing from the stats table have earned nothing yet.
pub fn earned_by(cache: &PlayerCache, weights: &ScoringWeights, entry: &RosterEntry) -> f64 {
    cache
        .get(entry.player_id)
        .map(|p| earned(p.fantasy_points(weights), entry.acquired_fp))
        .unwrap_or(0.0)
}

/// Adds `player` to `user`'s roster after the membership, ownership and slot checks. Free agency locks are the
/// caller's concern. The guild lock must be held.
pub(crate) async fn acquire<C: ConnectionTrait>(
    db: &C,
    settings: &LeagueSettings,
    cache: &PlayerCache,
    guild_id: GuildId,
    user_id: UserId,
    player: &NbaPlayer,
    now: i64,
) -> Result<RosterEntry, RosterError> {
    if !settings.active {
        return Err(RosterError::NotActive);
    }
    if repository::find_member(db, guild_id, user_id).await?.is_none() {
        return Err(RosterError::NotMember);
    }
    if let Some(owner) = repository::owner_of(db, guild_id, player.id).await? {
        return Err(RosterError::Taken(owner.user_id));
    }
    let roster = repository::roster(db, guild_id, user_id).await?;
    check_fit(&settings.slots, &positions_of(cache, &roster), player)?;

    let entry = RosterEntry {
        user_id,
        player_id: player.id,
        acquired_fp: player.fantasy_points(&settings.weights),
        acquired_at: now,
    };
    repository::insert_roster_entry(db, guild_id, &entry).await?;
    Ok(entry)
}

/// Enables the league. Returns false when it was already enabled.
pub async fn setup(store: &GuildStore, guild_id: GuildId) -> Result<bool, DbErr> {
    store
        .update(guild_id, |s: &mut LeagueSettings| !std::mem::replace(&mut s.active, true))
        .await
}

pub async fn join(store: &GuildStore, guild_id: GuildId, user_id: UserId, now: i64) -> Result<(), RosterError> {
    let _guard = store.lock(guild_id).await;
    let settings: LeagueSettings = store.get(guild_id).await?;
    if !settings.active {
        return Err(RosterError::NotActive);
    }
    if repository::find_member(store.db(), guild_id, user_id).await?.is_some() {
        return Err(RosterError::AlreadyMember);
    }
    repository::insert_member(store.db(), guild_id, user_id, now).await?;
    Ok(())
}

/// Free-agent pickup.
pub async fn add_player(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    user_id: UserId,
    player: &NbaPlayer,
    now: i64,
) -> Result<RosterEntry, RosterError> {
    let _guard = store.lock(guild_id).await;
    let settings: LeagueSettings = store.get(guild_id).await?;
    if settings.fa_locked {
        return Err(RosterError::Locked);
    }
    let entry = acquire(store.db(), &settings, cache, guild_id, user_id, player, now).await?;
    info!(guild = %guild_id, user = %user_id, player = player.id, "Free agent added");
    Ok(entry)
}

/// Releases a player and banks what they earned. Returns the banked amount.
pub async fn drop_player(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    user_id: UserId,
    player_id: i64,
) -> Result<f64, RosterError> {
    let _guard = store.lock(guild_id).await;
    let settings: LeagueSettings = store.get(guild_id).await?;
    let entry = match repository::owner_of(store.db(), guild_id, player_id).await? {
        Some(entry) if entry.user_id == user_id => entry,
        _ => return Err(RosterError::NotOnRoster),
    };
    let banked = earned_by(cache, &settings.weights, &entry);
    repository::bank(store.db(), guild_id, user_id, banked).await?;
    repository::delete_roster_entry(store.db(), guild_id, player_id).await?;
    info!(guild = %guild_id, user = %user_id, player = player_id, banked, "Player dropped");
    Ok(banked)
}

pub async fn set_locked(store: &GuildStore, guild_id: GuildId, locked: bool) -> Result<(), DbErr> {
    store
        .update(guild_id, |s: &mut LeagueSettings| s.fa_locked = locked)
        .await
}

/// Replaces the slot list. Refused while any current roster would not fit it.
pub async fn set_slots(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    slots: Vec<Position>,
) -> Result<(), RosterError> {
    let _guard = store.lock(guild_id).await;
    let mut settings: LeagueSettings = store.get(guild_id).await?;
    let rosters = repository::all_rosters(store.db(), guild_id).await?;
    for member in repository::members(store.db(), guild_id).await? {
        let entries: Vec<RosterEntry> = rosters
            .iter()
            .filter(|e| e.user_id == member.user_id)
            .cloned()
            .collect();
        if !is_feasible(&slots, &positions_of(cache, &entries)) {
            return Err(RosterError::Unseated(member.user_id));
        }
    }
    settings.slots = slots;
    settings.store(store.db(), guild_id).await?;
    info!(guild = %guild_id, "Roster slots changed");
    Ok(())
}

/// Applies new scoring weights. Rostered players are re-based so nobody gains or loses points from the change.
pub async fn set_weights(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    weights: ScoringWeights,
) -> Result<(), DbErr> {
    let _guard = store.lock(guild_id).await;
    let mut settings: LeagueSettings = store.get(guild_id).await?;
    let txn = store.db().begin().await?;
    for entry in repository::all_rosters(&txn, guild_id).await? {
        let Some(player) = cache.get(entry.player_id) else {
            continue;
        };
        let banked = earned(player.fantasy_points(&settings.weights), entry.acquired_fp);
        repository::bank(&txn, guild_id, entry.user_id, banked).await?;
        repository::delete_roster_entry(&txn, guild_id, entry.player_id).await?;
        repository::insert_roster_entry(
            &txn,
            guild_id,
            &RosterEntry {
                acquired_fp: player.fantasy_points(&weights),
                ..entry
            },
        )
        .await?;
    }
    txn.commit().await?;
    settings.weights = weights;
    settings.store(store.db(), guild_id).await?;
    info!(guild = %guild_id, weights = %weights.describe(), "Scoring weights changed");
    Ok(())
}

pub async fn remove_member(store: &GuildStore, guild_id: GuildId, user_id: UserId) -> Result<bool, DbErr> {
    let _guard = store.lock(guild_id).await;
    repository::delete_member(store.db(), guild_id, user_id).await
}

pub async fn reset(store: &GuildStore, guild_id: GuildId) -> Result<(), DbErr> {
    let _guard = store.lock(guild_id).await;
    repository::reset_league(store.db(), guild_id).await
}

#[derive(Debug, Clone)]
pub struct RosterLine {
    pub entry: RosterEntry,
    pub player: Option<NbaPlayer>,
    pub earned: f64,
}

impl RosterLine {
    pub fn name(&self) -> String {
        self.player
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Player {}", self.entry.player_id))
    }
}

#[derive(Debug, Clone)]
pub struct TeamView {
    pub member: Member,
    pub lines: Vec<RosterLine>,
    /// Indices into `lines`.
    pub lineup: Lineup,
    pub total: f64,
}

pub async fn team(
    db: &DatabaseConnection,
    settings: &LeagueSettings,
    cache: &PlayerCache,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<Option<TeamView>, DbErr> {
    let Some(member) = repository::find_member(db, guild_id, user_id).await? else {
        return Ok(None);
    };
    let roster = repository::roster(db, guild_id, user_id).await?;
    let lineup = assign(&settings.slots, &positions_of(cache, &roster));
    let lines: Vec<RosterLine> = roster
        .into_iter()
        .map(|entry| RosterLine {
            earned: earned_by(cache, &settings.weights, &entry),
            player: cache.get(entry.player_id),
            entry,
        })
        .collect();
    let total = round1(member.banked_fp + lines.iter().map(|l| l.earned).sum::<f64>());
    Ok(Some(TeamView {
        member,
        lines,
        lineup,
        total,
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub user_id: UserId,
    pub total: f64,
    /// The rostered player who has earned the most, with what they earned.
    pub mvp: Option<(String, f64)>,
}

pub async fn standings(
    db: &DatabaseConnection,
    settings: &LeagueSettings,
    cache: &PlayerCache,
    guild_id: GuildId,
) -> Result<Vec<Standing>, DbErr> {
    let members = repository::members(db, guild_id).await?;
    let rosters = repository::all_rosters(db, guild_id).await?;
    let mut table: Vec<Standing> = members
        .into_iter()
        .map(|member| {
            let mut best: Option<(String, f64)> = None;
            let mut roster_total = 0.0;
            for entry in rosters.iter().filter(|e| e.user_id == member.user_id) {
                let earned = earned_by(cache, &settings.weights, entry);
                roster_total += earned;
                let Some(player) = cache.get(entry.player_id) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(_, fp)| earned > *fp) {
                    best = Some((player.name, earned));
                }
            }
            Standing {
                user_id: member.user_id,
                total: round1(member.banked_fp + roster_total),
                mvp: best,
            }
        })
        .collect();
    table.sort_by(|a, b| b.total.total_cmp(&a.total));
    Ok(table)
}

/// Unrostered players, best season first under the guild's weights.
pub async fn free_agents(
    db: &DatabaseConnection,
    settings: &LeagueSettings,
    cache: &PlayerCache,
    guild_id: GuildId,
    limit: usize,
) -> Result<Vec<NbaPlayer>, DbErr> {
    let taken: std::collections::HashSet<i64> = repository::all_rosters(db, guild_id)
        .await?
        .into_iter()
        .map(|e| e.player_id)
        .collect();
    let mut available: Vec<NbaPlayer> = cache
        .snapshot()
        .iter()
        .filter(|p| !taken.contains(&p.id))
        .cloned()
        .collect();
    available.sort_by(|a, b| {
        b.fantasy_points(&settings.weights)
            .total_cmp(&a.fantasy_points(&settings.weights))
    });
    available.truncate(limit);
    Ok(available)
}
