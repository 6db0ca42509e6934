/*!

Live snake drafts.

A draft runs in one channel. Managers pick in a shuffled order that reverses every round, and the draft completes
once every manager has picked once per roster slot. Picks go straight onto rosters at the player's current fantasy
points.

*/

use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use rand::{Rng, seq::SliceRandom};
use sea_orm::DbErr;
use tracing::info;

use crate::{
    fantasy::{
        league::{RosterError, acquire},
        repository::{self, LeagueSettings},
        stats::{NbaPlayer, PlayerCache},
    },
    infrastructure::{guild_store::GuildStore, ids::mention_user},
};

pub const BOARD_SIZE: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub channel_id: ChannelId,
    /// First-round order.
    pub order: Vec<UserId>,
    pub rounds: u32,
    pub picks_made: u32,
    pub active: bool,
}

/// Who picks at a given point of the draft. `round` and `pick_number` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub pick_number: u32,
    pub round: u32,
    pub user_id: UserId,
}

impl Draft {
    pub fn new(channel_id: ChannelId, order: Vec<UserId>, rounds: u32) -> Self {
        Self {
            channel_id,
            order,
            rounds,
            picks_made: 0,
            active: true,
        }
    }

    pub fn total_picks(&self) -> u32 {
        self.rounds * self.order.len() as u32
    }

    /// The manager making the pick with 0-based index `pick`.
    pub fn turn(&self, pick: u32) -> Option<Turn> {
        let n = self.order.len() as u32;
        if n == 0 || pick >= self.total_picks() {
            return None;
        }
        let (round, slot) = (pick / n, pick % n);
        let index = if round % 2 == 0 { slot } else { n - 1 - slot };
        Some(Turn {
            pick_number: pick + 1,
            round: round + 1,
            user_id: self.order[index as usize],
        })
    }

    pub fn on_the_clock(&self) -> Option<Turn> {
        if !self.active {
            return None;
        }
        self.turn(self.picks_made)
    }

    /// Moves to the next pick, deactivating the draft after the last one.
    fn advance(&mut self) {
        self.picks_made += 1;
        if self.picks_made >= self.total_picks() {
            self.active = false;
        }
    }

    pub fn order_text(&self) -> String {
        self.order
            .iter()
            .enumerate()
            .map(|(i, u)| format!("{}. {}", i + 1, mention_user(*u)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftPick {
    pub pick_number: u32,
    pub round: u32,
    pub user_id: UserId,
    /// `None` when an admin skipped the pick.
    pub player_id: Option<i64>,
    pub player_name: String,
    pub picked_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Fantasy league is not active in this server. An admin must run `fantasy setup` first.")]
    LeagueInactive,
    #[error("A draft is already running in <#{0}>.")]
    AlreadyRunning(ChannelId),
    #[error("A draft needs at least two managers in the league.")]
    NotEnoughManagers,
    #[error("No draft is running.")]
    NotRunning,
    #[error("The draft is running in <#{0}>.")]
    WrongChannel(ChannelId),
    #[error("It is {}'s turn to pick.", mention_user(*.0))]
    NotYourTurn(UserId),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// The recorded pick and who is up next, if anyone.
#[derive(Debug, Clone, PartialEq)]
pub struct PickOutcome {
    pub pick: DraftPick,
    pub next: Option<Turn>,
}

/// Starts a draft in `channel_id` with the league members in random order and one round per roster slot.
pub async fn start<R: Rng>(
    store: &GuildStore,
    guild_id: GuildId,
    channel_id: ChannelId,
    rng: &mut R,
) -> Result<Draft, DraftError> {
    let _guard = store.lock(guild_id).await;
    let settings: LeagueSettings = store.get(guild_id).await?;
    if !settings.active {
        return Err(DraftError::LeagueInactive);
    }
    if let Some(existing) = repository::find_draft(store.db(), guild_id).await? {
        if existing.active {
            return Err(DraftError::AlreadyRunning(existing.channel_id));
        }
    }
    let mut order: Vec<UserId> = repository::members(store.db(), guild_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    if order.len() < 2 {
        return Err(DraftError::NotEnoughManagers);
    }
    order.shuffle(rng);

    let draft = Draft::new(channel_id, order, settings.slots.len() as u32);
    repository::clear_draft_picks(store.db(), guild_id).await?;
    repository::save_draft(store.db(), guild_id, &draft).await?;
    info!(guild = %guild_id, channel = %channel_id, managers = draft.order.len(), rounds = draft.rounds, "Draft started");
    Ok(draft)
}

async fn running_draft(store: &GuildStore, guild_id: GuildId, channel_id: ChannelId) -> Result<Draft, DraftError> {
    match repository::find_draft(store.db(), guild_id).await? {
        Some(draft) if draft.active && draft.channel_id == channel_id => Ok(draft),
        Some(draft) if draft.active => Err(DraftError::WrongChannel(draft.channel_id)),
        _ => Err(DraftError::NotRunning),
    }
}

async fn record(
    store: &GuildStore,
    guild_id: GuildId,
    mut draft: Draft,
    turn: Turn,
    player: Option<&NbaPlayer>,
    now: i64,
) -> Result<PickOutcome, DraftError> {
    let pick = DraftPick {
        pick_number: turn.pick_number,
        round: turn.round,
        user_id: turn.user_id,
        player_id: player.map(|p| p.id),
        player_name: player.map(|p| p.name.clone()).unwrap_or_else(|| "(skipped)".to_string()),
        picked_at: now,
    };
    repository::insert_draft_pick(store.db(), guild_id, &pick).await?;
    draft.advance();
    repository::save_draft(store.db(), guild_id, &draft).await?;
    Ok(PickOutcome {
        pick,
        next: draft.on_the_clock(),
    })
}

/// Drafts `player` for `user_id`, who must be on the clock in `channel_id`.
pub async fn pick(
    store: &GuildStore,
    cache: &PlayerCache,
    guild_id: GuildId,
    channel_id: ChannelId,
    user_id: UserId,
    player: &NbaPlayer,
    now: i64,
) -> Result<PickOutcome, DraftError> {
    let _guard = store.lock(guild_id).await;
    let draft = running_draft(store, guild_id, channel_id).await?;
    let Some(turn) = draft.on_the_clock() else {
        return Err(DraftError::NotRunning);
    };
    if turn.user_id != user_id {
        return Err(DraftError::NotYourTurn(turn.user_id));
    }
    let settings: LeagueSettings = store.get(guild_id).await?;
    acquire(store.db(), &settings, cache, guild_id, user_id, player, now).await?;
    let outcome = record(store, guild_id, draft, turn, Some(player), now).await?;
    info!(guild = %guild_id, pick = turn.pick_number, player = player.id, "Draft pick made");
    Ok(outcome)
}

/// Skips the manager on the clock.
pub async fn skip(
    store: &GuildStore,
    guild_id: GuildId,
    channel_id: ChannelId,
    now: i64,
) -> Result<PickOutcome, DraftError> {
    let _guard = store.lock(guild_id).await;
    let draft = running_draft(store, guild_id, channel_id).await?;
    let Some(turn) = draft.on_the_clock() else {
        return Err(DraftError::NotRunning);
    };
    record(store, guild_id, draft, turn, None, now).await
}

pub async fn stop(store: &GuildStore, guild_id: GuildId) -> Result<(), DraftError> {
    let _guard = store.lock(guild_id).await;
    let Some(mut draft) = repository::find_draft(store.db(), guild_id).await?.filter(|d| d.active) else {
        return Err(DraftError::NotRunning);
    };
    draft.active = false;
    repository::save_draft(store.db(), guild_id, &draft).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        fantasy::{
            league::{join, setup},
            slots::Position,
            stats::test_support::player,
        },
        infrastructure::guild_store::test_support::memory_db,
    };

    const GUILD: GuildId = GuildId::new(1);
    const CHANNEL: ChannelId = ChannelId::new(50);

    fn users(ids: &[u64]) -> Vec<UserId> {
        ids.iter().map(|&id| UserId::new(id)).collect()
    }

    #[test]
    fn snake_order_reverses_every_round() {
        let draft = Draft::new(CHANNEL, users(&[1, 2, 3]), 3);
        let pickers: Vec<u64> = (0..draft.total_picks())
            .map(|p| draft.turn(p).unwrap().user_id.get())
            .collect();
        assert_eq!(pickers, vec![1, 2, 3, 3, 2, 1, 1, 2, 3]);
        assert_eq!(draft.turn(4).unwrap().round, 2);
        assert_eq!(draft.turn(9), None);
    }

    #[test]
    fn completes_after_rounds_times_managers() {
        let mut draft = Draft::new(CHANNEL, users(&[1, 2]), 2);
        for _ in 0..4 {
            assert!(draft.on_the_clock().is_some());
            draft.advance();
        }
        assert!(!draft.active);
        assert_eq!(draft.on_the_clock(), None);
    }

    async fn league_with(managers: &[u64]) -> (GuildStore, PlayerCache) {
        let store = GuildStore::new(memory_db().await);
        setup(&store, GUILD).await.unwrap();
        store
            .update(GUILD, |s: &mut LeagueSettings| s.slots = vec![Position::UTIL, Position::C])
            .await
            .unwrap();
        for &m in managers {
            join(&store, GUILD, UserId::new(m), m as i64).await.unwrap();
        }
        let cache = PlayerCache::default();
        cache.replace(
            (1..=6)
                .map(|i| player(i, &format!("Player {}", i), Position::C, 10.0 * i as f64))
                .collect(),
            0,
        );
        (store, cache)
    }

    #[tokio::test]
    async fn a_full_draft_fills_rosters() {
        let (store, cache) = league_with(&[1, 2]).await;
        let mut rng = StdRng::seed_from_u64(7);
        let draft = start(&store, GUILD, CHANNEL, &mut rng).await.unwrap();
        assert_eq!(draft.rounds, 2);
        assert!(matches!(
            start(&store, GUILD, CHANNEL, &mut rng).await,
            Err(DraftError::AlreadyRunning(c)) if c == CHANNEL
        ));

        let mut next = draft.on_the_clock();
        for id in 1..=4 {
            let turn = next.unwrap();
            let outcome = pick(&store, &cache, GUILD, CHANNEL, turn.user_id, &cache.get(id).unwrap(), 0)
                .await
                .unwrap();
            assert_eq!(outcome.pick.pick_number, id as u32);
            next = outcome.next;
        }
        assert_eq!(next, None);
        assert!(!repository::find_draft(store.db(), GUILD).await.unwrap().unwrap().active);
        assert_eq!(repository::all_rosters(store.db(), GUILD).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn only_the_manager_on_the_clock_may_pick() {
        let (store, cache) = league_with(&[1, 2]).await;
        let draft = start(&store, GUILD, CHANNEL, &mut StdRng::seed_from_u64(1)).await.unwrap();
        let up = draft.on_the_clock().unwrap().user_id;
        let other = draft.order.iter().copied().find(|u| *u != up).unwrap();

        assert!(matches!(
            pick(&store, &cache, GUILD, CHANNEL, other, &cache.get(1).unwrap(), 0).await,
            Err(DraftError::NotYourTurn(u)) if u == up
        ));
        assert!(matches!(
            pick(&store, &cache, GUILD, ChannelId::new(99), up, &cache.get(1).unwrap(), 0).await,
            Err(DraftError::WrongChannel(c)) if c == CHANNEL
        ));
    }

    #[tokio::test]
    async fn taken_players_cannot_be_drafted_and_skips_advance() {
        let (store, cache) = league_with(&[1, 2]).await;
        let draft = start(&store, GUILD, CHANNEL, &mut StdRng::seed_from_u64(3)).await.unwrap();
        let first = draft.on_the_clock().unwrap().user_id;
        let outcome = pick(&store, &cache, GUILD, CHANNEL, first, &cache.get(1).unwrap(), 0)
            .await
            .unwrap();
        let second = outcome.next.unwrap().user_id;
        assert!(matches!(
            pick(&store, &cache, GUILD, CHANNEL, second, &cache.get(1).unwrap(), 0).await,
            Err(DraftError::Roster(RosterError::Taken(_)))
        ));

        let skipped = skip(&store, GUILD, CHANNEL, 0).await.unwrap();
        assert_eq!(skipped.pick.player_id, None);
        assert_eq!(skipped.pick.user_id, second);
        // Snake: the second manager picks again to open round two.
        assert_eq!(skipped.next.unwrap().user_id, second);

        let (board, total) = repository::latest_draft_picks(store.db(), GUILD, BOARD_SIZE).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(board[1].player_name, "(skipped)");
    }

    #[tokio::test]
    async fn drafts_need_two_managers_and_can_be_stopped() {
        let (store, _) = league_with(&[1]).await;
        assert!(matches!(
            start(&store, GUILD, CHANNEL, &mut StdRng::seed_from_u64(0)).await,
            Err(DraftError::NotEnoughManagers)
        ));
        join(&store, GUILD, UserId::new(2), 9).await.unwrap();
        start(&store, GUILD, CHANNEL, &mut StdRng::seed_from_u64(0)).await.unwrap();
        stop(&store, GUILD).await.unwrap();
        assert!(matches!(stop(&store, GUILD).await, Err(DraftError::NotRunning)));
        assert!(matches!(skip(&store, GUILD, CHANNEL, 0).await, Err(DraftError::NotRunning)));
    }
}
