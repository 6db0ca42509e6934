use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, OnConflict},
};

use crate::{
    entities::{
        fantasy_draft, fantasy_draft_pick, fantasy_league, fantasy_member, fantasy_roster, fantasy_trade, player_stats,
    },
    fantasy::{
        draft::{Draft, DraftPick},
        scoring::{ScoringWeights, StatLine},
        slots::{Position, default_slots, format_slots, parse_slots},
        stats::NbaPlayer,
        trade::{Trade, TradeStatus},
    },
    infrastructure::{
        guild_store::GuildRecord,
        ids::{id_from_string, id_to_string},
    },
};

/// Per-guild league configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueSettings {
    pub active: bool,
    pub fa_locked: bool,
    pub slots: Vec<Position>,
    pub weights: ScoringWeights,
}

impl Default for LeagueSettings {
    fn default() -> Self {
        Self {
            active: false,
            fa_locked: false,
            slots: default_slots(),
            weights: ScoringWeights::default(),
        }
    }
}

fn corrupt(what: &str, value: &str) -> DbErr {
    DbErr::Custom(format!("corrupt {} {:?}", what, value))
}

fn parse_id<T: From<u64>>(what: &str, value: &str) -> Result<T, DbErr> {
    id_from_string(value).map_err(|_| corrupt(what, value))
}

impl GuildRecord for LeagueSettings {
    async fn load(db: &DatabaseConnection, guild_id: GuildId) -> Result<Option<Self>, DbErr> {
        let Some(row) = fantasy_league::Entity::find_by_id(id_to_string(guild_id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            active: row.is_active,
            fa_locked: row.fa_locked,
            slots: parse_slots(&row.roster_slots).map_err(|_| corrupt("roster slots", &row.roster_slots))?,
            weights: ScoringWeights {
                pts: row.weight_pts,
                reb: row.weight_reb,
                ast: row.weight_ast,
                stl: row.weight_stl,
                blk: row.weight_blk,
                tov: row.weight_tov,
            },
        }))
    }

    async fn store(&self, db: &DatabaseConnection, guild_id: GuildId) -> Result<(), DbErr> {
        use fantasy_league::Column;
        fantasy_league::Entity::insert(fantasy_league::ActiveModel {
            guild_id: Set(id_to_string(guild_id)),
            is_active: Set(self.active),
            fa_locked: Set(self.fa_locked),
            roster_slots: Set(format_slots(&self.slots)),
            weight_pts: Set(self.weights.pts),
            weight_reb: Set(self.weights.reb),
            weight_ast: Set(self.weights.ast),
            weight_stl: Set(self.weights.stl),
            weight_blk: Set(self.weights.blk),
            weight_tov: Set(self.weights.tov),
        })
        .on_conflict(
            OnConflict::column(Column::GuildId)
                .update_columns([
                    Column::IsActive,
                    Column::FaLocked,
                    Column::RosterSlots,
                    Column::WeightPts,
                    Column::WeightReb,
                    Column::WeightAst,
                    Column::WeightStl,
                    Column::WeightBlk,
                    Column::WeightTov,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub user_id: UserId,
    pub banked_fp: f64,
    pub joined_at: i64,
}

impl TryFrom<fantasy_member::Model> for Member {
    type Error = DbErr;

    fn try_from(row: fantasy_member::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_id("member", &row.user_id)?,
            banked_fp: row.banked_fp,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub player_id: i64,
    pub acquired_fp: f64,
    pub acquired_at: i64,
}

impl TryFrom<fantasy_roster::Model> for RosterEntry {
    type Error = DbErr;

    fn try_from(row: fantasy_roster::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_id("roster owner", &row.user_id)?,
            player_id: row.player_id,
            acquired_fp: row.acquired_fp,
            acquired_at: row.acquired_at,
        })
    }
}

pub async fn members<C: ConnectionTrait>(db: &C, guild_id: GuildId) -> Result<Vec<Member>, DbErr> {
    fantasy_member::Entity::find()
        .filter(fantasy_member::Column::GuildId.eq(id_to_string(guild_id)))
        .order_by_asc(fantasy_member::Column::JoinedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Member::try_from)
        .collect()
}

pub async fn find_member<C: ConnectionTrait>(
    db: &C,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<Option<Member>, DbErr> {
    fantasy_member::Entity::find_by_id((id_to_string(guild_id), id_to_string(user_id)))
        .one(db)
        .await?
        .map(Member::try_from)
        .transpose()
}

pub async fn insert_member<C: ConnectionTrait>(
    db: &C,
    guild_id: GuildId,
    user_id: UserId,
    now: i64,
) -> Result<(), DbErr> {
    fantasy_member::Entity::insert(fantasy_member::ActiveModel {
        guild_id: Set(id_to_string(guild_id)),
        user_id: Set(id_to_string(user_id)),
        banked_fp: Set(0.0),
        joined_at: Set(now),
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Adds `amount` to the member's banked points.
pub async fn bank<C: ConnectionTrait>(db: &C, guild_id: GuildId, user_id: UserId, amount: f64) -> Result<(), DbErr> {
    fantasy_member::Entity::update_many()
        .col_expr(
            fantasy_member::Column::BankedFp,
            Expr::col(fantasy_member::Column::BankedFp).add(amount),
        )
        .filter(fantasy_member::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(fantasy_member::Column::UserId.eq(id_to_string(user_id)))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes the member and releases their players. Returns false when they were not in the league.
pub async fn delete_member<C: ConnectionTrait>(db: &C, guild_id: GuildId, user_id: UserId) -> Result<bool, DbErr> {
    fantasy_roster::Entity::delete_many()
        .filter(fantasy_roster::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(fantasy_roster::Column::UserId.eq(id_to_string(user_id)))
        .exec(db)
        .await?;
    let deleted = fantasy_member::Entity::delete_by_id((id_to_string(guild_id), id_to_string(user_id)))
        .exec(db)
        .await?;
    Ok(deleted.rows_affected > 0)
}

pub async fn roster<C: ConnectionTrait>(db: &C, guild_id: GuildId, user_id: UserId) -> Result<Vec<RosterEntry>, DbErr> {
    fantasy_roster::Entity::find()
        .filter(fantasy_roster::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(fantasy_roster::Column::UserId.eq(id_to_string(user_id)))
        .order_by_asc(fantasy_roster::Column::AcquiredAt)
        .order_by_asc(fantasy_roster::Column::PlayerId)
        .all(db)
        .await?
        .into_iter()
        .map(RosterEntry::try_from)
        .collect()
}

/// Every rostered player of the guild.
pub async fn all_rosters<C: ConnectionTrait>(db: &C, guild_id: GuildId) -> Result<Vec<RosterEntry>, DbErr> {
    fantasy_roster::Entity::find()
        .filter(fantasy_roster::Column::GuildId.eq(id_to_string(guild_id)))
        .all(db)
        .await?
        .into_iter()
        .map(RosterEntry::try_from)
        .collect()
}

pub async fn owner_of<C: ConnectionTrait>(
    db: &C,
    guild_id: GuildId,
    player_id: i64,
) -> Result<Option<RosterEntry>, DbErr> {
    fantasy_roster::Entity::find_by_id((id_to_string(guild_id), player_id))
        .one(db)
        .await?
        .map(RosterEntry::try_from)
        .transpose()
}

pub async fn insert_roster_entry<C: ConnectionTrait>(db: &C, guild_id: GuildId, entry: &RosterEntry) -> Result<(), DbErr> {
    fantasy_roster::Entity::insert(fantasy_roster::ActiveModel {
        guild_id: Set(id_to_string(guild_id)),
        player_id: Set(entry.player_id),
        user_id: Set(id_to_string(entry.user_id)),
        acquired_fp: Set(entry.acquired_fp),
        acquired_at: Set(entry.acquired_at),
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

pub async fn delete_roster_entry<C: ConnectionTrait>(db: &C, guild_id: GuildId, player_id: i64) -> Result<(), DbErr> {
    fantasy_roster::Entity::delete_by_id((id_to_string(guild_id), player_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Wipes members, rosters, drafts and trades. League settings survive.
pub async fn reset_league<C: ConnectionTrait>(db: &C, guild_id: GuildId) -> Result<(), DbErr> {
    let guild = id_to_string(guild_id);
    fantasy_roster::Entity::delete_many()
        .filter(fantasy_roster::Column::GuildId.eq(guild.clone()))
        .exec(db)
        .await?;
    fantasy_member::Entity::delete_many()
        .filter(fantasy_member::Column::GuildId.eq(guild.clone()))
        .exec(db)
        .await?;
    fantasy_draft_pick::Entity::delete_many()
        .filter(fantasy_draft_pick::Column::GuildId.eq(guild.clone()))
        .exec(db)
        .await?;
    fantasy_draft::Entity::delete_by_id(guild.clone()).exec(db).await?;
    fantasy_trade::Entity::delete_many()
        .filter(fantasy_trade::Column::GuildId.eq(guild))
        .exec(db)
        .await?;
    Ok(())
}

impl TryFrom<fantasy_draft::Model> for Draft {
    type Error = DbErr;

    fn try_from(row: fantasy_draft::Model) -> Result<Self, Self::Error> {
        let order = row
            .draft_order
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| parse_id("draft order", s))
            .collect::<Result<Vec<UserId>, _>>()?;
        Ok(Self {
            channel_id: parse_id("draft channel", &row.channel_id)?,
            order,
            rounds: row.rounds.max(0) as u32,
            picks_made: row.picks_made.max(0) as u32,
            active: row.active,
        })
    }
}

pub async fn find_draft<C: ConnectionTrait>(db: &C, guild_id: GuildId) -> Result<Option<Draft>, DbErr> {
    fantasy_draft::Entity::find_by_id(id_to_string(guild_id))
        .one(db)
        .await?
        .map(Draft::try_from)
        .transpose()
}

/// Inserts or replaces the guild's draft.
pub async fn save_draft<C: ConnectionTrait>(db: &C, guild_id: GuildId, draft: &Draft) -> Result<(), DbErr> {
    use fantasy_draft::Column;
    fantasy_draft::Entity::insert(fantasy_draft::ActiveModel {
        guild_id: Set(id_to_string(guild_id)),
        channel_id: Set(id_to_string(draft.channel_id)),
        draft_order: Set(draft.order.iter().map(|u| u.get().to_string()).collect::<Vec<_>>().join(",")),
        rounds: Set(draft.rounds as i32),
        picks_made: Set(draft.picks_made as i32),
        active: Set(draft.active),
    })
    .on_conflict(
        OnConflict::column(Column::GuildId)
            .update_columns([
                Column::ChannelId,
                Column::DraftOrder,
                Column::Rounds,
                Column::PicksMade,
                Column::Active,
            ])
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(())
}

pub async fn clear_draft_picks<C: ConnectionTrait>(db: &C, guild_id: GuildId) -> Result<(), DbErr> {
    fantasy_draft_pick::Entity::delete_many()
        .filter(fantasy_draft_pick::Column::GuildId.eq(id_to_string(guild_id)))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn insert_draft_pick<C: ConnectionTrait>(db: &C, guild_id: GuildId, pick: &DraftPick) -> Result<(), DbErr> {
    fantasy_draft_pick::Entity::insert(fantasy_draft_pick::ActiveModel {
        guild_id: Set(id_to_string(guild_id)),
        pick_number: Set(pick.pick_number as i32),
        round: Set(pick.round as i32),
        user_id: Set(id_to_string(pick.user_id)),
        player_id: Set(pick.player_id),
        player_name: Set(pick.player_name.clone()),
        picked_at: Set(pick.picked_at),
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// The latest `limit` picks, oldest first, and the total number of picks.
pub async fn latest_draft_picks<C: ConnectionTrait>(
    db: &C,
    guild_id: GuildId,
    limit: u64,
) -> Result<(Vec<DraftPick>, u64), DbErr> {
    use sea_orm::PaginatorTrait;
    let guild = id_to_string(guild_id);
    let total = fantasy_draft_pick::Entity::find()
        .filter(fantasy_draft_pick::Column::GuildId.eq(guild.clone()))
        .count(db)
        .await?;
    let mut picks = fantasy_draft_pick::Entity::find()
        .filter(fantasy_draft_pick::Column::GuildId.eq(guild))
        .order_by_desc(fantasy_draft_pick::Column::PickNumber)
        .limit(limit)
        .all(db)
        .await?
        .into_iter()
        .map(|row| {
            Ok(DraftPick {
                pick_number: row.pick_number.max(0) as u32,
                round: row.round.max(0) as u32,
                user_id: parse_id("drafter", &row.user_id)?,
                player_id: row.player_id,
                player_name: row.player_name,
                picked_at: row.picked_at,
            })
        })
        .collect::<Result<Vec<_>, DbErr>>()?;
    picks.reverse();
    Ok((picks, total))
}

impl TryFrom<fantasy_trade::Model> for Trade {
    type Error = DbErr;

    fn try_from(row: fantasy_trade::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            guild_id: parse_id("trade guild", &row.guild_id)?,
            proposer: parse_id("trade proposer", &row.proposer_id)?,
            target: parse_id("trade target", &row.target_id)?,
            status: row.status.parse::<TradeStatus>().map_err(|_| corrupt("trade status", &row.status))?,
            id: row.id,
            offered_player: row.offered_player_id,
            requested_player: row.requested_player_id,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

fn trade_model(trade: &Trade) -> fantasy_trade::ActiveModel {
    fantasy_trade::ActiveModel {
        id: Set(trade.id.clone()),
        guild_id: Set(id_to_string(trade.guild_id)),
        proposer_id: Set(id_to_string(trade.proposer)),
        target_id: Set(id_to_string(trade.target)),
        offered_player_id: Set(trade.offered_player),
        requested_player_id: Set(trade.requested_player),
        status: Set(trade.status.as_str().to_string()),
        created_at: Set(trade.created_at),
        resolved_at: Set(trade.resolved_at),
    }
}

pub async fn insert_trade<C: ConnectionTrait>(db: &C, trade: &Trade) -> Result<(), DbErr> {
    fantasy_trade::Entity::insert(trade_model(trade))
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn save_trade<C: ConnectionTrait>(db: &C, trade: &Trade) -> Result<(), DbErr> {
    fantasy_trade::Entity::update(trade_model(trade)).exec(db).await?;
    Ok(())
}

pub async fn find_trade<C: ConnectionTrait>(db: &C, guild_id: GuildId, id: &str) -> Result<Option<Trade>, DbErr> {
    fantasy_trade::Entity::find_by_id(id.to_string())
        .filter(fantasy_trade::Column::GuildId.eq(id_to_string(guild_id)))
        .one(db)
        .await?
        .map(Trade::try_from)
        .transpose()
}

/// Pending trades the user proposed or received, oldest first.
pub async fn pending_trades_for<C: ConnectionTrait>(
    db: &C,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<Vec<Trade>, DbErr> {
    let user = id_to_string(user_id);
    fantasy_trade::Entity::find()
        .filter(fantasy_trade::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(fantasy_trade::Column::Status.eq(TradeStatus::Pending.as_str()))
        .filter(
            fantasy_trade::Column::ProposerId
                .eq(user.clone())
                .or(fantasy_trade::Column::TargetId.eq(user)),
        )
        .order_by_asc(fantasy_trade::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Trade::try_from)
        .collect()
}

/// Replaces the stored stats table.
pub async fn store_player_stats<C: ConnectionTrait>(db: &C, players: &[NbaPlayer], now: i64) -> Result<(), DbErr> {
    player_stats::Entity::delete_many().exec(db).await?;
    for chunk in players.chunks(200) {
        player_stats::Entity::insert_many(chunk.iter().map(|p| player_stats::ActiveModel {
            player_id: Set(p.id),
            name: Set(p.name.clone()),
            team: Set(p.team.clone()),
            position: Set(p.position.as_str().to_string()),
            games_played: Set(p.games_played),
            pts: Set(p.stats.pts),
            reb: Set(p.stats.reb),
            ast: Set(p.stats.ast),
            stl: Set(p.stats.stl),
            blk: Set(p.stats.blk),
            tov: Set(p.stats.tov),
            updated_at: Set(now),
        }))
        .exec_without_returning(db)
        .await?;
    }
    Ok(())
}

/// The stored stats table in its stored order, and when it was written.
pub async fn load_player_stats<C: ConnectionTrait>(db: &C) -> Result<(Vec<NbaPlayer>, i64), DbErr> {
    let rows = player_stats::Entity::find()
        .order_by_desc(player_stats::Column::Pts)
        .all(db)
        .await?;
    let updated_at = rows.iter().map(|r| r.updated_at).max().unwrap_or(0);
    let mut players: Vec<NbaPlayer> = rows
        .into_iter()
        .map(|row| NbaPlayer {
            id: row.player_id,
            position: row.position.parse().unwrap_or(Position::UTIL),
            name: row.name,
            team: row.team,
            games_played: row.games_played,
            stats: StatLine {
                pts: row.pts,
                reb: row.reb,
                ast: row.ast,
                stl: row.stl,
                blk: row.blk,
                tov: row.tov,
            },
        })
        .collect();
    let weights = ScoringWeights::default();
    players.sort_by(|a, b| b.fantasy_points(&weights).total_cmp(&a.fantasy_points(&weights)));
    Ok((players, updated_at))
}
