use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::OnConflict,
};

use crate::{
    auction::ladder::{Auction, AuctionStatus, Bid},
    entities::{auction, auction_bid, auction_settings},
    infrastructure::{
        guild_store::GuildRecord,
        ids::{id_from_string, id_to_string},
    },
};

/// Per-guild auction configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSettings {
    pub log_channel: Option<ChannelId>,
    pub min_increment: i64,
    pub ping_role: Option<RoleId>,
}

impl Default for AuctionSettings {
    fn default() -> Self {
        Self {
            log_channel: None,
            min_increment: 1,
            ping_role: None,
        }
    }
}

fn corrupt(what: &str, value: &str) -> DbErr {
    DbErr::Custom(format!("corrupt {} {:?}", what, value))
}

fn parse_id<T: From<u64>>(what: &str, value: &str) -> Result<T, DbErr> {
    id_from_string(value).map_err(|_| corrupt(what, value))
}

fn parse_optional_id<T: From<u64>>(what: &str, value: Option<&str>) -> Result<Option<T>, DbErr> {
    value.map(|v| parse_id(what, v)).transpose()
}

impl GuildRecord for AuctionSettings {
    async fn load(db: &DatabaseConnection, guild_id: GuildId) -> Result<Option<Self>, DbErr> {
        let Some(row) = auction_settings::Entity::find_by_id(id_to_string(guild_id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            log_channel: parse_optional_id("log channel", row.log_channel_id.as_deref())?,
            min_increment: row.min_increment,
            ping_role: parse_optional_id("ping role", row.ping_role_id.as_deref())?,
        }))
    }

    async fn store(&self, db: &DatabaseConnection, guild_id: GuildId) -> Result<(), DbErr> {
        auction_settings::Entity::insert(auction_settings::ActiveModel {
            guild_id: Set(id_to_string(guild_id)),
            log_channel_id: Set(self.log_channel.map(id_to_string)),
            min_increment: Set(self.min_increment),
            ping_role_id: Set(self.ping_role.map(id_to_string)),
        })
        .on_conflict(
            OnConflict::column(auction_settings::Column::GuildId)
                .update_columns([
                    auction_settings::Column::LogChannelId,
                    auction_settings::Column::MinIncrement,
                    auction_settings::Column::PingRoleId,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
        Ok(())
    }
}

impl TryFrom<auction::Model> for Auction {
    type Error = DbErr;

    fn try_from(row: auction::Model) -> Result<Self, Self::Error> {
        Ok(Auction {
            guild_id: parse_id("guild id", &row.guild_id)?,
            channel_id: parse_id("channel id", &row.channel_id)?,
            message_id: parse_optional_id("message id", row.message_id.as_deref())?,
            highest_bidder: parse_optional_id("bidder", row.highest_bidder.as_deref())?,
            status: row.status.parse().map_err(|_| corrupt("auction status", &row.status))?,
            created_by: parse_id("creator", &row.created_by)?,
            id: row.id,
            item: row.item,
            min_bid: row.min_bid,
            min_increment: row.min_increment,
            buyout: row.buyout,
            current_bid: row.current_bid,
            end_time: row.end_time,
            created_at: row.created_at,
        })
    }
}

fn to_active_model(auction: &Auction) -> auction::ActiveModel {
    auction::ActiveModel {
        id: Set(auction.id.clone()),
        guild_id: Set(id_to_string(auction.guild_id)),
        channel_id: Set(id_to_string(auction.channel_id)),
        message_id: Set(auction.message_id.map(id_to_string)),
        item: Set(auction.item.clone()),
        min_bid: Set(auction.min_bid),
        min_increment: Set(auction.min_increment),
        buyout: Set(auction.buyout),
        current_bid: Set(auction.current_bid),
        highest_bidder: Set(auction.highest_bidder.map(id_to_string)),
        end_time: Set(auction.end_time),
        status: Set(auction.status.as_str().to_string()),
        created_by: Set(id_to_string(auction.created_by)),
        created_at: Set(auction.created_at),
    }
}

pub async fn insert(db: &DatabaseConnection, auction: &Auction) -> Result<(), DbErr> {
    auction::Entity::insert(to_active_model(auction))
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn save(db: &DatabaseConnection, auction: &Auction) -> Result<(), DbErr> {
    auction::Entity::update(to_active_model(auction)).exec(db).await?;
    Ok(())
}

pub async fn find(db: &DatabaseConnection, id: &str) -> Result<Option<Auction>, DbErr> {
    auction::Entity::find_by_id(id.to_string())
        .one(db)
        .await?
        .map(Auction::try_from)
        .transpose()
}

pub async fn active_in_channel(
    db: &DatabaseConnection,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<Option<Auction>, DbErr> {
    auction::Entity::find()
        .filter(auction::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(auction::Column::ChannelId.eq(id_to_string(channel_id)))
        .filter(auction::Column::Status.eq(AuctionStatus::Active.as_str()))
        .one(db)
        .await?
        .map(Auction::try_from)
        .transpose()
}

pub async fn active_in_guild(db: &DatabaseConnection, guild_id: GuildId) -> Result<Vec<Auction>, DbErr> {
    auction::Entity::find()
        .filter(auction::Column::GuildId.eq(id_to_string(guild_id)))
        .filter(auction::Column::Status.eq(AuctionStatus::Active.as_str()))
        .order_by_asc(auction::Column::EndTime)
        .all(db)
        .await?
        .into_iter()
        .map(Auction::try_from)
        .collect()
}

/// Every active auction of every guild, for resuming timers after a restart.
pub async fn all_active(db: &DatabaseConnection) -> Result<Vec<Auction>, DbErr> {
    auction::Entity::find()
        .filter(auction::Column::Status.eq(AuctionStatus::Active.as_str()))
        .all(db)
        .await?
        .into_iter()
        .map(Auction::try_from)
        .collect()
}

/// Appends to the bid history. History is never rewritten.
pub async fn record_bid(db: &DatabaseConnection, auction_id: &str, bid: &Bid) -> Result<(), DbErr> {
    auction_bid::Entity::insert(auction_bid::ActiveModel {
        id: NotSet,
        auction_id: Set(auction_id.to_string()),
        user_id: Set(id_to_string(bid.user_id)),
        amount: Set(bid.amount),
        placed_at: Set(bid.placed_at),
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

/// Most recent first.
pub async fn recent_bids(db: &DatabaseConnection, auction_id: &str, limit: u64) -> Result<Vec<Bid>, DbErr> {
    auction_bid::Entity::find()
        .filter(auction_bid::Column::AuctionId.eq(auction_id))
        .order_by_desc(auction_bid::Column::Id)
        .limit(limit)
        .all(db)
        .await?
        .into_iter()
        .map(|row| {
            Ok(Bid {
                user_id: parse_id("bidder", &row.user_id)?,
                amount: row.amount,
                placed_at: row.placed_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{MessageId, UserId};

    use super::*;
    use crate::{
        auction::ladder::NewAuction,
        infrastructure::guild_store::{GuildStore, test_support::memory_db},
    };

    fn open(id: &str, channel: u64) -> Auction {
        Auction::open(
            NewAuction {
                id: id.into(),
                guild_id: GuildId::new(1),
                channel_id: ChannelId::new(channel),
                item: "Jersey".into(),
                duration_mins: 5,
                min_bid: 10,
                min_increment: 2,
                buyout: Some(100),
                created_by: UserId::new(7),
            },
            1_000,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn settings_default_then_persist() {
        let store = GuildStore::new(memory_db().await);
        let guild = GuildId::new(5);
        let settings: AuctionSettings = store.get(guild).await.unwrap();
        assert_eq!(settings, AuctionSettings::default());

        store
            .update(guild, |s: &mut AuctionSettings| {
                s.log_channel = Some(ChannelId::new(42));
                s.min_increment = 5;
            })
            .await
            .unwrap();
        let settings: AuctionSettings = store.get(guild).await.unwrap();
        assert_eq!(settings.log_channel, Some(ChannelId::new(42)));
        assert_eq!(settings.min_increment, 5);
        assert_eq!(settings.ping_role, None);
    }

    #[tokio::test]
    async fn auctions_round_trip_and_filter_by_status() {
        let db = memory_db().await;
        let mut first = open("a", 10);
        first.message_id = Some(MessageId::new(77));
        insert(&db, &first).await.unwrap();
        insert(&db, &open("b", 11)).await.unwrap();

        let loaded = active_in_channel(&db, GuildId::new(1), ChannelId::new(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, first);

        first.place_bid(UserId::new(3), 12, 1_001).unwrap();
        first.end().unwrap();
        save(&db, &first).await.unwrap();

        assert!(active_in_channel(&db, GuildId::new(1), ChannelId::new(10)).await.unwrap().is_none());
        assert_eq!(active_in_guild(&db, GuildId::new(1)).await.unwrap().len(), 1);
        assert_eq!(all_active(&db).await.unwrap().len(), 1);
        assert_eq!(find(&db, "a").await.unwrap().unwrap().status, AuctionStatus::Ended);
    }

    #[tokio::test]
    async fn bid_history_is_newest_first() {
        let db = memory_db().await;
        for (user, amount) in [(1, 10), (2, 12), (1, 14), (3, 20)] {
            record_bid(
                &db,
                "a",
                &Bid {
                    user_id: UserId::new(user),
                    amount,
                    placed_at: 0,
                },
            )
            .await
            .unwrap();
        }
        let bids = recent_bids(&db, "a", 3).await.unwrap();
        let amounts: Vec<i64> = bids.iter().map(|b| b.amount).collect();
        assert_eq!(amounts, vec![20, 14, 12]);
        assert!(recent_bids(&db, "other", 3).await.unwrap().is_empty());
    }
}
