use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuctionSettings::Table)
                    .col(string(AuctionSettings::GuildId).primary_key())
                    .col(string_null(AuctionSettings::LogChannelId))
                    .col(big_integer(AuctionSettings::MinIncrement).default(1))
                    .col(string_null(AuctionSettings::PingRoleId))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Auction::Table)
                    .col(string(Auction::Id).primary_key())
                    .col(string(Auction::GuildId))
                    .col(string(Auction::ChannelId))
                    .col(string_null(Auction::MessageId))
                    .col(text(Auction::Item))
                    .col(big_integer(Auction::MinBid))
                    .col(big_integer(Auction::MinIncrement).default(1))
                    .col(big_integer_null(Auction::Buyout))
                    .col(big_integer(Auction::CurrentBid).default(0))
                    .col(string_null(Auction::HighestBidder))
                    .col(big_integer(Auction::EndTime))
                    .col(string(Auction::Status))
                    .col(string(Auction::CreatedBy))
                    .col(big_integer(Auction::CreatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                IndexCreateStatement::new()
                    .table(Auction::Table)
                    .name("idx-auction-guild-status")
                    .col(Auction::GuildId)
                    .col(Auction::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(AuctionBid::Table)
                    .col(pk_auto(AuctionBid::Id))
                    .col(string(AuctionBid::AuctionId))
                    .col(string(AuctionBid::UserId))
                    .col(big_integer(AuctionBid::Amount))
                    .col(big_integer(AuctionBid::PlacedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                IndexCreateStatement::new()
                    .table(AuctionBid::Table)
                    .name("idx-auction-bid-auction")
                    .col(AuctionBid::AuctionId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(TriviaLeaderboard::Table)
                    .col(string(TriviaLeaderboard::Game))
                    .col(string(TriviaLeaderboard::UserId))
                    .col(integer(TriviaLeaderboard::Wins).default(0))
                    .primary_key(
                        IndexCreateStatement::new()
                            .col(TriviaLeaderboard::Game)
                            .col(TriviaLeaderboard::UserId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TriviaLeaderboard::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuctionBid::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Auction::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuctionSettings::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum AuctionSettings {
    Table,
    GuildId,
    LogChannelId,
    MinIncrement,
    PingRoleId,
}

#[derive(DeriveIden)]
enum Auction {
    Table,
    Id,
    GuildId,
    ChannelId,
    MessageId,
    Item,
    MinBid,
    MinIncrement,
    Buyout,
    CurrentBid,
    HighestBidder,
    EndTime,
    Status,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuctionBid {
    Table,
    Id,
    AuctionId,
    UserId,
    Amount,
    PlacedAt,
}

#[derive(DeriveIden)]
enum TriviaLeaderboard {
    Table,
    Game,
    UserId,
    Wins,
}
