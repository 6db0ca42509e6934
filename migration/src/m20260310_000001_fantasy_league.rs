use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FantasyLeague::Table)
                    .col(string(FantasyLeague::GuildId).primary_key())
                    .col(boolean(FantasyLeague::IsActive).default(false))
                    .col(boolean(FantasyLeague::FaLocked).default(false))
                    .col(text(FantasyLeague::RosterSlots).default(""))
                    .col(double(FantasyLeague::WeightPts).default(1.0))
                    .col(double(FantasyLeague::WeightReb).default(1.2))
                    .col(double(FantasyLeague::WeightAst).default(1.5))
                    .col(double(FantasyLeague::WeightStl).default(3.0))
                    .col(double(FantasyLeague::WeightBlk).default(3.0))
                    .col(double(FantasyLeague::WeightTov).default(-1.0))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(FantasyMember::Table)
                    .col(string(FantasyMember::GuildId))
                    .col(string(FantasyMember::UserId))
                    .col(double(FantasyMember::BankedFp).default(0.0))
                    .col(big_integer(FantasyMember::JoinedAt))
                    .primary_key(
                        IndexCreateStatement::new()
                            .col(FantasyMember::GuildId)
                            .col(FantasyMember::UserId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        // A player can only be rostered once per guild.
        manager
            .create_table(
                Table::create()
                    .table(FantasyRoster::Table)
                    .col(string(FantasyRoster::GuildId))
                    .col(big_integer(FantasyRoster::PlayerId))
                    .col(string(FantasyRoster::UserId))
                    .col(double(FantasyRoster::AcquiredFp))
                    .col(big_integer(FantasyRoster::AcquiredAt))
                    .primary_key(
                        IndexCreateStatement::new()
                            .col(FantasyRoster::GuildId)
                            .col(FantasyRoster::PlayerId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                IndexCreateStatement::new()
                    .table(FantasyRoster::Table)
                    .name("idx-fantasy-roster-guild-user")
                    .col(FantasyRoster::GuildId)
                    .col(FantasyRoster::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(PlayerStats::Table)
                    .col(big_integer(PlayerStats::PlayerId).primary_key())
                    .col(text(PlayerStats::Name))
                    .col(string(PlayerStats::Team).default(""))
                    .col(string(PlayerStats::Position).default("UTIL"))
                    .col(integer(PlayerStats::GamesPlayed).default(0))
                    .col(double(PlayerStats::Pts).default(0.0))
                    .col(double(PlayerStats::Reb).default(0.0))
                    .col(double(PlayerStats::Ast).default(0.0))
                    .col(double(PlayerStats::Stl).default(0.0))
                    .col(double(PlayerStats::Blk).default(0.0))
                    .col(double(PlayerStats::Tov).default(0.0))
                    .col(big_integer(PlayerStats::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(FantasyDraft::Table)
                    .col(string(FantasyDraft::GuildId).primary_key())
                    .col(string(FantasyDraft::ChannelId))
                    .col(text(FantasyDraft::DraftOrder))
                    .col(integer(FantasyDraft::Rounds))
                    .col(integer(FantasyDraft::PicksMade).default(0))
                    .col(boolean(FantasyDraft::Active).default(true))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(FantasyDraftPick::Table)
                    .col(string(FantasyDraftPick::GuildId))
                    .col(integer(FantasyDraftPick::PickNumber))
                    .col(integer(FantasyDraftPick::Round))
                    .col(string(FantasyDraftPick::UserId))
                    .col(big_integer_null(FantasyDraftPick::PlayerId))
                    .col(text(FantasyDraftPick::PlayerName))
                    .col(big_integer(FantasyDraftPick::PickedAt))
                    .primary_key(
                        IndexCreateStatement::new()
                            .col(FantasyDraftPick::GuildId)
                            .col(FantasyDraftPick::PickNumber)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(FantasyTrade::Table)
                    .col(string(FantasyTrade::Id).primary_key())
                    .col(string(FantasyTrade::GuildId))
                    .col(string(FantasyTrade::ProposerId))
                    .col(string(FantasyTrade::TargetId))
                    .col(big_integer(FantasyTrade::OfferedPlayerId))
                    .col(big_integer(FantasyTrade::RequestedPlayerId))
                    .col(string(FantasyTrade::Status))
                    .col(big_integer(FantasyTrade::CreatedAt))
                    .col(big_integer_null(FantasyTrade::ResolvedAt))
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FantasyTrade::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FantasyDraftPick::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FantasyDraft::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlayerStats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FantasyRoster::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FantasyMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FantasyLeague::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum FantasyLeague {
    Table,
    GuildId,
    IsActive,
    FaLocked,
    RosterSlots,
    WeightPts,
    WeightReb,
    WeightAst,
    WeightStl,
    WeightBlk,
    WeightTov,
}

#[derive(DeriveIden)]
enum FantasyMember {
    Table,
    GuildId,
    UserId,
    BankedFp,
    JoinedAt,
}

#[derive(DeriveIden)]
enum FantasyRoster {
    Table,
    GuildId,
    PlayerId,
    UserId,
    AcquiredFp,
    AcquiredAt,
}

#[derive(DeriveIden)]
enum PlayerStats {
    Table,
    PlayerId,
    Name,
    Team,
    Position,
    GamesPlayed,
    Pts,
    Reb,
    Ast,
    Stl,
    Blk,
    Tov,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FantasyDraft {
    Table,
    GuildId,
    ChannelId,
    DraftOrder,
    Rounds,
    PicksMade,
    Active,
}

#[derive(DeriveIden)]
enum FantasyDraftPick {
    Table,
    GuildId,
    PickNumber,
    Round,
    UserId,
    PlayerId,
    PlayerName,
    PickedAt,
}

#[derive(DeriveIden)]
enum FantasyTrade {
    Table,
    Id,
    GuildId,
    ProposerId,
    TargetId,
    OfferedPlayerId,
    RequestedPlayerId,
    Status,
    CreatedAt,
    ResolvedAt,
}
