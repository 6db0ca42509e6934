pub use sea_orm_migration::prelude::*;

mod m20260301_000001_auction_house;
mod m20260310_000001_fantasy_league;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_auction_house::Migration),
            Box::new(m20260310_000001_fantasy_league::Migration),
        ]
    }
}
