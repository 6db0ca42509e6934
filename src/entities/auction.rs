use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub item: String,
    pub min_bid: i64,
    pub min_increment: i64,
    pub buyout: Option<i64>,
    pub current_bid: i64,
    pub highest_bidder: Option<String>,
    pub end_time: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
