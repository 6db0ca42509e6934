use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auction_bid")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub auction_id: String,
    pub user_id: String,
    pub amount: i64,
    pub placed_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
