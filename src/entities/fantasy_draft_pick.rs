use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "fantasy_draft_pick")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub pick_number: i32,
    pub round: i32,
    pub user_id: String,
    /// `None` when the pick was skipped.
    pub player_id: Option<i64>,
    #[sea_orm(column_type = "Text")]
    pub player_name: String,
    pub picked_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
