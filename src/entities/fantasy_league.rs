use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fantasy_league")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    pub is_active: bool,
    pub fa_locked: bool,
    #[sea_orm(column_type = "Text")]
    pub roster_slots: String,
    #[sea_orm(column_type = "Double")]
    pub weight_pts: f64,
    #[sea_orm(column_type = "Double")]
    pub weight_reb: f64,
    #[sea_orm(column_type = "Double")]
    pub weight_ast: f64,
    #[sea_orm(column_type = "Double")]
    pub weight_stl: f64,
    #[sea_orm(column_type = "Double")]
    pub weight_blk: f64,
    #[sea_orm(column_type = "Double")]
    pub weight_tov: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
