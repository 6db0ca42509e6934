use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "player_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub player_id: i64,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    pub team: String,
    pub position: String,
    pub games_played: i32,
    #[sea_orm(column_type = "Double")]
    pub pts: f64,
    #[sea_orm(column_type = "Double")]
    pub reb: f64,
    #[sea_orm(column_type = "Double")]
    pub ast: f64,
    #[sea_orm(column_type = "Double")]
    pub stl: f64,
    #[sea_orm(column_type = "Double")]
    pub blk: f64,
    #[sea_orm(column_type = "Double")]
    pub tov: f64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
