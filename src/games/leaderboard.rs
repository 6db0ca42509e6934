use poise::serenity_prelude::UserId;
use sea_orm::{
    ActiveValue::Set,
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use crate::{
    entities::trivia_leaderboard,
    infrastructure::ids::{id_from_string, id_to_string},
};

/// Leaderboard key of the F1 quiz.
pub const F1_QUIZ: &str = "f1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: UserId,
    pub wins: i32,
}

/// Adds one win for `user_id` in `game`.
pub async fn record_win(db: &DatabaseConnection, game: &str, user_id: UserId) -> Result<(), DbErr> {
    debug!(game, user = %user_id, "Recording trivia win");
    trivia_leaderboard::Entity::insert(trivia_leaderboard::ActiveModel {
        game: Set(game.to_string()),
        user_id: Set(id_to_string(user_id)),
        wins: Set(1),
    })
    .on_conflict(
        OnConflict::columns([trivia_leaderboard::Column::Game, trivia_leaderboard::Column::UserId])
            .value(
                trivia_leaderboard::Column::Wins,
                Expr::col(trivia_leaderboard::Column::Wins).add(1),
            )
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;
    Ok(())
}

pub async fn top(db: &DatabaseConnection, game: &str, limit: u64) -> Result<Vec<LeaderboardRow>, DbErr> {
    let rows = trivia_leaderboard::Entity::find()
        .filter(trivia_leaderboard::Column::Game.eq(game))
        .order_by_desc(trivia_leaderboard::Column::Wins)
        .order_by_asc(trivia_leaderboard::Column::UserId)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            id_from_string(&row.user_id)
                .ok()
                .map(|user_id| LeaderboardRow { user_id, wins: row.wins })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::guild_store::test_support::memory_db;

    #[tokio::test]
    async fn wins_accumulate_per_user() {
        let db = memory_db().await;
        record_win(&db, F1_QUIZ, UserId::new(1)).await.unwrap();
        record_win(&db, F1_QUIZ, UserId::new(2)).await.unwrap();
        record_win(&db, F1_QUIZ, UserId::new(2)).await.unwrap();
        record_win(&db, "other", UserId::new(3)).await.unwrap();

        let rows = top(&db, F1_QUIZ, 10).await.unwrap();
        assert_eq!(
            rows,
            vec![
                LeaderboardRow {
                    user_id: UserId::new(2),
                    wins: 2
                },
                LeaderboardRow {
                    user_id: UserId::new(1),
                    wins: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn limit_caps_the_list() {
        let db = memory_db().await;
        for id in 1..=12 {
            record_win(&db, F1_QUIZ, UserId::new(id)).await.unwrap();
        }
        assert_eq!(top(&db, F1_QUIZ, 10).await.unwrap().len(), 10);
    }
}
