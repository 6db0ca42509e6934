//! `SeaORM` entities for the courtside schema.

pub mod prelude;

pub mod auction;
pub mod auction_bid;
pub mod auction_settings;
pub mod fantasy_draft;
pub mod fantasy_draft_pick;
pub mod fantasy_league;
pub mod fantasy_member;
pub mod fantasy_roster;
pub mod fantasy_trade;
pub mod player_stats;
pub mod trivia_leaderboard;
