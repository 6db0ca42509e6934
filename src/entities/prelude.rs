pub use super::auction::Entity as Auction;
pub use super::auction_bid::Entity as AuctionBid;
pub use super::auction_settings::Entity as AuctionSettings;
pub use super::fantasy_draft::Entity as FantasyDraft;
pub use super::fantasy_draft_pick::Entity as FantasyDraftPick;
pub use super::fantasy_league::Entity as FantasyLeague;
pub use super::fantasy_member::Entity as FantasyMember;
pub use super::fantasy_roster::Entity as FantasyRoster;
pub use super::fantasy_trade::Entity as FantasyTrade;
pub use super::player_stats::Entity as PlayerStats;
pub use super::trivia_leaderboard::Entity as TriviaLeaderboard;
