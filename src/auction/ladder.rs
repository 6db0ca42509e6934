/*!

The bid ladder of a single auction.

An auction is `active` until it is sold by a buyout bid, ended or expired by its timer or an admin, or cancelled. All
four of those states are terminal: nothing moves an auction out of them.

*/

use std::{fmt, str::FromStr};

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};

/// Bids placed with less than this many seconds left push the end time back.
pub const ANTI_SNIPE_WINDOW: i64 = 60;
pub const ANTI_SNIPE_EXTENSION: i64 = 60;
/// Thirty days.
pub const MAX_DURATION_MINS: i64 = 30 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuctionStatus {
    Active,
    Sold,
    Ended,
    Expired,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "active",
            AuctionStatus::Sold => "sold",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Expired => "expired",
            AuctionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != AuctionStatus::Active
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown auction status {0:?}")]
pub struct UnknownStatus(String);

impl FromStr for AuctionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AuctionStatus::Active),
            "sold" => Ok(AuctionStatus::Sold),
            "ended" => Ok(AuctionStatus::Ended),
            "expired" => Ok(AuctionStatus::Expired),
            "cancelled" => Ok(AuctionStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BidError {
    #[error("This auction is already {0}.")]
    NotActive(AuctionStatus),
    #[error("This auction has closed.")]
    Closed,
    #[error("Minimum bid is `{min_bid}`.")]
    BelowMinimum { min_bid: i64 },
    #[error("Bid must be higher than the current bid of `{current}`.")]
    NotHigher { current: i64 },
    #[error("Bids must raise the current bid by at least `{increment}` (next valid bid: `{next}`).")]
    IncrementTooSmall { increment: i64, next: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuctionError {
    #[error("This auction is already {0}.")]
    AlreadyFinished(AuctionStatus),
    #[error("The duration must be at least one minute.")]
    InvalidDuration,
    #[error("Auctions can run for at most {} minutes.", MAX_DURATION_MINS)]
    DurationTooLong,
    #[error("The minimum bid must be positive.")]
    InvalidMinimum,
    #[error("The buyout must be at least the minimum bid.")]
    InvalidBuyout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub user_id: UserId,
    pub amount: i64,
    pub placed_at: i64,
}

/// What an accepted bid changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidReceipt {
    pub previous_bidder: Option<UserId>,
    pub previous_bid: i64,
    /// The end time was pushed back by the anti-snipe rule.
    pub extended: bool,
    /// The bid met the buyout.
    pub sold: bool,
}

/// Parameters of `auction start`.
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub id: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub item: String,
    pub duration_mins: i64,
    pub min_bid: i64,
    pub min_increment: i64,
    pub buyout: Option<i64>,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auction {
    pub id: String,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: Option<MessageId>,
    pub item: String,
    pub min_bid: i64,
    pub min_increment: i64,
    pub buyout: Option<i64>,
    pub current_bid: i64,
    pub highest_bidder: Option<UserId>,
    pub end_time: i64,
    pub status: AuctionStatus,
    pub created_by: UserId,
    pub created_at: i64,
}

impl Auction {
    pub fn open(params: NewAuction, now: i64) -> Result<Self, AuctionError> {
        if params.duration_mins < 1 {
            return Err(AuctionError::InvalidDuration);
        }
        if params.duration_mins > MAX_DURATION_MINS {
            return Err(AuctionError::DurationTooLong);
        }
        if params.min_bid < 1 {
            return Err(AuctionError::InvalidMinimum);
        }
        if params.buyout.is_some_and(|buyout| buyout < params.min_bid) {
            return Err(AuctionError::InvalidBuyout);
        }
        Ok(Self {
            id: params.id,
            guild_id: params.guild_id,
            channel_id: params.channel_id,
            message_id: None,
            item: params.item,
            min_bid: params.min_bid,
            min_increment: params.min_increment.max(1),
            buyout: params.buyout,
            current_bid: 0,
            highest_bidder: None,
            end_time: now.saturating_add(params.duration_mins * 60),
            status: AuctionStatus::Active,
            created_by: params.created_by,
            created_at: now,
        })
    }

    pub fn seconds_left(&self, now: i64) -> i64 {
        (self.end_time - now).max(0)
    }

    /// The smallest bid that would currently be accepted.
    pub fn next_valid_bid(&self) -> i64 {
        if self.highest_bidder.is_some() {
            self.current_bid.saturating_add(self.min_increment)
        } else {
            self.min_bid
        }
    }

    pub fn place_bid(&mut self, bidder: UserId, amount: i64, now: i64) -> Result<BidReceipt, BidError> {
        if self.status.is_terminal() {
            return Err(BidError::NotActive(self.status));
        }
        if now >= self.end_time {
            return Err(BidError::Closed);
        }
        if amount < self.min_bid {
            return Err(BidError::BelowMinimum { min_bid: self.min_bid });
        }
        if amount <= self.current_bid {
            return Err(BidError::NotHigher {
                current: self.current_bid,
            });
        }
        let next = self.next_valid_bid();
        if self.highest_bidder.is_some() && amount < next {
            return Err(BidError::IncrementTooSmall {
                increment: self.min_increment,
                next,
            });
        }

        let extended = self.end_time - now < ANTI_SNIPE_WINDOW;
        if extended {
            self.end_time = self.end_time.saturating_add(ANTI_SNIPE_EXTENSION);
        }

        let receipt = BidReceipt {
            previous_bidder: self.highest_bidder.replace(bidder),
            previous_bid: self.current_bid,
            extended,
            sold: self.buyout.is_some_and(|buyout| amount >= buyout),
        };
        self.current_bid = amount;
        if receipt.sold {
            self.status = AuctionStatus::Sold;
        }
        Ok(receipt)
    }

    /// Closes an active auction whose end time has passed. Returns the new status when it changed.
    pub fn expire_if_due(&mut self, now: i64) -> Option<AuctionStatus> {
        if self.status.is_terminal() || now < self.end_time {
            return None;
        }
        self.status = self.closing_status();
        Some(self.status)
    }

    /// Ends the auction now, regardless of the timer.
    pub fn end(&mut self) -> Result<AuctionStatus, AuctionError> {
        if self.status.is_terminal() {
            return Err(AuctionError::AlreadyFinished(self.status));
        }
        self.status = self.closing_status();
        Ok(self.status)
    }

    pub fn cancel(&mut self) -> Result<(), AuctionError> {
        if self.status.is_terminal() {
            return Err(AuctionError::AlreadyFinished(self.status));
        }
        self.status = AuctionStatus::Cancelled;
        Ok(())
    }

    fn closing_status(&self) -> AuctionStatus {
        if self.highest_bidder.is_some() {
            AuctionStatus::Ended
        } else {
            AuctionStatus::Expired
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn auction(min_bid: i64, min_increment: i64, buyout: Option<i64>) -> Auction {
        Auction::open(
            NewAuction {
                id: "1".into(),
                guild_id: GuildId::new(1),
                channel_id: ChannelId::new(2),
                item: "Rookie Card".into(),
                duration_mins: 10,
                min_bid,
                min_increment,
                buyout,
                created_by: UserId::new(99),
            },
            NOW,
        )
        .unwrap()
    }

    fn alice() -> UserId {
        UserId::new(1)
    }

    fn bob() -> UserId {
        UserId::new(2)
    }

    #[test]
    fn increments_are_enforced_after_the_first_bid() {
        let mut auction = auction(100, 10, None);

        let first = auction.place_bid(alice(), 100, NOW).unwrap();
        assert_eq!(first.previous_bidder, None);
        assert_eq!(
            auction.place_bid(bob(), 105, NOW),
            Err(BidError::IncrementTooSmall { increment: 10, next: 110 })
        );
        let third = auction.place_bid(bob(), 115, NOW).unwrap();
        assert_eq!(third.previous_bidder, Some(alice()));
        assert_eq!(third.previous_bid, 100);
        assert_eq!(auction.current_bid, 115);
        assert_eq!(auction.highest_bidder, Some(bob()));
    }

    #[test]
    fn durations_are_capped() {
        let open = |duration_mins| {
            Auction::open(
                NewAuction {
                    id: "1".into(),
                    guild_id: GuildId::new(1),
                    channel_id: ChannelId::new(2),
                    item: "Rookie Card".into(),
                    duration_mins,
                    min_bid: 1,
                    min_increment: 1,
                    buyout: None,
                    created_by: UserId::new(99),
                },
                NOW,
            )
        };
        assert_eq!(open(i64::MAX / 2), Err(AuctionError::DurationTooLong));
        assert_eq!(open(MAX_DURATION_MINS + 1), Err(AuctionError::DurationTooLong));
        assert_eq!(open(MAX_DURATION_MINS).unwrap().end_time, NOW + MAX_DURATION_MINS * 60);
    }

    #[test]
    fn huge_increment_saturates_instead_of_overflowing() {
        let mut auction = auction(5, i64::MAX, None);
        assert_eq!(auction.next_valid_bid(), 5);
        auction.place_bid(alice(), 5, NOW).unwrap();
        assert_eq!(auction.next_valid_bid(), i64::MAX);
        assert_eq!(
            auction.place_bid(bob(), 1_000, NOW),
            Err(BidError::IncrementTooSmall {
                increment: i64::MAX,
                next: i64::MAX
            })
        );
        assert_eq!(auction.current_bid, 5);
    }

    #[test]
    fn bid_equal_to_current_is_rejected() {
        let mut auction = auction(10, 1, None);
        auction.place_bid(alice(), 50, NOW).unwrap();
        assert_eq!(
            auction.place_bid(bob(), 50, NOW),
            Err(BidError::NotHigher { current: 50 })
        );
        assert_eq!(auction.highest_bidder, Some(alice()));
    }

    #[test]
    fn bid_below_minimum_is_rejected() {
        let mut auction = auction(100, 1, None);
        assert_eq!(
            auction.place_bid(alice(), 99, NOW),
            Err(BidError::BelowMinimum { min_bid: 100 })
        );
        assert_eq!(auction.current_bid, 0);
    }

    #[test]
    fn buyout_sells_immediately() {
        let mut auction = auction(10, 1, Some(500));
        let receipt = auction.place_bid(alice(), 600, NOW).unwrap();
        assert!(receipt.sold);
        assert_eq!(auction.status, AuctionStatus::Sold);
        assert_eq!(
            auction.place_bid(bob(), 700, NOW),
            Err(BidError::NotActive(AuctionStatus::Sold))
        );
    }

    #[test]
    fn late_bids_extend_by_exactly_sixty_seconds() {
        let mut auction = auction(10, 1, None);
        let end = auction.end_time;

        let early = auction.place_bid(alice(), 10, end - 61).unwrap();
        assert!(!early.extended);
        assert_eq!(auction.end_time, end);

        let late = auction.place_bid(bob(), 11, end - 30).unwrap();
        assert!(late.extended);
        assert_eq!(auction.end_time, end + 60);

        // Repeatable.
        let again = auction.place_bid(alice(), 12, end + 59).unwrap();
        assert!(again.extended);
        assert_eq!(auction.end_time, end + 120);
    }

    #[test]
    fn bids_at_the_end_time_are_closed() {
        let mut auction = auction(10, 1, None);
        let end = auction.end_time;
        assert_eq!(auction.place_bid(alice(), 10, end), Err(BidError::Closed));
    }

    #[test]
    fn timer_ends_or_expires_depending_on_bids() {
        let mut quiet = auction(10, 1, None);
        assert_eq!(quiet.expire_if_due(quiet.end_time - 1), None);
        assert_eq!(quiet.expire_if_due(quiet.end_time), Some(AuctionStatus::Expired));

        let mut busy = auction(10, 1, None);
        busy.place_bid(alice(), 10, NOW).unwrap();
        assert_eq!(busy.expire_if_due(busy.end_time + 5), Some(AuctionStatus::Ended));
    }

    #[test]
    fn terminal_states_are_sticky() {
        let mut cancelled = auction(10, 1, None);
        cancelled.cancel().unwrap();
        assert_eq!(cancelled.end(), Err(AuctionError::AlreadyFinished(AuctionStatus::Cancelled)));
        assert_eq!(cancelled.cancel(), Err(AuctionError::AlreadyFinished(AuctionStatus::Cancelled)));
        assert_eq!(cancelled.expire_if_due(i64::MAX), None);
        assert!(cancelled.place_bid(alice(), 10, NOW).is_err());
        assert_eq!(cancelled.status, AuctionStatus::Cancelled);

        let mut ended = auction(10, 1, None);
        ended.place_bid(alice(), 10, NOW).unwrap();
        assert_eq!(ended.end(), Ok(AuctionStatus::Ended));
        assert!(ended.cancel().is_err());
        assert_eq!(ended.status, AuctionStatus::Ended);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let params = NewAuction {
            id: "x".into(),
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(1),
            item: "Card".into(),
            duration_mins: 0,
            min_bid: 10,
            min_increment: 1,
            buyout: None,
            created_by: UserId::new(1),
        };
        assert_eq!(Auction::open(params.clone(), NOW), Err(AuctionError::InvalidDuration));
        assert_eq!(
            Auction::open(
                NewAuction {
                    duration_mins: 5,
                    buyout: Some(5),
                    ..params
                },
                NOW
            ),
            Err(AuctionError::InvalidBuyout)
        );
    }

    #[test]
    fn status_round_trips_through_storage_text() {
        for status in [
            AuctionStatus::Active,
            AuctionStatus::Sold,
            AuctionStatus::Ended,
            AuctionStatus::Expired,
            AuctionStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<AuctionStatus>().unwrap(), status);
        }
        assert!("paused".parse::<AuctionStatus>().is_err());
    }
}
