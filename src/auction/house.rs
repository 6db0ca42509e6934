/*!

Auction house operations.

Every change to an auction runs under the guild lock: the auction is re-read, the ladder applies the change, and the
result is written back before the lock is released. Discord side effects are left to the caller.

*/

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use sea_orm::DbErr;
use tracing::info;

use crate::{
    auction::{
        ladder::{Auction, AuctionError, Bid, BidError, BidReceipt, NewAuction},
        repository::{self, AuctionSettings},
    },
    infrastructure::guild_store::GuildStore,
};

#[derive(Debug, thiserror::Error)]
pub enum HouseError {
    #[error("Auction log channel not set. Use `/auctionset channel` first.")]
    NoLogChannel,
    #[error("There is already an active auction in this channel.")]
    ChannelBusy,
    #[error("There is no active auction in this channel.")]
    NoAuction,
    #[error(transparent)]
    Bid(#[from] BidError),
    #[error(transparent)]
    Auction(#[from] AuctionError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl HouseError {
    /// Errors caused by the user's input rather than the bot.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, HouseError::Database(_))
    }
}

/// What a caller provides to open an auction; the id and increment are filled in here.
#[derive(Debug, Clone)]
pub struct Listing {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub item: String,
    pub duration_mins: i64,
    pub min_bid: i64,
    pub buyout: Option<i64>,
    pub created_by: UserId,
}

fn new_auction_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Opens an auction in the listing's channel.
pub async fn start(store: &GuildStore, listing: Listing, now: i64) -> Result<(Auction, AuctionSettings), HouseError> {
    let _guard = store.lock(listing.guild_id).await;
    let settings: AuctionSettings = store.get(listing.guild_id).await?;
    if settings.log_channel.is_none() {
        return Err(HouseError::NoLogChannel);
    }
    if repository::active_in_channel(store.db(), listing.guild_id, listing.channel_id)
        .await?
        .is_some()
    {
        return Err(HouseError::ChannelBusy);
    }

    let auction = Auction::open(
        NewAuction {
            id: new_auction_id(),
            guild_id: listing.guild_id,
            channel_id: listing.channel_id,
            item: listing.item,
            duration_mins: listing.duration_mins,
            min_bid: listing.min_bid,
            min_increment: settings.min_increment,
            buyout: listing.buyout,
            created_by: listing.created_by,
        },
        now,
    )?;
    repository::insert(store.db(), &auction).await?;
    info!(auction = %auction.id, guild = %auction.guild_id, item = %auction.item, "Auction started");
    Ok((auction, settings))
}

/// Remembers the message showing the auction so it can be re-rendered. `auction` is refreshed from the stored row,
/// which may have taken bids since it was started.
pub async fn attach_message(store: &GuildStore, auction: &mut Auction, message_id: MessageId) -> Result<(), DbErr> {
    let _guard = store.lock(auction.guild_id).await;
    let mut stored = repository::find(store.db(), &auction.id)
        .await?
        .unwrap_or_else(|| auction.clone());
    stored.message_id = Some(message_id);
    repository::save(store.db(), &stored).await?;
    *auction = stored;
    Ok(())
}

/// Places a bid on the channel's active auction and appends it to the history.
pub async fn bid(
    store: &GuildStore,
    guild_id: GuildId,
    channel_id: ChannelId,
    bidder: UserId,
    amount: i64,
    now: i64,
) -> Result<(Auction, BidReceipt), HouseError> {
    let _guard = store.lock(guild_id).await;
    let mut auction = repository::active_in_channel(store.db(), guild_id, channel_id)
        .await?
        .ok_or(HouseError::NoAuction)?;
    let receipt = auction.place_bid(bidder, amount, now)?;
    repository::save(store.db(), &auction).await?;
    repository::record_bid(
        store.db(),
        &auction.id,
        &Bid {
            user_id: bidder,
            amount,
            placed_at: now,
        },
    )
    .await?;
    info!(auction = %auction.id, bidder = %bidder, amount, sold = receipt.sold, "Bid accepted");
    Ok((auction, receipt))
}

/// Ends the channel's auction now: ended with a winner, expired without one.
pub async fn end(store: &GuildStore, guild_id: GuildId, channel_id: ChannelId) -> Result<Auction, HouseError> {
    close(store, guild_id, channel_id, |auction| auction.end().map(|_| ())).await
}

pub async fn cancel(store: &GuildStore, guild_id: GuildId, channel_id: ChannelId) -> Result<Auction, HouseError> {
    close(store, guild_id, channel_id, Auction::cancel).await
}

async fn close<F>(store: &GuildStore, guild_id: GuildId, channel_id: ChannelId, f: F) -> Result<Auction, HouseError>
where
    F: FnOnce(&mut Auction) -> Result<(), AuctionError>,
{
    let _guard = store.lock(guild_id).await;
    let mut auction = repository::active_in_channel(store.db(), guild_id, channel_id)
        .await?
        .ok_or(HouseError::NoAuction)?;
    f(&mut auction)?;
    repository::save(store.db(), &auction).await?;
    info!(auction = %auction.id, status = %auction.status, "Auction closed manually");
    Ok(auction)
}
