use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

use crate::{
    auction::ladder::{Auction, AuctionStatus, Bid},
    infrastructure::{colors, ids::mention_user},
};

fn status_colour(status: AuctionStatus) -> Colour {
    match status {
        AuctionStatus::Active => colors::green(),
        AuctionStatus::Sold => colors::gold(),
        AuctionStatus::Ended | AuctionStatus::Expired | AuctionStatus::Cancelled => colors::red(),
    }
}

/// The embed posted when an auction starts and edited after every change. `recent` is newest first.
pub fn auction_embed(auction: &Auction, recent: &[Bid]) -> CreateEmbed {
    let current = if auction.current_bid > 0 {
        format!("`{}`", auction.current_bid)
    } else {
        format!("Min: `{}`", auction.min_bid)
    };
    let bidder = auction
        .highest_bidder
        .map(mention_user)
        .unwrap_or_else(|| "None".to_string());

    let mut embed = CreateEmbed::new()
        .title(format!("📦 Auction: {}", auction.item))
        .colour(status_colour(auction.status))
        .field("Current Bid", current, true)
        .field("Highest Bidder", bidder, true);

    if let Some(buyout) = auction.buyout {
        embed = embed.field("Buyout", format!("`{}`", buyout), true);
    }

    if auction.status == AuctionStatus::Active {
        embed = embed
            .field("Next Bid", format!("`{}`", auction.next_valid_bid()), true)
            .field("Ends", format!("<t:{}:R>", auction.end_time), true);
        if !recent.is_empty() {
            let history = recent
                .iter()
                .take(3)
                .map(|bid| format!("{}: `{}`", mention_user(bid.user_id), bid.amount))
                .collect::<Vec<_>>()
                .join("\n");
            embed = embed.field("Recent Bids", history, false);
        }
        embed.footer(CreateEmbedFooter::new("Use /bid <amount> to participate"))
    } else {
        embed = embed.field(
            "Status",
            format!("**{}**", auction.status.as_str().to_uppercase()),
            false,
        );
        match auction.highest_bidder {
            Some(winner) if auction.status != AuctionStatus::Cancelled => embed.description(format!(
                "Winner: {} for `{}`",
                mention_user(winner),
                auction.current_bid
            )),
            _ => embed,
        }
    }
}

/// One line per auction for `auction list`.
pub fn list_line(auction: &Auction) -> String {
    let price = if auction.current_bid > 0 {
        format!("`{}`", auction.current_bid)
    } else {
        format!("min `{}`", auction.min_bid)
    };
    format!(
        "**{}** in <#{}> | {} | ends <t:{}:R>",
        auction.item, auction.channel_id, price, auction.end_time
    )
}

/// Text posted in the auction channel once an auction closes.
pub fn closing_announcement(auction: &Auction) -> String {
    match (auction.status, auction.highest_bidder) {
        (AuctionStatus::Sold, Some(winner)) => format!(
            "🔥 **BUYOUT!** {} has bought **{}** for `{}`!",
            mention_user(winner),
            auction.item,
            auction.current_bid
        ),
        (AuctionStatus::Ended, Some(winner)) => format!(
            "🏁 The auction for **{}** has ended! Winner: {} for `{}`!",
            auction.item,
            mention_user(winner),
            auction.current_bid
        ),
        (AuctionStatus::Cancelled, _) => format!("🛑 The auction for **{}** was cancelled.", auction.item),
        _ => format!("❌ The auction for **{}** has expired with no bids.", auction.item),
    }
}

/// Text posted in the log channel once an auction closes.
pub fn closing_log(auction: &Auction) -> String {
    match (auction.status, auction.highest_bidder) {
        (AuctionStatus::Cancelled, _) => format!("🛑 **Auction Cancelled**\nItem: {}", auction.item),
        (AuctionStatus::Sold | AuctionStatus::Ended, Some(winner)) => format!(
            "🏁 **Auction {}**\nItem: {}\nWinner: {}\nFinal Price: `{}`",
            if auction.status == AuctionStatus::Sold { "Sold" } else { "Ended" },
            auction.item,
            mention_user(winner),
            auction.current_bid
        ),
        _ => format!("❌ **Auction Expired**\nItem: {}\nReason: No bids placed.", auction.item),
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, GuildId, UserId};

    use super::*;
    use crate::auction::ladder::NewAuction;

    fn auction() -> Auction {
        Auction::open(
            NewAuction {
                id: "1".into(),
                guild_id: GuildId::new(1),
                channel_id: ChannelId::new(9),
                item: "Signed Ball".into(),
                duration_mins: 1,
                min_bid: 10,
                min_increment: 1,
                buyout: None,
                created_by: UserId::new(1),
            },
            0,
        )
        .unwrap()
    }

    #[test]
    fn announcements_follow_the_final_state() {
        let mut expired = auction();
        expired.end().unwrap();
        assert!(closing_announcement(&expired).contains("expired with no bids"));
        assert!(closing_log(&expired).starts_with("❌ **Auction Expired**"));

        let mut ended = auction();
        ended.place_bid(UserId::new(5), 20, 1).unwrap();
        ended.end().unwrap();
        assert_eq!(
            closing_announcement(&ended),
            "🏁 The auction for **Signed Ball** has ended! Winner: <@5> for `20`!"
        );

        let mut cancelled = auction();
        cancelled.place_bid(UserId::new(5), 20, 1).unwrap();
        cancelled.cancel().unwrap();
        assert!(closing_log(&cancelled).contains("Cancelled"));
    }

    #[test]
    fn list_line_shows_minimum_before_bids() {
        assert_eq!(list_line(&auction()), "**Signed Ball** in <#9> | min `10` | ends <t:60:R>");
    }
}
