use std::sync::Arc;

use poise::{
    CreateReply,
    serenity_prelude::{
        ChannelId, CreateAllowedMentions, CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage, EditRole,
        GuildChannel, ReactionType,
    },
};
use tracing::{debug, info, warn};

use crate::{
    Context, Error,
    auction::{
        embed::{auction_embed, list_line},
        house::{self, HouseError, Listing},
        ladder::Auction,
        repository::{self, AuctionSettings},
        timer::announce_close,
    },
    infrastructure::{
        colors,
        ids::{mention_user, require_guild_id},
        util::{reply_ephemeral, unix_now},
    },
    record_ctx_fields,
};

const PING_ROLE_NAME: &str = "Auction Ping";

/// Replies with a rejected request, or hands bot-side failures to the framework.
async fn reply_house_error(ctx: Context<'_>, error: HouseError) -> Result<(), Error> {
    if error.is_user_error() {
        reply_ephemeral(ctx, format!("❌ {}", error)).await
    } else {
        Err(error.into())
    }
}

/// Re-renders the auction message after a change.
async fn refresh_message(ctx: Context<'_>, auction: &Auction) -> Result<(), Error> {
    let Some(message_id) = auction.message_id else {
        return Ok(());
    };
    let recent = repository::recent_bids(&ctx.data().db_pool, &auction.id, 3).await?;
    if let Err(e) = auction
        .channel_id
        .edit_message(ctx, message_id, EditMessage::new().embed(auction_embed(auction, &recent)))
        .await
    {
        debug!(auction = %auction.id, "Could not update auction message: {}", e);
    }
    Ok(())
}

/// Settings for the auction house.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("channel", "increment", "pingrole", "removepingrole"),
    subcommand_required,
    guild_only,
    category = "Auction"
)]
pub async fn auctionset(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Set the logging channel for auctions.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Channel that receives auction logs"] channel: GuildChannel,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    ctx.data()
        .guild_store
        .update(guild_id, |settings: &mut AuctionSettings| {
            settings.log_channel = Some(channel.id)
        })
        .await?;
    ctx.say(format!("✅ Auction logging channel set to <#{}>", channel.id))
        .await?;
    Ok(())
}

/// Set the minimum raise between bids.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn increment(
    ctx: Context<'_>,
    #[description = "Minimum raise"]
    #[min = 1]
    amount: i64,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    if amount < 1 {
        return reply_ephemeral(ctx, "❌ The increment must be at least 1.").await;
    }
    let guild_id = require_guild_id(ctx)?;
    ctx.data()
        .guild_store
        .update(guild_id, |settings: &mut AuctionSettings| {
            settings.min_increment = amount
        })
        .await?;
    ctx.say(format!("✅ Minimum bid increment set to `{}`.", amount))
        .await?;
    Ok(())
}

/// Create a role that is pinged when an auction starts.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn pingrole(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let store = &ctx.data().guild_store;
    let settings: AuctionSettings = store.get(guild_id).await?;
    if let Some(role) = settings.ping_role {
        return reply_ephemeral(ctx, format!("❌ The ping role <@&{}> already exists.", role)).await;
    }

    let role = guild_id
        .create_role(ctx, EditRole::new().name(PING_ROLE_NAME).mentionable(true))
        .await?;
    store
        .update(guild_id, |settings: &mut AuctionSettings| {
            settings.ping_role = Some(role.id)
        })
        .await?;
    info!(guild = %guild_id, role = %role.id, "Created auction ping role");
    ctx.say(format!(
        "✅ Created <@&{}>. Members can use `/auction notify` to opt in.",
        role.id
    ))
    .await?;
    Ok(())
}

/// Delete the auction ping role.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn removepingrole(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let removed = ctx
        .data()
        .guild_store
        .update(guild_id, |settings: &mut AuctionSettings| settings.ping_role.take())
        .await?;
    let Some(role) = removed else {
        return reply_ephemeral(ctx, "❌ No ping role is configured.").await;
    };
    if let Err(e) = guild_id.delete_role(ctx, role).await {
        warn!(guild = %guild_id, role = %role, "Failed to delete auction ping role: {}", e);
    }
    ctx.say("✅ Auction ping role removed.").await?;
    Ok(())
}

/// Auction management commands.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("start", "end", "cancel", "info", "list", "notify"),
    subcommand_required,
    guild_only,
    category = "Auction"
)]
pub async fn auction(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start a new auction in this channel.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_MESSAGES",
    default_member_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn start(
    ctx: Context<'_>,
    #[description = "What is being sold"] item: String,
    #[description = "Duration in minutes"]
    #[min = 1]
    #[max = 43200]
    duration_mins: i64,
    #[description = "Minimum first bid"] min_bid: i64,
    #[description = "Price that ends the auction at once"] buyout: Option<i64>,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let data = ctx.data();
    let listing = Listing {
        guild_id,
        channel_id: ctx.channel_id(),
        item,
        duration_mins,
        min_bid,
        buyout,
        created_by: ctx.author().id,
    };
    let (mut auction, settings) = match house::start(&data.guild_store, listing, unix_now()).await {
        Ok(started) => started,
        Err(e) => return reply_house_error(ctx, e).await,
    };

    let mut reply = CreateReply::default().embed(auction_embed(&auction, &[]));
    if let Some(role) = settings.ping_role {
        reply = reply
            .content(format!("<@&{}> A new auction has started!", role))
            .allowed_mentions(CreateAllowedMentions::new().roles(vec![role]));
    }
    let handle = ctx.send(reply).await?;
    let message_id = handle.message().await?.id;
    house::attach_message(&data.guild_store, &mut auction, message_id).await?;
    data.auction_timers
        .spawn(Arc::clone(&ctx.serenity_context().http), auction.id.clone());

    if let Some(log_channel) = settings.log_channel {
        let mut log = CreateEmbed::new()
            .title("🚀 Auction Started")
            .colour(colors::blue())
            .field("Item", auction.item.clone(), true)
            .field("Duration", format!("{}m", duration_mins), true)
            .field("Min Bid", format!("`{}`", auction.min_bid), true);
        if let Some(buyout) = auction.buyout {
            log = log.field("Buyout", format!("`{}`", buyout), true);
        }
        log = log.footer(CreateEmbedFooter::new(format!(
            "Started by {} | ID: {}",
            ctx.author().name,
            auction.id
        )));
        if let Err(e) = log_channel.send_message(ctx, CreateMessage::new().embed(log)).await {
            warn!(guild = %guild_id, channel = %log_channel, "Failed to post auction log: {}", e);
        }
    }
    Ok(())
}

/// End the auction in this channel now.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_MESSAGES",
    default_member_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn end(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match house::end(&ctx.data().guild_store, guild_id, ctx.channel_id()).await {
        Ok(auction) => finish(ctx, &auction, "✅ Auction ended.").await,
        Err(e) => reply_house_error(ctx, e).await,
    }
}

/// Cancel the auction in this channel without a winner.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_MESSAGES",
    default_member_permissions = "MANAGE_MESSAGES",
    guild_only
)]
pub async fn cancel(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match house::cancel(&ctx.data().guild_store, guild_id, ctx.channel_id()).await {
        Ok(auction) => finish(ctx, &auction, "✅ Auction cancelled.").await,
        Err(e) => reply_house_error(ctx, e).await,
    }
}

async fn finish(ctx: Context<'_>, auction: &Auction, ack: &str) -> Result<(), Error> {
    reply_ephemeral(ctx, ack).await?;
    announce_close(ctx.http(), &ctx.data().guild_store, auction).await
}

/// Show the auction running in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let db = &ctx.data().db_pool;
    let Some(auction) = repository::active_in_channel(db, guild_id, ctx.channel_id()).await? else {
        return reply_ephemeral(ctx, "❌ There is no active auction in this channel.").await;
    };
    let recent = repository::recent_bids(db, &auction.id, 3).await?;
    ctx.send(CreateReply::default().embed(auction_embed(&auction, &recent)))
        .await?;
    Ok(())
}

/// List the active auctions of this server.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let active = repository::active_in_guild(&ctx.data().db_pool, guild_id).await?;
    if active.is_empty() {
        ctx.say("There are no active auctions.").await?;
        return Ok(());
    }
    let description = active.iter().map(list_line).collect::<Vec<_>>().join("\n");
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("📦 Active Auctions")
                .description(description)
                .colour(colors::blue()),
        ),
    )
    .await?;
    Ok(())
}

/// Toggle the auction ping role on yourself.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn notify(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let settings: AuctionSettings = ctx.data().guild_store.get(guild_id).await?;
    let Some(role) = settings.ping_role else {
        return reply_ephemeral(ctx, "❌ This server has no auction ping role.").await;
    };
    let user_id = ctx.author().id;
    let has_role = ctx
        .author_member()
        .await
        .is_some_and(|member| member.roles.contains(&role));

    if has_role {
        ctx.http()
            .remove_member_role(guild_id, user_id, role, Some("Auction notifications off"))
            .await?;
        reply_ephemeral(ctx, "🔕 You will no longer be pinged for auctions.").await
    } else {
        ctx.http()
            .add_member_role(guild_id, user_id, role, Some("Auction notifications on"))
            .await?;
        reply_ephemeral(ctx, "🔔 You will be pinged when an auction starts.").await
    }
}

async fn post_log(ctx: Context<'_>, log_channel: Option<ChannelId>, text: String) {
    if let Some(log_channel) = log_channel {
        if let Err(e) = log_channel.say(ctx, text).await {
            warn!(channel = %log_channel, "Failed to post auction log: {}", e);
        }
    }
}

/// Place a bid on the active auction in this channel.
#[poise::command(slash_command, prefix_command, guild_only, category = "Auction")]
pub async fn bid(ctx: Context<'_>, #[description = "Your bid"] amount: i64) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let data = ctx.data();
    let bidder = ctx.author().id;
    let (auction, receipt) =
        match house::bid(&data.guild_store, guild_id, ctx.channel_id(), bidder, amount, unix_now()).await {
            Ok(accepted) => accepted,
            Err(e) => return reply_house_error(ctx, e).await,
        };

    if receipt.extended {
        ctx.say("⏱️ **Anti-snipe!** Auction extended by 60s.").await?;
    }
    refresh_message(ctx, &auction).await?;

    if let Some(previous) = receipt.previous_bidder.filter(|previous| *previous != bidder) {
        let dm = CreateMessage::new().content(format!(
            "You've been outbid on **{}**! The new bid is `{}` in <#{}>.",
            auction.item, amount, auction.channel_id
        ));
        if let Err(e) = previous.direct_message(ctx, dm).await {
            debug!(user = %previous, "Could not send outbid notice: {}", e);
        }
    }

    let settings: AuctionSettings = data.guild_store.get(guild_id).await?;
    post_log(
        ctx,
        settings.log_channel,
        format!(
            "💰 **New Bid** | **{}** | {} bid `{}`",
            auction.item,
            mention_user(bidder),
            amount
        ),
    )
    .await;

    if receipt.sold {
        reply_ephemeral(ctx, format!("✅ Bid of `{}` placed.", amount)).await?;
        return announce_close(ctx.http(), &data.guild_store, &auction).await;
    }
    match ctx {
        poise::Context::Prefix(prefix) => {
            prefix
                .msg
                .react(ctx, ReactionType::Unicode("✅".into()))
                .await?;
        }
        poise::Context::Application(_) => {
            reply_ephemeral(ctx, format!("✅ Bid of `{}` placed.", amount)).await?;
        }
    }
    Ok(())
}
