use poise::{
    CreateReply,
    serenity_prelude::{CreateAllowedMentions, CreateEmbed, User},
};

use super::{find_player, players_ready, reject};
use crate::{
    Context, Error,
    fantasy::{
        repository,
        trade::{self, Trade},
    },
    infrastructure::{
        colors,
        ids::{mention_user, require_guild_id},
        util::unix_now,
    },
    record_ctx_fields,
};

fn player_name(ctx: Context<'_>, player_id: i64) -> String {
    ctx.data()
        .players
        .get(player_id)
        .map(|p| p.name)
        .unwrap_or_else(|| format!("Player {}", player_id))
}

fn trade_line(ctx: Context<'_>, trade: &Trade) -> String {
    format!(
        "`{}` {} gives **{}** to {} for **{}**",
        trade.id,
        mention_user(trade.proposer),
        player_name(ctx, trade.offered_player),
        mention_user(trade.target),
        player_name(ctx, trade.requested_player)
    )
}

/// One-for-one player trades between managers.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("propose", "accept", "decline", "cancel", "list"),
    subcommand_required,
    guild_only
)]
pub async fn trade(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Offer one of your players for one of theirs.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn propose(
    ctx: Context<'_>,
    #[description = "Manager to trade with"] member: User,
    #[description = "Your player to give"] give: String,
    #[description = "Their player to get"] get: String,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    if !players_ready(ctx).await? {
        return Ok(());
    }
    let Some(give) = find_player(ctx, &give).await? else {
        return Ok(());
    };
    let Some(get) = find_player(ctx, &get).await? else {
        return Ok(());
    };

    let proposed = trade::propose(
        &ctx.data().guild_store,
        guild_id,
        ctx.author().id,
        member.id,
        &give,
        &get,
        unix_now(),
    )
    .await;
    let proposed = match proposed {
        Ok(proposed) => proposed,
        Err(e) => return reject(ctx, e).await,
    };
    ctx.send(
        CreateReply::default()
            .content(format!(
                "🤝 {}, you have a trade offer!\n{}\nUse `/fantasy trade accept {}` or `/fantasy trade decline {}`.",
                mention_user(proposed.target),
                trade_line(ctx, &proposed),
                proposed.id,
                proposed.id
            ))
            .allowed_mentions(CreateAllowedMentions::new().users(vec![proposed.target])),
    )
    .await?;
    Ok(())
}

/// Accept a trade offered to you.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn accept(ctx: Context<'_>, #[description = "Trade ID"] id: String) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    if !players_ready(ctx).await? {
        return Ok(());
    }
    let data = ctx.data();
    match trade::accept(&data.guild_store, &data.players, guild_id, ctx.author().id, id.trim(), unix_now()).await {
        Ok(done) => {
            ctx.say(format!("✅ Trade complete! {}", trade_line(ctx, &done)))
                .await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Decline a trade offered to you.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn decline(ctx: Context<'_>, #[description = "Trade ID"] id: String) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match trade::decline(&ctx.data().guild_store, guild_id, ctx.author().id, id.trim(), unix_now()).await {
        Ok(declined) => {
            ctx.say(format!(
                "❌ {} declined trade `{}`.",
                mention_user(declined.target),
                declined.id
            ))
            .await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Withdraw a trade you proposed.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn cancel(ctx: Context<'_>, #[description = "Trade ID"] id: String) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match trade::cancel(&ctx.data().guild_store, guild_id, ctx.author().id, id.trim(), unix_now()).await {
        Ok(cancelled) => {
            ctx.say(format!("Trade `{}` was cancelled.", cancelled.id)).await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Your pending trades.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let pending = repository::pending_trades_for(&ctx.data().db_pool, guild_id, ctx.author().id).await?;
    if pending.is_empty() {
        ctx.say("You have no pending trades.").await?;
        return Ok(());
    }
    let description = pending
        .iter()
        .map(|t| trade_line(ctx, t))
        .collect::<Vec<_>>()
        .join("\n");
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("Pending Trades")
                .description(description)
                .colour(colors::blue()),
        ),
    )
    .await?;
    Ok(())
}
