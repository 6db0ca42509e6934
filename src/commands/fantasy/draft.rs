use poise::{CreateReply, serenity_prelude::CreateEmbed};
use rand::{SeedableRng, rngs::StdRng};

use super::{find_player, players_ready, reject};
use crate::{
    Context, Error,
    fantasy::{
        draft::{self, BOARD_SIZE, PickOutcome, Turn},
        repository,
    },
    infrastructure::{
        colors,
        ids::{mention_user, require_guild_id},
        util::unix_now,
    },
    record_ctx_fields,
};

fn clock_line(next: Option<Turn>) -> String {
    match next {
        Some(turn) => format!(
            "⏰ {} is on the clock! (Round {}, Pick {})",
            mention_user(turn.user_id),
            turn.round,
            turn.pick_number
        ),
        None => "🏁 The draft is complete!".to_string(),
    }
}

fn outcome_text(outcome: &PickOutcome) -> String {
    let pick = &outcome.pick;
    let action = match pick.player_id {
        Some(_) => format!("selects **{}**!", pick.player_name),
        None => "was skipped.".to_string(),
    };
    format!(
        "✅ **Pick {}** (Round {}): {} {}\n{}",
        pick.pick_number,
        pick.round,
        mention_user(pick.user_id),
        action,
        clock_line(outcome.next)
    )
}

/// Live snake draft.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("start", "pick", "board", "skip", "stop"),
    subcommand_required,
    guild_only
)]
pub async fn draft(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start a snake draft in this channel.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let mut rng = StdRng::from_os_rng();
    let started = draft::start(&ctx.data().guild_store, guild_id, ctx.channel_id(), &mut rng).await;
    let started = match started {
        Ok(started) => started,
        Err(e) => return reject(ctx, e).await,
    };
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("🏀 The Draft Is On")
                .description(format!(
                    "{} rounds, snake order.\n\n{}\n\n{}",
                    started.rounds,
                    started.order_text(),
                    clock_line(started.on_the_clock())
                ))
                .colour(colors::orange()),
        ),
    )
    .await?;
    Ok(())
}

/// Draft a player when you are on the clock.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn pick(
    ctx: Context<'_>,
    #[description = "The name of the NBA player"]
    #[rest]
    name: String,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    if !players_ready(ctx).await? {
        return Ok(());
    }
    let Some(player) = find_player(ctx, &name).await? else {
        return Ok(());
    };
    let data = ctx.data();
    match draft::pick(
        &data.guild_store,
        &data.players,
        guild_id,
        ctx.channel_id(),
        ctx.author().id,
        &player,
        unix_now(),
    )
    .await
    {
        Ok(outcome) => {
            ctx.say(outcome_text(&outcome)).await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Show the most recent picks.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn board(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let db = &ctx.data().db_pool;
    let (picks, total) = repository::latest_draft_picks(db, guild_id, BOARD_SIZE).await?;
    if picks.is_empty() {
        ctx.say("No picks have been made yet.").await?;
        return Ok(());
    }

    let mut description = picks
        .iter()
        .map(|p| {
            format!(
                "`#{:>3}` R{} {} - {}",
                p.pick_number,
                p.round,
                mention_user(p.user_id),
                p.player_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    if let Some(current) = repository::find_draft(db, guild_id).await? {
        description.push_str("\n\n");
        description.push_str(&clock_line(current.on_the_clock()));
    }
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title(format!("📋 Draft Board ({} picks)", total))
                .description(description)
                .colour(colors::orange()),
        ),
    )
    .await?;
    Ok(())
}

/// Skip the manager on the clock.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match draft::skip(&ctx.data().guild_store, guild_id, ctx.channel_id(), unix_now()).await {
        Ok(outcome) => {
            ctx.say(outcome_text(&outcome)).await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// End the draft early.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match draft::stop(&ctx.data().guild_store, guild_id).await {
        Ok(()) => {
            ctx.say("🛑 The draft has been stopped. Free agency rules apply from here.")
                .await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}
