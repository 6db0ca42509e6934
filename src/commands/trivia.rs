use std::sync::Arc;

use poise::{CreateReply, serenity_prelude::CreateEmbed};
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use crate::{
    Context, Error,
    games::{
        f1::{self, F1DriverSource, WikipediaImages},
        leaderboard::{self, F1_QUIZ},
        nba::{self, PlayerSource, TeamSource},
        round::SerenityChannel,
        trivia::{EndReason, QuestionSource, TriviaOutcome, TriviaRules, run_trivia, standings_embed},
    },
    infrastructure::{
        colors,
        ids::mention_user,
        sessions::{GameKind, Session},
        util::reply_ephemeral,
    },
    record_ctx_fields,
};

const LEADERBOARD_SIZE: u64 = 10;

/// Claims the channel, or tells the invoker what is already running there.
async fn begin(ctx: Context<'_>, kind: GameKind) -> Result<Option<Session>, Error> {
    match ctx.data().sessions.try_begin(ctx.channel_id(), kind) {
        Ok(session) => Ok(Some(session)),
        Err(busy) => {
            reply_ephemeral(ctx, busy.to_string()).await?;
            Ok(None)
        }
    }
}

async fn play<Q: QuestionSource>(
    ctx: Context<'_>,
    session: &mut Session,
    source: &mut Q,
    rules: TriviaRules,
) -> Result<TriviaOutcome, Error> {
    let mut channel = SerenityChannel::new(ctx.serenity_context(), ctx.channel_id());
    let outcome = run_trivia(&mut channel, session, source, rules).await?;
    info!(
        kind = %session.kind(),
        reason = ?outcome.reason,
        rounds = outcome.rounds_played,
        "Trivia finished"
    );
    Ok(outcome)
}

/// F1 driver trivia.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("start", "stop", "leaderboard"),
    subcommand_required,
    guild_only,
    category = "Games"
)]
pub async fn f1quiz(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start a game: identify the driver in the photo.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let Some(mut session) = begin(ctx, GameKind::F1Quiz).await? else {
        return Ok(());
    };

    ctx.say(
        "🏎️ **Starting F1 Drivers Trivia!**\nIdentify the driver in the photo. First to 10 points or 30 rounds wins.\nYou have 15 seconds per round.",
    )
    .await?;

    let data = ctx.data();
    let mut source = F1DriverSource::new(
        WikipediaImages::new(data.http_client.clone()),
        Arc::clone(&data.f1_drivers),
        StdRng::from_os_rng(),
    );
    let outcome = play(ctx, &mut session, &mut source, f1::RULES).await?;

    if let Some(winner) = outcome.winner() {
        if let Err(e) = leaderboard::record_win(&data.db_pool, F1_QUIZ, winner.user_id).await {
            warn!(user = %winner.user_id, "Failed to record F1 quiz win: {}", e);
        }
    }
    if outcome.reason == EndReason::RoundLimit {
        let text = match outcome.winner() {
            Some(winner) => format!(
                "🏁 **Game Over!** Winner: {} with {} points!",
                mention_user(winner.user_id),
                winner.score
            ),
            None => "🏁 **Game Over!** No points scored.".to_string(),
        };
        ctx.say(text).await?;
    }
    Ok(())
}

/// Stop the quiz running in this channel.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let sessions = &ctx.data().sessions;
    if sessions.running(ctx.channel_id()) == Some(GameKind::F1Quiz) {
        sessions.stop(ctx.channel_id());
        ctx.say("🛑 **Stopping F1 Quiz...**").await?;
    } else {
        ctx.say("No game running.").await?;
    }
    Ok(())
}

/// Show the global top 10 players.
#[poise::command(slash_command, prefix_command)]
pub async fn leaderboard(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let rows = leaderboard::top(&ctx.data().db_pool, F1_QUIZ, LEADERBOARD_SIZE).await?;
    if rows.is_empty() {
        ctx.say("Leaderboard is empty.").await?;
        return Ok(());
    }

    let description = rows
        .iter()
        .enumerate()
        .map(|(i, row)| format!("**{}.** {}: {} wins", i + 1, mention_user(row.user_id), row.wins))
        .collect::<Vec<_>>()
        .join("\n");
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("🏎️ F1 Trivia Leaderboard")
                .description(description)
                .colour(colors::red()),
        ),
    )
    .await?;
    Ok(())
}

async fn report_final_scores(ctx: Context<'_>, outcome: &TriviaOutcome) -> Result<(), Error> {
    match standings_embed("Final Scores", outcome) {
        Some(embed) => {
            ctx.send(CreateReply::default().embed(embed)).await?;
        }
        None => {
            ctx.say("Game Over! No points scored.").await?;
        }
    }
    Ok(())
}

/// Name the NBA team from its logo.
#[poise::command(slash_command, prefix_command, guild_only, category = "Games")]
pub async fn teamtrivia(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let Some(mut session) = begin(ctx, GameKind::TeamTrivia).await? else {
        return Ok(());
    };
    ctx.say(format!(
        "Starting Team Trivia! First to {} points or {} rounds wins!",
        nba::RULES.winning_score,
        nba::RULES.max_rounds
    ))
    .await?;

    let mut source = TeamSource::new(StdRng::from_os_rng());
    let outcome = play(ctx, &mut session, &mut source, nba::RULES).await?;
    report_final_scores(ctx, &outcome).await
}

/// Name the NBA player from their headshot.
#[poise::command(slash_command, prefix_command, guild_only, category = "Games")]
pub async fn playertrivia(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let Some(mut session) = begin(ctx, GameKind::PlayerTrivia).await? else {
        return Ok(());
    };
    ctx.say(format!(
        "Starting Player Trivia! First to {} points or {} rounds wins!",
        nba::RULES.winning_score,
        nba::RULES.max_rounds
    ))
    .await?;

    let players = Arc::new(ctx.data().players.trivia_players());
    let mut source = PlayerSource::new(players, StdRng::from_os_rng());
    let outcome = play(ctx, &mut session, &mut source, nba::RULES).await?;
    report_final_scores(ctx, &outcome).await
}
