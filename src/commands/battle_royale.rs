use std::{
    future::IntoFuture,
    time::{Duration, Instant},
};

use poise::{
    CreateReply,
    serenity_prelude::{
        ButtonStyle, ComponentInteractionCollector, CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter,
        CreateInteractionResponse, CreateInteractionResponseMessage, ReactionType,
    },
};
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    Context, Error,
    games::{
        elimination::{DEATH_MESSAGES, EliminationOutcome, Lobby, Participant, run_elimination},
        round::SerenityChannel,
    },
    infrastructure::{
        colors,
        ids::mention_user,
        sessions::GameKind,
        util::{display_name, reply_ephemeral},
    },
    record_ctx_fields,
};

const LOBBY_TIME: Duration = Duration::from_secs(60);
const ELIMINATION_INTERVAL: Duration = Duration::from_secs(4);

fn lobby_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("☠️ BATTLE ROYALE LOBBY OPEN ☠️")
        .description("Click the button below to join the slaughter. You have 60 seconds.")
        .colour(colors::dark_red())
        .footer(CreateEmbedFooter::new("May the odds be never in your favor."))
}

fn join_button(custom_id: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(custom_id)
            .label("Join Match")
            .style(ButtonStyle::Danger)
            .emoji(ReactionType::Unicode("💀".into())),
    ])
}

/// Battle royale commands.
#[poise::command(
    slash_command,
    prefix_command,
    subcommands("start", "stop"),
    subcommand_required,
    guild_only,
    category = "Games"
)]
pub async fn br(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Open the lobby for 60 seconds, then let the carnage begin.
#[poise::command(slash_command, prefix_command, owners_only, guild_only)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let mut session = match ctx
        .data()
        .sessions
        .try_begin(ctx.channel_id(), GameKind::BattleRoyale)
    {
        Ok(session) => session,
        Err(busy) => return reply_ephemeral(ctx, busy.to_string()).await,
    };

    let join_id = format!("br-join-{}", ctx.id());
    let handle = ctx
        .send(
            CreateReply::default()
                .embed(lobby_embed())
                .components(vec![join_button(&join_id)]),
        )
        .await?;
    let lobby_message = handle.message().await?.id;

    let mut lobby = Lobby::default();
    let deadline = Instant::now() + LOBBY_TIME;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let filter_id = join_id.clone();
        let collector = ComponentInteractionCollector::new(ctx.serenity_context())
            .message_id(lobby_message)
            .timeout(remaining)
            .filter(move |press| press.data.custom_id == filter_id);
        let press = tokio::select! {
            press = collector.into_future() => press,
            _ = session.stopped() => None,
        };
        let Some(press) = press else {
            break;
        };

        let name = press
            .member
            .as_ref()
            .map(|m| m.display_name().to_string())
            .unwrap_or_else(|| display_name(&press.user));
        let response = if lobby.join(Participant {
            user_id: press.user.id,
            name: name.clone(),
        }) {
            CreateInteractionResponseMessage::new().content(format!("✅ {} has joined the slaughter!", name))
        } else {
            CreateInteractionResponseMessage::new()
                .content("You're already in the death pit!")
                .ephemeral(true)
        };
        press
            .create_response(ctx.serenity_context(), CreateInteractionResponse::Message(response))
            .await?;
    }

    handle
        .edit(ctx, CreateReply::default().embed(lobby_embed()).components(vec![]))
        .await?;
    if session.is_stopped() {
        return Ok(());
    }
    if lobby.len() < 2 {
        ctx.say("Not enough victims joined. Match cancelled.").await?;
        return Ok(());
    }

    info!(players = lobby.len(), "Battle royale starting");
    ctx.say("🩸 **The gates are locked. Let the carnage begin!**")
        .await?;
    let mut channel = SerenityChannel::new(ctx.serenity_context(), ctx.channel_id());
    let mut rng = StdRng::from_os_rng();
    let outcome = run_elimination(
        &mut channel,
        &mut session,
        lobby.into_players(),
        DEATH_MESSAGES,
        ELIMINATION_INTERVAL,
        &mut rng,
    )
    .await?;

    if let EliminationOutcome::Winner { survivor, eliminations } = outcome {
        info!(winner = %survivor.user_id, eliminations, "Battle royale finished");
        ctx.send(
            CreateReply::default().embed(
                CreateEmbed::new()
                    .title("🏆 SOLE SURVIVOR 🏆")
                    .description(format!(
                        "{} crawled out of the pile of corpses victorious!",
                        mention_user(survivor.user_id)
                    ))
                    .colour(colors::gold()),
            ),
        )
        .await?;
    }
    Ok(())
}

/// Force stop the match in this channel.
#[poise::command(slash_command, prefix_command, owners_only, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let sessions = &ctx.data().sessions;
    if sessions.running(ctx.channel_id()) != Some(GameKind::BattleRoyale) {
        return reply_ephemeral(ctx, "There is no battle royale running in this channel.").await;
    }
    sessions.stop(ctx.channel_id());
    ctx.say("🛑 The simulation has been terminated.").await?;
    Ok(())
}
