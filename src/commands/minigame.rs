use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    Context, Error,
    games::{
        minigames::{generate, random_kind, run_challenge},
        round::SerenityChannel,
    },
    infrastructure::{sessions::GameKind, util::reply_ephemeral},
    record_ctx_fields,
};

/// Start a random high-speed minigame!
#[poise::command(slash_command, prefix_command, guild_only, category = "Games")]
pub async fn mg(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let Ok(mut session) = ctx
        .data()
        .sessions
        .try_begin(ctx.channel_id(), GameKind::Minigame)
    else {
        return reply_ephemeral(ctx, "Wait for the current game to finish!").await;
    };

    let challenge = {
        let mut rng = StdRng::from_os_rng();
        let kind = random_kind(&mut rng);
        generate(kind, &mut rng)
    };
    if let poise::Context::Application(_) = ctx {
        ctx.say("🎮 Minigame incoming!").await?;
    }

    let mut channel = SerenityChannel::new(ctx.serenity_context(), ctx.channel_id());
    let answered = run_challenge(&mut channel, &mut session, challenge).await?;
    info!(answered, "Minigame finished");
    Ok(())
}
