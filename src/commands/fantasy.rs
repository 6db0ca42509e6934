pub mod draft;
pub mod trade;

use std::{
    future::IntoFuture,
    time::{Duration, Instant},
};

use poise::{
    CreateReply, ReplyHandle,
    serenity_prelude::{
        ComponentInteraction, ComponentInteractionCollector, ComponentInteractionDataKind, CreateActionRow,
        CreateEmbed, CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseMessage,
        CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption, MessageCollector, User,
    },
};
use tracing::{info, warn};

use crate::{
    Context, Error,
    fantasy::{
        draft::DraftError,
        league::{self, RosterError, TeamView},
        repository::{self, LeagueSettings},
        scoring::{ScoringWeights, round1},
        slots::{format_slots, parse_slots},
        stats::{CacheStatus, NbaPlayer, NbaStatsApi, RETRY_DELAY, configured_season, refresh_now},
        trade::TradeError,
    },
    infrastructure::{
        colors,
        ids::{mention_user, require_guild_id},
        util::{display_name, reply_ephemeral, unix_now},
    },
    record_ctx_fields,
};

const MENU_TIMEOUT: Duration = Duration::from_secs(120);
const RESET_TIMEOUT: Duration = Duration::from_secs(30);
const FREE_AGENT_FIELDS: usize = 10;
/// Discord's limit on select menu options.
const MENU_OPTIONS: usize = 25;

/// A domain error that is either the user's fault or the bot's.
trait Rejection: std::error::Error + Send + Sync + 'static {
    fn is_bot_fault(&self) -> bool;
}

impl Rejection for RosterError {
    fn is_bot_fault(&self) -> bool {
        matches!(self, RosterError::Database(_))
    }
}

impl Rejection for DraftError {
    fn is_bot_fault(&self) -> bool {
        matches!(self, DraftError::Database(_) | DraftError::Roster(RosterError::Database(_)))
    }
}

impl Rejection for TradeError {
    fn is_bot_fault(&self) -> bool {
        matches!(self, TradeError::Database(_) | TradeError::Roster(RosterError::Database(_)))
    }
}

/// Tells the user why their request was refused; bot-side failures go to the framework instead.
async fn reject<E: Rejection>(ctx: Context<'_>, error: E) -> Result<(), Error> {
    if error.is_bot_fault() {
        return Err(error.into());
    }
    reply_ephemeral(ctx, error.to_string()).await
}

/// Whether the player cache can serve the command. Explains the outage otherwise.
async fn players_ready(ctx: Context<'_>) -> Result<bool, Error> {
    match ctx.data().players.status() {
        CacheStatus::Ready(_) => Ok(true),
        CacheStatus::Updating => {
            ctx.say("Player data is currently updating. Please try again later.")
                .await?;
            Ok(false)
        }
        CacheStatus::Failed(error) => {
            ctx.say(format!(
                "❌ **NBA API Error:** The bot could not fetch player stats.\n`{}`\n\nThe bot owner can try `/fantasy update`.",
                error
            ))
            .await?;
            Ok(false)
        }
    }
}

/// Best match for a typed player name.
async fn find_player(ctx: Context<'_>, query: &str) -> Result<Option<NbaPlayer>, Error> {
    match ctx.data().players.search(query, 1).into_iter().next() {
        Some(player) => Ok(Some(player)),
        None => {
            reply_ephemeral(ctx, format!("Could not find player `{}`.", query)).await?;
            Ok(None)
        }
    }
}

async fn settings(ctx: Context<'_>) -> Result<LeagueSettings, Error> {
    let guild_id = require_guild_id(ctx)?;
    Ok(ctx.data().guild_store.get(guild_id).await?)
}

fn player_menu(custom_id: &str, placeholder: &str, options: Vec<CreateSelectMenuOption>) -> CreateActionRow {
    CreateActionRow::SelectMenu(
        CreateSelectMenu::new(custom_id, CreateSelectMenuKind::String { options }).placeholder(placeholder),
    )
}

/// Waits for the invoker to pick an option from the menu on `handle`. Other users are turned away.
async fn await_menu_choice(
    ctx: Context<'_>,
    handle: &ReplyHandle<'_>,
    custom_id: &str,
) -> Result<Option<(ComponentInteraction, i64)>, Error> {
    let message_id = handle.message().await?.id;
    let deadline = Instant::now() + MENU_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        let filter_id = custom_id.to_string();
        let Some(choice) = ComponentInteractionCollector::new(ctx.serenity_context())
            .message_id(message_id)
            .timeout(remaining)
            .filter(move |press| press.data.custom_id == filter_id)
            .into_future()
            .await
        else {
            return Ok(None);
        };

        if choice.user.id != ctx.author().id {
            respond_ephemeral(ctx, &choice, "Not your menu.").await?;
            continue;
        }
        let selected = match &choice.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => {
                values.first().and_then(|v| v.parse::<i64>().ok())
            }
            _ => None,
        };
        if let Some(player_id) = selected {
            return Ok(Some((choice, player_id)));
        }
    }
}

async fn respond_ephemeral(ctx: Context<'_>, press: &ComponentInteraction, content: impl Into<String>) -> Result<(), Error> {
    press
        .create_response(
            ctx.serenity_context(),
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// Removes the menu once it has been used or has timed out.
async fn close_menu(ctx: Context<'_>, handle: &ReplyHandle<'_>, embed: CreateEmbed) {
    if let Err(e) = handle
        .edit(ctx, CreateReply::default().embed(embed).components(vec![]))
        .await
    {
        warn!("Failed to remove menu: {}", e);
    }
}

/// NBA fantasy league commands.
#[poise::command(
    slash_command,
    prefix_command,
    aliases("nbafantasy", "nbaf"),
    subcommands(
        "setup",
        "join",
        "team",
        "freeagents",
        "standings",
        "lock",
        "unlock",
        "remove",
        "reset",
        "update",
        "slots",
        "scoring",
        "player",
        "draft::draft",
        "trade::trade"
    ),
    subcommand_required,
    guild_only,
    category = "Fantasy"
)]
pub async fn fantasy(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Enable the fantasy league for this server.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    if league::setup(&ctx.data().guild_store, guild_id).await? {
        info!(guild = %guild_id, "Fantasy league enabled");
        ctx.say("🏀 NBA Fantasy has been enabled for this server! Users can now `/fantasy join`.")
            .await?;
    } else {
        ctx.say("NBA Fantasy is already enabled for this server.").await?;
    }
    Ok(())
}

/// Join the fantasy league.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn join(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    match league::join(&ctx.data().guild_store, guild_id, ctx.author().id, unix_now()).await {
        Ok(()) => {
            ctx.say(
                "🎉 You have successfully joined the fantasy league! Use `/fantasy freeagents` to pick up players.",
            )
            .await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

fn team_embed(owner: &str, view: &TeamView, own_team: bool) -> CreateEmbed {
    let mut description = format!("**Total Team FP:** {}", view.total);
    if view.lines.is_empty() {
        description.push_str("\n\nThis team is empty! Use `/fantasy freeagents` to pick up players.");
    } else {
        let line = |index: usize| {
            let roster_line = &view.lines[index];
            let team = roster_line.player.as_ref().map(|p| p.team.as_str()).unwrap_or("?");
            format!(
                "{} ({}) | Earned FP: {}",
                roster_line.name(),
                team,
                round1(roster_line.earned)
            )
        };
        description.push_str("\n\n");
        for (slot, seated) in &view.lineup.slots {
            let holder = seated.map(line).unwrap_or_else(|| "*(empty)*".to_string());
            description.push_str(&format!("`{:<4}` {}\n", slot.as_str(), holder));
        }
        if !view.lineup.bench.is_empty() {
            description.push_str("\n**Bench**\n");
            for &index in &view.lineup.bench {
                description.push_str(&format!("{}\n", line(index)));
            }
        }
        if own_team {
            description.push_str("\n*Use the dropdown below to drop a player.*");
        }
    }
    CreateEmbed::new()
        .title(format!("{}'s Fantasy Team", owner))
        .description(description)
        .colour(colors::orange())
}

/// View your team or another member's team.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn team(
    ctx: Context<'_>,
    #[description = "Whose team to show (default: yours)"] member: Option<User>,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let data = ctx.data();
    let own_team = member.as_ref().is_none_or(|m| m.id == ctx.author().id);
    let target = member.unwrap_or_else(|| ctx.author().clone());
    let target_name = display_name(&target);

    let settings = settings(ctx).await?;
    let Some(view) = league::team(&data.db_pool, &settings, &data.players, guild_id, target.id).await? else {
        let text = if own_team {
            RosterError::NotMember.to_string()
        } else {
            format!("{} hasn't joined the league yet.", target_name)
        };
        return reply_ephemeral(ctx, text).await;
    };
    if !players_ready(ctx).await? {
        return Ok(());
    }

    let embed = team_embed(&target_name, &view, own_team);
    if !own_team || view.lines.is_empty() {
        ctx.send(CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let menu_id = format!("fantasy-drop-{}", ctx.id());
    let options = view
        .lines
        .iter()
        .take(MENU_OPTIONS)
        .map(|line| {
            let team = line.player.as_ref().map(|p| p.team.as_str()).unwrap_or("?");
            CreateSelectMenuOption::new(line.name(), line.entry.player_id.to_string())
                .description(format!("{} - Earned FP: {}", team, round1(line.earned)))
        })
        .collect();
    let handle = ctx
        .send(
            CreateReply::default()
                .embed(embed.clone())
                .components(vec![player_menu(&menu_id, "Select a player to DROP...", options)]),
        )
        .await?;

    if let Some((choice, player_id)) = await_menu_choice(ctx, &handle, &menu_id).await? {
        match league::drop_player(&data.guild_store, &data.players, guild_id, ctx.author().id, player_id).await {
            Ok(banked) => {
                respond_ephemeral(
                    ctx,
                    &choice,
                    format!("Player dropped successfully. {} FP banked.", round1(banked)),
                )
                .await?
            }
            Err(RosterError::Database(e)) => return Err(e.into()),
            Err(e) => respond_ephemeral(ctx, &choice, e.to_string()).await?,
        }
    }
    close_menu(ctx, &handle, embed).await;
    Ok(())
}

/// Browse and pick up available free agents.
#[poise::command(slash_command, prefix_command, aliases("fa"), guild_only)]
pub async fn freeagents(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let data = ctx.data();
    let settings = settings(ctx).await?;
    if !settings.active {
        return reject(ctx, RosterError::NotActive).await;
    }
    if settings.fa_locked {
        return reject(ctx, RosterError::Locked).await;
    }
    if repository::find_member(&data.db_pool, guild_id, ctx.author().id)
        .await?
        .is_none()
    {
        return reject(ctx, RosterError::NotMember).await;
    }
    if !players_ready(ctx).await? {
        return Ok(());
    }

    let available = league::free_agents(&data.db_pool, &settings, &data.players, guild_id, MENU_OPTIONS).await?;
    if available.is_empty() {
        ctx.say("No free agents available.").await?;
        return Ok(());
    }

    let mut embed = CreateEmbed::new()
        .title("Top Available Free Agents")
        .description(
            "Select a player from the dropdown to add to your team.\nPlayers are sorted by Total Season FP.",
        )
        .colour(colors::blue());
    for player in available.iter().take(FREE_AGENT_FIELDS) {
        embed = embed.field(
            player.name.clone(),
            format!(
                "{} {} | FP: {} | PTS: {}",
                player.team,
                player.position.as_str(),
                player.fantasy_points(&settings.weights),
                player.stats.pts
            ),
            true,
        );
    }
    let options = available
        .iter()
        .map(|player| {
            CreateSelectMenuOption::new(player.name.clone(), player.id.to_string()).description(format!(
                "{} - Total Season FP: {}",
                player.team,
                player.fantasy_points(&settings.weights)
            ))
        })
        .collect();
    let menu_id = format!("fantasy-add-{}", ctx.id());
    let handle = ctx
        .send(
            CreateReply::default()
                .embed(embed.clone())
                .components(vec![player_menu(&menu_id, "Select a player to ADD...", options)]),
        )
        .await?;

    if let Some((choice, player_id)) = await_menu_choice(ctx, &handle, &menu_id).await? {
        let Some(player) = data.players.get(player_id) else {
            respond_ephemeral(ctx, &choice, "Player not found in cache. Please try again later.").await?;
            close_menu(ctx, &handle, embed).await;
            return Ok(());
        };
        match league::add_player(&data.guild_store, &data.players, guild_id, ctx.author().id, &player, unix_now()).await {
            Ok(_) => {
                respond_ephemeral(ctx, &choice, format!("**{}** added to your team successfully!", player.name))
                    .await?
            }
            Err(RosterError::Database(e)) => return Err(e.into()),
            Err(e) => respond_ephemeral(ctx, &choice, e.to_string()).await?,
        }
    }
    close_menu(ctx, &handle, embed).await;
    Ok(())
}

/// View the league standings.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn standings(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let data = ctx.data();
    let settings = settings(ctx).await?;
    let table = league::standings(&data.db_pool, &settings, &data.players, guild_id).await?;
    if table.is_empty() {
        ctx.say("No one has joined the league yet.").await?;
        return Ok(());
    }
    if !players_ready(ctx).await? {
        return Ok(());
    }

    let description = table
        .iter()
        .enumerate()
        .map(|(i, standing)| {
            let mvp = standing
                .mvp
                .as_ref()
                .map(|(name, earned)| format!("\n*MVP: {} (+{} FP)*", name, round1(*earned)))
                .unwrap_or_default();
            format!(
                "**{}.** {}: **{}** Fantasy Points{}",
                i + 1,
                mention_user(standing.user_id),
                standing.total,
                mvp
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("🏆 NBA Fantasy Standings")
                .description(description)
                .colour(colors::gold()),
        ),
    )
    .await?;
    Ok(())
}

/// Lock free agency.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn lock(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    league::set_locked(&ctx.data().guild_store, guild_id, true).await?;
    ctx.say("🔒 Free Agency has been locked. Players can no longer be picked up.")
        .await?;
    Ok(())
}

/// Unlock free agency.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn unlock(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    league::set_locked(&ctx.data().guild_store, guild_id, false).await?;
    ctx.say("🔓 Free Agency has been unlocked. Players can now be picked up.")
        .await?;
    Ok(())
}

/// Remove a member and release their players.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn remove(ctx: Context<'_>, #[description = "Member to remove"] member: User) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let name = display_name(&member);
    if league::remove_member(&ctx.data().guild_store, guild_id, member.id).await? {
        ctx.say(format!("🗑️ Successfully removed **{}** from the fantasy league.", name))
            .await?;
    } else {
        reply_ephemeral(ctx, format!("{} is not in the fantasy league.", name)).await?;
    }
    Ok(())
}

/// Wipe every roster and score in this server.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn reset(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    ctx.say(
        "⚠️ Are you sure you want to completely wipe all rosters and scores for this server? Type `yes` to confirm.",
    )
    .await?;

    let answer = MessageCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .channel_id(ctx.channel_id())
        .timeout(RESET_TIMEOUT)
        .await;
    let Some(answer) = answer else {
        ctx.say("Reset cancelled due to timeout.").await?;
        return Ok(());
    };
    if !answer.content.trim().eq_ignore_ascii_case("yes") {
        ctx.say("Reset cancelled.").await?;
        return Ok(());
    }

    league::reset(&ctx.data().guild_store, guild_id).await?;
    info!(guild = %guild_id, "Fantasy league reset");
    ctx.say("🔄 The fantasy league has been completely reset. All teams and scores are wiped.")
        .await?;
    Ok(())
}

/// Force a refresh of the NBA player stats.
#[poise::command(slash_command, prefix_command, owners_only)]
pub async fn update(ctx: Context<'_>) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let data = ctx.data();
    ctx.say("Fetching latest stats from NBA API... This may take a moment.")
        .await?;
    let provider = NbaStatsApi::new(data.http_client.clone(), configured_season());
    match refresh_now(&provider, &data.players, &data.db_pool, RETRY_DELAY).await {
        Ok(count) => {
            ctx.say(format!("✅ Successfully updated stats for {} players!", count))
                .await?;
        }
        Err(e) => {
            warn!("Manual stats refresh failed: {}", e);
            ctx.say(format!("❌ Failed to update stats: ```{}```", e)).await?;
        }
    }
    Ok(())
}

/// Show or change the roster slots, e.g. `PG, SG, SF, PF, C, G, F, UTIL`.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn slots(
    ctx: Context<'_>,
    #[description = "Comma separated slot list"]
    #[rest]
    list: Option<String>,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let Some(list) = list else {
        let settings = settings(ctx).await?;
        ctx.say(format!("Roster slots: `{}`", format_slots(&settings.slots)))
            .await?;
        return Ok(());
    };
    let slots = match parse_slots(&list) {
        Ok(slots) => slots,
        Err(e) => return reply_ephemeral(ctx, e.to_string()).await,
    };
    let text = format_slots(&slots);
    match league::set_slots(&ctx.data().guild_store, &ctx.data().players, guild_id, slots).await {
        Ok(()) => {
            ctx.say(format!("✅ Roster slots set to `{}`.", text)).await?;
            Ok(())
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Show or change the scoring weights.
#[poise::command(
    slash_command,
    prefix_command,
    required_permissions = "MANAGE_GUILD",
    default_member_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn scoring(
    ctx: Context<'_>,
    #[description = "Points per point"] pts: Option<f64>,
    #[description = "Points per rebound"] reb: Option<f64>,
    #[description = "Points per assist"] ast: Option<f64>,
    #[description = "Points per steal"] stl: Option<f64>,
    #[description = "Points per block"] blk: Option<f64>,
    #[description = "Points per turnover"] tov: Option<f64>,
) -> Result<(), Error> {
    record_ctx_fields!(ctx);
    let guild_id = require_guild_id(ctx)?;
    let current = settings(ctx).await?.weights;
    if [pts, reb, ast, stl, blk, tov].iter().all(Option::is_none) {
        ctx.say(format!("Scoring: {}", current.describe())).await?;
        return Ok(());
    }
    if [pts, reb, ast, stl, blk, tov].iter().flatten().any(|w| !w.is_finite()) {
        return reply_ephemeral(ctx, "Weights must be finite numbers.").await;
    }

    let weights = ScoringWeights {
        pts: pts.unwrap_or(current.pts),
        reb: reb.unwrap_or(current.reb),
        ast: ast.unwrap_or(current.ast),
        stl: stl.unwrap_or(current.stl),
        blk: blk.unwrap_or(current.blk),
        tov: tov.unwrap_or(current.tov),
    };
    league::set_weights(&ctx.data().guild_store, &ctx.data().players, guild_id, weights).await?;
    ctx.say(format!(
        "✅ Scoring updated: {}\nPoints already earned were banked.",
        weights.describe()
    ))
    .await?;
    Ok(())
}

/// Look up a player and where they play in this league.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn player(
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
    let data = ctx.data();
    let matches = data.players.search(&name, 5);
    let Some(found) = matches.first() else {
        return reply_ephemeral(ctx, format!("Could not find player `{}`.", name)).await;
    };

    let settings = settings(ctx).await?;
    let status = match repository::owner_of(&data.db_pool, guild_id, found.id).await? {
        Some(entry) => format!("Owned by {}", mention_user(entry.user_id)),
        None => "Free Agent".to_string(),
    };
    let stats = &found.stats;
    let mut embed = CreateEmbed::new()
        .title(found.name.clone())
        .colour(colors::orange())
        .field("Team", found.team.clone(), true)
        .field("Position", found.position.as_str(), true)
        .field("Games", found.games_played.to_string(), true)
        .field(
            "Season Totals",
            format!(
                "PTS {} · REB {} · AST {} · STL {} · BLK {} · TOV {}",
                stats.pts, stats.reb, stats.ast, stats.stl, stats.blk, stats.tov
            ),
            false,
        )
        .field("Season FP", found.fantasy_points(&settings.weights).to_string(), true)
        .field("Status", status, true);
    if matches.len() > 1 {
        let others = matches[1..]
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        embed = embed.footer(CreateEmbedFooter::new(format!("Other matches: {}", others)));
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
