use poise::samples::HelpConfiguration;

use crate::{Context, Error};

const HELP_FOOTER: &str = "\
Games run one at a time per channel. Fantasy and auction state is kept per server.
Type `!help <command>` or `/help <command>` for details on a command.";

/// Registers/unregisters commands for this guild or all guilds.
#[poise::command(slash_command, prefix_command, aliases("refresh"), owners_only, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}

/// Lists the games, auctions and fantasy commands, or explains one of them.
#[poise::command(slash_command, prefix_command, track_edits, track_deletion, hide_in_help)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to explain"]
    #[rest]
    command: Option<String>,
) -> Result<(), Error> {
    let config = HelpConfiguration {
        extra_text_at_bottom: HELP_FOOTER,
        ephemeral: true,
        show_subcommands: true,
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), config).await?;
    Ok(())
}
