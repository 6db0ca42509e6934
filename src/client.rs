use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use courtside::{
    commands::{auction, battle_royale, builtins, fantasy, minigame, trivia},
    games::f1::load_drivers,
    infrastructure::{
        botdata::Data,
        environment::{self, env_var_with_context, get_data_directory},
        http::build_client,
    },
};
use poise::serenity_prelude::{self as serenity, GatewayIntents, UserId};
use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub async fn create_serenity_client(
    db: DatabaseConnection,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<serenity::Client> {
    let token = env_var_with_context(environment::DISCORD_TOKEN)?;
    let intents = serenity::GatewayIntents::non_privileged().union(GatewayIntents::MESSAGE_CONTENT);
    let framework = create_poise_framework(db, shutdown);

    serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Failed to create serenity client")
}

fn create_poise_framework(
    pool: DatabaseConnection,
    shutdown: watch::Receiver<bool>,
) -> poise::Framework<Data, courtside::Error> {
    let (initialize_owners, owners) = match try_get_owners_env() {
        Ok(owners) => (false, HashSet::from_iter(owners)),
        Err(error) => {
            if let OwnerParseError::UserIdParseError(e) = error {
                warn!("Invalid UserId in {}: {}", environment::OWNERS, e);
            }
            (true, HashSet::new())
        }
    };
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: get_enabled_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("!".into()),
                mention_as_prefix: true,
                edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(Duration::from_secs(3600)))),
                ..Default::default()
            },
            initialize_owners,
            owners,
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Executing Command: {:?} for {} ({})",
                        ctx.command().qualified_name,
                        ctx.author().display_name(),
                        ctx.author().name,
                    );

                    if let Ok(mut invoc_time) = ctx.data().invoc_time.write() {
                        invoc_time.insert(ctx.id(), Instant::now());
                    }
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    if let Ok(mut invoc_time_map) = ctx.data().invoc_time.write() {
                        match invoc_time_map.remove(&ctx.id()) {
                            Some(start_time) => {
                                debug!(
                                    "Command {} finished in {:?}",
                                    ctx.command().qualified_name,
                                    start_time.elapsed()
                                );
                            }
                            None => {
                                error!("Post-command hook called for command without a start-time set.");
                            }
                        }
                    }
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    if let poise::FrameworkError::Command { error, ctx, .. } = &error {
                        error!(command = %ctx.command().qualified_name, "Command failed: {}", error);
                    }
                    if let Err(e) = poise::builtins::on_error(error).await {
                        error!("{:?}", e);
                    }
                })
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(courtside::infrastructure::event_handler::event_handler(
                    ctx, event, framework, data,
                ))
            },
            ..Default::default()
        })
        .setup(|_ctx, _ready, _framework| {
            Box::pin(async move {
                let drivers = load_drivers(&get_data_directory());
                info!(drivers = drivers.len(), "Loaded F1 driver list");
                Ok(Data::new(pool, build_client()?, drivers, shutdown))
            })
        })
        .build();

    for cmd in framework.options().commands.iter() {
        info!("Loaded command: {:#?}", cmd.name);
    }

    framework
}

fn get_enabled_commands() -> Vec<poise::Command<Data, courtside::Error>> {
    let default_commands = vec![
        builtins::help(),
        builtins::register(),
        battle_royale::br(),
        trivia::f1quiz(),
        trivia::teamtrivia(),
        trivia::playertrivia(),
        minigame::mg(),
        auction::auctionset(),
        auction::auction(),
        auction::bid(),
        fantasy::fantasy(),
    ];
    let disable_list = std::env::var(environment::COMMAND_DISABLE_LIST).unwrap_or_default();
    filter_disabled(default_commands, &disable_list)
}

/// Drops every top-level command named in the comma separated `disable_list`, ignoring case.
fn filter_disabled<U, E>(commands: Vec<poise::Command<U, E>>, disable_list: &str) -> Vec<poise::Command<U, E>> {
    let disabled: HashSet<String> = disable_list
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    let unknown: Vec<&String> = disabled
        .iter()
        .filter(|name| !commands.iter().any(|cmd| cmd.name.to_lowercase() == **name))
        .collect();
    if !unknown.is_empty() {
        warn!("Unknown commands in {}: {:?}", environment::COMMAND_DISABLE_LIST, unknown);
    }
    if disabled.is_empty() {
        info!("Loading default commands");
    } else {
        info!("Disabled commands: {:?}", disabled);
    }

    commands
        .into_iter()
        .filter(|cmd| !disabled.contains(&cmd.name.to_lowercase()))
        .collect()
}

enum OwnerParseError {
    MissingEnvVar,
    UserIdParseError(String),
}

fn parse_owners(value: &str) -> Result<Vec<UserId>, OwnerParseError> {
    value
        .split(',')
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(UserId::new)
                .map_err(|e| OwnerParseError::UserIdParseError(e.to_string()))
        })
        .collect()
}

fn try_get_owners_env() -> Result<Vec<UserId>, OwnerParseError> {
    let env_var = std::env::var(environment::OWNERS).map_err(|_| OwnerParseError::MissingEnvVar)?;
    parse_owners(&env_var)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_list_is_case_insensitive() {
        let names: Vec<String> = filter_disabled(sample_commands(), " BR,Mg ,nope")
            .into_iter()
            .map(|cmd| cmd.name)
            .collect();
        assert!(!names.contains(&"br".to_string()));
        assert!(!names.contains(&"mg".to_string()));
        assert!(names.contains(&"fantasy".to_string()));
    }

    fn sample_commands() -> Vec<poise::Command<Data, courtside::Error>> {
        vec![battle_royale::br(), minigame::mg(), fantasy::fantasy()]
    }

    #[test]
    fn owners_parse_or_report_the_bad_id() {
        assert!(matches!(parse_owners("1, 2").as_deref(), Ok([a, b]) if a.get() == 1 && b.get() == 2));
        assert!(matches!(parse_owners("1,abc"), Err(OwnerParseError::UserIdParseError(_))));
    }
}
