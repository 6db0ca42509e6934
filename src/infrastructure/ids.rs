use std::num::ParseIntError;

use poise::serenity_prelude::GuildId;
use tracing::trace;

use crate::{Context, Error};

pub fn require_guild_id(ctx: Context<'_>) -> Result<GuildId, Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This function is only available in guilds")?;
    trace!("Found guild_id={:?}", guild_id);
    Ok(guild_id)
}

pub fn id_to_string<T>(value: T) -> String
where
    T: Into<u64>,
{
    let int: u64 = value.into();
    int.to_string()
}

pub fn id_from_string<T>(value: &str) -> Result<T, ParseIntError>
where
    T: From<u64>,
{
    value.parse::<u64>().map(|int| T::from(int))
}

/// Formats a user mention from a raw id, for places where only the id was stored.
pub fn mention_user(user_id: impl Into<u64>) -> String {
    format!("<@{}>", user_id.into())
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, UserId};

    use super::*;

    #[test]
    fn ids_survive_string_storage() {
        let stored = id_to_string(ChannelId::new(802308677737381948));
        assert_eq!(stored, "802308677737381948");
        let parsed: ChannelId = id_from_string(&stored).unwrap();
        assert_eq!(parsed, ChannelId::new(802308677737381948));
    }

    #[test]
    fn rejects_garbage_ids() {
        assert!(id_from_string::<UserId>("not-a-snowflake").is_err());
    }

    #[test]
    fn mentions_users_by_id() {
        assert_eq!(mention_user(UserId::new(42)), "<@42>");
    }
}
