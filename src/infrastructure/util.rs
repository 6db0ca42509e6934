use poise::{CreateReply, serenity_prelude::User};
use tokio::sync::watch;

use crate::{Context as CourtsideContext, Error};

/// Creates a lazily initialized static regex variable with a constant regex expression.
#[macro_export]
macro_rules! lazy_regex {
    ($name:ident, $value:expr) => {
        static $name: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($value).expect("Regex contains body"));
    };
}

/// Records who invoked a command and where, at debug level.
#[macro_export]
macro_rules! record_ctx_fields {
    ($ctx:expr) => {
        tracing::debug!(
            command = %$ctx.command().qualified_name,
            guild = ?$ctx.guild_id(),
            channel = %$ctx.channel_id(),
            author = %$ctx.author().name,
            "Command invoked"
        );
    };
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Nickname if the user object carries member data, otherwise their display name.
pub fn display_name(user: &User) -> String {
    user.member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or(user.display_name().to_string())
}

/// Sends a short ephemeral reply; used for rejected user input.
pub async fn reply_ephemeral(ctx: CourtsideContext<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Resolves once the shutdown flag is raised. A dropped sender counts as shutdown.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn shutdown_resolves_on_flag_or_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { shutdown_requested(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();

        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .unwrap();
    }
}
