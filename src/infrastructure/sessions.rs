/*!

Per-channel game sessions.

A [`Session`] is owned by the task running a game in a channel. While it is alive no other game can start in that
channel, and dropping it frees the channel again, whether the game finished, was stopped, or failed.

*/

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use poise::serenity_prelude::ChannelId;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    BattleRoyale,
    F1Quiz,
    TeamTrivia,
    PlayerTrivia,
    Minigame,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameKind::BattleRoyale => "battle royale",
            GameKind::F1Quiz => "F1 quiz",
            GameKind::TeamTrivia => "team trivia",
            GameKind::PlayerTrivia => "player trivia",
            GameKind::Minigame => "minigame",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("A {0} game is already running in this channel!")]
pub struct SessionBusy(pub GameKind);

struct Entry {
    id: u64,
    kind: GameKind,
    stop: watch::Sender<bool>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<ChannelId, Entry>,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SessionRegistry {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims `channel` for a game of `kind`.
    pub fn try_begin(&self, channel: ChannelId, kind: GameKind) -> Result<Session, SessionBusy> {
        let mut registry = self.registry();
        if let Some(entry) = registry.entries.get(&channel) {
            return Err(SessionBusy(entry.kind));
        }
        registry.next_id += 1;
        let id = registry.next_id;
        let (stop, stopped) = watch::channel(false);
        registry.entries.insert(channel, Entry { id, kind, stop });
        debug!(channel = %channel, kind = %kind, "Session started");

        Ok(Session {
            registry: self.clone(),
            channel,
            id,
            kind,
            stopped,
        })
    }

    /// Asks the game running in `channel` to stop. Returns the kind of game that was signalled.
    pub fn stop(&self, channel: ChannelId) -> Option<GameKind> {
        let registry = self.registry();
        let entry = registry.entries.get(&channel)?;
        entry.stop.send_replace(true);
        Some(entry.kind)
    }

    pub fn running(&self, channel: ChannelId) -> Option<GameKind> {
        self.registry().entries.get(&channel).map(|e| e.kind)
    }
}

pub struct Session {
    registry: SessionRegistry,
    channel: ChannelId,
    id: u64,
    kind: GameKind,
    stopped: watch::Receiver<bool>,
}

impl Session {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolves once the session has been asked to stop.
    pub async fn stopped(&mut self) {
        if self.stopped.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let mut registry = self.registry.registry();
        if registry
            .entries
            .get(&self.channel)
            .is_some_and(|entry| entry.id == self.id)
        {
            registry.entries.remove(&self.channel);
            debug!(channel = %self.channel, kind = %self.kind, "Session ended");
        }
    }
}
