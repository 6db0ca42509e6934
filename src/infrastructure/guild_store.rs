/*!

Typed per-guild records.

Every per-guild settings record implements [`GuildRecord`] and is read and written through [`GuildStore`]. Writes for
the same guild are serialized with an in-process lock so read-modify-write cycles do not interleave.

*/

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use poise::serenity_prelude::GuildId;
use sea_orm::{DatabaseConnection, DbErr};
use tokio::sync::OwnedMutexGuard;

/// A settings record stored once per guild.
pub trait GuildRecord: Default + Send + Sync + Sized {
    fn load(
        db: &DatabaseConnection,
        guild_id: GuildId,
    ) -> impl Future<Output = Result<Option<Self>, DbErr>> + Send;

    fn store(
        &self,
        db: &DatabaseConnection,
        guild_id: GuildId,
    ) -> impl Future<Output = Result<(), DbErr>> + Send;
}

pub type GuildGuard = OwnedMutexGuard<()>;

#[derive(Clone, Default)]
pub struct GuildLocks {
    locks: Arc<Mutex<HashMap<GuildId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl GuildLocks {
    pub async fn lock(&self, guild_id: GuildId) -> GuildGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(guild_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct GuildStore {
    db: DatabaseConnection,
    locks: GuildLocks,
}

impl GuildStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: GuildLocks::default(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Holds the guild's write lock. Do not call [`GuildStore::set`] or [`GuildStore::update`] for the same guild
    /// while the guard is alive; use [`GuildStore::db`] directly instead.
    pub async fn lock(&self, guild_id: GuildId) -> GuildGuard {
        self.locks.lock(guild_id).await
    }

    /// Loads the record, or its default when the guild has none yet.
    pub async fn get<R: GuildRecord>(&self, guild_id: GuildId) -> Result<R, DbErr> {
        Ok(R::load(&self.db, guild_id).await?.unwrap_or_default())
    }

    pub async fn set<R: GuildRecord>(&self, guild_id: GuildId, record: &R) -> Result<(), DbErr> {
        let _guard = self.lock(guild_id).await;
        record.store(&self.db, guild_id).await
    }

    /// Loads (or defaults) the record, applies `f`, and stores it, all under the guild lock.
    pub async fn update<R, T, F>(&self, guild_id: GuildId, f: F) -> Result<T, DbErr>
    where
        R: GuildRecord,
        F: FnOnce(&mut R) -> T + Send,
        T: Send,
    {
        let _guard = self.lock(guild_id).await;
        let mut record = self.get::<R>(guild_id).await?;
        let result = f(&mut record);
        record.store(&self.db, guild_id).await?;
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};

    /// A fresh in-memory database with every migration applied.
    pub async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("in-memory sqlite");
        Migrator::up(&db, None).await.expect("migrations apply");
        db
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn guild_locks_serialize_the_same_guild() {
        let locks = GuildLocks::default();
        let guard = locks.lock(GuildId::new(1)).await;

        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock(GuildId::new(1))).await;
        assert!(same.is_err(), "second lock on the same guild should wait");

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(GuildId::new(2))).await;
        assert!(other.is_ok(), "other guilds are independent");

        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(GuildId::new(1))).await;
        assert!(again.is_ok());
    }
}
