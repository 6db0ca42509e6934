use std::time::Duration;

use anyhow::{Context, Result};
use courtside::infrastructure::environment::{self, env_var_with_context, get_data_directory};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

/// Opens the database named by `DATABASE_URL` and brings its schema up to date.
pub async fn init_database() -> Result<DatabaseConnection> {
    ensure_data_dir_created()?;
    let db = connect().await?;
    Migrator::up(&db, None)
        .await
        .context("Failed to migrate database to latest")?;
    info!("Database initialized.");
    Ok(db)
}

fn ensure_data_dir_created() -> Result<()> {
    let path = get_data_directory();
    std::fs::create_dir_all(&path).with_context(|| format!("Failed to create data directory {:?}", path))
}

/// SQLite files are created on first use.
fn with_create_mode(url: String) -> String {
    if url.starts_with("sqlite:") && !url.contains("mode=") && !url.contains(":memory:") {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}mode=rwc", url, separator)
    } else {
        url
    }
}

async fn connect() -> Result<DatabaseConnection> {
    let url = with_create_mode(env_var_with_context(environment::DATABASE_URL)?);
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(8)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options)
        .await
        .context("Failed to connect to the database")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_gain_create_mode() {
        assert_eq!(with_create_mode("sqlite://data/bot.db".into()), "sqlite://data/bot.db?mode=rwc");
        assert_eq!(with_create_mode("sqlite://bot.db?cache=shared".into()), "sqlite://bot.db?cache=shared&mode=rwc");
        assert_eq!(with_create_mode("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(with_create_mode("postgres://localhost/bot".into()), "postgres://localhost/bot");
    }
}
