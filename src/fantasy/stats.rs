/*!

The process-wide NBA player cache and the task that keeps it fresh.

Season totals come from the `leaguedashplayerstats` table of stats.nba.com and positions from its `playerindex` table.
The refresh task loads the last stored table from the database first, so commands have data right after a restart,
then refreshes every twelve hours. Failed refreshes are retried after five minutes while the stale table keeps serving
reads.

*/

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use chrono::{Datelike, NaiveDate};
use reqwest::{Client, header};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    fantasy::{
        repository,
        scoring::{ScoringWeights, StatLine, fantasy_points},
        slots::Position,
    },
    games::{answers::normalize, nba::TriviaPlayer},
    infrastructure::{
        environment,
        http::{FetchError, require_success},
        util::{shutdown_requested, unix_now},
    },
};

const STATS_BASE: &str = "https://stats.nba.com/stats";
pub const FETCH_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(3);
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);
pub const FAILURE_COOLDOWN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct NbaPlayer {
    pub id: i64,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub games_played: i32,
    pub stats: StatLine,
}

impl NbaPlayer {
    pub fn fantasy_points(&self, weights: &ScoringWeights) -> f64 {
        fantasy_points(&self.stats, weights)
    }
}

/// What commands see when they ask the cache for players.
#[derive(Debug, Clone)]
pub enum CacheStatus {
    Ready(Arc<Vec<NbaPlayer>>),
    Updating,
    Failed(String),
}

#[derive(Default)]
struct CacheState {
    players: Arc<Vec<NbaPlayer>>,
    by_id: HashMap<i64, usize>,
    last_error: Option<String>,
    updated_at: Option<i64>,
}

#[derive(Clone, Default)]
pub struct PlayerCache {
    inner: Arc<RwLock<CacheState>>,
}

impl PlayerCache {
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn replace(&self, players: Vec<NbaPlayer>, updated_at: i64) {
        let by_id = players.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        let mut state = self.write();
        state.players = Arc::new(players);
        state.by_id = by_id;
        state.last_error = None;
        state.updated_at = Some(updated_at);
    }

    pub fn record_error(&self, error: String) {
        self.write().last_error = Some(error);
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    pub fn updated_at(&self) -> Option<i64> {
        self.read().updated_at
    }

    pub fn snapshot(&self) -> Arc<Vec<NbaPlayer>> {
        self.read().players.clone()
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.read();
        if !state.players.is_empty() {
            CacheStatus::Ready(state.players.clone())
        } else if let Some(error) = &state.last_error {
            CacheStatus::Failed(error.clone())
        } else {
            CacheStatus::Updating
        }
    }

    pub fn get(&self, id: i64) -> Option<NbaPlayer> {
        let state = self.read();
        state.by_id.get(&id).map(|&i| state.players[i].clone())
    }

    /// Exact name matches first, then names containing the query. Accents and case are ignored.
    pub fn search(&self, query: &str, limit: usize) -> Vec<NbaPlayer> {
        let needle = normalize(query);
        if needle.is_empty() {
            return Vec::new();
        }
        let players = self.snapshot();
        let mut exact = Vec::new();
        let mut partial = Vec::new();
        for player in players.iter() {
            let name = normalize(&player.name);
            if name == needle {
                exact.push(player.clone());
            } else if name.contains(&needle) {
                partial.push(player.clone());
            }
        }
        exact.extend(partial);
        exact.truncate(limit);
        exact
    }

    pub fn trivia_players(&self) -> Vec<TriviaPlayer> {
        self.snapshot()
            .iter()
            .map(|p| TriviaPlayer {
                id: p.id,
                name: p.name.clone(),
            })
            .collect()
    }
}

/// The season to track: `NBA_STATS_SEASON` when set, otherwise the one in progress.
pub fn configured_season() -> String {
    std::env::var(environment::NBA_STATS_SEASON)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| season_for(chrono::Utc::now().date_naive()))
}

/// The season string stats.nba.com expects, e.g. `2025-26`. Seasons roll over in October.
pub fn season_for(date: NaiveDate) -> String {
    let start = if date.month() >= 10 { date.year() } else { date.year() - 1 };
    format!("{}-{:02}", start, (start + 1) % 100)
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets")]
    result_sets: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn from_response(response: StatsResponse) -> Result<Self, FetchError> {
        let set = response
            .result_sets
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Malformed("no result sets".into()))?;
        Ok(Self {
            columns: set.headers.into_iter().enumerate().map(|(i, h)| (h, i)).collect(),
            rows: set.row_set,
        })
    }

    fn column(&self, name: &str) -> Result<usize, FetchError> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| FetchError::Malformed(format!("missing column {}", name)))
    }
}

fn cell_f64(row: &[Value], column: usize) -> f64 {
    row.get(column).and_then(Value::as_f64).unwrap_or(0.0)
}

fn cell_str(row: &[Value], column: usize) -> String {
    row.get(column).and_then(Value::as_str).unwrap_or("").to_string()
}

fn parse_league_stats(response: StatsResponse) -> Result<Vec<NbaPlayer>, FetchError> {
    let table = Table::from_response(response)?;
    let id = table.column("PLAYER_ID")?;
    let name = table.column("PLAYER_NAME")?;
    let team = table.column("TEAM_ABBREVIATION")?;
    let gp = table.column("GP")?;
    let [pts, reb, ast, stl, blk, tov] = ["PTS", "REB", "AST", "STL", "BLK", "TOV"].map(|c| table.column(c));
    let (pts, reb, ast, stl, blk, tov) = (pts?, reb?, ast?, stl?, blk?, tov?);

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let player_id = row.get(id).and_then(Value::as_i64)?;
            Some(NbaPlayer {
                id: player_id,
                name: cell_str(row, name),
                team: cell_str(row, team),
                position: Position::UTIL,
                games_played: cell_f64(row, gp) as i32,
                stats: StatLine {
                    pts: cell_f64(row, pts),
                    reb: cell_f64(row, reb),
                    ast: cell_f64(row, ast),
                    stl: cell_f64(row, stl),
                    blk: cell_f64(row, blk),
                    tov: cell_f64(row, tov),
                },
            })
        })
        .collect())
}

fn parse_positions(response: StatsResponse) -> Result<HashMap<i64, Position>, FetchError> {
    let table = Table::from_response(response)?;
    let id = table.column("PERSON_ID")?;
    let position = table.column("POSITION")?;
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let player_id = row.get(id).and_then(Value::as_i64)?;
            Some((player_id, Position::from_provider(&cell_str(row, position))))
        })
        .collect())
}

/// Where season stats come from.
pub trait StatsProvider: Send + Sync {
    fn fetch_players(&self) -> impl Future<Output = Result<Vec<NbaPlayer>, FetchError>> + Send;
}

pub struct NbaStatsApi {
    client: Client,
    season: String,
}

impl NbaStatsApi {
    pub fn new(client: Client, season: String) -> Self {
        Self { client, season }
    }

    /// stats.nba.com drops requests that do not look like they came from its own site.
    fn request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/{}", STATS_BASE, endpoint))
            .header(header::ACCEPT, "application/json, text/plain, */*")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(header::REFERER, "https://www.nba.com/")
            .header(header::ORIGIN, "https://www.nba.com")
            .header(
                header::USER_AGENT,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:72.0) Gecko/20100101 Firefox/72.0",
            )
            .header("x-nba-stats-origin", "stats")
            .header("x-nba-stats-token", "true")
    }

    async fn league_stats(&self) -> Result<Vec<NbaPlayer>, FetchError> {
        let response = self
            .request("leaguedashplayerstats")
            .query(&[
                ("LastNGames", "0"),
                ("LeagueID", "00"),
                ("MeasureType", "Base"),
                ("Month", "0"),
                ("OpponentTeamID", "0"),
                ("PORound", "0"),
                ("PaceAdjust", "N"),
                ("PerMode", "Totals"),
                ("Period", "0"),
                ("PlusMinus", "N"),
                ("Rank", "N"),
                ("Season", self.season.as_str()),
                ("SeasonType", "Regular Season"),
                ("TeamID", "0"),
            ])
            .send()
            .await?;
        parse_league_stats(require_success(response)?.json().await?)
    }

    async fn positions(&self) -> Result<HashMap<i64, Position>, FetchError> {
        let response = self
            .request("playerindex")
            .query(&[
                ("LeagueID", "00"),
                ("Season", self.season.as_str()),
                ("Historical", "0"),
                ("Active", "1"),
            ])
            .send()
            .await?;
        parse_positions(require_success(response)?.json().await?)
    }
}

impl StatsProvider for NbaStatsApi {
    async fn fetch_players(&self) -> Result<Vec<NbaPlayer>, FetchError> {
        let mut players = self.league_stats().await?;
        match self.positions().await {
            Ok(positions) => {
                for player in &mut players {
                    if let Some(position) = positions.get(&player.id) {
                        player.position = *position;
                    }
                }
            }
            Err(e) => warn!("Player positions unavailable, everyone is UTIL for now: {}", e),
        }
        Ok(players)
    }
}

/// Fetches with up to [`FETCH_ATTEMPTS`] attempts, `delay` apart.
pub async fn fetch_with_retries<P: StatsProvider>(provider: &P, delay: Duration) -> Result<Vec<NbaPlayer>, FetchError> {
    let mut attempt = 1;
    loop {
        match provider.fetch_players().await {
            Ok(players) => return Ok(players),
            Err(e) if attempt < FETCH_ATTEMPTS => {
                debug!(attempt, "Stats fetch failed, retrying: {}", e);
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fetches, stores and publishes a fresh table. Returns the number of players.
pub async fn refresh_now<P: StatsProvider>(
    provider: &P,
    cache: &PlayerCache,
    db: &DatabaseConnection,
    retry_delay: Duration,
) -> Result<usize, crate::Error> {
    let mut players = match fetch_with_retries(provider, retry_delay).await {
        Ok(players) => players,
        Err(e) => {
            cache.record_error(e.to_string());
            return Err(e.into());
        }
    };
    if players.is_empty() {
        let message = "the stats table was empty".to_string();
        cache.record_error(message.clone());
        return Err(message.into());
    }
    players.sort_by(|a, b| {
        b.fantasy_points(&ScoringWeights::default())
            .total_cmp(&a.fantasy_points(&ScoringWeights::default()))
    });
    let now = unix_now();
    repository::store_player_stats(db, &players, now).await?;
    let count = players.len();
    cache.replace(players, now);
    Ok(count)
}

/// Keeps the cache fresh until shutdown.
pub async fn run_refresh_loop<P: StatsProvider>(
    provider: P,
    cache: PlayerCache,
    db: DatabaseConnection,
    mut shutdown: watch::Receiver<bool>,
) {
    match repository::load_player_stats(&db).await {
        Ok((players, updated_at)) if !players.is_empty() => {
            info!("Loaded {} cached players from the database", players.len());
            cache.replace(players, updated_at);
        }
        Ok(_) => debug!("No stored player stats yet"),
        Err(e) => warn!("Failed to load stored player stats: {}", e),
    }

    loop {
        let wait = match refresh_now(&provider, &cache, &db, RETRY_DELAY).await {
            Ok(count) => {
                info!("Refreshed stats for {} players", count);
                REFRESH_INTERVAL
            }
            Err(e) => {
                warn!("Error fetching NBA stats: {}", e);
                FAILURE_COOLDOWN
            }
        };
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_requested(&mut shutdown) => {
                info!("Stats refresh stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn player(id: i64, name: &str, position: Position, pts: f64) -> NbaPlayer {
        NbaPlayer {
            id,
            name: name.into(),
            team: "BOS".into(),
            position,
            games_played: 10,
            stats: StatLine {
                pts,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::{test_support::player, *};
    use crate::infrastructure::guild_store::test_support::memory_db;

    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    impl StatsProvider for FlakyProvider {
        async fn fetch_players(&self) -> Result<Vec<NbaPlayer>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(FetchError::Malformed("timeout".into()))
            } else {
                Ok(vec![
                    player(1, "Role Player", Position::SF, 100.0),
                    player(2, "Star Player", Position::PG, 900.0),
                ])
            }
        }
    }

    const LEAGUE_STATS: &str = r#"{
        "resource": "leaguedashplayerstats",
        "resultSets": [{
            "name": "LeagueDashPlayerStats",
            "headers": ["PLAYER_ID", "PLAYER_NAME", "TEAM_ABBREVIATION", "GP", "PTS", "REB", "AST", "STL", "BLK", "TOV"],
            "rowSet": [
                [203999, "Nikola Jokić", "DEN", 70, 2000, 900, 700, 100, 50, 200],
                [1628983, "Shai Gilgeous-Alexander", "OKC", 75, 2400, 400, 450, 150, 70, 180]
            ]
        }]
    }"#;

    #[test]
    fn parses_the_league_table() {
        let players = parse_league_stats(serde_json::from_str(LEAGUE_STATS).unwrap()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Nikola Jokić");
        assert_eq!(players[0].stats.reb, 900.0);
        assert_eq!(players[1].games_played, 75);
        assert_eq!(players[1].position, Position::UTIL);
    }

    #[test]
    fn missing_columns_are_reported() {
        let body = r#"{"resultSets":[{"headers":["PLAYER_ID"],"rowSet":[[1]]}]}"#;
        let err = parse_league_stats(serde_json::from_str(body).unwrap()).unwrap_err();
        assert!(err.to_string().contains("PLAYER_NAME"));
    }

    #[test]
    fn parses_positions_from_the_player_index() {
        let body = r#"{"resultSets":[{"headers":["PERSON_ID","POSITION"],"rowSet":[[1,"G-F"],[2,"C"],[3,""]]}]}"#;
        let positions = parse_positions(serde_json::from_str(body).unwrap()).unwrap();
        assert_eq!(positions[&1], Position::G);
        assert_eq!(positions[&2], Position::C);
        assert_eq!(positions[&3], Position::UTIL);
    }

    #[test]
    fn seasons_roll_over_in_october() {
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()), "2025-26");
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()), "2025-26");
        assert_eq!(season_for(NaiveDate::from_ymd_opt(1999, 11, 1).unwrap()), "1999-00");
    }

    #[test]
    fn cache_status_reports_errors_only_when_empty() {
        let cache = PlayerCache::default();
        assert!(matches!(cache.status(), CacheStatus::Updating));
        cache.record_error("boom".into());
        assert!(matches!(cache.status(), CacheStatus::Failed(ref e) if e == "boom"));
        cache.replace(vec![player(1, "A", Position::C, 1.0)], 5);
        assert!(matches!(cache.status(), CacheStatus::Ready(ref p) if p.len() == 1));
        assert_eq!(cache.last_error(), None);
    }

    #[test]
    fn search_prefers_exact_names_and_ignores_accents() {
        let cache = PlayerCache::default();
        cache.replace(
            vec![
                player(1, "Jalen Williams", Position::SF, 1.0),
                player(2, "Jaylin Williams", Position::PF, 1.0),
                player(3, "Nikola Jokić", Position::C, 1.0),
                player(4, "Williams", Position::C, 1.0),
            ],
            0,
        );
        let hits = cache.search("williams", 10);
        assert_eq!(hits[0].id, 4);
        assert_eq!(hits.len(), 3);
        assert_eq!(cache.search("jokic", 10)[0].id, 3);
        assert!(cache.search("  ", 10).is_empty());
        assert_eq!(cache.get(2).unwrap().name, "Jaylin Williams");
    }

    #[tokio::test]
    async fn retries_before_giving_up() {
        let provider = FlakyProvider {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        assert_eq!(fetch_with_retries(&provider, Duration::ZERO).await.unwrap().len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        let provider = FlakyProvider {
            failures: 3,
            calls: AtomicU32::new(0),
        };
        assert!(fetch_with_retries(&provider, Duration::ZERO).await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), FETCH_ATTEMPTS);
    }

    #[tokio::test]
    async fn refresh_sorts_stores_and_publishes() {
        let db = memory_db().await;
        let cache = PlayerCache::default();
        let provider = FlakyProvider {
            failures: 0,
            calls: AtomicU32::new(0),
        };

        assert_eq!(refresh_now(&provider, &cache, &db, Duration::ZERO).await.unwrap(), 2);
        assert_eq!(cache.snapshot()[0].name, "Star Player");

        let (stored, _) = repository::load_player_stats(&db).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_serving_stale_data() {
        let db = memory_db().await;
        let cache = PlayerCache::default();
        cache.replace(vec![player(9, "Old Data", Position::C, 1.0)], 1);
        let provider = FlakyProvider {
            failures: 10,
            calls: AtomicU32::new(0),
        };

        assert!(refresh_now(&provider, &cache, &db, Duration::ZERO).await.is_err());
        assert!(matches!(cache.status(), CacheStatus::Ready(_)));
        assert!(cache.last_error().is_some());
    }
}
