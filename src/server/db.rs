//! SQLite pool, schema and row types

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::net::dto::{LeaderboardEntryDto, SaveDto, ScoreDto};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS player_scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_name TEXT NOT NULL,
        score INTEGER NOT NULL,
        kills INTEGER NOT NULL,
        max_combo INTEGER NOT NULL,
        accuracy REAL NOT NULL,
        duration_sec INTEGER NOT NULL,
        valid_hits INTEGER NOT NULL,
        miss_clicks INTEGER NOT NULL,
        punishment_hits INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS ix_player_scores_rank
        ON player_scores (score DESC, kills DESC, max_combo DESC, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS ix_player_scores_name ON player_scores (player_name)",
    "CREATE TABLE IF NOT EXISTS player_saves (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_name TEXT NOT NULL UNIQUE,
        score INTEGER NOT NULL,
        kills INTEGER NOT NULL,
        max_combo INTEGER NOT NULL,
        valid_hits INTEGER NOT NULL,
        miss_clicks INTEGER NOT NULL,
        punishment_hits INTEGER NOT NULL,
        hearts INTEGER NOT NULL,
        phase_index INTEGER NOT NULL,
        time_left_sec INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
];

/// Leaderboard order; id breaks exact ties so paging is stable
pub const RANK_ORDER: &str = "score DESC, kills DESC, max_combo DESC, created_at DESC, id DESC";

/// Open a pool. In-memory databases get a single connection that never
/// expires, since every SQLite memory connection is its own database.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = options.connect(database_url).await?;
    info!("Connected to {}", if in_memory { "in-memory database" } else { database_url });
    Ok(pool)
}

/// Create tables and indexes if they do not exist
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

fn datetime_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub id: i64,
    pub player_name: String,
    pub score: i64,
    pub kills: i64,
    pub max_combo: i64,
    pub accuracy: f64,
    pub duration_sec: i64,
    pub valid_hits: i64,
    pub miss_clicks: i64,
    pub punishment_hits: i64,
    /// Unix milliseconds
    pub created_at: i64,
}

impl ScoreRow {
    pub fn into_dto(self) -> ScoreDto {
        ScoreDto {
            id: self.id,
            player_name: self.player_name,
            score: self.score,
            kills: self.kills,
            max_combo: self.max_combo,
            accuracy: self.accuracy,
            duration_sec: self.duration_sec,
            valid_hits: self.valid_hits,
            miss_clicks: self.miss_clicks,
            punishment_hits: self.punishment_hits,
            created_at: datetime_from_millis(self.created_at),
        }
    }

    pub fn into_entry(self, rank: u32) -> LeaderboardEntryDto {
        LeaderboardEntryDto {
            rank,
            id: self.id,
            player_name: self.player_name,
            score: self.score,
            kills: self.kills,
            max_combo: self.max_combo,
            created_at: datetime_from_millis(self.created_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaveRow {
    pub id: i64,
    pub player_name: String,
    pub score: i64,
    pub kills: i64,
    pub max_combo: i64,
    pub valid_hits: i64,
    pub miss_clicks: i64,
    pub punishment_hits: i64,
    pub hearts: i64,
    pub phase_index: i64,
    pub time_left_sec: i64,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub updated_at: i64,
}

impl SaveRow {
    pub fn into_dto(self) -> SaveDto {
        SaveDto {
            id: self.id,
            player_name: self.player_name,
            score: self.score,
            kills: self.kills,
            max_combo: self.max_combo,
            valid_hits: self.valid_hits,
            miss_clicks: self.miss_clicks,
            punishment_hits: self.punishment_hits,
            hearts: self.hearts,
            phase_index: self.phase_index,
            time_left_sec: self.time_left_sec,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = connect("sqlite::memory:", 4).await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player_scores")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_row_to_dto_timestamp() {
        let row = ScoreRow {
            id: 1,
            player_name: "Biken".into(),
            score: 10,
            kills: 1,
            max_combo: 1,
            accuracy: 1.0,
            duration_sec: 5,
            valid_hits: 1,
            miss_clicks: 0,
            punishment_hits: 0,
            created_at: 1_700_000_000_123,
        };
        let dto = row.clone().into_dto();
        assert_eq!(dto.created_at.timestamp_millis(), 1_700_000_000_123);

        let entry = row.into_entry(3);
        assert_eq!(entry.rank, 3);
        assert_eq!(entry.player_name, "Biken");
    }
}
