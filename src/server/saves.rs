//! `/api/saves`: one resumable snapshot per player, upserted by name

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::metrics::Metrics;
use crate::net::dto::{SaveDto, SaveSnapshotDto};
use crate::server::db::SaveRow;
use crate::server::error::ApiError;
use crate::server::validation::{normalize_name, sanitize_save};
use crate::server::AppState;

async fn fetch_by_name(pool: &SqlitePool, name: &str) -> Result<Option<SaveRow>, sqlx::Error> {
    sqlx::query_as::<_, SaveRow>("SELECT * FROM player_saves WHERE player_name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// GET /api/saves/{playerName}
pub async fn get_by_name(
    State(state): State<AppState>,
    Path(player_name): Path<String>,
) -> Result<Json<SaveDto>, ApiError> {
    let name = normalize_name(&player_name)?;
    let row = fetch_by_name(&state.pool, &name)
        .await?
        .ok_or(ApiError::NotFound)?;

    Metrics::incr(&state.metrics.saves_loaded);
    Ok(Json(row.into_dto()))
}

/// POST /api/saves
pub async fn upsert(
    State(state): State<AppState>,
    Json(dto): Json<SaveSnapshotDto>,
) -> Result<Json<SaveDto>, ApiError> {
    store(&state, &dto).await
}

/// POST /api/saves/{playerName}; the path name wins over the body's
pub async fn upsert_named(
    State(state): State<AppState>,
    Path(player_name): Path<String>,
    Json(dto): Json<SaveSnapshotDto>,
) -> Result<Json<SaveDto>, ApiError> {
    let dto = SaveSnapshotDto { player_name, ..dto };
    store(&state, &dto).await
}

async fn store(state: &AppState, dto: &SaveSnapshotDto) -> Result<Json<SaveDto>, ApiError> {
    let save = sanitize_save(dto)?;
    let now = Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO player_saves
            (player_name, score, kills, max_combo, valid_hits, miss_clicks,
             punishment_hits, hearts, phase_index, time_left_sec, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(player_name) DO UPDATE SET
            score = excluded.score,
            kills = excluded.kills,
            max_combo = excluded.max_combo,
            valid_hits = excluded.valid_hits,
            miss_clicks = excluded.miss_clicks,
            punishment_hits = excluded.punishment_hits,
            hearts = excluded.hearts,
            phase_index = excluded.phase_index,
            time_left_sec = excluded.time_left_sec,
            updated_at = excluded.updated_at",
    )
    .bind(&save.player_name)
    .bind(save.score)
    .bind(save.kills)
    .bind(save.max_combo)
    .bind(save.valid_hits)
    .bind(save.miss_clicks)
    .bind(save.punishment_hits)
    .bind(save.hearts)
    .bind(save.phase_index)
    .bind(save.time_left_sec)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let row = fetch_by_name(&state.pool, &save.player_name)
        .await?
        .ok_or(ApiError::NotFound)?;

    Metrics::incr(&state.metrics.saves_upserted);
    info!(
        "Save stored for '{}': score={} hearts={} phase={}",
        row.player_name, row.score, row.hearts, row.phase_index
    );
    Ok(Json(row.into_dto()))
}

/// DELETE /api/saves/{playerName}
pub async fn delete(
    State(state): State<AppState>,
    Path(player_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let name = normalize_name(&player_name)?;
    let affected = sqlx::query("DELETE FROM player_saves WHERE player_name = ?")
        .bind(&name)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(ApiError::NotFound);
    }
    Metrics::incr(&state.metrics.saves_deleted);
    debug!("Save for '{}' deleted", name);
    Ok(StatusCode::NO_CONTENT)
}
