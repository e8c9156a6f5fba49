//! `/api/scores` and `/api/highscore`

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::game::constants::leaderboard;
use crate::metrics::Metrics;
use crate::net::dto::{LeaderboardEntryDto, PagedScoresDto, ScoreCreateDto, ScoreDto, ScoreQuery};
use crate::server::db::{ScoreRow, RANK_ORDER};
use crate::server::error::ApiError;
use crate::server::validation::validate_score;
use crate::server::AppState;

/// Sortable columns exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Score,
    Kills,
    MaxCombo,
    CreatedAt,
}

impl SortKey {
    fn parse(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "score" => Some(SortKey::Score),
            "kills" => Some(SortKey::Kills),
            "maxcombo" => Some(SortKey::MaxCombo),
            "createdat" => Some(SortKey::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortKey::Score => "score",
            SortKey::Kills => "kills",
            SortKey::MaxCombo => "max_combo",
            SortKey::CreatedAt => "created_at",
        }
    }
}

/// Parse `-score,kills,...` into `(key, descending)` pairs. Unknown keys are
/// skipped; an empty result falls back to the leaderboard order.
pub fn parse_sort(raw: Option<&str>) -> Vec<(SortKey, bool)> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(leaderboard::DEFAULT_SORT);

    let parsed: Vec<(SortKey, bool)> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|part| {
            let (desc, key) = match part.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            SortKey::parse(key).map(|k| (k, desc))
        })
        .collect();

    if parsed.is_empty() {
        return parse_sort(Some(leaderboard::DEFAULT_SORT));
    }
    parsed
}

/// ORDER BY body for a parsed sort, always ending on id for stable paging
pub fn order_by(sort: &[(SortKey, bool)]) -> String {
    let mut parts: Vec<String> = sort
        .iter()
        .map(|(key, desc)| format!("{} {}", key.column(), if *desc { "DESC" } else { "ASC" }))
        .collect();
    parts.push("id DESC".to_string());
    parts.join(", ")
}

/// Clamp page to >= 1 and page size to 1..=100 (default 20)
pub fn clamp_paging(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(leaderboard::PAGE_SIZE_DEFAULT)
        .clamp(1, leaderboard::PAGE_SIZE_MAX);
    (page, page_size)
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &ScoreQuery) {
    qb.push(" WHERE 1 = 1");

    if let Some(term) = query.player.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        qb.push(" AND player_name LIKE ").push_bind(format!("%{}%", term));
    }
    if let Some(from) = query.from {
        qb.push(" AND created_at >= ").push_bind(from.timestamp_millis());
    }
    if let Some(to) = query.to {
        qb.push(" AND created_at <= ").push_bind(to.timestamp_millis());
    }
}

async fn fetch_row(pool: &SqlitePool, id: i64) -> Result<Option<ScoreRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoreRow>("SELECT * FROM player_scores WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

async fn fetch_ranked(pool: &SqlitePool, limit: i64) -> Result<Vec<ScoreRow>, sqlx::Error> {
    let sql = format!("SELECT * FROM player_scores ORDER BY {} LIMIT ?", RANK_ORDER);
    sqlx::query_as::<_, ScoreRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// POST /api/scores
pub async fn create(
    State(state): State<AppState>,
    Json(dto): Json<ScoreCreateDto>,
) -> Result<Response, ApiError> {
    let valid = validate_score(&dto)?;
    let now = Utc::now().timestamp_millis();

    let id = sqlx::query(
        "INSERT INTO player_scores
            (player_name, score, kills, max_combo, accuracy, duration_sec,
             valid_hits, miss_clicks, punishment_hits, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&valid.player_name)
    .bind(valid.score)
    .bind(valid.kills)
    .bind(valid.max_combo)
    .bind(valid.accuracy)
    .bind(valid.duration_sec)
    .bind(valid.valid_hits)
    .bind(valid.miss_clicks)
    .bind(valid.punishment_hits)
    .bind(now)
    .execute(&state.pool)
    .await?
    .last_insert_rowid();

    let row = fetch_row(&state.pool, id).await?.ok_or(ApiError::NotFound)?;
    Metrics::incr(&state.metrics.scores_created);
    info!(
        "Score {} stored: '{}' score={} kills={}",
        id, row.player_name, row.score, row.kills
    );

    let location = format!("/api/scores/{}", id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(row.into_dto()),
    )
        .into_response())
}

/// GET /api/scores/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ScoreDto>, ApiError> {
    let row = fetch_row(&state.pool, id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(row.into_dto()))
}

/// PUT /api/scores/{id}. Id and createdAt are kept; accuracy is recomputed.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(dto): Json<ScoreCreateDto>,
) -> Result<Json<ScoreDto>, ApiError> {
    if fetch_row(&state.pool, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let valid = validate_score(&dto)?;

    sqlx::query(
        "UPDATE player_scores SET
            player_name = ?, score = ?, kills = ?, max_combo = ?, accuracy = ?,
            duration_sec = ?, valid_hits = ?, miss_clicks = ?, punishment_hits = ?
         WHERE id = ?",
    )
    .bind(&valid.player_name)
    .bind(valid.score)
    .bind(valid.kills)
    .bind(valid.max_combo)
    .bind(valid.accuracy)
    .bind(valid.duration_sec)
    .bind(valid.valid_hits)
    .bind(valid.miss_clicks)
    .bind(valid.punishment_hits)
    .bind(id)
    .execute(&state.pool)
    .await?;

    let row = fetch_row(&state.pool, id).await?.ok_or(ApiError::NotFound)?;
    Metrics::incr(&state.metrics.scores_updated);
    debug!("Score {} updated", id);
    Ok(Json(row.into_dto()))
}

/// DELETE /api/scores/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let affected = sqlx::query("DELETE FROM player_scores WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(ApiError::NotFound);
    }
    Metrics::incr(&state.metrics.scores_deleted);
    debug!("Score {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/scores?player=&from=&to=&page=&pageSize=&sort=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<PagedScoresDto>, ApiError> {
    let (page, page_size) = clamp_paging(query.page, query.page_size);
    let sort = parse_sort(query.sort.as_deref());

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM player_scores");
    push_filters(&mut count, &query);
    let total_items: i64 = count.build_query_scalar().fetch_one(&state.pool).await?;

    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM player_scores");
    push_filters(&mut select, &query);
    select.push(" ORDER BY ").push(order_by(&sort));
    select.push(" LIMIT ").push_bind(page_size);
    select.push(" OFFSET ").push_bind((page - 1).saturating_mul(page_size));
    let rows: Vec<ScoreRow> = select.build_query_as().fetch_all(&state.pool).await?;

    Metrics::incr(&state.metrics.leaderboard_reads);
    Ok(Json(PagedScoresDto {
        items: rows.into_iter().map(ScoreRow::into_dto).collect(),
        page,
        page_size,
        total_items,
        total_pages: (total_items + page_size - 1) / page_size,
    }))
}

/// GET /api/scores/top/{n}, n clamped to 1..=100
pub async fn top(
    State(state): State<AppState>,
    Path(n): Path<i64>,
) -> Result<Json<Vec<LeaderboardEntryDto>>, ApiError> {
    let n = n.clamp(1, leaderboard::TOP_MAX);
    let rows = fetch_ranked(&state.pool, n).await?;

    Metrics::incr(&state.metrics.leaderboard_reads);
    Ok(Json(
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| row.into_entry(i as u32 + 1))
            .collect(),
    ))
}

/// GET /api/highscore: rank-1 entry, or 204 when there are no scores
pub async fn highscore(State(state): State<AppState>) -> Result<Response, ApiError> {
    let row = fetch_ranked(&state.pool, 1).await?.into_iter().next();

    Metrics::incr(&state.metrics.leaderboard_reads);
    Ok(match row {
        Some(row) => Json(row.into_entry(1)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
