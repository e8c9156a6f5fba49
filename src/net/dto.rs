//! JSON wire types shared by the backend and the API client
//!
//! Field names are camelCase on the wire. Counters are signed so the
//! backend can reject negative values instead of failing to deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::constants::timing;
use crate::game::result::{ResumeSnapshot, RunResult};

fn default_duration() -> i64 {
    timing::GAME_DURATION_SEC as i64
}

/// Body of `POST /api/scores` and `PUT /api/scores/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCreateDto {
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub kills: i64,
    #[serde(default)]
    pub max_combo: i64,
    #[serde(default = "default_duration")]
    pub duration_sec: i64,
    #[serde(default)]
    pub valid_hits: i64,
    #[serde(default)]
    pub miss_clicks: i64,
    #[serde(default)]
    pub punishment_hits: i64,
}

impl From<&RunResult> for ScoreCreateDto {
    fn from(result: &RunResult) -> Self {
        Self {
            player_name: result.player_name.clone(),
            score: result.score as i64,
            kills: result.kills as i64,
            max_combo: result.max_combo as i64,
            duration_sec: result.duration_sec.max(1) as i64,
            valid_hits: result.valid_hits as i64,
            miss_clicks: result.miss_clicks as i64,
            punishment_hits: result.punishment_hits as i64,
        }
    }
}

/// A stored score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDto {
    pub id: i64,
    pub player_name: String,
    pub score: i64,
    pub kills: i64,
    pub max_combo: i64,
    /// validHits / (validHits + missClicks + punishmentHits), computed server side
    pub accuracy: f64,
    pub duration_sec: i64,
    pub valid_hits: i64,
    pub miss_clicks: i64,
    pub punishment_hits: i64,
    pub created_at: DateTime<Utc>,
}

/// One ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub rank: u32,
    pub id: i64,
    pub player_name: String,
    pub score: i64,
    pub kills: i64,
    pub max_combo: i64,
    pub created_at: DateTime<Utc>,
}

/// Page of `GET /api/scores`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedScoresDto {
    pub items: Vec<ScoreDto>,
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// Query string of `GET /api/scores`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQuery {
    /// Substring of the player name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    /// Inclusive lower bound on createdAt (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on createdAt (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    /// Comma-separated keys, `-` prefix for descending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Body of `POST /api/saves`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveSnapshotDto {
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
}

impl From<&ResumeSnapshot> for SaveSnapshotDto {
    fn from(s: &ResumeSnapshot) -> Self {
        Self {
            player_name: s.player_name.clone(),
            score: s.score as i64,
            kills: s.kills as i64,
            max_combo: s.max_combo as i64,
            valid_hits: s.valid_hits as i64,
            miss_clicks: s.miss_clicks as i64,
            punishment_hits: s.punishment_hits as i64,
            hearts: s.hearts as i64,
            phase_index: s.phase_index as i64,
            time_left_sec: s.time_left_sec as i64,
        }
    }
}

/// A stored save snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDto {
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

fn to_u32(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}

impl SaveDto {
    /// Snapshot used to resume a run from this save
    pub fn to_resume(&self) -> ResumeSnapshot {
        ResumeSnapshot {
            player_name: self.player_name.clone(),
            score: to_u32(self.score),
            kills: to_u32(self.kills),
            max_combo: to_u32(self.max_combo),
            valid_hits: to_u32(self.valid_hits),
            miss_clicks: to_u32(self.miss_clicks),
            punishment_hits: to_u32(self.punishment_hits),
            hearts: to_u32(self.hearts),
            phase_index: to_u32(self.phase_index),
            time_left_sec: to_u32(self.time_left_sec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::result::{determine_result, EndReason};
    use crate::game::stats::Stats;

    #[test]
    fn test_score_create_from_result() {
        let mut stats = Stats::new("Biken", 3);
        stats.on_kill();
        stats.on_hit_non_kill();
        let result = determine_result(&stats, 0, 0, EndReason::OutOfHearts);

        let dto = ScoreCreateDto::from(&result);
        assert_eq!(dto.player_name, "Biken");
        assert_eq!(dto.kills, 1);
        assert_eq!(dto.valid_hits, 2);
        assert_eq!(dto.duration_sec, 1);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["maxCombo"], 1);
        assert_eq!(json["punishmentHits"], 0);
    }

    #[test]
    fn test_score_create_duration_default() {
        let dto: ScoreCreateDto = serde_json::from_str(r#"{"playerName":"A","score":5}"#).unwrap();
        assert_eq!(dto.duration_sec, 60);
        assert_eq!(dto.kills, 0);
    }

    #[test]
    fn test_save_dto_to_resume() {
        let dto = SaveDto {
            id: 1,
            player_name: "Biken".into(),
            score: 150,
            kills: 3,
            max_combo: 3,
            valid_hits: 4,
            miss_clicks: -2,
            punishment_hits: 0,
            hearts: 2,
            phase_index: 1,
            time_left_sec: 0,
            created_at: 0,
            updated_at: 0,
        };
        let snapshot = dto.to_resume();
        assert_eq!(snapshot.score, 150);
        assert_eq!(snapshot.hearts, 2);
        assert_eq!(snapshot.phase_index, 1);
        assert_eq!(snapshot.miss_clicks, 0);

        let back = SaveSnapshotDto::from(&snapshot);
        assert_eq!(back.score, 150);
        assert_eq!(back.player_name, "Biken");
    }

    #[test]
    fn test_score_query_skips_empty_fields() {
        let query = ScoreQuery {
            player: Some("bik".into()),
            page_size: Some(10),
            ..ScoreQuery::default()
        };
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"player":"bik","pageSize":10}"#);
    }
}
