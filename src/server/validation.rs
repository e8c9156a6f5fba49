//! Request validation for scores and saves
//!
//! Score submissions are rejected on the first violation. Save snapshots are
//! lenient: only the name is checked, numbers are clamped into range.

use crate::game::constants::{is_valid_player_name, phases};
use crate::net::dto::{SaveSnapshotDto, ScoreCreateDto};

/// Reasons a request body is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("PlayerName is required and must be ≤ 20 characters.")]
    PlayerName,
    #[error("Numbers must be non-negative; durationSec must be > 0.")]
    NegativeValues,
    #[error("ValidHits must be ≥ Kills (armored moles need extra hits).")]
    HitsBelowKills,
}

impl Violation {
    /// Field name reported in the error body
    pub fn field(&self) -> &'static str {
        match self {
            Violation::PlayerName => "playerName",
            Violation::NegativeValues => "values",
            Violation::HitsBelowKills => "validHits",
        }
    }
}

/// Score fields after validation, with server-computed accuracy
#[derive(Debug, Clone, PartialEq)]
pub struct ValidScore {
    pub player_name: String,
    pub score: i64,
    pub kills: i64,
    pub max_combo: i64,
    pub accuracy: f64,
    pub duration_sec: i64,
    pub valid_hits: i64,
    pub miss_clicks: i64,
    pub punishment_hits: i64,
}

/// Save fields after clamping
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSave {
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

/// validHits / (validHits + missClicks + punishmentHits), 0 when nothing was clicked
pub fn accuracy(valid_hits: i64, miss_clicks: i64, punishment_hits: i64) -> f64 {
    let den = valid_hits + miss_clicks + punishment_hits;
    if den <= 0 {
        return 0.0;
    }
    valid_hits as f64 / den as f64
}

/// Trimmed player name, or a violation if empty or too long
pub fn normalize_name(raw: &str) -> Result<String, Violation> {
    if !is_valid_player_name(raw) {
        return Err(Violation::PlayerName);
    }
    Ok(raw.trim().to_string())
}

pub fn validate_score(dto: &ScoreCreateDto) -> Result<ValidScore, Violation> {
    let player_name = normalize_name(&dto.player_name)?;

    let any_negative = [
        dto.score,
        dto.kills,
        dto.max_combo,
        dto.valid_hits,
        dto.miss_clicks,
        dto.punishment_hits,
    ]
    .iter()
    .any(|v| *v < 0);
    if any_negative || dto.duration_sec <= 0 {
        return Err(Violation::NegativeValues);
    }

    if dto.valid_hits < dto.kills {
        return Err(Violation::HitsBelowKills);
    }

    Ok(ValidScore {
        player_name,
        score: dto.score,
        kills: dto.kills,
        max_combo: dto.max_combo,
        accuracy: accuracy(dto.valid_hits, dto.miss_clicks, dto.punishment_hits),
        duration_sec: dto.duration_sec,
        valid_hits: dto.valid_hits,
        miss_clicks: dto.miss_clicks,
        punishment_hits: dto.punishment_hits,
    })
}

pub fn sanitize_save(dto: &SaveSnapshotDto) -> Result<ValidSave, Violation> {
    let player_name = normalize_name(&dto.player_name)?;

    Ok(ValidSave {
        player_name,
        score: dto.score.max(0),
        kills: dto.kills.max(0),
        max_combo: dto.max_combo.max(0),
        valid_hits: dto.valid_hits.max(0),
        miss_clicks: dto.miss_clicks.max(0),
        punishment_hits: dto.punishment_hits.max(0),
        hearts: dto.hearts.max(0),
        phase_index: dto.phase_index.clamp(0, phases::LAST_INDEX as i64),
        time_left_sec: dto.time_left_sec.max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score() -> ScoreCreateDto {
        ScoreCreateDto {
            player_name: " Biken ".into(),
            score: 1200,
            kills: 10,
            max_combo: 8,
            duration_sec: 60,
            valid_hits: 12,
            miss_clicks: 2,
            punishment_hits: 1,
        }
    }

    #[test]
    fn test_valid_score() {
        let valid = validate_score(&score()).unwrap();
        assert_eq!(valid.player_name, "Biken");
        assert!((valid.accuracy - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_name_rules() {
        let mut dto = score();
        dto.player_name = "   ".into();
        assert_eq!(validate_score(&dto), Err(Violation::PlayerName));
        dto.player_name = "x".repeat(21);
        assert_eq!(validate_score(&dto), Err(Violation::PlayerName));
        dto.player_name = "x".repeat(20);
        assert!(validate_score(&dto).is_ok());
    }

    #[test]
    fn test_negative_and_duration() {
        let mut dto = score();
        dto.miss_clicks = -1;
        assert_eq!(validate_score(&dto), Err(Violation::NegativeValues));

        let mut dto = score();
        dto.duration_sec = 0;
        assert_eq!(validate_score(&dto).unwrap_err().field(), "values");
    }

    #[test]
    fn test_hits_below_kills() {
        let mut dto = score();
        dto.valid_hits = 9;
        let err = validate_score(&dto).unwrap_err();
        assert_eq!(err, Violation::HitsBelowKills);
        assert_eq!(err.field(), "validHits");
    }

    #[test]
    fn test_name_checked_before_values() {
        let mut dto = score();
        dto.player_name = String::new();
        dto.score = -5;
        assert_eq!(validate_score(&dto), Err(Violation::PlayerName));
    }

    #[test]
    fn test_accuracy_empty() {
        assert_eq!(accuracy(0, 0, 0), 0.0);
        assert_eq!(accuracy(3, 0, 1), 0.75);
    }

    #[test]
    fn test_sanitize_save_clamps() {
        let dto = SaveSnapshotDto {
            player_name: "Rina".into(),
            score: -10,
            hearts: -1,
            phase_index: 7,
            time_left_sec: -3,
            ..SaveSnapshotDto::default()
        };
        let save = sanitize_save(&dto).unwrap();
        assert_eq!(save.score, 0);
        assert_eq!(save.hearts, 0);
        assert_eq!(save.phase_index, 2);
        assert_eq!(save.time_left_sec, 0);

        let dto = SaveSnapshotDto {
            phase_index: -4,
            ..dto
        };
        assert_eq!(sanitize_save(&dto).unwrap().phase_index, 0);
    }

    #[test]
    fn test_sanitize_save_rejects_name() {
        let dto = SaveSnapshotDto::default();
        assert_eq!(sanitize_save(&dto), Err(Violation::PlayerName));
    }
}
