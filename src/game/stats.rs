//! Per-run statistics
//!
//! Score, combo, hit counters and hearts. Every transition is plain
//! arithmetic and is called exactly once per triggering event.

use serde::{Deserialize, Serialize};

use crate::game::constants::{multiplier_for_combo, scoring};

/// Running statistics for one player run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub player_name: String,
    pub score: u32,
    pub kills: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub valid_hits: u32,
    pub miss_clicks: u32,
    pub punishment_hits: u32,
    pub hearts: u32,
    pub hearts_max: u32,
}

impl Stats {
    pub fn new(player_name: impl Into<String>, hearts_max: u32) -> Self {
        Self {
            player_name: player_name.into(),
            score: 0,
            kills: 0,
            combo: 0,
            max_combo: 0,
            valid_hits: 0,
            miss_clicks: 0,
            punishment_hits: 0,
            hearts: hearts_max,
            hearts_max,
        }
    }

    /// Fraction of clicks that were valid hits (0 when nothing was clicked)
    pub fn accuracy(&self) -> f32 {
        let den = self.valid_hits + self.miss_clicks + self.punishment_hits;
        if den == 0 {
            return 0.0;
        }
        self.valid_hits as f32 / den as f32
    }

    /// Current combo multiplier
    #[inline]
    pub fn multiplier(&self) -> f32 {
        multiplier_for_combo(self.combo)
    }

    /// Mole killed
    pub fn on_kill(&mut self) {
        self.kills += 1;
        self.valid_hits += 1;
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);

        let gained = (scoring::KILL_POINTS * self.multiplier()).round() as u32;
        self.score = self.score.saturating_add(gained);
    }

    /// Armor broken without a kill. Counts as a valid hit, nothing else.
    pub fn on_hit_non_kill(&mut self) {
        self.valid_hits += 1;
    }

    /// Ground or non-target clicked
    pub fn on_miss_ground(&mut self) {
        self.miss_clicks += 1;
        self.combo = 0;
        self.score = self.score.saturating_sub(scoring::MISS_PENALTY);
    }

    /// Punishment (bomb) clicked
    pub fn on_punishment_clicked(&mut self) {
        self.punishment_hits += 1;
        self.combo = 0;
        self.score = self.score.saturating_sub(scoring::PUNISHMENT_PENALTY);
    }

    /// Remove one heart. Returns true when no hearts remain.
    pub fn lose_heart(&mut self) -> bool {
        self.hearts = self.hearts.saturating_sub(1);
        self.hearts == 0
    }

    /// Restore one heart, capped at the maximum
    pub fn gain_heart(&mut self) {
        self.hearts = (self.hearts + 1).min(self.hearts_max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Stats {
        Stats::new("Tester", 3)
    }

    #[test]
    fn test_new_stats() {
        let s = stats();
        assert_eq!(s.score, 0);
        assert_eq!(s.hearts, 3);
        assert_eq!(s.accuracy(), 0.0);
        assert_eq!(s.multiplier(), 1.0);
    }

    #[test]
    fn test_kill_scoring() {
        let mut s = stats();
        s.on_kill();
        assert_eq!(s.score, 100);
        assert_eq!(s.kills, 1);
        assert_eq!(s.valid_hits, 1);
        assert_eq!(s.combo, 1);
        assert_eq!(s.max_combo, 1);
    }

    #[test]
    fn test_combo_monotonic_until_miss() {
        let mut s = stats();
        let mut prev_combo = 0;
        let mut prev_max = 0;
        for _ in 0..35 {
            s.on_kill();
            assert!(s.combo > prev_combo);
            assert!(s.max_combo >= prev_max);
            prev_combo = s.combo;
            prev_max = s.max_combo;
        }

        s.on_miss_ground();
        assert_eq!(s.combo, 0);
        assert_eq!(s.max_combo, 35);

        s.on_kill();
        assert_eq!(s.max_combo, 35);
    }

    #[test]
    fn test_multiplier_at_combo_23() {
        let mut s = stats();
        for _ in 0..23 {
            s.on_kill();
        }
        assert_eq!(s.multiplier(), 2.0);

        let before = s.score;
        s.on_kill();
        assert_eq!(s.score - before, 200);
    }

    #[test]
    fn test_score_never_negative() {
        let mut s = stats();
        s.on_kill();
        s.on_punishment_clicked();
        assert_eq!(s.score, 0);
        s.on_miss_ground();
        s.on_miss_ground();
        s.on_punishment_clicked();
        assert_eq!(s.score, 0);
    }

    #[test]
    fn test_hit_non_kill_keeps_combo() {
        let mut s = stats();
        s.on_kill();
        s.on_hit_non_kill();
        assert_eq!(s.combo, 1);
        assert_eq!(s.valid_hits, 2);
        assert_eq!(s.score, 100);
    }

    #[test]
    fn test_accuracy() {
        let mut s = stats();
        s.on_kill();
        s.on_kill();
        s.on_hit_non_kill();
        s.on_miss_ground();
        assert!((s.accuracy() - 0.75).abs() < 1e-6);

        s.on_punishment_clicked();
        let acc = s.accuracy();
        assert!((0.0..=1.0).contains(&acc));
        assert!((acc - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_hearts() {
        let mut s = stats();
        s.gain_heart();
        assert_eq!(s.hearts, 3);
        assert!(!s.lose_heart());
        assert!(!s.lose_heart());
        assert!(s.lose_heart());
        assert!(s.lose_heart());
        assert_eq!(s.hearts, 0);
        s.gain_heart();
        assert_eq!(s.hearts, 1);
    }
}
