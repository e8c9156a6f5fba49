//! Run result and resume snapshot
//!
//! Computes the end-of-run payload and decides when a run has to end.

use serde::{Deserialize, Serialize};

use crate::game::stats::Stats;

/// Reason why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Countdown reached zero
    TimeUp,
    /// Hearts reached zero
    OutOfHearts,
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub player_name: String,
    pub score: u32,
    pub kills: u32,
    pub max_combo: u32,
    pub accuracy: f32,
    pub valid_hits: u32,
    pub miss_clicks: u32,
    pub punishment_hits: u32,
    pub hearts_left: u32,
    /// Seconds played, never below 1
    pub duration_sec: u32,
    pub phase_index: usize,
    pub reason: EndReason,
}

impl RunResult {
    /// Accuracy as a whole percentage for display
    pub fn accuracy_percent(&self) -> u32 {
        (self.accuracy * 100.0).round() as u32
    }
}

/// Build the result from the final stats
pub fn determine_result(
    stats: &Stats,
    duration_sec: u32,
    phase_index: usize,
    reason: EndReason,
) -> RunResult {
    RunResult {
        player_name: stats.player_name.clone(),
        score: stats.score,
        kills: stats.kills,
        max_combo: stats.max_combo,
        accuracy: stats.accuracy(),
        valid_hits: stats.valid_hits,
        miss_clicks: stats.miss_clicks,
        punishment_hits: stats.punishment_hits,
        hearts_left: stats.hearts,
        duration_sec: duration_sec.max(1),
        phase_index,
        reason,
    }
}

/// Check if the run should end
///
/// Hearts take priority over the timer when both trip on the same tick.
/// Running out of phases never ends a run on its own.
pub fn check_run_end(stats: &Stats, time_left: Option<u32>) -> Option<EndReason> {
    if stats.hearts == 0 {
        return Some(EndReason::OutOfHearts);
    }

    if time_left == Some(0) {
        return Some(EndReason::TimeUp);
    }

    None
}

/// State needed to continue an interrupted run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSnapshot {
    pub player_name: String,
    pub score: u32,
    pub kills: u32,
    pub max_combo: u32,
    pub valid_hits: u32,
    pub miss_clicks: u32,
    pub punishment_hits: u32,
    pub hearts: u32,
    /// Phase to resume at (0-based)
    pub phase_index: u32,
    /// Countdown left; 0 when the run has no timer
    #[serde(default)]
    pub time_left_sec: u32,
}

impl ResumeSnapshot {
    /// Capture the stats part of a snapshot
    pub fn from_stats(stats: &Stats, phase_index: u32, time_left_sec: u32) -> Self {
        Self {
            player_name: stats.player_name.clone(),
            score: stats.score,
            kills: stats.kills,
            max_combo: stats.max_combo,
            valid_hits: stats.valid_hits,
            miss_clicks: stats.miss_clicks,
            punishment_hits: stats.punishment_hits,
            hearts: stats.hearts,
            phase_index,
            time_left_sec,
        }
    }

    /// Rebuild stats from the snapshot. Combo restarts at zero; hearts are
    /// clamped to 1..=hearts_max.
    pub fn to_stats(&self, hearts_max: u32) -> Stats {
        let mut stats = Stats::new(self.player_name.clone(), hearts_max);
        stats.score = self.score;
        stats.kills = self.kills;
        stats.max_combo = self.max_combo;
        stats.valid_hits = self.valid_hits;
        stats.miss_clicks = self.miss_clicks;
        stats.punishment_hits = self.punishment_hits;
        stats.hearts = self.hearts.clamp(1, hearts_max.max(1));
        stats
    }
}
