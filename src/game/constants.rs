/// Scoring constants
pub mod scoring {
    /// Base points for a kill (before multiplier)
    pub const KILL_POINTS: f32 = 100.0;
    /// Points lost for clicking the ground or a non-target
    pub const MISS_PENALTY: u32 = 100;
    /// Points lost for clicking a punishment (bomb)
    pub const PUNISHMENT_PENALTY: u32 = 200;
    /// Combo length per multiplier tier
    pub const COMBO_PER_TIER: u32 = 10;
    /// Multiplier gained per tier
    pub const MULTIPLIER_STEP: f32 = 0.5;
    /// Multiplier floor
    pub const MULTIPLIER_MIN: f32 = 1.0;
    /// Multiplier cap
    pub const MULTIPLIER_MAX: f32 = 5.0;
}

/// Grid constants
pub mod grid {
    /// Default number of columns
    pub const WIDTH: i32 = 4;
    /// Default number of rows
    pub const HEIGHT: i32 = 3;
}

/// Spawn timing constants
pub mod spawn {
    /// Shortest spawn interval a phase may use (seconds)
    pub const MIN_INTERVAL: f32 = 0.05;
    /// Shortest lifetime a mole may have (seconds)
    pub const MIN_LIFETIME: f32 = 0.1;
    /// Floor for the weight sum so normalisation never divides by zero
    pub const MIN_WEIGHT_SUM: f32 = 0.0001;
    /// Inline capacity for the live mole set
    pub const LIVE_INLINE: usize = 8;
}

/// Run timing constants
pub mod timing {
    /// Default run length in timer mode (seconds)
    pub const GAME_DURATION_SEC: u32 = 60;
    /// Countdown step (seconds)
    pub const TIMER_STEP: f32 = 1.0;
    /// Delay between the end trigger and the result being assembled
    pub const END_DELAY: f32 = 0.3;
}

/// Hearts (lives) constants
pub mod hearts {
    /// Default maximum hearts
    pub const MAX_DEFAULT: u32 = 3;
    /// Lowest configurable maximum
    pub const MAX_LOWER: u32 = 1;
    /// Highest configurable maximum
    pub const MAX_UPPER: u32 = 10;
    /// Default hold time to collect a heart (seconds)
    pub const HOLD_DEFAULT: f32 = 1.0;
    /// Hold time bounds (seconds)
    pub const HOLD_MIN: f32 = 0.1;
    pub const HOLD_MAX: f32 = 3.0;
}

/// Phase sequencing constants
pub mod phases {
    /// Number of scripted phases in a run
    pub const COUNT: usize = 3;
    /// Highest valid phase index
    pub const LAST_INDEX: u32 = (COUNT - 1) as u32;
}

/// Player name constants
pub mod player {
    /// Maximum name length (characters, after trimming)
    pub const NAME_MAX_LEN: usize = 20;
    /// Name used when nothing is stored
    pub const DEFAULT_NAME: &str = "Player";
}

/// Leaderboard constants
pub mod leaderboard {
    /// Largest top-N request
    pub const TOP_MAX: i64 = 100;
    /// Largest page size for list queries
    pub const PAGE_SIZE_MAX: i64 = 100;
    /// Default page size for list queries
    pub const PAGE_SIZE_DEFAULT: i64 = 20;
    /// Default ordering for list queries
    pub const DEFAULT_SORT: &str = "-score,-kills,-maxCombo,-createdAt";
}

/// Combo multiplier for a given combo length
#[inline]
pub fn multiplier_for_combo(combo: u32) -> f32 {
    let tier = combo / scoring::COMBO_PER_TIER;
    let mult = scoring::MULTIPLIER_MIN + scoring::MULTIPLIER_STEP * tier as f32;
    mult.clamp(scoring::MULTIPLIER_MIN, scoring::MULTIPLIER_MAX)
}

/// Check whether a player name is acceptable (trimmed, 1..=20 chars)
pub fn is_valid_player_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= player::NAME_MAX_LEN
}
