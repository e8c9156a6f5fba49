//! Run and phase configuration
//!
//! Loaded from a JSON file or built from defaults. Values outside their
//! allowed ranges are clamped by `validate`; structural problems (missing
//! phases, holes outside the grid) are reported as `ConfigError`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::game::constants::{grid, hearts, phases, spawn, timing};
use crate::game::grid::GridPos;
use crate::game::mole::MoleKind;

/// Configuration problems that abort session creation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Expected {expected} phases, found {found}")]
    PhaseCount { expected: usize, found: usize },
    #[error("Phase {phase} references hole ({x},{y}) outside the {width}x{height} grid")]
    HoleOutsideGrid {
        phase: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("Grid dimensions must be positive: {0}x{1}")]
    InvalidGrid(i32, i32),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Relative spawn chances for each mole kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnWeights {
    pub normal: f32,
    pub armored: f32,
    pub punishment: f32,
    #[serde(default)]
    pub heart: f32,
}

impl Default for SpawnWeights {
    fn default() -> Self {
        Self {
            normal: 0.8,
            armored: 0.2,
            punishment: 0.0,
            heart: 0.0,
        }
    }
}

impl SpawnWeights {
    /// Weights divided by their sum (sum floored at `MIN_WEIGHT_SUM`).
    /// Order: normal, armored, punishment, heart.
    pub fn normalized(&self) -> [f32; 4] {
        let raw = [
            self.normal.max(0.0),
            self.armored.max(0.0),
            self.punishment.max(0.0),
            self.heart.max(0.0),
        ];
        let sum = raw.iter().sum::<f32>().max(spawn::MIN_WEIGHT_SUM);
        raw.map(|w| w / sum)
    }

    /// Map a uniform draw in [0, 1) to a kind using cumulative thresholds.
    ///
    /// The first interval containing the draw wins. A draw past the last
    /// threshold (float rounding) falls back to the last kind with weight.
    pub fn pick(&self, draw: f32) -> MoleKind {
        const ORDER: [MoleKind; 4] = [
            MoleKind::Normal,
            MoleKind::Armored,
            MoleKind::Punishment,
            MoleKind::Heart,
        ];

        let weights = self.normalized();
        let mut threshold = 0.0;
        for (kind, weight) in ORDER.iter().zip(weights.iter()) {
            threshold += weight;
            if draw < threshold {
                return *kind;
            }
        }

        ORDER
            .iter()
            .zip(weights.iter())
            .rev()
            .find(|(_, w)| **w > 0.0)
            .map(|(k, _)| *k)
            .unwrap_or(MoleKind::Normal)
    }
}

/// One wave of play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseConfig {
    /// Holes used by this phase, grid coordinates
    pub active_holes: Vec<GridPos>,
    /// Seconds between spawn attempts
    pub spawn_interval: f32,
    /// Seconds a mole stays up
    pub lifetime: f32,
    /// Maximum live moles at once
    pub max_concurrent: i32,
    /// Total spawns for this phase; negative means infinite
    pub quota: i32,
    #[serde(default)]
    pub weights: SpawnWeights,
}

impl PhaseConfig {
    pub fn is_infinite(&self) -> bool {
        self.quota < 0
    }

    /// Spawn interval with the minimum applied
    pub fn effective_interval(&self) -> f32 {
        self.spawn_interval.max(spawn::MIN_INTERVAL)
    }

    /// Lifetime with the minimum applied
    pub fn effective_lifetime(&self) -> f32 {
        self.lifetime.max(spawn::MIN_LIFETIME)
    }

    /// Concurrency cap, never below one
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent.max(1) as usize
    }

    /// First phase: the centre four holes, one mole at a time
    pub fn default_phase1() -> Self {
        Self {
            active_holes: vec![
                GridPos::new(1, 0),
                GridPos::new(2, 0),
                GridPos::new(1, 1),
                GridPos::new(2, 1),
            ],
            spawn_interval: 1.0,
            lifetime: 1.2,
            max_concurrent: 1,
            quota: 10,
            weights: SpawnWeights::default(),
        }
    }

    /// Second phase: eight holes, faster, bombs appear
    pub fn default_phase2() -> Self {
        let mut holes = Vec::new();
        for y in 0..2 {
            for x in 0..grid::WIDTH {
                holes.push(GridPos::new(x, y));
            }
        }
        Self {
            active_holes: holes,
            spawn_interval: 0.8,
            lifetime: 1.0,
            max_concurrent: 2,
            quota: 20,
            weights: SpawnWeights {
                normal: 0.6,
                armored: 0.25,
                punishment: 0.15,
                heart: 0.0,
            },
        }
    }

    /// Third phase: whole grid, infinite
    pub fn default_phase3() -> Self {
        Self {
            active_holes: GridPos::all(grid::WIDTH, grid::HEIGHT),
            spawn_interval: 0.6,
            lifetime: 0.9,
            max_concurrent: 3,
            quota: -1,
            weights: SpawnWeights {
                normal: 0.55,
                armored: 0.25,
                punishment: 0.15,
                heart: 0.05,
            },
        }
    }
}

/// Whole-run configuration. Fields missing from a file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// Countdown mode; when false the run only ends on hearts
    pub timer_enabled: bool,
    /// Run length in timer mode (seconds)
    pub game_duration_sec: u32,
    /// Phases in play order
    pub phases: Vec<PhaseConfig>,
    pub grid_width: i32,
    pub grid_height: i32,
    pub hearts_max: u32,
    pub life_loss_on_miss: bool,
    pub life_loss_on_punishment: bool,
    pub life_loss_on_expire: bool,
    /// Hold duration to collect a heart (seconds)
    pub heart_hold_seconds: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            timer_enabled: true,
            game_duration_sec: timing::GAME_DURATION_SEC,
            phases: vec![
                PhaseConfig::default_phase1(),
                PhaseConfig::default_phase2(),
                PhaseConfig::default_phase3(),
            ],
            grid_width: grid::WIDTH,
            grid_height: grid::HEIGHT,
            hearts_max: hearts::MAX_DEFAULT,
            life_loss_on_miss: true,
            life_loss_on_punishment: true,
            life_loss_on_expire: false,
            heart_hold_seconds: hearts::HOLD_DEFAULT,
        }
    }
}

impl GameConfig {
    /// Load a config from a JSON file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config: GameConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded game config from {}", path.display());
        Ok(config)
    }

    /// Load from a path if given, otherwise defaults. Failures are logged
    /// and fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load(p).unwrap_or_else(|e| {
                warn!("Invalid game config at {}: {}. Using defaults.", p.display(), e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Clamp tunables into range and check structure
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.hearts_max = self.hearts_max.clamp(hearts::MAX_LOWER, hearts::MAX_UPPER);
        self.heart_hold_seconds = self
            .heart_hold_seconds
            .clamp(hearts::HOLD_MIN, hearts::HOLD_MAX);
        self.game_duration_sec = self.game_duration_sec.max(1);

        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(ConfigError::InvalidGrid(self.grid_width, self.grid_height));
        }

        if self.phases.len() != phases::COUNT {
            return Err(ConfigError::PhaseCount {
                expected: phases::COUNT,
                found: self.phases.len(),
            });
        }

        for (index, phase) in self.phases.iter().enumerate() {
            if let Some(bad) = phase
                .active_holes
                .iter()
                .find(|p| !p.within(self.grid_width, self.grid_height))
            {
                return Err(ConfigError::HoleOutsideGrid {
                    phase: index,
                    x: bad.x,
                    y: bad.y,
                    width: self.grid_width,
                    height: self.grid_height,
                });
            }
        }

        Ok(())
    }
}
