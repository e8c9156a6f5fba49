//! Game orchestrator
//!
//! Owns the stats, the hole grid and the active phase runner. The host calls
//! `tick` once per frame, `click` for each primary click and `hold` while the
//! pointer is held down; everything the renderer and HUD need comes back
//! through `drain_events`, `hud` and `result`.
//!
//! Run flow:
//!
//! ```text
//! Running --(timer 0 | hearts 0)--> Ending --(END_DELAY)--> Finished
//! ```
//!
//! The first end trigger wins; later triggers are ignored. A finite last
//! phase that drains leaves the run idle until the timer or hearts run out;
//! without a timer only hearts can end it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::game::config::{ConfigError, GameConfig};
use crate::game::constants::{phases, timing};
use crate::game::grid::{GridPos, HoleGrid};
use crate::game::mole::{Mole, MoleId, MoleKind, Outcome};
use crate::game::phase::{PhaseHit, PhaseRunner, PhaseState, Resolved};
use crate::game::result::{check_run_end, determine_result, EndReason, ResumeSnapshot, RunResult};
use crate::game::stats::Stats;
use crate::store::LocalStore;

/// What the pointer hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// A spawned mole/bomb/heart
    Entity(MoleId),
    /// The ground around the holes
    Ground,
    /// Any other collider
    Other,
}

/// How a click was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Pointer hit nothing; not a miss
    NoTarget,
    /// Click had no effect (heart, run over)
    Ignored,
    Kill,
    ArmorBroken,
    Punishment,
    Miss,
}

/// Notifications for the renderer/HUD
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    HoleVisibility { pos: GridPos, visible: bool },
    PhaseStarted { index: usize },
    PhaseCompleted { index: usize },
    MoleSpawned { id: MoleId, kind: MoleKind, hole: GridPos },
    ArmorBroken { id: MoleId, hole: GridPos },
    MoleDespawned { id: MoleId, hole: GridPos, outcome: Outcome },
    /// Live moles removed because the run ended
    MolesCleared { ids: Vec<MoleId> },
    HeartLost { hearts: u32 },
    HeartGained { hearts: u32 },
    TimerTick { time_left: u32 },
    RunEnded { reason: EndReason },
    ResultReady(RunResult),
}

/// Read-only HUD data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub player_name: String,
    pub score: u32,
    pub kills: u32,
    pub combo: u32,
    pub multiplier: f32,
    pub hearts: u32,
    pub hearts_max: u32,
    pub time_left: Option<u32>,
    pub phase_index: usize,
    pub paused: bool,
}

/// Receives the final result once per run
pub trait ResultSubmitter {
    fn submit(&mut self, result: &RunResult);
}

impl<F> ResultSubmitter for F
where
    F: FnMut(&RunResult),
{
    fn submit(&mut self, result: &RunResult) {
        self(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RunState {
    Running,
    Ending { reason: EndReason, delay: f32 },
    Finished { reason: EndReason },
}

/// Hold-to-collect progress on a heart
#[derive(Debug, Clone, Copy, Default)]
struct HeartHold {
    target: Option<MoleId>,
    held: f32,
}

impl HeartHold {
    fn reset(&mut self) {
        self.target = None;
        self.held = 0.0;
    }
}

/// One player run
pub struct GameSession<R: Rng = StdRng> {
    config: GameConfig,
    stats: Stats,
    grid: HoleGrid,
    phase_index: usize,
    runner: Option<PhaseRunner>,
    time_left: Option<u32>,
    timer_acc: f32,
    played: f32,
    time_scale: f32,
    state: RunState,
    result: Option<RunResult>,
    hold: HeartHold,
    next_id: MoleId,
    rng: R,
    events: Vec<GameEvent>,
    submitter: Option<Box<dyn ResultSubmitter + Send>>,
}

impl GameSession<StdRng> {
    /// New run with a seeded RNG
    pub fn with_seed(
        config: GameConfig,
        player_name: impl Into<String>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(config, player_name, StdRng::seed_from_u64(seed))
    }

    /// New run with an entropy-seeded RNG
    pub fn with_entropy(config: GameConfig, player_name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(config, player_name, StdRng::from_entropy())
    }
}

impl<R: Rng> GameSession<R> {
    /// Start a fresh run at phase 0
    pub fn new(config: GameConfig, player_name: impl Into<String>, rng: R) -> Result<Self, ConfigError> {
        let mut config = config;
        config.validate()?;
        let stats = Stats::new(player_name, config.hearts_max);
        let time_left = config.timer_enabled.then_some(config.game_duration_sec);
        Ok(Self::build(config, stats, 0, time_left, rng))
    }

    /// Continue a run from a snapshot
    pub fn resume(config: GameConfig, snapshot: &ResumeSnapshot, rng: R) -> Result<Self, ConfigError> {
        let mut config = config;
        config.validate()?;
        let stats = snapshot.to_stats(config.hearts_max);
        let phase_index = (snapshot.phase_index as usize).min(phases::COUNT - 1);
        let time_left = config.timer_enabled.then(|| {
            if snapshot.time_left_sec > 0 {
                snapshot.time_left_sec.min(config.game_duration_sec)
            } else {
                config.game_duration_sec
            }
        });
        info!(
            "Resuming run for '{}' at phase {} (score={}, hearts={})",
            stats.player_name, phase_index, stats.score, stats.hearts
        );
        Ok(Self::build(config, stats, phase_index, time_left, rng))
    }

    /// Resume the store's pending snapshot if there is one, otherwise start
    /// fresh under the saved player name
    pub fn from_store(config: GameConfig, store: &mut LocalStore, rng: R) -> Result<Self, ConfigError> {
        match store.take_resume() {
            Some(snapshot) => Self::resume(config, &snapshot, rng),
            None => Self::new(config, store.player_name(), rng),
        }
    }

    fn build(config: GameConfig, stats: Stats, phase_index: usize, time_left: Option<u32>, rng: R) -> Self {
        let grid = HoleGrid::build(config.grid_width, config.grid_height);
        let mut session = Self {
            config,
            stats,
            grid,
            phase_index,
            runner: None,
            time_left,
            timer_acc: 0.0,
            played: 0.0,
            time_scale: 1.0,
            state: RunState::Running,
            result: None,
            hold: HeartHold::default(),
            next_id: 1,
            rng,
            events: Vec::new(),
            submitter: None,
        };
        info!(
            "Run started for '{}' (timer={:?}, hearts={})",
            session.stats.player_name, session.time_left, session.stats.hearts
        );
        session.start_phase();
        session
    }

    /// Attach the collaborator that receives the final result
    pub fn set_submitter(&mut self, submitter: Box<dyn ResultSubmitter + Send>) {
        self.submitter = Some(submitter);
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn grid(&self) -> &HoleGrid {
        &self.grid
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn phase_state(&self) -> Option<PhaseState> {
        self.runner.as_ref().map(PhaseRunner::state)
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn live_moles(&self) -> &[Mole] {
        self.runner.as_ref().map(PhaseRunner::live).unwrap_or(&[])
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Finished { .. })
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self.state {
            RunState::Running => None,
            RunState::Ending { reason, .. } | RunState::Finished { reason } => Some(reason),
        }
    }

    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }

    /// Pause or unpause game time. Heart holds keep running on real time.
    pub fn set_paused(&mut self, paused: bool) {
        self.time_scale = if paused { 0.0 } else { 1.0 };
        debug!("Paused: {}", paused);
    }

    /// Take all events produced since the last call. Call once per frame.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            player_name: self.stats.player_name.clone(),
            score: self.stats.score,
            kills: self.stats.kills,
            combo: self.stats.combo,
            multiplier: self.stats.multiplier(),
            hearts: self.stats.hearts,
            hearts_max: self.stats.hearts_max,
            time_left: self.time_left,
            phase_index: self.phase_index,
            paused: self.is_paused(),
        }
    }

    /// Capture the current run for a later resume
    pub fn snapshot(&self) -> ResumeSnapshot {
        ResumeSnapshot::from_stats(
            &self.stats,
            self.phase_index as u32,
            self.time_left.unwrap_or(0),
        )
    }

    fn start_phase(&mut self) {
        let Some(phase) = self.config.phases.get(self.phase_index).cloned() else {
            return;
        };

        let mut runner = PhaseRunner::new(phase);
        for (pos, visible) in runner.start(&mut self.grid) {
            self.events.push(GameEvent::HoleVisibility { pos, visible });
        }
        self.runner = Some(runner);
        self.events.push(GameEvent::PhaseStarted {
            index: self.phase_index,
        });
        debug!("Phase {} started", self.phase_index + 1);
    }

    /// Advance the run by one frame of `dt` real seconds.
    ///
    /// Events accumulate until `drain_events` is called; hosts are expected
    /// to drain once per frame, the queue is not bounded.
    pub fn tick(&mut self, dt: f32) {
        let dt = dt * self.time_scale;

        match self.state {
            RunState::Running => {
                self.played += dt;
                self.tick_timer(dt);
                self.tick_phase(dt);
                self.check_end();
            }
            RunState::Ending { reason, delay } => {
                let delay = delay - dt;
                if delay <= 0.0 {
                    self.finish(reason);
                } else {
                    self.state = RunState::Ending { reason, delay };
                }
            }
            RunState::Finished { .. } => {}
        }
    }

    fn tick_timer(&mut self, dt: f32) {
        let Some(mut left) = self.time_left else {
            return;
        };

        self.timer_acc += dt;
        while self.timer_acc >= timing::TIMER_STEP && left > 0 {
            self.timer_acc -= timing::TIMER_STEP;
            left -= 1;
            self.events.push(GameEvent::TimerTick { time_left: left });
        }
        self.time_left = Some(left);
    }

    fn tick_phase(&mut self, dt: f32) {
        let tick = match self.runner.as_mut() {
            Some(runner) => runner.tick(dt, &mut self.grid, &mut self.rng, &mut self.next_id),
            None => return,
        };

        for resolved in &tick.expired {
            self.on_resolved(resolved);
        }

        if let Some(spawned) = tick.spawned {
            self.events.push(GameEvent::MoleSpawned {
                id: spawned.id,
                kind: spawned.kind,
                hole: spawned.hole,
            });
        }

        if tick.state == PhaseState::Done {
            self.events.push(GameEvent::PhaseCompleted {
                index: self.phase_index,
            });
            self.runner = None;
            if self.phase_index + 1 < self.config.phases.len() {
                self.phase_index += 1;
                self.start_phase();
            } else {
                debug!("All phases done, waiting for the run to end");
            }
        }
    }

    /// Apply the stat effects of a mole leaving play
    fn on_resolved(&mut self, resolved: &Resolved) {
        self.events.push(GameEvent::MoleDespawned {
            id: resolved.id,
            hole: resolved.hole,
            outcome: resolved.outcome,
        });

        if self.hold.target == Some(resolved.id) {
            self.hold.reset();
        }

        match resolved.outcome {
            Outcome::Killed => self.stats.on_kill(),
            Outcome::PunishmentClicked => {
                self.stats.on_punishment_clicked();
                if self.config.life_loss_on_punishment {
                    self.lose_heart();
                }
            }
            Outcome::Expired => {
                let is_target = matches!(resolved.spawned_as, MoleKind::Normal | MoleKind::Armored);
                if is_target && self.config.life_loss_on_expire {
                    self.lose_heart();
                }
            }
            Outcome::Consumed => {
                self.stats.gain_heart();
                self.events.push(GameEvent::HeartGained {
                    hearts: self.stats.hearts,
                });
            }
        }
    }

    fn lose_heart(&mut self) {
        self.stats.lose_heart();
        self.events.push(GameEvent::HeartLost {
            hearts: self.stats.hearts,
        });
    }

    fn miss(&mut self) -> ClickOutcome {
        self.stats.on_miss_ground();
        if self.config.life_loss_on_miss {
            self.lose_heart();
        }
        ClickOutcome::Miss
    }

    /// Resolve one primary click. `None` means the pointer hit nothing.
    pub fn click(&mut self, target: Option<ClickTarget>) -> ClickOutcome {
        if !self.is_running() {
            return ClickOutcome::Ignored;
        }

        let Some(target) = target else {
            return ClickOutcome::NoTarget;
        };

        let outcome = match target {
            ClickTarget::Entity(id) => self.click_entity(id),
            ClickTarget::Ground | ClickTarget::Other => self.miss(),
        };

        self.check_end();
        outcome
    }

    fn click_entity(&mut self, id: MoleId) -> ClickOutcome {
        let hit = match self.runner.as_mut() {
            Some(runner) => match runner.get(id).map(|m| m.kind) {
                Some(MoleKind::Heart) => return ClickOutcome::Ignored,
                Some(_) => runner.hit(id, &mut self.grid),
                None => None,
            },
            None => None,
        };

        match hit {
            Some(PhaseHit::ArmorBroken { id, hole }) => {
                self.stats.on_hit_non_kill();
                self.events.push(GameEvent::ArmorBroken { id, hole });
                ClickOutcome::ArmorBroken
            }
            Some(PhaseHit::Resolved(resolved)) => {
                self.on_resolved(&resolved);
                match resolved.outcome {
                    Outcome::Killed => ClickOutcome::Kill,
                    Outcome::PunishmentClicked => ClickOutcome::Punishment,
                    Outcome::Expired | Outcome::Consumed => ClickOutcome::Ignored,
                }
            }
            Some(PhaseHit::Ignored) => ClickOutcome::Ignored,
            // Target already gone: the click landed on whatever was behind it
            None => self.miss(),
        }
    }

    /// Feed the hold interaction. `target` is the entity under a held
    /// pointer (or `None` when released/off target); `dt` is real time.
    /// Returns true when a heart was collected.
    pub fn hold(&mut self, target: Option<MoleId>, dt: f32) -> bool {
        if !self.is_running() {
            self.hold.reset();
            return false;
        }

        let is_heart = target.is_some_and(|id| {
            self.runner
                .as_ref()
                .and_then(|r| r.get(id))
                .is_some_and(|m| m.kind == MoleKind::Heart)
        });

        let Some(id) = target.filter(|_| is_heart) else {
            self.hold.reset();
            return false;
        };

        if self.hold.target != Some(id) {
            self.hold.target = Some(id);
            self.hold.held = 0.0;
        }
        self.hold.held += dt;

        if self.hold.held < self.config.heart_hold_seconds {
            return false;
        }

        self.hold.reset();
        let consumed = match self.runner.as_mut() {
            Some(runner) => runner.consume(id, &mut self.grid),
            None => None,
        };
        match consumed {
            Some(resolved) => {
                self.on_resolved(&resolved);
                true
            }
            None => false,
        }
    }

    fn check_end(&mut self) {
        if let Some(reason) = check_run_end(&self.stats, self.time_left) {
            self.end_run(reason);
        }
    }

    /// Single end transition; only the first call has an effect
    fn end_run(&mut self, reason: EndReason) {
        if !self.is_running() {
            return;
        }

        self.state = RunState::Ending {
            reason,
            delay: timing::END_DELAY,
        };
        self.hold.reset();

        if let Some(runner) = self.runner.as_mut() {
            let ids = runner.clear(&mut self.grid);
            if !ids.is_empty() {
                self.events.push(GameEvent::MolesCleared { ids });
            }
        }

        self.events.push(GameEvent::RunEnded { reason });
        info!(
            "Run ended ({:?}): score={}, kills={}, hearts={}",
            reason, self.stats.score, self.stats.kills, self.stats.hearts
        );
    }

    fn duration_sec(&self) -> u32 {
        match self.time_left {
            Some(left) => self
                .config
                .game_duration_sec
                .saturating_sub(left)
                .min(self.config.game_duration_sec),
            None => self.played.round() as u32,
        }
    }

    fn finish(&mut self, reason: EndReason) {
        let result = determine_result(&self.stats, self.duration_sec(), self.phase_index, reason);
        self.state = RunState::Finished { reason };

        if let Some(submitter) = self.submitter.as_mut() {
            submitter.submit(&result);
        }

        self.events.push(GameEvent::ResultReady(result.clone()));
        self.result = Some(result);
    }
}
