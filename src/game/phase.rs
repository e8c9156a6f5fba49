//! Phase runner
//!
//! Drives one phase: Idle -> Spawning -> Draining -> Done.
//!
//! While spawning, an interval accumulator gates spawn attempts. An attempt
//! succeeds when the live count is under the concurrency cap and a free
//! active hole exists. Finite phases stop spawning at their quota and finish
//! once every live mole has resolved.

use rand::Rng;
use smallvec::SmallVec;
use tracing::debug;

use crate::game::config::PhaseConfig;
use crate::game::constants::spawn;
use crate::game::grid::{GridPos, HoleGrid};
use crate::game::mole::{HitResult, Mole, MoleId, MoleKind, Outcome};

/// Phase lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    Idle,
    Spawning,
    Draining,
    Done,
}

/// A mole created this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub id: MoleId,
    pub kind: MoleKind,
    pub hole: GridPos,
}

/// A mole that reached its terminal outcome and was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: MoleId,
    /// Kind at resolution time
    pub kind: MoleKind,
    pub spawned_as: MoleKind,
    pub hole: GridPos,
    pub outcome: Outcome,
}

impl Resolved {
    fn from_mole(mole: &Mole, outcome: Outcome) -> Self {
        Self {
            id: mole.id,
            kind: mole.kind,
            spawned_as: mole.spawned_as,
            hole: mole.hole,
            outcome,
        }
    }
}

/// What happened during one runner tick
#[derive(Debug, Clone)]
pub struct PhaseTick {
    pub spawned: Option<Spawned>,
    pub expired: SmallVec<[Resolved; 4]>,
    pub state: PhaseState,
}

/// Hit handed to a live mole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseHit {
    ArmorBroken { id: MoleId, hole: GridPos },
    Resolved(Resolved),
    Ignored,
}

/// Runs a single phase to completion
#[derive(Debug, Clone)]
pub struct PhaseRunner {
    config: PhaseConfig,
    state: PhaseState,
    elapsed: f32,
    spawned_count: u32,
    resolved_count: u32,
    live: SmallVec<[Mole; spawn::LIVE_INLINE]>,
}

impl PhaseRunner {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            state: PhaseState::Idle,
            elapsed: 0.0,
            spawned_count: 0,
            resolved_count: 0,
            live: SmallVec::new(),
        }
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == PhaseState::Done
    }

    pub fn spawned_count(&self) -> u32 {
        self.spawned_count
    }

    pub fn resolved_count(&self) -> u32 {
        self.resolved_count
    }

    pub fn live(&self) -> &[Mole] {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn get(&self, id: MoleId) -> Option<&Mole> {
        self.live.iter().find(|m| m.id == id)
    }

    fn quota_reached(&self) -> bool {
        !self.config.is_infinite() && self.spawned_count >= self.config.quota as u32
    }

    /// Idle -> Spawning. Shows only this phase's holes and resets counters.
    /// Returns the hole visibility changes.
    pub fn start(&mut self, grid: &mut HoleGrid) -> Vec<(GridPos, bool)> {
        self.state = PhaseState::Spawning;
        self.elapsed = 0.0;
        self.spawned_count = 0;
        self.resolved_count = 0;
        debug!(
            "Phase start: {} holes, interval={}s, quota={}",
            self.config.active_holes.len(),
            self.config.effective_interval(),
            self.config.quota
        );
        grid.show_only(&self.config.active_holes)
    }

    /// Advance the phase by `dt` seconds of game time
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        grid: &mut HoleGrid,
        rng: &mut R,
        next_id: &mut MoleId,
    ) -> PhaseTick {
        let mut tick = PhaseTick {
            spawned: None,
            expired: SmallVec::new(),
            state: self.state,
        };

        if !matches!(self.state, PhaseState::Spawning | PhaseState::Draining) {
            return tick;
        }

        // Age live moles
        for mole in self.live.iter_mut() {
            if let Some(outcome) = mole.tick(dt) {
                tick.expired.push(Resolved::from_mole(mole, outcome));
            }
        }
        for resolved in &tick.expired {
            grid.vacate(resolved.hole, resolved.id);
        }
        self.resolved_count += tick.expired.len() as u32;
        self.live.retain(|m| m.is_alive());

        if self.state == PhaseState::Spawning {
            if self.quota_reached() {
                self.state = PhaseState::Draining;
            } else {
                self.elapsed += dt;
                if self.elapsed >= self.config.effective_interval() {
                    self.elapsed = 0.0;
                    tick.spawned = self.try_spawn(grid, rng, next_id);
                }
            }
        }

        self.settle();
        tick.state = self.state;
        tick
    }

    fn try_spawn<R: Rng + ?Sized>(
        &mut self,
        grid: &mut HoleGrid,
        rng: &mut R,
        next_id: &mut MoleId,
    ) -> Option<Spawned> {
        if self.live.len() >= self.config.effective_max_concurrent() {
            return None;
        }

        let hole = grid.random_free(&self.config.active_holes, rng)?;
        let kind = self.config.weights.pick(rng.gen::<f32>());

        let id = *next_id;
        if !grid.occupy(hole, id) {
            return None;
        }
        *next_id += 1;

        self.live
            .push(Mole::new(id, kind, hole, self.config.effective_lifetime()));
        self.spawned_count += 1;

        Some(Spawned { id, kind, hole })
    }

    /// Draining -> Done once nothing is live
    fn settle(&mut self) {
        if self.state == PhaseState::Draining && self.live.is_empty() {
            self.state = PhaseState::Done;
            debug!(
                "Phase done: spawned={}, resolved={}",
                self.spawned_count, self.resolved_count
            );
        }
    }

    fn remove(&mut self, id: MoleId, outcome: Outcome, grid: &mut HoleGrid) -> Option<Resolved> {
        let index = self.live.iter().position(|m| m.id == id)?;
        let mole = self.live.remove(index);
        grid.vacate(mole.hole, mole.id);
        self.resolved_count += 1;
        self.settle();
        Some(Resolved::from_mole(&mole, outcome))
    }

    /// Deliver a pointer hit to a live mole
    pub fn hit(&mut self, id: MoleId, grid: &mut HoleGrid) -> Option<PhaseHit> {
        let mole = self.live.iter_mut().find(|m| m.id == id)?;
        let hole = mole.hole;
        Some(match mole.hit() {
            HitResult::Ignored => PhaseHit::Ignored,
            HitResult::ArmorBroken => PhaseHit::ArmorBroken { id, hole },
            HitResult::Resolved(outcome) => match self.remove(id, outcome, grid) {
                Some(resolved) => PhaseHit::Resolved(resolved),
                None => PhaseHit::Ignored,
            },
        })
    }

    /// Collect a heart through the hold interaction
    pub fn consume(&mut self, id: MoleId, grid: &mut HoleGrid) -> Option<Resolved> {
        let outcome = self.live.iter_mut().find(|m| m.id == id)?.consume()?;
        self.remove(id, outcome, grid)
    }

    /// Drop every live mole without an outcome (run ended)
    pub fn clear(&mut self, grid: &mut HoleGrid) -> Vec<MoleId> {
        let ids = self.live.iter().map(|m| m.id).collect();
        for mole in self.live.drain(..) {
            grid.vacate(mole.hole, mole.id);
        }
        ids
    }
}
