//! Spawned mole state machine
//!
//! Alive -> Resolved(outcome). A mole resolves exactly once, either by
//! running out of lifetime or by hit handling; the owner drops it right
//! after reading the outcome.

use serde::{Deserialize, Serialize};

use crate::game::grid::GridPos;

/// Identifier of a spawned mole
pub type MoleId = u64;

/// Kind of spawned entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoleKind {
    Normal,
    Armored,
    Punishment,
    Heart,
}

/// Terminal outcome of a mole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Killed,
    Expired,
    PunishmentClicked,
    /// Heart collected through the hold interaction
    Consumed,
}

impl Outcome {
    /// `(killed, punishment)` pair reported to the owner
    pub fn flags(self) -> (bool, bool) {
        match self {
            Outcome::Killed => (true, false),
            Outcome::PunishmentClicked => (false, true),
            Outcome::Expired | Outcome::Consumed => (false, false),
        }
    }
}

/// Result of a hit on a mole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    /// Hit had no effect (hearts, or already resolved)
    Ignored,
    /// Armor removed; the mole is still alive
    ArmorBroken,
    Resolved(Outcome),
}

/// A live mole in a hole
#[derive(Debug, Clone)]
pub struct Mole {
    pub id: MoleId,
    pub kind: MoleKind,
    /// Kind at spawn time (armored moles turn normal once their armor breaks)
    pub spawned_as: MoleKind,
    pub hole: GridPos,
    armor: u8,
    lifetime: f32,
    outcome: Option<Outcome>,
}

impl Mole {
    pub fn new(id: MoleId, kind: MoleKind, hole: GridPos, lifetime: f32) -> Self {
        Self {
            id,
            kind,
            spawned_as: kind,
            hole,
            armor: if kind == MoleKind::Armored { 1 } else { 0 },
            lifetime,
            outcome: None,
        }
    }

    pub fn armor(&self) -> u8 {
        self.armor
    }

    pub fn lifetime_left(&self) -> f32 {
        self.lifetime
    }

    pub fn is_alive(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn resolve(&mut self, outcome: Outcome) -> Outcome {
        self.outcome = Some(outcome);
        outcome
    }

    /// Advance the lifetime countdown. Returns `Expired` once, when it hits zero.
    pub fn tick(&mut self, dt: f32) -> Option<Outcome> {
        if !self.is_alive() {
            return None;
        }
        self.lifetime -= dt;
        if self.lifetime <= 0.0 {
            self.lifetime = 0.0;
            return Some(self.resolve(Outcome::Expired));
        }
        None
    }

    /// Handle a pointer hit
    pub fn hit(&mut self) -> HitResult {
        if !self.is_alive() {
            return HitResult::Ignored;
        }

        match self.kind {
            // Hearts are collected by holding, not clicking
            MoleKind::Heart => HitResult::Ignored,
            MoleKind::Punishment => HitResult::Resolved(self.resolve(Outcome::PunishmentClicked)),
            MoleKind::Armored if self.armor > 0 => {
                self.armor = 0;
                self.kind = MoleKind::Normal;
                HitResult::ArmorBroken
            }
            MoleKind::Armored | MoleKind::Normal => HitResult::Resolved(self.resolve(Outcome::Killed)),
        }
    }

    /// Collect a heart. Only hearts can be consumed.
    pub fn consume(&mut self) -> Option<Outcome> {
        if self.is_alive() && self.kind == MoleKind::Heart {
            Some(self.resolve(Outcome::Consumed))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mole(kind: MoleKind) -> Mole {
        Mole::new(1, kind, GridPos::new(0, 0), 1.0)
    }

    #[test]
    fn test_normal_killed_by_one_hit() {
        let mut m = mole(MoleKind::Normal);
        assert_eq!(m.hit(), HitResult::Resolved(Outcome::Killed));
        assert!(!m.is_alive());
        assert_eq!(m.hit(), HitResult::Ignored);
    }

    #[test]
    fn test_armored_needs_two_hits() {
        let mut m = mole(MoleKind::Armored);
        assert_eq!(m.armor(), 1);
        assert_eq!(m.hit(), HitResult::ArmorBroken);
        assert!(m.is_alive());
        assert_eq!(m.kind, MoleKind::Normal);
        assert_eq!(m.spawned_as, MoleKind::Armored);
        assert_eq!(m.hit(), HitResult::Resolved(Outcome::Killed));
    }

    #[test]
    fn test_punishment_hit() {
        let mut m = mole(MoleKind::Punishment);
        let result = m.hit();
        assert_eq!(result, HitResult::Resolved(Outcome::PunishmentClicked));
        assert_eq!(Outcome::PunishmentClicked.flags(), (false, true));
    }

    #[test]
    fn test_heart_ignores_clicks_but_can_be_consumed() {
        let mut m = mole(MoleKind::Heart);
        assert_eq!(m.hit(), HitResult::Ignored);
        assert!(m.is_alive());
        assert_eq!(m.consume(), Some(Outcome::Consumed));
        assert_eq!(m.consume(), None);
        assert_eq!(Outcome::Consumed.flags(), (false, false));
    }

    #[test]
    fn test_only_hearts_consumable() {
        let mut m = mole(MoleKind::Normal);
        assert_eq!(m.consume(), None);
        assert!(m.is_alive());
    }

    #[test]
    fn test_expires_once() {
        let mut m = mole(MoleKind::Normal);
        assert_eq!(m.tick(0.6), None);
        assert_eq!(m.tick(0.6), Some(Outcome::Expired));
        assert_eq!(m.tick(0.6), None);
        assert_eq!(m.hit(), HitResult::Ignored);
        assert_eq!(Outcome::Expired.flags(), (false, false));
    }

    #[test]
    fn test_hit_after_armor_break_before_expiry() {
        let mut m = mole(MoleKind::Armored);
        m.hit();
        assert_eq!(m.tick(0.5), None);
        assert_eq!(m.hit(), HitResult::Resolved(Outcome::Killed));
        assert_eq!(m.tick(1.0), None);
        assert_eq!(m.outcome(), Some(Outcome::Killed));
    }
}
