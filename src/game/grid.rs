//! Hole registry
//!
//! Every cell of the grid gets a hole at run start. Holes are never
//! destroyed during a run; phases only toggle their visibility. Each hole
//! also records which mole (if any) currently occupies it.

use hashbrown::{HashMap, HashSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::mole::MoleId;

/// Grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// All coordinates of a `width` x `height` grid, row by row
    pub fn all(width: i32, height: i32) -> Vec<GridPos> {
        (0..height)
            .flat_map(|y| (0..width).map(move |x| GridPos::new(x, y)))
            .collect()
    }

    pub fn within(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < width && self.y < height
    }
}

/// One hole in the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hole {
    pub pos: GridPos,
    pub visible: bool,
    pub occupant: Option<MoleId>,
}

impl Hole {
    fn new(pos: GridPos) -> Self {
        Self {
            pos,
            visible: false,
            occupant: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// All holes of the play field
#[derive(Debug, Clone)]
pub struct HoleGrid {
    width: i32,
    height: i32,
    holes: HashMap<GridPos, Hole>,
}

impl HoleGrid {
    /// Build every hole of the grid, all hidden
    pub fn build(width: i32, height: i32) -> Self {
        let holes = GridPos::all(width, height)
            .into_iter()
            .map(|pos| (pos, Hole::new(pos)))
            .collect();
        Self { width, height, holes }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }

    pub fn get(&self, pos: GridPos) -> Option<&Hole> {
        self.holes.get(&pos)
    }

    /// Show only the listed holes, hide the rest. Returns the holes whose
    /// visibility changed, sorted by coordinate.
    pub fn show_only(&mut self, active: &[GridPos]) -> Vec<(GridPos, bool)> {
        let set: HashSet<GridPos> = active.iter().copied().collect();
        let mut changed: Vec<(GridPos, bool)> = self
            .holes
            .values_mut()
            .filter_map(|hole| {
                let visible = set.contains(&hole.pos);
                if hole.visible != visible {
                    hole.visible = visible;
                    Some((hole.pos, visible))
                } else {
                    None
                }
            })
            .collect();
        changed.sort();
        changed
    }

    /// Hide every hole
    pub fn hide_all(&mut self) -> Vec<(GridPos, bool)> {
        self.show_only(&[])
    }

    /// Coordinates of visible holes, sorted
    pub fn visible(&self) -> Vec<GridPos> {
        let mut out: Vec<GridPos> = self
            .holes
            .values()
            .filter(|h| h.visible)
            .map(|h| h.pos)
            .collect();
        out.sort();
        out
    }

    /// Pick a uniformly random hole from `active` that exists and is free
    pub fn random_free<R: Rng + ?Sized>(&self, active: &[GridPos], rng: &mut R) -> Option<GridPos> {
        let free: Vec<GridPos> = active
            .iter()
            .copied()
            .filter(|pos| self.holes.get(pos).is_some_and(Hole::is_free))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[rng.gen_range(0..free.len())])
    }

    /// Mark a hole as taken. Returns false if it is missing or occupied.
    pub fn occupy(&mut self, pos: GridPos, id: MoleId) -> bool {
        match self.holes.get_mut(&pos) {
            Some(hole) if hole.is_free() => {
                hole.occupant = Some(id);
                true
            }
            _ => false,
        }
    }

    /// Free a hole if `id` is its occupant
    pub fn vacate(&mut self, pos: GridPos, id: MoleId) {
        if let Some(hole) = self.holes.get_mut(&pos) {
            if hole.occupant == Some(id) {
                hole.occupant = None;
            }
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.holes.values().filter(|h| !h.is_free()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_build_all_hidden() {
        let grid = HoleGrid::build(4, 3);
        assert_eq!(grid.len(), 12);
        assert!(grid.visible().is_empty());
        assert!(grid.get(GridPos::new(3, 2)).is_some());
        assert!(grid.get(GridPos::new(4, 0)).is_none());
    }

    #[test]
    fn test_show_only_reports_changes() {
        let mut grid = HoleGrid::build(4, 3);
        let a = [GridPos::new(1, 0), GridPos::new(2, 0)];
        let changed = grid.show_only(&a);
        assert_eq!(changed, vec![(GridPos::new(1, 0), true), (GridPos::new(2, 0), true)]);

        let b = [GridPos::new(2, 0), GridPos::new(3, 0)];
        let changed = grid.show_only(&b);
        assert_eq!(changed, vec![(GridPos::new(1, 0), false), (GridPos::new(3, 0), true)]);
        assert_eq!(grid.visible(), b.to_vec());

        grid.hide_all();
        assert!(grid.visible().is_empty());
    }

    #[test]
    fn test_occupancy() {
        let mut grid = HoleGrid::build(2, 2);
        let pos = GridPos::new(0, 0);
        assert!(grid.occupy(pos, 1));
        assert!(!grid.occupy(pos, 2));
        assert_eq!(grid.occupied_count(), 1);

        grid.vacate(pos, 2);
        assert_eq!(grid.occupied_count(), 1);
        grid.vacate(pos, 1);
        assert_eq!(grid.occupied_count(), 0);
        assert!(!grid.occupy(GridPos::new(5, 5), 3));
    }

    #[test]
    fn test_random_free_skips_occupied() {
        let mut grid = HoleGrid::build(2, 1);
        let mut rng = StdRng::seed_from_u64(7);
        let active = [GridPos::new(0, 0), GridPos::new(1, 0)];
        grid.occupy(GridPos::new(0, 0), 1);

        for _ in 0..50 {
            assert_eq!(grid.random_free(&active, &mut rng), Some(GridPos::new(1, 0)));
        }

        grid.occupy(GridPos::new(1, 0), 2);
        assert_eq!(grid.random_free(&active, &mut rng), None);
        assert_eq!(grid.random_free(&[], &mut rng), None);
    }
}
