//! The crystal activation puzzle.
//!
//! The player must activate crystals whose types match `target_sequence` in
//! order while every matched crystal is still active. Finishing a target
//! permanently completes its types and draws a new single-type target from
//! the types not yet completed. When none remain the target is empty and the
//! puzzle is solved.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    time::Duration,
};

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use slotmap::SlotMap;

use crate::crystal::{Crystal, CrystalId, CrystalType};

#[derive(Debug, Clone)]
pub struct CrystalSequence {
    target_sequence: Vec<CrystalType>,
    /// Matched crystals in activation order. Always a type-prefix of the target.
    current_sequence: Vec<CrystalId>,
    /// The same crystals as `current_sequence`, for membership checks.
    used_crystals: HashSet<CrystalId>,
    completed_types: BTreeSet<CrystalType>,
    /// Types that can still be drawn as targets.
    available: BTreeSet<CrystalType>,
    rng: StdRng,
}

impl CrystalSequence {
    /// Creates a puzzle whose first target is `length` uniformly drawn types
    /// (repeats allowed).
    pub fn new(length: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let target = (0..length)
            .filter_map(|_| CrystalType::ALL.choose(&mut rng).copied())
            .collect();
        Self::from_parts(target, rng)
    }

    /// Creates a puzzle with an explicit first target.
    pub fn with_target(target: Vec<CrystalType>, seed: u64) -> Self {
        Self::from_parts(target, StdRng::seed_from_u64(seed))
    }

    fn from_parts(target_sequence: Vec<CrystalType>, rng: StdRng) -> Self {
        Self {
            target_sequence,
            current_sequence: Vec::new(),
            used_crystals: HashSet::new(),
            completed_types: BTreeSet::new(),
            available: CrystalType::ALL.into_iter().collect(),
            rng,
        }
    }

    pub fn target_sequence(&self) -> &[CrystalType] {
        &self.target_sequence
    }

    pub fn current_sequence(&self) -> &[CrystalId] {
        &self.current_sequence
    }

    pub fn completed_types(&self) -> &BTreeSet<CrystalType> {
        &self.completed_types
    }

    pub fn is_type_completed(&self, crystal_type: CrystalType) -> bool {
        self.completed_types.contains(&crystal_type)
    }

    /// Limits the puzzle to the crystals that exist in the level.
    ///
    /// `placed` lists the type of every crystal on the map, repeats
    /// included. The current target is cut to its longest prefix that those
    /// crystals can satisfy, each crystal counting once, and later targets
    /// are only drawn from placed types. If nothing of the target is left a
    /// new single-type target is drawn.
    pub fn restrict_to(&mut self, placed: &[CrystalType]) {
        let mut budget: BTreeMap<CrystalType, usize> = BTreeMap::new();
        for crystal_type in placed {
            *budget.entry(*crystal_type).or_default() += 1;
        }
        self.available = budget.keys().copied().collect();

        let feasible = self
            .target_sequence
            .iter()
            .take_while(|t| match budget.get_mut(*t) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            })
            .count();
        if feasible < self.target_sequence.len() {
            debug!(
                "Target {:?} needs crystals the level lacks, keeping {} of it",
                self.target_sequence, feasible
            );
            self.target_sequence.truncate(feasible);
        }
        self.reset_attempt();
        if self.target_sequence.is_empty() {
            self.draw_next_target();
        }
    }

    /// Offers a freshly activated crystal to the puzzle.
    ///
    /// Returns `true` if it matched the next expected type. A crystal of a
    /// completed type, an inactive crystal, or one already used in this
    /// attempt is ignored. A type mismatch resets the attempt.
    pub fn add_crystal(&mut self, id: CrystalId, crystals: &SlotMap<CrystalId, Crystal>) -> bool {
        let Some(crystal) = crystals.get(id) else {
            return false;
        };
        if self.completed_types.contains(&crystal.crystal_type) || !crystal.is_active() {
            return false;
        }

        self.prune_inactive(crystals);
        if self.used_crystals.contains(&id) {
            return false;
        }
        let Some(&expected) = self.target_sequence.get(self.current_sequence.len()) else {
            return false;
        };

        if crystal.crystal_type != expected {
            debug!(
                "Crystal {:?} does not match expected {:?}, resetting attempt",
                crystal.crystal_type, expected
            );
            self.reset_attempt();
            return false;
        }

        self.current_sequence.push(id);
        self.used_crystals.insert(id);
        if self.current_sequence.len() == self.target_sequence.len()
            && self.all_active(crystals)
        {
            self.complete_target();
        }
        true
    }

    /// Ages out matched crystals. Call once per tick.
    ///
    /// If any crystal of the attempt in progress has expired the whole
    /// attempt resets. Returns `true` when that happened.
    pub fn update(&mut self, crystals: &mut SlotMap<CrystalId, Crystal>, now: Duration) -> bool {
        for id in &self.current_sequence {
            if let Some(crystal) = crystals.get_mut(*id) {
                crystal.update(now);
            }
        }
        if self.current_sequence.is_empty() || self.all_active(crystals) {
            return false;
        }
        debug!(
            "A crystal expired after {} of {} matches, resetting attempt",
            self.current_sequence.len(),
            self.target_sequence.len()
        );
        self.reset_attempt();
        true
    }

    /// Fraction of the current target matched. `1.0` once every type is solved.
    pub fn progress(&self) -> f64 {
        if self.target_sequence.is_empty() {
            return 1.0;
        }
        self.current_sequence.len() as f64 / self.target_sequence.len() as f64
    }

    pub fn next_crystal_type(&self) -> Option<CrystalType> {
        self.target_sequence.get(self.current_sequence.len()).copied()
    }

    /// Checks whether every crystal type the puzzle can draw has been completed.
    pub fn is_complete(&self) -> bool {
        self.target_sequence.is_empty()
    }

    fn all_active(&self, crystals: &SlotMap<CrystalId, Crystal>) -> bool {
        self.current_sequence
            .iter()
            .all(|id| crystals.get(*id).is_some_and(Crystal::is_active))
    }

    fn prune_inactive(&mut self, crystals: &SlotMap<CrystalId, Crystal>) {
        let is_live = |id: &CrystalId| crystals.get(*id).is_some_and(Crystal::is_active);
        self.current_sequence.retain(is_live);
        self.used_crystals.retain(is_live);
    }

    fn reset_attempt(&mut self) {
        self.current_sequence.clear();
        self.used_crystals.clear();
    }

    fn complete_target(&mut self) {
        for crystal_type in self.target_sequence.drain(..) {
            if self.completed_types.insert(crystal_type) {
                info!("Crystal type {:?} completed", crystal_type);
            }
        }
        self.reset_attempt();
        self.draw_next_target();
    }

    fn draw_next_target(&mut self) {
        let remaining: Vec<CrystalType> = self
            .available
            .iter()
            .copied()
            .filter(|t| !self.completed_types.contains(t))
            .collect();
        match remaining.choose(&mut self.rng) {
            Some(next) => {
                debug!("Next target: {:?}", next);
                self.target_sequence.push(*next);
            }
            None => info!("Every crystal type completed"),
        }
    }
}
