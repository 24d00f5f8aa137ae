//! Player abilities unlocked by completing crystal types.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Position, crystal::CrystalType, map::GameMap};

/// The concrete effect of an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Instant straight-line move of up to `distance` tiles, stopped by
    /// anything impassable.
    Dash { distance: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub kind: AbilityKind,
    pub cooldown: Duration,
    pub last_use: Option<Duration>,
    pub is_unlocked: bool,
}

/// Snapshot of an ability for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityStatus {
    pub kind: AbilityKind,
    pub unlocked: bool,
    pub cooldown_remaining: Duration,
}

impl Ability {
    pub fn new(kind: AbilityKind, cooldown: Duration) -> Self {
        Self {
            kind,
            cooldown,
            last_use: None,
            is_unlocked: false,
        }
    }

    /// Heat crystal ability.
    pub fn dash() -> Self {
        Self::new(AbilityKind::Dash { distance: 3 }, Duration::from_millis(500))
    }

    pub fn cooldown_remaining(&self, now: Duration) -> Duration {
        match self.last_use {
            Some(used) => self.cooldown.saturating_sub(now.saturating_sub(used)),
            None => Duration::ZERO,
        }
    }

    pub fn can_use(&self, now: Duration) -> bool {
        self.is_unlocked && self.cooldown_remaining(now).is_zero()
    }

    pub fn start_cooldown(&mut self, now: Duration) {
        self.last_use = Some(now);
    }
}

/// Dispatch table from crystal type to the ability it unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilitySet {
    abilities: BTreeMap<CrystalType, Ability>,
}

impl Default for AbilitySet {
    fn default() -> Self {
        let mut abilities = BTreeMap::new();
        abilities.insert(CrystalType::Red, Ability::dash());
        Self { abilities }
    }
}

impl AbilitySet {
    pub fn get(&self, crystal_type: CrystalType) -> Option<&Ability> {
        self.abilities.get(&crystal_type)
    }

    pub fn get_mut(&mut self, crystal_type: CrystalType) -> Option<&mut Ability> {
        self.abilities.get_mut(&crystal_type)
    }

    /// Unlocks the ability bound to `crystal_type`. Returns `true` if it was
    /// locked before.
    pub fn unlock(&mut self, crystal_type: CrystalType) -> bool {
        match self.abilities.get_mut(&crystal_type) {
            Some(ability) if !ability.is_unlocked => {
                ability.is_unlocked = true;
                true
            }
            _ => false,
        }
    }

    pub fn status(&self, crystal_type: CrystalType, now: Duration) -> Option<AbilityStatus> {
        self.get(crystal_type).map(|ability| AbilityStatus {
            kind: ability.kind,
            unlocked: ability.is_unlocked,
            cooldown_remaining: ability.cooldown_remaining(now),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (CrystalType, &Ability)> {
        self.abilities.iter().map(|(t, a)| (*t, a))
    }
}

/// Walks from `from` in direction `(dx, dy)` one tile at a time for up to
/// `distance` tiles and returns the last walkable tile reached.
///
/// Stops before the first wall, void, closed door or map edge, so the result
/// may be `from` itself.
pub fn dash_target(map: &GameMap, from: Position, dx: i32, dy: i32, distance: i32) -> Position {
    let mut target = from;
    for step in 1..=distance {
        let next = from.offset(dx * step, dy * step);
        if !map.is_walkable(next.x, next.y) {
            break;
        }
        target = next;
    }
    target
}
