use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::{Position, Rgb};

new_key_type! {
    /// Generation-tagged handle to a crystal stored in the game's crystal arena.
    pub struct CrystalId;
}

/// The five kinds of resonance crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrystalType {
    Red,
    Blue,
    Green,
    Purple,
    Yellow,
}

impl CrystalType {
    pub const ALL: [CrystalType; 5] = [
        CrystalType::Red,
        CrystalType::Blue,
        CrystalType::Green,
        CrystalType::Purple,
        CrystalType::Yellow,
    ];

    pub fn glyph(self) -> char {
        match self {
            CrystalType::Red => 'R',
            CrystalType::Blue => 'B',
            CrystalType::Green => 'G',
            CrystalType::Purple => 'P',
            CrystalType::Yellow => 'Y',
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            CrystalType::Red => Rgb(255, 50, 50),
            CrystalType::Blue => Rgb(50, 50, 255),
            CrystalType::Green => Rgb(50, 255, 50),
            CrystalType::Purple => Rgb(255, 50, 255),
            CrystalType::Yellow => Rgb(255, 255, 50),
        }
    }

    /// Display name for UI
    pub fn name(self) -> &'static str {
        match self {
            CrystalType::Red => "Heat",
            CrystalType::Blue => "Frost",
            CrystalType::Green => "Growth",
            CrystalType::Purple => "Void",
            CrystalType::Yellow => "Lightning",
        }
    }
}

/// A crystal placed in a room. Stepping on it activates it for `duration`.
///
/// Expiry is polled: an expired crystal stays active until the next
/// [`Crystal::update`] observes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    pub crystal_type: CrystalType,
    pub position: Position,
    /// Index of the owning room in the game's room list.
    pub room: usize,
    is_active: bool,
    activation_time: Option<Duration>,
    duration: Duration,
}

impl Crystal {
    pub fn new(crystal_type: CrystalType, position: Position, room: usize, duration: Duration) -> Self {
        Crystal {
            crystal_type,
            position,
            room,
            is_active: false,
            activation_time: None,
            duration,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activation_time(&self) -> Option<Duration> {
        self.activation_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn glyph(&self) -> char {
        self.crystal_type.glyph()
    }

    pub fn color(&self) -> Rgb {
        self.crystal_type.color()
    }

    /// Activates the crystal, starting its timer at `now`.
    pub fn activate(&mut self, now: Duration) {
        self.is_active = true;
        self.activation_time = Some(now);
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.activation_time = None;
    }

    /// Deactivates the crystal once strictly more than `duration` has passed
    /// since activation. Returns `true` only on the tick that expired it.
    pub fn update(&mut self, now: Duration) -> bool {
        match self.activation_time {
            Some(started) if self.is_active && now.saturating_sub(started) > self.duration => {
                self.deactivate();
                true
            }
            _ => false,
        }
    }

    /// Remaining active time, or `None` if the crystal is inactive.
    pub fn time_remaining(&self, now: Duration) -> Option<Duration> {
        if !self.is_active {
            return None;
        }
        let started = self.activation_time?;
        Some(self.duration.saturating_sub(now.saturating_sub(started)))
    }
}
