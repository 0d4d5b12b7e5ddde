//! Wave, level, and era arithmetic.
//!
//! Every function here is pure: the same wave always maps to the same level
//! and era.

use serde::{Deserialize, Serialize};

/// Number of waves that make up one level.
pub const WAVES_PER_LEVEL: u32 = 5;

/// Thematic difficulty band of enemy archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Era {
    /// Levels 1–4: plain falling rocks.
    Meteors,
    /// Levels 5–9: weaving arcade invaders.
    ArcadeInvaders,
    /// Levels 10–14: tumbling asteroid fields.
    NinetiesAsteroids,
    /// Levels 15–19: coordinated drone swarms.
    ModernSwarm,
    /// Level 20 onward: a return to the simplest archetype.
    Regression,
}

impl Era {
    /// Every era in progression order.
    pub const ALL: [Era; 5] = [
        Era::Meteors,
        Era::ArcadeInvaders,
        Era::NinetiesAsteroids,
        Era::ModernSwarm,
        Era::Regression,
    ];

    /// First level that belongs to the era.
    #[must_use]
    pub const fn first_level(self) -> u32 {
        match self {
            Self::Meteors => 1,
            Self::ArcadeInvaders => 5,
            Self::NinetiesAsteroids => 10,
            Self::ModernSwarm => 15,
            Self::Regression => 20,
        }
    }

    /// Key under which the era's archetypes appear in configuration.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Meteors => "METEORS",
            Self::ArcadeInvaders => "ARCADE_INVADERS",
            Self::NinetiesAsteroids => "NINETIES_ASTEROIDS",
            Self::ModernSwarm => "MODERN_SWARM",
            Self::Regression => "REGRESSION",
        }
    }

    /// Zero-based position of the era in [`Era::ALL`].
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Meteors => 0,
            Self::ArcadeInvaders => 1,
            Self::NinetiesAsteroids => 2,
            Self::ModernSwarm => 3,
            Self::Regression => 4,
        }
    }

    /// The era that follows, or `None` for the final era.
    #[must_use]
    pub const fn next(self) -> Option<Era> {
        match self {
            Self::Meteors => Some(Self::ArcadeInvaders),
            Self::ArcadeInvaders => Some(Self::NinetiesAsteroids),
            Self::NinetiesAsteroids => Some(Self::ModernSwarm),
            Self::ModernSwarm => Some(Self::Regression),
            Self::Regression => None,
        }
    }
}

/// Level reached at the provided wave.
#[must_use]
pub const fn level_for_wave(wave: u32) -> u32 {
    wave / WAVES_PER_LEVEL + 1
}

/// Era that owns the provided level.
#[must_use]
pub const fn era_for_level(level: u32) -> Era {
    match level {
        0..=4 => Era::Meteors,
        5..=9 => Era::ArcadeInvaders,
        10..=14 => Era::NinetiesAsteroids,
        15..=19 => Era::ModernSwarm,
        _ => Era::Regression,
    }
}

/// First wave whose level belongs to `era`. Waves are numbered from 1.
#[must_use]
pub const fn first_wave_of_era(era: Era) -> u32 {
    let wave = (era.first_level() - 1) * WAVES_PER_LEVEL;
    if wave == 0 {
        1
    } else {
        wave
    }
}

/// One-based position of `wave` within its era.
#[must_use]
pub const fn wave_in_era(wave: u32) -> u32 {
    let era = era_for_level(level_for_wave(wave));
    wave.saturating_sub(first_wave_of_era(era)) + 1
}

/// Read-only progression state shared with systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressionSnapshot {
    /// Current wave, starting at 1.
    pub wave: u32,
    /// Level derived from the wave.
    pub level: u32,
    /// Era derived from the level.
    pub era: Era,
    /// Whether the cooperative super-weapon may still fire this era.
    pub super_weapon_armed: bool,
}

impl ProgressionSnapshot {
    /// Progression state at the provided wave with the super-weapon armed.
    #[must_use]
    pub const fn at_wave(wave: u32) -> Self {
        let level = level_for_wave(wave);
        Self {
            wave,
            level,
            era: era_for_level(level),
            super_weapon_armed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_twelve_is_nineties_asteroids() {
        assert_eq!(era_for_level(12), Era::NinetiesAsteroids);
        for level in 10..=14 {
            assert_eq!(era_for_level(level), Era::NinetiesAsteroids);
        }
    }

    #[test]
    fn level_two_is_meteors() {
        assert_eq!(era_for_level(2), Era::Meteors);
    }

    #[test]
    fn level_advances_every_five_waves() {
        assert_eq!(level_for_wave(1), 1);
        assert_eq!(level_for_wave(4), 1);
        assert_eq!(level_for_wave(5), 2);
        assert_eq!(level_for_wave(49), 10);
    }

    #[test]
    fn final_era_regresses() {
        assert_eq!(era_for_level(20), Era::Regression);
        assert_eq!(era_for_level(400), Era::Regression);
        assert_eq!(Era::Regression.next(), None);
    }

    #[test]
    fn wave_in_era_restarts_at_each_era() {
        assert_eq!(wave_in_era(1), 1);
        assert_eq!(wave_in_era(19), 19);
        assert_eq!(first_wave_of_era(Era::ArcadeInvaders), 20);
        assert_eq!(wave_in_era(20), 1);
        assert_eq!(wave_in_era(24), 5);
        assert_eq!(wave_in_era(45), 1);
    }

    #[test]
    fn era_index_matches_order() {
        for (position, era) in Era::ALL.iter().enumerate() {
            assert_eq!(era.index() as usize, position);
        }
    }
}
