//! Tunable settings pushed into the simulation by its host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of cities the topology generator accepts.
pub const MAX_CITIES: u32 = 8;

/// Snapshot of every host-adjustable knob, passed explicitly into each tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Overall difficulty in `0.0..=1.0`.
    pub difficulty: f32,
    /// Multiplier applied to every frame delta.
    pub game_speed: f32,
    /// Number of cities defending the ground line.
    pub city_count: u32,
    /// Aim accuracy of every defender AI in `0.0..=1.0`.
    pub ai_accuracy: f32,
    /// Multiplier applied to city, tower, and railgun repair rates.
    pub repair_rate_multiplier: f32,
    /// Debug override forcing a fixed coordination level.
    pub coordination_override: Option<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: 0.5,
            game_speed: 1.0,
            city_count: 4,
            ai_accuracy: 0.85,
            repair_rate_multiplier: 1.0,
            coordination_override: None,
        }
    }
}

/// Errors raised when settings cannot be interpreted.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    /// A numeric field was NaN or infinite.
    #[error("setting `{field}` must be a finite number")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl Settings {
    /// Validates that every numeric field is finite.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let fields = [
            ("difficulty", self.difficulty),
            ("game_speed", self.game_speed),
            ("ai_accuracy", self.ai_accuracy),
            ("repair_rate_multiplier", self.repair_rate_multiplier),
            (
                "coordination_override",
                self.coordination_override.unwrap_or(0.0),
            ),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SettingsError::NotFinite { field });
            }
        }
        Ok(())
    }

    /// Returns a copy with every field clamped into its legal range. Non-finite
    /// values are replaced with their defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            difficulty: clamp_or(self.difficulty, defaults.difficulty, 0.0, 1.0),
            game_speed: clamp_or(self.game_speed, defaults.game_speed, 0.1, 5.0),
            city_count: self.city_count.clamp(1, MAX_CITIES),
            ai_accuracy: clamp_or(self.ai_accuracy, defaults.ai_accuracy, 0.0, 1.0),
            repair_rate_multiplier: clamp_or(
                self.repair_rate_multiplier,
                defaults.repair_rate_multiplier,
                0.0,
                5.0,
            ),
            coordination_override: self
                .coordination_override
                .filter(|value| value.is_finite())
                .map(|value| value.clamp(0.0, 1.0)),
        }
    }
}

fn clamp_or(value: f32, fallback: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}
