//! Loading of settings and archetype files supplied on the command line.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use skyline_defence_core::{GimmickCatalog, Settings};

/// Flag values that take precedence over the settings file.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Overrides {
    pub(crate) cities: Option<u32>,
    pub(crate) difficulty: Option<f32>,
    pub(crate) speed: Option<f32>,
}

/// Reads the optional TOML settings file and applies flag overrides.
pub(crate) fn load_settings(path: Option<&Path>, overrides: Overrides) -> Result<Settings> {
    let base = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file {}", path.display()))?;
            parse_settings(&contents)
                .with_context(|| format!("invalid settings file {}", path.display()))?
        }
        None => Settings::default(),
    };
    Ok(apply_overrides(base, overrides))
}

/// Reads the optional archetype file. A missing flag or an unusable document
/// yields the embedded catalog; an unreadable file is an error.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<GimmickCatalog> {
    let Some(path) = path else {
        return Ok(GimmickCatalog::embedded());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read gimmick file {}", path.display()))?;
    Ok(GimmickCatalog::load_or_embedded(Some(&contents)))
}

fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).context("failed to parse settings TOML")?;
    settings.validate()?;
    Ok(settings)
}

fn apply_overrides(mut settings: Settings, overrides: Overrides) -> Settings {
    if let Some(cities) = overrides.cities {
        settings.city_count = cities;
    }
    if let Some(difficulty) = overrides.difficulty {
        settings.difficulty = difficulty;
    }
    if let Some(speed) = overrides.speed {
        settings.game_speed = speed;
    }
    settings.sanitized()
}
