//! Enemy archetype ("gimmick") configuration records and their catalog.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedded archetype dataset used whenever external configuration is absent.
const EMBEDDED_GIMMICKS: &str = include_str!("../data/gimmicks.json");

const DEFAULT_HEALTH: f32 = 10.0;
const DEFAULT_SPEED: f32 = 1.0;
const DEFAULT_SIZE: f32 = 12.0;
const DEFAULT_RARITY: f32 = 1.0;
const MINIMUM_SIZE: f32 = 4.0;

/// Health at or above which an archetype qualifies as a boss-tier pick.
pub const BOSS_TIER_HEALTH: f32 = 75.0;

/// Closed set of movement behaviors an enemy may follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    /// Straight down.
    Falling,
    /// Down with a sine horizontal wobble.
    Ballistic,
    /// Falls at 1.5× speed.
    Fast,
    /// Falls at 1.3× speed.
    FastFalling,
    /// Down with a faster, narrower wobble.
    Tumbling,
    /// Random horizontal drift with a slow descent.
    Bombing,
    /// Descends at a guaranteed minimum speed.
    Stationary,
    /// Wide weave clamped to the playfield.
    IntelligentDodging,
    /// Weave keyed off altitude.
    IntelligentEvasion,
    /// Fast weave with random jitter.
    Erratic,
    /// Slow synchronized weave.
    CoordinatedAttack,
    /// Steers toward the bottom-center of the playfield.
    Homing,
    /// Falls at half speed.
    SlowAdvance,
    /// Crawls down while its radius grows.
    Expanding,
}

/// Lookup table from configuration tags to behaviors.
const BEHAVIOR_TABLE: [(&str, Behavior); 14] = [
    ("falling", Behavior::Falling),
    ("ballistic", Behavior::Ballistic),
    ("fast", Behavior::Fast),
    ("fast_falling", Behavior::FastFalling),
    ("tumbling", Behavior::Tumbling),
    ("bombing", Behavior::Bombing),
    ("stationary", Behavior::Stationary),
    ("intelligent_dodging", Behavior::IntelligentDodging),
    ("intelligent_evasion", Behavior::IntelligentEvasion),
    ("erratic", Behavior::Erratic),
    ("coordinated_attack", Behavior::CoordinatedAttack),
    ("homing", Behavior::Homing),
    ("slow_advance", Behavior::SlowAdvance),
    ("expanding", Behavior::Expanding),
];

impl Behavior {
    /// Resolves a configuration tag, defaulting to [`Behavior::Falling`] for
    /// absent or unknown tags.
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::Falling;
        };
        BEHAVIOR_TABLE
            .iter()
            .find(|(name, _)| *name == tag)
            .map_or(Self::Falling, |(_, behavior)| *behavior)
    }

    /// Configuration tag that names the behavior.
    #[must_use]
    pub fn tag(self) -> &'static str {
        BEHAVIOR_TABLE
            .iter()
            .find(|(_, behavior)| *behavior == self)
            .map_or("falling", |(name, _)| *name)
    }

    /// Reports whether the behavior grows its radius over time.
    #[must_use]
    pub const fn is_expanding(self) -> bool {
        matches!(self, Self::Expanding)
    }
}

/// Read-only archetype record describing one enemy or boss type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gimmick {
    /// Stable identifier of the archetype.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Starting and maximum health.
    #[serde(default = "default_health")]
    pub health: f32,
    /// Speed in config units; multiplied by the global pixel scale.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Collision radius in world units.
    #[serde(default = "default_size")]
    pub size: f32,
    /// Relative spawn weight within its era.
    #[serde(default = "default_rarity")]
    pub rarity: f32,
    /// Informational awareness score carried through from configuration.
    #[serde(default)]
    pub ai_awareness: f32,
    /// Behavior tag; absent tags resolve to falling.
    #[serde(default)]
    pub behavior: Option<String>,
    /// Marks the archetype as boss-tier regardless of health.
    #[serde(default)]
    pub special: bool,
    /// Radius growth per second for expanding behaviors.
    #[serde(default)]
    pub expansion_rate: Option<f32>,
    /// Horizontal drift speed in px/s for bombing behaviors.
    #[serde(default)]
    pub drift: Option<f32>,
    /// Multiplier applied to ground impact damage.
    #[serde(default)]
    pub impact_multiplier: Option<f32>,
}

fn default_health() -> f32 {
    DEFAULT_HEALTH
}

fn default_speed() -> f32 {
    DEFAULT_SPEED
}

fn default_size() -> f32 {
    DEFAULT_SIZE
}

fn default_rarity() -> f32 {
    DEFAULT_RARITY
}

impl Gimmick {
    /// Creates a minimal archetype with the provided core numbers.
    #[must_use]
    pub fn new(id: &str, health: f32, speed: f32, size: f32, behavior: Behavior) -> Self {
        Self {
            id: id.to_owned(),
            name: id.to_owned(),
            health,
            speed,
            size,
            rarity: DEFAULT_RARITY,
            ai_awareness: 0.0,
            behavior: Some(behavior.tag().to_owned()),
            special: false,
            expansion_rate: None,
            drift: None,
            impact_multiplier: None,
        }
    }

    /// Overrides the rarity weight.
    #[must_use]
    pub fn with_rarity(mut self, rarity: f32) -> Self {
        self.rarity = rarity;
        self
    }

    /// Marks the archetype as boss-tier.
    #[must_use]
    pub fn with_special(mut self) -> Self {
        self.special = true;
        self
    }

    /// Resolved movement behavior.
    #[must_use]
    pub fn resolved_behavior(&self) -> Behavior {
        Behavior::from_tag(self.behavior.as_deref())
    }

    /// Reports whether the archetype may be injected as a boss.
    #[must_use]
    pub fn is_boss_tier(&self) -> bool {
        self.special || self.health >= BOSS_TIER_HEALTH
    }

    /// Returns a copy with every numeric field forced into a finite, legal range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.health = non_negative_or(self.health, DEFAULT_HEALTH).max(1.0);
        self.speed = non_negative_or(self.speed, 0.0);
        self.size = non_negative_or(self.size, DEFAULT_SIZE).max(MINIMUM_SIZE);
        self.rarity = non_negative_or(self.rarity, 0.0);
        self.ai_awareness = non_negative_or(self.ai_awareness, 0.0);
        self.expansion_rate = self.expansion_rate.map(|rate| non_negative_or(rate, 0.0));
        self.drift = self.drift.map(|drift| non_negative_or(drift, 0.0));
        self.impact_multiplier = self
            .impact_multiplier
            .map(|multiplier| non_negative_or(multiplier, 1.0));
        self
    }
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

/// Errors raised while parsing an archetype document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document was not valid JSON or did not match the archetype schema.
    #[error("malformed gimmick configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The document parsed but contained no archetypes at all.
    #[error("gimmick configuration contains no archetypes")]
    Empty,
}

/// Immutable archetype tables organized by era key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GimmickCatalog {
    eras: BTreeMap<String, Vec<Arc<Gimmick>>>,
}

impl GimmickCatalog {
    /// Builds a catalog from already-parsed tables.
    #[must_use]
    pub fn from_tables(tables: impl IntoIterator<Item = (String, Vec<Gimmick>)>) -> Self {
        let eras = tables
            .into_iter()
            .map(|(era, gimmicks)| {
                let entries = gimmicks
                    .into_iter()
                    .map(|gimmick| Arc::new(gimmick.sanitized()))
                    .collect();
                (era, entries)
            })
            .collect();
        Self { eras }
    }

    /// Parses a JSON document mapping era keys to archetype lists.
    ///
    /// `null` documents and `null` era entries are tolerated and produce empty
    /// tables; a document without a single archetype is reported as
    /// [`ConfigError::Empty`].
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let parsed: Option<BTreeMap<String, Option<Vec<Gimmick>>>> =
            serde_json::from_str(document)?;
        let tables = parsed.unwrap_or_default();
        let catalog = Self::from_tables(
            tables
                .into_iter()
                .map(|(era, entries)| (era, entries.unwrap_or_default())),
        );
        if catalog.is_empty() {
            return Err(ConfigError::Empty);
        }
        Ok(catalog)
    }

    /// Catalog parsed from the dataset bundled with the crate.
    #[must_use]
    pub fn embedded() -> Self {
        match Self::from_json(EMBEDDED_GIMMICKS) {
            Ok(catalog) => catalog,
            Err(error) => {
                log::error!("embedded gimmick dataset is unusable: {error}");
                Self::default()
            }
        }
    }

    /// Parses `document` when present, degrading to the embedded dataset on
    /// any failure.
    #[must_use]
    pub fn load_or_embedded(document: Option<&str>) -> Self {
        let Some(document) = document else {
            return Self::embedded();
        };
        match Self::from_json(document) {
            Ok(catalog) => catalog,
            Err(error) => {
                log::warn!("falling back to embedded gimmicks: {error}");
                Self::embedded()
            }
        }
    }

    /// Archetypes configured for the era key; empty when the era is missing.
    #[must_use]
    pub fn era(&self, key: &str) -> &[Arc<Gimmick>] {
        self.eras.get(key).map_or(&[], Vec::as_slice)
    }

    /// Finds an archetype by identifier across every era.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Arc<Gimmick>> {
        self.eras
            .values()
            .flat_map(|entries| entries.iter())
            .find(|gimmick| gimmick.id == id)
    }

    /// Reports whether no era contains an archetype.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eras.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_missing_tags_fall_back_to_falling() {
        assert_eq!(Behavior::from_tag(None), Behavior::Falling);
        assert_eq!(Behavior::from_tag(Some("moonwalking")), Behavior::Falling);
        assert_eq!(Behavior::from_tag(Some("expanding")), Behavior::Expanding);
    }

    #[test]
    fn tags_round_trip_through_the_table() {
        for (tag, behavior) in BEHAVIOR_TABLE {
            assert_eq!(behavior.tag(), tag);
        }
    }

    #[test]
    fn missing_fields_receive_defaults() {
        let catalog =
            GimmickCatalog::from_json(r#"{"METEORS": [{"id": "rock"}]}"#).expect("parse");
        let rock = &catalog.era("METEORS")[0];
        assert_eq!(rock.health, DEFAULT_HEALTH);
        assert_eq!(rock.speed, DEFAULT_SPEED);
        assert_eq!(rock.size, DEFAULT_SIZE);
        assert_eq!(rock.resolved_behavior(), Behavior::Falling);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let catalog = GimmickCatalog::from_json(
            r##"{"METEORS": [{"id": "rock", "glowColor": "#fff", "behavior": "tumbling"}]}"##,
        )
        .expect("parse");
        assert_eq!(
            catalog.era("METEORS")[0].resolved_behavior(),
            Behavior::Tumbling
        );
    }

    #[test]
    fn null_entries_produce_empty_eras() {
        let catalog = GimmickCatalog::from_json(
            r#"{"METEORS": [{"id": "rock"}], "ARCADE_INVADERS": null}"#,
        )
        .expect("parse");
        assert!(catalog.era("ARCADE_INVADERS").is_empty());
        assert!(catalog.era("UNKNOWN").is_empty());
    }

    #[test]
    fn null_document_is_reported_empty() {
        assert!(matches!(
            GimmickCatalog::from_json("null"),
            Err(ConfigError::Empty)
        ));
    }

    #[test]
    fn malformed_document_degrades_to_embedded() {
        let catalog = GimmickCatalog::load_or_embedded(Some("{ not json"));
        assert_eq!(catalog, GimmickCatalog::embedded());
        assert!(!catalog.is_empty());
    }

    #[test]
    fn sanitizing_removes_non_finite_numbers() {
        let mut gimmick = Gimmick::new("odd", f32::NAN, f32::INFINITY, -3.0, Behavior::Falling);
        gimmick.rarity = f32::NAN;
        let clean = gimmick.sanitized();
        assert_eq!(clean.health, DEFAULT_HEALTH);
        assert_eq!(clean.speed, 0.0);
        assert_eq!(clean.size, DEFAULT_SIZE);
        assert_eq!(clean.rarity, 0.0);
    }

    #[test]
    fn boss_tier_uses_health_or_special_flag() {
        assert!(Gimmick::new("big", 80.0, 1.0, 20.0, Behavior::Falling).is_boss_tier());
        assert!(Gimmick::new("odd", 5.0, 1.0, 20.0, Behavior::Falling)
            .with_special()
            .is_boss_tier());
        assert!(!Gimmick::new("small", 20.0, 1.0, 20.0, Behavior::Falling).is_boss_tier());
    }

    #[test]
    fn embedded_dataset_covers_every_era() {
        let catalog = GimmickCatalog::embedded();
        for era in crate::Era::ALL {
            assert!(
                !catalog.era(era.config_key()).is_empty(),
                "embedded dataset lacks {}",
                era.config_key()
            );
        }
    }
}
