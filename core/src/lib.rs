#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skyline Defence engine.
//!
//! This crate defines the message surface that connects the orchestrator, the
//! authoritative world, and pure systems. The orchestrator submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

pub mod gimmick;
pub mod math;
pub mod progression;
pub mod settings;

pub use gimmick::{Behavior, ConfigError, Gimmick, GimmickCatalog, BOSS_TIER_HEALTH};
pub use math::Vec2;
pub use progression::{Era, ProgressionSnapshot};
pub use settings::{Settings, SettingsError};

/// Global scale converting configured speed units into pixels per second.
pub const PIXELS_PER_SPEED_UNIT: f32 = 30.0;

/// Maximum health above which an enemy is treated as boss-class by scoring and
/// threat assessment.
pub const BOSS_CLASS_HEALTH: f32 = 150.0;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

identifier!(
    /// Unique identifier assigned to a city. Equal to the city's slot index.
    CityId
);
identifier!(
    /// Unique identifier assigned to a tower.
    TowerId
);
identifier!(
    /// Unique identifier assigned to an enemy.
    EnemyId
);
identifier!(
    /// Unique identifier assigned to a shared truck.
    TruckId
);
identifier!(
    /// Unique identifier assigned to a railgun.
    RailgunId
);
identifier!(
    /// Unique identifier assigned to a mobile defender.
    DefenderId
);

/// Cooperation posture a city adopts toward its neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    /// Helps readily.
    Cooperative,
    /// Helps when it is itself under moderate threat.
    Neutral,
    /// Helps only under heavy threat or when owed.
    Selfish,
}

impl Stance {
    /// Derives the stance from a helpfulness score in `-100..=100`.
    #[must_use]
    pub fn from_helpfulness(score: f32) -> Self {
        if score > 30.0 {
            Self::Cooperative
        } else if score < -30.0 {
            Self::Selfish
        } else {
            Self::Neutral
        }
    }
}

/// Side of the parent city a structure is mounted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Toward decreasing x.
    Left,
    /// Toward increasing x.
    Right,
}

impl Side {
    /// Sign of the horizontal axis pointing outward from the parent city.
    #[must_use]
    pub const fn outward_sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Reason an enemy left play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestructionCause {
    /// Killed by a tower projectile or its blast.
    Intercepted,
    /// Killed by a railgun bolt.
    Railgun,
    /// Removed by the cooperative super-weapon.
    SuperWeapon,
    /// Struck the ground.
    GroundImpact,
    /// Drifted outside the playfield.
    OutOfBounds,
    /// Removed by a debug or wave-skip request.
    Cleared,
}

/// Visual flavor of an explosion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExplosionKind {
    /// Blast from a tower projectile.
    Interception,
    /// Blast where an enemy struck the ground.
    GroundImpact,
    /// Flash where a railgun bolt pierced an enemy.
    Railgun,
    /// Era-themed blast produced by the super-weapon.
    SuperWeapon(Era),
}

/// Reasons a fire request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FireRejection {
    /// No tower with the provided identifier exists.
    MissingTower,
    /// The tower is offline or destroyed.
    Offline,
    /// The tower has not finished its cooldown.
    CoolingDown,
}

/// Reasons a truck deployment may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TruckRejection {
    /// No truck with the provided identifier exists.
    MissingTruck,
    /// The truck is not shared by the two named cities.
    NotShared,
    /// The truck is still cooling down from a previous deployment.
    CoolingDown,
    /// One of the participating cities has been destroyed.
    CityDestroyed,
}

/// A single city's ballot in the super-weapon vote.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuperWeaponVote {
    /// City casting the vote.
    pub city: CityId,
    /// Whether the city wants the weapon fired.
    pub vote: bool,
    /// Concern score in `0..=100` shown alongside the vote.
    pub concern: f32,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resizes the playfield and regenerates the city topology.
    ConfigureField {
        /// Width of the playfield in world units.
        width: f32,
        /// Height of the playfield in world units.
        height: f32,
    },
    /// Regenerates cities, towers, trucks, and railguns for a new city count,
    /// preserving index-aligned city health, stance, and ledgers.
    ConfigureCities {
        /// Number of cities to lay out along the ground line.
        count: u32,
    },
    /// Advances every entity by the provided delta time.
    Tick {
        /// Scaled simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Introduces a new enemy at the top of the playfield.
    SpawnEnemy {
        /// Archetype the enemy is created from.
        gimmick: Arc<Gimmick>,
        /// Horizontal spawn position.
        x: f32,
        /// Whether the enemy was injected as a boss.
        boss: bool,
    },
    /// Requests that a tower launch a projectile at the provided aim point.
    FireProjectile {
        /// Tower that should fire.
        tower: TowerId,
        /// World-space point where the projectile detonates.
        aim: Vec2,
    },
    /// Resolves hits, ground impacts, damage propagation, and repairs.
    ResolveCollisions {
        /// Scaled simulated time used for repairs.
        dt: Duration,
        /// Settings in force for this tick.
        settings: Settings,
    },
    /// Deploys a shared truck from `requester` toward `target_x`.
    DeploySharedTruck {
        /// Truck to deploy.
        truck: TruckId,
        /// City that asked for help.
        requester: CityId,
        /// Neighbor that agreed to help.
        helper: CityId,
        /// Horizontal position where the defender should set up.
        target_x: f32,
    },
    /// Records that `neighbor` refused to help `requester`.
    RecordRefusal {
        /// City that asked for help.
        requester: CityId,
        /// Neighbor that refused.
        neighbor: CityId,
    },
    /// Stores the latest super-weapon ballots on the cities.
    CastSuperWeaponVotes {
        /// Ballots from every living city.
        votes: Vec<SuperWeaponVote>,
    },
    /// Fires the cooperative super-weapon if it is armed.
    FireSuperWeapon,
    /// Marks the current wave complete and advances progression.
    CompleteWave,
    /// Jumps progression to the first wave of the next era.
    AdvanceEra,
    /// Deactivates every enemy without ground impacts.
    ClearEnemies,
    /// Destroys a city and everything it owns.
    DestroyCity {
        /// City to destroy.
        city: CityId,
    },
    /// Destroys a single tower.
    DestroyTower {
        /// Tower to destroy.
        tower: TowerId,
    },
    /// Removes every inactive entity.
    Sweep,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that cities were laid out anew.
    TopologyRebuilt {
        /// Number of cities after the rebuild.
        cities: u32,
    },
    /// Confirms that an enemy entered play.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Whether the enemy was injected as a boss.
        boss: bool,
    },
    /// Confirms that an enemy left play.
    EnemyDestroyed {
        /// Identifier of the enemy.
        enemy: EnemyId,
        /// Why the enemy left play.
        cause: DestructionCause,
    },
    /// Reports an enemy striking the ground.
    GroundImpact {
        /// Enemy that struck the ground.
        enemy: EnemyId,
        /// Impact point.
        position: Vec2,
        /// City that absorbed damage, if any was close enough.
        city: Option<CityId>,
        /// Damage dealt to that city.
        damage: u32,
    },
    /// Confirms that a city lost all health.
    CityDestroyed {
        /// City that fell.
        city: CityId,
    },
    /// Confirms that a tower was destroyed permanently.
    TowerDestroyed {
        /// Tower that was destroyed.
        tower: TowerId,
    },
    /// Reports that a tower dropped to zero health and went offline.
    TowerOffline {
        /// Tower that went offline.
        tower: TowerId,
    },
    /// Reports that a repaired tower came back online.
    TowerOnline {
        /// Tower that came back online.
        tower: TowerId,
    },
    /// Reports that a railgun was destroyed.
    RailgunDestroyed {
        /// Railgun that was destroyed.
        railgun: RailgunId,
    },
    /// Confirms that a tower launched a projectile.
    ProjectileFired {
        /// Tower that fired.
        tower: TowerId,
        /// Aim point of the projectile.
        aim: Vec2,
    },
    /// Reports that a fire request was rejected.
    FireRejected {
        /// Tower named in the request.
        tower: TowerId,
        /// Specific reason the request failed.
        reason: FireRejection,
    },
    /// Confirms that a railgun discharged.
    RailgunFired {
        /// Railgun that fired.
        railgun: RailgunId,
        /// Firing angle in screen radians.
        angle: f32,
    },
    /// Reports a new explosion.
    ExplosionCreated {
        /// Center of the blast.
        position: Vec2,
        /// Visual flavor.
        kind: ExplosionKind,
    },
    /// Confirms that a shared truck was dispatched.
    TruckDeployed {
        /// Truck that was dispatched.
        truck: TruckId,
        /// City that asked for help.
        requester: CityId,
        /// City that agreed to help.
        helper: CityId,
        /// Defender entity created by the deployment.
        defender: DefenderId,
    },
    /// Reports that a truck deployment was rejected.
    TruckRejected {
        /// Truck named in the request.
        truck: TruckId,
        /// Specific reason the request failed.
        reason: TruckRejection,
    },
    /// Reports that a truck finished its cooldown.
    TruckAvailable {
        /// Truck that became available.
        truck: TruckId,
    },
    /// Confirms that a neighbor refused help.
    AssistanceRefused {
        /// City that asked for help.
        requester: CityId,
        /// City that refused.
        neighbor: CityId,
    },
    /// Reports that a mobile defender reached its post and deployed a tower.
    DefenderDeployed {
        /// Defender that deployed.
        defender: DefenderId,
        /// Flak tower it deployed into.
        tower: TowerId,
    },
    /// Reports that a mobile defender reached the end of its lifetime.
    DefenderExpired {
        /// Defender that expired.
        defender: DefenderId,
    },
    /// Confirms that the super-weapon fired.
    SuperWeaponFired {
        /// Era whose theme colored the blast.
        era: Era,
        /// Number of enemies destroyed.
        destroyed: u32,
    },
    /// Confirms that a wave completed.
    WaveCompleted {
        /// Wave that completed.
        wave: u32,
    },
    /// Announces the start of a new wave.
    WaveStarted {
        /// Progression state at the start of the wave.
        progression: ProgressionSnapshot,
    },
    /// Announces a transition into a new era.
    EraChanged {
        /// Era that became active.
        era: Era,
    },
    /// Announces that every city has fallen.
    GameOver {
        /// Wave reached when the last city fell.
        wave: u32,
    },
}

/// Immutable representation of a single city's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CitySnapshot {
    /// Identifier of the city.
    pub id: CityId,
    /// Center of the city on the ground line.
    pub position: Vec2,
    /// Width of the city footprint.
    pub width: f32,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Whether the city has been destroyed.
    pub destroyed: bool,
    /// Current cooperation posture.
    pub stance: Stance,
    /// Running reputation score.
    pub helpfulness: f32,
    /// Signed favors per neighbor: positive means the neighbor owes this city.
    pub ledger: BTreeMap<CityId, i32>,
    /// Truck shared with the left neighbor.
    pub left_truck: Option<TruckId>,
    /// Truck shared with the right neighbor.
    pub right_truck: Option<TruckId>,
    /// Neighbor this city is currently negotiating with.
    pub communicating_with: Option<CityId>,
    /// Latest super-weapon ballot.
    pub super_weapon_vote: bool,
    /// Latest concern score.
    pub concern: f32,
    /// Number of online towers the city owns.
    pub active_towers: u32,
}

impl CitySnapshot {
    /// Reports whether the city is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.destroyed
    }

    /// Signed ledger balance toward `other`.
    #[must_use]
    pub fn balance_with(&self, other: CityId) -> i32 {
        self.ledger.get(&other).copied().unwrap_or(0)
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier of the tower.
    pub id: TowerId,
    /// City that owns the tower.
    pub city: CityId,
    /// Side of the parent city the tower sits on.
    pub side: Side,
    /// Muzzle position.
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Targeting range.
    pub range: f32,
    /// Damage per shot.
    pub damage: f32,
    /// Whether the tower is a short-range splash variant.
    pub flak: bool,
    /// Whether the tower can currently act.
    pub online: bool,
    /// Whether the tower finished its cooldown.
    pub ready: bool,
}

/// Immutable representation of a single enemy's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Center of the enemy.
    pub position: Vec2,
    /// Velocity observed during the last update.
    pub velocity: Vec2,
    /// Current collision radius.
    pub radius: f32,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Movement behavior.
    pub behavior: Behavior,
    /// Whether the enemy was injected as a boss.
    pub boss: bool,
}

impl EnemySnapshot {
    /// Reports whether the enemy counts as boss-class.
    #[must_use]
    pub fn is_boss_class(&self) -> bool {
        self.max_health > BOSS_CLASS_HEALTH
    }
}

/// Immutable representation of a shared truck.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruckSnapshot {
    /// Identifier of the truck.
    pub id: TruckId,
    /// Left city of the pair.
    pub city_a: CityId,
    /// Right city of the pair.
    pub city_b: CityId,
    /// Whether the truck may be deployed.
    pub available: bool,
    /// Cooldown accumulated since the last deployment.
    pub cooldown: Duration,
}

/// Immutable representation of a railgun.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RailgunSnapshot {
    /// Identifier of the railgun.
    pub id: RailgunId,
    /// City that owns the railgun.
    pub city: CityId,
    /// Open side of the city the railgun guards.
    pub side: Side,
    /// Muzzle position.
    pub position: Vec2,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Current aim angle in screen radians.
    pub aim_angle: f32,
    /// Charge progress in `0.0..=1.0`.
    pub charge: f32,
    /// Enemy currently tracked.
    pub target: Option<EnemyId>,
}

/// Immutable representation of a mobile defender.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefenderSnapshot {
    /// Identifier of the defender.
    pub id: DefenderId,
    /// Truck that dispatched it.
    pub truck: TruckId,
    /// City that asked for it.
    pub requester: CityId,
    /// Current position.
    pub position: Vec2,
    /// Horizontal destination.
    pub target_x: f32,
    /// Embedded flak tower once deployed.
    pub tower: Option<TowerId>,
    /// Time spent alive.
    pub age: Duration,
}

/// Target assignment produced for a single tower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerTarget {
    /// Tower that should engage.
    pub tower: TowerId,
    /// Enemy selected by the scoring pass.
    pub enemy: EnemyId,
    /// Point the projectile should detonate at.
    pub aim: Vec2,
}

/// Types that expose a sortable identifier for deterministic views.
pub trait Identified {
    /// Identifier type used for ordering.
    type Id: Ord + Copy;

    /// Identifier of the snapshot.
    fn id(&self) -> Self::Id;
}

impl Identified for CitySnapshot {
    type Id = CityId;

    fn id(&self) -> CityId {
        self.id
    }
}

impl Identified for TowerSnapshot {
    type Id = TowerId;

    fn id(&self) -> TowerId {
        self.id
    }
}

impl Identified for EnemySnapshot {
    type Id = EnemyId;

    fn id(&self) -> EnemyId {
        self.id
    }
}

impl Identified for TruckSnapshot {
    type Id = TruckId;

    fn id(&self) -> TruckId {
        self.id
    }
}

/// Read-only collection of snapshots kept in ascending identifier order.
#[derive(Clone, Debug)]
pub struct SnapshotView<T> {
    snapshots: Vec<T>,
}

impl<T> Default for SnapshotView<T> {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }
}

impl<T: Identified> SnapshotView<T> {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<T>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id());
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.snapshots.iter()
    }

    /// Looks up a snapshot by identifier.
    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id())
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of snapshots in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.snapshots
    }
}

/// Read-only snapshot describing every city.
pub type CityView = SnapshotView<CitySnapshot>;
/// Read-only snapshot describing every tower.
pub type TowerView = SnapshotView<TowerSnapshot>;
/// Read-only snapshot describing every active enemy.
pub type EnemyView = SnapshotView<EnemySnapshot>;
/// Read-only snapshot describing every shared truck.
pub type TruckView = SnapshotView<TruckSnapshot>;

/// Dimensions of the playfield.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    /// Width in world units.
    pub width: f32,
    /// Height in world units.
    pub height: f32,
}

impl Field {
    /// Creates a new field description.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Height at which enemies strike the ground.
    #[must_use]
    pub fn ground_line(&self) -> f32 {
        self.height - 40.0
    }
}

/// Kind of entity captured by a renderer snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A city on the ground line.
    City,
    /// A tower mounted beside a city or deployed by a defender.
    Tower,
    /// A railgun guarding an open flank.
    Railgun,
    /// A mobile defender en route or deployed.
    Defender,
    /// A descending enemy.
    Enemy,
    /// A tower projectile.
    Projectile,
    /// A railgun bolt.
    RailgunBolt,
    /// An explosion.
    Explosion,
}

/// Renderer-facing description of one entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityFrame {
    /// Kind of entity.
    pub kind: EntityKind,
    /// Center position.
    pub position: Vec2,
    /// Visual radius.
    pub radius: f32,
    /// Current and maximum health for damageable entities.
    pub health: Option<(f32, f32)>,
    /// Short state tag such as `"online"` or `"expanding"`.
    pub state: &'static str,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    /// Playfield dimensions.
    pub field: Field,
    /// Progression state.
    pub progression: ProgressionSnapshot,
    /// Every active entity.
    pub entities: Vec<EntityFrame>,
}
