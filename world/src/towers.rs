//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use skyline_defence_core::{CityId, Side, TowerId, TowerSnapshot, Vec2};

pub(crate) const TOWER_OFFSET: f32 = 35.0;
pub(crate) const TOWER_GROUND_OFFSET: f32 = 50.0;
const TOWER_ONLINE_FRACTION: f32 = 0.25;

/// Combat profile shared by every tower of one variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TowerProfile {
    pub(crate) max_health: f32,
    pub(crate) range: f32,
    pub(crate) fire_rate: f32,
    pub(crate) damage: f32,
    pub(crate) flak: bool,
}

pub(crate) const STANDARD_TOWER: TowerProfile = TowerProfile {
    max_health: 100.0,
    range: 350.0,
    fire_rate: 1.5,
    damage: 35.0,
    flak: false,
};

pub(crate) const FLAK_TOWER: TowerProfile = TowerProfile {
    max_health: 60.0,
    range: 150.0,
    fire_rate: 4.0,
    damage: 15.0,
    flak: true,
};

/// Snapshot of a tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    pub(crate) id: TowerId,
    pub(crate) city: CityId,
    pub(crate) side: Side,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) profile: TowerProfile,
    pub(crate) online: bool,
    pub(crate) destroyed: bool,
    pub(crate) cooldown: f32,
}

impl TowerState {
    pub(crate) fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    pub(crate) fn can_act(&self) -> bool {
        self.online && !self.destroyed
    }

    /// Applies damage and reports whether the tower just went offline.
    pub(crate) fn take_damage(&mut self, damage: f32) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = (self.health - damage).max(0.0);
        if self.online && self.health <= 0.0 {
            self.online = false;
            return true;
        }
        false
    }

    /// Restores health and reports whether the tower just came back online.
    pub(crate) fn repair(&mut self, amount: f32) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = (self.health + amount).min(self.profile.max_health);
        if !self.online && self.health >= self.profile.max_health * TOWER_ONLINE_FRACTION {
            self.online = true;
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            city: self.city,
            side: self.side,
            position: self.position,
            health: self.health,
            max_health: self.profile.max_health,
            fire_rate: self.profile.fire_rate,
            range: self.profile.range,
            damage: self.profile.damage,
            flak: self.profile.flak,
            online: self.online,
            ready: self.is_ready(),
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn insert(
        &mut self,
        city: CityId,
        side: Side,
        position: Vec2,
        profile: TowerProfile,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let _ = self.entries.insert(
            id,
            TowerState {
                id,
                city,
                side,
                position,
                health: profile.max_health,
                profile,
                online: true,
                destroyed: false,
                cooldown: 0.0,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    /// Marks the tower destroyed and reports whether it was standing before.
    pub(crate) fn destroy(&mut self, id: TowerId) -> bool {
        match self.entries.get_mut(&id) {
            Some(tower) if !tower.destroyed => {
                tower.destroyed = true;
                tower.online = false;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn owned_by(&self, city: CityId) -> Vec<TowerId> {
        self.entries
            .values()
            .filter(|tower| tower.city == city && !tower.destroyed)
            .map(|tower| tower.id)
            .collect()
    }

    pub(crate) fn active_count(&self, city: CityId) -> u32 {
        self.entries
            .values()
            .filter(|tower| tower.city == city && tower.can_act())
            .count() as u32
    }

    pub(crate) fn sweep(&mut self) {
        self.entries.retain(|_, tower| !tower.destroyed);
    }
}
