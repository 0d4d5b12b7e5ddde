//! Shared trucks and the mobile defenders they dispatch.

use skyline_defence_core::{
    CityId, DefenderId, DefenderSnapshot, TowerId, TruckId, TruckSnapshot, Vec2,
};

pub(crate) const TRUCK_COOLDOWN: f32 = 60.0;
pub(crate) const DEFENDER_SPEED: f32 = 60.0;
pub(crate) const DEFENDER_LIFETIME: f32 = 90.0;
pub(crate) const DEFENDER_RADIUS: f32 = 10.0;

/// Mutual-exclusion resource jointly owned by two adjacent cities.
#[derive(Clone, Debug)]
pub(crate) struct TruckState {
    pub(crate) id: TruckId,
    pub(crate) city_a: CityId,
    pub(crate) city_b: CityId,
    pub(crate) available: bool,
    pub(crate) elapsed: f32,
}

impl TruckState {
    pub(crate) fn new(id: TruckId, city_a: CityId, city_b: CityId) -> Self {
        Self {
            id,
            city_a,
            city_b,
            available: true,
            elapsed: 0.0,
        }
    }

    pub(crate) fn joins(&self, first: CityId, second: CityId) -> bool {
        (self.city_a == first && self.city_b == second)
            || (self.city_a == second && self.city_b == first)
    }

    pub(crate) fn dispatch(&mut self) {
        self.available = false;
        self.elapsed = 0.0;
    }

    /// Accumulates cooldown and reports whether the truck just became available.
    pub(crate) fn cool_down(&mut self, dt: f32) -> bool {
        if self.available {
            return false;
        }
        self.elapsed = (self.elapsed + dt).min(TRUCK_COOLDOWN);
        if self.elapsed >= TRUCK_COOLDOWN {
            self.available = true;
            self.elapsed = 0.0;
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self) -> TruckSnapshot {
        TruckSnapshot {
            id: self.id,
            city_a: self.city_a,
            city_b: self.city_b,
            available: self.available,
            cooldown: std::time::Duration::from_secs_f32(self.elapsed),
        }
    }
}

/// Transient unit that drives to its post and becomes a flak tower.
#[derive(Clone, Debug)]
pub(crate) struct DefenderState {
    pub(crate) id: DefenderId,
    pub(crate) truck: TruckId,
    pub(crate) requester: CityId,
    pub(crate) position: Vec2,
    pub(crate) target_x: f32,
    pub(crate) tower: Option<TowerId>,
    pub(crate) age: f32,
    pub(crate) active: bool,
}

/// Progress reported by a defender after one update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DefenderProgress {
    Travelling,
    Arrived,
    Deployed,
    Expired,
}

impl DefenderState {
    pub(crate) fn new(
        id: DefenderId,
        truck: TruckId,
        requester: CityId,
        origin: Vec2,
        target_x: f32,
    ) -> Self {
        Self {
            id,
            truck,
            requester,
            position: origin,
            target_x,
            tower: None,
            age: 0.0,
            active: true,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) -> DefenderProgress {
        self.age += dt;
        if self.age >= DEFENDER_LIFETIME {
            self.active = false;
            return DefenderProgress::Expired;
        }
        if self.tower.is_some() {
            return DefenderProgress::Deployed;
        }
        let remaining = self.target_x - self.position.x;
        let step = DEFENDER_SPEED * dt;
        if remaining.abs() <= step {
            self.position.x = self.target_x;
            DefenderProgress::Arrived
        } else {
            self.position.x += step.copysign(remaining);
            DefenderProgress::Travelling
        }
    }

    pub(crate) fn snapshot(&self) -> DefenderSnapshot {
        DefenderSnapshot {
            id: self.id,
            truck: self.truck,
            requester: self.requester,
            position: self.position,
            target_x: self.target_x,
            tower: self.tower,
            age: std::time::Duration::from_secs_f32(self.age),
        }
    }
}
