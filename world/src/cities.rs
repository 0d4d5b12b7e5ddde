//! City state, reputation bookkeeping, and ground-line layout.

use std::collections::BTreeMap;

use skyline_defence_core::{CityId, CitySnapshot, Field, Stance, TruckId, Vec2};

pub(crate) const CITY_MAX_HEALTH: f32 = 100.0;
pub(crate) const CITY_WIDTH: f32 = 60.0;
pub(crate) const CITY_HEIGHT: f32 = 40.0;
pub(crate) const CITY_REPAIR_RATE: f32 = 0.5;
pub(crate) const CITY_GROUND_OFFSET: f32 = 30.0;

const HELPFULNESS_LIMIT: f32 = 100.0;
const COMMUNICATION_WINDOW: f32 = 2.0;

#[derive(Clone, Debug)]
pub(crate) struct CityState {
    pub(crate) id: CityId,
    pub(crate) position: Vec2,
    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) repair_rate: f32,
    pub(crate) destroyed: bool,
    pub(crate) helpfulness: f32,
    pub(crate) ledger: BTreeMap<CityId, i32>,
    pub(crate) left_truck: Option<TruckId>,
    pub(crate) right_truck: Option<TruckId>,
    pub(crate) communicating_with: Option<CityId>,
    pub(crate) communication_timer: f32,
    pub(crate) super_weapon_vote: bool,
    pub(crate) concern: f32,
}

impl CityState {
    pub(crate) fn new(id: CityId, position: Vec2) -> Self {
        Self {
            id,
            position,
            health: CITY_MAX_HEALTH,
            max_health: CITY_MAX_HEALTH,
            repair_rate: CITY_REPAIR_RATE,
            destroyed: false,
            helpfulness: 0.0,
            ledger: BTreeMap::new(),
            left_truck: None,
            right_truck: None,
            communicating_with: None,
            communication_timer: 0.0,
            super_weapon_vote: false,
            concern: 0.0,
        }
    }

    /// Carries health, reputation, and ledger entries over from a previous
    /// layout, dropping ledger entries for cities that no longer exist.
    pub(crate) fn inherit(&mut self, previous: &CityState, count: u32) {
        self.health = previous.health;
        self.max_health = previous.max_health;
        self.destroyed = previous.destroyed;
        self.helpfulness = previous.helpfulness;
        self.ledger = previous
            .ledger
            .iter()
            .filter(|(neighbor, _)| neighbor.get() < count)
            .map(|(neighbor, balance)| (*neighbor, *balance))
            .collect();
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.destroyed
    }

    pub(crate) fn stance(&self) -> Stance {
        Stance::from_helpfulness(self.helpfulness)
    }

    pub(crate) fn adjust_helpfulness(&mut self, delta: f32) {
        self.helpfulness = (self.helpfulness + delta).clamp(-HELPFULNESS_LIMIT, HELPFULNESS_LIMIT);
    }

    pub(crate) fn adjust_ledger(&mut self, neighbor: CityId, delta: i32) {
        let entry = self.ledger.entry(neighbor).or_insert(0);
        *entry = entry.saturating_add(delta);
    }

    pub(crate) fn begin_communication(&mut self, neighbor: CityId) {
        self.communicating_with = Some(neighbor);
        self.communication_timer = COMMUNICATION_WINDOW;
    }

    pub(crate) fn tick_communication(&mut self, dt: f32) {
        if self.communicating_with.is_none() {
            return;
        }
        self.communication_timer -= dt;
        if self.communication_timer <= 0.0 {
            self.communication_timer = 0.0;
            self.communicating_with = None;
        }
    }

    /// Subtracts damage and reports whether this call destroyed the city.
    pub(crate) fn take_damage(&mut self, damage: f32) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = (self.health - damage).max(0.0);
        if self.health <= 0.0 {
            self.destroyed = true;
            return true;
        }
        false
    }

    pub(crate) fn heal(&mut self, amount: f32) {
        if self.destroyed {
            return;
        }
        self.health = (self.health + amount).min(self.max_health);
    }

    pub(crate) fn snapshot(&self, active_towers: u32) -> CitySnapshot {
        CitySnapshot {
            id: self.id,
            position: self.position,
            width: CITY_WIDTH,
            health: self.health,
            max_health: self.max_health,
            destroyed: self.destroyed,
            stance: self.stance(),
            helpfulness: self.helpfulness,
            ledger: self.ledger.clone(),
            left_truck: self.left_truck,
            right_truck: self.right_truck,
            communicating_with: self.communicating_with,
            super_weapon_vote: self.super_weapon_vote,
            concern: self.concern,
            active_towers,
        }
    }
}

/// Evenly spaced city centers along the ground line.
pub(crate) fn layout(field: Field, count: u32) -> Vec<Vec2> {
    let slots = count as f32 + 1.0;
    let y = field.height - CITY_GROUND_OFFSET;
    (0..count)
        .map(|index| Vec2::new(field.width * (index as f32 + 1.0) / slots, y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_spaces_cities_evenly() {
        let positions = layout(Field::new(800.0, 600.0), 3);
        let xs: Vec<f32> = positions.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![200.0, 400.0, 600.0]);
        assert!(positions.iter().all(|p| p.y == 570.0));
    }

    #[test]
    fn destruction_is_reported_once() {
        let mut city = CityState::new(CityId::new(0), Vec2::ZERO);
        assert!(city.take_damage(150.0));
        assert_eq!(city.health, 0.0);
        assert!(!city.take_damage(10.0));
        city.heal(30.0);
        assert_eq!(city.health, 0.0);
    }

    #[test]
    fn helpfulness_is_clamped() {
        let mut city = CityState::new(CityId::new(0), Vec2::ZERO);
        for _ in 0..30 {
            city.adjust_helpfulness(10.0);
        }
        assert_eq!(city.helpfulness, 100.0);
        assert_eq!(city.stance(), Stance::Cooperative);
    }

    #[test]
    fn inherit_drops_ledger_entries_for_removed_cities() {
        let mut previous = CityState::new(CityId::new(0), Vec2::ZERO);
        previous.adjust_ledger(CityId::new(1), 2);
        previous.adjust_ledger(CityId::new(5), -1);
        previous.health = 40.0;
        let mut fresh = CityState::new(CityId::new(0), Vec2::new(10.0, 0.0));
        fresh.inherit(&previous, 3);
        assert_eq!(fresh.health, 40.0);
        assert_eq!(fresh.ledger.len(), 1);
        assert_eq!(fresh.ledger.get(&CityId::new(1)), Some(&2));
    }

    #[test]
    fn communication_flag_expires() {
        let mut city = CityState::new(CityId::new(0), Vec2::ZERO);
        city.begin_communication(CityId::new(1));
        city.tick_communication(1.5);
        assert_eq!(city.communicating_with, Some(CityId::new(1)));
        city.tick_communication(0.6);
        assert!(city.communicating_with.is_none());
    }
}
