//! Short-lived projectiles, railgun bolts, and explosions.

use skyline_defence_core::{math::PROJECTILE_SPEED, EnemyId, ExplosionKind, TowerId, Vec2};

pub(crate) const PROJECTILE_RADIUS: f32 = 3.0;
pub(crate) const PROJECTILE_LIFETIME: f32 = 4.0;
pub(crate) const STANDARD_BLAST_RADIUS: f32 = 25.0;
pub(crate) const FLAK_BLAST_RADIUS: f32 = 45.0;

pub(crate) const BOLT_SPEED: f32 = 1_500.0;
pub(crate) const BOLT_RADIUS: f32 = 2.0;
const BOLT_FALLOFF_PER_HIT: f32 = 0.3;

const EXPLOSION_GROWTH: f32 = 0.3;
const EXPLOSION_FADE: f32 = 0.5;

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) tower: TowerId,
    pub(crate) position: Vec2,
    pub(crate) aim: Vec2,
    pub(crate) damage: f32,
    pub(crate) blast_radius: f32,
    pub(crate) age: f32,
    pub(crate) arrived: bool,
    pub(crate) active: bool,
}

impl Projectile {
    pub(crate) fn new(tower: TowerId, origin: Vec2, aim: Vec2, damage: f32, flak: bool) -> Self {
        Self {
            tower,
            position: origin,
            aim,
            damage,
            blast_radius: if flak {
                FLAK_BLAST_RADIUS
            } else {
                STANDARD_BLAST_RADIUS
            },
            age: 0.0,
            arrived: false,
            active: true,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.age += dt;
        if self.age >= PROJECTILE_LIFETIME {
            self.active = false;
            return;
        }
        let remaining = self.aim - self.position;
        let step = PROJECTILE_SPEED * dt;
        if remaining.length() <= step {
            self.position = self.aim;
            self.arrived = true;
        } else {
            self.position += remaining.normalize_or_zero() * step;
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RailgunBolt {
    pub(crate) previous: Vec2,
    pub(crate) position: Vec2,
    pub(crate) direction: Vec2,
    pub(crate) damage: f32,
    pub(crate) pierced: Vec<EnemyId>,
    pub(crate) active: bool,
}

impl RailgunBolt {
    pub(crate) fn new(origin: Vec2, angle: f32, damage: f32) -> Self {
        Self {
            previous: origin,
            position: origin,
            direction: Vec2::new(angle.cos(), -angle.sin()),
            damage,
            pierced: Vec::new(),
            active: true,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.previous = self.position;
        self.position += self.direction * BOLT_SPEED * dt;
    }

    pub(crate) fn has_pierced(&self, enemy: EnemyId) -> bool {
        self.pierced.contains(&enemy)
    }

    /// Damage dealt to the next enemy the bolt passes through.
    pub(crate) fn next_damage(&self) -> f32 {
        let hits = self.pierced.len() as f32;
        self.damage * (1.0 - BOLT_FALLOFF_PER_HIT * hits).max(0.0)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Explosion {
    pub(crate) position: Vec2,
    pub(crate) max_radius: f32,
    pub(crate) kind: ExplosionKind,
    pub(crate) age: f32,
    pub(crate) active: bool,
}

impl Explosion {
    pub(crate) fn new(position: Vec2, max_radius: f32, kind: ExplosionKind) -> Self {
        Self {
            position,
            max_radius,
            kind,
            age: 0.0,
            active: true,
        }
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.age += dt;
        if self.age >= EXPLOSION_GROWTH + EXPLOSION_FADE {
            self.active = false;
        }
    }

    pub(crate) fn radius(&self) -> f32 {
        (self.age / EXPLOSION_GROWTH).min(1.0) * self.max_radius
    }

    pub(crate) fn is_fading(&self) -> bool {
        self.age > EXPLOSION_GROWTH
    }
}
