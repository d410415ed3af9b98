//! Collision boundary симуляции
//!
//! Симуляция не знает про physics engine - только два запроса:
//! - sweep: sphere cast вдоль луча → ближайшая поверхность + дистанция
//! - overlap: sphere overlap в точке → все поверхности (детерминированный порядок)
//!
//! И про damage capability: `HitTargets::apply_damage` → false, если у
//! поверхности нет Hit Target (попадание всё равно засчитывается).

pub mod breakable;
pub mod rapier;

use bevy::prelude::*;

pub use breakable::{Breakable, BreakableBroken, BreakableTargets};
pub use rapier::{with_collision_world, ProjectileColliders, RapierCollisionWorld};

/// Bitmask collision groups, которые projectiles видят
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const ALL: CollisionMask = CollisionMask(u32::MAX);
    pub const NONE: CollisionMask = CollisionMask(0);

    pub fn contains(self, groups: u32) -> bool {
        self.0 & groups != 0
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Результат sweep: первая поверхность на пути
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub surface: Entity,
    /// Дистанция вдоль направления до контакта (0..=max_distance)
    pub distance: f32,
}

/// Physics queries (реализует physics backend)
pub trait CollisionQuery {
    /// Sphere sweep из `origin` вдоль unit `direction` на `max_distance`
    fn sweep(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<SweepHit>;

    /// Все поверхности, пересекающие сферу. Порядок детерминирован для одного мира.
    ///
    /// Результаты дописываются в `out` (caller держит reusable буфер).
    fn overlap(&self, point: Vec3, radius: f32, mask: CollisionMask, out: &mut Vec<Entity>);
}

/// Hit Target capability lookup
pub trait HitTargets {
    /// Наносит урон поверхности. `false` - у поверхности нет Hit Target
    fn apply_damage(&mut self, surface: Entity, amount: f32) -> bool;
}

/// Мир без коллизий (headless без physics context)
pub struct EmptyCollisionWorld;

impl CollisionQuery for EmptyCollisionWorld {
    fn sweep(&self, _: Vec3, _: Vec3, _: f32, _: f32, _: CollisionMask) -> Option<SweepHit> {
        None
    }

    fn overlap(&self, _: Vec3, _: f32, _: CollisionMask, _: &mut Vec<Entity>) {}
}

/// Targets без damage capability (всё попадания - "no-target hit")
pub struct NoHitTargets;

impl HitTargets for NoHitTargets {
    fn apply_damage(&mut self, _: Entity, _: f32) -> bool {
        false
    }
}
