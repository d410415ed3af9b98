//! Runtime конфигурация симуляции (не tuning архетипов - тот в каталоге)

use std::env;

use bevy::prelude::*;

use crate::collision::CollisionMask;

/// Default capacity одного batch (live projectiles на архетип)
pub const DEFAULT_BATCH_CAPACITY: usize = 1024;

/// Сколько effect instances держит один pool
pub const DEFAULT_EFFECT_POOL_SIZE: usize = 10;

/// Fixed timestep симуляции
pub const DEFAULT_FIXED_HZ: f64 = 60.0;

/// Конфигурация симуляции
///
/// Читается один раз при построении `ProjectileSimulator`; после старта
/// capacity batch'ей уже не меняется.
#[derive(Resource, Debug, Clone)]
pub struct SimulationConfig {
    /// Частота FixedUpdate (Hz)
    pub fixed_hz: f64,
    /// Capacity для архетипов без собственного `capacity`
    pub default_capacity: usize,
    /// Instances на один effect pool
    pub effect_pool_size: usize,
    /// Сколько секунд effect instance считается занятым после play
    pub effect_duration: f32,
    /// Какие collision groups projectiles видят
    pub hit_mask: CollisionMask,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_hz: DEFAULT_FIXED_HZ,
            default_capacity: DEFAULT_BATCH_CAPACITY,
            effect_pool_size: DEFAULT_EFFECT_POOL_SIZE,
            effect_duration: 1.0,
            hit_mask: CollisionMask::ALL,
        }
    }
}

impl SimulationConfig {
    /// Defaults + overrides из `BARRAGE_*` переменных окружения.
    ///
    /// Значения, которые не парсятся, игнорируются.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            fixed_hz: env_parse("BARRAGE_FIXED_HZ")
                .filter(|hz: &f64| *hz > 0.0)
                .unwrap_or(defaults.fixed_hz),
            default_capacity: env_parse("BARRAGE_DEFAULT_CAPACITY")
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(defaults.default_capacity),
            effect_pool_size: env_parse("BARRAGE_EFFECT_POOL_SIZE")
                .filter(|size: &usize| *size > 0)
                .unwrap_or(defaults.effect_pool_size),
            effect_duration: env_parse("BARRAGE_EFFECT_DURATION")
                .filter(|secs: &f32| secs.is_finite() && *secs >= 0.0)
                .unwrap_or(defaults.effect_duration),
            hit_mask: env_parse("BARRAGE_HIT_MASK")
                .map(CollisionMask)
                .unwrap_or(defaults.hit_mask),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
