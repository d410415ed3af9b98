//! Effect emitter pools (muzzle flash, impact blast)
//!
//! Pool владеет recycling'ом: `acquire` отдаёт неактивный instance,
//! а если все заняты - переиспользует самый старый (round-robin cursor).
//! Сам playback (particles) делает host; здесь только state instances.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::Deserialize;

/// Opaque handle эффекта (prefab/asset на стороне host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct EffectHandle(pub u32);

/// Один reusable instance эффекта
#[derive(Debug, Clone, Default)]
pub struct EffectInstance {
    pub position: Vec3,
    pub playing: bool,
    /// Сколько секунд осталось до возврата в pool
    pub remaining: f32,
    /// Сколько раз instance был запущен (для host: "перезапусти particles")
    pub generation: u32,
}

impl EffectInstance {
    pub fn play(&mut self, position: Vec3, duration: f32) {
        self.position = position;
        self.playing = true;
        self.remaining = duration;
        self.generation = self.generation.wrapping_add(1);
    }

    fn tick(&mut self, delta: f32) {
        if !self.playing {
            return;
        }
        self.remaining -= delta;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.playing = false;
        }
    }
}

/// Pool instances одного эффекта (fixed size)
#[derive(Debug, Clone)]
pub struct EffectPool {
    instances: Vec<EffectInstance>,
    cursor: usize,
}

impl EffectPool {
    pub fn new(size: usize) -> Self {
        Self {
            instances: vec![EffectInstance::default(); size.max(1)],
            cursor: 0,
        }
    }

    /// Неактивный instance; если все играют - самый старый по cursor
    pub fn acquire(&mut self) -> &mut EffectInstance {
        let len = self.instances.len();
        let slot = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .find(|&index| !self.instances[index].playing)
            .unwrap_or(self.cursor);

        self.cursor = (slot + 1) % len;
        &mut self.instances[slot]
    }

    pub fn tick(&mut self, delta: f32) {
        for instance in self.instances.iter_mut() {
            instance.tick(delta);
        }
    }

    pub fn active_count(&self) -> usize {
        self.instances.iter().filter(|instance| instance.playing).count()
    }

    pub fn instances(&self) -> &[EffectInstance] {
        &self.instances
    }
}

/// Boundary: "сыграй эффект в точке"
pub trait EffectEmitter {
    fn trigger(&mut self, effect: EffectHandle, position: Vec3);
}

/// Все effect pools (ECS resource), ключ - handle эффекта
#[derive(Resource, Debug, Clone)]
pub struct EffectPools {
    pools: HashMap<EffectHandle, EffectPool>,
    pool_size: usize,
    duration: f32,
}

impl EffectPools {
    pub fn new(pool_size: usize, duration: f32) -> Self {
        Self {
            pools: HashMap::new(),
            pool_size,
            duration,
        }
    }

    /// Pre-warm pools для всех handles (чтобы trigger в кадре не аллоцировал)
    pub fn prewarm(&mut self, handles: impl IntoIterator<Item = EffectHandle>) {
        for handle in handles {
            let size = self.pool_size;
            self.pools.entry(handle).or_insert_with(|| EffectPool::new(size));
        }
    }

    pub fn pool(&self, handle: EffectHandle) -> Option<&EffectPool> {
        self.pools.get(&handle)
    }

    pub fn tick(&mut self, delta: f32) {
        for pool in self.pools.values_mut() {
            pool.tick(delta);
        }
    }
}

impl EffectEmitter for EffectPools {
    fn trigger(&mut self, effect: EffectHandle, position: Vec3) {
        let size = self.pool_size;
        let duration = self.duration;
        self.pools
            .entry(effect)
            .or_insert_with(|| EffectPool::new(size))
            .acquire()
            .play(position, duration);
    }
}

/// Система: тикаем lifetimes effect instances
pub fn tick_effect_pools(mut pools: ResMut<EffectPools>, time: Res<Time<Fixed>>) {
    pools.tick(time.delta_secs());
}
