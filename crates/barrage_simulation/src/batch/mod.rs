//! Projectile Batch Store
//!
//! На каждый архетип - packed массив fixed capacity + live count.
//! Инвариант: slots `[0, live)` активны и contiguous, `[live, capacity)` - stale.
//! Удаление только через swap-with-last (порядок не сохраняется).
//!
//! Никакого resize: вся память выделяется при построении store.

pub mod compaction;


use bevy::prelude::*;

use crate::archetype::ArchetypeId;
use crate::error::SimulationError;

pub use compaction::{remove_marked, sort_descending};

/// Forward vector ориентации (Bevy convention: -Z)
pub const FORWARD: Vec3 = Vec3::NEG_Z;

/// State одного projectile (constant-velocity ray)
///
/// Identity нет - только slot. После compaction "тот же" projectile
/// может оказаться в другом slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileState {
    pub archetype: ArchetypeId,
    /// Точка старта луча
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Пройденная дистанция (только растёт)
    pub traveled: f32,
    /// Ориентация (только для визуала)
    pub rotation: Quat,
}

impl ProjectileState {
    /// Новый projectile: origin = position, direction = forward ориентации
    pub fn launch(archetype: ArchetypeId, position: Vec3, rotation: Quat) -> Self {
        Self {
            archetype,
            origin: position,
            direction: (rotation * FORWARD).try_normalize().unwrap_or(FORWARD),
            traveled: 0.0,
            rotation,
        }
    }

    /// position = origin + direction × traveled
    pub fn position(&self) -> Vec3 {
        self.origin + self.direction * self.traveled
    }

    pub fn advance(&mut self, distance: f32) {
        self.traveled += distance.max(0.0);
    }
}

/// Fixed-capacity packed batch одного архетипа
#[derive(Debug, Clone)]
pub struct ProjectileBatch {
    archetype: ArchetypeId,
    slots: Vec<ProjectileState>,
    live: usize,
}

impl ProjectileBatch {
    pub fn with_capacity(archetype: ArchetypeId, capacity: usize) -> Self {
        let placeholder = ProjectileState {
            archetype,
            origin: Vec3::ZERO,
            direction: FORWARD,
            traveled: 0.0,
            rotation: Quat::IDENTITY,
        };

        Self {
            archetype,
            slots: vec![placeholder; capacity],
            live: 0,
        }
    }

    pub fn archetype(&self) -> ArchetypeId {
        self.archetype
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Активные slots `[0, live)`
    pub fn live(&self) -> &[ProjectileState] {
        &self.slots[..self.live]
    }

    pub fn live_mut(&mut self) -> &mut [ProjectileState] {
        &mut self.slots[..self.live]
    }

    /// Добавляет state в конец. Full → `OutOfCapacity`, batch не тронут
    pub fn append(&mut self, state: ProjectileState) -> Result<usize, SimulationError> {
        if self.is_full() {
            return Err(SimulationError::OutOfCapacity {
                archetype: self.archetype,
                capacity: self.capacity(),
            });
        }

        let slot = self.live;
        self.slots[slot] = state;
        self.live += 1;
        Ok(slot)
    }

    /// Перезаписывает `slot` последним live slot'ом и уменьшает live count.
    ///
    /// Возвращает индекс, откуда пришёл state (`live - 1` до удаления),
    /// чтобы caller мог зеркалить swap в параллельных буферах.
    /// `None` если slot не активен.
    pub fn remove_swap_last(&mut self, slot: usize) -> Option<usize> {
        if slot >= self.live {
            return None;
        }

        let last = self.live - 1;
        self.slots[slot] = self.slots[last];
        self.live = last;
        Some(last)
    }

    /// Сброс (level reset). Память не освобождается
    pub fn clear(&mut self) {
        self.live = 0;
    }
}

/// Все batches, индекс = `ArchetypeId`
#[derive(Debug, Clone, Default)]
pub struct BatchStore {
    batches: Vec<ProjectileBatch>,
}

impl BatchStore {
    /// Один batch на каждую capacity (порядок = порядок архетипов в каталоге)
    pub fn new(capacities: impl IntoIterator<Item = usize>) -> Self {
        Self {
            batches: capacities
                .into_iter()
                .enumerate()
                .map(|(index, capacity)| ProjectileBatch::with_capacity(ArchetypeId(index), capacity))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batch(&self, archetype: ArchetypeId) -> Result<&ProjectileBatch, SimulationError> {
        self.batches
            .get(archetype.0)
            .ok_or(SimulationError::UnknownArchetype(archetype))
    }

    pub fn batch_mut(
        &mut self,
        archetype: ArchetypeId,
    ) -> Result<&mut ProjectileBatch, SimulationError> {
        self.batches
            .get_mut(archetype.0)
            .ok_or(SimulationError::UnknownArchetype(archetype))
    }

    pub fn capacity_for(&self, archetype: ArchetypeId) -> Result<usize, SimulationError> {
        self.batch(archetype).map(ProjectileBatch::capacity)
    }

    pub fn append(
        &mut self,
        archetype: ArchetypeId,
        state: ProjectileState,
    ) -> Result<usize, SimulationError> {
        self.batch_mut(archetype)?.append(state)
    }

    pub fn remove_swap_last(
        &mut self,
        archetype: ArchetypeId,
        slot: usize,
    ) -> Result<Option<usize>, SimulationError> {
        Ok(self.batch_mut(archetype)?.remove_swap_last(slot))
    }

    pub fn clear(&mut self) {
        for batch in self.batches.iter_mut() {
            batch.clear();
        }
    }

    pub fn total_live(&self) -> usize {
        self.batches.iter().map(ProjectileBatch::live_count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectileBatch> {
        self.batches.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProjectileBatch> {
        self.batches.iter_mut()
    }
}
