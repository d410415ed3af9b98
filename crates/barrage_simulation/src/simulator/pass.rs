//! ProjectileSimulator - per-frame advance/collide/cull/compact + spawn
//!
//! Per-frame pass (на каждый архетип независимо):
//! 1. step = speed × dt
//! 2. scan live slots по возрастанию индекса:
//!    - sweep hit → damage, traveled += hit distance, impact effect, mark
//!    - no hit → traveled += step; > max_range → mark (тихо), иначе transform в буфер
//! 3. compaction: marked indices по УБЫВАНИЮ, swap-with-last
//! 4. draw submit с post-compaction live count
//!
//! Steady state без аллокаций: batches, render buffers и scratch для
//! marked indices выделены в `new`.

use bevy::prelude::*;

use crate::archetype::{ArchetypeCatalog, ArchetypeId, ProjectileArchetype};
use crate::batch::{remove_marked, BatchStore, ProjectileBatch, ProjectileState};
use crate::collision::{CollisionMask, CollisionQuery, HitTargets};
use crate::config::SimulationConfig;
use crate::effects::EffectEmitter;
use crate::error::SimulationError;
use crate::render::{projectile_transform, DrawSubmitter, RenderBuffer};

/// Как projectile встретил поверхность
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactKind {
    /// Sweep во время полёта
    Swept,
    /// Spawn внутри коллайдера (projectile не создан)
    PointBlank,
}

/// Событие: projectile попал в поверхность
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ProjectileImpact {
    pub archetype: ArchetypeId,
    pub surface: Entity,
    /// Точка остановки (для PointBlank - точка spawn)
    pub position: Vec3,
    /// false - у поверхности нет Hit Target, урон не нанесён
    pub damaged: bool,
    pub kind: ImpactKind,
}

/// Результат spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnOutcome {
    /// Projectile добавлен в batch
    Launched { slot: usize },
    /// Мгновенное попадание в упор, projectile не создан
    PointBlank(ProjectileImpact),
}

/// Статистика одного per-frame pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Попадания (sweep)
    pub hits: usize,
    /// Тихо исчезли по max range
    pub expired: usize,
    /// Live projectiles после compaction (все архетипы)
    pub live: usize,
}

/// Симулятор projectiles (один на мир)
#[derive(Resource)]
pub struct ProjectileSimulator {
    catalog: ArchetypeCatalog,
    batches: BatchStore,
    render_buffers: Vec<RenderBuffer>,
    /// Scratch: marked-for-removal indices текущего архетипа
    marked: Vec<usize>,
    /// Scratch: результаты overlap при spawn
    overlaps: Vec<Entity>,
    /// Swept impacts последнего pass
    impacts: Vec<ProjectileImpact>,
    hit_mask: CollisionMask,
}

impl ProjectileSimulator {
    pub fn new(catalog: ArchetypeCatalog, config: &SimulationConfig) -> Self {
        let capacities: Vec<usize> = catalog
            .iter()
            .map(|(_, archetype)| archetype.capacity.unwrap_or(config.default_capacity))
            .collect();

        let max_capacity = capacities.iter().copied().max().unwrap_or(0);
        let total_capacity = capacities.iter().sum();

        Self {
            render_buffers: capacities
                .iter()
                .map(|&capacity| RenderBuffer::with_capacity(capacity))
                .collect(),
            batches: BatchStore::new(capacities),
            catalog,
            marked: Vec::with_capacity(max_capacity),
            overlaps: Vec::with_capacity(16),
            impacts: Vec::with_capacity(total_capacity),
            hit_mask: config.hit_mask,
        }
    }

    pub fn catalog(&self) -> &ArchetypeCatalog {
        &self.catalog
    }

    pub fn hit_mask(&self) -> CollisionMask {
        self.hit_mask
    }

    /// Имя архетипа → id (`UnknownArchetypeName` если нет)
    pub fn resolve(&self, name: &str) -> Result<ArchetypeId, SimulationError> {
        self.catalog
            .resolve(name)
            .ok_or_else(|| SimulationError::UnknownArchetypeName(name.to_string()))
    }

    pub fn batch(&self, archetype: ArchetypeId) -> Result<&ProjectileBatch, SimulationError> {
        self.batches.batch(archetype)
    }

    pub fn capacity_for(&self, archetype: ArchetypeId) -> Result<usize, SimulationError> {
        self.batches.capacity_for(archetype)
    }

    pub fn live_count(&self, archetype: ArchetypeId) -> Result<usize, SimulationError> {
        self.batches.batch(archetype).map(ProjectileBatch::live_count)
    }

    pub fn total_live(&self) -> usize {
        self.batches.total_live()
    }

    /// Transforms, отданные на draw в последнем pass (`[..live_count]`)
    pub fn instances(&self, archetype: ArchetypeId) -> Result<&[Mat4], SimulationError> {
        let live = self.live_count(archetype)?;
        Ok(&self.render_buffers[archetype.0].as_slice()[..live])
    }

    /// Swept impacts последнего `tick`
    pub fn impacts(&self) -> &[ProjectileImpact] {
        &self.impacts
    }

    /// Level reset: live count всех batch'ей = 0. Effects не трогаем
    pub fn clear(&mut self) {
        self.batches.clear();
        self.impacts.clear();
    }

    /// Запуск projectile.
    ///
    /// Сначала overlap в точке spawn: если там уже есть поверхность - попадание
    /// в упор (damage первой поверхности в порядке provider'а, impact effect в
    /// точке spawn), projectile не создаётся. Иначе append в batch + muzzle effect.
    /// Muzzle effect играет даже при `OutOfCapacity`; batch при этом не меняется.
    pub fn spawn<C, T, E>(
        &mut self,
        archetype_id: ArchetypeId,
        position: Vec3,
        rotation: Quat,
        collision: &C,
        targets: &mut T,
        effects: &mut E,
    ) -> Result<SpawnOutcome, SimulationError>
    where
        C: CollisionQuery + ?Sized,
        T: HitTargets + ?Sized,
        E: EffectEmitter + ?Sized,
    {
        let archetype = self
            .catalog
            .get(archetype_id)
            .ok_or(SimulationError::UnknownArchetype(archetype_id))?;

        // Иначе enclosing collider (стреляем изнутри) был бы пропущен sweep'ом
        self.overlaps.clear();
        collision.overlap(
            position,
            archetype.collision_radius,
            self.hit_mask,
            &mut self.overlaps,
        );

        if let Some(&surface) = self.overlaps.first() {
            let damaged = targets.apply_damage(surface, archetype.damage);
            if let Some(effect) = archetype.impact_effect {
                effects.trigger(effect, position);
            }

            return Ok(SpawnOutcome::PointBlank(ProjectileImpact {
                archetype: archetype_id,
                surface,
                position,
                damaged,
                kind: ImpactKind::PointBlank,
            }));
        }

        let appended = self
            .batches
            .append(archetype_id, ProjectileState::launch(archetype_id, position, rotation));

        if let Some(effect) = archetype.muzzle_effect {
            effects.trigger(effect, position);
        }

        let slot = appended?;
        Ok(SpawnOutcome::Launched { slot })
    }

    /// Per-frame pass по всем архетипам. Никогда не падает:
    /// отрицательный / NaN / inf `dt` считается нулём.
    pub fn tick<C, T, E, D>(
        &mut self,
        dt: f32,
        collision: &C,
        targets: &mut T,
        effects: &mut E,
        draw: &mut D,
    ) -> FrameStats
    where
        C: CollisionQuery + ?Sized,
        T: HitTargets + ?Sized,
        E: EffectEmitter + ?Sized,
        D: DrawSubmitter + ?Sized,
    {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let Self {
            catalog,
            batches,
            render_buffers,
            marked,
            impacts,
            hit_mask,
            ..
        } = self;

        impacts.clear();
        let mut stats = FrameStats::default();

        let lanes = catalog
            .iter()
            .zip(batches.iter_mut())
            .zip(render_buffers.iter_mut());

        for (((id, archetype), batch), buffer) in lanes {
            let mut pass = BatchPass {
                id,
                archetype,
                mask: *hit_mask,
                marked: &mut *marked,
                impacts: &mut *impacts,
            };
            pass.scan(batch, buffer, dt, collision, targets, effects, &mut stats);

            // Swap-with-last по убыванию; буфер transforms повторяет каждый swap,
            // так что [..live] всегда принадлежит выжившим
            remove_marked(batch, marked.as_mut_slice(), |slot, source| {
                buffer.mirror_swap(slot, source)
            });

            draw.submit(
                archetype.mesh,
                archetype.material,
                buffer.as_slice(),
                batch.live_count(),
            );
            stats.live += batch.live_count();
        }

        stats
    }
}

/// Scan одного batch (шаг 2 pass)
struct BatchPass<'a> {
    id: ArchetypeId,
    archetype: &'a ProjectileArchetype,
    mask: CollisionMask,
    marked: &'a mut Vec<usize>,
    impacts: &'a mut Vec<ProjectileImpact>,
}

impl BatchPass<'_> {
    #[allow(clippy::too_many_arguments)]
    fn scan<C, T, E>(
        &mut self,
        batch: &mut ProjectileBatch,
        buffer: &mut RenderBuffer,
        dt: f32,
        collision: &C,
        targets: &mut T,
        effects: &mut E,
        stats: &mut FrameStats,
    ) where
        C: CollisionQuery + ?Sized,
        T: HitTargets + ?Sized,
        E: EffectEmitter + ?Sized,
    {
        let archetype = self.archetype;
        let step = archetype.speed * dt;
        let radius = archetype.collision_radius;

        self.marked.clear();

        for (slot, state) in batch.live_mut().iter_mut().enumerate() {
            let hit = collision.sweep(state.position(), state.direction, radius, step, self.mask);

            match hit {
                Some(hit) => {
                    // Нет Hit Target - всё равно останавливаемся, просто без урона
                    let damaged = targets.apply_damage(hit.surface, archetype.damage);

                    // Останавливаемся на поверхности, не на полном step
                    state.advance(hit.distance.min(step));
                    let position = state.position();

                    if let Some(effect) = archetype.impact_effect {
                        effects.trigger(effect, position);
                    }

                    self.impacts.push(ProjectileImpact {
                        archetype: self.id,
                        surface: hit.surface,
                        position,
                        damaged,
                        kind: ImpactKind::Swept,
                    });
                    self.marked.push(slot);
                    stats.hits += 1;
                }
                None => {
                    state.advance(step);

                    if state.traveled > archetype.max_range {
                        self.marked.push(slot);
                        stats.expired += 1;
                        continue;
                    }

                    buffer.write(
                        slot,
                        projectile_transform(state.position(), state.rotation, radius),
                    );
                }
            }
        }
    }
}
