//! ECS systems вокруг `ProjectileSimulator`
//!
//! Gameplay не трогает batches напрямую: пишет `SpawnProjectile` /
//! `ClearProjectiles` (или берёт `ResMut<ProjectileSimulator>`).
//! Все системы в FixedUpdate, `.chain()` - spawn и pass никогда не пересекаются.

use bevy::prelude::*;
use bevy_rapier3d::prelude::ReadRapierContext;

use super::pass::{FrameStats, ProjectileImpact, ProjectileSimulator, SpawnOutcome};
use crate::archetype::ArchetypeId;
use crate::collision::{with_collision_world, BreakableTargets, ProjectileColliders};
use crate::effects::EffectPools;
use crate::error::SimulationError;
use crate::logger;
use crate::render::ProjectileDrawQueue;

/// Event: запустить projectile
#[derive(Event, Debug, Clone)]
pub struct SpawnProjectile {
    pub archetype: ArchetypeId,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Event: сбросить все batches (level reset)
#[derive(Event, Debug, Clone, Default)]
pub struct ClearProjectiles;

/// Event: spawn отклонён (batch полон / неизвестный архетип)
#[derive(Event, Debug, Clone)]
pub struct SpawnRejected {
    pub request: SpawnProjectile,
    pub error: SimulationError,
}

/// Статистика последнего pass (debug overlay, тесты)
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ProjectileFrameStats(pub FrameStats);

/// Система: ClearProjectiles → `ProjectileSimulator::clear`
pub fn process_clear_requests(
    mut requests: EventReader<ClearProjectiles>,
    mut simulator: ResMut<ProjectileSimulator>,
) {
    if requests.is_empty() {
        return;
    }
    requests.clear();

    let dropped = simulator.total_live();
    simulator.clear();
    logger::log_info(&format!("Projectiles cleared ({} dropped)", dropped));
}

/// Система: SpawnProjectile → `ProjectileSimulator::spawn`
///
/// `OutOfCapacity` здесь не фатален: warning + `SpawnRejected`, выстрел теряется.
#[allow(clippy::too_many_arguments)]
pub fn process_spawn_requests(
    mut requests: EventReader<SpawnProjectile>,
    mut simulator: ResMut<ProjectileSimulator>,
    rapier: ReadRapierContext,
    colliders: Res<ProjectileColliders>,
    mut targets: BreakableTargets,
    mut effects: ResMut<EffectPools>,
    mut impacts: EventWriter<ProjectileImpact>,
    mut rejected: EventWriter<SpawnRejected>,
) {
    if requests.is_empty() {
        return;
    }

    with_collision_world(&rapier, &colliders, |world| {
        for request in requests.read() {
            let outcome = simulator.spawn(
                request.archetype,
                request.position,
                request.rotation,
                world,
                &mut targets,
                &mut *effects,
            );

            match outcome {
                Ok(SpawnOutcome::Launched { .. }) => {}
                Ok(SpawnOutcome::PointBlank(impact)) => {
                    impacts.write(impact);
                }
                Err(error) => {
                    logger::log_warning(&format!("Projectile spawn rejected: {}", error));
                    rejected.write(SpawnRejected {
                        request: request.clone(),
                        error,
                    });
                }
            }
        }
    });
}

/// Система: per-frame pass (advance/collide/cull/compact + draw submit)
#[allow(clippy::too_many_arguments)]
pub fn advance_projectiles(
    time: Res<Time<Fixed>>,
    mut simulator: ResMut<ProjectileSimulator>,
    rapier: ReadRapierContext,
    colliders: Res<ProjectileColliders>,
    mut targets: BreakableTargets,
    mut effects: ResMut<EffectPools>,
    mut draw_queue: ResMut<ProjectileDrawQueue>,
    mut stats: ResMut<ProjectileFrameStats>,
    mut impacts: EventWriter<ProjectileImpact>,
) {
    let dt = time.delta_secs();
    draw_queue.begin_frame();

    stats.0 = with_collision_world(&rapier, &colliders, |world| {
        simulator.tick(dt, world, &mut targets, &mut *effects, &mut *draw_queue)
    });

    for impact in simulator.impacts() {
        impacts.write(*impact);
    }
}
