//! Projectile Simulator (core) + ECS plugin
//!
//! Ответственность:
//! - `pass`: ProjectileSimulator - spawn / per-frame pass / clear (чистый Rust,
//!   collaborators через traits)
//! - `systems`: Bevy системы, events, wiring к Rapier / Breakable / effect pools
//!
//! Один симулятор на мир - обычный Resource, не global singleton.

use bevy::prelude::*;

pub mod pass;
pub mod systems;

#[cfg(test)]
mod simulator_tests;

pub use pass::{FrameStats, ImpactKind, ProjectileImpact, ProjectileSimulator, SpawnOutcome};
pub use systems::{
    advance_projectiles, process_clear_requests, process_spawn_requests, ClearProjectiles,
    ProjectileFrameStats, SpawnProjectile, SpawnRejected,
};

use crate::archetype::ArchetypeCatalog;
use crate::collision::{Breakable, BreakableBroken, ProjectileColliders};
use crate::config::SimulationConfig;
use crate::effects::{tick_effect_pools, EffectPools};
use crate::logger;
use crate::render::ProjectileDrawQueue;

/// Projectile Plugin
///
/// Регистрирует симулятор и системы в FixedUpdate.
///
/// Порядок выполнения:
/// 1. process_clear_requests - level reset
/// 2. process_spawn_requests - новые выстрелы (point-blank check)
/// 3. advance_projectiles - advance/collide/cull/compact + draw queue
/// 4. tick_effect_pools - возврат effect instances в pools
///
/// `SimulationConfig` берётся из App, если уже вставлен, иначе default.
pub struct ProjectilePlugin {
    pub catalog: ArchetypeCatalog,
}

impl ProjectilePlugin {
    pub fn new(catalog: ArchetypeCatalog) -> Self {
        Self { catalog }
    }
}

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<SimulationConfig>()
            .cloned()
            .unwrap_or_default();

        let mut effects = EffectPools::new(config.effect_pool_size, config.effect_duration);
        effects.prewarm(self.catalog.iter().flat_map(|(_, archetype)| {
            archetype.muzzle_effect.into_iter().chain(archetype.impact_effect)
        }));

        logger::log_info(&format!(
            "ProjectilePlugin: {} archetypes, default capacity {}",
            self.catalog.len(),
            config.default_capacity
        ));

        app.insert_resource(ProjectileColliders::for_catalog(&self.catalog))
            .insert_resource(ProjectileSimulator::new(self.catalog.clone(), &config))
            .insert_resource(effects)
            .insert_resource(config)
            .init_resource::<ProjectileDrawQueue>()
            .init_resource::<ProjectileFrameStats>()
            .register_type::<Breakable>();

        app.add_event::<SpawnProjectile>()
            .add_event::<ClearProjectiles>()
            .add_event::<SpawnRejected>()
            .add_event::<ProjectileImpact>()
            .add_event::<BreakableBroken>();

        app.add_systems(
            FixedUpdate,
            (
                process_clear_requests,
                process_spawn_requests,
                advance_projectiles,
                tick_effect_pools,
            )
                .chain(),
        );
    }
}
