//! BARRAGE Simulation Core
//!
//! Batch-симуляция kinetic projectiles (пули, дробь, гранаты) на Bevy 0.16 ECS.
//!
//! - archetype: immutable каталог видов projectiles
//! - batch: fixed-capacity packed storage на архетип
//! - simulator: per-frame advance/collide/cull/compact + spawn
//! - collision / effects / render: boundaries к physics, VFX и rendering

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod archetype;
pub mod batch;
pub mod collision;
pub mod config;
pub mod effects;
pub mod error;
pub mod logger;
pub mod render;
pub mod simulator;

// Re-export основных типов
pub use archetype::{ArchetypeCatalog, ArchetypeId, CatalogError, ProjectileArchetype};
pub use batch::{BatchStore, ProjectileBatch, ProjectileState};
pub use collision::{
    Breakable, BreakableBroken, CollisionMask, CollisionQuery, EmptyCollisionWorld, HitTargets,
    SweepHit,
};
pub use config::SimulationConfig;
pub use effects::{EffectEmitter, EffectHandle, EffectPools};
pub use error::SimulationError;
pub use logger::{init_logger, log, log_error, log_info, log_warning};
pub use render::{DrawSubmitter, MaterialHandle, MeshHandle, ProjectileDrawQueue};
pub use simulator::{
    ClearProjectiles, FrameStats, ImpactKind, ProjectileFrameStats, ProjectileImpact,
    ProjectilePlugin, ProjectileSimulator, SpawnOutcome, SpawnProjectile, SpawnRejected,
};

/// Главный plugin симуляции (fixed timestep + RNG + projectiles)
pub struct SimulationPlugin {
    pub catalog: ArchetypeCatalog,
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<SimulationConfig>()
            .cloned()
            .unwrap_or_default();

        app.insert_resource(Time::<Fixed>::from_hz(config.fixed_hz))
            .add_plugins(ProjectilePlugin::new(self.catalog.clone()));

        // RNG может уже быть вставлен create_headless_app (свой seed)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигается вручную: каждый `app.update()` = ровно один fixed step,
/// так что прогоны воспроизводимы независимо от wall clock.
/// Конфигурация - `SimulationConfig::from_env()` (`BARRAGE_*` overrides).
pub fn create_headless_app(seed: u64) -> App {
    init_logger();

    let config = SimulationConfig::from_env();
    let step = Duration::from_secs_f64(1.0 / config.fixed_hz);

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_duration(step))
        .insert_resource(TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(config);

    app
}

/// Snapshot всех live projectiles (для сравнения детерминизма)
///
/// Порядок: архетип, затем slot - после compaction slots детерминированы.
pub fn projectile_snapshot(simulator: &ProjectileSimulator) -> Vec<u8> {
    let mut snapshot = Vec::new();

    for (id, _) in simulator.catalog().iter() {
        let Ok(batch) = simulator.batch(id) else {
            continue;
        };

        snapshot.extend_from_slice(&(id.0 as u32).to_le_bytes());
        snapshot.extend_from_slice(&(batch.live_count() as u32).to_le_bytes());

        for state in batch.live() {
            for value in state.origin.to_array() {
                snapshot.extend_from_slice(&value.to_le_bytes());
            }
            for value in state.direction.to_array() {
                snapshot.extend_from_slice(&value.to_le_bytes());
            }
            snapshot.extend_from_slice(&state.traveled.to_le_bytes());
        }
    }

    snapshot
}
