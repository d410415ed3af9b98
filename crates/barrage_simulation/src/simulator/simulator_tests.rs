//! Tests for the projectile simulator (scripted collaborators, no ECS).

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;

use super::pass::{FrameStats, ImpactKind, ProjectileSimulator, SpawnOutcome};
use crate::archetype::{ArchetypeCatalog, ArchetypeId, ProjectileArchetype};
use crate::collision::{CollisionMask, CollisionQuery, HitTargets, NoHitTargets, SweepHit};
use crate::config::SimulationConfig;
use crate::effects::{EffectEmitter, EffectHandle};
use crate::error::SimulationError;
use crate::render::{DrawSubmitter, MaterialHandle, MeshHandle, NullDrawSubmitter};

const MUZZLE: EffectHandle = EffectHandle(1);
const BLAST: EffectHandle = EffectHandle(2);

/// Sweep результаты выдаются по очереди (по одному на вызов), дальше - промах
#[derive(Default)]
struct ScriptedWorld {
    sweeps: RefCell<VecDeque<Option<SweepHit>>>,
    overlaps: Vec<Entity>,
    sweep_calls: RefCell<Vec<(Vec3, f32)>>,
    masks: RefCell<Vec<CollisionMask>>,
}

impl ScriptedWorld {
    fn with_sweeps(sweeps: impl IntoIterator<Item = Option<SweepHit>>) -> Self {
        Self {
            sweeps: RefCell::new(sweeps.into_iter().collect()),
            ..Default::default()
        }
    }

    fn with_overlaps(overlaps: Vec<Entity>) -> Self {
        Self {
            overlaps,
            ..Default::default()
        }
    }
}

impl CollisionQuery for ScriptedWorld {
    fn sweep(
        &self,
        origin: Vec3,
        _direction: Vec3,
        _radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<SweepHit> {
        self.sweep_calls.borrow_mut().push((origin, max_distance));
        self.masks.borrow_mut().push(mask);
        self.sweeps.borrow_mut().pop_front().flatten()
    }

    fn overlap(&self, _: Vec3, _: f32, mask: CollisionMask, out: &mut Vec<Entity>) {
        self.masks.borrow_mut().push(mask);
        out.extend_from_slice(&self.overlaps);
    }
}

/// Hit Targets: только entities из `capable` принимают урон
#[derive(Default)]
struct RecordingTargets {
    capable: Vec<Entity>,
    damage: HashMap<Entity, Vec<f32>>,
}

impl RecordingTargets {
    fn capable(entities: &[Entity]) -> Self {
        Self {
            capable: entities.to_vec(),
            ..Default::default()
        }
    }

    fn hits(&self, entity: Entity) -> &[f32] {
        self.damage.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    fn total_hits(&self) -> usize {
        self.damage.values().map(Vec::len).sum()
    }
}

impl HitTargets for RecordingTargets {
    fn apply_damage(&mut self, surface: Entity, amount: f32) -> bool {
        if !self.capable.contains(&surface) {
            return false;
        }
        self.damage.entry(surface).or_default().push(amount);
        true
    }
}

#[derive(Default)]
struct RecordingEffects {
    played: Vec<(EffectHandle, Vec3)>,
}

impl RecordingEffects {
    fn count(&self, handle: EffectHandle) -> usize {
        self.played.iter().filter(|(h, _)| *h == handle).count()
    }
}

impl EffectEmitter for RecordingEffects {
    fn trigger(&mut self, effect: EffectHandle, position: Vec3) {
        self.played.push((effect, position));
    }
}

#[derive(Default)]
struct RecordingDraw {
    calls: Vec<(MeshHandle, Vec<Mat4>)>,
}

impl DrawSubmitter for RecordingDraw {
    fn submit(
        &mut self,
        mesh: MeshHandle,
        _material: MaterialHandle,
        transforms: &[Mat4],
        instance_count: usize,
    ) {
        self.calls.push((mesh, transforms[..instance_count].to_vec()));
    }
}

fn archetype(name: &str, speed: f32, max_range: f32) -> ProjectileArchetype {
    let mut archetype = ProjectileArchetype::new(name);
    archetype.speed = speed;
    archetype.max_range = max_range;
    archetype.collision_radius = 0.25;
    archetype.damage = 5.0;
    archetype.muzzle_effect = Some(MUZZLE);
    archetype.impact_effect = Some(BLAST);
    archetype
}

fn simulator(archetypes: Vec<ProjectileArchetype>) -> ProjectileSimulator {
    let catalog = ArchetypeCatalog::new(archetypes).expect("valid catalog");
    ProjectileSimulator::new(catalog, &SimulationConfig::default())
}

/// Spawn без overlap (пустой мир)
fn launch(sim: &mut ProjectileSimulator, id: ArchetypeId, position: Vec3) -> usize {
    let outcome = sim
        .spawn(
            id,
            position,
            Quat::IDENTITY,
            &ScriptedWorld::default(),
            &mut RecordingTargets::default(),
            &mut RecordingEffects::default(),
        )
        .expect("spawn");

    match outcome {
        SpawnOutcome::Launched { slot } => slot,
        other => panic!("expected launch, got {:?}", other),
    }
}

fn tick(
    sim: &mut ProjectileSimulator,
    dt: f32,
    world: &ScriptedWorld,
    targets: &mut RecordingTargets,
    effects: &mut RecordingEffects,
) -> FrameStats {
    sim.tick(dt, world, targets, effects, &mut NullDrawSubmitter)
}

#[test]
fn test_range_expiry_after_exactly_one_frame() {
    // speed=10, max_range=10, dt=1 → кадр 1 жив (distance 10), кадр 2 удалён
    let mut sim = simulator(vec![archetype("bolt", 10.0, 10.0)]);
    let id = ArchetypeId(0);
    launch(&mut sim, id, Vec3::ZERO);

    let world = ScriptedWorld::default();
    let mut targets = RecordingTargets::default();
    let mut effects = RecordingEffects::default();

    let stats = tick(&mut sim, 1.0, &world, &mut targets, &mut effects);
    assert_eq!(stats, FrameStats { hits: 0, expired: 0, live: 1 });
    assert_eq!(sim.batch(id).unwrap().live()[0].traveled, 10.0);

    let stats = tick(&mut sim, 1.0, &world, &mut targets, &mut effects);
    assert_eq!(stats, FrameStats { hits: 0, expired: 1, live: 0 });

    // Range expiry тихий: без урона и без impact effect
    assert_eq!(targets.total_hits(), 0);
    assert_eq!(effects.count(BLAST), 0);
    assert!(sim.impacts().is_empty());
}

#[test]
fn test_hit_stops_at_surface_distance() {
    // step = 2.0, sweep hit на 0.5 → traveled += 0.5, не 2.0
    let mut sim = simulator(vec![archetype("slug", 2.0, 100.0)]);
    let id = ArchetypeId(0);
    launch(&mut sim, id, Vec3::ZERO);

    let wall = Entity::from_raw(7);
    let world = ScriptedWorld::with_sweeps([Some(SweepHit {
        surface: wall,
        distance: 0.5,
    })]);
    let mut targets = RecordingTargets::capable(&[wall]);
    let mut effects = RecordingEffects::default();

    let stats = tick(&mut sim, 1.0, &world, &mut targets, &mut effects);

    assert_eq!(stats.hits, 1);
    assert_eq!(sim.live_count(id), Ok(0));
    assert_eq!(targets.hits(wall), &[5.0]);

    // Sweep шёл на полный step
    assert_eq!(world.sweep_calls.borrow()[0], (Vec3::ZERO, 2.0));

    // Impact на точке остановки (forward = -Z)
    let impact = sim.impacts()[0];
    assert_eq!(impact.position, Vec3::new(0.0, 0.0, -0.5));
    assert_eq!(impact.kind, ImpactKind::Swept);
    assert!(impact.damaged);
    assert_eq!(effects.played, vec![(BLAST, Vec3::new(0.0, 0.0, -0.5))]);
}

#[test]
fn test_survivors_advance_by_speed_times_dt() {
    let mut sim = simulator(vec![archetype("pellet", 8.0, 1000.0)]);
    let id = ArchetypeId(0);
    for x in 0..3 {
        launch(&mut sim, id, Vec3::new(x as f32, 0.0, 0.0));
    }

    let world = ScriptedWorld::default();
    let mut targets = RecordingTargets::default();
    let mut effects = RecordingEffects::default();

    for frame in 1..=4 {
        tick(&mut sim, 0.25, &world, &mut targets, &mut effects);
        for state in sim.batch(id).unwrap().live() {
            assert_eq!(state.traveled, 2.0 * frame as f32);
        }
    }
}

#[test]
fn test_hit_without_target_capability_still_removes() {
    let mut sim = simulator(vec![archetype("slug", 4.0, 100.0)]);
    let id = ArchetypeId(0);
    launch(&mut sim, id, Vec3::ZERO);

    let scenery = Entity::from_raw(3);
    let world = ScriptedWorld::with_sweeps([Some(SweepHit {
        surface: scenery,
        distance: 1.0,
    })]);
    let mut effects = RecordingEffects::default();

    let stats = sim.tick(
        1.0,
        &world,
        &mut NoHitTargets,
        &mut effects,
        &mut NullDrawSubmitter,
    );

    assert_eq!(stats.hits, 1);
    assert_eq!(sim.total_live(), 0);
    assert_eq!(effects.count(BLAST), 1);
    assert!(!sim.impacts()[0].damaged);
}

#[test]
fn test_mixed_removals_keep_render_buffer_consistent() {
    let mut sim = simulator(vec![archetype("mixed", 1.0, 100.0)]);
    let id = ArchetypeId(0);
    for x in 0..6 {
        launch(&mut sim, id, Vec3::new(x as f32 * 10.0, 0.0, 0.0));
    }

    let wall = Entity::from_raw(1);
    let hit = Some(SweepHit {
        surface: wall,
        distance: 0.1,
    });
    // Slots 0, 2, 5 попадают; 1, 3, 4 летят дальше
    let world = ScriptedWorld::with_sweeps([hit, None, hit, None, None, hit]);
    let mut targets = RecordingTargets::capable(&[wall]);
    let mut effects = RecordingEffects::default();
    let mut draw = RecordingDraw::default();

    let stats = sim.tick(1.0, &world, &mut targets, &mut effects, &mut draw);

    assert_eq!(stats.hits, 3);
    assert_eq!(targets.hits(wall).len(), 3);

    let mut survivors: Vec<f32> = sim
        .batch(id)
        .unwrap()
        .live()
        .iter()
        .map(|state| state.origin.x)
        .collect();
    survivors.sort_by(f32::total_cmp);
    assert_eq!(survivors, vec![10.0, 30.0, 40.0]);

    // Один draw, instance count = post-compaction live count,
    // и каждый instance - transform своего выжившего slot
    assert_eq!(draw.calls.len(), 1);
    let (_, instances) = &draw.calls[0];
    assert_eq!(instances.len(), 3);
    for (state, transform) in sim.batch(id).unwrap().live().iter().zip(instances) {
        let translation = transform.to_scale_rotation_translation().2;
        assert!((translation - state.position()).length() < 1e-5);
    }
    assert_eq!(sim.instances(id).unwrap(), instances.as_slice());
}

#[test]
fn test_point_blank_damages_first_overlap_once() {
    let mut sim = simulator(vec![archetype("shotgun", 10.0, 50.0)]);
    let id = ArchetypeId(0);

    let first = Entity::from_raw(10);
    let second = Entity::from_raw(11);
    let world = ScriptedWorld::with_overlaps(vec![first, second]);
    let mut targets = RecordingTargets::capable(&[first, second]);
    let mut effects = RecordingEffects::default();

    let position = Vec3::new(1.0, 1.0, 1.0);
    let outcome = sim
        .spawn(id, position, Quat::IDENTITY, &world, &mut targets, &mut effects)
        .unwrap();

    let SpawnOutcome::PointBlank(impact) = outcome else {
        panic!("expected point-blank, got {:?}", outcome);
    };
    assert_eq!(impact.surface, first);
    assert_eq!(impact.position, position);
    assert_eq!(impact.kind, ImpactKind::PointBlank);
    assert!(impact.damaged);

    assert_eq!(targets.hits(first), &[5.0]);
    assert!(targets.hits(second).is_empty());
    assert_eq!(sim.total_live(), 0);

    // Impact в точке spawn, muzzle не играет
    assert_eq!(effects.played, vec![(BLAST, position)]);
}

#[test]
fn test_point_blank_without_capability() {
    let mut sim = simulator(vec![archetype("shotgun", 10.0, 50.0)]);
    let scenery = Entity::from_raw(4);
    let world = ScriptedWorld::with_overlaps(vec![scenery]);
    let mut targets = RecordingTargets::default();

    let outcome = sim
        .spawn(
            ArchetypeId(0),
            Vec3::ZERO,
            Quat::IDENTITY,
            &world,
            &mut targets,
            &mut RecordingEffects::default(),
        )
        .unwrap();

    assert!(matches!(outcome, SpawnOutcome::PointBlank(impact) if !impact.damaged));
    assert_eq!(sim.total_live(), 0);
}

#[test]
fn test_launch_plays_muzzle_effect() {
    let mut sim = simulator(vec![archetype("rifle", 10.0, 50.0)]);
    let mut effects = RecordingEffects::default();
    let position = Vec3::new(0.0, 1.5, 0.0);

    let outcome = sim
        .spawn(
            ArchetypeId(0),
            position,
            Quat::IDENTITY,
            &ScriptedWorld::default(),
            &mut RecordingTargets::default(),
            &mut effects,
        )
        .unwrap();

    assert_eq!(outcome, SpawnOutcome::Launched { slot: 0 });
    assert_eq!(effects.played, vec![(MUZZLE, position)]);

    let state = sim.batch(ArchetypeId(0)).unwrap().live()[0];
    assert_eq!(state.origin, position);
    assert_eq!(state.direction, Vec3::NEG_Z);
    assert_eq!(state.traveled, 0.0);
}

#[test]
fn test_spawn_at_capacity_returns_out_of_capacity() {
    let mut limited = archetype("limited", 10.0, 50.0);
    limited.capacity = Some(2);
    let mut sim = simulator(vec![limited]);
    let id = ArchetypeId(0);

    launch(&mut sim, id, Vec3::ZERO);
    launch(&mut sim, id, Vec3::X);

    let result = sim.spawn(
        id,
        Vec3::Y,
        Quat::IDENTITY,
        &ScriptedWorld::default(),
        &mut RecordingTargets::default(),
        &mut RecordingEffects::default(),
    );

    assert_eq!(
        result,
        Err(SimulationError::OutOfCapacity {
            archetype: id,
            capacity: 2
        })
    );
    assert_eq!(sim.live_count(id), Ok(2));
    assert_eq!(sim.capacity_for(id), Ok(2));
}

#[test]
fn test_unknown_archetype() {
    let mut sim = simulator(vec![archetype("only", 1.0, 1.0)]);

    let result = sim.spawn(
        ArchetypeId(4),
        Vec3::ZERO,
        Quat::IDENTITY,
        &ScriptedWorld::default(),
        &mut RecordingTargets::default(),
        &mut RecordingEffects::default(),
    );

    assert_eq!(result, Err(SimulationError::UnknownArchetype(ArchetypeId(4))));
    assert_eq!(
        sim.resolve("missing"),
        Err(SimulationError::UnknownArchetypeName("missing".to_string()))
    );
    assert_eq!(sim.resolve("only"), Ok(ArchetypeId(0)));
}

#[test]
fn test_archetypes_are_independent() {
    let mut sim = simulator(vec![archetype("fast", 10.0, 15.0), archetype("slow", 1.0, 15.0)]);
    let fast = ArchetypeId(0);
    let slow = ArchetypeId(1);
    launch(&mut sim, fast, Vec3::ZERO);
    launch(&mut sim, slow, Vec3::ZERO);

    let world = ScriptedWorld::default();
    let mut targets = RecordingTargets::default();
    let mut effects = RecordingEffects::default();

    tick(&mut sim, 1.0, &world, &mut targets, &mut effects);
    tick(&mut sim, 1.0, &world, &mut targets, &mut effects);

    assert_eq!(sim.live_count(fast), Ok(0));
    assert_eq!(sim.live_count(slow), Ok(1));
    assert_eq!(sim.batch(slow).unwrap().live()[0].traveled, 2.0);
}

#[test]
fn test_empty_batches_submit_zero_instances() {
    let mut mesh_b = archetype("b", 1.0, 1.0);
    mesh_b.mesh = MeshHandle(9);
    let mut sim = simulator(vec![archetype("a", 1.0, 1.0), mesh_b]);
    let mut draw = RecordingDraw::default();

    let stats = sim.tick(
        0.016,
        &ScriptedWorld::default(),
        &mut RecordingTargets::default(),
        &mut RecordingEffects::default(),
        &mut draw,
    );

    assert_eq!(stats, FrameStats::default());
    assert_eq!(draw.calls.len(), 2);
    assert_eq!(draw.calls[1].0, MeshHandle(9));
    assert!(draw.calls.iter().all(|(_, instances)| instances.is_empty()));
}

#[test]
fn test_invalid_dt_does_not_move_projectiles() {
    let mut sim = simulator(vec![archetype("bolt", 10.0, 100.0)]);
    let id = ArchetypeId(0);
    launch(&mut sim, id, Vec3::ZERO);

    let world = ScriptedWorld::default();
    let mut targets = RecordingTargets::default();
    let mut effects = RecordingEffects::default();

    for dt in [-1.0, f32::NAN, f32::INFINITY] {
        tick(&mut sim, dt, &world, &mut targets, &mut effects);
    }

    assert_eq!(sim.live_count(id), Ok(1));
    assert_eq!(sim.batch(id).unwrap().live()[0].traveled, 0.0);
}

#[test]
fn test_clear_resets_all_batches() {
    let mut sim = simulator(vec![archetype("a", 1.0, 10.0), archetype("b", 1.0, 10.0)]);
    launch(&mut sim, ArchetypeId(0), Vec3::ZERO);
    launch(&mut sim, ArchetypeId(1), Vec3::ZERO);
    launch(&mut sim, ArchetypeId(1), Vec3::X);

    sim.clear();

    assert_eq!(sim.total_live(), 0);
    assert_eq!(sim.instances(ArchetypeId(1)).unwrap().len(), 0);
    // Capacity не меняется, spawn снова работает
    assert_eq!(launch(&mut sim, ArchetypeId(1), Vec3::ZERO), 0);
}

#[test]
fn test_packed_invariant_under_churn() {
    let mut small = archetype("churn", 3.0, 20.0);
    small.capacity = Some(16);
    let mut sim = simulator(vec![small]);
    let id = ArchetypeId(0);

    let wall = Entity::from_raw(2);
    let mut targets = RecordingTargets::capable(&[wall]);
    let mut effects = RecordingEffects::default();

    for frame in 0..60u32 {
        // Несколько выстрелов за кадр, часть упирается в capacity
        for shot in 0..4 {
            let _ = sim.spawn(
                id,
                Vec3::new(shot as f32, 0.0, 0.0),
                Quat::IDENTITY,
                &ScriptedWorld::default(),
                &mut targets,
                &mut effects,
            );
        }

        // Каждый третий sweep попадает
        let live = sim.live_count(id).unwrap();
        let pattern = (0..live).map(|slot| {
            ((slot as u32 + frame) % 3 == 0).then_some(SweepHit {
                surface: wall,
                distance: 0.5,
            })
        });
        let world = ScriptedWorld::with_sweeps(pattern);

        let before = live;
        let stats = tick(&mut sim, 1.0, &world, &mut targets, &mut effects);
        let batch = sim.batch(id).unwrap();

        assert!(batch.live_count() <= batch.capacity());
        assert_eq!(stats.live, batch.live_count());
        assert_eq!(before, batch.live_count() + stats.hits + stats.expired);
        assert!(batch.live().iter().all(|state| state.traveled <= 20.0));
    }
}

#[test]
fn test_configured_hit_mask_reaches_queries() {
    let catalog = ArchetypeCatalog::new(vec![archetype("rifle", 10.0, 50.0)]).unwrap();
    let config = SimulationConfig {
        hit_mask: CollisionMask(0b0101),
        ..Default::default()
    };
    let mut sim = ProjectileSimulator::new(catalog, &config);
    assert_eq!(sim.hit_mask(), CollisionMask(0b0101));

    let world = ScriptedWorld::default();
    sim.spawn(
        ArchetypeId(0),
        Vec3::ZERO,
        Quat::IDENTITY,
        &world,
        &mut NoHitTargets,
        &mut RecordingEffects::default(),
    )
    .unwrap();
    sim.tick(
        0.1,
        &world,
        &mut NoHitTargets,
        &mut RecordingEffects::default(),
        &mut NullDrawSubmitter,
    );

    // overlap при spawn + sweep в pass
    assert_eq!(
        *world.masks.borrow(),
        vec![CollisionMask(0b0101), CollisionMask(0b0101)]
    );
}
