//! Rapier backend для `CollisionQuery`
//!
//! - sweep → `cast_shape` (ball collider, shape_vel = direction, max TOI = distance)
//! - overlap → `intersect_shape`
//!
//! Ball colliders строятся заранее (по одному на уникальный radius из каталога),
//! чтобы per-frame pass не аллоцировал shapes.

use bevy::prelude::{Entity, Quat, Resource, Vec3};
use bevy_rapier3d::prelude::{
    Collider, CollisionGroups, Group, QueryFilter, RapierContext, ReadRapierContext,
    ShapeCastOptions,
};

use super::{CollisionMask, CollisionQuery, EmptyCollisionWorld, SweepHit};
use crate::archetype::ArchetypeCatalog;

/// Prebuilt ball colliders по radius
#[derive(Resource, Default)]
pub struct ProjectileColliders {
    balls: Vec<(u32, Collider)>,
}

impl ProjectileColliders {
    pub fn for_catalog(catalog: &ArchetypeCatalog) -> Self {
        let mut colliders = Self::default();
        for (_, archetype) in catalog.iter() {
            colliders.insert(archetype.collision_radius);
        }
        colliders
    }

    pub fn insert(&mut self, radius: f32) {
        let key = radius.to_bits();
        if self.get(radius).is_none() {
            self.balls.push((key, Collider::ball(radius)));
        }
    }

    pub fn get(&self, radius: f32) -> Option<&Collider> {
        let key = radius.to_bits();
        self.balls
            .iter()
            .find(|(bits, _)| *bits == key)
            .map(|(_, collider)| collider)
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }
}

fn query_filter(mask: CollisionMask) -> QueryFilter<'static> {
    QueryFilter::default().groups(CollisionGroups::new(
        Group::ALL,
        Group::from_bits_truncate(mask.0),
    ))
}

/// `CollisionQuery` поверх Rapier context
pub struct RapierCollisionWorld<'a> {
    context: &'a RapierContext<'a>,
    colliders: &'a ProjectileColliders,
}

impl<'a> RapierCollisionWorld<'a> {
    pub fn new(context: &'a RapierContext<'a>, colliders: &'a ProjectileColliders) -> Self {
        Self { context, colliders }
    }

    fn with_ball<R>(&self, radius: f32, run: impl FnOnce(&Collider) -> R) -> R {
        match self.colliders.get(radius) {
            Some(collider) => run(collider),
            // Radius вне каталога - строим на месте (аллокация, но корректно)
            None => run(&Collider::ball(radius)),
        }
    }
}

impl CollisionQuery for RapierCollisionWorld<'_> {
    fn sweep(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<SweepHit> {
        self.with_ball(radius, |ball| {
            // Direction unit → time of impact == дистанция
            self.context
                .cast_shape(
                    origin,
                    Quat::IDENTITY,
                    direction,
                    ball.raw.as_ref(),
                    ShapeCastOptions::with_max_time_of_impact(max_distance),
                    query_filter(mask),
                )
                .map(|(surface, hit)| SweepHit {
                    surface,
                    distance: hit.time_of_impact.clamp(0.0, max_distance),
                })
        })
    }

    fn overlap(&self, point: Vec3, radius: f32, mask: CollisionMask, out: &mut Vec<Entity>) {
        self.with_ball(radius, |ball| {
            self.context.intersect_shape(
                point,
                Quat::IDENTITY,
                ball.raw.as_ref(),
                query_filter(mask),
                |entity| {
                    out.push(entity);
                    true
                },
            );
        });
    }
}

/// Запускает `run` с Rapier миром, если physics context есть,
/// иначе с `EmptyCollisionWorld` (headless без RapierPhysicsPlugin).
pub fn with_collision_world<R>(
    rapier: &ReadRapierContext<'_, '_>,
    colliders: &ProjectileColliders,
    run: impl FnOnce(&dyn CollisionQuery) -> R,
) -> R {
    match rapier.single() {
        Ok(context) => run(&RapierCollisionWorld::new(&context, colliders)),
        Err(_) => run(&EmptyCollisionWorld),
    }
}
