//! Render boundary: scratch transform buffers + instanced draw submission
//!
//! Симуляция только заполняет transforms. Сам draw (mesh/material/GPU instancing)
//! делает rendering backend через `DrawSubmitter`.
//!
//! Flow за кадр (на архетип):
//! 1. `advance` пишет transform каждого выжившего slot в `RenderBuffer[i]`
//! 2. compaction зеркалит swap-with-last в буфере
//! 3. `DrawSubmitter::submit(mesh, material, buffer, live_count)`

use bevy::prelude::*;
use serde::Deserialize;

/// Opaque mesh handle (резолвит rendering backend)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct MeshHandle(pub u32);

/// Opaque material handle (резолвит rendering backend)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct MaterialHandle(pub u32);

/// Fixed-capacity scratch буфер transforms одного архетипа
///
/// Аллоцируется один раз (capacity = capacity batch), дальше только перезапись.
/// Entries с индексом ≥ live count - stale, их никто не рендерит.
#[derive(Debug, Clone)]
pub struct RenderBuffer {
    transforms: Vec<Mat4>,
}

impl RenderBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transforms: vec![Mat4::IDENTITY; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.transforms.len()
    }

    pub fn write(&mut self, slot: usize, transform: Mat4) {
        self.transforms[slot] = transform;
    }

    /// Зеркалит `remove_swap_last` batch'а: slot получает transform из `source`
    pub fn mirror_swap(&mut self, slot: usize, source: usize) {
        self.transforms[slot] = self.transforms[source];
    }

    pub fn as_slice(&self) -> &[Mat4] {
        &self.transforms
    }
}

/// TRS матрица projectile: позиция, ориентация, uniform scale = collision radius
pub fn projectile_transform(position: Vec3, rotation: Quat, radius: f32) -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(radius), rotation, position)
}

/// Rendering boundary: один instanced draw на архетип за кадр
pub trait DrawSubmitter {
    /// `transforms[..instance_count]` - валидные instances, остальное игнорировать
    fn submit(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
        transforms: &[Mat4],
        instance_count: usize,
    );
}

/// Submitter, который ничего не рисует (headless/tests)
pub struct NullDrawSubmitter;

impl DrawSubmitter for NullDrawSubmitter {
    fn submit(&mut self, _: MeshHandle, _: MaterialHandle, _: &[Mat4], _: usize) {}
}

/// Один записанный draw call
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub instances: Vec<Mat4>,
}

impl DrawCall {
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// Draw queue кадра (ECS resource)
///
/// Rendering backend читает `calls()` после `advance_projectiles`.
/// Буферы переиспользуются между кадрами (clear сохраняет capacity),
/// так что steady state без аллокаций.
#[derive(Resource, Debug, Default)]
pub struct ProjectileDrawQueue {
    calls: Vec<DrawCall>,
    used: usize,
}

impl ProjectileDrawQueue {
    /// Начало кадра: calls прошлого кадра становятся невалидными
    pub fn begin_frame(&mut self) {
        self.used = 0;
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls[..self.used]
    }
}

impl DrawSubmitter for ProjectileDrawQueue {
    fn submit(
        &mut self,
        mesh: MeshHandle,
        material: MaterialHandle,
        transforms: &[Mat4],
        instance_count: usize,
    ) {
        let count = instance_count.min(transforms.len());

        if self.used == self.calls.len() {
            self.calls.push(DrawCall {
                mesh,
                material,
                instances: Vec::with_capacity(transforms.len()),
            });
        }

        let call = &mut self.calls[self.used];
        call.mesh = mesh;
        call.material = material;
        call.instances.clear();
        call.instances.extend_from_slice(&transforms[..count]);
        self.used += 1;
    }
}
