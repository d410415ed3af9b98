//! Breakable - Hit Target как ECS компонент
//!
//! HP уменьшается на damage; при hp < 0.001 объект ломается:
//! hp = 0, broken = true, событие `BreakableBroken`, опционально despawn.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::HitTargets;

/// Порог "hp закончилось" (float damage)
pub const HP_LOW_THRESHOLD: f32 = 0.001;

/// Разрушаемый объект (ящик, стекло, враг)
///
/// Инвариант: 0 ≤ hp ≤ max_hp
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Breakable {
    pub max_hp: f32,
    pub hp: f32,
    pub broken: bool,
    /// Despawn entity при поломке
    pub destroy_on_break: bool,
}

impl Default for Breakable {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl Breakable {
    pub fn new(max_hp: f32) -> Self {
        Self {
            max_hp,
            hp: max_hp,
            broken: false,
            destroy_on_break: false,
        }
    }

    pub fn destroyed_on_break(mut self) -> Self {
        self.destroy_on_break = true;
        self
    }

    /// Применяет урон. `true` - именно этот hit сломал объект
    pub fn hit(&mut self, damage: f32) -> bool {
        if self.broken {
            return false;
        }

        self.hp = (self.hp - damage).min(self.max_hp);
        if self.hp < HP_LOW_THRESHOLD {
            self.hp = 0.0;
            self.broken = true;
            return true;
        }

        false
    }
}

/// Событие: breakable сломан
#[derive(Event, Debug, Clone)]
pub struct BreakableBroken {
    pub entity: Entity,
}

/// `HitTargets` поверх ECS: Hit Target = entity с `Breakable`
#[derive(SystemParam)]
pub struct BreakableTargets<'w, 's> {
    breakables: Query<'w, 's, &'static mut Breakable>,
    broken_events: EventWriter<'w, BreakableBroken>,
    commands: Commands<'w, 's>,
}

impl HitTargets for BreakableTargets<'_, '_> {
    fn apply_damage(&mut self, surface: Entity, amount: f32) -> bool {
        let Ok(mut breakable) = self.breakables.get_mut(surface) else {
            return false;
        };

        if breakable.hit(amount) {
            self.broken_events.write(BreakableBroken { entity: surface });

            if breakable.destroy_on_break {
                self.commands.entity(surface).despawn();
            }
        }

        true
    }
}
