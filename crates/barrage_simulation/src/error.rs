//! Ошибки симуляции (spawn/lookup boundary)
//!
//! Per-frame pass ошибок не возвращает никогда.

use std::fmt;

use crate::archetype::ArchetypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Batch архетипа заполнен. Recoverable: ничего не изменено
    OutOfCapacity {
        archetype: ArchetypeId,
        capacity: usize,
    },
    /// Архетипа с таким id нет в каталоге (ошибка конфигурации)
    UnknownArchetype(ArchetypeId),
    /// Архетипа с таким именем нет в каталоге (ошибка конфигурации)
    UnknownArchetypeName(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::OutOfCapacity {
                archetype,
                capacity,
            } => write!(
                f,
                "projectile batch for archetype {} is full ({} live)",
                archetype.0, capacity
            ),
            SimulationError::UnknownArchetype(id) => {
                write!(f, "unknown projectile archetype id {}", id.0)
            }
            SimulationError::UnknownArchetypeName(name) => {
                write!(f, "unknown projectile archetype '{}'", name)
            }
        }
    }
}

impl std::error::Error for SimulationError {}
