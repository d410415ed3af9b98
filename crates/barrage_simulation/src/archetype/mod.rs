//! Projectile archetypes + validated catalog
//!
//! Каталог строится ОДИН раз при старте (из JSON списка), валидируется
//! и дальше immutable. Никакого runtime scan типов - индекс архетипа
//! в каталоге и есть индекс его batch.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::effects::EffectHandle;
use crate::render::{MaterialHandle, MeshHandle};

/// Индекс архетипа в каталоге (стабилен на всё время процесса)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub usize);

/// Один вид projectile (пуля, дробь, граната)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectileArchetype {
    /// Уникальное имя (ключ для `ArchetypeCatalog::resolve`)
    pub name: String,

    /// Скорость (units/sec)
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Радиус sphere cast и визуальный scale
    #[serde(default = "default_collision_radius")]
    pub collision_radius: f32,

    /// Урон за попадание
    #[serde(default = "default_damage")]
    pub damage: f32,

    /// Дальность, после которой projectile молча исчезает
    #[serde(default = "default_max_range")]
    pub max_range: f32,

    /// Радиус взрыва. Парсится и валидируется, но симуляция его не использует
    #[serde(default = "default_blast_radius")]
    pub blast_radius: f32,

    /// "Взрываться на max range". Inert: range expiry всегда тихий
    #[serde(default)]
    pub explode_on_max_range: bool,

    /// Capacity batch (None → `SimulationConfig::default_capacity`)
    #[serde(default)]
    pub capacity: Option<usize>,

    #[serde(default)]
    pub mesh: MeshHandle,

    #[serde(default)]
    pub material: MaterialHandle,

    /// Эффект выстрела (muzzle flash)
    #[serde(default)]
    pub muzzle_effect: Option<EffectHandle>,

    /// Эффект попадания (blast)
    #[serde(default)]
    pub impact_effect: Option<EffectHandle>,
}

fn default_speed() -> f32 {
    10.0
}

fn default_collision_radius() -> f32 {
    0.5
}

fn default_damage() -> f32 {
    5.0
}

fn default_max_range() -> f32 {
    10.0
}

fn default_blast_radius() -> f32 {
    2.0
}

impl ProjectileArchetype {
    /// Архетип с defaults (как у пустой записи в JSON)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speed: default_speed(),
            collision_radius: default_collision_radius(),
            damage: default_damage(),
            max_range: default_max_range(),
            blast_radius: default_blast_radius(),
            explode_on_max_range: false,
            capacity: None,
            mesh: MeshHandle::default(),
            material: MaterialHandle::default(),
            muzzle_effect: None,
            impact_effect: None,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let non_negative = [
            ("speed", self.speed),
            ("collision_radius", self.collision_radius),
            ("max_range", self.max_range),
            ("blast_radius", self.blast_radius),
        ];

        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogError::InvalidField {
                    archetype: self.name.clone(),
                    field,
                    value,
                });
            }
        }

        if !self.damage.is_finite() {
            return Err(CatalogError::InvalidField {
                archetype: self.name.clone(),
                field: "damage",
                value: self.damage,
            });
        }

        if self.capacity == Some(0) {
            return Err(CatalogError::ZeroCapacity(self.name.clone()));
        }

        Ok(())
    }
}

/// Ошибки построения каталога (fail fast при старте)
#[derive(Debug)]
pub enum CatalogError {
    /// JSON не парсится
    Parse(serde_json::Error),
    /// Файл каталога не читается
    Io(std::io::Error),
    /// Числовое поле вне допустимого диапазона (отрицательное / NaN / inf)
    InvalidField {
        archetype: String,
        field: &'static str,
        value: f32,
    },
    /// Два архетипа с одним именем
    DuplicateName(String),
    /// Явно заданная capacity = 0
    ZeroCapacity(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Parse(err) => write!(f, "archetype catalog parse error: {}", err),
            CatalogError::Io(err) => write!(f, "archetype catalog read error: {}", err),
            CatalogError::InvalidField {
                archetype,
                field,
                value,
            } => write!(
                f,
                "archetype '{}': invalid {} = {} (must be finite and >= 0)",
                archetype, field, value
            ),
            CatalogError::DuplicateName(name) => {
                write!(f, "archetype '{}' is declared more than once", name)
            }
            CatalogError::ZeroCapacity(name) => {
                write!(f, "archetype '{}' has zero batch capacity", name)
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Parse(err) => Some(err),
            CatalogError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err)
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

/// Immutable каталог архетипов
#[derive(Debug, Clone, Default)]
pub struct ArchetypeCatalog {
    archetypes: Vec<ProjectileArchetype>,
}

impl ArchetypeCatalog {
    /// Валидирует список и строит каталог (порядок списка = `ArchetypeId`)
    pub fn new(archetypes: Vec<ProjectileArchetype>) -> Result<Self, CatalogError> {
        for (index, archetype) in archetypes.iter().enumerate() {
            archetype.validate()?;

            if archetypes[..index].iter().any(|other| other.name == archetype.name) {
                return Err(CatalogError::DuplicateName(archetype.name.clone()));
            }
        }

        Ok(Self { archetypes })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let archetypes: Vec<ProjectileArchetype> = serde_json::from_str(json)?;
        Self::new(archetypes)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn get(&self, id: ArchetypeId) -> Option<&ProjectileArchetype> {
        self.archetypes.get(id.0)
    }

    /// Имя → id
    pub fn resolve(&self, name: &str) -> Option<ArchetypeId> {
        self.archetypes
            .iter()
            .position(|archetype| archetype.name == name)
            .map(ArchetypeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchetypeId, &ProjectileArchetype)> {
        self.archetypes
            .iter()
            .enumerate()
            .map(|(index, archetype)| (ArchetypeId(index), archetype))
    }
}
