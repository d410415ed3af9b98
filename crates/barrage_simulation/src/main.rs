//! Headless симуляция BARRAGE
//!
//! Загружает каталог архетипов, стреляет случайными залпами и
//! печатает статистику pass каждые 100 тиков.

use bevy::prelude::*;
use rand::Rng;

use barrage_simulation::{
    create_headless_app, log_error, ArchetypeCatalog, ArchetypeId, DeterministicRng,
    ProjectileFrameStats, SimulationPlugin, SpawnProjectile,
};

const CATALOG_JSON: &str = include_str!("../assets/archetypes.json");

/// Система: каждый тик случайный залп из случайного архетипа
fn fire_random_volley(
    mut rng: ResMut<DeterministicRng>,
    catalog_size: Res<CatalogSize>,
    mut spawns: EventWriter<SpawnProjectile>,
) {
    if catalog_size.0 == 0 {
        return;
    }

    let archetype = ArchetypeId(rng.rng.gen_range(0..catalog_size.0));
    let shots = rng.rng.gen_range(1..=8);

    for _ in 0..shots {
        let yaw = rng.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        let pitch = rng.rng.gen_range(-0.2..0.2);
        let origin = Vec3::new(rng.rng.gen_range(-5.0..5.0), 1.5, rng.rng.gen_range(-5.0..5.0));

        spawns.write(SpawnProjectile {
            archetype,
            position: origin,
            rotation: Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0),
        });
    }
}

#[derive(Resource)]
struct CatalogSize(usize);

fn main() {
    let seed = 42;
    println!("Starting BARRAGE headless simulation (seed: {})", seed);

    let catalog = match ArchetypeCatalog::from_json_str(CATALOG_JSON) {
        Ok(catalog) => catalog,
        Err(err) => {
            log_error(&format!("Failed to load archetype catalog: {}", err));
            std::process::exit(1);
        }
    };

    let mut app = create_headless_app(seed);
    app.insert_resource(CatalogSize(catalog.len()))
        .add_plugins(SimulationPlugin { catalog })
        .add_systems(FixedPreUpdate, fire_random_volley);

    // Запускаем 1000 тиков симуляции
    for tick in 0..1000 {
        app.update();

        if tick % 100 == 0 {
            let stats = app.world().resource::<ProjectileFrameStats>().0;
            println!(
                "Tick {}: {} live, {} hits, {} expired",
                tick, stats.live, stats.hits, stats.expired
            );
        }
    }

    println!("Simulation complete!");
}
