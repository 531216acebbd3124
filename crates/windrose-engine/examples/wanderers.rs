//! Wanderers: a headless random-walk demo.
//!
//! A handful of objects with mixed solidness wander a walled room for a few
//! simulated seconds. Every second the demo prints an ASCII view of the room
//! and the occupancy total; at the end it prints the event counts and the
//! state fingerprint, which is identical for identical seeds.
//!
//! Run with: `cargo run -p windrose-engine --example wanderers -- [seed] [config.json]`
//!
//! Set `RUST_LOG=windrose_core=trace` to watch every transition.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use windrose_engine::logging;
use windrose_engine::prelude::*;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

const WIDTH: u32 = 24;
const HEIGHT: u32 = 12;

/// Seed shared with the `wander` system, which is a plain `fn`.
static SEED: AtomicU64 = AtomicU64::new(0);
static RNG: Mutex<Option<Pcg64>> = Mutex::new(None);

/// A walled room with ten wanderers of mixed solidness.
fn default_stage() -> anyhow::Result<Stage> {
    let mut walls = Bitmask::new(WIDTH, HEIGHT, false)?;
    walls.set_column(8, 0, 7, true);
    walls.set_column(16, 4, HEIGHT - 1, true);

    let mut stage = Stage::new();
    let map = stage.insert_map(Tilemap::new(WIDTH, HEIGHT, Some(&walls), 0, 0));
    let modes = [
        Solidness::Solid,
        Solidness::Solid,
        Solidness::SolidForOthers,
        Solidness::Ghost,
    ];
    for (i, mode) in modes.iter().cycle().take(10).enumerate() {
        let i = i as u32;
        let spec = ObjectSpec::new(1 + (i * 2) % (WIDTH - 2), 1 + (i * 3) % (HEIGHT - 2), 1, 1)
            .with_solidness(*mode)
            .with_speed(2.0 + (i % 3) as f64);
        let id = stage.spawn(&spec)?;
        stage.attach(id, map, None, None)?;
    }
    Ok(stage)
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Idle objects pick a random direction; one in fifty cancels mid-step.
fn wander(stage: &mut Stage) {
    let mut guard = RNG.lock().expect("rng lock poisoned");
    let rng = guard.get_or_insert_with(|| Pcg64::seed_from_u64(SEED.load(Ordering::Relaxed)));

    for id in stage.object_ids() {
        let Ok(object) = stage.object(id) else {
            continue;
        };
        let result = if object.movement().is_some() {
            if rng.gen_ratio(1, 50) {
                stage.cancel_movement(id)
            } else {
                Ok(false)
            }
        } else {
            let direction = Direction::ALL[rng.gen_range(0..4)];
            stage.start_movement(id, direction)
        };
        if let Err(err) = result {
            tracing::warn!(%id, %err, "wander step failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(stage: &Stage) -> String {
    let Some(&map_id) = stage.map_ids().first() else {
        return String::new();
    };
    let Some(map) = stage.map(map_id) else {
        return String::new();
    };
    let mut cells = vec!['.'; (map.width() * map.height()) as usize];
    for y in 0..map.height() {
        for x in 0..map.width() {
            if map.block_mask().get(x, y) {
                cells[(y * map.width() + x) as usize] = '#';
            }
        }
    }
    for id in stage.objects_on(map_id) {
        if let Ok(object) = stage.object(id) {
            let glyph = match object.solidness() {
                Solidness::Solid => 'S',
                Solidness::SolidForOthers => 'F',
                Solidness::Ghost => 'g',
                Solidness::Hole => 'o',
            };
            cells[(object.y() * map.width() + object.x()) as usize] = glyph;
        }
    }
    cells
        .chunks(map.width() as usize)
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid seed {raw:?}"))?,
        None => 42,
    };
    SEED.store(seed, Ordering::Relaxed);

    let mut tick_loop = match args.next() {
        Some(path) => {
            let config = StageConfig::load(&path).with_context(|| format!("loading {path}"))?;
            TickLoop::from_config(&config)?
        }
        None => TickLoop::new(
            default_stage()?,
            TickConfig {
                fixed_dt: 1.0 / 30.0,
                ..Default::default()
            },
        ),
    };
    tick_loop.add_system("wander", wander);
    tick_loop.stage_mut().capture_events(true);

    let ticks_per_second = (1.0 / tick_loop.fixed_dt()).round() as u64;
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for second in 1..=5 {
        tick_loop.run_ticks(ticks_per_second)?;
        for (_, event) in tick_loop.stage().drain_events() {
            let name = match event {
                ObjectEvent::Attached { .. } => "attached",
                ObjectEvent::Detached => "detached",
                ObjectEvent::MovementStarted(_) => "started",
                ObjectEvent::MovementCancelled(_) => "cancelled",
                ObjectEvent::MovementFinished(_) => "finished",
                ObjectEvent::SolidnessChanged(_) => "solidness",
                ObjectEvent::Teleported { .. } => "teleported",
            };
            *counts.entry(name).or_default() += 1;
        }

        let stage = tick_loop.stage();
        let total: i64 = stage
            .map_ids()
            .iter()
            .filter_map(|&id| stage.map(id))
            .map(|map| map.solid_mask().total())
            .sum();
        println!("t = {second}s, occupancy total = {total}");
        println!("{}\n", render(stage));
    }

    println!("events: {counts:?}");
    println!("seed {seed} -> {}", tick_loop.stage().state_hash());
    Ok(())
}
