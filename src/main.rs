//! Wizard Arena headless driver
//!
//! Runs the simulation at a fixed step with seeded scripted input and prints
//! the final frame statistics as JSON.
//!
//! Usage: `wizard-arena [frames] [seed] [tunables.json]`

use std::error::Error;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use wizard_arena::Tunables;
use wizard_arena::sim::{FrameInput, HeldKeys, World};
use wizard_arena::tunables::SimConfig;

const DEFAULT_FRAMES: u64 = 600;
const DEFAULT_SEED: u64 = 12345;
/// Frames between input changes
const INPUT_HOLD_FRAMES: u64 = 20;

/// Random but plausible held keys: move on one or two axes, fire one way
fn scripted_keys(rng: &mut Pcg32) -> HeldKeys {
    let mut keys = HeldKeys::default();
    match rng.random_range(0..3) {
        0 => keys.move_up = true,
        1 => keys.move_down = true,
        _ => {}
    }
    match rng.random_range(0..3) {
        0 => keys.move_left = true,
        1 => keys.move_right = true,
        _ => {}
    }
    match rng.random_range(0..5) {
        0 => keys.fire_up = true,
        1 => keys.fire_down = true,
        2 => keys.fire_left = true,
        3 => keys.fire_right = true,
        _ => {}
    }
    keys
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let frames = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_FRAMES,
    };
    let seed = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_SEED,
    };
    let tunables = match args.next() {
        Some(path) => Tunables::from_json(&std::fs::read_to_string(path)?)?,
        None => Tunables::default(),
    };
    log::info!("Wizard Arena (headless) starting: {} frames, seed {}", frames, seed);

    let mut world = World::new(SimConfig::default())?;
    world.spawn_enemy_grid(-5..5, -3..3)?;

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut input = FrameInput::default();
    for frame in 0..frames {
        if frame % INPUT_HOLD_FRAMES == 0 {
            input.keys = scripted_keys(&mut rng);
        }
        world.tick(&input, &tunables);
    }

    let stats = world.stats();
    log::info!(
        "Finished at t={:.2}s: {} enemies, {} enemy shots in flight",
        stats.elapsed,
        stats.enemies,
        stats.enemy_projectiles
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
