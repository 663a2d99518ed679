//! Cell Arena headless runner
//!
//! Usage: `cell-arena [config.json] [ticks]`
//!
//! Loads the config (defaults when absent or invalid), populates the world and
//! drives it from the wall clock until `ticks` steps have run, or forever.

use std::time::{Duration, Instant};

use cell_arena::sim::World;
use cell_arena::{Config, Poll, TickScheduler};

/// Log world statistics every this many ticks
const STATS_INTERVAL_TICKS: u64 = 250;

fn main() {
    env_logger::init();
    log::info!("Cell Arena starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => Config::load(&path).unwrap_or_else(|e| {
            log::warn!("Using default config: {e}");
            Config::default()
        }),
        None => Config::default(),
    };
    let max_ticks = args.next().and_then(|s| s.parse::<u64>().ok());

    let mut world = World::new(config);
    world.populate();

    let start = Instant::now();
    let now_ms = |start: &Instant| start.elapsed().as_secs_f64() * 1000.0;
    let mut scheduler = TickScheduler::new(now_ms(&start));

    loop {
        match scheduler.poll(now_ms(&start)) {
            Poll::Wait(delay) => std::thread::sleep(delay.max(Duration::from_millis(1))),
            Poll::Step => {
                let step_start = Instant::now();
                world.step();
                world.drain_events();
                scheduler.record_step(step_start.elapsed().as_secs_f64() * 1000.0);

                if world.tick % STATS_INTERVAL_TICKS == 0 {
                    log::info!(
                        "Tick {}: {} nodes, {} players, avg step {:.2} ms, {} stalls",
                        world.tick,
                        world.registry.len(),
                        world.players.len(),
                        scheduler.step_time_avg_ms(),
                        scheduler.stalls()
                    );
                }
                if max_ticks.is_some_and(|max| world.tick >= max) {
                    break;
                }
            }
        }
    }

    log::info!("Stopped after {} ticks", world.tick);
}
