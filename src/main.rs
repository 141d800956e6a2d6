// ============================================
// blockgrid demo - Диффузия горячей точки
// ============================================
// Запуск: blockgrid [config.json] [steps]
// Логи: RUST_LOG=info (или debug для сводки каждого прохода)

use std::env;
use std::process;

use blockgrid::{restrict, BlockStore, Connectivity, GridConfig, GridPos, GridResult};

/// Коэффициент явной схемы (устойчиво при <= 1/6)
const DIFFUSION: f32 = 1.0 / 7.0;
/// Блок, где все узлы меньше порога, удаляется
const KILL_THRESHOLD: f32 = 1e-6;
const HOT_SPOT: f32 = 1000.0;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => match GridConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load config {}: {}", path, e);
                process::exit(1);
            }
        },
        None => GridConfig::default(),
    };
    let steps = match args.next().map(|s| s.parse::<u32>()) {
        Some(Ok(steps)) => steps,
        Some(Err(e)) => {
            log::error!("invalid step count: {}", e);
            process::exit(1);
        }
        None => 20,
    };

    if let Err(e) = run(config, steps) {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run(config: GridConfig, steps: u32) -> GridResult<()> {
    log::info!("config: {}", config.to_json()?);
    let mut grid: BlockStore<f32> = BlockStore::new(config.clone())?;
    *grid.node_mut(GridPos::ZERO) = HOT_SPOT;

    for step in 0..steps {
        grid.activate_neighbours(Connectivity::Face);
        grid.advance_scratch(|block, _, scratch| {
            let mut alive = false;
            for p in block.local_region() {
                let c = scratch.at(p);
                let sum = scratch.at(p + GridPos::new(1, 0, 0))
                    + scratch.at(p + GridPos::new(-1, 0, 0))
                    + scratch.at(p + GridPos::new(0, 1, 0))
                    + scratch.at(p + GridPos::new(0, -1, 0))
                    + scratch.at(p + GridPos::new(0, 0, 1))
                    + scratch.at(p + GridPos::new(0, 0, -1));
                let value = c + DIFFUSION * (sum - 6.0 * c);
                *block.node_local_mut(p) = value;
                alive |= value.abs() > KILL_THRESHOLD;
            }
            if !alive {
                block.kill();
            }
        });

        if step % 5 == 4 || step + 1 == steps {
            let mass: f64 = grid.reduce_sum(|b| b.nodes().iter().map(|&v| v as f64).sum::<f64>());
            let peak = grid.reduce(
                |b| b.nodes().iter().copied().fold(0.0f32, f32::max),
                f32::max,
                0.0,
            );
            log::info!(
                "step {:>4}: {} blocks in {} roots, mass {:.3}, peak {:.4}",
                grid.current_timestamp(),
                grid.num_active_blocks(),
                grid.num_root_nodes(),
                mass,
                peak
            );
        }
    }

    // Грубый уровень: среднее по 2x2x2
    let mut coarse: BlockStore<f32> = BlockStore::new(config)?;
    let created = grid.coarsen_to(&mut coarse, |block, an| restrict(block, an, 1.0f32 / 8.0))?;
    let coarse_mass: f64 = coarse.reduce_sum(|b| b.nodes().iter().map(|&v| v as f64).sum::<f64>());
    log::info!(
        "coarse level: {} blocks, mass x8 = {:.3}",
        created,
        coarse_mass * 8.0
    );
    Ok(())
}
