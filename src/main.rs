use anyhow::Context;

use quadlife::render;
use quadlife::rle;
use quadlife::world::World;
use quadlife::Coord;

// See: https://conwaylife.com/wiki/Glider
const GLIDER: [(Coord, Coord); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

const DEFAULT_GENERATIONS: u64 = 100;

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .without_time()
        .init();
}

/// Usage: quadlife [pattern.rle] [generations]
///
/// With no pattern argument, runs a glider.
fn main() -> anyhow::Result<()> {
    setup_logging();

    let mut args = std::env::args().skip(1);

    let cells = match args.next() {
        Some(path) => {
            let bytes =
                std::fs::read(&path).with_context(|| format!("failed to read \"{path}\""))?;

            rle::read_rle_coords(&bytes, 0, 0)
                .with_context(|| format!("failed to parse \"{path}\""))?
        }
        None => GLIDER.to_vec(),
    };

    let generations: u64 = match args.next() {
        Some(n) => n.parse().context("invalid generation count")?,
        None => DEFAULT_GENERATIONS,
    };

    let mut world = World::new();
    world.set_cells_alive(&cells);

    for _ in 0..generations {
        world.step();
    }

    let list = world.display_list();
    println!("{}", render::render_display_list(&list));

    let stats = world.stats();
    println!("============================================================");
    println!(
        "generation {} | population {} | level {} | {} live nodes | {} created",
        stats.generation, stats.population, stats.level, stats.store_nodes, stats.nodes_created
    );

    Ok(())
}
