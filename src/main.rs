use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};

use geodesic_erosion::elevation::elevation_range;
use geodesic_erosion::erosion::DEFAULT_MAX_WORKERS;
use geodesic_erosion::export;
use geodesic_erosion::{
    ErosionPreset, ExecutionStrategy, SimulationConfig, Terrain, TerrainConfig, Topology,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Sequential,
    Parallel,
    Packed,
}

#[derive(Parser, Debug)]
#[command(name = "geodesic_erosion")]
#[command(about = "Generate geodesic terrain and carve it with water droplets")]
struct Args {
    /// JSON run configuration (flags below override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed shape
    #[arg(short, long, value_enum)]
    topology: Option<Topology>,

    /// Subdivision passes
    #[arg(short, long)]
    depth: Option<u32>,

    /// Number of droplets to simulate
    #[arg(short = 'n', long)]
    droplets: Option<usize>,

    /// Random seed (uses random seed if not specified and no config is given)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Erosion preset (replaces the config file's simulation settings)
    #[arg(short, long, value_enum)]
    preset: Option<ErosionPreset>,

    /// Droplet scheduling
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Maximum worker threads for the parallel strategy
    #[arg(short, long)]
    workers: Option<usize>,

    /// Neighbourhood radius (in hops) erosion is spread over
    #[arg(long)]
    erosion_radius: Option<usize>,

    /// Output PNG path
    #[arg(short, long, default_value = "terrain.png")]
    output: PathBuf,

    /// Image size in pixels
    #[arg(long, default_value = "1024")]
    size: u32,

    /// Also write a JSON snapshot of the terrain
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// List erosion presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn resolve_config(args: &Args) -> Result<TerrainConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => TerrainConfig::load(path)?,
        None => TerrainConfig {
            seed: rand::random(),
            ..Default::default()
        },
    };

    if let Some(topology) = args.topology {
        config.topology = topology;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(droplets) = args.droplets {
        config.droplets = droplets;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(preset) = args.preset {
        config.simulation = SimulationConfig::from_preset(preset);
    }
    if let Some(radius) = args.erosion_radius {
        config.simulation.erosion_radius = radius;
    }

    let workers = args.workers.unwrap_or(match config.strategy {
        ExecutionStrategy::Parallel { max_workers } => max_workers,
        _ => DEFAULT_MAX_WORKERS,
    });
    config.strategy = match args.strategy {
        Some(StrategyArg::Sequential) => ExecutionStrategy::Sequential,
        Some(StrategyArg::Parallel) => ExecutionStrategy::Parallel { max_workers: workers },
        Some(StrategyArg::Packed) => ExecutionStrategy::Packed,
        None => match config.strategy {
            ExecutionStrategy::Parallel { .. } => ExecutionStrategy::Parallel { max_workers: workers },
            other => other,
        },
    };

    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if args.list_presets {
        for preset in ErosionPreset::all() {
            println!("  {:<8} {}", preset, preset.description());
        }
        return Ok(());
    }

    let config = resolve_config(&args)?;
    if let Some(path) = &args.write_config {
        config.save(path)?;
        return Ok(());
    }

    println!("Generating terrain with seed: {}", config.seed);
    println!("Topology: {} (depth {})", config.topology, config.depth);

    println!("Building mesh...");
    let start = Instant::now();
    let mut terrain = Terrain::build(config.topology, config.depth);
    println!("  Triangles: {}", terrain.mesh().triangle_count());
    println!("  Regions: {}", terrain.region_count());
    println!("  Built in {:?}", start.elapsed());

    println!("Seeding elevation ({} octaves)...", config.noise.octaves);
    terrain.seed_elevation(&config.noise)?;
    let (min_h, max_h) = elevation_range(terrain.regions());
    println!("  Elevation range: {:.4} to {:.4}", min_h, max_h);

    println!("Simulating erosion: {} droplets, {}...", config.droplets, config.strategy);
    let start = Instant::now();
    let stats = terrain.simulate_erosion(config.droplets, &config.simulation, config.seed, config.strategy)?;
    println!("  Finished in {:?}", start.elapsed());
    stats.print_summary();

    let (min_h, max_h) = elevation_range(terrain.regions());
    println!("Post-erosion elevation range: {:.4} to {:.4}", min_h, max_h);

    export::export_heightmap(&terrain, &args.output, args.size)?;
    if let Some(path) = &args.snapshot {
        export::write_snapshot(&terrain, path)?;
    }

    Ok(())
}
