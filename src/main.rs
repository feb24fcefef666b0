use clap::Parser;

use map_generator::biomes::BiomesData;
use map_generator::config::{MapConfig, OceanLayers};
use map_generator::export;
use map_generator::world::{self, WorldGenError};

#[derive(Parser, Debug)]
#[command(name = "map_generator")]
#[command(about = "Generate procedural fantasy terrain maps")]
struct Args {
    /// Map width in graph units
    #[arg(short = 'W', long, default_value = "960")]
    width: f64,

    /// Map height in graph units
    #[arg(short = 'H', long, default_value = "540")]
    height: f64,

    /// Seed string (random if not specified)
    #[arg(short, long)]
    seed: Option<String>,

    /// Heightmap template: volcano, highIsland, lowIsland, continents,
    /// archipelago, atoll, mediterranean, peninsula, pangea, isthmus,
    /// shattered
    #[arg(short, long, default_value = "continents")]
    template: String,

    /// Cell density multiplier (1-10, grid targets density * 10000 cells)
    #[arg(short, long, default_value = "1")]
    density: f64,

    /// Equator temperature in degrees Celsius
    #[arg(long, default_value = "27")]
    temperature_equator: f64,

    /// Pole temperature in degrees Celsius
    #[arg(long, default_value = "-30")]
    temperature_pole: f64,

    /// Global precipitation scale
    #[arg(long, default_value = "1.0")]
    precipitation: f64,

    /// Exponent of the altitude temperature drop
    #[arg(long, default_value = "2.0")]
    height_exponent: f64,

    /// Wind direction per latitude tier, six comma-separated angles
    #[arg(long, default_value = "225,45,225,315,135,315")]
    winds: String,

    /// Map size as percent of the globe (rolled from template if omitted)
    #[arg(long)]
    map_size: Option<f64>,

    /// Latitude shift percent (rolled from template if omitted)
    #[arg(long)]
    latitude_shift: Option<f64>,

    /// Ocean depth bands: "standard", "random" or comma-separated values
    /// like "-6,-3,-1"
    #[arg(long, default_value = "standard")]
    ocean_layers: String,

    /// JSON file with a custom biome table
    #[arg(long)]
    biomes: Option<String>,

    /// Output path prefix for exported PNGs
    #[arg(short, long, default_value = "map")]
    output: String,

    /// Pixels per graph unit in exported images
    #[arg(long, default_value = "2")]
    export_scale: u32,

    /// Export the heightmap PNG
    #[arg(long)]
    export_heightmap: bool,

    /// Export the temperature PNG
    #[arg(long)]
    export_temperature: bool,

    /// Export the precipitation PNG
    #[arg(long)]
    export_precipitation: bool,

    /// Export the biome PNG
    #[arg(long)]
    export_biomes: bool,

    /// Export the population PNG
    #[arg(long)]
    export_population: bool,

    /// Print summary statistics for the generated world
    #[arg(long)]
    stats: bool,
}

fn parse_ocean_layers(raw: &str) -> Result<OceanLayers, String> {
    match raw {
        "standard" => Ok(OceanLayers::Standard),
        "random" => Ok(OceanLayers::Random),
        custom => {
            let layers: Result<Vec<i8>, _> =
                custom.split(',').map(|v| v.trim().parse::<i8>()).collect();
            match layers {
                Ok(layers) if !layers.is_empty() => Ok(OceanLayers::Custom(layers)),
                _ => Err(format!("cannot parse ocean layers from {:?}", raw)),
            }
        }
    }
}

fn parse_winds(raw: &str) -> Result<[u16; 6], String> {
    let angles: Result<Vec<u16>, _> = raw.split(',').map(|v| v.trim().parse::<u16>()).collect();
    match angles {
        Ok(angles) if angles.len() == 6 && angles.iter().all(|&a| a < 360) => {
            let mut winds = [0u16; 6];
            winds.copy_from_slice(&angles);
            Ok(winds)
        }
        _ => Err(format!("expected six wind angles 0-359, got {:?}", raw)),
    }
}

fn run(args: Args) -> Result<(), WorldGenError> {
    let seed = args
        .seed
        .unwrap_or_else(|| rand::random::<u32>().to_string());
    let ocean_layers = match parse_ocean_layers(&args.ocean_layers) {
        Ok(layers) => layers,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };
    let winds = match parse_winds(&args.winds) {
        Ok(winds) => winds,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let config = MapConfig {
        width: args.width,
        height: args.height,
        density: args.density,
        template: args.template,
        seed,
        temperature_equator: args.temperature_equator,
        temperature_pole: args.temperature_pole,
        precipitation_modifier: args.precipitation,
        height_exponent: args.height_exponent,
        winds,
        map_size: args.map_size,
        latitude_shift: args.latitude_shift,
        ocean_layers,
        ..MapConfig::default()
    };

    let world = match &args.biomes {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            let data: BiomesData = serde_json::from_str(&json)
                .map_err(|e| WorldGenError::InvalidBiomes(e.to_string()))?;
            world::generate_with_biomes(&config, data)?
        }
        None => world::generate(&config)?,
    };

    if args.stats {
        print_stats(&world);
    }

    let scale = args.export_scale;
    if args.export_heightmap {
        let path = format!("{}_height.png", args.output);
        export::export_heightmap(&world, &path, scale)?;
        println!("saved {}", path);
    }
    if args.export_temperature {
        let path = format!("{}_temperature.png", args.output);
        export::export_temperature(&world, &path, scale)?;
        println!("saved {}", path);
    }
    if args.export_precipitation {
        let path = format!("{}_precipitation.png", args.output);
        export::export_precipitation(&world, &path, scale)?;
        println!("saved {}", path);
    }
    if args.export_biomes {
        let path = format!("{}_biomes.png", args.output);
        export::export_biomes(&world, &path, scale)?;
        println!("saved {}", path);
    }
    if args.export_population {
        let path = format!("{}_population.png", args.output);
        export::export_population(&world, &path, scale)?;
        println!("saved {}", path);
    }

    Ok(())
}

fn print_stats(world: &map_generator::world::World) {
    let pack = &world.pack;
    let land = pack.heights.iter().filter(|&&h| h >= 20).count();
    let lakes = pack
        .features
        .iter()
        .filter(|f| f.kind == map_generator::features::FeatureKind::Lake)
        .count();
    let islands = pack.features.iter().filter(|f| f.land).count();
    let population: f64 = pack.population.iter().sum();

    println!("--- world {} ---", world.seed());
    println!(
        "latitude {:.1} to {:.1}",
        world.coordinates.lat_n, world.coordinates.lat_s
    );
    println!(
        "pack cells: {} ({} land)",
        pack.graph.cells_len(),
        land
    );
    println!("islands: {}, lakes: {}", islands, lakes);
    println!("rivers: {}", world.rivers.len());
    for river in world.rivers.iter().take(5) {
        println!(
            "  {} {} (length {:.0}, basin {})",
            river.name,
            river.kind.label(),
            river.length,
            river.basin
        );
    }
    println!("total rural population: {:.0}", population);
}

fn main() {
    let args = Args::parse();
    if let Err(error) = run(args) {
        eprintln!("generation failed: {}", error);
        std::process::exit(1);
    }
}
