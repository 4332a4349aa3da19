mod decode;
mod lookup;
mod observe;

use std::path::PathBuf;

use birdwatch_core::SearchRadius;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "birdwatch")]
#[command(about = "Recent bird sightings and hotspots around a place")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List places matching a free-text query
    Search {
        /// Place name or address
        query: String,
    },
    /// Reverse-geocode a coordinate to a place name
    Name {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
    /// Fetch recent sightings and nearby hotspots
    ///
    /// Without `--lat/--lng` or `--place` the default location is used.
    Observe {
        #[arg(long, allow_negative_numbers = true, requires = "lng", conflicts_with = "place")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat", conflicts_with = "place")]
        lng: Option<f64>,
        /// Geocode this text and use the first match
        #[arg(long)]
        place: Option<String>,
        /// Search radius in km (5-50); defaults to `BIRDWATCH_DEFAULT_RADIUS_KM`
        #[arg(long, value_parser = parse_radius)]
        radius: Option<SearchRadius>,
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a saved hotspot CSV file and report rejected rows
    Decode {
        file: PathBuf,
        /// Print the decoded hotspots as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_radius(raw: &str) -> Result<SearchRadius, String> {
    let km: i64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a whole number of km"))?;
    SearchRadius::new(km).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("birdwatch: try `birdwatch observe` or `birdwatch --help`");
        return Ok(());
    };

    match command {
        Commands::Search { query } => {
            let config = birdwatch_core::load_app_config_from_env()?;
            lookup::run_search(&config, &query).await
        }
        Commands::Name { lat, lng } => {
            let config = birdwatch_core::load_app_config_from_env()?;
            lookup::run_name(&config, lat, lng).await
        }
        Commands::Observe {
            lat,
            lng,
            place,
            radius,
            json,
        } => {
            let config = birdwatch_core::load_app_config_from_env()?;
            let target = match (lat, lng, place) {
                (Some(lat), Some(lng), _) => observe::Target::Coordinate { lat, lng },
                (_, _, Some(place)) => observe::Target::Place(place),
                _ => observe::Target::Default,
            };
            observe::run_observe(&config, target, radius, json).await
        }
        Commands::Decode { file, json } => decode::run_decode(&file, json),
    }
}
