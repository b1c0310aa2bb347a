use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::path::PathBuf;

use topgen::cnml::NetworkMap;
use topgen::config::{self, Config, Protocol};
use topgen::orchestrator;

/// Utility for sampling reduced testbed topologies from CNML network maps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the CNML network map XML file
    #[arg(short, long)]
    map: PathBuf,

    /// Path to the sampler configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target number of core nodes in the sampled topology
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Seed for the walk RNG, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Routing protocol for the generated experiment script (bmx6, olsrd, none)
    #[arg(short, long)]
    protocol: Option<String>,

    /// Output directory for generated topology files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print zone statistics for the map instead of sampling
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration, then apply command-line overrides
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    if let Some(nodes) = args.nodes {
        config.sampling.max_nodes = nodes;
    }
    if let Some(seed) = args.seed {
        config.sampling.seed = Some(seed);
    }
    if let Some(protocol) = &args.protocol {
        config.output.protocol = protocol.parse::<Protocol>().map_err(|e| eyre!(e))?;
    }
    if let Some(output) = &args.output {
        config.general.output_dir = output.display().to_string();
    }
    config.validate()?;

    // Initialize logging with the configured default filter level
    let default_level = config
        .general
        .log_level
        .clone()
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(&default_level)).init();

    info!("Starting topgen topology sampler");
    info!("Network map: {:?}", args.map);
    info!("Output directory: {}", config.general.output_dir);

    let map = NetworkMap::load(&args.map)?;
    info!("Parsed map with {} nodes in {} zones", map.node_count(), map.zones().len());

    if args.summary {
        orchestrator::print_summary(&map, &config)?;
        return Ok(());
    }

    match orchestrator::generate_topology(&map, &args.map, &config)? {
        Some(dir) => info!("Topology generation completed: {}", dir.display()),
        None => warn!("Topology generation finished without outputs"),
    }

    Ok(())
}
