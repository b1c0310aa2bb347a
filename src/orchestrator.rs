//! Topology generation orchestrator.
//!
//! This module coordinates the overall run: core-candidate collection over
//! the parsed map, the sampling walk, the success check, and output
//! emission according to configuration.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use color_eyre::eyre::{Result, WrapErr};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cnml::NetworkMap;
use crate::config::Config;
use crate::output;
use crate::sampler::{CoreClassifier, TopologySampler};

/// Log zone and classification statistics for a map
pub fn print_summary(map: &NetworkMap, config: &Config) -> Result<()> {
    let corenet = config.core_subnet()?;

    info!(
        "Map contains {} zones and {} nodes",
        map.zones().len(),
        map.node_count()
    );
    for zone in map.zones() {
        info!("  zone {} '{}': {} nodes", zone.id, zone.title, zone.zone_nodes);
    }

    let target = config.sampling.max_nodes as u32;
    info!(
        "{} zones advertise at least {} nodes",
        map.zones_with_min_nodes(target).len(),
        target
    );

    let working = map.all_nodes().filter(|n| n.status.is_working()).count();
    let mut classifier = CoreClassifier::new(map, corenet);
    let node_ids: Vec<u32> = map.all_nodes().map(|n| n.id).collect();
    let non_leaf = node_ids
        .iter()
        .filter(|&&id| classifier.is_non_leaf(id))
        .count();
    let core = map.collect_core_nodes(corenet).len();
    info!(
        "{} working nodes, {} non-leaf, {} core node candidates (subnet {})",
        working, non_leaf, core, corenet
    );
    Ok(())
}

/// Run one sampling walk over the map and emit the configured outputs.
///
/// Returns the run directory, or `None` when the walk came up short and the
/// configuration suppresses undersized output.
pub fn generate_topology(
    map: &NetworkMap,
    map_path: &Path,
    config: &Config,
) -> Result<Option<PathBuf>> {
    let corenet = config.core_subnet()?;
    let output_base = Path::new(&config.general.output_dir);
    fs::create_dir_all(output_base).wrap_err_with(|| {
        format!("Failed to create output directory '{}'", output_base.display())
    })?;

    let core_nodes = map.collect_core_nodes(corenet);
    info!(
        "Collected {} core node candidates for subnet {}",
        core_nodes.len(),
        corenet
    );

    let core_list =
        output::core_list_path(config.output.core_list_location, map_path, output_base);
    output::write_core_nodes(&core_nodes, &core_list)?;

    let rng = match config.sampling.seed {
        Some(seed) => {
            info!("Seeding walk RNG with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => {
            info!("No seed configured, drawing one from entropy");
            StdRng::from_entropy()
        }
    };

    let mut sampler = TopologySampler::new(
        map,
        corenet,
        config.sampling.max_nodes,
        config.sampling.repeat_limit,
        rng,
    );
    let run = sampler.sample_from_candidates(&core_nodes)?;

    if !run.did_succeed() {
        warn!(
            "Topology from start node {} has {} nodes, wanted {} ({:?})",
            run.start_node(),
            run.actual_size(),
            run.target_size(),
            run.outcome()
        );
        if config.output.emit_only_on_exact_match {
            warn!("No topology files written");
            return Ok(None);
        }
    }

    let run_dir = output_base.join(Local::now().format("%Y-%m-%d-%H-%M-%S").to_string());
    fs::create_dir_all(&run_dir)
        .wrap_err_with(|| format!("Failed to create run directory '{}'", run_dir.display()))?;

    output::write_nodes(&run, &run_dir)?;
    output::write_links(&run, &run_dir)?;
    output::write_report(&run, map_path, &run_dir)?;

    if run.did_succeed() {
        if config.output.graph {
            output::write_graph(&run, &run_dir)?;
        }
        output::generate_experiment(&run, config.output.protocol, &run_dir)?;
        info!(
            "Created topology from start node {} with {} nodes in {}",
            run.start_node(),
            run.actual_size(),
            run_dir.display()
        );
    } else {
        // Undersized runs keep their listings for inspection but get none of
        // the heavyweight outputs
        info!(
            "Wrote undersized node/link listings to {}",
            run_dir.display()
        );
    }

    Ok(Some(run_dir))
}
