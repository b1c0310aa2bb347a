//! JSON run report generation.
//!
//! The report mirrors what the log output says about a run in a form other
//! tooling can consume without scraping the node/link listings.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;

use crate::sampler::SampleRun;

#[derive(Serialize, Debug)]
struct RunReport<'a> {
    map: &'a str,
    start_node: u32,
    target_size: usize,
    actual_size: usize,
    success: bool,
    nodes: Vec<u32>,
    links: Vec<(u32, u32)>,
}

/// Write `topology.json` describing the run
pub fn write_report(run: &SampleRun, map_path: &Path, dir: &Path) -> Result<()> {
    let map = map_path.to_string_lossy();
    let report = RunReport {
        map: &map,
        start_node: run.start_node(),
        target_size: run.target_size(),
        actual_size: run.actual_size(),
        success: run.did_succeed(),
        nodes: run.sampled_nodes().collect(),
        links: run.sampled_links().collect(),
    };

    let path = dir.join("topology.json");
    let content = serde_json::to_string_pretty(&report)
        .wrap_err("Failed to serialize run report")?;
    fs::write(&path, content)
        .wrap_err_with(|| format!("Failed to write run report '{}'", path.display()))
}
