//! Graphviz rendering of a sampled topology.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

use crate::sampler::SampleRun;

/// Write `graph.dot` for the sampled topology.
///
/// Links are physically undirected, so edges are drawn without arrowheads.
/// Rendering to an image is left to graphviz: `dot -Tpng graph.dot`.
pub fn write_graph(run: &SampleRun, dir: &Path) -> Result<()> {
    let mut dot = String::new();
    dot.push_str("digraph topology {\n");
    dot.push_str("  node [style=filled, fillcolor=lightblue];\n");
    dot.push_str("  edge [arrowhead=none];\n");
    for node in run.sampled_nodes() {
        dot.push_str(&format!("  n{};\n", node));
    }
    for (a, b) in run.sampled_links() {
        dot.push_str(&format!("  n{} -> n{};\n", a, b));
    }
    dot.push_str("}\n");

    let path = dir.join("graph.dot");
    fs::write(&path, dot)
        .wrap_err_with(|| format!("Failed to write graph file '{}'", path.display()))
}
