//! Output emitters for sampled topologies.
//!
//! Everything here is plain file writing: node/link listings, the core-node
//! candidate listing, a JSON run report, a Graphviz rendering, and the NS
//! experiment scripts consumed by the testbed.

pub mod files;
pub mod graph;
pub mod ns_script;
pub mod report;

pub use files::{core_list_path, write_core_nodes, write_links, write_nodes};
pub use graph::write_graph;
pub use ns_script::generate_experiment;
pub use report::write_report;
