//! # Topgen - Testbed topology sampler for CNML network maps
//!
//! This library samples a bounded-size connected subset of core routing
//! nodes from a large community-network map and turns it into a reduced
//! topology usable for simulation and testbed experiments.
//!
//! ## Overview
//!
//! Community networks publish their infrastructure as CNML documents with
//! thousands of nodes; experiments on emulation testbeds can only host a
//! few dozen. Topgen classifies which nodes carry routing infrastructure
//! (an interface inside the core subnet), derives core-to-core adjacency
//! through the physical link records, and performs a size-bounded,
//! repeat-aware random walk that either converges to an exact target node
//! count or reports failure.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `cnml_parser`: lexer/parser for the XML subset CNML documents use
//! - `cnml`: typed document model and `NetworkMap` lookups
//! - `config`: type-safe configuration structures and YAML parsing
//! - `sampler`: core classification, adjacency resolution, and the walk
//! - `output`: node/link listings, run report, graph rendering, and NS
//!   experiment script generation
//! - `orchestrator`: high-level coordination of one generation run
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use topgen::{cnml::NetworkMap, config::Config, orchestrator};
//!
//! let map = NetworkMap::load(Path::new("cnml/baixpenedes.xml"))?;
//! let mut config = Config::default();
//! config.sampling.max_nodes = 20;
//! config.sampling.seed = Some(42);
//!
//! match orchestrator::generate_topology(&map, Path::new("cnml/baixpenedes.xml"), &config)? {
//!     Some(dir) => println!("topology written to {}", dir.display()),
//!     None => println!("walk came up short, nothing written"),
//! }
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! The library uses `color_eyre` for error reporting with context. Missing
//! nodes or interfaces inside the map are never errors; they resolve to
//! conservative defaults (leaf, not core, no neighbors) so a stale or
//! partially exported map still samples.

pub mod cnml;
pub mod cnml_parser;
pub mod config;
pub mod orchestrator;
pub mod output;
pub mod sampler;
