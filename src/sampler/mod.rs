//! Core-node discovery and bounded topology sampling.
//!
//! This module contains the heart of the tool: classifying which nodes of a
//! network map carry routing infrastructure, deriving core-to-core adjacency
//! through the physical link records, and running the size-bounded random
//! walk that produces the reduced topology.

pub mod adjacency;
pub mod classify;
pub mod links;
pub mod walk;

// Re-export key types and functions for easier access
pub use adjacency::AdjacencyResolver;
pub use classify::CoreClassifier;
pub use links::extract_links;
pub use walk::{SampleError, SampleRun, TopologySampler, WalkOutcome};
