//! Bounded, repeat-aware random walk over the core adjacency graph.
//!
//! The walk starts from a core node and repeatedly picks a random member of
//! the frontier (core neighbors seen but not yet visited). Fresh nodes are
//! expanded and recorded; revisits are not, so the frontier can only shrink
//! between expansions. Two stop conditions bound the walk: the target size,
//! and a run of consecutive revisits that signals the reachable core is
//! cycling rather than growing.

use std::collections::{BTreeMap, BTreeSet};

use ipnet::Ipv4Net;
use log::{debug, info, warn};
use rand::Rng;
use thiserror::Error;

use super::adjacency::AdjacencyResolver;
use super::links::extract_links;
use crate::cnml::MapLookup;

/// Why a walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The topology reached the target size
    TargetReached,
    /// The frontier emptied before the target size was reached
    FrontierExhausted,
    /// Too many consecutive revisits of already-accepted nodes
    RepeatLimit,
}

/// Errors preventing a walk from starting
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("no core nodes found in the map for subnet {0}")]
    NoCoreNodes(Ipv4Net),
}

/// Result of one sampling run
#[derive(Debug)]
pub struct SampleRun {
    topology: BTreeMap<u32, BTreeSet<u32>>,
    links: BTreeSet<(u32, u32)>,
    outcome: WalkOutcome,
    target: usize,
    start: u32,
}

impl SampleRun {
    /// Node ids accepted into the sample, in ascending order
    pub fn sampled_nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.topology.keys().copied()
    }

    /// Undirected links among the sampled nodes, each pair stored once with
    /// the smaller id first
    pub fn sampled_links(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.links.iter().copied()
    }

    /// Sampled link partners of one node
    pub fn link_partners(&self, node_id: u32) -> Vec<u32> {
        let mut partners = Vec::new();
        for &(a, b) in &self.links {
            if a == node_id {
                partners.push(b);
            } else if b == node_id {
                partners.push(a);
            }
        }
        partners
    }

    /// Whether the sample hit the target size exactly
    pub fn did_succeed(&self) -> bool {
        self.actual_size() == self.target
    }

    pub fn target_size(&self) -> usize {
        self.target
    }

    pub fn actual_size(&self) -> usize {
        self.topology.len()
    }

    pub fn outcome(&self) -> WalkOutcome {
        self.outcome
    }

    /// The core node the walk started from
    pub fn start_node(&self) -> u32 {
        self.start
    }

    /// The accepted adjacency mapping. Values may reference core neighbors
    /// that were never visited; `sampled_links` filters those out.
    pub fn topology(&self) -> &BTreeMap<u32, BTreeSet<u32>> {
        &self.topology
    }
}

/// Drives bounded sampling walks over a network map
pub struct TopologySampler<'a, M: MapLookup, R: Rng> {
    resolver: AdjacencyResolver<'a, M>,
    rng: R,
    max_nodes: usize,
    repeat_limit: u32,
}

impl<'a, M: MapLookup, R: Rng> TopologySampler<'a, M, R> {
    pub fn new(map: &'a M, corenet: Ipv4Net, max_nodes: usize, repeat_limit: u32, rng: R) -> Self {
        Self {
            resolver: AdjacencyResolver::new(map, corenet),
            rng,
            max_nodes,
            repeat_limit,
        }
    }

    pub fn resolver(&mut self) -> &mut AdjacencyResolver<'a, M> {
        &mut self.resolver
    }

    /// Pick a random start node from the candidate list and run one walk
    pub fn sample_from_candidates(&mut self, candidates: &[u32]) -> Result<SampleRun, SampleError> {
        if candidates.is_empty() {
            return Err(SampleError::NoCoreNodes(self.resolver.corenet()));
        }
        let start = candidates[self.rng.gen_range(0..candidates.len())];
        info!("starting walk from core node {}", start);
        Ok(self.sample_from(start))
    }

    /// Run one walk from the given start node
    pub fn sample_from(&mut self, start: u32) -> SampleRun {
        let mut topology: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        let mut frontier: BTreeSet<u32> = BTreeSet::new();
        let mut prev_was_repeat = false;
        let mut repeat_streak: u32 = 0;
        let mut current = start;

        let outcome = loop {
            if topology.contains_key(&current) {
                // Revisit: neighbors were already merged on first visit, so
                // only the repeat accounting advances
                if prev_was_repeat {
                    repeat_streak += 1;
                    debug!(
                        "revisited node {}, {} consecutive revisits",
                        current, repeat_streak
                    );
                    if repeat_streak >= self.repeat_limit {
                        warn!(
                            "aborting walk after {} consecutive revisits",
                            repeat_streak
                        );
                        break WalkOutcome::RepeatLimit;
                    }
                }
                prev_was_repeat = true;
            } else {
                prev_was_repeat = false;
                repeat_streak = 0;

                let neighbors = self.resolver.core_neighbors(current);
                frontier.extend(neighbors.iter().copied());
                topology.insert(current, neighbors);
                debug!("accepted node {}, topology size {}", current, topology.len());

                // The size gate sits right behind the insertion, so the
                // topology can never grow past the target
                if topology.len() >= self.max_nodes {
                    break WalkOutcome::TargetReached;
                }
            }

            current = match pick_random(&mut frontier, &mut self.rng) {
                Some(next) => next,
                None => break WalkOutcome::FrontierExhausted,
            };
        };

        let links = extract_links(&topology);
        info!(
            "walk finished: {} of {} nodes, {} links ({:?})",
            topology.len(),
            self.max_nodes,
            links.len(),
            outcome
        );

        SampleRun {
            topology,
            links,
            outcome,
            target: self.max_nodes,
            start,
        }
    }
}

/// Remove and return a uniformly random element of the set
fn pick_random<R: Rng>(frontier: &mut BTreeSet<u32>, rng: &mut R) -> Option<u32> {
    if frontier.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..frontier.len());
    let chosen = frontier.iter().nth(index).copied()?;
    frontier.remove(&chosen);
    Some(chosen)
}
