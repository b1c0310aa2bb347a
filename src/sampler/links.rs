//! Undirected link extraction from a sampled topology.

use std::collections::{BTreeMap, BTreeSet};

/// Collapse a directed adjacency mapping into undirected links.
///
/// A pair is included only when both endpoints are topology keys: adjacency
/// values may name core neighbors the walk never visited. Each physical link
/// appears once from each endpoint's perspective, so pairs are normalized
/// with the smaller id first before insertion.
pub fn extract_links(topology: &BTreeMap<u32, BTreeSet<u32>>) -> BTreeSet<(u32, u32)> {
    let mut links = BTreeSet::new();
    for (&node, neighbors) in topology {
        for &neighbor in neighbors {
            if !topology.contains_key(&neighbor) {
                continue;
            }
            let pair = if node <= neighbor {
                (node, neighbor)
            } else {
                (neighbor, node)
            };
            links.insert(pair);
        }
    }
    links
}
