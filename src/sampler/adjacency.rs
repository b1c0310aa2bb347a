//! Core-neighbor derivation through the physical link graph.

use std::collections::BTreeSet;

use ipnet::Ipv4Net;
use log::trace;

use super::classify::CoreClassifier;
use crate::cnml::MapLookup;

/// Derives the core-node neighborhood of a node from the map's link records.
///
/// Results are always recomputed from the map; only the leaf verdicts inside
/// the classifier persist between calls.
pub struct AdjacencyResolver<'a, M: MapLookup> {
    map: &'a M,
    classifier: CoreClassifier<'a, M>,
}

impl<'a, M: MapLookup> AdjacencyResolver<'a, M> {
    pub fn new(map: &'a M, corenet: Ipv4Net) -> Self {
        Self {
            map,
            classifier: CoreClassifier::new(map, corenet),
        }
    }

    pub fn corenet(&self) -> Ipv4Net {
        self.classifier.corenet()
    }

    pub fn classifier(&mut self) -> &mut CoreClassifier<'a, M> {
        &mut self.classifier
    }

    /// All core nodes directly linked to `node_id` through one of its core
    /// interfaces. Self-links in the map are discarded, and a neighbor only
    /// qualifies when the far end of the link is itself a core interface.
    pub fn core_neighbors(&self, node_id: u32) -> BTreeSet<u32> {
        let mut neighbors = BTreeSet::new();
        let node = match self.map.find_node(node_id) {
            Some(node) => node,
            None => return neighbors,
        };

        for iface in self.map.interfaces_of(node) {
            let addr = match iface.ipv4 {
                Some(addr) => addr,
                None => continue,
            };
            if !self.classifier.corenet().contains(&addr) {
                continue;
            }
            for link in self.map.outbound_links_of(iface) {
                if link.linked_node_id == node_id {
                    // The map occasionally records a node linking to itself
                    continue;
                }
                if self
                    .classifier
                    .is_core_interface(link.linked_node_id, link.linked_interface_id)
                {
                    trace!("core neighbor of {}: {}", node_id, link.linked_node_id);
                    neighbors.insert(link.linked_node_id);
                }
            }
        }
        neighbors
    }
}
