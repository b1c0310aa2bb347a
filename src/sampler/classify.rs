//! Core-interface and leaf-node classification.
//!
//! A node is a core node when at least one of its interfaces carries an
//! address inside the configured core subnet; that interface belongs to the
//! routing backbone. Leaf detection is a separate, coarser signal based on
//! the link count the map reports for a node.

use std::collections::HashSet;

use ipnet::Ipv4Net;
use log::debug;

use crate::cnml::MapLookup;

/// Classifies interfaces and nodes against the core subnet.
///
/// Leaf lookups are memoized: the map is queried once per node id and the
/// verdict lands in one of two disjoint sets. Core-interface lookups are
/// stateless and always re-derive from the map.
pub struct CoreClassifier<'a, M: MapLookup> {
    map: &'a M,
    corenet: Ipv4Net,
    known_non_leaf: HashSet<u32>,
    known_leaf: HashSet<u32>,
}

impl<'a, M: MapLookup> CoreClassifier<'a, M> {
    pub fn new(map: &'a M, corenet: Ipv4Net) -> Self {
        Self {
            map,
            corenet,
            known_non_leaf: HashSet::new(),
            known_leaf: HashSet::new(),
        }
    }

    /// The subnet that marks an interface as core
    pub fn corenet(&self) -> Ipv4Net {
        self.corenet
    }

    /// Check whether the named interface of the named node carries a core
    /// address. A missing node or interface is simply not core.
    pub fn is_core_interface(&self, node_id: u32, interface_id: u32) -> bool {
        let node = match self.map.find_node(node_id) {
            Some(node) => node,
            None => return false,
        };
        let iface = match self.map.find_interface(node, interface_id) {
            Some(iface) => iface,
            None => return false,
        };
        match iface.ipv4 {
            Some(addr) => self.corenet.contains(&addr),
            None => false,
        }
    }

    /// Check whether a node has more than one reported link. Nodes absent
    /// from the map are treated as leaves so traversal never expands them.
    pub fn is_non_leaf(&mut self, node_id: u32) -> bool {
        if self.known_non_leaf.contains(&node_id) {
            return true;
        }
        if self.known_leaf.contains(&node_id) {
            return false;
        }

        match self.map.find_node(node_id) {
            Some(node) if node.links != 1 => {
                debug!("node {} classified as non-leaf ({} links)", node_id, node.links);
                self.known_non_leaf.insert(node_id);
                true
            }
            Some(_) => {
                debug!("node {} classified as leaf", node_id);
                self.known_leaf.insert(node_id);
                false
            }
            None => {
                debug!("node {} not found in map, treated as leaf", node_id);
                self.known_leaf.insert(node_id);
                false
            }
        }
    }
}
