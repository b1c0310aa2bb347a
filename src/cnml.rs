//! CNML document model and lookups.
//!
//! This module turns a parsed CNML element tree into typed zone, node,
//! interface, and link records, and exposes the queries the sampler needs:
//! node and interface lookup by id, link enumeration, zone statistics, and
//! core-candidate collection.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

use color_eyre::eyre::{eyre, Result};
use ipnet::Ipv4Net;
use log::warn;

use crate::cnml_parser::{self, Element};

/// Node status as reported by the map. Only `Working` nodes carry traffic;
/// every other status is preserved verbatim for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Working,
    Other(String),
}

impl NodeStatus {
    fn from_attr(raw: Option<&str>) -> Self {
        match raw {
            Some("Working") => NodeStatus::Working,
            Some(other) => NodeStatus::Other(other.to_string()),
            None => NodeStatus::Other(String::new()),
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self, NodeStatus::Working)
    }
}

/// Directed link record stored under its source interface. Two such records
/// typically describe one physical link, once from each endpoint.
#[derive(Debug, Clone)]
pub struct Link {
    pub linked_node_id: u32,
    pub linked_interface_id: u32,
}

/// A network interface of a node
#[derive(Debug, Clone)]
pub struct Interface {
    pub id: u32,
    pub node_id: u32,
    /// Parsed leniently; an unparseable address is logged and dropped
    pub ipv4: Option<Ipv4Addr>,
    pub links: Vec<Link>,
}

/// A node in the network map
#[derive(Debug, Clone)]
pub struct Node {
    pub id: u32,
    pub title: Option<String>,
    pub status: NodeStatus,
    /// Link count as reported by the map, used as a cheap leaf signal
    pub links: u32,
    pub interfaces: Vec<Interface>,
}

/// An administrative zone of the map
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: u32,
    pub title: String,
    /// Node count as advertised by the zone attribute
    pub zone_nodes: u32,
    pub node_ids: Vec<u32>,
}

/// Lookup surface the sampler needs from a network map.
///
/// `NetworkMap` is the production implementation; tests substitute
/// instrumented doubles to observe query counts.
pub trait MapLookup {
    fn find_node(&self, id: u32) -> Option<&Node>;

    fn find_interface<'n>(&self, node: &'n Node, interface_id: u32) -> Option<&'n Interface> {
        node.interfaces.iter().find(|iface| iface.id == interface_id)
    }

    fn interfaces_of<'n>(&self, node: &'n Node) -> &'n [Interface] {
        &node.interfaces
    }

    fn outbound_links_of<'i>(&self, interface: &'i Interface) -> &'i [Link] {
        &interface.links
    }
}

/// Queryable view over a parsed CNML document
#[derive(Debug)]
pub struct NetworkMap {
    zones: Vec<Zone>,
    nodes: HashMap<u32, Node>,
    /// Node ids in document order
    order: Vec<u32>,
}

impl MapLookup for NetworkMap {
    fn find_node(&self, id: u32) -> Option<&Node> {
        self.nodes.get(&id)
    }
}

impl NetworkMap {
    /// Parse a CNML file and build the map
    pub fn load(path: &Path) -> Result<Self> {
        let root = cnml_parser::parse_file(path)?;
        Self::from_element(&root)
    }

    /// Build the map from CNML document text
    pub fn from_xml_str(content: &str) -> Result<Self> {
        let root = cnml_parser::parse_str(content)?;
        Self::from_element(&root)
    }

    /// Build the map from a parsed element tree
    pub fn from_element(root: &Element) -> Result<Self> {
        let mut zones = Vec::new();
        for zone_el in root.descendants("zone") {
            zones.push(parse_zone(zone_el)?);
        }

        let mut nodes = HashMap::new();
        let mut order = Vec::new();
        for node_el in root.descendants("node") {
            let node = parse_node(node_el)?;
            if nodes.contains_key(&node.id) {
                warn!("Duplicate node id {} in map, keeping the first occurrence", node.id);
                continue;
            }
            order.push(node.id);
            nodes.insert(node.id, node);
        }

        Ok(Self { zones, nodes, order })
    }

    /// Number of nodes in the map
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// All nodes in document order
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All zones in document order
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Zones advertising at least `min_nodes` nodes
    pub fn zones_with_min_nodes(&self, min_nodes: u32) -> Vec<&Zone> {
        self.zones.iter().filter(|z| z.zone_nodes >= min_nodes).collect()
    }

    /// Zones advertising at most `max_nodes` nodes
    pub fn zones_with_max_nodes(&self, max_nodes: u32) -> Vec<&Zone> {
        self.zones.iter().filter(|z| z.zone_nodes <= max_nodes).collect()
    }

    /// Title of the zone with the given id
    pub fn zone_title(&self, zone_id: u32) -> Option<&str> {
        self.zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.title.as_str())
    }

    /// Nodes belonging to the zone with the given id
    pub fn nodes_of_zone(&self, zone_id: u32) -> Vec<&Node> {
        let zone = match self.zones.iter().find(|z| z.id == zone_id) {
            Some(zone) => zone,
            None => return Vec::new(),
        };
        zone.node_ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Collect every node exposing at least one interface inside the given
    /// subnet, in document order
    pub fn collect_core_nodes(&self, corenet: Ipv4Net) -> Vec<u32> {
        let mut core_nodes = Vec::new();
        for node in self.all_nodes() {
            let is_core = node
                .interfaces
                .iter()
                .any(|iface| iface.ipv4.map_or(false, |addr| corenet.contains(&addr)));
            if is_core {
                core_nodes.push(node.id);
            }
        }
        core_nodes
    }
}

fn required_u32(el: &Element, attr: &str) -> Result<u32> {
    let raw = el
        .attr(attr)
        .ok_or_else(|| eyre!("<{}> missing required '{}' attribute", el.name, attr))?;
    raw.parse::<u32>()
        .map_err(|_| eyre!("Invalid '{}' attribute on <{}>: {}", attr, el.name, raw))
}

fn lenient_u32(el: &Element, attr: &str) -> u32 {
    match el.attr(attr) {
        Some(raw) => match raw.parse::<u32>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid '{}' attribute on <{}>: {}", attr, el.name, raw);
                0
            }
        },
        None => 0,
    }
}

fn parse_zone(el: &Element) -> Result<Zone> {
    let id = required_u32(el, "id")?;
    let title = el.attr("title").unwrap_or("").to_string();
    let zone_nodes = lenient_u32(el, "zone_nodes");
    let mut node_ids = Vec::new();
    for node_el in el.descendants("node") {
        node_ids.push(required_u32(node_el, "id")?);
    }
    Ok(Zone {
        id,
        title,
        zone_nodes,
        node_ids,
    })
}

fn parse_node(el: &Element) -> Result<Node> {
    let id = required_u32(el, "id")?;
    let title = el.attr("title").map(str::to_string);
    let status = NodeStatus::from_attr(el.attr("status"));
    let links = lenient_u32(el, "links");

    let mut interfaces = Vec::new();
    for iface_el in el.descendants("interface") {
        interfaces.push(parse_interface(iface_el, id)?);
    }

    Ok(Node {
        id,
        title,
        status,
        links,
        interfaces,
    })
}

fn parse_interface(el: &Element, node_id: u32) -> Result<Interface> {
    let id = required_u32(el, "id")?;

    let ipv4 = match el.attr("ipv4") {
        Some(raw) => match raw.parse::<Ipv4Addr>() {
            Ok(addr) => Some(addr),
            Err(_) => {
                warn!("Invalid ipv4 '{}' on interface {} of node {}", raw, id, node_id);
                None
            }
        },
        None => None,
    };

    let mut links = Vec::new();
    for link_el in el.descendants("link") {
        match parse_link(link_el) {
            Some(link) => links.push(link),
            None => warn!("Skipping malformed link record on interface {} of node {}", id, node_id),
        }
    }

    Ok(Interface {
        id,
        node_id,
        ipv4,
        links,
    })
}

fn parse_link(el: &Element) -> Option<Link> {
    let linked_node_id = el.attr("linked_node_id")?.parse::<u32>().ok()?;
    let linked_interface_id = el.attr("linked_interface_id")?.parse::<u32>().ok()?;
    Some(Link {
        linked_node_id,
        linked_interface_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> NetworkMap {
        let cnml = r#"
            <cnml>
                <zone id="1" title="Coast" zone_nodes="2">
                    <node id="10" title="Hilltop" status="Working" links="3">
                        <device id="100">
                            <interface id="101" ipv4="172.16.0.1">
                                <link id="9000" linked_node_id="20" linked_interface_id="201"/>
                            </interface>
                        </device>
                    </node>
                    <node id="20" title="Harbour" status="Working" links="1">
                        <device id="200">
                            <interface id="201" ipv4="172.16.0.2">
                                <link id="9000" linked_node_id="10" linked_interface_id="101"/>
                            </interface>
                        </device>
                    </node>
                </zone>
                <zone id="2" title="Inland" zone_nodes="1">
                    <node id="30" status="Planned" links="0">
                        <device id="300">
                            <interface id="301" ipv4="10.1.0.1"/>
                        </device>
                    </node>
                </zone>
            </cnml>
        "#;
        NetworkMap::from_xml_str(cnml).unwrap()
    }

    #[test]
    fn test_find_node_and_interface() {
        let map = sample_map();

        let node = map.find_node(10).unwrap();
        assert_eq!(node.title.as_deref(), Some("Hilltop"));
        assert_eq!(node.links, 3);
        assert!(node.status.is_working());

        let iface = map.find_interface(node, 101).unwrap();
        assert_eq!(iface.ipv4, Some("172.16.0.1".parse().unwrap()));
        assert_eq!(iface.node_id, 10);

        assert!(map.find_node(99).is_none());
        assert!(map.find_interface(node, 999).is_none());
    }

    #[test]
    fn test_links_are_attached_to_interfaces() {
        let map = sample_map();
        let node = map.find_node(10).unwrap();
        let iface = &map.interfaces_of(node)[0];
        let links = map.outbound_links_of(iface);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].linked_node_id, 20);
        assert_eq!(links[0].linked_interface_id, 201);
    }

    #[test]
    fn test_all_nodes_in_document_order() {
        let map = sample_map();
        let ids: Vec<u32> = map.all_nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(map.node_count(), 3);
    }

    #[test]
    fn test_non_working_status_is_preserved() {
        let map = sample_map();
        let node = map.find_node(30).unwrap();
        assert_eq!(node.status, NodeStatus::Other("Planned".to_string()));
        assert!(!node.status.is_working());
    }

    #[test]
    fn test_zone_queries() {
        let map = sample_map();
        assert_eq!(map.zones().len(), 2);

        let big = map.zones_with_min_nodes(2);
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].title, "Coast");

        let small = map.zones_with_max_nodes(1);
        assert_eq!(small.len(), 1);
        assert_eq!(small[0].title, "Inland");

        assert_eq!(map.zone_title(1), Some("Coast"));
        assert_eq!(map.zone_title(7), None);

        let coast_nodes: Vec<u32> = map.nodes_of_zone(1).iter().map(|n| n.id).collect();
        assert_eq!(coast_nodes, vec![10, 20]);
        assert!(map.nodes_of_zone(7).is_empty());
    }

    #[test]
    fn test_collect_core_nodes() {
        let map = sample_map();
        let corenet: Ipv4Net = "172.16.0.0/12".parse().unwrap();
        assert_eq!(map.collect_core_nodes(corenet), vec![10, 20]);

        let elsewhere: Ipv4Net = "192.168.0.0/16".parse().unwrap();
        assert!(map.collect_core_nodes(elsewhere).is_empty());
    }

    #[test]
    fn test_invalid_ipv4_is_dropped() {
        let cnml = r#"
            <cnml>
                <node id="1" links="2">
                    <interface id="11" ipv4="not.an.address"/>
                </node>
            </cnml>
        "#;
        let map = NetworkMap::from_xml_str(cnml).unwrap();
        let node = map.find_node(1).unwrap();
        assert_eq!(node.interfaces[0].ipv4, None);
    }

    #[test]
    fn test_malformed_link_is_skipped() {
        let cnml = r#"
            <cnml>
                <node id="1" links="2">
                    <interface id="11" ipv4="172.16.0.9">
                        <link id="5" linked_node_id="2"/>
                        <link id="6" linked_node_id="3" linked_interface_id="31"/>
                    </interface>
                </node>
            </cnml>
        "#;
        let map = NetworkMap::from_xml_str(cnml).unwrap();
        let node = map.find_node(1).unwrap();
        assert_eq!(node.interfaces[0].links.len(), 1);
        assert_eq!(node.interfaces[0].links[0].linked_node_id, 3);
    }

    #[test]
    fn test_duplicate_node_id_keeps_first() {
        let cnml = r#"
            <cnml>
                <node id="1" title="first" links="2"/>
                <node id="1" title="second" links="5"/>
            </cnml>
        "#;
        let map = NetworkMap::from_xml_str(cnml).unwrap();
        assert_eq!(map.node_count(), 1);
        assert_eq!(map.find_node(1).unwrap().title.as_deref(), Some("first"));
    }

    #[test]
    fn test_missing_node_id_is_an_error() {
        let cnml = r#"<cnml><node status="Working"/></cnml>"#;
        assert!(NetworkMap::from_xml_str(cnml).is_err());
    }
}
