//! Cables, nodes and the networks they form.
//!
//! A network is the maximal group of same-medium cables and nodes that touch
//! each other on the grid. Networks are derived data: [`calculate_networks`]
//! rebuilds them from scratch whenever a company's placement changes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use telco_spatial::{MapService, TilePosition};

use crate::id::{CableId, ItemId, NodeId};
use crate::service::{CableType, ServiceSet};

/// Tiles reached by a company and the services available on each.
pub type ServiceArea = BTreeMap<TilePosition, ServiceSet>;

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

/// Derived operating state of a cable or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    Active,
    #[default]
    Disconnected,
    /// Active, but broadband demand exceeds backhaul throughput.
    Overloaded,
}

/// A cable laid along a path of tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cable {
    pub id: CableId,
    pub cable_type: CableType,
    pub item: ItemId,
    /// Path in laying order.
    pub positions: Vec<TilePosition>,
    pub status: Status,
}

impl Cable {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, pos: TilePosition) -> bool {
        self.positions.contains(&pos)
    }
}

/// A broadcast node at a single tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub cable_type: CableType,
    pub item: ItemId,
    pub position: TilePosition,
    pub range: u32,
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// A connected group of same-medium cables and nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Index in the list returned by [`calculate_networks`].
    pub id: usize,
    pub cable_type: CableType,
    pub cables: Vec<CableId>,
    pub nodes: Vec<NodeId>,
    /// Every tile occupied by a member.
    pub footprint: BTreeSet<TilePosition>,
    /// Connected to a headquarters connector.
    pub active: bool,
    /// Services offered: what the medium carries and the company terminates.
    pub services: ServiceSet,
}

impl Network {
    fn seed(id: usize, cable_type: CableType) -> Self {
        Self {
            id,
            cable_type,
            cables: Vec::new(),
            nodes: Vec::new(),
            footprint: BTreeSet::new(),
            active: false,
            services: cable_type.services(),
        }
    }

    fn touches(&self, positions: &[TilePosition]) -> bool {
        positions.iter().any(|p| self.footprint.contains(p))
    }
}

/// Partition cables and nodes into networks.
///
/// Nodes seed networks first, in slot order; each network absorbs touching
/// same-medium cables and nodes until a full pass adds nothing. Cables left
/// over seed networks of their own. A network is active iff its footprint
/// contains one of `connectors`.
pub fn calculate_networks(
    cables: &SlotMap<CableId, Cable>,
    nodes: &SlotMap<NodeId, Node>,
    connectors: &[TilePosition],
) -> Vec<Network> {
    let mut cable_taken: BTreeSet<CableId> = BTreeSet::new();
    let mut node_taken: BTreeSet<NodeId> = BTreeSet::new();
    let mut networks = Vec::new();

    for (node_id, node) in nodes {
        if node_taken.contains(&node_id) {
            continue;
        }
        let mut network = Network::seed(networks.len(), node.cable_type);
        network.nodes.push(node_id);
        network.footprint.insert(node.position);
        node_taken.insert(node_id);
        grow(&mut network, cables, nodes, &mut cable_taken, &mut node_taken);
        networks.push(network);
    }

    for (cable_id, cable) in cables {
        if cable_taken.contains(&cable_id) {
            continue;
        }
        let mut network = Network::seed(networks.len(), cable.cable_type);
        network.cables.push(cable_id);
        network.footprint.extend(cable.positions.iter().copied());
        cable_taken.insert(cable_id);
        grow(&mut network, cables, nodes, &mut cable_taken, &mut node_taken);
        networks.push(network);
    }

    for network in &mut networks {
        network.active = network.touches(connectors);
    }
    networks
}

/// Fixed-point absorption of touching members.
fn grow(
    network: &mut Network,
    cables: &SlotMap<CableId, Cable>,
    nodes: &SlotMap<NodeId, Node>,
    cable_taken: &mut BTreeSet<CableId>,
    node_taken: &mut BTreeSet<NodeId>,
) {
    loop {
        let mut changed = false;

        for (cable_id, cable) in cables {
            if cable.cable_type != network.cable_type
                || cable_taken.contains(&cable_id)
                || !network.touches(&cable.positions)
            {
                continue;
            }
            network.cables.push(cable_id);
            network.footprint.extend(cable.positions.iter().copied());
            cable_taken.insert(cable_id);
            changed = true;
        }

        for (node_id, node) in nodes {
            if node.cable_type != network.cable_type
                || node_taken.contains(&node_id)
                || !network.footprint.contains(&node.position)
            {
                continue;
            }
            network.nodes.push(node_id);
            network.footprint.insert(node.position);
            node_taken.insert(node_id);
            changed = true;
        }

        if !changed {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Tiles covered by the given networks: a disc of the node's range around
/// every node and a disc of `cable_radius` around every cable tile.
pub fn coverage<'a>(
    networks: impl IntoIterator<Item = &'a Network>,
    cables: &SlotMap<CableId, Cable>,
    nodes: &SlotMap<NodeId, Node>,
    map: &dyn MapService,
    cable_radius: u32,
) -> ServiceArea {
    let mut area = ServiceArea::new();
    for network in networks {
        let mut cover = |tile: TilePosition| {
            let entry = area.entry(tile).or_default();
            *entry = entry.union(network.services);
        };
        for node in network.nodes.iter().filter_map(|id| nodes.get(*id)) {
            for tile in map.area(node.position, node.range) {
                cover(tile);
            }
        }
        for cable in network.cables.iter().filter_map(|id| cables.get(*id)) {
            for pos in &cable.positions {
                for tile in map.area(*pos, cable_radius) {
                    cover(tile);
                }
            }
        }
    }
    area
}
