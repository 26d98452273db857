use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a cable owned by a company.
    pub struct CableId;

    /// Identifies a node owned by a company.
    pub struct NodeId;

    /// Identifies a service truck owned by a company.
    pub struct TruckId;

    /// Identifies a customer in the market.
    pub struct CustomerId;
}

/// Identifies a company. Index into the game's company list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub u32);

impl CompanyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies an item in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// A cable or a node: anything that carries a network status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfrastructureId {
    Cable(CableId),
    Node(NodeId),
}
