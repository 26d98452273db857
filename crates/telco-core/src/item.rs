//! Item catalog, flat inventory and equipment racks.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use telco_tech_tree::TechId;

use crate::error::{CatalogError, PurchaseError};
use crate::fixed::Fixed64;
use crate::id::ItemId;
use crate::service::{CableType, Service, ServiceSet};

// ---------------------------------------------------------------------------
// Item definitions
// ---------------------------------------------------------------------------

/// What an item is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Laid on the map; cost is per tile.
    Cable,
    /// Placed on the map; broadcasts service within `range`.
    Node,
    /// Customer premises equipment, kept in the flat inventory.
    Cpe,
    /// Rack-mounted headend that terminates `services` for `subscribers`.
    Termination,
    /// Rack-mounted uplink providing `throughput` for broadband.
    Backhaul,
    /// Rack-mounted cooling.
    Fan,
    /// An equipment rack. `rack_space` is the space it provides.
    Rack,
}

impl ItemKind {
    /// Items that occupy rack space when bought.
    pub fn is_rack_mounted(self) -> bool {
        matches!(self, ItemKind::Termination | ItemKind::Backhaul | ItemKind::Fan)
    }
}

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    pub cost: Fixed64,
    /// Space used in a rack, or for [`ItemKind::Rack`] the space provided.
    pub rack_space: u32,
    /// Broadcast radius of a node.
    pub range: u32,
    /// Subscribers a termination can serve.
    pub subscribers: u32,
    /// Broadband throughput of a backhaul.
    pub throughput: u32,
    /// Technology that must be researched before the item can be bought.
    pub technology: Option<TechId>,
    /// Cable media the item works with. Cables and nodes have exactly one.
    pub wiring: Vec<CableType>,
    /// Services provided by CPE and terminations.
    pub services: ServiceSet,
}

impl Item {
    /// A blank item of the given kind; fill in the fields that matter.
    pub fn new(name: &str, kind: ItemKind, cost: Fixed64) -> Self {
        Self {
            id: ItemId(0),
            name: name.to_string(),
            kind,
            cost,
            rack_space: 0,
            range: 0,
            subscribers: 0,
            throughput: 0,
            technology: None,
            wiring: Vec::new(),
            services: ServiceSet::EMPTY,
        }
    }

    /// The medium of a cable or node item.
    pub fn cable_type(&self) -> Option<CableType> {
        self.wiring.first().copied()
    }

    pub fn supports_wiring(&self, cable_type: CableType) -> bool {
        self.wiring.contains(&cable_type)
    }

    pub fn provides(&self, service: Service) -> bool {
        self.services.contains(service)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// All purchasable items. Built once at game setup, then read-only.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<Item>,
    by_name: HashMap<String, ItemId>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and assign its id.
    pub fn register(&mut self, mut item: Item) -> Result<ItemId, CatalogError> {
        if self.by_name.contains_key(&item.name) {
            return Err(CatalogError::DuplicateName(item.name));
        }
        if matches!(item.kind, ItemKind::Cable | ItemKind::Node) && item.wiring.len() != 1 {
            return Err(CatalogError::MissingCableType(item.name));
        }
        let id = ItemId(self.items.len() as u32);
        item.id = id;
        self.by_name.insert(item.name.clone(), id);
        self.items.push(item);
        Ok(id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&Item> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Flat item counts (CPE and other loose stock).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    counts: BTreeMap<ItemId, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: ItemId, quantity: u32) {
        if quantity > 0 {
            *self.counts.entry(item).or_insert(0) += quantity;
        }
    }

    /// Remove exactly `quantity`, or nothing.
    pub fn remove(&mut self, item: ItemId, quantity: u32) -> Result<(), PurchaseError> {
        let current = self.count(item);
        if current < quantity {
            return Err(PurchaseError::InsufficientInventory);
        }
        if current == quantity {
            self.counts.remove(&item);
        } else {
            self.counts.insert(item, current - quantity);
        }
        Ok(())
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.counts.get(&item).copied().unwrap_or(0)
    }

    /// Non-zero stock in item id order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.counts.iter().map(|(id, n)| (*id, *n))
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Racks
// ---------------------------------------------------------------------------

/// An equipment rack holding rack-mounted items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rack {
    pub capacity: u32,
    pub items: Vec<ItemId>,
}

impl Rack {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    pub fn used_space(&self, catalog: &ItemCatalog) -> u32 {
        self.items
            .iter()
            .filter_map(|id| catalog.get(*id))
            .map(|item| item.rack_space)
            .sum()
    }

    pub fn free_space(&self, catalog: &ItemCatalog) -> u32 {
        self.capacity.saturating_sub(self.used_space(catalog))
    }
}
