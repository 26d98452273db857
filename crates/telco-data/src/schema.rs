//! On-disk shapes of the content files.
//!
//! Items and technologies refer to each other by name; the loader resolves
//! names into ids. TOML files wrap their list in a top-level key.

use serde::Deserialize;
use telco_core::item::ItemKind;
use telco_core::service::{CableType, Service};

// ===========================================================================
// Items
// ===========================================================================

/// An item definition. Fields that do not apply to the kind may be left out.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    pub kind: ItemKind,
    pub cost: f64,
    #[serde(default)]
    pub rack_space: u32,
    #[serde(default)]
    pub range: u32,
    #[serde(default)]
    pub subscribers: u32,
    #[serde(default)]
    pub throughput: u32,
    /// Name of the technology that unlocks the item.
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default)]
    pub wiring: Vec<CableType>,
    #[serde(default)]
    pub services: Vec<Service>,
}

// ===========================================================================
// Technologies
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyData {
    pub name: String,
    /// Research points needed.
    pub cost: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlTechnologies {
    pub technologies: Vec<TechnologyData>,
}
