//! The seven standard agents and the helpers they share.

mod boilerplate;
mod cable_placement;
mod cpe;
mod equipment;
mod node_placement;
mod personnel;
mod technology;

pub use boilerplate::BoilerplateAgent;
pub use cable_placement::{CablePlacementAgent, area_potential_score};
pub use cpe::CpeAgent;
pub use equipment::EquipmentAgent;
pub use node_placement::NodePlacementAgent;
pub use personnel::PersonnelAgent;
pub use technology::TechnologyAgent;

use telco_core::company::Company;
use telco_core::controller::ControlContext;
use telco_core::fixed::Fixed64;
use telco_core::id::ItemId;
use telco_core::item::{Item, ItemCatalog, ItemKind};
use tracing::debug;

/// A purchase decided during scoring, committed on execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedPurchase {
    pub item: ItemId,
    pub quantity: u32,
}

/// Catalog items of a kind the company has the technology for.
pub(crate) fn unlocked<'a>(
    company: &'a Company,
    catalog: &'a ItemCatalog,
    kind: ItemKind,
) -> impl Iterator<Item = &'a Item> + 'a {
    catalog.of_kind(kind).filter(move |item| company.is_unlocked(item))
}

/// Purchase passes validation and leaves money over.
pub(crate) fn affordable(company: &Company, catalog: &ItemCatalog, item: ItemId, quantity: u32) -> bool {
    let Some(def) = catalog.get(item) else {
        return false;
    };
    company.money() > def.cost.saturating_mul(Fixed64::from_num(quantity))
        && company.can_purchase(catalog, item, quantity, None).is_ok()
}

/// Buy a staged purchase if it is still valid.
pub(crate) fn commit(ctx: &mut ControlContext<'_>, staged: StagedPurchase) -> bool {
    if ctx
        .company
        .can_purchase(ctx.catalog, staged.item, staged.quantity, None)
        .is_err()
    {
        debug!(company = ctx.company.id().0, item = staged.item.0, "staged purchase no longer valid");
        return false;
    }
    ctx.company.purchase(ctx.catalog, staged.item, staged.quantity, None);
    true
}
