//! Error taxonomy for company operations.

use crate::id::ItemId;

/// Why a purchase cannot go ahead. A successful check is `Ok(())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("insufficient money")]
    InsufficientMoney,
    #[error("insufficient rack space")]
    InsufficientRackspace,
    #[error("insufficient inventory")]
    InsufficientInventory,
    #[error("maximum number of racks reached")]
    MaximumRacks,
}

/// Errors from placing or removing cables and nodes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("item {0:?} is not in the catalog")]
    UnknownItem(ItemId),
    #[error("item {0:?} cannot be placed as {1}")]
    WrongKind(ItemId, &'static str),
    #[error("cable positions must be 4-adjacent")]
    NonContiguous,
    #[error("no such cable")]
    UnknownCable,
    #[error("no such node")]
    UnknownNode,
    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

/// Errors from building the item catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate item name: {0}")]
    DuplicateName(String),
    #[error("item {0} must declare exactly one cable type")]
    MissingCableType(String),
}
