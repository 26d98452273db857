//! Telco AI -- computer-controlled companies.
//!
//! An [`executor::Executor`] drives one company through a fixed lineup of
//! [`agent::Agent`]s. Each agent watches one concern (stock, rack equipment,
//! staff, research, nodes, cables), paces itself with a randomized
//! [`agent::Cooldown`], and bids for the executor's single slot with a
//! score. Only the winner acts until its job is done.
//!
//! Everything an agent decides goes through the same [`Company`] operations
//! a human player would use, and all randomness comes from the game RNG
//! handed over in the [`ControlContext`], so AI games replay exactly.
//!
//! [`Company`]: telco_core::company::Company
//! [`ControlContext`]: telco_core::controller::ControlContext

pub mod agent;
pub mod agents;
pub mod executor;

#[cfg(test)]
mod testing;

pub use agent::{Agent, Cooldown};
pub use executor::Executor;
