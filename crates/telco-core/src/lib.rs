//! Telco Core -- the simulation of competing telecom companies.
//!
//! Companies lay cables and nodes on a city grid, buy rack equipment and
//! customer-premises devices, and compete for customers whose homes fall
//! inside their service areas. Everything is deterministic: fixed-point
//! arithmetic, ordered collections and a single seeded RNG per game.
//!
//! # Step Pipeline
//!
//! Each call to [`game::Game::step`] runs these phases in order:
//!
//! 1. **Recompute** -- Every company rebuilds dirty network and coverage
//!    caches. A barrier: later phases only read finished caches.
//! 2. **Market** -- Customers drift, churn and pick providers.
//! 3. **Staff** -- Trucks and call-center agents work their queues; finished
//!    installs and resolved outages go back to the market.
//! 4. **Economy** -- Backhaul overload, research points, and every billing
//!    interval revenue and wages.
//! 5. **Control** -- Each company's [`controller::CompanyController`] runs
//!    with its own company mutable and its competitors read-only.
//! 6. **Bookkeeping** -- Buffered events are delivered, the tick advances
//!    and the state hash is computed.
//!
//! # Key Types
//!
//! - [`company::Company`] -- Infrastructure, equipment, staff and money of
//!   one company, with its derived networks and service area.
//! - [`network::calculate_networks`] -- Partition of cables and nodes into
//!   same-medium connected networks.
//! - [`customer::Market`] -- Customer state machines.
//! - [`event::EventBus`] -- Ordered event queue with per-kind listeners.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod company;
pub mod config;
pub mod controller;
pub mod customer;
pub mod error;
pub mod event;
pub mod fixed;
pub mod game;
pub mod id;
pub mod item;
pub mod network;
pub mod rng;
pub mod service;
pub mod sim;
pub mod staff;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use telco_spatial;
pub use telco_tech_tree;
