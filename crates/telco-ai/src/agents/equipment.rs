//! Buys rack equipment: terminations for services a network cannot offer
//! yet, more terminations as subscribers approach capacity, and backhaul
//! ahead of broadband demand. Racks are bought when equipment no longer fits.

use telco_core::company::Company;
use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::customer::Market;
use telco_core::error::PurchaseError;
use telco_core::fixed::{Fixed64, Ticks};
use telco_core::item::{Item, ItemCatalog, ItemKind};
use telco_core::service::{Service, ServiceSet};
use tracing::debug;

use super::{StagedPurchase, affordable, commit, unlocked};
use crate::agent::{Agent, Cooldown, PURCHASE_SCORE};

/// Load, in tenths, at which more capacity is bought.
const LOAD_THRESHOLD_TENTHS: u64 = 8;

pub struct EquipmentAgent {
    cooldown: Cooldown,
    staged: Option<StagedPurchase>,
}

impl EquipmentAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.fast_cooldown),
            staged: None,
        }
    }
}

fn loaded(used: u32, capacity: u32) -> bool {
    used as u64 * 10 >= capacity as u64 * LOAD_THRESHOLD_TENTHS
}

fn choose(
    company: &Company,
    catalog: &ItemCatalog,
    market: &Market,
    broadband_usage: u32,
) -> Option<StagedPurchase> {
    let priced = company.priced_services();
    let active: Vec<_> = company.networks().iter().filter(|n| n.active).collect();

    // Services a medium could carry but nothing terminates.
    for network in &active {
        let missing = network
            .cable_type
            .services()
            .difference(network.services)
            .intersection(priced);
        if missing.is_empty() {
            continue;
        }
        let best = unlocked(company, catalog, ItemKind::Termination)
            .filter(|t| t.supports_wiring(network.cable_type))
            .filter(|t| !t.services.intersection(missing).is_empty())
            .min_by(|a, b| {
                let covered = |t: &Item| t.services.intersection(missing).len();
                covered(b)
                    .cmp(&covered(a))
                    .then(b.subscribers.cmp(&a.subscribers))
                    .then(a.cost.cmp(&b.cost))
            });
        if let Some(staged) = best.and_then(|t| stage_mounted(company, catalog, t)) {
            return Some(staged);
        }
    }

    let offered = active.iter().fold(ServiceSet::EMPTY, |acc, n| acc.union(n.services));

    for service in offered.intersection(priced).iter() {
        let capacity = company.termination_capacity(catalog, service);
        let subscribers = market.subscriber_count(company.id(), service);
        if capacity == 0 || !loaded(subscribers, capacity) {
            continue;
        }
        let best = unlocked(company, catalog, ItemKind::Termination)
            .filter(|t| t.provides(service))
            .filter(|t| active.iter().any(|n| t.supports_wiring(n.cable_type)))
            .min_by(|a, b| b.subscribers.cmp(&a.subscribers).then(a.cost.cmp(&b.cost)));
        if let Some(staged) = best.and_then(|t| stage_mounted(company, catalog, t)) {
            return Some(staged);
        }
    }

    if offered.contains(Service::Broadband) {
        let demand = market
            .subscriber_count(company.id(), Service::Broadband)
            .saturating_mul(broadband_usage);
        if loaded(demand, company.backhaul_throughput(catalog)) {
            let best = unlocked(company, catalog, ItemKind::Backhaul)
                .min_by(|a, b| b.throughput.cmp(&a.throughput).then(a.cost.cmp(&b.cost)));
            if let Some(staged) = best.and_then(|b| stage_mounted(company, catalog, b)) {
                return Some(staged);
            }
        }
    }

    None
}

/// Stage a rack-mounted item, or the biggest rack when no rack has room.
fn stage_mounted(company: &Company, catalog: &ItemCatalog, item: &Item) -> Option<StagedPurchase> {
    match company.can_purchase(catalog, item.id, 1, None) {
        Ok(()) if company.money() > item.cost => Some(StagedPurchase { item: item.id, quantity: 1 }),
        Err(PurchaseError::InsufficientRackspace) => {
            let rack = unlocked(company, catalog, ItemKind::Rack)
                .min_by(|a, b| b.rack_space.cmp(&a.rack_space).then(a.cost.cmp(&b.cost)))?;
            if rack.rack_space < item.rack_space {
                debug!(company = company.id().0, item = %item.name, "no rack is big enough");
                return None;
            }
            affordable(company, catalog, rack.id, 1).then_some(StagedPurchase { item: rack.id, quantity: 1 })
        }
        _ => None,
    }
}

impl Agent for EquipmentAgent {
    fn name(&self) -> &'static str {
        "equipment"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.staged.is_some() {
            return PURCHASE_SCORE;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        let usage = ctx.config.company.broadband_usage;
        match choose(ctx.company, ctx.catalog, ctx.market, usage) {
            Some(staged) => {
                self.staged = Some(staged);
                PURCHASE_SCORE
            }
            None => {
                self.cooldown.reset(ctx.rng);
                Fixed64::ZERO
            }
        }
    }

    fn execute(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) -> bool {
        if let Some(staged) = self.staged.take() && commit(ctx, staged) {
            ctx.refresh();
        }
        self.cooldown.reset(ctx.rng);
        true
    }
}
