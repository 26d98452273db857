//! Keeps customer-premises equipment in stock for every service that active
//! networks sell.

use telco_core::company::Company;
use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks};
use telco_core::item::{Item, ItemCatalog, ItemKind};
use telco_core::service::{CableType, ServiceSet};

use super::{StagedPurchase, affordable, commit, unlocked};
use crate::agent::{Agent, Cooldown, PURCHASE_SCORE};

pub struct CpeAgent {
    cooldown: Cooldown,
    reserve: u32,
    staged: Option<StagedPurchase>,
}

impl CpeAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.fast_cooldown),
            reserve: config.cpe_reserve,
            staged: None,
        }
    }

    fn choose(&self, company: &Company, catalog: &ItemCatalog) -> Option<StagedPurchase> {
        let priced = company.priced_services();
        for network in company.networks().iter().filter(|n| n.active) {
            for service in network.services.intersection(priced).iter() {
                let have: u32 = company
                    .inventory()
                    .iter()
                    .filter(|(id, _)| catalog.get(*id).is_some_and(|i| i.provides(service)))
                    .map(|(_, count)| count)
                    .sum();
                if have >= self.reserve {
                    continue;
                }
                let Some(device) = best_device(company, catalog, network.cable_type, network.services, service)
                else {
                    continue;
                };
                let staged = StagedPurchase {
                    item: device.id,
                    quantity: self.reserve - have,
                };
                if affordable(company, catalog, staged.item, staged.quantity) {
                    return Some(staged);
                }
            }
        }
        None
    }
}

/// Unlocked device for `service` that fits the medium, preferring the one
/// sharing most services with the network, then the cheaper one.
fn best_device<'a>(
    company: &'a Company,
    catalog: &'a ItemCatalog,
    cable_type: CableType,
    offered: ServiceSet,
    service: telco_core::service::Service,
) -> Option<&'a Item> {
    unlocked(company, catalog, ItemKind::Cpe)
        .filter(|item| item.provides(service))
        .filter(|item| item.wiring.is_empty() || item.supports_wiring(cable_type))
        .min_by(|a, b| {
            let shared = |i: &Item| i.services.intersection(offered).len();
            shared(b)
                .cmp(&shared(a))
                .then(a.cost.cmp(&b.cost))
                .then(a.id.cmp(&b.id))
        })
}

impl Agent for CpeAgent {
    fn name(&self) -> &'static str {
        "cpe"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.staged.is_some() {
            return PURCHASE_SCORE;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        match self.choose(ctx.company, ctx.catalog) {
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
        if let Some(staged) = self.staged.take() {
            commit(ctx, staged);
        }
        self.cooldown.reset(ctx.rng);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::World;

    #[test]
    fn idle_without_active_network() {
        let mut world = World::new();
        let mut agent = CpeAgent::new(&world.config.ai);
        assert_eq!(agent.score(&mut world.ctx(), 1), Fixed64::ZERO);
        assert!(!agent.cooldown.is_ready());
    }

    #[test]
    fn stocks_modems_up_to_the_reserve() {
        let mut world = World::new();
        world.copper_network();
        let mut agent = CpeAgent::new(&world.config.ai);

        assert_eq!(agent.score(&mut world.ctx(), 1), PURCHASE_SCORE);
        assert_eq!(
            agent.staged,
            Some(StagedPurchase {
                item: world.cat.dsl_modem,
                quantity: 2
            })
        );
        assert!(agent.execute(&mut world.ctx(), 1));
        assert_eq!(world.company.inventory().count(world.cat.dsl_modem), 2);

        // Phone and broadband both have two devices now.
        agent.cooldown = Cooldown::new(100);
        assert_eq!(agent.score(&mut world.ctx(), 1), Fixed64::ZERO);
    }

    #[test]
    fn tops_up_partial_stock() {
        let mut world = World::new();
        world.copper_network();
        world.company.purchase(&world.cat.catalog, world.cat.dsl_modem, 1, None);
        let mut agent = CpeAgent::new(&world.config.ai);
        agent.score(&mut world.ctx(), 1);
        assert_eq!(agent.staged.map(|s| s.quantity), Some(1));
    }

    #[test]
    fn locked_devices_are_ignored() {
        let cat = World::new().cat;
        let company = telco_core::test_utils::test_company_with_tech(
            telco_core::id::CompanyId(0),
            telco_core::test_utils::hq_at(0, 0),
            &cat,
        );
        let device = best_device(
            &company,
            &cat.catalog,
            CableType::Coaxial,
            ServiceSet::ALL,
            telco_core::service::Service::Broadband,
        );
        // The cable modem needs DOCSIS; the DSL modem is the fallback.
        assert_eq!(device.map(|d| d.id), Some(cat.dsl_modem));
    }

    #[test]
    fn broke_company_stages_nothing() {
        let mut world = World::new();
        world.copper_network();
        world.company.set_money(Fixed64::from_num(10));
        let mut agent = CpeAgent::new(&world.config.ai);
        assert_eq!(agent.score(&mut world.ctx(), 1), Fixed64::ZERO);
        assert!(agent.staged.is_none());
    }
}
