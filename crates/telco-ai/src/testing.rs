//! A hand-assembled control context for agent unit tests.

use telco_core::company::Company;
use telco_core::config::SimConfig;
use telco_core::controller::ControlContext;
use telco_core::customer::{CustomerStatus, Market};
use telco_core::fixed::Ticks;
use telco_core::id::{CompanyId, CustomerId, NodeId};
use telco_core::service::ServiceSet;
use telco_core::rng::SimRng;
use telco_core::test_utils::*;
use telco_spatial::TileMap;

pub struct World {
    pub map: TileMap,
    pub cat: TestCatalog,
    pub config: SimConfig,
    pub market: Market,
    pub rng: SimRng,
    pub company: Company,
    pub competitors: Vec<Company>,
    pub tick: Ticks,
}

impl World {
    /// A 24x24 road grid (roads every 4 tiles) with one company whose
    /// headquarters covers (0,0)-(2,2).
    pub fn new() -> Self {
        let cat = TestCatalog::new();
        let company = test_company_with_tech(CompanyId(0), hq_at(0, 0), &cat);
        Self {
            map: TileMap::with_road_grid(24, 24, 4),
            cat,
            config: SimConfig::default(),
            market: Market::new(),
            rng: SimRng::new(17),
            company,
            competitors: Vec::new(),
            tick: 0,
        }
    }

    pub fn ctx(&mut self) -> ControlContext<'_> {
        ControlContext {
            company: &mut self.company,
            competitors: self.competitors.iter().collect(),
            market: &self.market,
            map: &self.map,
            catalog: &self.cat.catalog,
            config: &self.config,
            rng: &mut self.rng,
            tick: self.tick,
        }
    }

    pub fn recalculate(&mut self) {
        self.company.recalculate(&self.map, &self.cat.catalog);
        for competitor in &mut self.competitors {
            competitor.recalculate(&self.map, &self.cat.catalog);
        }
    }

    /// Copper equipment plus an active cable down the x = 0 road.
    pub fn copper_network(&mut self) {
        equip_copper(&mut self.company, &self.cat);
        self.company
            .place_cable(&self.cat.catalog, self.cat.copper_cable, straight(pos(0, 0), pos(0, 12)))
            .unwrap();
        self.recalculate();
    }

    /// An active copper cable with no equipment bought.
    pub fn bare_copper_network(&mut self) {
        self.company
            .place_cable(&self.cat.catalog, self.cat.copper_cable, straight(pos(0, 0), pos(0, 12)))
            .unwrap();
        self.recalculate();
    }

    pub fn add_node(&mut self, x: i32, y: i32) -> NodeId {
        let node = self
            .company
            .place_node(&self.cat.catalog, self.cat.copper_node, pos(x, y))
            .unwrap();
        self.recalculate();
        node
    }

    /// Add `n` customers at `(x, y)` subscribed to the own company.
    pub fn subscribe(&mut self, n: usize, x: i32, y: i32, services: ServiceSet) -> Vec<CustomerId> {
        let company = self.company.id();
        (0..n)
            .map(|_| {
                let id = self.market.add_customer(pos(x, y), fixed(0.5), fixed(1.0));
                if let Some(c) = self.market.customer_mut(id) {
                    c.provider = Some(company);
                    c.status = CustomerStatus::Subscribed;
                    c.services = services;
                }
                id
            })
            .collect()
    }

    /// Add a customer without a provider.
    pub fn prospect(&mut self, x: i32, y: i32, income: f64) -> CustomerId {
        self.market.add_customer(pos(x, y), fixed(income), fixed(1.0))
    }
}
