//! The game session: owns the world and advances it step by step.

use telco_spatial::{MapService, Rect};
use telco_tech_tree::{TechEvent, TechTree};
use tracing::{debug, info, warn};

use crate::company::Company;
use crate::config::SimConfig;
use crate::controller::{CompanyController, ControlContext};
use crate::customer::{CustomerStatus, Market};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks, checked_div_64};
use crate::id::CompanyId;
use crate::item::ItemCatalog;
use crate::rng::SimRng;
use crate::service::Service;
use crate::sim::StateHash;

pub struct Game {
    tick: Ticks,
    config: SimConfig,
    map: Box<dyn MapService>,
    catalog: ItemCatalog,
    /// Definitions every new company's tree is copied from.
    tech: TechTree,
    companies: Vec<Company>,
    /// Parallel to `companies`.
    controllers: Vec<Option<Box<dyn CompanyController>>>,
    market: Market,
    rng: SimRng,
    events: EventBus,
    since_billing: Ticks,
    last_state_hash: u64,
}

impl Game {
    pub fn new(
        map: Box<dyn MapService>,
        catalog: ItemCatalog,
        tech: TechTree,
        config: SimConfig,
        seed: u64,
    ) -> Self {
        Self {
            tick: 0,
            config,
            map,
            catalog,
            tech,
            companies: Vec::new(),
            controllers: Vec::new(),
            market: Market::new(),
            rng: SimRng::new(seed),
            events: EventBus::default(),
            since_billing: 0,
            last_state_hash: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Found a company with starting money and a fresh tech tree.
    pub fn add_company(&mut self, name: &str, headquarters: Rect) -> CompanyId {
        let id = CompanyId(self.companies.len() as u32);
        self.companies.push(Company::new(
            id,
            name,
            headquarters,
            &self.config.company,
            self.tech.fresh_copy(),
        ));
        self.controllers.push(None);
        info!(company = id.0, name, "company founded");
        id
    }

    /// Hand control of a company to `controller`. Returns false for an
    /// unknown company.
    pub fn set_controller(&mut self, id: CompanyId, controller: Box<dyn CompanyController>) -> bool {
        match self.controllers.get_mut(id.index()) {
            Some(slot) => {
                debug!(company = id.0, controller = controller.name(), "controller attached");
                *slot = Some(controller);
                true
            }
            None => false,
        }
    }

    pub fn controller_name(&self, id: CompanyId) -> Option<&str> {
        self.controllers.get(id.index())?.as_deref().map(|c| c.name())
    }

    /// Populate the map with customers drawn from the game RNG.
    pub fn seed_customers(&mut self, count: usize) -> usize {
        self.market.seed_customers(&*self.map, count, &mut self.rng)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn map(&self) -> &dyn MapService {
        &*self.map
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn company(&self, id: CompanyId) -> Option<&Company> {
        self.companies.get(id.index())
    }

    pub fn company_mut(&mut self, id: CompanyId) -> Option<&mut Company> {
        self.companies.get_mut(id.index())
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn market_mut(&mut self) -> &mut Market {
        &mut self.market
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Hash of the state after the most recent step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    /// Advance the world by `dt` ticks (at least one).
    pub fn step(&mut self, dt: Ticks) {
        let dt = dt.max(1);
        self.phase_recompute();
        self.phase_market();
        self.phase_staff(dt);
        self.phase_economy(dt);
        self.phase_control(dt);
        self.phase_bookkeeping(dt);
    }

    /// Run `steps` steps of `dt` ticks each.
    pub fn run(&mut self, steps: u32, dt: Ticks) {
        for _ in 0..steps {
            self.step(dt);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 1: Recompute
    // -----------------------------------------------------------------------

    #[cfg(not(feature = "parallel"))]
    fn phase_recompute(&mut self) {
        for company in &mut self.companies {
            company.recalculate(&*self.map, &self.catalog);
        }
        self.flush_events();
    }

    /// Companies only touch their own caches, so they recompute in parallel.
    /// Events are flushed afterwards in company order.
    #[cfg(feature = "parallel")]
    fn phase_recompute(&mut self) {
        use rayon::prelude::*;

        let map = &*self.map;
        let catalog = &self.catalog;
        self.companies.par_iter_mut().for_each(|company| {
            company.recalculate(map, catalog);
        });
        self.flush_events();
    }

    // -----------------------------------------------------------------------
    // Phase 2: Market
    // -----------------------------------------------------------------------

    fn phase_market(&mut self) {
        self.market.update(
            self.tick,
            &mut self.companies,
            &mut self.rng,
            &self.config.market,
        );
        self.flush_events();
    }

    // -----------------------------------------------------------------------
    // Phase 3: Staff
    // -----------------------------------------------------------------------

    fn phase_staff(&mut self, dt: Ticks) {
        for company in &mut self.companies {
            let market = &self.market;
            let report = company.progress_staff(dt, |c| market.home_of(c));
            for customer in report.arrivals {
                self.market.service_truck_arrived(customer, company, &self.catalog);
            }
            for customer in report.resolved {
                self.market.resolve_outage(customer);
            }
        }
        self.flush_events();
    }

    // -----------------------------------------------------------------------
    // Phase 4: Economy
    // -----------------------------------------------------------------------

    fn phase_economy(&mut self, dt: Ticks) {
        let rules = &self.config.company;
        let interval = rules.billing_interval.max(1);
        self.since_billing += dt;
        let cycles = self.since_billing / interval;
        self.since_billing %= interval;

        let truck_wage = Fixed64::from_num(rules.truck_wage);
        let agent_wage = Fixed64::from_num(rules.call_agent_wage);
        let points = (rules.research_points_per_tick as u64 * dt).min(u32::MAX as u64) as u32;

        for company in &mut self.companies {
            let id = company.id();

            let demand = self.market.subscriber_count(id, Service::Broadband) as u64
                * rules.broadband_usage as u64;
            let throughput = company.backhaul_throughput(&self.catalog) as u64;
            let overloaded = demand > throughput;
            if overloaded != company.is_overloaded() {
                debug!(company = id.0, demand, throughput, overloaded, "backhaul load changed");
            }
            company.set_overloaded(overloaded);
            company.service_satisfaction = if overloaded {
                checked_div_64(Fixed64::from_num(throughput), Fixed64::from_num(demand))
                    .unwrap_or(Fixed64::ZERO)
            } else {
                Fixed64::ONE
            };

            if let Err(err) = company.tech_mut().contribute_points(points, self.tick) {
                warn!(company = id.0, %err, "research points rejected");
            }

            for _ in 0..cycles {
                let revenue = self
                    .market
                    .customers()
                    .filter(|c| c.provider == Some(id))
                    .filter(|c| matches!(c.status, CustomerStatus::Subscribed | CustomerStatus::Outage))
                    .fold(Fixed64::ZERO, |acc, c| acc.saturating_add(company.bill(c.services)));
                let wages = truck_wage * Fixed64::from_num(company.truck_count())
                    + agent_wage * Fixed64::from_num(company.call_agent_count());
                company.credit(revenue);
                company.debit(wages);
                info!(
                    company = id.0,
                    revenue = revenue.to_num::<f64>(),
                    wages = wages.to_num::<f64>(),
                    money = company.money().to_num::<f64>(),
                    "billing"
                );
            }
        }
        self.flush_events();
    }

    // -----------------------------------------------------------------------
    // Phase 5: Control
    // -----------------------------------------------------------------------

    fn phase_control(&mut self, dt: Ticks) {
        for idx in 0..self.companies.len() {
            let Some(mut controller) = self.controllers.get_mut(idx).and_then(Option::take) else {
                continue;
            };
            let (before, rest) = self.companies.split_at_mut(idx);
            if let Some((own, after)) = rest.split_first_mut() {
                own.recalculate(&*self.map, &self.catalog);
                let mut ctx = ControlContext {
                    company: own,
                    competitors: before.iter().chain(after.iter()).collect(),
                    market: &self.market,
                    map: &*self.map,
                    catalog: &self.catalog,
                    config: &self.config,
                    rng: &mut self.rng,
                    tick: self.tick,
                };
                controller.update(&mut ctx, dt);
            }
            self.controllers[idx] = Some(controller);
        }
        self.flush_events();
    }

    // -----------------------------------------------------------------------
    // Phase 6: Events and bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self, dt: Ticks) {
        self.events.deliver();
        self.tick += dt;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Move outboxes into the bus: per company its own events then its
    /// research events, then the market's.
    fn flush_events(&mut self) {
        for company in &mut self.companies {
            let id = company.id();
            self.events.emit_all(company.drain_events());
            let research = company.tech_mut().drain_events().into_iter().map(|e| match e {
                TechEvent::ResearchStarted { tech_id, .. } => Event::ResearchStarted {
                    company: id,
                    tech: tech_id,
                },
                TechEvent::ResearchCompleted { tech_id, .. } => {
                    info!(company = id.0, tech = tech_id.0, "research completed");
                    Event::ResearchCompleted {
                        company: id,
                        tech: tech_id,
                    }
                }
            });
            self.events.emit_all(research);
        }
        self.events.emit_all(self.market.drain_events());
    }

    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.tick);
        hasher.write_u64(self.rng.state());
        for company in &self.companies {
            company.hash_into(&mut hasher);
        }
        self.market.hash_into(&mut hasher);
        hasher.finish()
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("tick", &self.tick)
            .field("companies", &self.companies.len())
            .field("customers", &self.market.len())
            .finish_non_exhaustive()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::id::CustomerId;
    use crate::network::Status;
    use crate::service::ServiceSet;
    use crate::test_utils::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A game with one copper company serving x = 2, y = 2..=12, and no
    /// random churn or outages.
    fn calm_game(with_backhaul: bool) -> (Game, CompanyId, TestCatalog) {
        let mut config = SimConfig::default();
        config.market.subscribed_base_churn = 0.0;
        config.market.outage_chance = 0.0;
        let mut game = test_game_with(config, 11);
        let cat = TestCatalog::new();
        let id = game.add_company("Copper Co", hq_at(0, 0));
        let company = game.company_mut(id).unwrap();
        company.purchase(&cat.catalog, cat.rack, 1, None);
        company.purchase(&cat.catalog, cat.dslam, 1, None);
        if with_backhaul {
            company.purchase(&cat.catalog, cat.backhaul, 1, None);
        }
        company
            .place_cable(&cat.catalog, cat.copper_cable, straight(pos(2, 2), pos(2, 12)))
            .unwrap();
        (game, id, cat)
    }

    fn subscribe(game: &mut Game, company: CompanyId, services: ServiceSet) -> CustomerId {
        let customer = game.market_mut().add_customer(pos(3, 6), fixed(0.5), fixed(1.0));
        let c = game.market_mut().customer_mut(customer).unwrap();
        c.provider = Some(company);
        c.status = CustomerStatus::Subscribed;
        c.services = services;
        game.company_mut(company).unwrap().on_customer_changed(customer, Some(company));
        customer
    }

    #[test]
    fn step_advances_and_delivers_events() {
        let (mut game, _, _) = calm_game(true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        game.events_mut().on_passive(
            EventKind::CableAdded,
            Box::new(move |e| sink.borrow_mut().push(e.clone())),
        );
        game.step(1);
        assert_eq!(game.tick(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(game.events().pending_count(), 0);
        game.step(5);
        assert_eq!(game.tick(), 6);
    }

    #[test]
    fn billing_charges_subscribers_and_pays_wages() {
        let (mut game, id, _) = calm_game(true);
        subscribe(&mut game, id, ServiceSet::of(&[Service::Phone, Service::Broadband]));
        game.company_mut(id).unwrap().hire_call_agent().unwrap();
        let before = game.company(id).unwrap().money();

        game.run(99, 1);
        assert_eq!(game.company(id).unwrap().money(), before);
        game.step(1);
        // Phone 10 + broadband 30, minus one call agent at 25.
        assert_eq!(game.company(id).unwrap().money(), before + fixed(15.0));
    }

    #[test]
    fn broadband_without_backhaul_overloads() {
        let (mut game, id, _) = calm_game(false);
        subscribe(&mut game, id, ServiceSet::of(&[Service::Broadband]));
        game.step(1);
        let company = game.company(id).unwrap();
        assert!(company.is_overloaded());
        assert_eq!(company.service_satisfaction, Fixed64::ZERO);
        assert!(company.cables().values().all(|c| c.status == Status::Overloaded));
    }

    #[test]
    fn backhaul_relieves_overload() {
        let (mut game, id, _) = calm_game(true);
        subscribe(&mut game, id, ServiceSet::of(&[Service::Broadband]));
        game.step(1);
        let company = game.company(id).unwrap();
        assert!(!company.is_overloaded());
        assert_eq!(company.service_satisfaction, Fixed64::ONE);
        assert!(company.cables().values().all(|c| c.status == Status::Active));
    }

    #[test]
    fn research_progresses_each_tick() {
        let (mut game, id, _) = calm_game(true);
        game.company_mut(id).unwrap().start_research(DOCSIS, 0).unwrap();
        game.run(99, 1);
        assert!(!game.company(id).unwrap().tech().is_completed(DOCSIS));
        game.step(1);
        assert!(game.company(id).unwrap().tech().is_completed(DOCSIS));
        assert_eq!(game.events().total_emitted(EventKind::ResearchStarted), 1);
        assert_eq!(game.events().total_emitted(EventKind::ResearchCompleted), 1);
    }

    struct Recorder {
        calls: Rc<RefCell<Vec<(CompanyId, usize)>>>,
    }

    impl CompanyController for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn update(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) {
            self.calls
                .borrow_mut()
                .push((ctx.company.id(), ctx.competitors.len()));
        }
    }

    #[test]
    fn controllers_see_own_company_and_competitors() {
        let mut game = test_game(1);
        let a = game.add_company("A", hq_at(0, 0));
        let b = game.add_company("B", hq_at(10, 10));
        game.add_company("C", hq_at(20, 0));
        let calls = Rc::new(RefCell::new(Vec::new()));
        assert!(game.set_controller(a, Box::new(Recorder { calls: Rc::clone(&calls) })));
        assert!(game.set_controller(b, Box::new(Recorder { calls: Rc::clone(&calls) })));
        assert!(!game.set_controller(CompanyId(9), Box::new(Recorder { calls: Rc::clone(&calls) })));
        assert_eq!(game.controller_name(a), Some("recorder"));
        assert_eq!(game.controller_name(CompanyId(2)), None);

        game.run(2, 1);
        assert_eq!(*calls.borrow(), vec![(a, 2), (b, 2), (a, 2), (b, 2)]);
    }

    #[test]
    fn same_seed_same_history() {
        let play = |seed: u64| {
            let mut game = test_game(seed);
            game.add_company("A", hq_at(0, 0));
            game.seed_customers(40);
            game.run(50, 1);
            game.state_hash()
        };
        assert_eq!(play(5), play(5));
        assert_ne!(play(5), play(6));
    }
}
