//! Customer market simulation.
//!
//! Each customer is a small state machine:
//!
//! ```text
//!  NoProvider ──select──▶ Pending ──truck arrives──▶ Subscribed ◀──call resolved── Outage
//!       ▲                   │                          │    └──────outage──────────▶ │
//!       └────── cancel ─────┴──────────────────────────┴─────────────────────────────┘
//! ```
//!
//! [`Market::update`] drifts dissatisfaction and rolls churn for every
//! customer in slot order, drawing from the game's single RNG. Moving into
//! `Subscribed` only happens through [`Market::service_truck_arrived`] and
//! [`Market::resolve_outage`], driven by company staff.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use telco_spatial::{MapService, TileKind, TilePosition};
use tracing::{debug, info};

use crate::company::Company;
use crate::config::MarketConfig;
use crate::event::Event;
use crate::fixed::{Fixed64, Ticks, checked_div_64, clamp_unit};
use crate::id::{CompanyId, CustomerId, ItemId};
use crate::item::{ItemCatalog, ItemKind};
use crate::rng::SimRng;
use crate::service::{Service, ServiceSet};
use crate::sim::StateHash;

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CustomerStatus {
    #[default]
    NoProvider,
    /// Signed up, waiting for a truck to install equipment.
    Pending,
    Subscribed,
    /// Subscribed but suffering an outage until a call is resolved.
    Outage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub home: TilePosition,
    /// Wealth in `[0, 1]`; the likelihood of signing up at all.
    pub income: Fixed64,
    /// Scales how quickly dissatisfaction builds and how readily it churns.
    pub patience: Fixed64,
    /// Always within `[0, 1]`.
    pub dissatisfaction: Fixed64,
    pub provider: Option<CompanyId>,
    pub status: CustomerStatus,
    /// Services signed up for.
    pub services: ServiceSet,
    /// CPE installed at the home, returned to the provider on leaving.
    pub installed: Vec<ItemId>,
    /// Ticks before a customer without provider looks again.
    pub cooldown: Ticks,
    pub invocations_since_change: u32,
    pub last_update: Option<Ticks>,
}

impl Customer {
    /// A provider is set exactly when the customer is not `NoProvider`, and
    /// dissatisfaction is in range.
    pub fn is_consistent(&self) -> bool {
        let provider_ok = (self.status == CustomerStatus::NoProvider) == self.provider.is_none();
        let range_ok = self.dissatisfaction >= Fixed64::ZERO && self.dissatisfaction <= Fixed64::ONE;
        provider_ok && range_ok
    }

    fn elapsed(&mut self, time: Ticks) -> Ticks {
        let dt = self.last_update.map_or(0, |last| time.saturating_sub(last));
        self.last_update = Some(time);
        dt
    }

    /// Linear ramp from 0 to 1 over `ramp_invocations` updates since the last change.
    fn ramp(&self, params: &MarketParams) -> Fixed64 {
        if params.ramp_invocations == 0 {
            return Fixed64::ONE;
        }
        let progress = Fixed64::from_num(self.invocations_since_change.min(params.ramp_invocations))
            / Fixed64::from_num(params.ramp_invocations);
        clamp_unit(progress)
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// [`MarketConfig`] converted to fixed point once per update.
struct MarketParams {
    churn_cooldown: Fixed64,
    cooldown_min_factor: Fixed64,
    subscribed_base_churn: Fixed64,
    outage_base_churn: Fixed64,
    outage_chance: Fixed64,
    churn_floor: Fixed64,
    ramp_invocations: u32,
    signup_factor: Fixed64,
    outage_drift: Fixed64,
    pending_drift: Fixed64,
    subscribed_relief: Fixed64,
    idle_relief: Fixed64,
}

impl From<&MarketConfig> for MarketParams {
    fn from(c: &MarketConfig) -> Self {
        let f = Fixed64::from_num::<f64>;
        Self {
            churn_cooldown: Fixed64::from_num(c.churn_cooldown),
            cooldown_min_factor: f(c.churn_cooldown_min_factor),
            subscribed_base_churn: f(c.subscribed_base_churn),
            outage_base_churn: f(c.outage_base_churn),
            outage_chance: f(c.outage_chance),
            churn_floor: f(c.churn_floor),
            ramp_invocations: c.ramp_invocations,
            signup_factor: f(c.signup_dissatisfaction_factor),
            outage_drift: f(c.outage_drift),
            pending_drift: f(c.pending_drift),
            subscribed_relief: f(c.subscribed_relief),
            idle_relief: f(c.idle_relief),
        }
    }
}

/// A company able to serve a customer's home.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    company: CompanyId,
    services: ServiceSet,
    weight: Fixed64,
}

enum Transition {
    Select {
        company: CompanyId,
        services: ServiceSet,
    },
    Cancel,
    Outage,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Market {
    customers: SlotMap<CustomerId, Customer>,
    events: Vec<Event>,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&mut self, home: TilePosition, income: Fixed64, patience: Fixed64) -> CustomerId {
        self.customers.insert_with_key(|id| Customer {
            id,
            home,
            income: clamp_unit(income),
            patience: patience.max(Fixed64::ZERO),
            dissatisfaction: Fixed64::ZERO,
            provider: None,
            status: CustomerStatus::NoProvider,
            services: ServiceSet::EMPTY,
            installed: Vec::new(),
            cooldown: 0,
            invocations_since_change: 0,
            last_update: None,
        })
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(id)
    }

    /// Direct access for scenario setup. The market assumes callers keep
    /// [`Customer::is_consistent`] true.
    pub fn customer_mut(&mut self, id: CustomerId) -> Option<&mut Customer> {
        self.customers.get_mut(id)
    }

    pub fn customers(&self) -> impl Iterator<Item = &Customer> + '_ {
        self.customers.values()
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn home_of(&self, id: CustomerId) -> Option<TilePosition> {
        self.customers.get(id).map(|c| c.home)
    }

    /// Customers of `company` using `service`, outages included.
    pub fn subscriber_count(&self, company: CompanyId, service: Service) -> u32 {
        self.customers
            .values()
            .filter(|c| c.provider == Some(company))
            .filter(|c| matches!(c.status, CustomerStatus::Subscribed | CustomerStatus::Outage))
            .filter(|c| c.services.contains(service))
            .count() as u32
    }

    /// Number of customers in each status.
    pub fn census(&self) -> BTreeMap<CustomerStatusKey, usize> {
        let mut out = BTreeMap::new();
        for c in self.customers.values() {
            *out.entry(CustomerStatusKey(c.status as u8)).or_insert(0) += 1;
        }
        out
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ===================================================================
    // Update
    // ===================================================================

    /// Run one market step at simulation time `time`.
    pub fn update(
        &mut self,
        time: Ticks,
        companies: &mut [Company],
        rng: &mut SimRng,
        config: &MarketConfig,
    ) {
        let params = MarketParams::from(config);
        for (id, customer) in self.customers.iter_mut() {
            let dt = customer.elapsed(time);
            drift(customer, dt, companies, &params);
            customer.invocations_since_change = customer.invocations_since_change.saturating_add(1);

            let candidates = candidates(customer.home, companies);
            if let Some(transition) = decide(customer, dt, &candidates, companies, rng, &params) {
                apply(id, customer, transition, companies, rng, &params, &mut self.events);
            }
            debug_assert!(customer.is_consistent());
        }
    }

    /// A truck from `company` reached `customer`. A pending customer becomes
    /// subscribed if the company has CPE covering its services in stock;
    /// otherwise the install is queued again. Returns whether it subscribed.
    pub fn service_truck_arrived(
        &mut self,
        customer: CustomerId,
        company: &mut Company,
        catalog: &ItemCatalog,
    ) -> bool {
        let Some(c) = self.customers.get_mut(customer) else {
            return false;
        };
        if c.status != CustomerStatus::Pending || c.provider != Some(company.id()) {
            return false;
        }

        let Some(devices) = choose_cpe(company, catalog, c.services) else {
            debug!(company = company.id().0, "no CPE in stock, install requeued");
            company.queue_install(customer);
            return false;
        };
        for (n, device) in devices.iter().enumerate() {
            if company.take_from_inventory(*device, 1).is_err() {
                company.return_to_inventory(&devices[..n]);
                company.queue_install(customer);
                return false;
            }
        }

        c.installed.extend(devices);
        c.status = CustomerStatus::Subscribed;
        company.on_customer_changed(customer, c.provider);
        self.events.push(changed(c));
        info!(company = company.id().0, "customer subscribed");
        true
    }

    /// The provider's call center fixed an outage. Returns whether the
    /// customer was in outage.
    pub fn resolve_outage(&mut self, customer: CustomerId) -> bool {
        let Some(c) = self.customers.get_mut(customer) else {
            return false;
        };
        if c.status != CustomerStatus::Outage {
            return false;
        }
        c.status = CustomerStatus::Subscribed;
        self.events.push(changed(c));
        true
    }

    /// Populate the map: customers live in buildings next to a road, or on
    /// any passable tile if the map has no such buildings. Returns how many
    /// were placed.
    pub fn seed_customers(&mut self, map: &dyn MapService, count: usize, rng: &mut SimRng) -> usize {
        let near_road = |p: TilePosition| {
            telco_spatial::Direction::all()
                .into_iter()
                .any(|d| map.tile(p.step(d, 1)).is_some_and(|t| t.is_road()))
        };
        let mut homes: Vec<TilePosition> = map
            .bounds()
            .tiles()
            .filter(|p| map.tile(*p) == Some(TileKind::Building) && near_road(*p))
            .collect();
        if homes.is_empty() {
            homes = map.bounds().tiles().filter(|p| map.is_passable(*p)).collect();
        }
        if homes.is_empty() {
            return 0;
        }

        let half = Fixed64::from_num(0.5);
        let one_and_half = Fixed64::from_num(1.5);
        for _ in 0..count {
            let Some(home) = rng.pick(&homes).copied() else {
                break;
            };
            let income = rng.next_fixed();
            let patience = rng.range_fixed(half, one_and_half);
            self.add_customer(home, income, patience);
        }
        count
    }

    pub(crate) fn hash_into(&self, hash: &mut StateHash) {
        for c in self.customers.values() {
            hash.write_u32(c.status as u32);
            hash.write_opt_u32(c.provider.map(|p| p.0));
            hash.write_fixed64(c.dissatisfaction);
            hash.write_u64(c.cooldown);
        }
    }
}

/// Sortable key for [`Market::census`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CustomerStatusKey(u8);

impl CustomerStatusKey {
    pub fn of(status: CustomerStatus) -> Self {
        Self(status as u8)
    }
}

fn changed(c: &Customer) -> Event {
    Event::CustomerChanged {
        customer: c.id,
        provider: c.provider,
        status: c.status,
    }
}

// ---------------------------------------------------------------------------
// FSM steps
// ---------------------------------------------------------------------------

fn drift(customer: &mut Customer, dt: Ticks, companies: &[Company], params: &MarketParams) {
    let dt = Fixed64::from_num(dt);
    let delta = match customer.status {
        CustomerStatus::Outage => params.outage_drift * customer.patience * dt,
        CustomerStatus::Pending => params.pending_drift * customer.patience * dt,
        CustomerStatus::Subscribed => {
            let satisfaction = customer
                .provider
                .and_then(|p| companies.get(p.index()))
                .map_or(Fixed64::ONE, |c| c.service_satisfaction);
            -(params.subscribed_relief * satisfaction * dt)
        }
        CustomerStatus::NoProvider => -(params.idle_relief * dt),
    };
    customer.dissatisfaction = clamp_unit(customer.dissatisfaction.saturating_add(delta));
}

fn candidates(home: TilePosition, companies: &[Company]) -> Vec<Candidate> {
    companies
        .iter()
        .filter_map(|company| {
            let services = company.offered_at(home);
            if services.is_empty() {
                return None;
            }
            let count = Fixed64::from_num(services.len());
            let total = company.bill(services);
            let weight = if total > Fixed64::ZERO {
                checked_div_64(count, total).unwrap_or(count)
            } else {
                count
            };
            Some(Candidate {
                company: company.id(),
                services,
                weight,
            })
        })
        .collect()
}

/// Weighted pick among the candidates other than `exclude`. `None` when no
/// other candidate is left, so the customer keeps its provider.
fn choose(candidates: &[Candidate], exclude: Option<CompanyId>, rng: &mut SimRng) -> Option<Transition> {
    let pool: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| Some(c.company) != exclude)
        .collect();
    let weights: Vec<Fixed64> = pool.iter().map(|c| c.weight).collect();
    rng.weighted_index(&weights)
        .and_then(|i| pool.get(i))
        .map(|c| Transition::Select {
            company: c.company,
            services: c.services,
        })
}

fn churn(customer: &Customer, companies: &[Company], params: &MarketParams) -> Fixed64 {
    let retention = customer
        .provider
        .and_then(|p| companies.get(p.index()))
        .map_or(Fixed64::ONE, |c| c.customer_retention);
    let base = customer.dissatisfaction.max(params.churn_floor) * customer.patience;
    checked_div_64(base, retention).unwrap_or(Fixed64::ONE)
}

fn decide(
    customer: &mut Customer,
    dt: Ticks,
    candidates: &[Candidate],
    companies: &[Company],
    rng: &mut SimRng,
    params: &MarketParams,
) -> Option<Transition> {
    let qualifies = |p: Option<CompanyId>| candidates.iter().any(|c| Some(c.company) == p);

    match customer.status {
        CustomerStatus::NoProvider => {
            if customer.cooldown > 0 {
                customer.cooldown = customer.cooldown.saturating_sub(dt);
                return None;
            }
            if candidates.is_empty() {
                return None;
            }
            let eagerness = Fixed64::ONE - params.signup_factor * customer.dissatisfaction;
            let chance = customer.income * eagerness.max(Fixed64::ZERO) * customer.ramp(params);
            rng.chance(chance).then(|| choose(candidates, None, rng)).flatten()
        }
        CustomerStatus::Subscribed => {
            if !qualifies(customer.provider) {
                return Some(Transition::Cancel);
            }
            if rng.chance(params.subscribed_base_churn)
                && rng.chance(churn(customer, companies, params))
                && let Some(switch) = choose(candidates, customer.provider, rng)
            {
                return Some(switch);
            }
            rng.chance(params.outage_chance).then_some(Transition::Outage)
        }
        CustomerStatus::Outage => {
            if !qualifies(customer.provider) {
                return Some(Transition::Cancel);
            }
            (rng.chance(params.outage_base_churn) && rng.chance(churn(customer, companies, params)))
                .then(|| choose(candidates, customer.provider, rng))
                .flatten()
        }
        CustomerStatus::Pending => {
            if !qualifies(customer.provider) {
                return Some(Transition::Cancel);
            }
            (rng.chance(customer.ramp(params)) && rng.chance(churn(customer, companies, params)))
                .then(|| choose(candidates, customer.provider, rng))
                .flatten()
        }
    }
}

fn apply(
    id: CustomerId,
    customer: &mut Customer,
    transition: Transition,
    companies: &mut [Company],
    rng: &mut SimRng,
    params: &MarketParams,
    events: &mut Vec<Event>,
) {
    match transition {
        Transition::Outage => {
            customer.status = CustomerStatus::Outage;
            if let Some(provider) = customer.provider.and_then(|p| companies.get_mut(p.index())) {
                provider.queue_call(id);
            }
        }
        Transition::Select { company, services } => {
            leave_provider(id, customer, companies, Some(company));
            customer.provider = Some(company);
            customer.status = CustomerStatus::Pending;
            customer.services = services;
            if let Some(new) = companies.get_mut(company.index()) {
                new.on_customer_changed(id, Some(company));
                new.queue_install(id);
            }
            debug!(company = company.0, "customer selected provider");
        }
        Transition::Cancel => {
            leave_provider(id, customer, companies, None);
            customer.provider = None;
            customer.status = CustomerStatus::NoProvider;
            customer.services = ServiceSet::EMPTY;
            let factor = rng.range_fixed(params.cooldown_min_factor, Fixed64::ONE);
            customer.cooldown = (params.churn_cooldown * factor).saturating_to_num::<Ticks>();
        }
    }
    events.push(changed(customer));
}

/// Provider change bookkeeping: hand equipment back, halve dissatisfaction,
/// restart the ramp.
fn leave_provider(
    id: CustomerId,
    customer: &mut Customer,
    companies: &mut [Company],
    next: Option<CompanyId>,
) {
    if let Some(old) = customer.provider.and_then(|p| companies.get_mut(p.index())) {
        old.return_to_inventory(&customer.installed);
        old.on_customer_changed(id, next);
    }
    customer.installed.clear();
    customer.dissatisfaction /= 2;
    customer.invocations_since_change = 0;
}

/// CPE from stock covering `services`, greedily preferring devices that
/// cover the most missing services, then the cheapest.
fn choose_cpe(company: &Company, catalog: &ItemCatalog, services: ServiceSet) -> Option<Vec<ItemId>> {
    let mut stock: Vec<(ItemId, u32)> = company
        .inventory()
        .iter()
        .filter(|(id, _)| catalog.get(*id).is_some_and(|i| i.kind == ItemKind::Cpe))
        .collect();
    let mut missing = services;
    let mut picks = Vec::new();

    while !missing.is_empty() {
        let best = stock
            .iter_mut()
            .filter(|(_, n)| *n > 0)
            .filter_map(|entry| {
                let item = catalog.get(entry.0)?;
                let covered = item.services.intersection(missing).len();
                (covered > 0).then_some((covered, item.cost, entry))
            })
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let (_, _, entry) = best?;
        entry.1 -= 1;
        picks.push(entry.0);
        if let Some(item) = catalog.get(entry.0) {
            missing = missing.difference(item.services);
        }
    }
    Some(picks)
}

// ===========================================================================
// Tests
// ===========================================================================
