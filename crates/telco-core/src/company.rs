//! The company aggregate: money, equipment, placed infrastructure, staff and
//! the cached network view derived from them.
//!
//! # Cache contract
//!
//! Every placement mutator marks the network caches dirty before returning.
//! [`Company::recalculate`] rebuilds networks, statuses and service areas in
//! one go; until then the accessors return the previous (stale) values.
//!
//! # Purchases
//!
//! [`Company::can_purchase`] is the only validation. [`Company::purchase`]
//! trusts its caller and panics on a purchase that fails the check.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use slotmap::SlotMap;
use telco_spatial::{MapService, Rect, TilePosition};
use telco_tech_tree::{TechId, TechTree, TechTreeError};
use tracing::{debug, info};

use crate::config::CompanyConfig;
use crate::error::{PlacementError, PurchaseError};
use crate::event::Event;
use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use crate::item::{Inventory, Item, ItemCatalog, ItemKind, Rack};
use crate::network::{Cable, Network, Node, ServiceArea, Status, calculate_networks, coverage};
use crate::service::{CableType, Service, ServiceSet};
use crate::sim::StateHash;
use crate::staff::{CallAgent, CallCenter, Job, StaffReport, Truck};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// The slice of [`CompanyConfig`] a company consults on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRules {
    pub max_racks: u32,
    pub cable_service_radius: u32,
    pub truck_cost: Fixed64,
    pub call_agent_cost: Fixed64,
    pub truck_base_ticks: Ticks,
    pub truck_ticks_per_tile: Ticks,
    pub call_duration: Ticks,
}

impl From<&CompanyConfig> for CompanyRules {
    fn from(config: &CompanyConfig) -> Self {
        Self {
            max_racks: config.max_racks,
            cable_service_radius: config.cable_service_radius,
            truck_cost: Fixed64::from_num(config.truck_cost),
            call_agent_cost: Fixed64::from_num(config.call_agent_cost),
            truck_base_ticks: config.truck_base_ticks,
            truck_ticks_per_tile: config.truck_ticks_per_tile,
            call_duration: config.call_duration,
        }
    }
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Company {
    id: CompanyId,
    name: String,
    money: Fixed64,
    headquarters: Rect,
    rules: CompanyRules,

    racks: Vec<Rack>,
    inventory: Inventory,
    cables: SlotMap<CableId, Cable>,
    nodes: SlotMap<NodeId, Node>,
    trucks: SlotMap<TruckId, Truck>,
    call_center: CallCenter,
    install_queue: VecDeque<CustomerId>,

    prices: BTreeMap<Service, Fixed64>,
    /// Scales how fast subscribers forget their dissatisfaction.
    pub service_satisfaction: Fixed64,
    /// Divides the churn chance of subscribers.
    pub customer_retention: Fixed64,
    tech: TechTree,
    customers: BTreeSet<CustomerId>,
    overloaded: bool,

    dirty: bool,
    networks: Vec<Network>,
    service_area: ServiceArea,
    potential_service_area: ServiceArea,

    events: Vec<Event>,
}

impl Company {
    pub fn new(
        id: CompanyId,
        name: &str,
        headquarters: Rect,
        config: &CompanyConfig,
        tech: TechTree,
    ) -> Self {
        let prices = [
            (Service::Phone, config.phone_price),
            (Service::Television, config.television_price),
            (Service::Broadband, config.broadband_price),
        ]
        .into_iter()
        .map(|(s, p)| (s, Fixed64::from_num(p)))
        .collect();

        Self {
            id,
            name: name.to_string(),
            money: config.starting_money(),
            headquarters,
            rules: CompanyRules::from(config),
            racks: Vec::new(),
            inventory: Inventory::new(),
            cables: SlotMap::with_key(),
            nodes: SlotMap::with_key(),
            trucks: SlotMap::with_key(),
            call_center: CallCenter::default(),
            install_queue: VecDeque::new(),
            prices,
            service_satisfaction: Fixed64::ONE,
            customer_retention: Fixed64::ONE,
            tech,
            customers: BTreeSet::new(),
            overloaded: false,
            dirty: false,
            networks: Vec::new(),
            service_area: ServiceArea::new(),
            potential_service_area: ServiceArea::new(),
            events: Vec::new(),
        }
    }

    // -- Accessors --

    pub fn id(&self) -> CompanyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn money(&self) -> Fixed64 {
        self.money
    }

    pub fn set_money(&mut self, money: Fixed64) {
        self.money = money;
    }

    pub(crate) fn credit(&mut self, amount: Fixed64) {
        self.money = self.money.saturating_add(amount);
    }

    pub(crate) fn debit(&mut self, amount: Fixed64) {
        self.money = self.money.saturating_sub(amount);
    }

    pub fn headquarters(&self) -> Rect {
        self.headquarters
    }

    /// Tiles where a network must touch the headquarters to be active.
    pub fn connectors(&self) -> Vec<TilePosition> {
        self.headquarters.corners()
    }

    pub fn rules(&self) -> &CompanyRules {
        &self.rules
    }

    pub fn racks(&self) -> &[Rack] {
        &self.racks
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn cables(&self) -> &SlotMap<CableId, Cable> {
        &self.cables
    }

    pub fn cable(&self, id: CableId) -> Option<&Cable> {
        self.cables.get(id)
    }

    pub fn nodes(&self) -> &SlotMap<NodeId, Node> {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn trucks(&self) -> &SlotMap<TruckId, Truck> {
        &self.trucks
    }

    pub fn call_center(&self) -> &CallCenter {
        &self.call_center
    }

    pub fn install_queue(&self) -> &VecDeque<CustomerId> {
        &self.install_queue
    }

    pub fn customers(&self) -> &BTreeSet<CustomerId> {
        &self.customers
    }

    pub fn tech(&self) -> &TechTree {
        &self.tech
    }

    pub(crate) fn tech_mut(&mut self) -> &mut TechTree {
        &mut self.tech
    }

    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    // -- Pricing --

    pub fn price(&self, service: Service) -> Option<Fixed64> {
        self.prices.get(&service).copied()
    }

    /// Set or withdraw the price of a service. Unpriced services are not sold.
    pub fn set_price(&mut self, service: Service, price: Option<Fixed64>) {
        match price {
            Some(p) => self.prices.insert(service, p),
            None => self.prices.remove(&service),
        };
    }

    pub fn priced_services(&self) -> ServiceSet {
        self.prices.keys().copied().collect()
    }

    /// Priced services available at `pos` through an active network.
    pub fn offered_at(&self, pos: TilePosition) -> ServiceSet {
        self.service_area
            .get(&pos)
            .map(|s| s.intersection(self.priced_services()))
            .unwrap_or_default()
    }

    /// Sum of prices for a set of services.
    pub fn bill(&self, services: ServiceSet) -> Fixed64 {
        services
            .iter()
            .filter_map(|s| self.price(s))
            .fold(Fixed64::ZERO, |acc, p| acc.saturating_add(p))
    }

    // -- Technology --

    /// Whether the item's technology, if any, has been researched.
    pub fn is_unlocked(&self, item: &Item) -> bool {
        item.technology.is_none_or(|t| self.tech.is_completed(t))
    }

    pub fn start_research(&mut self, tech: TechId, tick: Ticks) -> Result<(), TechTreeError> {
        self.tech.start_research(tech, tick)?;
        info!(company = self.id.0, tech = tech.0, "research started");
        Ok(())
    }

    // ===================================================================
    // Purchasing
    // ===================================================================

    /// Check whether `quantity` of `item` can be bought, mounting rack items
    /// into `rack` (or the first rack with room when `None`).
    pub fn can_purchase(
        &self,
        catalog: &ItemCatalog,
        item: ItemId,
        quantity: u32,
        rack: Option<usize>,
    ) -> Result<(), PurchaseError> {
        let Some(def) = catalog.get(item) else {
            return Err(PurchaseError::InsufficientInventory);
        };
        let cost = def.cost.saturating_mul(Fixed64::from_num(quantity));
        if cost > self.money {
            return Err(PurchaseError::InsufficientMoney);
        }
        match def.kind {
            ItemKind::Rack => {
                if self.racks.len() as u64 + quantity as u64 > self.rules.max_racks as u64 {
                    return Err(PurchaseError::MaximumRacks);
                }
            }
            kind if kind.is_rack_mounted() => {
                self.target_rack(catalog, def, quantity, rack)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn target_rack(
        &self,
        catalog: &ItemCatalog,
        def: &Item,
        quantity: u32,
        rack: Option<usize>,
    ) -> Result<usize, PurchaseError> {
        let needed = def.rack_space.saturating_mul(quantity);
        let fits = |r: &Rack| r.free_space(catalog) >= needed;
        match rack {
            Some(idx) => self
                .racks
                .get(idx)
                .filter(|r| fits(r))
                .map(|_| idx)
                .ok_or(PurchaseError::InsufficientRackspace),
            None => self
                .racks
                .iter()
                .position(fits)
                .ok_or(PurchaseError::InsufficientRackspace),
        }
    }

    /// Buy items. Racks are installed, rack items are mounted, anything else
    /// goes to the inventory.
    ///
    /// # Panics
    ///
    /// Panics if [`Company::can_purchase`] rejects the same arguments.
    pub fn purchase(&mut self, catalog: &ItemCatalog, item: ItemId, quantity: u32, rack: Option<usize>) {
        if let Err(err) = self.can_purchase(catalog, item, quantity, rack) {
            panic!("purchase of {quantity} x {item:?} by company {} not validated: {err}", self.id.0);
        }
        let Some(def) = catalog.get(item) else {
            unreachable!("validated item exists");
        };
        self.debit(def.cost.saturating_mul(Fixed64::from_num(quantity)));

        match def.kind {
            ItemKind::Rack => {
                for _ in 0..quantity {
                    self.racks.push(Rack::new(def.rack_space));
                }
            }
            kind if kind.is_rack_mounted() => {
                let Ok(idx) = self.target_rack(catalog, def, quantity, rack) else {
                    unreachable!("validated rack exists");
                };
                self.racks[idx].items.extend(std::iter::repeat_n(item, quantity as usize));
                // Terminations change what networks offer.
                self.invalidate();
            }
            _ => self.inventory.add(item, quantity),
        }
        info!(company = self.id.0, item = %def.name, quantity, "purchased");
    }

    pub fn take_from_inventory(&mut self, item: ItemId, quantity: u32) -> Result<(), PurchaseError> {
        self.inventory.remove(item, quantity)
    }

    pub fn return_to_inventory(&mut self, items: &[ItemId]) {
        for item in items {
            self.inventory.add(*item, 1);
        }
    }

    /// Rack-mounted items of a kind, in rack order.
    pub fn mounted<'a>(
        &'a self,
        catalog: &'a ItemCatalog,
        kind: ItemKind,
    ) -> impl Iterator<Item = &'a Item> + 'a {
        self.racks
            .iter()
            .flat_map(|r| r.items.iter())
            .filter_map(|id| catalog.get(*id))
            .filter(move |item| item.kind == kind)
    }

    /// Services terminated for a cable medium by mounted equipment.
    pub fn terminated_services(&self, catalog: &ItemCatalog, cable_type: CableType) -> ServiceSet {
        self.mounted(catalog, ItemKind::Termination)
            .filter(|t| t.supports_wiring(cable_type))
            .fold(ServiceSet::EMPTY, |acc, t| acc.union(t.services))
    }

    /// Subscribers that mounted terminations can serve for a service.
    pub fn termination_capacity(&self, catalog: &ItemCatalog, service: Service) -> u32 {
        self.mounted(catalog, ItemKind::Termination)
            .filter(|t| t.provides(service))
            .map(|t| t.subscribers)
            .sum()
    }

    pub fn backhaul_throughput(&self, catalog: &ItemCatalog) -> u32 {
        self.mounted(catalog, ItemKind::Backhaul)
            .map(|b| b.throughput)
            .sum()
    }

    // ===================================================================
    // Placement
    // ===================================================================

    fn placeable<'a>(
        catalog: &'a ItemCatalog,
        item: ItemId,
        kind: ItemKind,
        label: &'static str,
    ) -> Result<(&'a Item, CableType), PlacementError> {
        let def = catalog.get(item).ok_or(PlacementError::UnknownItem(item))?;
        if def.kind != kind {
            return Err(PlacementError::WrongKind(item, label));
        }
        let cable_type = def.cable_type().ok_or(PlacementError::WrongKind(item, label))?;
        Ok((def, cable_type))
    }

    /// Lay a cable along `positions`, paying the item cost per tile.
    ///
    /// An empty or single-tile path is accepted; such a cable is pruned at
    /// the next recalculation.
    pub fn place_cable(
        &mut self,
        catalog: &ItemCatalog,
        item: ItemId,
        positions: Vec<TilePosition>,
    ) -> Result<CableId, PlacementError> {
        let (def, cable_type) = Self::placeable(catalog, item, ItemKind::Cable, "a cable")?;
        if positions.windows(2).any(|w| w[0].manhattan_distance(&w[1]) != 1) {
            return Err(PlacementError::NonContiguous);
        }
        self.can_purchase(catalog, item, positions.len() as u32, None)?;
        self.debit(def.cost.saturating_mul(Fixed64::from_num(positions.len() as u32)));

        let id = self.insert_cable(cable_type, item, positions);
        self.invalidate();
        Ok(id)
    }

    /// Remove a whole cable.
    pub fn remove_cable(&mut self, id: CableId) -> Result<Cable, PlacementError> {
        let cable = self.cables.remove(id).ok_or(PlacementError::UnknownCable)?;
        self.events.push(Event::CableRemoved {
            company: self.id,
            cable: id,
        });
        self.invalidate();
        Ok(cable)
    }

    /// Remove one tile from every cable passing through `pos`.
    ///
    /// A single-tile cable is deleted, an endpoint is trimmed in place, and
    /// an interior tile splits the cable: the original is removed and the
    /// two sides are added as new cables, in that order. No cable at `pos`
    /// is a no-op.
    pub fn remove_cable_position(&mut self, pos: TilePosition) {
        let affected: Vec<CableId> = self
            .cables
            .iter()
            .filter(|(_, c)| c.contains(pos))
            .map(|(id, _)| id)
            .collect();
        if affected.is_empty() {
            return;
        }

        for id in affected {
            let Some(cable) = self.cables.get_mut(id) else {
                continue;
            };
            let Some(idx) = cable.positions.iter().position(|p| *p == pos) else {
                continue;
            };
            let last = cable.positions.len() - 1;

            if last == 0 {
                self.cables.remove(id);
                self.events.push(Event::CableRemoved {
                    company: self.id,
                    cable: id,
                });
            } else if idx == 0 || idx == last {
                cable.positions.remove(idx);
                self.events.push(Event::CableUpdated {
                    company: self.id,
                    cable: id,
                });
            } else {
                let Some(original) = self.cables.remove(id) else {
                    continue;
                };
                self.events.push(Event::CableRemoved {
                    company: self.id,
                    cable: id,
                });
                let (left, right) = original.positions.split_at(idx);
                self.insert_cable(original.cable_type, original.item, left.to_vec());
                self.insert_cable(original.cable_type, original.item, right[1..].to_vec());
            }
        }
        self.invalidate();
    }

    fn insert_cable(&mut self, cable_type: CableType, item: ItemId, positions: Vec<TilePosition>) -> CableId {
        let id = self.cables.insert_with_key(|id| Cable {
            id,
            cable_type,
            item,
            positions,
            status: Status::Disconnected,
        });
        self.events.push(Event::CableAdded {
            company: self.id,
            cable: id,
        });
        id
    }

    /// Place a node at `position`, paying the item cost.
    pub fn place_node(
        &mut self,
        catalog: &ItemCatalog,
        item: ItemId,
        position: TilePosition,
    ) -> Result<NodeId, PlacementError> {
        let (def, cable_type) = Self::placeable(catalog, item, ItemKind::Node, "a node")?;
        self.can_purchase(catalog, item, 1, None)?;
        self.debit(def.cost);
        let range = def.range;

        let id = self.nodes.insert_with_key(|id| Node {
            id,
            cable_type,
            item,
            position,
            range,
            status: Status::Disconnected,
        });
        self.events.push(Event::NodeAdded {
            company: self.id,
            node: id,
        });
        self.invalidate();
        Ok(id)
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, PlacementError> {
        let node = self.nodes.remove(id).ok_or(PlacementError::UnknownNode)?;
        self.events.push(Event::NodeRemoved {
            company: self.id,
            node: id,
        });
        self.invalidate();
        Ok(node)
    }

    // ===================================================================
    // Network caches
    // ===================================================================

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Whether placement changed since the last [`Company::recalculate`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    /// Tiles served by active networks.
    pub fn service_area(&self) -> &ServiceArea {
        &self.service_area
    }

    /// Tiles that would be served if every network were active.
    pub fn potential_service_area(&self) -> &ServiceArea {
        &self.potential_service_area
    }

    /// Rebuild networks, statuses and service areas if anything changed.
    /// Returns whether a rebuild happened.
    pub fn recalculate(&mut self, map: &dyn MapService, catalog: &ItemCatalog) -> bool {
        if !self.dirty {
            return false;
        }

        let degenerate: Vec<CableId> = self
            .cables
            .iter()
            .filter(|(_, c)| c.len() < 2)
            .map(|(id, _)| id)
            .collect();
        for id in degenerate {
            self.cables.remove(id);
            self.events.push(Event::CableRemoved {
                company: self.id,
                cable: id,
            });
        }

        let mut networks = calculate_networks(&self.cables, &self.nodes, &self.connectors());
        for network in &mut networks {
            network.services = network
                .cable_type
                .services()
                .intersection(self.terminated_services(catalog, network.cable_type));
        }
        self.apply_statuses(&networks);

        let radius = self.rules.cable_service_radius;
        let area = coverage(
            networks.iter().filter(|n| n.active),
            &self.cables,
            &self.nodes,
            map,
            radius,
        );
        let potential = coverage(&networks, &self.cables, &self.nodes, map, radius);

        if self.service_area != area {
            self.events.push(Event::ServiceAreaChanged {
                company: self.id,
                tiles: area.len(),
            });
        }

        debug!(
            company = self.id.0,
            networks = networks.len(),
            served = area.len(),
            potential = potential.len(),
            "networks recalculated"
        );
        self.networks = networks;
        self.service_area = area;
        self.potential_service_area = potential;
        self.dirty = false;
        true
    }

    fn network_status(&self, network: &Network) -> Status {
        if !network.active {
            Status::Disconnected
        } else if self.overloaded && network.services.contains(Service::Broadband) {
            Status::Overloaded
        } else {
            Status::Active
        }
    }

    fn apply_statuses(&mut self, networks: &[Network]) {
        for network in networks {
            let status = self.network_status(network);
            for id in &network.cables {
                if let Some(cable) = self.cables.get_mut(*id)
                    && cable.status != status
                {
                    cable.status = status;
                    self.events.push(Event::StatusChanged {
                        company: self.id,
                        target: InfrastructureId::Cable(*id),
                        status,
                    });
                }
            }
            for id in &network.nodes {
                if let Some(node) = self.nodes.get_mut(*id)
                    && node.status != status
                {
                    node.status = status;
                    self.events.push(Event::StatusChanged {
                        company: self.id,
                        target: InfrastructureId::Node(*id),
                        status,
                    });
                }
            }
        }
    }

    /// Mark broadband networks overloaded or relieved.
    pub fn set_overloaded(&mut self, overloaded: bool) {
        if self.overloaded == overloaded {
            return;
        }
        self.overloaded = overloaded;
        let networks = std::mem::take(&mut self.networks);
        self.apply_statuses(&networks);
        self.networks = networks;
        debug!(company = self.id.0, overloaded, "backhaul load changed");
    }

    // ===================================================================
    // Staff
    // ===================================================================

    pub fn truck_count(&self) -> usize {
        self.trucks.len()
    }

    pub fn call_agent_count(&self) -> usize {
        self.call_center.agent_count()
    }

    pub fn buy_truck(&mut self) -> Result<TruckId, PurchaseError> {
        if self.rules.truck_cost > self.money {
            return Err(PurchaseError::InsufficientMoney);
        }
        self.debit(self.rules.truck_cost);
        let id = self.trucks.insert_with_key(|id| Truck { id, job: None });
        self.events.push(Event::TruckAdded {
            company: self.id,
            truck: id,
        });
        info!(company = self.id.0, trucks = self.trucks.len(), "truck bought");
        Ok(id)
    }

    /// Retire a truck, preferring an idle one. A busy truck's customer goes
    /// back to the front of the install queue.
    pub fn sell_truck(&mut self) -> Option<TruckId> {
        let id = self
            .trucks
            .iter()
            .filter(|(_, t)| t.is_idle())
            .map(|(id, _)| id)
            .last()
            .or_else(|| self.trucks.keys().last())?;
        let truck = self.trucks.remove(id)?;
        if let Some(job) = truck.job {
            self.install_queue.push_front(job.customer);
        }
        self.events.push(Event::TruckRemoved {
            company: self.id,
            truck: id,
        });
        info!(company = self.id.0, trucks = self.trucks.len(), "truck sold");
        Some(id)
    }

    pub fn hire_call_agent(&mut self) -> Result<(), PurchaseError> {
        if self.rules.call_agent_cost > self.money {
            return Err(PurchaseError::InsufficientMoney);
        }
        self.debit(self.rules.call_agent_cost);
        self.call_center.agents.push(CallAgent::default());
        info!(company = self.id.0, agents = self.call_center.agents.len(), "call agent hired");
        Ok(())
    }

    /// Dismiss a call agent, preferring an idle one. Returns false when
    /// there is nobody to dismiss.
    pub fn fire_call_agent(&mut self) -> bool {
        let agents = &mut self.call_center.agents;
        let Some(idx) = agents
            .iter()
            .rposition(|a| a.is_idle())
            .or_else(|| agents.len().checked_sub(1))
        else {
            return false;
        };
        let agent = agents.remove(idx);
        if let Some(job) = agent.job {
            self.call_center.queue.push_front(job.customer);
        }
        info!(company = self.id.0, agents = self.call_center.agents.len(), "call agent fired");
        true
    }

    pub fn queue_install(&mut self, customer: CustomerId) {
        if !self.install_queue.contains(&customer) {
            self.install_queue.push_back(customer);
        }
    }

    pub fn queue_call(&mut self, customer: CustomerId) {
        if !self.call_center.queue.contains(&customer) {
            self.call_center.queue.push_back(customer);
        }
    }

    fn forget_customer(&mut self, customer: CustomerId) {
        self.install_queue.retain(|c| *c != customer);
        for truck in self.trucks.values_mut() {
            if truck.job.is_some_and(|job| job.customer == customer) {
                truck.job = None;
            }
        }
        self.call_center.forget(customer);
    }

    /// Advance trucks and call agents by `dt`, assigning queued work to idle
    /// staff. `home` locates a customer for truck travel time.
    pub fn progress_staff(
        &mut self,
        dt: Ticks,
        home: impl Fn(CustomerId) -> Option<TilePosition>,
    ) -> StaffReport {
        let mut report = StaffReport::default();
        let depot = self.headquarters.center();

        for truck in self.trucks.values_mut() {
            if let Some(customer) = truck.advance(dt) {
                report.arrivals.push(customer);
            }
            while truck.is_idle() {
                let Some(customer) = self.install_queue.pop_front() else {
                    break;
                };
                let Some(dest) = home(customer) else {
                    continue;
                };
                let travel = depot.manhattan_distance(&dest) as Ticks * self.rules.truck_ticks_per_tile;
                truck.job = Some(Job {
                    customer,
                    remaining: (self.rules.truck_base_ticks + travel).max(1),
                });
            }
        }

        for agent in &mut self.call_center.agents {
            if let Some(customer) = agent.advance(dt) {
                report.resolved.push(customer);
            }
            if agent.is_idle()
                && let Some(customer) = self.call_center.queue.pop_front()
            {
                agent.job = Some(Job {
                    customer,
                    remaining: self.rules.call_duration.max(1),
                });
            }
        }
        report
    }

    // ===================================================================
    // Customers
    // ===================================================================

    /// Keep the customer set in step with a customer's provider.
    pub fn on_customer_changed(&mut self, customer: CustomerId, provider: Option<CompanyId>) {
        if provider == Some(self.id) {
            self.customers.insert(customer);
        } else if self.customers.remove(&customer) {
            self.forget_customer(customer);
        }
    }

    // ===================================================================
    // Events & hashing
    // ===================================================================

    /// Events recorded since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[Event] {
        &self.events
    }

    pub(crate) fn hash_into(&self, hash: &mut StateHash) {
        hash.write_u32(self.id.0);
        hash.write_fixed64(self.money);
        hash.write_len(self.cables.len());
        for cable in self.cables.values() {
            hash.write_len(cable.positions.len());
            for pos in &cable.positions {
                hash.write_position(*pos);
            }
        }
        hash.write_len(self.nodes.len());
        for node in self.nodes.values() {
            hash.write_position(node.position);
        }
        hash.write_len(self.trucks.len());
        hash.write_len(self.call_center.agents.len());
        hash.write_len(self.customers.len());
        for (item, count) in self.inventory.iter() {
            hash.write_u32(item.0);
            hash.write_u32(count);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
