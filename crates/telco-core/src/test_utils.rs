//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so downstream
//! crates reach them through the `test-utils` feature.

use telco_spatial::{Rect, TileMap, TilePosition};
use telco_tech_tree::{TechId, TechTree, Technology};

use crate::company::Company;
use crate::config::{CompanyConfig, SimConfig};
use crate::fixed::Fixed64;
use crate::game::Game;
use crate::id::{CompanyId, CustomerId, ItemId};
use crate::item::{Item, ItemCatalog, ItemKind};
use crate::service::{CableType, Service, ServiceSet};

// ===========================================================================
// Scalars and positions
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn pos(x: i32, y: i32) -> TilePosition {
    TilePosition::new(x, y)
}

/// Contiguous path from `a` to `b`, inclusive: along x first, then y.
pub fn straight(a: TilePosition, b: TilePosition) -> Vec<TilePosition> {
    let mut out = vec![a];
    let mut cur = a;
    while cur != b {
        cur = if cur.x != b.x {
            pos(cur.x + (b.x - cur.x).signum(), cur.y)
        } else {
            pos(cur.x, cur.y + (b.y - cur.y).signum())
        };
        out.push(cur);
    }
    out
}

/// A 3x3 headquarters with its top-left corner at `(x, y)`.
pub fn hq_at(x: i32, y: i32) -> Rect {
    Rect::new(pos(x, y), pos(x + 2, y + 2))
}

/// `n` distinct customer keys not tied to any market.
pub fn customer_ids(n: usize) -> Vec<CustomerId> {
    let mut keys = slotmap::SlotMap::<CustomerId, ()>::with_key();
    (0..n).map(|_| keys.insert(())).collect()
}

// ===========================================================================
// Catalog
// ===========================================================================

pub const DOCSIS: TechId = TechId(1);
pub const FIBER: TechId = TechId(2);

/// A small catalog covering every item kind, copper available from the
/// start and coax gated behind [`DOCSIS`].
pub struct TestCatalog {
    pub catalog: ItemCatalog,
    pub tech: TechTree,
    pub copper_cable: ItemId,
    pub coax_cable: ItemId,
    pub copper_node: ItemId,
    pub coax_node: ItemId,
    pub dsl_modem: ItemId,
    pub cable_modem: ItemId,
    pub set_top_box: ItemId,
    pub rack: ItemId,
    pub dslam: ItemId,
    pub cmts: ItemId,
    pub backhaul: ItemId,
    pub fan: ItemId,
}

impl TestCatalog {
    pub fn new() -> Self {
        let mut catalog = ItemCatalog::new();
        let mut add = |item: Item| catalog.register(item).expect("test catalog is valid");

        let wired = |mut item: Item, cable_type: CableType| {
            item.wiring = vec![cable_type];
            item
        };
        let gated = |mut item: Item| {
            item.technology = Some(DOCSIS);
            item
        };
        let serving = |mut item: Item, services: &[Service]| {
            item.services = ServiceSet::of(services);
            item
        };

        let copper_cable = add(wired(Item::new("Copper Cable", ItemKind::Cable, fixed(1.0)), CableType::Copper));
        let coax_cable = add(gated(wired(
            Item::new("Coaxial Cable", ItemKind::Cable, fixed(2.0)),
            CableType::Coaxial,
        )));

        let mut node = wired(Item::new("Copper Node", ItemKind::Node, fixed(50.0)), CableType::Copper);
        node.range = 2;
        let copper_node = add(node);
        let mut node = gated(wired(Item::new("Coaxial Node", ItemKind::Node, fixed(80.0)), CableType::Coaxial));
        node.range = 3;
        let coax_node = add(node);

        let dsl_modem = add(serving(
            Item::new("DSL Modem", ItemKind::Cpe, fixed(20.0)),
            &[Service::Phone, Service::Broadband],
        ));
        let cable_modem = add(gated(serving(
            Item::new("Cable Modem", ItemKind::Cpe, fixed(25.0)),
            &[Service::Broadband],
        )));
        let set_top_box = add(serving(
            Item::new("Set-top Box", ItemKind::Cpe, fixed(15.0)),
            &[Service::Television],
        ));

        let mut rack = Item::new("Rack", ItemKind::Rack, fixed(200.0));
        rack.rack_space = 8;
        let rack = add(rack);

        let mut dslam = serving(
            wired(Item::new("DSLAM", ItemKind::Termination, fixed(300.0)), CableType::Copper),
            &[Service::Phone, Service::Broadband],
        );
        dslam.rack_space = 4;
        dslam.subscribers = 50;
        let dslam = add(dslam);

        let mut cmts = gated(serving(
            wired(Item::new("CMTS", ItemKind::Termination, fixed(500.0)), CableType::Coaxial),
            &[Service::Phone, Service::Television, Service::Broadband],
        ));
        cmts.rack_space = 4;
        cmts.subscribers = 100;
        let cmts = add(cmts);

        let mut backhaul = Item::new("Backhaul", ItemKind::Backhaul, fixed(250.0));
        backhaul.rack_space = 2;
        backhaul.throughput = 40;
        let backhaul = add(backhaul);

        let mut fan = Item::new("Fan", ItemKind::Fan, fixed(50.0));
        fan.rack_space = 1;
        let fan = add(fan);

        let mut tech = TechTree::new();
        tech.register(Technology {
            id: DOCSIS,
            name: "DOCSIS".to_string(),
            prerequisites: vec![],
            cost: 100,
        })
        .expect("test tech is valid");
        tech.register(Technology {
            id: FIBER,
            name: "Fiber".to_string(),
            prerequisites: vec![DOCSIS],
            cost: 200,
        })
        .expect("test tech is valid");

        Self {
            catalog,
            tech,
            copper_cable,
            coax_cable,
            copper_node,
            coax_node,
            dsl_modem,
            cable_modem,
            set_top_box,
            rack,
            dslam,
            cmts,
            backhaul,
            fan,
        }
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Companies and games
// ===========================================================================

/// A company with default config and no technologies.
pub fn test_company(id: CompanyId, headquarters: Rect) -> Company {
    Company::new(
        id,
        &format!("Company {}", id.0),
        headquarters,
        &CompanyConfig::default(),
        TechTree::new(),
    )
}

/// A company with the test technologies, none researched.
pub fn test_company_with_tech(id: CompanyId, headquarters: Rect, cat: &TestCatalog) -> Company {
    Company::new(
        id,
        &format!("Company {}", id.0),
        headquarters,
        &CompanyConfig::default(),
        cat.tech.fresh_copy(),
    )
}

/// Buy a rack, a DSLAM and a backhaul: enough to serve copper customers.
pub fn equip_copper(company: &mut Company, cat: &TestCatalog) {
    company.purchase(&cat.catalog, cat.rack, 1, None);
    company.purchase(&cat.catalog, cat.dslam, 1, None);
    company.purchase(&cat.catalog, cat.backhaul, 1, None);
}

/// A 24x24 town with a road every 4 tiles, the test catalog, and no
/// companies yet.
pub fn test_game(seed: u64) -> Game {
    test_game_with(SimConfig::default(), seed)
}

pub fn test_game_with(config: SimConfig, seed: u64) -> Game {
    let cat = TestCatalog::new();
    Game::new(
        Box::new(TileMap::with_road_grid(24, 24, 4)),
        cat.catalog,
        cat.tech,
        config,
        seed,
    )
}
