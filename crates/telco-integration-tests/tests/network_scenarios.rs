//! Network topology scenarios driven through the public company API.

use telco_core::company::Company;
use telco_core::config::CompanyConfig;
use telco_core::event::Event;
use telco_core::id::CompanyId;
use telco_core::network::Status;
use telco_core::test_utils::*;
use telco_spatial::{Rect, TileMap};
use telco_tech_tree::TechTree;

fn company_with(money: f64, headquarters: Rect) -> Company {
    let config = CompanyConfig {
        starting_money: money,
        ..CompanyConfig::default()
    };
    Company::new(CompanyId(0), "Scenario Telco", headquarters, &config, TechTree::new())
}

/// Two copper nodes joined by a chain of four cables:
/// (4,0)-(4,3), (4,3)-(8,3), (8,3)-(8,6), (8,6)-(3,6). The second node goes
/// down once the first leg is checked, so it never stands alone.
#[test]
fn chained_cables_form_one_network_and_split_at_a_bridge() {
    let map = TileMap::new(16, 16);
    let cat = TestCatalog::new();
    let mut company = company_with(1000.0, hq_at(12, 12));

    let first = company.place_node(&cat.catalog, cat.copper_node, pos(4, 0)).unwrap();
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(4, 0), pos(4, 3)))
        .unwrap();
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(4, 3), pos(8, 3)))
        .unwrap();
    company.recalculate(&map, &cat.catalog);

    assert_eq!(company.networks().len(), 1);
    assert_eq!(company.networks()[0].cables.len(), 2);

    let second = company.place_node(&cat.catalog, cat.copper_node, pos(3, 6)).unwrap();
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(8, 3), pos(8, 6)))
        .unwrap();
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(8, 6), pos(3, 6)))
        .unwrap();
    company.recalculate(&map, &cat.catalog);

    let networks = company.networks();
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].cables.len(), 4);
    assert_eq!(networks[0].nodes.len(), 2);

    company.remove_cable_position(pos(8, 6));
    company.recalculate(&map, &cat.catalog);

    let networks = company.networks();
    assert_eq!(networks.len(), 2);
    for network in networks {
        assert_eq!(network.nodes.len(), 1);
    }
    let a: Vec<_> = networks[0].cables.clone();
    let b: Vec<_> = networks[1].cables.clone();
    assert!(a.iter().all(|c| !b.contains(c)));
    assert_eq!(a.len() + b.len(), 4);
    assert!(networks[0].nodes.contains(&first));
    assert!(networks[1].nodes.contains(&second));
    // Nothing touches the headquarters, so nothing is live.
    assert!(networks.iter().all(|n| !n.active));
    assert!(company.cables().values().all(|c| c.status == Status::Disconnected));
}

#[test]
fn connecting_to_the_headquarters_activates_the_network() {
    let map = TileMap::new(16, 16);
    let cat = TestCatalog::new();
    let mut company = company_with(1000.0, hq_at(0, 0));

    let node = company.place_node(&cat.catalog, cat.copper_node, pos(6, 6)).unwrap();
    let cable = company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(6, 6), pos(6, 10)))
        .unwrap();
    company.recalculate(&map, &cat.catalog);
    assert!(!company.networks()[0].active);
    assert_eq!(company.node(node).unwrap().status, Status::Disconnected);
    assert!(company.service_area().is_empty());
    assert!(!company.potential_service_area().is_empty());

    // (2,2) is a headquarters corner.
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(2, 2), pos(6, 6)))
        .unwrap();
    company.recalculate(&map, &cat.catalog);

    assert_eq!(company.networks().len(), 1);
    assert!(company.networks()[0].active);
    assert_eq!(company.node(node).unwrap().status, Status::Active);
    assert_eq!(company.cable(cable).unwrap().status, Status::Active);
    assert_eq!(company.service_area().len(), company.potential_service_area().len());
}

#[test]
fn interior_removal_emits_remove_then_two_adds() {
    let cat = TestCatalog::new();
    let mut company = company_with(1000.0, hq_at(12, 12));
    let cable = company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(0, 5), pos(6, 5)))
        .unwrap();
    company.drain_events();

    company.remove_cable_position(pos(3, 5));
    let events = company.drain_events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], Event::CableRemoved { cable: c, .. } if c == cable));
    assert!(matches!(events[1], Event::CableAdded { .. }));
    assert!(matches!(events[2], Event::CableAdded { .. }));

    let lengths: Vec<usize> = company.cables().values().map(|c| c.len()).collect();
    assert_eq!(lengths.iter().sum::<usize>(), 6);
}

#[test]
fn placement_is_charged_and_refused_when_broke() {
    let cat = TestCatalog::new();
    let mut company = company_with(60.0, hq_at(12, 12));
    company.place_node(&cat.catalog, cat.copper_node, pos(1, 1)).unwrap();
    assert_eq!(company.money(), fixed(10.0));

    let result = company.place_cable(&cat.catalog, cat.copper_cable, straight(pos(0, 0), pos(0, 11)));
    assert!(result.is_err());
    assert_eq!(company.money(), fixed(10.0));
    assert_eq!(company.cables().len(), 0);
}
