//! A customer's whole path through a running game: sign-up, install,
//! billing.

use std::cell::RefCell;
use std::rc::Rc;

use telco_core::config::SimConfig;
use telco_core::customer::{CustomerStatus, CustomerStatusKey};
use telco_core::event::{Event, EventKind};
use telco_core::game::Game;
use telco_core::id::{CompanyId, CustomerId};
use telco_core::service::Service;
use telco_core::test_utils::*;

/// One copper company with a truck and two modems, serving the column
/// x = 2, y = 2..=12, and one wealthy customer beside it. Nobody churns.
fn calm_town() -> (Game, CompanyId, CustomerId, TestCatalog) {
    let mut config = SimConfig::default();
    config.market.subscribed_base_churn = 0.0;
    config.market.outage_chance = 0.0;
    let mut game = test_game_with(config, 3);
    let cat = TestCatalog::new();

    let id = game.add_company("Copper Co", hq_at(0, 0));
    let company = game.company_mut(id).unwrap();
    equip_copper(company, &cat);
    company.purchase(&cat.catalog, cat.dsl_modem, 2, None);
    company.buy_truck().unwrap();
    company
        .place_cable(&cat.catalog, cat.copper_cable, straight(pos(2, 2), pos(2, 12)))
        .unwrap();

    // Zero patience: no drift and no churn once a provider is chosen.
    let customer = game.market_mut().add_customer(pos(3, 6), fixed(1.0), fixed(0.0));
    (game, id, customer, cat)
}

fn record_statuses(game: &mut Game) -> Rc<RefCell<Vec<CustomerStatus>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    game.events_mut().on_passive(
        EventKind::CustomerChanged,
        Box::new(move |e| {
            if let Event::CustomerChanged { status, .. } = e {
                sink.borrow_mut().push(*status);
            }
        }),
    );
    seen
}

#[test]
fn customer_signs_up_and_gets_installed() {
    let (mut game, id, customer, cat) = calm_town();
    let statuses = record_statuses(&mut game);

    game.run(300, 1);

    assert_eq!(*statuses.borrow(), vec![CustomerStatus::Pending, CustomerStatus::Subscribed]);
    let c = game.market().customer(customer).unwrap();
    assert_eq!(c.provider, Some(id));
    assert_eq!(c.installed, vec![cat.dsl_modem]);

    let company = game.company(id).unwrap();
    assert!(company.customers().contains(&customer));
    assert!(company.install_queue().is_empty());
    assert_eq!(company.inventory().count(cat.dsl_modem), 1);
    assert_eq!(game.market().subscriber_count(id, Service::Phone), 1);
    assert_eq!(game.market().subscriber_count(id, Service::Broadband), 1);

    let census = game.market().census();
    assert_eq!(census.get(&CustomerStatusKey::of(CustomerStatus::Subscribed)), Some(&1));
}

#[test]
fn subscriber_pays_every_billing_interval() {
    let (mut game, id, _, _) = calm_town();
    game.run(300, 1);
    // The install is done; without the truck only revenue is left.
    game.company_mut(id).unwrap().sell_truck().unwrap();
    let before = game.company(id).unwrap().money();

    game.run(100, 1);
    // Phone 10 + broadband 30.
    assert_eq!(game.company(id).unwrap().money(), before + fixed(40.0));
}

#[test]
fn lost_coverage_cancels_the_subscription() {
    let (mut game, id, customer, cat) = calm_town();
    game.run(300, 1);
    assert_eq!(game.market().customer(customer).unwrap().status, CustomerStatus::Subscribed);

    // Cut the cable next to the headquarters: the network goes dark.
    game.company_mut(id).unwrap().remove_cable_position(pos(2, 3));
    game.run(2, 1);

    let c = game.market().customer(customer).unwrap();
    assert_eq!(c.status, CustomerStatus::NoProvider);
    assert_eq!(c.provider, None);
    assert!(c.installed.is_empty());
    let company = game.company(id).unwrap();
    assert!(!company.customers().contains(&customer));
    assert_eq!(company.inventory().count(cat.dsl_modem), 2);
}
