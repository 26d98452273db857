//! Whole games driven by AI executors.

use proptest::prelude::*;
use telco_ai::Executor;
use telco_core::game::Game;
use telco_core::id::CompanyId;
use telco_core::test_utils::*;

fn ai_game(seed: u64, customers: usize) -> Game {
    let mut game = test_game(seed);
    let ai = game.config().ai.clone();
    for (name, hq) in [("West Telco", hq_at(0, 0)), ("East Telco", hq_at(20, 20))] {
        let id = game.add_company(name, hq);
        assert!(game.set_controller(id, Box::new(Executor::standard(&ai))));
    }
    game.seed_customers(customers);
    game
}

#[test]
fn executors_build_networks_and_research() {
    let mut game = ai_game(42, 150);
    assert_eq!(game.controller_name(CompanyId(0)), Some("executor"));
    game.run(1500, 1);

    for company in game.companies() {
        assert!(!company.cables().is_empty(), "{} laid no cable", company.name());
        let tech = company.tech();
        assert!(
            tech.current_research().is_some() || tech.is_completed(DOCSIS),
            "{} never researched",
            company.name()
        );
        assert!(company.networks().iter().any(|n| n.active));
    }
}

#[test]
fn ai_companies_sign_up_customers() {
    let mut game = ai_game(7, 200);
    game.run(4000, 1);
    let subscribed: usize = game.companies().iter().map(|c| c.customers().len()).sum();
    assert!(subscribed > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn ai_games_replay_exactly(seed in any::<u64>()) {
        let mut a = ai_game(seed, 60);
        let mut b = ai_game(seed, 60);
        for _ in 0..300 {
            a.step(1);
            b.step(1);
            prop_assert_eq!(a.state_hash(), b.state_hash());
        }
    }

    #[test]
    fn customers_stay_consistent_under_ai(seed in any::<u64>()) {
        let mut game = ai_game(seed, 80);
        for _ in 0..10 {
            game.run(50, 1);
            for customer in game.market().customers() {
                prop_assert!(customer.is_consistent());
            }
        }
    }
}
