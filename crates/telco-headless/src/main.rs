//! Runs AI companies against each other on a generated town and prints a
//! summary.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use clap::Parser;
use telco_ai::Executor;
use telco_core::customer::{CustomerStatus, CustomerStatusKey};
use telco_core::game::Game;
use telco_data::{DataLoadError, load_game_data};
use telco_spatial::{Rect, TileMap, TilePosition};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ROAD_SPACING: u32 = 4;

#[derive(Debug, thiserror::Error)]
enum HeadlessError {
    #[error("at most {max} companies fit on the map")]
    TooManyCompanies { max: usize },
    #[error(transparent)]
    Data(#[from] DataLoadError),
}

/// Command line arguments for a headless run
#[derive(Parser, Debug)]
#[command(name = "telco-headless")]
#[command(about = "Runs AI telecom companies on a generated town")]
struct Args {
    /// Directory with the items, technologies and config files
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data"))]
    data: PathBuf,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 5000)]
    ticks: u32,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// AI companies, one per map corner
    #[arg(long, default_value_t = 2)]
    companies: usize,

    /// Customers seeded on buildable tiles
    #[arg(long, default_value_t = 400)]
    customers: usize,

    /// Width and height of the town
    #[arg(long, default_value_t = 48)]
    size: u32,
}

/// Headquarters in the map corners, each anchored on a road intersection.
fn headquarters(size: u32, count: usize) -> Result<Vec<Rect>, HeadlessError> {
    let far = ((size.saturating_sub(3) / ROAD_SPACING) * ROAD_SPACING) as i32;
    let corners = [(0, 0), (far, far), (far, 0), (0, far)];
    if count > corners.len() {
        return Err(HeadlessError::TooManyCompanies { max: corners.len() });
    }
    Ok(corners
        .iter()
        .take(count)
        .map(|&(x, y)| Rect::new(TilePosition::new(x, y), TilePosition::new(x + 2, y + 2)))
        .collect())
}

fn run(args: Args) -> Result<(), HeadlessError> {
    let data = load_game_data(&args.data)?;
    let ai = data.config.ai.clone();
    let map = TileMap::with_road_grid(args.size, args.size, ROAD_SPACING);
    let mut game = Game::new(Box::new(map), data.catalog, data.tech, data.config, args.seed);

    for (idx, hq) in headquarters(args.size, args.companies)?.into_iter().enumerate() {
        let id = game.add_company(&format!("Telco {}", idx + 1), hq);
        game.set_controller(id, Box::new(Executor::standard(&ai)));
    }
    let seeded = game.seed_customers(args.customers);
    info!(seeded, ticks = args.ticks, seed = args.seed, "starting headless run");

    game.run(args.ticks, 1);

    println!("tick {}  state hash {:016x}", game.tick(), game.state_hash());
    for company in game.companies() {
        let research = company
            .tech()
            .current_research()
            .map_or_else(|| "idle".to_string(), |id| format!("{id:?}"));
        println!(
            "{:<10} money {:>10.2}  cables {:>3}  nodes {:>3}  networks {:>2}  served {:>4} tiles  customers {:>4}  trucks {:>2}  agents {:>2}  research {}",
            company.name(),
            company.money().to_num::<f64>(),
            company.cables().len(),
            company.nodes().len(),
            company.networks().len(),
            company.service_area().len(),
            company.customers().len(),
            company.truck_count(),
            company.call_agent_count(),
            research,
        );
    }
    let census = game.market().census();
    let count = |status| census.get(&CustomerStatusKey::of(status)).copied().unwrap_or(0);
    println!(
        "customers: {} without provider, {} pending, {} subscribed, {} in outage",
        count(CustomerStatus::NoProvider),
        count(CustomerStatus::Pending),
        count(CustomerStatus::Subscribed),
        count(CustomerStatus::Outage),
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args =
            Args::try_parse_from(["telco-headless", "--ticks", "10", "--seed", "7", "--companies", "3"])
                .unwrap();
        assert_eq!(args.ticks, 10);
        assert_eq!(args.seed, 7);
        assert_eq!(args.companies, 3);
        assert_eq!(args.customers, 400);
        assert!(args.data.ends_with("data"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Args::try_parse_from(["telco-headless", "--bogus"]).is_err());
        assert!(Args::try_parse_from(["telco-headless", "--ticks"]).is_err());
        assert!(Args::try_parse_from(["telco-headless", "--seed", "abc"]).is_err());
    }

    #[test]
    fn headquarters_sit_on_intersections() {
        let hqs = headquarters(48, 4).unwrap();
        assert_eq!(hqs[0].min, TilePosition::new(0, 0));
        assert_eq!(hqs[1].min, TilePosition::new(44, 44));
        assert!(hqs.iter().all(|r| r.min.x % 4 == 0 && r.min.y % 4 == 0 && r.max.x < 48));
        assert!(headquarters(48, 5).is_err());
    }

    #[test]
    fn bundled_data_runs_a_short_game() {
        let args = Args::try_parse_from([
            "telco-headless",
            "--ticks",
            "200",
            "--customers",
            "50",
            "--size",
            "24",
        ])
        .unwrap();
        run(args).unwrap();
    }
}
