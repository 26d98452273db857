//! The seam between the simulation and whatever drives a company.
//!
//! A [`CompanyController`] runs once per step in the control phase. It sees
//! its own company mutably and every competitor read-only, after all
//! companies finished recalculating for the step.

use telco_spatial::MapService;

use crate::company::Company;
use crate::config::SimConfig;
use crate::customer::Market;
use crate::fixed::Ticks;
use crate::item::ItemCatalog;
use crate::rng::SimRng;

/// Everything a controller may look at or change during its turn.
pub struct ControlContext<'a> {
    pub company: &'a mut Company,
    pub competitors: Vec<&'a Company>,
    pub market: &'a Market,
    pub map: &'a dyn MapService,
    pub catalog: &'a ItemCatalog,
    pub config: &'a SimConfig,
    /// The game's single RNG stream.
    pub rng: &'a mut SimRng,
    pub tick: Ticks,
}

impl ControlContext<'_> {
    /// Bring the own company's networks and service areas up to date after
    /// placing or removing infrastructure. Returns whether anything was
    /// recomputed.
    pub fn refresh(&mut self) -> bool {
        self.company.recalculate(self.map, self.catalog)
    }
}

/// Drives one company. Implemented by the AI executor; a human frontend
/// would implement it too.
pub trait CompanyController {
    fn name(&self) -> &str;

    fn update(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::CompanyId;
    use crate::test_utils::*;
    use telco_spatial::TileMap;

    struct LayCable {
        item: crate::id::ItemId,
    }

    impl CompanyController for LayCable {
        fn name(&self) -> &str {
            "lay-cable"
        }

        fn update(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) {
            ctx.company
                .place_cable(ctx.catalog, self.item, straight(pos(0, 0), pos(0, 5)))
                .unwrap();
        }
    }

    #[test]
    fn refresh_recalculates_own_company() {
        let map = TileMap::new(10, 10);
        let cat = TestCatalog::new();
        let config = SimConfig::default();
        let market = Market::new();
        let mut rng = SimRng::new(1);
        let mut company = test_company(CompanyId(0), hq_at(0, 0));
        let mut controller = LayCable {
            item: cat.copper_cable,
        };

        let mut ctx = ControlContext {
            company: &mut company,
            competitors: Vec::new(),
            market: &market,
            map: &map,
            catalog: &cat.catalog,
            config: &config,
            rng: &mut rng,
            tick: 0,
        };
        controller.update(&mut ctx, 1);
        assert!(ctx.company.is_dirty());
        assert!(ctx.refresh());
        assert!(!ctx.refresh());
        assert_eq!(ctx.company.networks().len(), 1);
        assert_eq!(controller.name(), "lay-cable");
    }
}
