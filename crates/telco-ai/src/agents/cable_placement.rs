//! Grows the network toward the richest unserved neighbourhood.
//!
//! Scoring looks from the edge of the company's active networks (or its
//! headquarters, before the first cable) in each compass direction, values
//! the rectangle beyond by the income of customers not yet served there,
//! and plans a handful of road targets in the best one. Execution then lays
//! one cable per target over several steps, pausing in proportion to the
//! length of each run.

use std::collections::{BTreeSet, VecDeque};

use telco_core::company::Company;
use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::customer::Market;
use telco_core::fixed::{Fixed64, Ticks};
use telco_core::id::ItemId;
use telco_core::item::{Item, ItemCatalog, ItemKind};
use telco_core::service::CableType;
use telco_spatial::{Direction, MapService, Orientation, Rect, TilePosition};
use tracing::{debug, info, warn};

use super::unlocked;
use crate::agent::{Agent, CABLE_SCORE_CAP, Cooldown};

/// Income of customers inside `rect` that the company does not serve yet.
/// Customers already inside a competitor's potential area count `penalty`
/// times their income.
pub fn area_potential_score(
    market: &Market,
    company: &Company,
    competitors: &[&Company],
    rect: &Rect,
    penalty: Fixed64,
) -> Fixed64 {
    market
        .customers()
        .filter(|c| rect.contains(c.home))
        .filter(|c| !company.service_area().contains_key(&c.home))
        .map(|c| {
            let contested = competitors
                .iter()
                .any(|rival| rival.potential_service_area().contains_key(&c.home));
            if contested {
                c.income.saturating_mul(penalty)
            } else {
                c.income
            }
        })
        .fold(Fixed64::ZERO, |acc, v| acc.saturating_add(v))
}

#[derive(Debug, Clone)]
struct CablePlan {
    item: ItemId,
    direction: Direction,
    /// Tiles cables have been laid on, starting with the origin.
    laid: Vec<TilePosition>,
    targets: VecDeque<TilePosition>,
    /// Ticks to wait before the next run.
    pace: Ticks,
}

pub struct CablePlacementAgent {
    cooldown: Cooldown,
    expansion_ratio: Fixed64,
    competitor_penalty: Fixed64,
    budget_guard: Fixed64,
    distance: u32,
    spacing: i32,
    max_targets: usize,
    plan: Option<CablePlan>,
    plan_score: Fixed64,
}

impl CablePlacementAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.standard_cooldown),
            expansion_ratio: Fixed64::from_num(config.expansion_ratio),
            competitor_penalty: Fixed64::from_num(config.competitor_penalty),
            budget_guard: Fixed64::from_num(config.budget_guard),
            distance: config.expansion_distance,
            spacing: config.segment_spacing.max(1) as i32,
            max_targets: config.max_targets,
            plan: None,
            plan_score: Fixed64::ZERO,
        }
    }

    /// Whether enough of the potential area is actually served to expand.
    fn caught_up(&self, company: &Company) -> bool {
        let potential = company.potential_service_area().len();
        if potential == 0 {
            return true;
        }
        let served = Fixed64::from_num(company.service_area().len());
        served >= self.expansion_ratio.saturating_mul(Fixed64::from_num(potential))
    }

    fn choose(&self, ctx: &ControlContext<'_>) -> Option<(CablePlan, Fixed64)> {
        let company = &*ctx.company;
        if !self.caught_up(company) {
            return None;
        }

        let origins = origins(company, ctx.map);
        let mut best: Option<(Direction, TilePosition, Option<CableType>, Rect, Fixed64)> = None;
        for direction in Direction::all() {
            let Some((origin, cable_type)) = extreme(&origins, direction) else {
                continue;
            };
            let Some(rect) = ctx.map.area_in_direction(origin, direction, self.distance) else {
                continue;
            };
            let score = area_potential_score(ctx.market, company, &ctx.competitors, &rect, self.competitor_penalty);
            if score > best.as_ref().map_or(Fixed64::ZERO, |b| b.4) {
                best = Some((direction, origin, cable_type, rect, score));
            }
        }
        let (direction, origin, cable_type, rect, score) = best?;

        let item = cable_item(company, ctx.catalog, cable_type)?;
        if company.money() <= item.cost {
            return None;
        }

        let orientation = ctx.map.road_orientation(&rect).unwrap_or(direction.orientation());
        let targets = self.targets(company, ctx.map, origin, direction, orientation, &rect);
        if targets.is_empty() {
            return None;
        }

        let plan = CablePlan {
            item: item.id,
            direction,
            laid: vec![origin],
            targets,
            pace: 0,
        };
        Some((plan, score.min(CABLE_SCORE_CAP)))
    }

    /// Road points to run cables to, snapped to the nearest passable tile.
    fn targets(
        &self,
        company: &Company,
        map: &dyn MapService,
        origin: TilePosition,
        direction: Direction,
        orientation: Orientation,
        rect: &Rect,
    ) -> VecDeque<TilePosition> {
        let s = self.spacing;
        let reach = (self.distance as i32 / s).max(1);
        let [left, right] = sideways(direction);

        let mut raw = Vec::new();
        if orientation == direction.orientation() {
            // Along the road: points ahead, then the same points one block aside.
            let ahead: Vec<_> = (1..=reach).map(|i| origin.step(direction, i * s)).collect();
            raw.extend(ahead.iter().copied());
            for p in &ahead {
                raw.push(p.step(left, s));
                raw.push(p.step(right, s));
            }
        } else {
            // Across: spread along the first cross road, then the next one out.
            let base = origin.step(direction, s);
            let mut row = vec![base];
            for i in 1..=reach {
                row.push(base.step(left, i * s));
                row.push(base.step(right, i * s));
            }
            raw.extend(row.iter().copied());
            raw.extend(row.iter().map(|p| p.step(direction, s)));
        }

        let laid: BTreeSet<TilePosition> = company
            .cables()
            .values()
            .flat_map(|c| c.positions.iter().copied())
            .collect();
        let mut seen = BTreeSet::new();
        raw.into_iter()
            .filter_map(|p| map.nearest_valid(p))
            .filter(|p| rect.contains(*p) && !laid.contains(p))
            .filter(|p| seen.insert(*p))
            .take(self.max_targets)
            .collect()
    }

    fn finish(&mut self, ctx: &mut ControlContext<'_>) -> bool {
        self.plan = None;
        self.plan_score = Fixed64::ZERO;
        self.cooldown.reset(ctx.rng);
        true
    }
}

/// Where new cables may start: passable tiles of active networks with their
/// medium, or the headquarters connectors before any network is live.
fn origins(company: &Company, map: &dyn MapService) -> Vec<(TilePosition, Option<CableType>)> {
    let active: Vec<_> = company.networks().iter().filter(|n| n.active).collect();
    if active.is_empty() {
        return company
            .connectors()
            .into_iter()
            .filter(|p| map.is_passable(*p))
            .map(|p| (p, None))
            .collect();
    }
    active
        .iter()
        .flat_map(|n| {
            n.footprint
                .iter()
                .filter(|p| map.is_passable(**p))
                .map(|p| (*p, Some(n.cable_type)))
        })
        .collect()
}

/// The origin furthest along `direction`; the first one wins ties.
fn extreme(
    origins: &[(TilePosition, Option<CableType>)],
    direction: Direction,
) -> Option<(TilePosition, Option<CableType>)> {
    let (dx, dy) = direction.offset();
    let mut best: Option<((TilePosition, Option<CableType>), i32)> = None;
    for origin in origins {
        let projection = origin.0.x * dx + origin.0.y * dy;
        if best.is_none_or(|(_, p)| projection > p) {
            best = Some((*origin, projection));
        }
    }
    best.map(|(origin, _)| origin)
}

fn sideways(direction: Direction) -> [Direction; 2] {
    match direction.orientation() {
        Orientation::Vertical => [Direction::West, Direction::East],
        Orientation::Horizontal => [Direction::North, Direction::South],
    }
}

/// The cheapest unlocked cable of the network's medium. For a first network,
/// the cable whose medium carries the most services, then the cheapest.
fn cable_item<'a>(company: &'a Company, catalog: &'a ItemCatalog, cable_type: Option<CableType>) -> Option<&'a Item> {
    let cables = unlocked(company, catalog, ItemKind::Cable);
    match cable_type {
        Some(ct) => cables
            .filter(|item| item.cable_type() == Some(ct))
            .min_by(|a, b| a.cost.cmp(&b.cost)),
        None => cables.min_by(|a, b| {
            let breadth = |i: &Item| i.cable_type().map_or(0, |ct| ct.services().len());
            breadth(b).cmp(&breadth(a)).then(a.cost.cmp(&b.cost))
        }),
    }
}

impl Agent for CablePlacementAgent {
    fn name(&self) -> &'static str {
        "cable_placement"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.plan.is_some() {
            return self.plan_score;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        match self.choose(ctx) {
            Some((plan, score)) => {
                debug!(
                    company = ctx.company.id().0,
                    direction = ?plan.direction,
                    targets = plan.targets.len(),
                    "cable plan staged"
                );
                self.plan = Some(plan);
                self.plan_score = score;
                score
            }
            None => {
                self.cooldown.reset(ctx.rng);
                Fixed64::ZERO
            }
        }
    }

    fn execute(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> bool {
        let guard = self.budget_guard;
        let Some(plan) = self.plan.as_mut() else {
            return self.finish(ctx);
        };
        if plan.pace > dt {
            plan.pace -= dt;
            return false;
        }
        plan.pace = 0;

        let Some(target) = plan.targets.pop_front() else {
            return self.finish(ctx);
        };
        let Some(start) = plan
            .laid
            .iter()
            .copied()
            .min_by_key(|p| p.manhattan_distance(&target))
        else {
            return self.finish(ctx);
        };
        let Some(path) = ctx.map.pathfind(start, target) else {
            warn!(company = ctx.company.id().0, %target, "no route to cable target");
            return self.finish(ctx);
        };
        if path.len() >= 2 {
            let unit = ctx.catalog.get(plan.item).map_or(Fixed64::MAX, |i| i.cost);
            let cost = unit.saturating_mul(Fixed64::from_num(path.len()));
            if cost > ctx.company.money().saturating_mul(guard) {
                warn!(company = ctx.company.id().0, cost = cost.to_num::<f64>(), "cable run over budget");
                return self.finish(ctx);
            }
            let tiles = path.len();
            if let Err(err) = ctx.company.place_cable(ctx.catalog, plan.item, path.clone()) {
                warn!(company = ctx.company.id().0, %err, "cable not placed");
                return self.finish(ctx);
            }
            info!(company = ctx.company.id().0, from = %start, to = %target, tiles, "cable laid");
            plan.laid.extend(path);
            ctx.refresh();
            plan.pace = (tiles as Ticks).saturating_mul(ctx.rng.range_u64(1, 3));
        }

        if plan.targets.is_empty() {
            return self.finish(ctx);
        }
        false
    }
}
