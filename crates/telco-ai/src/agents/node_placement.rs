//! Places nodes on active networks: first on networks without any node,
//! then on cable tiles that no node reaches yet.

use telco_core::company::Company;
use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks};
use telco_core::id::ItemId;
use telco_core::item::{Item, ItemCatalog, ItemKind};
use telco_core::network::Network;
use telco_core::rng::SimRng;
use telco_core::service::CableType;
use telco_spatial::TilePosition;
use tracing::debug;

use super::unlocked;
use crate::agent::{Agent, Cooldown, NODE_SCORE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StagedNode {
    item: ItemId,
    position: TilePosition,
}

pub struct NodePlacementAgent {
    cooldown: Cooldown,
    retries: u32,
    staged: Option<StagedNode>,
}

impl NodePlacementAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.fast_cooldown),
            retries: config.node_sample_retries,
            staged: None,
        }
    }

    fn choose(&self, company: &Company, catalog: &ItemCatalog, rng: &mut SimRng) -> Option<StagedNode> {
        let candidates: Vec<(&Network, &Item)> = company
            .networks()
            .iter()
            .filter(|n| n.active)
            .filter_map(|n| best_node(company, catalog, n.cable_type).map(|item| (n, item)))
            .filter(|(_, item)| company.money() > item.cost)
            .collect();

        if let Some((network, item)) = candidates.iter().find(|(n, _)| n.nodes.is_empty()) {
            let idx = rng.below(network.footprint.len() as u64) as usize;
            let position = network.footprint.iter().nth(idx).copied()?;
            return Some(StagedNode { item: item.id, position });
        }

        for _ in 0..self.retries {
            let (network, item) = rng.pick(&candidates)?;
            let Some(cable) = rng.pick(&network.cables).and_then(|id| company.cable(*id)) else {
                continue;
            };
            let Some(position) = rng.pick(&cable.positions).copied() else {
                continue;
            };
            let covered = company.nodes().values().any(|node| {
                let range = node.range as i64;
                node.position.distance_squared(&position) <= range * range
            });
            if !covered {
                return Some(StagedNode { item: item.id, position });
            }
        }
        None
    }
}

/// The longest-reaching unlocked node for a medium, cheaper on ties.
fn best_node<'a>(company: &'a Company, catalog: &'a ItemCatalog, cable_type: CableType) -> Option<&'a Item> {
    unlocked(company, catalog, ItemKind::Node)
        .filter(|item| item.cable_type() == Some(cable_type))
        .min_by(|a, b| b.range.cmp(&a.range).then(a.cost.cmp(&b.cost)))
}

impl Agent for NodePlacementAgent {
    fn name(&self) -> &'static str {
        "node_placement"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.staged.is_some() {
            return NODE_SCORE;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        match self.choose(ctx.company, ctx.catalog, ctx.rng) {
            Some(staged) => {
                self.staged = Some(staged);
                NODE_SCORE
            }
            None => {
                self.cooldown.reset(ctx.rng);
                Fixed64::ZERO
            }
        }
    }

    fn execute(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) -> bool {
        if let Some(staged) = self.staged.take() {
            let cost = ctx.catalog.get(staged.item).map_or(Fixed64::MAX, |i| i.cost);
            if ctx.company.money() > cost {
                match ctx.company.place_node(ctx.catalog, staged.item, staged.position) {
                    Ok(_) => {
                        ctx.refresh();
                    }
                    Err(err) => debug!(company = ctx.company.id().0, %err, "node not placed"),
                }
            }
        }
        self.cooldown.reset(ctx.rng);
        true
    }
}
