//! Keeps research going: when idle, starts a random available technology.

use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks};
use telco_tech_tree::TechId;
use tracing::{debug, info};

use crate::agent::{Agent, Cooldown, PURCHASE_SCORE};

pub struct TechnologyAgent {
    cooldown: Cooldown,
    staged: Option<TechId>,
}

impl TechnologyAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.standard_cooldown),
            staged: None,
        }
    }
}

impl Agent for TechnologyAgent {
    fn name(&self) -> &'static str {
        "technology"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.staged.is_some() {
            return PURCHASE_SCORE;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        let tech = ctx.company.tech();
        let choice = if tech.current_research().is_some() {
            None
        } else {
            ctx.rng.pick(&tech.available()).copied()
        };
        match choice {
            Some(id) => {
                self.staged = Some(id);
                PURCHASE_SCORE
            }
            None => {
                self.cooldown.reset(ctx.rng);
                Fixed64::ZERO
            }
        }
    }

    fn execute(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) -> bool {
        if let Some(id) = self.staged.take() {
            match ctx.company.start_research(id, ctx.tick) {
                Ok(()) => info!(company = ctx.company.id().0, tech = id.0, "research started"),
                Err(err) => debug!(company = ctx.company.id().0, tech = id.0, %err, "research not started"),
            }
        }
        self.cooldown.reset(ctx.rng);
        true
    }
}
