//! Sizes the truck fleet and the call center to their queues.

use telco_core::company::Company;
use telco_core::config::AiConfig;
use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks, clamp_unit};
use telco_core::rng::SimRng;
use tracing::debug;

use crate::agent::{Agent, Cooldown, PURCHASE_SCORE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Staffing {
    HireTruck,
    SellTruck,
    HireCallAgent,
    FireCallAgent,
}

pub struct PersonnelAgent {
    cooldown: Cooldown,
    queue_threshold: usize,
    fire_chance_per_unit: Fixed64,
    staged: Option<Staffing>,
}

impl PersonnelAgent {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            cooldown: Cooldown::new(config.standard_cooldown),
            queue_threshold: config.hire_queue_threshold,
            fire_chance_per_unit: Fixed64::from_num(config.fire_chance_per_unit),
            staged: None,
        }
    }

    fn wants_hire(&self, queued: usize, headcount: usize, cost: Fixed64, money: Fixed64) -> bool {
        let backlog = queued > self.queue_threshold || (headcount == 0 && queued > 0);
        backlog && money > cost.saturating_mul(Fixed64::from_num(2))
    }

    fn wants_fire(&self, queued: usize, headcount: usize, rng: &mut SimRng) -> bool {
        if queued > 0 || headcount <= 1 {
            return false;
        }
        let chance = clamp_unit(self.fire_chance_per_unit.saturating_mul(Fixed64::from_num(headcount)));
        rng.chance(chance)
    }

    fn choose(&self, company: &Company, rng: &mut SimRng) -> Option<Staffing> {
        let rules = company.rules();
        let installs = company.install_queue().len();
        let calls = company.call_center().queue.len();

        if self.wants_hire(installs, company.truck_count(), rules.truck_cost, company.money()) {
            return Some(Staffing::HireTruck);
        }
        if self.wants_hire(calls, company.call_agent_count(), rules.call_agent_cost, company.money()) {
            return Some(Staffing::HireCallAgent);
        }
        if self.wants_fire(installs, company.truck_count(), rng) {
            return Some(Staffing::SellTruck);
        }
        if self.wants_fire(calls, company.call_agent_count(), rng) {
            return Some(Staffing::FireCallAgent);
        }
        None
    }
}

impl Agent for PersonnelAgent {
    fn name(&self) -> &'static str {
        "personnel"
    }

    fn score(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) -> Fixed64 {
        if self.staged.is_some() {
            return PURCHASE_SCORE;
        }
        if !self.cooldown.tick(dt) {
            return Fixed64::ZERO;
        }
        match self.choose(ctx.company, ctx.rng) {
            Some(staffing) => {
                self.staged = Some(staffing);
                PURCHASE_SCORE
            }
            None => {
                self.cooldown.reset(ctx.rng);
                Fixed64::ZERO
            }
        }
    }

    fn execute(&mut self, ctx: &mut ControlContext<'_>, _dt: Ticks) -> bool {
        let company = &mut *ctx.company;
        match self.staged.take() {
            Some(Staffing::HireTruck) => {
                if let Err(err) = company.buy_truck() {
                    debug!(company = company.id().0, %err, "truck not bought");
                }
            }
            Some(Staffing::HireCallAgent) => {
                if let Err(err) = company.hire_call_agent() {
                    debug!(company = company.id().0, %err, "call agent not hired");
                }
            }
            Some(Staffing::SellTruck) => {
                company.sell_truck();
            }
            Some(Staffing::FireCallAgent) => {
                company.fire_call_agent();
            }
            None => {}
        }
        self.cooldown.reset(ctx.rng);
        true
    }
}
