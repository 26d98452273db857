use telco_core::controller::ControlContext;
use telco_core::fixed::{Fixed64, Ticks};

use crate::agent::Agent;

/// Template for new agents. Never wants the slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoilerplateAgent;

impl Agent for BoilerplateAgent {
    fn name(&self) -> &'static str {
        "boilerplate"
    }

    fn score(&mut self, _ctx: &mut ControlContext<'_>, _dt: Ticks) -> Fixed64 {
        Fixed64::ZERO
    }

    fn execute(&mut self, _ctx: &mut ControlContext<'_>, _dt: Ticks) -> bool {
        true
    }
}
