//! Greedy single-slot scheduler over a company's agents.
//!
//! While idle, every agent scores itself and the strictly highest positive
//! score wins; ties go to the agent listed first. The winner then owns the
//! slot and is the only agent executed until it reports its job done.

use telco_core::config::AiConfig;
use telco_core::controller::{CompanyController, ControlContext};
use telco_core::fixed::{Fixed64, Ticks};
use tracing::debug;

use crate::agent::Agent;
use crate::agents::{
    BoilerplateAgent, CablePlacementAgent, CpeAgent, EquipmentAgent, NodePlacementAgent,
    PersonnelAgent, TechnologyAgent,
};

pub struct Executor {
    agents: Vec<Box<dyn Agent>>,
    /// Index of the agent holding the slot; `None` while selecting.
    current: Option<usize>,
    /// Ticks since the current agent was selected.
    last_execution_time: Ticks,
}

impl Executor {
    pub fn new(agents: Vec<Box<dyn Agent>>) -> Self {
        Self {
            agents,
            current: None,
            last_execution_time: 0,
        }
    }

    /// The seven standard agents in their fixed order.
    pub fn standard(config: &AiConfig) -> Self {
        Self::new(vec![
            Box::new(CpeAgent::new(config)),
            Box::new(EquipmentAgent::new(config)),
            Box::new(PersonnelAgent::new(config)),
            Box::new(TechnologyAgent::new(config)),
            Box::new(NodePlacementAgent::new(config)),
            Box::new(CablePlacementAgent::new(config)),
            Box::new(BoilerplateAgent),
        ])
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_agent(&self) -> Option<&'static str> {
        self.current.and_then(|i| self.agents.get(i)).map(|a| a.name())
    }

    pub fn last_execution_time(&self) -> Ticks {
        self.last_execution_time
    }

    pub fn agent_names(&self) -> Vec<&'static str> {
        self.agents.iter().map(|a| a.name()).collect()
    }
}

impl CompanyController for Executor {
    fn name(&self) -> &str {
        "executor"
    }

    fn update(&mut self, ctx: &mut ControlContext<'_>, dt: Ticks) {
        self.last_execution_time = self.last_execution_time.saturating_add(dt);

        if let Some(idx) = self.current {
            match self.agents.get_mut(idx) {
                Some(agent) => {
                    if agent.execute(ctx, dt) {
                        debug!(company = ctx.company.id().0, agent = agent.name(), "agent finished");
                        self.current = None;
                    }
                }
                None => self.current = None,
            }
            return;
        }

        let mut best: Option<(usize, Fixed64)> = None;
        for (idx, agent) in self.agents.iter_mut().enumerate() {
            let score = agent.score(ctx, dt);
            if score > best.map_or(Fixed64::ZERO, |(_, s)| s) {
                best = Some((idx, score));
            }
        }
        if let Some((idx, score)) = best {
            debug!(
                company = ctx.company.id().0,
                agent = self.agents[idx].name(),
                score = score.to_num::<f64>(),
                "agent selected"
            );
            self.current = Some(idx);
            self.last_execution_time = 0;
        }
    }
}
