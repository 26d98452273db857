//! Field trucks and the call center.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::id::{CustomerId, TruckId};

/// Work in progress for one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub customer: CustomerId,
    /// Ticks until the job completes.
    pub remaining: Ticks,
}

impl Job {
    /// Advance by `dt`. Returns the customer once the job is done.
    fn advance(&mut self, dt: Ticks) -> Option<CustomerId> {
        self.remaining = self.remaining.saturating_sub(dt);
        (self.remaining == 0).then_some(self.customer)
    }
}

/// A service truck that drives out to install customer equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub job: Option<Job>,
}

impl Truck {
    pub fn is_idle(&self) -> bool {
        self.job.is_none()
    }

    pub(crate) fn advance(&mut self, dt: Ticks) -> Option<CustomerId> {
        let done = self.job.as_mut().and_then(|job| job.advance(dt));
        if done.is_some() {
            self.job = None;
        }
        done
    }
}

/// A call-center employee resolving outage calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAgent {
    pub job: Option<Job>,
}

impl CallAgent {
    pub fn is_idle(&self) -> bool {
        self.job.is_none()
    }

    pub(crate) fn advance(&mut self, dt: Ticks) -> Option<CustomerId> {
        let done = self.job.as_mut().and_then(|job| job.advance(dt));
        if done.is_some() {
            self.job = None;
        }
        done
    }
}

/// Outage calls waiting for an agent, and the agents answering them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCenter {
    pub agents: Vec<CallAgent>,
    pub queue: VecDeque<CustomerId>,
}

impl CallCenter {
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Drop every trace of a customer: queued calls and calls in progress.
    pub(crate) fn forget(&mut self, customer: CustomerId) {
        self.queue.retain(|c| *c != customer);
        for agent in &mut self.agents {
            if agent.job.is_some_and(|job| job.customer == customer) {
                agent.job = None;
            }
        }
    }
}

/// Customers whose staff work finished during one staff phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffReport {
    /// Trucks that reached a pending customer.
    pub arrivals: Vec<CustomerId>,
    /// Outage calls that were resolved.
    pub resolved: Vec<CustomerId>,
}
