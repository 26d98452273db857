//! Technology research for telecom companies.
//!
//! Each company owns a [`TechTree`]: the shared technology definitions plus
//! that company's research progress. Technologies form a prerequisite DAG;
//! a technology becomes *available* once every prerequisite is completed.
//!
//! Research is paid in points. Game code starts a research with
//! [`TechTree::start_research`] and feeds points each tick with
//! [`TechTree::contribute_points`]. Only one technology is researched at a
//! time. Completed technologies gate which catalog items may be bought.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Simulation time unit, matching the core engine's tick counter.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies a technology in the tech tree. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

// ---------------------------------------------------------------------------
// Technology definition
// ---------------------------------------------------------------------------

/// A technology that can be researched. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    /// Unique identifier.
    pub id: TechId,

    /// Human-readable name.
    pub name: String,

    /// Technologies that must be completed before this one can start.
    pub prerequisites: Vec<TechId>,

    /// Research points required to complete.
    pub cost: u32,
}

// ---------------------------------------------------------------------------
// Research state (runtime)
// ---------------------------------------------------------------------------

/// The current state of research for a single technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchState {
    NotStarted,
    /// Research is underway with this many points accumulated.
    InProgress(u32),
    Completed,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the tech tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TechEvent {
    ResearchStarted { tech_id: TechId, tick: Ticks },
    ResearchCompleted { tech_id: TechId, tick: Ticks },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during tech tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TechTreeError {
    #[error("technology not found: {0:?}")]
    TechNotFound(TechId),

    #[error("prerequisite not met: {0:?} requires {1:?}")]
    PrerequisiteNotMet(TechId, TechId),

    #[error("technology {0:?} is already being researched")]
    AlreadyInProgress(TechId),

    #[error("technology {0:?} is already completed")]
    AlreadyCompleted(TechId),

    #[error("another technology ({0:?}) is being researched")]
    Busy(TechId),

    #[error("duplicate technology id: {0:?}")]
    DuplicateId(TechId),

    #[error("prerequisite {prereq:?} for technology {tech:?} does not exist")]
    InvalidPrerequisite { tech: TechId, prereq: TechId },

    #[error("technology {0:?} is not being researched")]
    NotInProgress(TechId),
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// Technology definitions and one company's research state.
///
/// Ordered maps keep [`TechTree::available`] deterministic, which matters
/// because AI agents pick from it with the shared simulation RNG.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechTree {
    technologies: BTreeMap<TechId, Technology>,
    states: BTreeMap<TechId, ResearchState>,

    /// Events emitted since last drain. Not serialized (transient).
    #[serde(skip)]
    events: Vec<TechEvent>,
}

impl TechTree {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration API --

    /// Register a technology. Prerequisites must be registered first, which
    /// also rules out cycles.
    pub fn register(&mut self, tech: Technology) -> Result<TechId, TechTreeError> {
        let id = tech.id;

        if self.technologies.contains_key(&id) {
            return Err(TechTreeError::DuplicateId(id));
        }

        for prereq in &tech.prerequisites {
            if !self.technologies.contains_key(prereq) {
                return Err(TechTreeError::InvalidPrerequisite {
                    tech: id,
                    prereq: *prereq,
                });
            }
        }

        self.technologies.insert(id, tech);
        self.states.insert(id, ResearchState::NotStarted);
        Ok(id)
    }

    /// A copy of the definitions with all research reset. Used to hand each
    /// company its own tree from a shared template.
    pub fn fresh_copy(&self) -> TechTree {
        TechTree {
            technologies: self.technologies.clone(),
            states: self
                .technologies
                .keys()
                .map(|id| (*id, ResearchState::NotStarted))
                .collect(),
            events: Vec::new(),
        }
    }

    // -- Query API --

    pub fn get_technology(&self, id: TechId) -> Option<&Technology> {
        self.technologies.get(&id)
    }

    pub fn get_state(&self, id: TechId) -> Option<ResearchState> {
        self.states.get(&id).copied()
    }

    pub fn technology_count(&self) -> usize {
        self.technologies.len()
    }

    /// Check whether all prerequisites for a technology are completed.
    pub fn prerequisites_met(&self, id: TechId) -> Result<bool, TechTreeError> {
        let tech = self
            .technologies
            .get(&id)
            .ok_or(TechTreeError::TechNotFound(id))?;
        Ok(tech.prerequisites.iter().all(|p| self.is_completed(*p)))
    }

    pub fn is_completed(&self, id: TechId) -> bool {
        matches!(self.states.get(&id), Some(ResearchState::Completed))
    }

    /// The technology currently being researched, if any.
    pub fn current_research(&self) -> Option<TechId> {
        self.states
            .iter()
            .find(|(_, state)| matches!(state, ResearchState::InProgress(_)))
            .map(|(id, _)| *id)
    }

    /// Technologies that could be started now: not started, not completed,
    /// and every prerequisite completed. Sorted by id.
    pub fn available(&self) -> Vec<TechId> {
        self.technologies
            .values()
            .filter(|tech| matches!(self.states.get(&tech.id), Some(ResearchState::NotStarted)))
            .filter(|tech| tech.prerequisites.iter().all(|p| self.is_completed(*p)))
            .map(|tech| tech.id)
            .collect()
    }

    // -- Research actions --

    /// Start researching a technology. Emits `ResearchStarted` on success.
    pub fn start_research(&mut self, id: TechId, tick: Ticks) -> Result<(), TechTreeError> {
        let tech = self
            .technologies
            .get(&id)
            .ok_or(TechTreeError::TechNotFound(id))?;

        for prereq in &tech.prerequisites {
            if !self.is_completed(*prereq) {
                return Err(TechTreeError::PrerequisiteNotMet(id, *prereq));
            }
        }

        match self.states.get(&id) {
            Some(ResearchState::InProgress(_)) => {
                return Err(TechTreeError::AlreadyInProgress(id));
            }
            Some(ResearchState::Completed) => {
                return Err(TechTreeError::AlreadyCompleted(id));
            }
            _ => {}
        }

        if let Some(current) = self.current_research() {
            return Err(TechTreeError::Busy(current));
        }

        self.states.insert(id, ResearchState::InProgress(0));
        self.events
            .push(TechEvent::ResearchStarted { tech_id: id, tick });
        Ok(())
    }

    /// Add points to the current research. Returns the points actually
    /// consumed; completes the technology once its cost is reached.
    pub fn contribute_points(&mut self, points: u32, tick: Ticks) -> Result<u32, TechTreeError> {
        let Some(id) = self.current_research() else {
            return Ok(0);
        };
        let required = self
            .technologies
            .get(&id)
            .ok_or(TechTreeError::TechNotFound(id))?
            .cost;

        let state = self
            .states
            .get_mut(&id)
            .ok_or(TechTreeError::TechNotFound(id))?;
        let ResearchState::InProgress(current) = state else {
            return Err(TechTreeError::NotInProgress(id));
        };

        let remaining = required.saturating_sub(*current);
        let to_consume = points.min(remaining);
        *current += to_consume;

        if *current >= required {
            *state = ResearchState::Completed;
            self.events
                .push(TechEvent::ResearchCompleted { tech_id: id, tick });
        }

        Ok(to_consume)
    }

    /// Progress of the current research as (accumulated, required).
    pub fn progress(&self) -> Option<(TechId, u32, u32)> {
        let id = self.current_research()?;
        let required = self.technologies.get(&id)?.cost;
        match self.states.get(&id)? {
            ResearchState::InProgress(points) => Some((id, *points, required)),
            _ => None,
        }
    }

    // -- Event API --

    /// Drain all pending events. Returns events and clears the internal list.
    pub fn drain_events(&mut self) -> Vec<TechEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[TechEvent] {
        &self.events
    }
}
