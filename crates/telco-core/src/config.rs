//! Simulation tunables.
//!
//! Every section deserializes with `#[serde(default)]`, so a config file only
//! needs the values it overrides. Ratios are stored as `f64` for readable
//! files and converted to [`Fixed64`] where they are used.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Ticks};

/// Top-level configuration for a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub market: MarketConfig,
    pub company: CompanyConfig,
    pub ai: AiConfig,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Customer behaviour constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Base cooldown after a customer drops its provider.
    pub churn_cooldown: Ticks,
    /// Lower bound of the random cooldown factor; the upper bound is 1.
    pub churn_cooldown_min_factor: f64,
    /// Gate chance for a subscribed customer to consider switching.
    pub subscribed_base_churn: f64,
    /// Gate chance for a customer in outage to consider switching.
    pub outage_base_churn: f64,
    /// Per-update chance of a subscribed customer suffering an outage.
    pub outage_chance: f64,
    /// Floor of the dissatisfaction term in the churn formula.
    pub churn_floor: f64,
    /// Invocations for the time ramp to go from 0 to 1.
    pub ramp_invocations: u32,
    /// Dissatisfaction above `1 / this` rules out signing up.
    pub signup_dissatisfaction_factor: f64,
    /// Dissatisfaction per tick (times patience) while in outage.
    pub outage_drift: f64,
    /// Dissatisfaction per tick (times patience) while pending.
    pub pending_drift: f64,
    /// Dissatisfaction relief per tick (times provider satisfaction) while subscribed.
    pub subscribed_relief: f64,
    /// Dissatisfaction relief per tick without a provider.
    pub idle_relief: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            churn_cooldown: 75,
            churn_cooldown_min_factor: 0.25,
            subscribed_base_churn: 0.05,
            outage_base_churn: 0.25,
            outage_chance: 0.002,
            churn_floor: 0.1,
            ramp_invocations: 50,
            signup_dissatisfaction_factor: 5.0,
            outage_drift: 0.002,
            pending_drift: 0.0005,
            subscribed_relief: 0.0005,
            idle_relief: 0.0001,
        }
    }
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// Company economy and staffing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyConfig {
    pub starting_money: f64,
    pub max_racks: u32,
    /// Coverage radius around every tile of an active cable.
    pub cable_service_radius: u32,
    pub truck_cost: f64,
    pub call_agent_cost: f64,
    /// Wages per billing interval.
    pub truck_wage: f64,
    pub call_agent_wage: f64,
    /// Ticks for a truck to leave the depot.
    pub truck_base_ticks: Ticks,
    /// Additional ticks per tile between headquarters and customer.
    pub truck_ticks_per_tile: Ticks,
    /// Ticks a call-center agent spends on one outage call.
    pub call_duration: Ticks,
    pub billing_interval: Ticks,
    /// Backhaul throughput consumed by each broadband subscriber.
    pub broadband_usage: u32,
    pub research_points_per_tick: u32,
    pub phone_price: f64,
    pub television_price: f64,
    pub broadband_price: f64,
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            starting_money: 10_000.0,
            max_racks: 4,
            cable_service_radius: 1,
            truck_cost: 500.0,
            call_agent_cost: 300.0,
            truck_wage: 40.0,
            call_agent_wage: 25.0,
            truck_base_ticks: 10,
            truck_ticks_per_tile: 1,
            call_duration: 20,
            billing_interval: 100,
            broadband_usage: 1,
            research_points_per_tick: 1,
            phone_price: 10.0,
            television_price: 20.0,
            broadband_price: 30.0,
        }
    }
}

impl CompanyConfig {
    pub fn starting_money(&self) -> Fixed64 {
        Fixed64::from_num(self.starting_money)
    }
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

/// Constants for the AI executor and its agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub minimum_cooldown: Ticks,
    pub fast_cooldown: Ticks,
    pub standard_cooldown: Ticks,
    /// Service area over potential area required before expanding further.
    pub expansion_ratio: f64,
    /// Weight of customers already reachable by a competitor.
    pub competitor_penalty: f64,
    /// Largest share of cash a single cable segment may cost.
    pub budget_guard: f64,
    /// Depth of the rectangles scored when choosing a direction.
    pub expansion_distance: u32,
    /// Spacing between cable targets along a road.
    pub segment_spacing: u32,
    pub max_targets: usize,
    /// Random positions tried when looking for an uncovered cable tile.
    pub node_sample_retries: u32,
    /// CPE devices kept in stock per service.
    pub cpe_reserve: u32,
    /// Queue length above which staff is hired.
    pub hire_queue_threshold: usize,
    /// Chance per unit of headcount to fire when idle.
    pub fire_chance_per_unit: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            minimum_cooldown: 25,
            fast_cooldown: 100,
            standard_cooldown: 300,
            expansion_ratio: 0.65,
            competitor_penalty: 0.25,
            budget_guard: 0.5,
            expansion_distance: 12,
            segment_spacing: 4,
            max_targets: 6,
            node_sample_retries: 10,
            cpe_reserve: 2,
            hire_queue_threshold: 10,
            fire_chance_per_unit: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_tuned_constants() {
        let config = SimConfig::default();
        assert_eq!(config.market.churn_cooldown, 75);
        assert_eq!(config.market.outage_chance, 0.002);
        assert_eq!(config.ai.minimum_cooldown, 25);
        assert_eq!(config.ai.fast_cooldown, 100);
        assert_eq!(config.ai.standard_cooldown, 300);
        assert_eq!(config.ai.expansion_ratio, 0.65);
        assert_eq!(config.ai.competitor_penalty, 0.25);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"market": {"churn_cooldown": 10}, "ai": {"max_targets": 2}}"#)
                .unwrap();
        assert_eq!(config.market.churn_cooldown, 10);
        assert_eq!(config.market.subscribed_base_churn, 0.05);
        assert_eq!(config.ai.max_targets, 2);
        assert_eq!(config.company, CompanyConfig::default());
    }
}
