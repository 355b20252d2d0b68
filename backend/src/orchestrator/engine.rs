//! Orchestrator Engine
//!
//! Drives the per-timestep pipeline over a single owned state snapshot.
//!
//! # Architecture
//!
//! ```text
//! initialize(config, seed) ──▶ state_0
//! For each timestep t = 1, 2, ...:
//!   step(state_{t-1}, config, prices, t) ──▶ (state_t, events_t)
//! ```
//!
//! [`initialize`] and [`step`] are plain functions for an external runner;
//! [`Orchestrator`] wraps them with time keeping, an event log, observers
//! and Monte Carlo forking.
//!
//! # Example
//!
//! ```rust
//! use staking_simulator_core_rs::orchestrator::{Orchestrator, SimulationConfig};
//! use staking_simulator_core_rs::prices::PriceFeed;
//!
//! let config = SimulationConfig::default();
//! let prices = PriceFeed::constant(config.initial_prices);
//!
//! let mut orchestrator = Orchestrator::new(config, prices, 42).unwrap();
//! for _ in 0..10 {
//!     let result = orchestrator.step().unwrap();
//!     println!("Timestep {}: security ${:.0}", result.timestep, result.total_security);
//! }
//! assert_eq!(orchestrator.current_timestep(), 10);
//! ```

use super::config::SimulationConfig;
use super::pipeline::Pipeline;
use crate::core::time::TimeManager;
use crate::models::agent::{AgentError, AgentStake};
use crate::models::asset::AssetMap;
use crate::models::event::{Event, EventLog};
use crate::models::pool::{PoolError, PoolManager};
use crate::models::state::SimulationState;
use crate::policy::inflation::update_inflation_metrics;
use crate::policy::security::update_security_metrics;
use crate::policy::StageContext;
use crate::prices::PriceFeed;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

// ============================================================================
// Errors and Results
// ============================================================================

/// Simulation error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: &'static str,
        #[source]
        source: Box<SimulationError>,
    },
}

/// Result of a single timestep
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub timestep: usize,
    pub num_events: usize,
    pub total_security: f64,
    pub inflation_rate: f64,
    pub avg_yield: f64,
    /// Budget still allocated across pools
    pub remaining_budget: f64,
}

impl StepResult {
    fn from_state(state: &SimulationState, num_events: usize) -> Self {
        let metrics = state.metrics();
        Self {
            timestep: state.timestep(),
            num_events,
            total_security: metrics.total_security,
            inflation_rate: metrics.inflation_rate,
            avg_yield: metrics.avg_yield,
            remaining_budget: state.pool_manager().total_remaining_budget(),
        }
    }
}

/// Read-only reporting hook called after every timestep
pub trait StateObserver {
    fn observe(&mut self, state: &SimulationState, events: &[Event]);
}

impl<F> StateObserver for F
where
    F: FnMut(&SimulationState, &[Event]),
{
    fn observe(&mut self, state: &SimulationState, events: &[Event]) {
        self(state, events)
    }
}

// ============================================================================
// Runner entry points
// ============================================================================

/// Build the timestep-0 state
///
/// Creates the maxi agents at `config.initial_prices`, seeds the pool
/// manager and computes the opening metrics. Every pool starts at its target
/// APY. A run with no cold start opens on the post-cold-start pool configs.
pub fn initialize(config: &SimulationConfig, seed: u64) -> Result<SimulationState, SimulationError> {
    initialize_at_prices(config, &config.initial_prices, seed)
}

/// Like [`initialize`], opening at the feed's timestep-0 prices
pub fn initialize_with_feed(
    config: &SimulationConfig,
    prices: &PriceFeed,
    seed: u64,
) -> Result<SimulationState, SimulationError> {
    initialize_at_prices(config, &prices.prices_at(0), seed)
}

fn initialize_at_prices(
    config: &SimulationConfig,
    opening_prices: &AssetMap<f64>,
    seed: u64,
) -> Result<SimulationState, SimulationError> {
    config.validate()?;
    if let Some((kind, price)) = opening_prices
        .iter()
        .find(|(_, price)| !price.is_finite() || **price < 0.0)
    {
        return Err(SimulationError::InvalidConfig(format!(
            "opening price of {} must be finite and >= 0 (got {})",
            kind, price
        )));
    }

    let agents = AgentStake::create_maxi_agents(
        &config.agents.composition,
        config.agents.initial_tvl,
        opening_prices,
        &config.agents.restake_percentages,
        &config.agents.lock_preferences,
        config.delta_time_days,
    )?;

    let mut pool_manager = PoolManager::with_pools(config.initial_budget, config.pools.clone());
    if !config.cold_start.is_cold_start(0) {
        for (kind, pool) in &config.cold_start.post_cold_start_pools {
            pool_manager.set_pool_config(*kind, *pool);
        }
    }
    pool_manager.allocate_budget(&config.budget_allocation)?;

    let fingerprint = config.fingerprint()?;
    let mut state = SimulationState::new(agents, pool_manager, seed, fingerprint);

    let target_yields = config.target_yields_at(0);
    state.metrics.prices = *opening_prices;
    state.metrics.target_yields = target_yields;
    state.metrics.pool_apy = target_yields;
    update_security_metrics(config, &state.agents, &mut state.metrics);
    update_inflation_metrics(config, &mut state.metrics);

    info!(
        seed,
        fingerprint = %state.config_fingerprint,
        initial_budget = config.initial_budget,
        "simulation initialized"
    );
    Ok(state)
}

/// Compute the state of `timestep` from the previous one
///
/// Runs the standard pipeline. `state` is never modified; on error it is
/// still the live snapshot.
pub fn step(
    state: &SimulationState,
    config: &SimulationConfig,
    prices: &PriceFeed,
    timestep: usize,
) -> Result<(SimulationState, Vec<Event>), SimulationError> {
    let ctx = StageContext {
        config,
        prices,
        timestep,
    };
    Pipeline::standard().execute(&ctx, state)
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns one run: configuration, price feed, pipeline and the live snapshot
///
/// # Determinism
///
/// Same config + same prices + same seed = identical states. The run id is
/// derived from the seed and run index, not drawn at random.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SimulationConfig,
    prices: PriceFeed,
    pipeline: Pipeline,
    time_manager: TimeManager,
    state: SimulationState,
    event_log: EventLog,
    run_index: u64,
    run_id: Uuid,
}

impl Orchestrator {
    /// Validate the config and build the initial state at the feed's
    /// timestep-0 prices
    pub fn new(config: SimulationConfig, prices: PriceFeed, seed: u64) -> Result<Self, SimulationError> {
        let state = initialize_with_feed(&config, &prices, seed)?;
        let time_manager = TimeManager::new(config.delta_time_days);

        Ok(Self {
            config,
            prices,
            pipeline: Pipeline::standard(),
            time_manager,
            state,
            event_log: EventLog::new(),
            run_index: 0,
            run_id: Uuid::from_u64_pair(seed, 0),
        })
    }

    /// Replace the stage pipeline
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_timestep(&self) -> usize {
        self.time_manager.current_timestep()
    }

    pub fn elapsed_days(&self) -> f64 {
        self.time_manager.elapsed_days()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn event_count(&self) -> usize {
        self.event_log.len()
    }

    pub fn run_index(&self) -> u64 {
        self.run_index
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    // ========================================================================
    // Timestep Loop
    // ========================================================================

    /// Execute one timestep
    ///
    /// On error nothing advances: the state, clock and event log are left
    /// as they were.
    pub fn step(&mut self) -> Result<StepResult, SimulationError> {
        let events = self.advance()?;
        Ok(StepResult::from_state(&self.state, events))
    }

    /// Execute `num_timesteps` timesteps
    pub fn run(&mut self, num_timesteps: usize) -> Result<Vec<StepResult>, SimulationError> {
        (0..num_timesteps).map(|_| self.step()).collect()
    }

    /// Execute `num_timesteps` timesteps, reporting each snapshot
    pub fn run_with_observer<O: StateObserver + ?Sized>(
        &mut self,
        num_timesteps: usize,
        observer: &mut O,
    ) -> Result<(), SimulationError> {
        for _ in 0..num_timesteps {
            let num_events = self.advance()?;
            let start = self.event_log.len() - num_events;
            observer.observe(&self.state, &self.event_log.events()[start..]);
        }
        Ok(())
    }

    /// Independent copy of this run for Monte Carlo
    ///
    /// The fork starts from the current snapshot with an empty event log and
    /// its own run id. Nothing is shared but the immutable price feed and
    /// stages.
    pub fn fork(&self, run_index: u64) -> Self {
        Self {
            config: self.config.clone(),
            prices: self.prices.clone(),
            pipeline: self.pipeline.clone(),
            time_manager: TimeManager::at(self.config.delta_time_days, self.current_timestep()),
            state: self.state.snapshot(),
            event_log: EventLog::new(),
            run_index,
            run_id: Uuid::from_u64_pair(self.state.seed(), run_index),
        }
    }

    /// Run the pipeline once and commit; returns the number of new events
    fn advance(&mut self) -> Result<usize, SimulationError> {
        let timestep = self.time_manager.current_timestep() + 1;
        let ctx = StageContext {
            config: &self.config,
            prices: &self.prices,
            timestep,
        };

        let (next, events) = self.pipeline.execute(&ctx, &self.state)?;
        let num_events = events.len();

        self.state = next;
        self.time_manager.advance();
        self.event_log.extend(events);
        Ok(num_events)
    }
}
