//! Time management for the simulation
//!
//! The simulation operates in discrete timesteps. Each timestep spans
//! `delta_time_days` days (one day by default). Every annualized figure
//! (rewards, yields) is divided down to a per-timestep amount through
//! [`TimeManager::annual_to_period`] so the conversion is identical
//! everywhere it happens.

use serde::{Deserialize, Serialize};

/// Days in a simulated year
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Number of timesteps in one year for a given timestep length
///
/// # Example
/// ```
/// use staking_simulator_core_rs::core::time::periods_per_year;
///
/// assert_eq!(periods_per_year(1.0), 365.0);
/// assert_eq!(periods_per_year(5.0), 73.0);
/// ```
pub fn periods_per_year(delta_time_days: f64) -> f64 {
    DAYS_PER_YEAR / delta_time_days
}

/// Per-timestep share of an annual amount: `amount / (365 / Δt)`
///
/// # Example
/// ```
/// use staking_simulator_core_rs::core::time::annual_to_period;
///
/// assert_eq!(annual_to_period(365.0, 1.0), 1.0);
/// ```
pub fn annual_to_period(amount: f64, delta_time_days: f64) -> f64 {
    amount / periods_per_year(delta_time_days)
}

/// Manages simulation time in discrete timesteps
///
/// # Example
/// ```
/// use staking_simulator_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(1.0);
/// assert_eq!(time.current_timestep(), 0);
///
/// time.advance();
/// assert_eq!(time.current_timestep(), 1);
/// assert_eq!(time.elapsed_days(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeManager {
    /// Timesteps elapsed since simulation start
    current_timestep: usize,
    /// Length of one timestep in days
    delta_time_days: f64,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Panics
    /// Panics if `delta_time_days` is not strictly positive.
    pub fn new(delta_time_days: f64) -> Self {
        assert!(
            delta_time_days > 0.0 && delta_time_days.is_finite(),
            "delta_time_days must be positive"
        );
        Self {
            current_timestep: 0,
            delta_time_days,
        }
    }

    /// Resume at an arbitrary timestep (forked runs)
    pub fn at(delta_time_days: f64, current_timestep: usize) -> Self {
        let mut time = Self::new(delta_time_days);
        time.current_timestep = current_timestep;
        time
    }

    /// Advance time by one timestep
    pub fn advance(&mut self) {
        self.current_timestep += 1;
    }

    /// Current timestep (timesteps since start)
    pub fn current_timestep(&self) -> usize {
        self.current_timestep
    }

    /// Length of one timestep in days
    pub fn delta_time_days(&self) -> f64 {
        self.delta_time_days
    }

    /// Days elapsed since start
    pub fn elapsed_days(&self) -> f64 {
        self.current_timestep as f64 * self.delta_time_days
    }

    /// Timesteps per year (`365 / Δt`)
    pub fn periods_per_year(&self) -> f64 {
        periods_per_year(self.delta_time_days)
    }

    /// Per-timestep equivalent of an annual amount
    pub fn annual_to_period(&self, amount: f64) -> f64 {
        annual_to_period(amount, self.delta_time_days)
    }

    /// Number of whole timesteps covering `days` (rounded up)
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::TimeManager;
    ///
    /// let weekly = TimeManager::new(7.0);
    /// assert_eq!(weekly.days_to_timesteps(30), 5);
    /// assert_eq!(TimeManager::new(1.0).days_to_timesteps(30), 30);
    /// ```
    pub fn days_to_timesteps(&self, days: u32) -> usize {
        days_to_timesteps(days, self.delta_time_days)
    }
}

/// Number of whole timesteps covering `days` for a given timestep length
pub fn days_to_timesteps(days: u32, delta_time_days: f64) -> usize {
    (days as f64 / delta_time_days).ceil() as usize
}
