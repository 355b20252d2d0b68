//! Price feed
//!
//! Prices come from an external collaborator as a pure function
//! `price(timestep) -> f64` per asset. The core never generates prices; it
//! only samples the providers handed to it.

use crate::models::asset::{AssetKind, AssetMap};
use std::fmt;
use std::sync::Arc;

/// Deterministic price source for one asset
pub trait PriceProvider: Send + Sync {
    fn price(&self, timestep: usize) -> f64;
}

impl<F> PriceProvider for F
where
    F: Fn(usize) -> f64 + Send + Sync,
{
    fn price(&self, timestep: usize) -> f64 {
        self(timestep)
    }
}

/// Same price at every timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPrice(pub f64);

impl PriceProvider for ConstantPrice {
    fn price(&self, _timestep: usize) -> f64 {
        self.0
    }
}

/// Pre-generated samples, indexed `samples[t mod len]`
///
/// An empty series prices at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    samples: Vec<f64>,
}

impl PriceSeries {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl PriceProvider for PriceSeries {
    fn price(&self, timestep: usize) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples[timestep % self.samples.len()]
    }
}

/// One provider per asset
///
/// Cloning shares the providers, which are immutable.
///
/// # Example
/// ```
/// use staking_simulator_core_rs::prices::{PriceFeed, PriceSeries};
/// use staking_simulator_core_rs::{AssetKind, AssetMap};
///
/// let feed = PriceFeed::from_series(AssetMap::new(
///     vec![0.05, 0.06],
///     vec![2500.0],
///     vec![100000.0],
/// ));
/// assert_eq!(feed.prices_at(3)[AssetKind::Avl], 0.06);
/// assert_eq!(feed.price(AssetKind::Eth, 99), 2500.0);
/// ```
#[derive(Clone)]
pub struct PriceFeed {
    providers: AssetMap<Arc<dyn PriceProvider>>,
}

impl PriceFeed {
    pub fn new(
        avl: Arc<dyn PriceProvider>,
        eth: Arc<dyn PriceProvider>,
        btc: Arc<dyn PriceProvider>,
    ) -> Self {
        Self {
            providers: AssetMap::new(avl, eth, btc),
        }
    }

    pub fn constant(prices: AssetMap<f64>) -> Self {
        Self::new(
            Arc::new(ConstantPrice(prices[AssetKind::Avl])),
            Arc::new(ConstantPrice(prices[AssetKind::Eth])),
            Arc::new(ConstantPrice(prices[AssetKind::Btc])),
        )
    }

    pub fn from_series(series: AssetMap<Vec<f64>>) -> Self {
        let [avl, eth, btc] = AssetKind::ALL.map(|kind| {
            Arc::new(PriceSeries::new(series[kind].clone())) as Arc<dyn PriceProvider>
        });
        Self::new(avl, eth, btc)
    }

    pub fn price(&self, kind: AssetKind, timestep: usize) -> f64 {
        self.providers[kind].price(timestep)
    }

    pub fn prices_at(&self, timestep: usize) -> AssetMap<f64> {
        AssetMap::from_fn(|kind| self.price(kind, timestep))
    }
}

impl fmt::Debug for PriceFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceFeed").finish_non_exhaustive()
    }
}
