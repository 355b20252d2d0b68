//! Asset kinds supported by the protocol
//!
//! Assets are protocol-defined, so they form a closed set. Per-asset data is
//! held in an [`AssetMap`], a fixed three-slot map indexed by [`AssetKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// A stakeable asset
///
/// `Avl` is the protocol's base token: rewards, budgets and restakes are
/// denominated in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    #[serde(rename = "AVL")]
    Avl,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "BTC")]
    Btc,
}

impl AssetKind {
    /// All assets in canonical order
    pub const ALL: [AssetKind; 3] = [AssetKind::Avl, AssetKind::Eth, AssetKind::Btc];

    /// Ticker symbol ("AVL", "ETH", "BTC")
    pub fn symbol(&self) -> &'static str {
        match self {
            AssetKind::Avl => "AVL",
            AssetKind::Eth => "ETH",
            AssetKind::Btc => "BTC",
        }
    }

    /// Id of the agent that holds 100% of this asset at start
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::AssetKind;
    ///
    /// assert_eq!(AssetKind::Eth.maxi_agent_id(), "eth_maxi");
    /// ```
    pub fn maxi_agent_id(&self) -> &'static str {
        match self {
            AssetKind::Avl => "avl_maxi",
            AssetKind::Eth => "eth_maxi",
            AssetKind::Btc => "btc_maxi",
        }
    }

    /// Parse a ticker symbol, case-insensitively
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_uppercase().as_str() {
            "AVL" => Some(AssetKind::Avl),
            "ETH" => Some(AssetKind::Eth),
            "BTC" => Some(AssetKind::Btc),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Error returned when parsing an unknown ticker symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAsset(pub String);

impl fmt::Display for UnknownAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown asset symbol: {}", self.0)
    }
}

impl std::error::Error for UnknownAsset {}

impl FromStr for AssetKind {
    type Err = UnknownAsset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKind::from_symbol(s).ok_or_else(|| UnknownAsset(s.to_string()))
    }
}

/// One value per asset, indexed by [`AssetKind`]
///
/// Serializes as `{"AVL": .., "ETH": .., "BTC": ..}`.
///
/// # Example
/// ```
/// use staking_simulator_core_rs::{AssetKind, AssetMap};
///
/// let mut prices = AssetMap::new(1.0, 3000.0, 30000.0);
/// prices[AssetKind::Eth] = 3100.0;
/// assert_eq!(prices[AssetKind::Eth], 3100.0);
/// assert_eq!(prices.values().sum::<f64>(), 33101.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetMap<T> {
    #[serde(rename = "AVL", default)]
    avl: T,
    #[serde(rename = "ETH", default)]
    eth: T,
    #[serde(rename = "BTC", default)]
    btc: T,
}

impl<T> AssetMap<T> {
    pub fn new(avl: T, eth: T, btc: T) -> Self {
        Self { avl, eth, btc }
    }

    /// Build a map by evaluating `f` for every asset
    pub fn from_fn(mut f: impl FnMut(AssetKind) -> T) -> Self {
        Self {
            avl: f(AssetKind::Avl),
            eth: f(AssetKind::Eth),
            btc: f(AssetKind::Btc),
        }
    }

    pub fn get(&self, kind: AssetKind) -> &T {
        match kind {
            AssetKind::Avl => &self.avl,
            AssetKind::Eth => &self.eth,
            AssetKind::Btc => &self.btc,
        }
    }

    pub fn get_mut(&mut self, kind: AssetKind) -> &mut T {
        match kind {
            AssetKind::Avl => &mut self.avl,
            AssetKind::Eth => &mut self.eth,
            AssetKind::Btc => &mut self.btc,
        }
    }

    /// Iterate `(kind, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (AssetKind, &T)> {
        AssetKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, value)| value)
    }

    pub fn map<U>(&self, mut f: impl FnMut(AssetKind, &T) -> U) -> AssetMap<U> {
        AssetMap::from_fn(|kind| f(kind, self.get(kind)))
    }
}

impl<T> Index<AssetKind> for AssetMap<T> {
    type Output = T;

    fn index(&self, kind: AssetKind) -> &T {
        self.get(kind)
    }
}

impl<T> IndexMut<AssetKind> for AssetMap<T> {
    fn index_mut(&mut self, kind: AssetKind) -> &mut T {
        self.get_mut(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_roundtrip() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.symbol().parse::<AssetKind>(), Ok(kind));
        }
        assert_eq!(AssetKind::from_symbol("eth"), Some(AssetKind::Eth));
        assert!("DOGE".parse::<AssetKind>().is_err());
    }

    #[test]
    fn test_asset_map_serializes_by_symbol() {
        let map = AssetMap::new(1.0, 2.0, 3.0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"AVL":1.0,"ETH":2.0,"BTC":3.0}"#);
    }

    #[test]
    fn test_asset_map_missing_keys_default() {
        let map: AssetMap<f64> = serde_json::from_str(r#"{"AVL":0.15}"#).unwrap();
        assert_eq!(map[AssetKind::Avl], 0.15);
        assert_eq!(map[AssetKind::Btc], 0.0);
    }
}
