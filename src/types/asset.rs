//! Vault Assets

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::units::ExchangeRate;
use crate::engine::VaultError;

/// Underlying assets the vault knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// Wrapped BTC
    WBtc,
    /// Staked CORE
    StCore,
}

impl Asset {
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::WBtc => "wBTC",
            Asset::StCore => "stCORE",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wbtc" | "w_btc" => Ok(Asset::WBtc),
            "stcore" | "st_core" => Ok(Asset::StCore),
            _ => Err(VaultError::UnsupportedAsset(s.to_string())),
        }
    }
}

/// An amount of one asset, in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset: Asset,
    pub amount: u64,
}

impl AssetAmount {
    pub fn new(asset: Asset, amount: u64) -> Self {
        Self { asset, amount }
    }
}

/// Whitelisted asset and its value in underlying units per asset unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPrice {
    pub asset: Asset,
    pub price: ExchangeRate,
}

impl AssetPrice {
    pub fn new(asset: Asset, price: ExchangeRate) -> Self {
        Self { asset, price }
    }
}

impl FromStr for AssetPrice {
    type Err = VaultError;

    /// Parse `"wbtc"` (price 1.0) or `"stcore:0.00042"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((asset, price)) => Ok(Self::new(asset.parse()?, price.parse()?)),
            None => Ok(Self::new(s.parse()?, ExchangeRate::ONE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_parsing() {
        assert_eq!("wBTC".parse::<Asset>().unwrap(), Asset::WBtc);
        assert_eq!("STCORE".parse::<Asset>().unwrap(), Asset::StCore);
        assert!(matches!(
            "usdc".parse::<Asset>(),
            Err(VaultError::UnsupportedAsset(_))
        ));
    }

    #[test]
    fn test_asset_price_parsing() {
        let price: AssetPrice = "wbtc".parse().unwrap();
        assert_eq!(price.price, ExchangeRate::ONE);

        let price: AssetPrice = "stcore:0.5".parse().unwrap();
        assert_eq!(price.asset, Asset::StCore);
        assert_eq!(price.price.to_string(), "0.5");

        assert!("doge:1".parse::<AssetPrice>().is_err());
    }
}
