use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque instrument identifier (equity ticker or crypto pair symbol).
///
/// Used as the join key across every pipeline stage. The value is never
/// parsed for meaning except by [`AssetClass::infer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system friendly form of the id, used for export file names.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Broad instrument class. Only affects the trading calendar of synthetic data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Crypto,
}

impl AssetClass {
    /// Yahoo-style crypto pairs carry a quote-currency suffix (`BTC-USD`).
    pub fn infer(asset: &AssetId) -> Self {
        match asset.as_str().rsplit_once('-') {
            Some((base, quote))
                if !base.is_empty()
                    && quote.len() == 3
                    && quote.chars().all(|c| c.is_ascii_uppercase()) =>
            {
                AssetClass::Crypto
            }
            _ => AssetClass::Equity,
        }
    }

    /// Whether this class trades on weekends.
    pub fn trades_weekends(self) -> bool {
        matches!(self, AssetClass::Crypto)
    }
}
