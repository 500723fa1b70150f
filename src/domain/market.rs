use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::PriceReference;
use crate::domain::types::Bar;

/// Immutable snapshot of market conditions for one sizing batch.
///
/// `volatility` is an ATR-style dispersion measure per symbol and
/// `liquidity` an average daily volume. The optional maps feed the
/// sector, correlation and borrow-cost constraints; constraints treat a
/// missing map as "no data, pass through".
#[derive(Debug, Clone)]
pub struct MarketState {
    pub current_bars: HashMap<String, Bar>,
    pub volatility: HashMap<String, Decimal>,
    pub liquidity: HashMap<String, Decimal>,
    pub sector_map: Option<HashMap<String, String>>,
    pub correlations: Option<HashMap<(String, String), f64>>,
    pub borrow_rates: Option<HashMap<String, Decimal>>,
    pub regime: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MarketState {
    pub fn new(
        current_bars: HashMap<String, Bar>,
        volatility: HashMap<String, Decimal>,
        liquidity: HashMap<String, Decimal>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            current_bars,
            volatility,
            liquidity,
            sector_map: None,
            correlations: None,
            borrow_rates: None,
            regime: None,
            timestamp,
        }
    }

    pub fn with_sector_map(mut self, sector_map: HashMap<String, String>) -> Self {
        self.sector_map = Some(sector_map);
        self
    }

    pub fn with_correlations(mut self, correlations: HashMap<(String, String), f64>) -> Self {
        self.correlations = Some(correlations);
        self
    }

    pub fn bar(&self, symbol: &str) -> Option<&Bar> {
        self.current_bars.get(symbol)
    }

    /// Price for `symbol` under the given reference, `None` when no bar
    /// is available. VWAP needs intrabar volume data the snapshot does
    /// not carry and falls back to close.
    pub fn price(&self, symbol: &str, reference: PriceReference) -> Option<Decimal> {
        let bar = self.current_bars.get(symbol)?;
        Some(match reference {
            PriceReference::Midrange => bar.midrange(),
            PriceReference::Close | PriceReference::Vwap => bar.close,
        })
    }

    /// Pairwise correlation, checking both orderings of the pair.
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let correlations = self.correlations.as_ref()?;
        correlations
            .get(&(a.to_string(), b.to_string()))
            .or_else(|| correlations.get(&(b.to_string(), a.to_string())))
            .copied()
    }
}
