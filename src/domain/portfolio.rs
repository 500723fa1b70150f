use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Currently held stake in a symbol.
///
/// `quantity` is signed: positive for long, negative for short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub realized_pnl: Decimal,
    pub current_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        average_price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            average_price,
            realized_pnl: Decimal::ZERO,
            current_price: None,
            timestamp,
        }
    }

    pub fn with_current_price(mut self, price: Decimal) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Signed market value. Falls back to the average price when no
    /// current price is available (conservative valuation).
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price.unwrap_or(self.average_price)
    }
}

/// Immutable snapshot of the portfolio at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
    pub timestamp: DateTime<Utc>,
}

impl PortfolioState {
    pub fn new(cash: Decimal, positions: HashMap<String, Position>, timestamp: DateTime<Utc>) -> Self {
        Self {
            cash,
            positions,
            timestamp,
        }
    }

    /// Cash plus the signed sum of position values. May be zero or
    /// negative; the engine's equity-floor kill switch handles that case.
    pub fn equity(&self) -> Decimal {
        self.cash
            + self
                .positions
                .values()
                .map(Position::market_value)
                .sum::<Decimal>()
    }

    /// Signed quantity held in `symbol`, zero when absent.
    pub fn position_quantity(&self, symbol: &str) -> Decimal {
        self.positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of absolute position values.
    pub fn gross_exposure(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| p.market_value().abs())
            .sum()
    }

    /// Signed sum of position values (longs minus shorts).
    pub fn net_exposure(&self) -> Decimal {
        self.positions.values().map(Position::market_value).sum()
    }
}
