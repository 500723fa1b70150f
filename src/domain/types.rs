use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::rounding::{RoundingDirection, RoundingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

/// Execution urgency attached to a position target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Immediate,
}

/// Direction of a trading signal or position target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    Long,
    Short,
    Flat,
}

/// A trading signal from the prediction layer.
///
/// `strength` is a confidence in `[0, 1]`; sizers interpret it per
/// strategy (the Kelly sizer treats it as a win-probability proxy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: SignalDirection,
    pub strength: f64,
}

impl Signal {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        direction: SignalDirection,
        strength: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            direction,
            strength,
        }
    }
}

/// OHLCV snapshot of a symbol over a time bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Bar {
    /// Midpoint of the bar's range, a stable entry-price estimate.
    pub fn midrange(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }
}

/// A request to change a position, ready for handoff to execution.
///
/// Invariant: `quantity > 0`; the directional effect relative to the
/// current position is determined by `side` together with `symbol`.
/// Intents produced by the engine are always `Market` orders; the
/// execution layer may convert them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub timestamp: DateTime<Utc>,
    pub confidence: Option<f64>,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl OrderIntent {
    /// Market order with the minimal required fields.
    pub fn market(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            stop_price: None,
            time_in_force: None,
            timestamp,
            confidence: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Copy of this intent with a new quantity, all other fields kept.
    /// Used by constraints when scaling an order down.
    pub fn with_quantity(&self, quantity: Decimal) -> Self {
        let mut order = self.clone();
        order.quantity = quantity;
        order
    }

    /// Notional value at the given price.
    pub fn value_at(&self, price: Decimal) -> Decimal {
        self.quantity * price
    }

    /// Apply a rounding policy to the quantity. Returns `None` if the
    /// quantity rounds to zero.
    pub fn rounded(&self, policy: &RoundingPolicy, direction: RoundingDirection) -> Option<Self> {
        let quantity = policy.round_quantity(self.quantity, direction);
        if quantity.is_zero() {
            return None;
        }
        Some(self.with_quantity(quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_bar() -> Bar {
        Bar {
            symbol: "AAPL".to_string(),
            open: dec!(150),
            high: dec!(152),
            low: dec!(148),
            close: dec!(151),
            volume: dec!(1000000),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_bar_midrange() {
        assert_eq!(test_bar().midrange(), dec!(150));
    }

    #[test]
    fn test_order_side_display() {
        assert_eq!(OrderSide::Buy.to_string(), "BUY");
        assert_eq!(OrderSide::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_with_quantity_preserves_other_fields() {
        let order = OrderIntent::market("AAPL", OrderSide::Buy, dec!(100), Utc::now())
            .with_confidence(0.8);
        let scaled = order.with_quantity(dec!(40));

        assert_eq!(scaled.quantity, dec!(40));
        assert_eq!(scaled.symbol, order.symbol);
        assert_eq!(scaled.side, order.side);
        assert_eq!(scaled.confidence, Some(0.8));
        assert_eq!(scaled.timestamp, order.timestamp);
    }

    #[test]
    fn test_value_at() {
        let order = OrderIntent::market("AAPL", OrderSide::Buy, dec!(10), Utc::now());
        assert_eq!(order.value_at(dec!(151)), dec!(1510));
    }

    #[test]
    fn test_rounded_to_zero_returns_none() {
        let order = OrderIntent::market("AAPL", OrderSide::Buy, dec!(0.4), Utc::now());
        let policy = RoundingPolicy::whole_shares();
        assert!(order.rounded(&policy, RoundingDirection::Down).is_none());
    }
}
