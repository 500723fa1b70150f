use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::rounding::{RoundingDirection, RoundingPolicy};
use crate::domain::types::{OrderIntent, OrderSide, SignalDirection, Urgency};

/// Execution-agnostic position target produced by a sizer.
///
/// Expresses "where we want to be" without execution mechanics; the
/// engine converts it to an `OrderIntent` for the delta against the
/// current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub symbol: String,
    /// Absolute target: positive long, negative short, zero flat.
    pub target_quantity: Decimal,
    /// Current position quantity, for delta computation.
    pub current_quantity: Decimal,
    pub direction: SignalDirection,
    pub urgency: Urgency,
    pub stop_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub signal_strength: f64,
    pub risk_tags: HashMap<String, String>,
}

impl TargetPosition {
    pub fn new(
        symbol: impl Into<String>,
        target_quantity: Decimal,
        current_quantity: Decimal,
        direction: SignalDirection,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            target_quantity,
            current_quantity,
            direction,
            urgency: Urgency::Normal,
            stop_price: None,
            take_profit_price: None,
            signal_strength: 1.0,
            risk_tags: HashMap::new(),
        }
    }

    pub fn with_signal_strength(mut self, strength: f64) -> Self {
        self.signal_strength = strength;
        self
    }

    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Quantity change needed: target minus current.
    pub fn delta_quantity(&self) -> Decimal {
        self.target_quantity - self.current_quantity
    }

    /// Whether reaching the target grows the absolute position.
    pub fn is_risk_increasing(&self) -> bool {
        self.target_quantity.abs() > self.current_quantity.abs()
    }

    /// Convert to a market `OrderIntent` for the delta.
    ///
    /// Returns `None` when the delta is zero, or when the optional
    /// rounding policy rounds it to zero.
    pub fn to_order_intent(
        &self,
        timestamp: DateTime<Utc>,
        rounding: Option<&RoundingPolicy>,
    ) -> Option<OrderIntent> {
        let delta = self.delta_quantity();
        if delta.is_zero() {
            return None;
        }

        let (side, quantity) = if delta > Decimal::ZERO {
            (OrderSide::Buy, delta)
        } else {
            (OrderSide::Sell, delta.abs())
        };

        let quantity = match rounding {
            Some(policy) => {
                let rounded = policy.round_quantity(quantity, RoundingDirection::Down);
                if rounded.is_zero() {
                    return None;
                }
                rounded
            }
            None => quantity,
        };

        Some(
            OrderIntent::market(self.symbol.clone(), side, quantity, timestamp)
                .with_confidence(self.signal_strength),
        )
    }
}

/// An order a constraint rejected or modified.
///
/// When `original_quantity` is `Some`, this is an audit record of a
/// scale-down: the order is still live in `ConstraintResult::orders`
/// with its reduced quantity, and `order` here carries the original.
/// When it is `None`, the order was dropped outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedOrder {
    pub order: OrderIntent,
    pub constraint_name: String,
    pub reason: String,
    pub original_quantity: Option<Decimal>,
}

impl RejectedOrder {
    pub fn dropped(order: OrderIntent, constraint_name: &str, reason: impl Into<String>) -> Self {
        Self {
            order,
            constraint_name: constraint_name.to_string(),
            reason: reason.into(),
            original_quantity: None,
        }
    }

    pub fn scaled(order: OrderIntent, constraint_name: &str, reason: impl Into<String>) -> Self {
        let original_quantity = Some(order.quantity);
        Self {
            order,
            constraint_name: constraint_name.to_string(),
            reason: reason.into(),
            original_quantity,
        }
    }
}

/// Structured result of one constraint application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// Orders that passed, possibly with reduced quantities.
    pub orders: Vec<OrderIntent>,
    /// Orders rejected or scaled, with reasons.
    pub rejected: Vec<RejectedOrder>,
    /// Non-fatal observations, e.g. approaching a limit.
    pub warnings: Vec<String>,
}

impl ConstraintResult {
    pub fn pass_through(orders: Vec<OrderIntent>) -> Self {
        Self {
            orders,
            rejected: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
