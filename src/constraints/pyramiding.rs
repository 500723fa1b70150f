use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::errors::RiskConfigError;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Per-symbol pyramiding bookkeeping.
///
/// Serializable so an embedding system can persist and restore the
/// constraint across restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PyramidingState {
    /// Number of adds since the initial entry.
    pub add_count: usize,
    /// Position size at first entry.
    pub initial_quantity: Decimal,
    /// Total quantity added since the initial entry.
    pub total_added: Decimal,
}

/// Limit adding to existing positions (pyramiding).
///
/// Initial entries (flat book) pass without counting. Risk-reducing
/// orders pass, and a full close resets the symbol's state. Adds are
/// rejected once `max_pyramid_adds` is reached, and oversized adds are
/// trimmed to `max_add_pct` of the initial position.
///
/// State moves only through [`PyramidingConstraint::record_fill`],
/// called by the execution layer after fills confirm — `apply` itself
/// never counts an add, because the order may not fill.
#[derive(Debug, Clone)]
pub struct PyramidingConstraint {
    max_pyramid_adds: usize,
    max_add_pct: Decimal,
    state: HashMap<String, PyramidingState>,
}

impl Default for PyramidingConstraint {
    fn default() -> Self {
        Self {
            max_pyramid_adds: 3,
            max_add_pct: Decimal::new(5, 1), // 0.5
            state: HashMap::new(),
        }
    }
}

impl PyramidingConstraint {
    /// `max_add_pct` must be in `(0, 1]`.
    pub fn new(max_pyramid_adds: usize, max_add_pct: f64) -> Result<Self, RiskConfigError> {
        if max_add_pct <= 0.0 || max_add_pct > 1.0 {
            return Err(RiskConfigError::FractionOutOfRange {
                field: "max_add_pct",
                low: 0.0,
                high: 1.0,
                value: max_add_pct,
            });
        }
        Ok(Self {
            max_pyramid_adds,
            max_add_pct: Decimal::from_f64(max_add_pct).unwrap_or(Decimal::ONE),
            state: HashMap::new(),
        })
    }

    /// Restore a constraint with pre-existing state (recovery, tests).
    pub fn with_state(
        max_pyramid_adds: usize,
        max_add_pct: f64,
        state: HashMap<String, PyramidingState>,
    ) -> Result<Self, RiskConfigError> {
        let mut constraint = Self::new(max_pyramid_adds, max_add_pct)?;
        constraint.state = state;
        Ok(constraint)
    }

    pub fn max_pyramid_adds(&self) -> usize {
        self.max_pyramid_adds
    }

    pub fn max_add_pct(&self) -> Decimal {
        self.max_add_pct
    }

    pub fn state(&self, symbol: &str) -> Option<&PyramidingState> {
        self.state.get(symbol)
    }

    /// Forget a symbol's state (position fully closed).
    pub fn reset_state(&mut self, symbol: &str) {
        self.state.remove(symbol);
    }

    /// Record a confirmed fill. `is_add = false` marks an initial entry
    /// and restarts the count; `is_add = true` consumes one add.
    pub fn record_fill(&mut self, symbol: &str, filled_qty: Decimal, is_add: bool) {
        let state = self.state.entry(symbol.to_string()).or_default();
        if is_add {
            state.add_count += 1;
            state.total_added += filled_qty;
        } else {
            state.initial_quantity = filled_qty;
            state.add_count = 0;
            state.total_added = Decimal::ZERO;
        }
    }

    fn is_risk_reducing(order: &OrderIntent, current_qty: Decimal) -> bool {
        match order.side {
            OrderSide::Buy => current_qty < Decimal::ZERO,
            OrderSide::Sell => current_qty > Decimal::ZERO,
        }
    }

    fn would_close_position(order: &OrderIntent, current_qty: Decimal) -> bool {
        if current_qty.is_zero() {
            return false;
        }
        match order.side {
            OrderSide::Buy => current_qty < Decimal::ZERO && order.quantity >= current_qty.abs(),
            OrderSide::Sell => current_qty > Decimal::ZERO && order.quantity >= current_qty,
        }
    }
}

impl Constraint for PyramidingConstraint {
    fn name(&self) -> &'static str {
        "PyramidingConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        _market: &MarketState,
        _config: &RiskConfig,
    ) -> ConstraintResult {
        let mut result = ConstraintResult::default();

        for order in orders {
            let current_qty = portfolio.position_quantity(&order.symbol);

            if Self::is_risk_reducing(order, current_qty) {
                result.orders.push(order.clone());
                if Self::would_close_position(order, current_qty) {
                    debug!("PyramidingConstraint: {} closed, resetting state", order.symbol);
                    self.reset_state(&order.symbol);
                }
                continue;
            }

            // Initial entry: pass without counting. The count starts
            // when the fill is confirmed via record_fill.
            if current_qty.is_zero() {
                result.orders.push(order.clone());
                continue;
            }

            let state = self
                .state
                .get(&order.symbol)
                .cloned()
                .unwrap_or_default();
            if state.add_count >= self.max_pyramid_adds {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Pyramiding limit reached: {} adds (max {})",
                        state.add_count, self.max_pyramid_adds
                    ),
                ));
                continue;
            }

            // Base the add budget on the recorded initial entry, or the
            // live position when no entry was ever recorded.
            let base_qty = if state.initial_quantity > Decimal::ZERO {
                state.initial_quantity
            } else {
                current_qty.abs()
            };
            let max_add_qty = base_qty * self.max_add_pct;

            if order.quantity <= max_add_qty {
                result.orders.push(order.clone());
                continue;
            }

            let trimmed = max_add_qty.trunc();
            if trimmed >= Decimal::ONE {
                result.orders.push(order.with_quantity(trimmed));
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled from {} to {} (max add {}% of initial {})",
                        order.quantity,
                        trimmed,
                        self.max_add_pct * Decimal::ONE_HUNDRED,
                        base_qty
                    ),
                ));
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Add size {} exceeds max {} ({}% of initial {})",
                        order.quantity,
                        max_add_qty,
                        self.max_add_pct * Decimal::ONE_HUNDRED,
                        base_qty
                    ),
                ));
            }
        }

        result
    }
}
