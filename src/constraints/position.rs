use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Cap one symbol's position at `max_position_pct × equity`.
///
/// Room left for the symbol is the cap minus the absolute value of the
/// existing position; buys beyond it are scaled down to whole shares.
/// Buys without a bar are dropped silently. Sells pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPositionConstraint;

impl Constraint for MaxPositionConstraint {
    fn name(&self) -> &'static str {
        "MaxPositionConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        let mut result = ConstraintResult::default();
        let equity = portfolio.equity();
        let max_position_value = equity
            * Decimal::from_f64(config.max_position_pct).unwrap_or(Decimal::ZERO);

        for order in orders {
            if order.side == OrderSide::Sell {
                result.orders.push(order.clone());
                continue;
            }

            let Some(bar) = market.bar(&order.symbol) else {
                continue;
            };
            let price = bar.close;

            let existing_value = portfolio
                .positions
                .get(&order.symbol)
                .map(|p| p.market_value().abs())
                .unwrap_or(Decimal::ZERO);
            let remaining_room = max_position_value - existing_value;

            if remaining_room <= Decimal::ZERO {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Position at max size ({:.1}% of equity)",
                        config.max_position_pct * 100.0
                    ),
                ));
                continue;
            }

            let order_value = order.value_at(price);
            if order_value <= remaining_room {
                result.orders.push(order.clone());
                continue;
            }

            let max_quantity = (remaining_room / price).trunc();
            if max_quantity >= Decimal::ONE {
                result.orders.push(order.with_quantity(max_quantity));
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled from {} to {} (max position {:.1}% of equity)",
                        order.quantity,
                        max_quantity,
                        config.max_position_pct * 100.0
                    ),
                ));
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    "Position at max size, scaled quantity < 1",
                ));
            }
        }

        result
    }
}

/// Cap the number of concurrent positions.
///
/// Sells and orders on already-held symbols pass; new-symbol buys are
/// ranked by confidence and admitted up to the remaining slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPositionsConstraint;

impl Constraint for MaxPositionsConstraint {
    fn name(&self) -> &'static str {
        "MaxPositionsConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        _market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        let current_count = portfolio.positions.len();

        let mut passed: Vec<OrderIntent> = Vec::new();
        let mut new_position_orders: Vec<OrderIntent> = Vec::new();

        for order in orders {
            if order.side == OrderSide::Sell || portfolio.positions.contains_key(&order.symbol) {
                passed.push(order.clone());
            } else {
                new_position_orders.push(order.clone());
            }
        }

        let room_for_new = config.max_positions.saturating_sub(current_count);

        // Highest-confidence entries win the remaining slots; stable
        // sort keeps input order among ties.
        new_position_orders.sort_by(|a, b| {
            b.confidence
                .unwrap_or(0.0)
                .partial_cmp(&a.confidence.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut result = ConstraintResult::default();
        for (i, order) in new_position_orders.into_iter().enumerate() {
            if i < room_for_new {
                passed.push(order);
            } else {
                debug!(
                    "MaxPositionsConstraint: no slot for {} ({} held, max {})",
                    order.symbol, current_count, config.max_positions
                );
                result.rejected.push(RejectedOrder::dropped(
                    order,
                    self.name(),
                    format!("Max positions reached ({})", config.max_positions),
                ));
            }
        }

        result.orders = passed;
        result
    }
}
