use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Cap gross exposure (sum of absolute position values) at
/// `max_gross_leverage × equity`.
///
/// Sells always pass — they reduce exposure. When the buys' aggregate
/// value exceeds the remaining capacity, every buy is scaled by the
/// same factor and truncated per order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrossLeverageConstraint;

impl Constraint for GrossLeverageConstraint {
    fn name(&self) -> &'static str {
        "GrossLeverageConstraint"
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
        let max_exposure =
            equity * Decimal::from_f64(config.max_gross_leverage).unwrap_or(Decimal::ZERO);
        let current_exposure = portfolio.gross_exposure();

        // (order, price, value) for priceable buys.
        let mut buys: Vec<(&OrderIntent, Decimal, Decimal)> = Vec::new();
        for order in orders {
            if order.side == OrderSide::Sell {
                result.orders.push(order.clone());
                continue;
            }
            let Some(bar) = market.bar(&order.symbol) else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!("No bar data for {}", order.symbol),
                ));
                continue;
            };
            let value = order.value_at(bar.close);
            buys.push((order, bar.close, value));
        }

        if buys.is_empty() {
            return result;
        }

        let remaining_capacity = max_exposure - current_exposure;
        if remaining_capacity <= Decimal::ZERO {
            for (order, _, _) in buys {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Gross leverage at max (exposure {}, cap {}, limit {}x)",
                        current_exposure, max_exposure, config.max_gross_leverage
                    ),
                ));
            }
            return result;
        }

        let total_new_exposure: Decimal = buys.iter().map(|(_, _, value)| *value).sum();
        if total_new_exposure <= remaining_capacity {
            result.orders.extend(buys.into_iter().map(|(o, _, _)| o.clone()));
            return result;
        }

        debug!(
            "GrossLeverageConstraint: scaling buys, demand {} > capacity {}",
            total_new_exposure, remaining_capacity
        );
        let scale_factor = remaining_capacity / total_new_exposure;
        for (order, price, value) in buys {
            let scaled_quantity = (value * scale_factor / price).trunc();
            if scaled_quantity >= Decimal::ONE {
                result.orders.push(order.with_quantity(scaled_quantity));
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled from {} to {} (gross leverage limit {}x)",
                        order.quantity, scaled_quantity, config.max_gross_leverage
                    ),
                ));
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled quantity < 1 (gross leverage limit {}x)",
                        config.max_gross_leverage
                    ),
                ));
            }
        }

        result
    }
}
