use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Cap |net exposure| (longs minus shorts) at `max_net_leverage × equity`.
///
/// Unlike the gross cap, a balanced long/short book can keep adding
/// offsetting positions. Orders that strictly shrink |net| always pass;
/// the rest share the remaining directional room proportionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetLeverageConstraint;

impl Constraint for NetLeverageConstraint {
    fn name(&self) -> &'static str {
        "NetLeverageConstraint"
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
        let max_net_exposure =
            equity * Decimal::from_f64(config.max_net_leverage).unwrap_or(Decimal::ZERO);
        let current_net = portfolio.net_exposure();

        // (order, price, signed delta) for orders that grow |net|.
        let mut increasing: Vec<(&OrderIntent, Decimal, Decimal)> = Vec::new();
        for order in orders {
            let Some(bar) = market.bar(&order.symbol) else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!("No bar data for {}", order.symbol),
                ));
                continue;
            };
            let price = bar.close;
            let delta = match order.side {
                OrderSide::Buy => order.value_at(price),
                OrderSide::Sell => -order.value_at(price),
            };

            if (current_net + delta).abs() < current_net.abs() {
                result.orders.push(order.clone());
            } else {
                increasing.push((order, price, delta));
            }
        }

        if increasing.is_empty() {
            return result;
        }

        let proposed_delta: Decimal = increasing.iter().map(|(_, _, delta)| *delta).sum();
        if (current_net + proposed_delta).abs() <= max_net_exposure {
            result
                .orders
                .extend(increasing.into_iter().map(|(o, _, _)| o.clone()));
            return result;
        }

        // Room in the direction the batch is pushing.
        let available = if proposed_delta > Decimal::ZERO {
            max_net_exposure - current_net
        } else {
            max_net_exposure + current_net
        };

        if available <= Decimal::ZERO {
            for (order, _, _) in increasing {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Net leverage at max ({}x), no capacity in this direction",
                        config.max_net_leverage
                    ),
                ));
            }
            return result;
        }

        debug!(
            "NetLeverageConstraint: scaling, |delta| {} > available {}",
            proposed_delta.abs(),
            available
        );
        let scale_factor = available / proposed_delta.abs();
        for (order, price, delta) in increasing {
            let scaled_quantity = (delta.abs() * scale_factor / price).trunc();
            if scaled_quantity >= Decimal::ONE {
                result.orders.push(order.with_quantity(scaled_quantity));
                if scaled_quantity < order.quantity {
                    result.rejected.push(RejectedOrder::scaled(
                        order.clone(),
                        self.name(),
                        format!(
                            "Scaled from {} to {} (net leverage limit {}x)",
                            order.quantity, scaled_quantity, config.max_net_leverage
                        ),
                    ));
                }
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled quantity < 1 (net leverage limit {}x)",
                        config.max_net_leverage
                    ),
                ));
            }
        }

        result
    }
}
