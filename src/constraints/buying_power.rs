use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Keep total buy value within available cash.
///
/// When aggregate demand exceeds cash, every buy is scaled by the same
/// `cash / demand` factor and truncated to whole shares. Sells pass (they
/// generate cash). Rejection reasons carry the attempted value and the
/// available cash for the audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyingPowerConstraint;

impl Constraint for BuyingPowerConstraint {
    fn name(&self) -> &'static str {
        "BuyingPowerConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        market: &MarketState,
        _config: &RiskConfig,
    ) -> ConstraintResult {
        let mut result = ConstraintResult::default();
        let cash = portfolio.cash;

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

        let total_demand: Decimal = buys.iter().map(|(_, _, value)| *value).sum();
        if total_demand <= cash {
            result.orders.extend(buys.into_iter().map(|(o, _, _)| o.clone()));
            return result;
        }

        if cash <= Decimal::ZERO {
            for (order, _, value) in buys {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Insufficient buying power for {}: cost {}, cash available {}",
                        order.symbol, value, cash
                    ),
                ));
            }
            return result;
        }

        debug!(
            "BuyingPowerConstraint: demand {} exceeds cash {}, scaling buys",
            total_demand, cash
        );
        let scale_factor = cash / total_demand;
        for (order, price, value) in buys {
            let scaled_quantity = (value * scale_factor / price).trunc();
            if scaled_quantity >= Decimal::ONE {
                result.orders.push(order.with_quantity(scaled_quantity));
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled from {} to {} (cost {}, cash available {})",
                        order.quantity, scaled_quantity, value, cash
                    ),
                ));
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Insufficient buying power for {}: cost {}, cash available {}",
                        order.symbol, value, cash
                    ),
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Bar;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn market_with_closes(closes: &[(&str, Decimal)]) -> MarketState {
        let bars = closes
            .iter()
            .map(|(symbol, close)| {
                (
                    symbol.to_string(),
                    Bar {
                        symbol: symbol.to_string(),
                        open: *close,
                        high: *close,
                        low: *close,
                        close: *close,
                        volume: dec!(1000000),
                        timestamp: Utc::now(),
                    },
                )
            })
            .collect();
        MarketState::new(bars, HashMap::new(), HashMap::new(), Utc::now())
    }

    fn buy(symbol: &str, quantity: Decimal) -> OrderIntent {
        OrderIntent::market(symbol, OrderSide::Buy, quantity, Utc::now())
    }

    #[test]
    fn test_buys_within_cash_pass() {
        let mut constraint = BuyingPowerConstraint;
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100))]);

        let result = constraint.apply(
            &[buy("AAPL", dec!(50))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].quantity, dec!(50));
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_overspend_scales_proportionally() {
        let mut constraint = BuyingPowerConstraint;
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100)), ("GOOGL", dec!(100))]);

        // Demand $20,000 against $10,000 cash: each halves.
        let result = constraint.apply(
            &[buy("AAPL", dec!(100)), buy("GOOGL", dec!(100))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );

        assert_eq!(result.orders.len(), 2);
        assert_eq!(result.orders[0].quantity, dec!(50));
        assert_eq!(result.orders[1].quantity, dec!(50));
        assert_eq!(result.rejected.len(), 2);
        assert!(result.rejected[0].reason.contains("cash available 10000"));

        let spent: Decimal = result.orders.iter().map(|o| o.quantity * dec!(100)).sum();
        assert!(spent <= portfolio.cash);
    }

    #[test]
    fn test_zero_cash_rejects_all_buys() {
        let mut constraint = BuyingPowerConstraint;
        let portfolio = PortfolioState::new(dec!(0), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100))]);

        let result = constraint.apply(
            &[buy("AAPL", dec!(10))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert!(result.orders.is_empty());
        assert_eq!(result.rejected.len(), 1);
        assert!(result.rejected[0].reason.contains("Insufficient buying power"));
    }

    #[test]
    fn test_sells_pass_regardless_of_cash() {
        let mut constraint = BuyingPowerConstraint;
        let portfolio = PortfolioState::new(dec!(0), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100))]);

        let result = constraint.apply(
            &[OrderIntent::market(
                "AAPL",
                OrderSide::Sell,
                dec!(10),
                Utc::now(),
            )],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_unpriceable_buy_is_rejected_with_reason() {
        let mut constraint = BuyingPowerConstraint;
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100))]);

        let result = constraint.apply(
            &[buy("NOBAR", dec!(10))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert!(result.orders.is_empty());
        assert!(result.rejected[0].reason.contains("No bar data"));
    }
}
