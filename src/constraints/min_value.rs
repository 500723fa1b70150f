use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::ConstraintResult;
use crate::domain::types::{OrderIntent, OrderSide};

/// Drop buys below the minimum notional value.
///
/// Sub-minimum buys and buys without a bar are dropped silently — they
/// are simply absent from the output, with no rejection record. Sells
/// always pass (they reduce a position regardless of size).
#[derive(Debug, Clone, Copy, Default)]
pub struct MinPositionValueConstraint;

impl Constraint for MinPositionValueConstraint {
    fn name(&self) -> &'static str {
        "MinPositionValueConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        _portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        let mut result = ConstraintResult::default();

        for order in orders {
            if order.side == OrderSide::Sell {
                result.orders.push(order.clone());
                continue;
            }

            let Some(bar) = market.bar(&order.symbol) else {
                continue;
            };
            if order.value_at(bar.close) >= config.min_position_value {
                result.orders.push(order.clone());
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
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn market_with_close(symbol: &str, close: Decimal) -> MarketState {
        let bar = Bar {
            symbol: symbol.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1000000),
            timestamp: Utc::now(),
        };
        MarketState::new(
            HashMap::from([(symbol.to_string(), bar)]),
            HashMap::new(),
            HashMap::new(),
            Utc::now(),
        )
    }

    fn empty_portfolio() -> PortfolioState {
        PortfolioState::new(dec!(10000), HashMap::new(), Utc::now())
    }

    #[test]
    fn test_sub_minimum_buy_dropped_silently() {
        let mut constraint = MinPositionValueConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Buy,
            dec!(1),
            Utc::now(),
        )];
        let market = market_with_close("AAPL", dec!(50)); // $50 < $100 min

        let result = constraint.apply(&orders, &empty_portfolio(), &market, &RiskConfig::default());
        assert!(result.orders.is_empty());
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_buy_at_minimum_passes() {
        let mut constraint = MinPositionValueConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Buy,
            dec!(2),
            Utc::now(),
        )];
        let market = market_with_close("AAPL", dec!(50)); // exactly $100

        let result = constraint.apply(&orders, &empty_portfolio(), &market, &RiskConfig::default());
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_sells_always_pass() {
        let mut constraint = MinPositionValueConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Sell,
            dec!(1),
            Utc::now(),
        )];
        // No bar for AAPL at all: sells still pass.
        let market = market_with_close("OTHER", dec!(1));

        let result = constraint.apply(&orders, &empty_portfolio(), &market, &RiskConfig::default());
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_missing_bar_buy_dropped() {
        let mut constraint = MinPositionValueConstraint;
        let orders = vec![OrderIntent::market(
            "NOBAR",
            OrderSide::Buy,
            dec!(100),
            Utc::now(),
        )];
        let market = market_with_close("AAPL", dec!(50));

        let result = constraint.apply(&orders, &empty_portfolio(), &market, &RiskConfig::default());
        assert!(result.orders.is_empty());
    }
}
