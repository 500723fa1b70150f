use rust_decimal::Decimal;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Block or trim sells that would open a short position.
///
/// With `allow_shorts = true` (the default) this is a pass-through.
/// Otherwise buys always pass, sells against a long book are trimmed to
/// the position size if they would cross zero, and sells on a flat or
/// short book are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortSellingConstraint;

impl Constraint for ShortSellingConstraint {
    fn name(&self) -> &'static str {
        "ShortSellingConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        _market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        if config.allow_shorts {
            return ConstraintResult::pass_through(orders.to_vec());
        }

        let mut result = ConstraintResult::default();
        for order in orders {
            if order.side == OrderSide::Buy {
                result.orders.push(order.clone());
                continue;
            }

            let current_qty = portfolio.position_quantity(&order.symbol);
            if current_qty <= Decimal::ZERO {
                debug!(
                    "ShortSellingConstraint: blocking sell of {} (position {})",
                    order.symbol, current_qty
                );
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    "Short selling not allowed (allow_shorts=false)",
                ));
                continue;
            }

            if order.quantity > current_qty {
                result.orders.push(order.with_quantity(current_qty));
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Trimmed from {} to {} to avoid short position (allow_shorts=false)",
                        order.quantity, current_qty
                    ),
                ));
            } else {
                result.orders.push(order.clone());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Position;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn market() -> MarketState {
        MarketState::new(HashMap::new(), HashMap::new(), HashMap::new(), Utc::now())
    }

    fn portfolio_long(symbol: &str, quantity: Decimal) -> PortfolioState {
        let mut positions = HashMap::new();
        positions.insert(
            symbol.to_string(),
            Position::new(symbol, quantity, dec!(100), Utc::now()),
        );
        PortfolioState::new(dec!(10000), positions, Utc::now())
    }

    fn no_shorts() -> RiskConfig {
        RiskConfig {
            allow_shorts: false,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn test_pass_through_when_shorts_allowed() {
        let mut constraint = ShortSellingConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Sell,
            dec!(100),
            Utc::now(),
        )];
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());

        let result = constraint.apply(&orders, &portfolio, &market(), &RiskConfig::default());
        assert_eq!(result.orders.len(), 1);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_sell_on_flat_book_is_rejected() {
        let mut constraint = ShortSellingConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Sell,
            dec!(100),
            Utc::now(),
        )];
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());

        let result = constraint.apply(&orders, &portfolio, &market(), &no_shorts());
        assert!(result.orders.is_empty());
        assert_eq!(result.rejected.len(), 1);
        assert!(result.rejected[0].reason.contains("Short selling not allowed"));
    }

    #[test]
    fn test_crossing_sell_is_trimmed_to_position() {
        let mut constraint = ShortSellingConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Sell,
            dec!(150),
            Utc::now(),
        )];
        let portfolio = portfolio_long("AAPL", dec!(100));

        let result = constraint.apply(&orders, &portfolio, &market(), &no_shorts());
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].quantity, dec!(100));
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].original_quantity, Some(dec!(150)));
    }

    #[test]
    fn test_sell_within_position_passes_unchanged() {
        let mut constraint = ShortSellingConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Sell,
            dec!(50),
            Utc::now(),
        )];
        let portfolio = portfolio_long("AAPL", dec!(100));

        let result = constraint.apply(&orders, &portfolio, &market(), &no_shorts());
        assert_eq!(result.orders[0].quantity, dec!(50));
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_buys_always_pass() {
        let mut constraint = ShortSellingConstraint;
        let orders = vec![OrderIntent::market(
            "AAPL",
            OrderSide::Buy,
            dec!(50),
            Utc::now(),
        )];
        let portfolio = PortfolioState::new(dec!(10000), HashMap::new(), Utc::now());

        let result = constraint.apply(&orders, &portfolio, &market(), &no_shorts());
        assert_eq!(result.orders.len(), 1);
    }
}
