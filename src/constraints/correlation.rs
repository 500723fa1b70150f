use std::collections::HashSet;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Veto buys that are too correlated with the book.
///
/// Each buy is checked pairwise against existing positions and buys
/// already accepted in this batch. Negative correlations always pass
/// (hedges), as do pairs with no data. A pass-through when either
/// `config.max_correlation` or the correlation matrix is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationConstraint;

impl CorrelationConstraint {
    fn find_highly_correlated<'a>(
        symbol: &str,
        check_symbols: impl Iterator<Item = &'a str>,
        market: &MarketState,
        max_correlation: f64,
    ) -> Option<String> {
        for check_symbol in check_symbols {
            if check_symbol == symbol {
                continue;
            }
            if let Some(corr) = market.correlation(symbol, check_symbol)
                && corr > max_correlation
            {
                return Some(check_symbol.to_string());
            }
        }
        None
    }
}

impl Constraint for CorrelationConstraint {
    fn name(&self) -> &'static str {
        "CorrelationConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        let Some(max_correlation) = config.max_correlation else {
            return ConstraintResult::pass_through(orders.to_vec());
        };
        if market.correlations.is_none() {
            return ConstraintResult::pass_through(orders.to_vec());
        }

        let mut accepted_symbols: HashSet<String> = HashSet::new();
        let mut result = ConstraintResult::default();

        for order in orders {
            if order.side == OrderSide::Sell {
                result.orders.push(order.clone());
                continue;
            }

            let check_symbols = portfolio
                .positions
                .keys()
                .map(String::as_str)
                .chain(accepted_symbols.iter().map(String::as_str));

            match Self::find_highly_correlated(
                &order.symbol,
                check_symbols,
                market,
                max_correlation,
            ) {
                Some(correlated_with) => {
                    debug!(
                        "CorrelationConstraint: {} too correlated with {}",
                        order.symbol, correlated_with
                    );
                    result.rejected.push(RejectedOrder::dropped(
                        order.clone(),
                        self.name(),
                        format!(
                            "Highly correlated with {} (max correlation {:.2})",
                            correlated_with, max_correlation
                        ),
                    ));
                }
                None => {
                    accepted_symbols.insert(order.symbol.clone());
                    result.orders.push(order.clone());
                }
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
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn market_with_correlations(pairs: &[(&str, &str, f64)]) -> MarketState {
        MarketState::new(HashMap::new(), HashMap::new(), HashMap::new(), Utc::now())
            .with_correlations(
                pairs
                    .iter()
                    .map(|(a, b, c)| ((a.to_string(), b.to_string()), *c))
                    .collect(),
            )
    }

    fn portfolio_holding(symbol: &str, quantity: Decimal) -> PortfolioState {
        let mut positions = HashMap::new();
        positions.insert(
            symbol.to_string(),
            Position::new(symbol, quantity, dec!(100), Utc::now()),
        );
        PortfolioState::new(dec!(100000), positions, Utc::now())
    }

    fn buy(symbol: &str) -> OrderIntent {
        OrderIntent::market(symbol, OrderSide::Buy, dec!(10), Utc::now())
    }

    fn config_with_cap(max_correlation: f64) -> RiskConfig {
        RiskConfig {
            max_correlation: Some(max_correlation),
            ..RiskConfig::default()
        }
    }

    #[test]
    fn test_pass_through_without_cap_or_data() {
        let mut constraint = CorrelationConstraint;
        let portfolio = portfolio_holding("MSFT", dec!(10));

        let no_cap = MarketState::new(HashMap::new(), HashMap::new(), HashMap::new(), Utc::now());
        let result = constraint.apply(&[buy("AAPL")], &portfolio, &no_cap, &RiskConfig::default());
        assert_eq!(result.orders.len(), 1);

        // Cap set, but no correlation data.
        let result = constraint.apply(&[buy("AAPL")], &portfolio, &no_cap, &config_with_cap(0.7));
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_correlated_buy_is_rejected() {
        let mut constraint = CorrelationConstraint;
        let portfolio = portfolio_holding("MSFT", dec!(10));
        let market = market_with_correlations(&[("AAPL", "MSFT", 0.9)]);

        let result = constraint.apply(&[buy("AAPL")], &portfolio, &market, &config_with_cap(0.7));
        assert!(result.orders.is_empty());
        assert!(result.rejected[0].reason.contains("MSFT"));
    }

    #[test]
    fn test_negative_correlation_is_a_hedge() {
        let mut constraint = CorrelationConstraint;
        let portfolio = portfolio_holding("MSFT", dec!(10));
        let market = market_with_correlations(&[("AAPL", "MSFT", -0.9)]);

        let result = constraint.apply(&[buy("AAPL")], &portfolio, &market, &config_with_cap(0.7));
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_checks_against_accepted_batch_orders() {
        let mut constraint = CorrelationConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with_correlations(&[("GOOGL", "AAPL", 0.95)]);

        let result = constraint.apply(
            &[buy("AAPL"), buy("GOOGL")],
            &portfolio,
            &market,
            &config_with_cap(0.7),
        );

        // AAPL accepted first; GOOGL then collides with it.
        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].symbol, "AAPL");
        assert_eq!(result.rejected[0].order.symbol, "GOOGL");
    }

    #[test]
    fn test_missing_pair_data_allows() {
        let mut constraint = CorrelationConstraint;
        let portfolio = portfolio_holding("MSFT", dec!(10));
        let market = market_with_correlations(&[("XOM", "JPM", 0.9)]);

        let result = constraint.apply(&[buy("AAPL")], &portfolio, &market, &config_with_cap(0.7));
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_sells_bypass_correlation() {
        let mut constraint = CorrelationConstraint;
        let portfolio = portfolio_holding("MSFT", dec!(10));
        let market = market_with_correlations(&[("AAPL", "MSFT", 0.99)]);

        let result = constraint.apply(
            &[OrderIntent::market(
                "AAPL",
                OrderSide::Sell,
                dec!(10),
                Utc::now(),
            )],
            &portfolio,
            &market,
            &config_with_cap(0.7),
        );
        assert_eq!(result.orders.len(), 1);
    }
}
