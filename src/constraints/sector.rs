use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Cap exposure per sector at `max_sector_pct × equity`.
///
/// The sector tally starts from existing positions (valued at the bar
/// close when available, otherwise the position's own valuation) and
/// accumulates accepted buys within the batch. Without a `sector_map`
/// the constraint is a pass-through; symbols with no sector entry pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorExposureConstraint;

impl Constraint for SectorExposureConstraint {
    fn name(&self) -> &'static str {
        "SectorExposureConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult {
        if orders.is_empty() {
            return ConstraintResult::default();
        }
        let Some(sector_map) = market.sector_map.as_ref() else {
            return ConstraintResult::pass_through(orders.to_vec());
        };

        let equity = portfolio.equity();
        let max_sector_exposure =
            equity * Decimal::from_f64(config.max_sector_pct).unwrap_or(Decimal::ZERO);

        // Current exposure per sector from held positions.
        let mut sector_exposure: HashMap<&str, Decimal> = HashMap::new();
        for (symbol, position) in &portfolio.positions {
            let Some(sector) = sector_map.get(symbol) else {
                continue;
            };
            let position_value = match market.bar(symbol) {
                Some(bar) => position.quantity.abs() * bar.close,
                None => position.market_value().abs(),
            };
            *sector_exposure.entry(sector.as_str()).or_default() += position_value;
        }

        let mut result = ConstraintResult::default();
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
            let Some(sector) = sector_map.get(&order.symbol) else {
                result.orders.push(order.clone());
                continue;
            };

            let price = bar.close;
            let order_value = order.value_at(price);
            let current_exposure = sector_exposure
                .get(sector.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);
            let remaining_capacity = max_sector_exposure - current_exposure;

            if remaining_capacity <= Decimal::ZERO {
                debug!(
                    "SectorExposureConstraint: sector {} full for {}",
                    sector, order.symbol
                );
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!(
                        "Sector '{}' at max exposure ({:.0}% of equity)",
                        sector,
                        config.max_sector_pct * 100.0
                    ),
                ));
                continue;
            }

            if order_value <= remaining_capacity {
                result.orders.push(order.clone());
                *sector_exposure.entry(sector.as_str()).or_default() += order_value;
                continue;
            }

            let scaled_quantity = (remaining_capacity / price).trunc();
            if scaled_quantity >= Decimal::ONE {
                result.orders.push(order.with_quantity(scaled_quantity));
                *sector_exposure.entry(sector.as_str()).or_default() += scaled_quantity * price;
                result.rejected.push(RejectedOrder::scaled(
                    order.clone(),
                    self.name(),
                    format!(
                        "Scaled from {} to {} (sector '{}' limit {:.0}%)",
                        order.quantity,
                        scaled_quantity,
                        sector,
                        config.max_sector_pct * 100.0
                    ),
                ));
            } else {
                result.rejected.push(RejectedOrder::dropped(
                    order.clone(),
                    self.name(),
                    format!("Sector '{}' at max exposure, scaled quantity < 1", sector),
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Position;
    use crate::domain::types::Bar;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn market_with(
        closes: &[(&str, Decimal)],
        sectors: &[(&str, &str)],
    ) -> MarketState {
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
        MarketState::new(bars, HashMap::new(), HashMap::new(), Utc::now()).with_sector_map(
            sectors
                .iter()
                .map(|(s, sec)| (s.to_string(), sec.to_string()))
                .collect(),
        )
    }

    fn buy(symbol: &str, quantity: Decimal) -> OrderIntent {
        OrderIntent::market(symbol, OrderSide::Buy, quantity, Utc::now())
    }

    #[test]
    fn test_no_sector_map_is_pass_through() {
        let mut constraint = SectorExposureConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = MarketState::new(
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            Utc::now(),
        );

        let result = constraint.apply(
            &[buy("AAPL", dec!(1000000))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_unknown_sector_passes() {
        let mut constraint = SectorExposureConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with(&[("XYZ", dec!(100))], &[("AAPL", "Technology")]);

        let result = constraint.apply(
            &[buy("XYZ", dec!(10))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 1);
    }

    #[test]
    fn test_sector_cap_scales_buy() {
        let mut constraint = SectorExposureConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with(&[("AAPL", dec!(100))], &[("AAPL", "Technology")]);

        // 30% cap = $30,000; order is $50,000.
        let result = constraint.apply(
            &[buy("AAPL", dec!(500))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders[0].quantity, dec!(300));
        assert_eq!(result.rejected.len(), 1);
        assert!(result.rejected[0].reason.contains("Technology"));
    }

    #[test]
    fn test_batch_accumulates_within_sector() {
        let mut constraint = SectorExposureConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with(
            &[("AAPL", dec!(100)), ("MSFT", dec!(100))],
            &[("AAPL", "Technology"), ("MSFT", "Technology")],
        );

        // First buy fills $20k of the $30k sector budget, second gets $10k.
        let result = constraint.apply(
            &[buy("AAPL", dec!(200)), buy("MSFT", dec!(200))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 2);
        assert_eq!(result.orders[0].quantity, dec!(200));
        assert_eq!(result.orders[1].quantity, dec!(100));
    }

    #[test]
    fn test_existing_positions_count_toward_sector() {
        let mut constraint = SectorExposureConstraint;
        let mut positions = HashMap::new();
        positions.insert(
            "AAPL".to_string(),
            Position::new("AAPL", dec!(300), dec!(100), Utc::now()),
        );
        // Equity 100k (70k cash + 30k AAPL): Technology already full.
        let portfolio = PortfolioState::new(dec!(70000), positions, Utc::now());
        let market = market_with(
            &[("AAPL", dec!(100)), ("MSFT", dec!(100))],
            &[("AAPL", "Technology"), ("MSFT", "Technology")],
        );

        let result = constraint.apply(
            &[buy("MSFT", dec!(10))],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert!(result.orders.is_empty());
        assert!(result.rejected[0].reason.contains("at max exposure"));
    }

    #[test]
    fn test_sells_bypass_sector_cap() {
        let mut constraint = SectorExposureConstraint;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with(&[("AAPL", dec!(100))], &[("AAPL", "Technology")]);

        let result = constraint.apply(
            &[OrderIntent::market(
                "AAPL",
                OrderSide::Sell,
                dec!(10000),
                Utc::now(),
            )],
            &portfolio,
            &market,
            &RiskConfig::default(),
        );
        assert_eq!(result.orders.len(), 1);
    }
}
