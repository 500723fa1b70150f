use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Allocate equal dollar weight to each active signal.
///
/// Signals are ranked by strength and truncated to `config.max_positions`
/// before equity is split evenly among them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EqualWeightSizer;

impl PositionSizer for EqualWeightSizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> Vec<TargetPosition> {
        let mut active: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.direction != SignalDirection::Flat)
            .collect();
        if active.is_empty() {
            return Vec::new();
        }

        // Strongest signals win the limited slots; stable sort keeps
        // input order among ties.
        active.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        active.truncate(config.max_positions);

        let equity = portfolio.equity();
        let allocation_per_signal = equity / Decimal::from(active.len());

        let mut targets = Vec::new();
        for signal in active {
            let Some(bar) = market.bar(&signal.symbol) else {
                continue;
            };
            let price = bar.close;
            if price <= Decimal::ZERO {
                continue;
            }

            let quantity = (allocation_per_signal / price).trunc();
            if quantity < Decimal::ONE {
                continue;
            }

            let current_quantity = portfolio.position_quantity(&signal.symbol);
            targets.push(directional_target(signal, quantity, current_quantity));
        }

        targets
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

    fn long_signal(symbol: &str, strength: f64) -> Signal {
        Signal::new(symbol, Utc::now(), SignalDirection::Long, strength)
    }

    #[test]
    fn test_splits_equity_evenly() {
        let sizer = EqualWeightSizer;
        let portfolio = PortfolioState::new(dec!(90000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[
            ("AAPL", dec!(150)),
            ("GOOGL", dec!(100)),
            ("MSFT", dec!(300)),
        ]);
        let signals = vec![
            long_signal("AAPL", 0.9),
            long_signal("GOOGL", 0.8),
            long_signal("MSFT", 0.7),
        ];

        let targets =
            sizer.size_positions(&signals, &portfolio, &market, &RiskConfig::default());

        // $30,000 each.
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].target_quantity, dec!(200)); // AAPL
        assert_eq!(targets[1].target_quantity, dec!(300)); // GOOGL
        assert_eq!(targets[2].target_quantity, dec!(100)); // MSFT
    }

    #[test]
    fn test_truncates_to_max_positions_by_strength() {
        let sizer = EqualWeightSizer;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[
            ("AAPL", dec!(100)),
            ("GOOGL", dec!(100)),
            ("MSFT", dec!(100)),
        ]);
        let config = RiskConfig {
            max_positions: 2,
            ..RiskConfig::default()
        };
        let signals = vec![
            long_signal("AAPL", 0.5),
            long_signal("GOOGL", 0.9),
            long_signal("MSFT", 0.7),
        ];

        let targets = sizer.size_positions(&signals, &portfolio, &market, &config);

        let symbols: Vec<&str> = targets.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GOOGL", "MSFT"]);
        // Allocation divides by the truncated count (2), not the input count.
        assert_eq!(targets[0].target_quantity, dec!(500));
    }

    #[test]
    fn test_flat_signals_are_excluded_from_allocation() {
        let sizer = EqualWeightSizer;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[("AAPL", dec!(100))]);
        let signals = vec![
            long_signal("AAPL", 0.9),
            Signal::new("GOOGL", Utc::now(), SignalDirection::Flat, 0.0),
        ];

        let targets =
            sizer.size_positions(&signals, &portfolio, &market, &RiskConfig::default());

        // Only the AAPL signal counts, so it receives the full equity.
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_quantity, dec!(1000));
    }

    #[test]
    fn test_no_active_signals_yields_nothing() {
        let sizer = EqualWeightSizer;
        let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), Utc::now());
        let market = market_with_closes(&[]);
        let signals = vec![Signal::new("AAPL", Utc::now(), SignalDirection::Flat, 0.0)];

        assert!(
            sizer
                .size_positions(&signals, &portfolio, &market, &RiskConfig::default())
                .is_empty()
        );
    }
}
