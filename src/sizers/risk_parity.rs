use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::config::RiskConfig;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Equal risk contribution from each position.
///
/// Weights are inverse-volatility normalized
/// (`w_i = (1/σ_i) / Σ(1/σ_j)`), so each position contributes roughly
/// the same `q_i × σ_i`. Signals with zero or missing volatility are
/// skipped; quantities are whole shares at the midrange price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskParitySizer;

impl PositionSizer for RiskParitySizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> Vec<TargetPosition> {
        // (signal, inverse volatility, midrange price)
        let mut valid: Vec<(&Signal, Decimal, Decimal)> = Vec::new();
        for signal in signals {
            if signal.direction == SignalDirection::Flat {
                continue;
            }
            let Some(bar) = market.bar(&signal.symbol) else {
                continue;
            };
            let Some(volatility) = market.volatility.get(&signal.symbol) else {
                continue;
            };
            if *volatility <= Decimal::ZERO {
                continue;
            }
            valid.push((signal, Decimal::ONE / volatility, bar.midrange()));
        }

        if valid.is_empty() {
            return Vec::new();
        }

        let total_inverse_vol: Decimal = valid.iter().map(|(_, iv, _)| *iv).sum();
        if total_inverse_vol <= Decimal::ZERO {
            return Vec::new();
        }

        let equity = portfolio.equity();
        let risk_per_trade =
            Decimal::from_f64(config.risk_per_trade).unwrap_or(Decimal::ZERO);
        let total_allocation = equity * risk_per_trade;

        let mut targets = Vec::new();
        for (signal, inverse_vol, price) in valid {
            let weight = inverse_vol / total_inverse_vol;
            let allocation = total_allocation * weight;
            if price <= Decimal::ZERO {
                continue;
            }
            let quantity = (allocation / price).trunc();
            if quantity < Decimal::ONE {
                continue;
            }

            let current_quantity = portfolio.position_quantity(&signal.symbol);
            targets.push(directional_target(signal, quantity, current_quantity));
        }

        targets
    }
}
