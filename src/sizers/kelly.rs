use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::config::RiskConfig;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Kelly-criterion sizing with signal strength as win-probability proxy.
///
/// Full Kelly under symmetric returns is `f* = 2p − 1`; signals with no
/// edge (`p ≤ 0.5`) are skipped. The configured `kelly_fraction` scales
/// `f*` down (quarter Kelly by default) before the position value
/// `equity × f` is converted to whole shares at the close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KellySizer;

impl PositionSizer for KellySizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> Vec<TargetPosition> {
        let equity = portfolio.equity();
        let kelly_fraction =
            Decimal::from_f64(config.kelly_fraction).unwrap_or(Decimal::ZERO);

        let mut targets = Vec::new();
        for signal in signals {
            if signal.direction == SignalDirection::Flat {
                continue;
            }
            let Some(bar) = market.bar(&signal.symbol) else {
                continue;
            };

            let p = Decimal::from_f64(signal.strength).unwrap_or(Decimal::ZERO);
            let full_kelly = Decimal::TWO * p - Decimal::ONE;
            if full_kelly <= Decimal::ZERO {
                continue;
            }

            let position_fraction = full_kelly * kelly_fraction;
            let position_value = equity * position_fraction;
            let price = bar.close;
            if price <= Decimal::ZERO {
                continue;
            }
            let quantity = (position_value / price).trunc();
            if quantity < Decimal::ONE {
                continue;
            }

            let current_quantity = portfolio.position_quantity(&signal.symbol);
            targets.push(directional_target(signal, quantity, current_quantity));
        }

        targets
    }
}
