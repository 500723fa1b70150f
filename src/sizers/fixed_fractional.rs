use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::config::RiskConfig;
use crate::domain::errors::RiskConfigError;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Allocate a fixed fraction of equity to each position.
///
/// `qty = (equity × fraction) / close`, truncated to whole shares.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFractionalSizer {
    fraction: f64,
}

impl FixedFractionalSizer {
    /// `fraction` must be in `(0, 1]`.
    pub fn new(fraction: f64) -> Result<Self, RiskConfigError> {
        if fraction <= 0.0 || fraction > 1.0 {
            return Err(RiskConfigError::FractionOutOfRange {
                field: "fraction",
                low: 0.0,
                high: 1.0,
                value: fraction,
            });
        }
        Ok(Self { fraction })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Default for FixedFractionalSizer {
    fn default() -> Self {
        Self { fraction: 0.02 }
    }
}

impl PositionSizer for FixedFractionalSizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        _config: &RiskConfig,
    ) -> Vec<TargetPosition> {
        let mut targets = Vec::new();
        let equity = portfolio.equity();
        let fraction = Decimal::from_f64(self.fraction).unwrap_or(Decimal::ZERO);

        for signal in signals {
            if signal.direction == SignalDirection::Flat {
                continue;
            }
            let Some(bar) = market.bar(&signal.symbol) else {
                continue;
            };
            let price = bar.close;
            if price <= Decimal::ZERO {
                continue;
            }

            let allocation = equity * fraction;
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
