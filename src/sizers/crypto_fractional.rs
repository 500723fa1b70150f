use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::config::RiskConfig;
use crate::domain::errors::RiskConfigError;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::rounding::floor_to_step;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Fixed-fraction sizing with fractional lots for crypto venues.
///
/// `qty = (equity × fraction) / close`, truncated to `step_qty` (or to
/// four decimals when no step is given); targets below `min_qty` are
/// skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoFractionalSizer {
    fraction: f64,
    min_qty: Decimal,
    step_qty: Option<Decimal>,
}

impl CryptoFractionalSizer {
    /// `fraction` must be in `(0, 1]`; `min_qty` and a provided
    /// `step_qty` must be positive.
    pub fn new(
        fraction: f64,
        min_qty: Decimal,
        step_qty: Option<Decimal>,
    ) -> Result<Self, RiskConfigError> {
        if fraction <= 0.0 || fraction > 1.0 {
            return Err(RiskConfigError::FractionOutOfRange {
                field: "fraction",
                low: 0.0,
                high: 1.0,
                value: fraction,
            });
        }
        if min_qty <= Decimal::ZERO {
            return Err(RiskConfigError::NotPositive {
                field: "min_qty",
                value: min_qty.to_string(),
            });
        }
        if let Some(step) = step_qty
            && step <= Decimal::ZERO
        {
            return Err(RiskConfigError::NotPositive {
                field: "step_qty",
                value: step.to_string(),
            });
        }
        Ok(Self {
            fraction,
            min_qty,
            step_qty,
        })
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Default for CryptoFractionalSizer {
    fn default() -> Self {
        Self {
            fraction: 0.02,
            min_qty: dec!(0.0001),
            step_qty: Some(dec!(0.0001)),
        }
    }
}

impl PositionSizer for CryptoFractionalSizer {
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
            let raw_quantity = allocation / price;
            let quantity = match self.step_qty {
                Some(step) => floor_to_step(raw_quantity, step),
                None => raw_quantity.round_dp_with_strategy(4, RoundingStrategy::ToZero),
            };

            if quantity <= Decimal::ZERO || quantity < self.min_qty {
                continue;
            }

            let current_quantity = portfolio.position_quantity(&signal.symbol);
            targets.push(directional_target(signal, quantity, current_quantity));
        }

        targets
    }
}
