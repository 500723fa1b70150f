use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::config::{PriceReference, RiskConfig};
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::rounding::floor_to_step;
use crate::domain::target::TargetPosition;
use crate::domain::types::{Signal, SignalDirection};
use crate::sizers::{PositionSizer, directional_target};

/// Scale position size inversely with volatility.
///
/// Each trade risks approximately the same dollar amount:
/// `qty = (equity × risk_per_trade) / (price × atr_multiple × atr)`.
/// Higher volatility yields a smaller position. A stop-price hint at
/// `price ∓ atr × atr_multiple` is attached to every target.
///
/// The default is fractional (crypto-friendly: quantities quantized to
/// 0.0001). Use [`VolatilitySizer::whole_shares`] for equity markets.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilitySizer {
    /// Per-sizer override; falls back to `config.risk_per_trade`.
    pub risk_per_trade: Option<f64>,
    /// Stop-loss distance in ATR multiples.
    pub atr_multiple: f64,
    /// Per-sizer override; falls back to `config.price_reference`.
    pub price_reference: Option<PriceReference>,
    /// Targets below this quantity are skipped.
    pub min_quantity: Decimal,
    /// Lot size quantities are truncated to; `None` keeps the raw value.
    pub quantize_step: Option<Decimal>,
}

impl Default for VolatilitySizer {
    fn default() -> Self {
        Self {
            risk_per_trade: None,
            atr_multiple: 2.0,
            price_reference: None,
            min_quantity: dec!(0.0001),
            quantize_step: Some(dec!(0.0001)),
        }
    }
}

impl VolatilitySizer {
    /// Whole-share posture for equity markets.
    pub fn whole_shares() -> Self {
        Self {
            min_quantity: Decimal::ONE,
            quantize_step: Some(Decimal::ONE),
            ..Self::default()
        }
    }
}

impl PositionSizer for VolatilitySizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> Vec<TargetPosition> {
        let mut targets = Vec::new();
        let equity = portfolio.equity();
        let risk_pct = self.risk_per_trade.unwrap_or(config.risk_per_trade);
        let risk_pct = Decimal::from_f64(risk_pct).unwrap_or(Decimal::ZERO);
        let atr_multiple = Decimal::from_f64(self.atr_multiple).unwrap_or(Decimal::ONE);
        let reference = self.price_reference.unwrap_or(config.price_reference);

        for signal in signals {
            if signal.direction == SignalDirection::Flat {
                continue;
            }
            let Some(price) = market.price(&signal.symbol, reference) else {
                continue;
            };
            let volatility = match market.volatility.get(&signal.symbol) {
                Some(v) if *v > Decimal::ZERO => *v,
                _ => {
                    debug!("VolatilitySizer: no usable volatility for {}", signal.symbol);
                    continue;
                }
            };

            let risk_amount = equity * risk_pct;
            let divisor = price * atr_multiple * volatility;
            if divisor <= Decimal::ZERO {
                continue;
            }

            let raw_quantity = risk_amount / divisor;
            let quantity = match self.quantize_step {
                Some(step) => floor_to_step(raw_quantity, step),
                None => raw_quantity,
            };
            if quantity < self.min_quantity {
                continue;
            }

            let current_quantity = portfolio.position_quantity(&signal.symbol);
            let stop_distance = volatility * atr_multiple;
            let stop_price = match signal.direction {
                SignalDirection::Long => price - stop_distance,
                _ => price + stop_distance,
            };

            targets.push(
                directional_target(signal, quantity, current_quantity)
                    .with_stop_price(stop_price),
            );
        }

        targets
    }
}
