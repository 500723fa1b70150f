pub mod crypto_fractional;
pub mod equal_weight;
pub mod fixed_fractional;
pub mod kelly;
pub mod risk_parity;
pub mod volatility;

pub use crypto_fractional::CryptoFractionalSizer;
pub use equal_weight::EqualWeightSizer;
pub use fixed_fractional::FixedFractionalSizer;
pub use kelly::KellySizer;
pub use risk_parity::RiskParitySizer;
pub use volatility::VolatilitySizer;

use crate::config::RiskConfig;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::TargetPosition;
use crate::domain::types::Signal;

/// Build a signed target from a non-flat signal and an unsigned quantity.
pub(crate) fn directional_target(
    signal: &Signal,
    quantity: rust_decimal::Decimal,
    current_quantity: rust_decimal::Decimal,
) -> TargetPosition {
    use crate::domain::types::SignalDirection;

    let (target_quantity, direction) = match signal.direction {
        SignalDirection::Long => (quantity, SignalDirection::Long),
        _ => (-quantity, SignalDirection::Short),
    };
    TargetPosition::new(
        signal.symbol.clone(),
        target_quantity,
        current_quantity,
        direction,
    )
    .with_signal_strength(signal.strength)
}

/// A position sizing strategy.
///
/// Pure: no side effects, no state between calls. Flat signals and
/// signals without a current bar produce no target; quantities below a
/// sizer's minimum tradeable unit are skipped.
pub trait PositionSizer {
    fn size_positions(
        &self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> Vec<TargetPosition>;
}
