pub mod buying_power;
pub mod correlation;
pub mod frequency_cap;
pub mod leverage;
pub mod min_value;
pub mod net_leverage;
pub mod position;
pub mod pyramiding;
pub mod sector;
pub mod short_selling;

pub use buying_power::BuyingPowerConstraint;
pub use correlation::CorrelationConstraint;
pub use frequency_cap::{FrequencyCapConfig, FrequencyCapConstraint, Timeframe, TradeRecord};
pub use leverage::GrossLeverageConstraint;
pub use min_value::MinPositionValueConstraint;
pub use net_leverage::NetLeverageConstraint;
pub use position::{MaxPositionConstraint, MaxPositionsConstraint};
pub use pyramiding::{PyramidingConstraint, PyramidingState};
pub use sector::SectorExposureConstraint;
pub use short_selling::ShortSellingConstraint;

use rust_decimal::Decimal;

use crate::config::RiskConfig;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::ConstraintResult;
use crate::domain::types::{OrderIntent, OrderSide};

/// Whether an order grows directional risk for its symbol.
///
/// A buy on a flat or long book increases risk; a buy against a short
/// book covers it. Symmetrically for sells.
pub fn is_risk_increasing(order: &OrderIntent, portfolio: &PortfolioState) -> bool {
    let current_qty = portfolio.position_quantity(&order.symbol);
    match order.side {
        OrderSide::Buy => current_qty >= Decimal::ZERO,
        OrderSide::Sell => current_qty <= Decimal::ZERO,
    }
}

/// A risk filter in the constraint chain.
///
/// Constraints run sequentially in declared order; each sees the output
/// of the previous one plus the unchanged portfolio and market
/// snapshots. `apply` takes `&mut self` only for the stateful
/// constraints (pyramiding, frequency cap); the rest keep no state.
pub trait Constraint {
    /// Constraint name for logging and violation aggregation.
    fn name(&self) -> &'static str;

    /// True when `order` increases directional risk for its symbol.
    fn classify_risk(&self, order: &OrderIntent, portfolio: &PortfolioState) -> bool {
        is_risk_increasing(order, portfolio)
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
    ) -> ConstraintResult;
}

/// The default chain, in contract order.
///
/// 1. ShortSelling     — drop/trim shorts when disabled
/// 2. MinPositionValue — drop dust orders
/// 3. MaxPosition      — per-symbol size cap
/// 4. MaxPositions     — position count cap
/// 5. BuyingPower      — cash ceiling
/// 6. GrossLeverage    — total exposure cap
/// 7. NetLeverage      — signed exposure cap
/// 8. SectorExposure   — sector bucket caps
/// 9. Correlation      — diversification veto
/// 10. Pyramiding      — add-to-position limits (stateful)
/// 11. FrequencyCap    — trade-rate limits (stateful)
pub fn default_constraints() -> Vec<Box<dyn Constraint>> {
    vec![
        Box::new(ShortSellingConstraint),
        Box::new(MinPositionValueConstraint),
        Box::new(MaxPositionConstraint),
        Box::new(MaxPositionsConstraint),
        Box::new(BuyingPowerConstraint),
        Box::new(GrossLeverageConstraint),
        Box::new(NetLeverageConstraint),
        Box::new(SectorExposureConstraint),
        Box::new(CorrelationConstraint),
        Box::new(PyramidingConstraint::default()),
        Box::new(FrequencyCapConstraint::default()),
    ]
}
