use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Direction used when snapping a quantity to a lot boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundingDirection {
    #[default]
    Down,
    Up,
    Nearest,
}

/// Venue-specific quantity rounding rules.
///
/// Passed as input so the engine stays provider-agnostic: a stock venue
/// has `lot_size = 1`, a crypto venue something like `0.001`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    /// Minimum tradeable unit.
    pub lot_size: Decimal,
    /// Quantity increment, usually equal to `lot_size`.
    pub step_size: Decimal,
    /// Minimum order value in quote currency.
    pub min_notional: Decimal,
    /// Maximum decimal places for a quantity.
    pub max_precision: u32,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            lot_size: Decimal::ONE,
            step_size: Decimal::ONE,
            min_notional: Decimal::ONE,
            max_precision: 8,
        }
    }
}

impl RoundingPolicy {
    /// Whole-share policy for equity markets.
    pub fn whole_shares() -> Self {
        Self::default()
    }

    /// Fractional policy with the given lot size (crypto venues).
    pub fn fractional(lot_size: Decimal) -> Self {
        Self {
            lot_size,
            step_size: lot_size,
            min_notional: Decimal::ONE,
            max_precision: 8,
        }
    }

    /// Snap `qty` to a multiple of `lot_size`.
    ///
    /// Zero input yields zero, and a zero lot size passes the quantity
    /// through unchanged, both without performing a division.
    pub fn round_quantity(&self, qty: Decimal, direction: RoundingDirection) -> Decimal {
        if qty.is_zero() {
            return Decimal::ZERO;
        }
        if self.lot_size.is_zero() {
            return qty;
        }

        let lots = qty / self.lot_size;
        let rounded_lots = match direction {
            RoundingDirection::Down => lots.trunc(),
            RoundingDirection::Up => lots.ceil(),
            RoundingDirection::Nearest => {
                lots.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
        };

        rounded_lots * self.lot_size
    }

    /// Whether an order of `qty` at `price` meets the minimum notional.
    pub fn meets_min_notional(&self, qty: Decimal, price: Decimal) -> bool {
        qty * price >= self.min_notional
    }
}

/// Truncate `qty` to a multiple of `step`; zero step passes through.
pub(crate) fn floor_to_step(qty: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return qty;
    }
    (qty / step).trunc() * step
}
