use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::errors::RiskConfigError;

/// Which orders a trading halt blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HaltMode {
    /// Block new long entries only. Sells and short covers pass.
    #[default]
    BuysOnly,
    /// Block any order that grows the absolute position.
    AllRiskIncreasing,
    /// Emergency mode: block everything.
    AllTrades,
}

/// How sizing treats existing positions.
///
/// Sizers emit absolute targets and the engine trades the delta, which
/// is `Rebalance` behavior. `Incremental` and `Replace` are accepted for
/// embedding systems that pre-adjust targets before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizingMode {
    Incremental,
    #[default]
    Rebalance,
    Replace,
}

/// Which bar price sizing calculations use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceReference {
    /// `(high + low) / 2` — more stable than close.
    #[default]
    Midrange,
    Close,
    /// Falls back to close; the snapshot carries no intrabar volume.
    Vwap,
}

/// Risk parameters for sizing and constraints.
///
/// All percentages are fractions (`0.05` = 5%). Defaults are a
/// conservative zero-config starting point. Call [`RiskConfig::validate`]
/// before processing; the engine does so on every batch and fails fast
/// on an invalid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Max position size as a fraction of equity.
    pub max_position_pct: f64,
    /// Max number of concurrent positions.
    pub max_positions: usize,
    /// Minimum order notional value; buys below it are dropped.
    pub min_position_value: Decimal,

    /// Max exposure to any single sector.
    pub max_sector_pct: f64,
    /// Max gross exposure / equity ratio.
    pub max_gross_leverage: f64,
    /// Max |net exposure| / equity ratio.
    pub max_net_leverage: f64,
    /// Max pairwise correlation with held or accepted symbols.
    pub max_correlation: Option<f64>,

    /// Fraction of equity to risk per trade.
    pub risk_per_trade: f64,
    /// Fractional Kelly multiplier (0.25 = quarter Kelly).
    pub kelly_fraction: f64,
    /// Target portfolio volatility, annualized.
    pub vol_target: Option<f64>,

    pub sizing_mode: SizingMode,
    pub price_reference: PriceReference,

    /// Stop-loss distance in ATR multiples.
    pub stop_loss_atr_mult: f64,
    /// Take-profit distance in ATR multiples; no targets when unset.
    pub take_profit_atr_mult: Option<f64>,
    /// Halt trading at this drawdown from the high-water mark.
    pub max_drawdown_halt: f64,
    /// Halt trading at this loss from day-start equity.
    pub max_daily_loss_halt: Option<f64>,
    pub halt_mode: HaltMode,

    /// Allow short selling (false = long-only).
    pub allow_shorts: bool,
    /// Allow gross leverage above 1.0.
    pub allow_leverage: bool,

    /// Default annualized borrow rate for shorts.
    pub default_borrow_rate: f64,
    /// Default slippage estimate as a fraction.
    pub default_slippage_pct: f64,
    /// Default commission rate as a fraction.
    pub default_commission_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_pct: 0.05,
            max_positions: 50,
            min_position_value: dec!(100),
            max_sector_pct: 0.30,
            max_gross_leverage: 1.0,
            max_net_leverage: 1.0,
            max_correlation: None,
            risk_per_trade: 0.01,
            kelly_fraction: 0.25,
            vol_target: None,
            sizing_mode: SizingMode::default(),
            price_reference: PriceReference::default(),
            stop_loss_atr_mult: 2.0,
            take_profit_atr_mult: None,
            max_drawdown_halt: 0.15,
            max_daily_loss_halt: None,
            halt_mode: HaltMode::default(),
            allow_shorts: true,
            allow_leverage: false,
            default_borrow_rate: 0.0,
            default_slippage_pct: 0.0,
            default_commission_pct: 0.0,
        }
    }
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), RiskConfigError> {
    if value <= 0.0 || value > 1.0 {
        return Err(RiskConfigError::FractionOutOfRange {
            field,
            low: 0.0,
            high: 1.0,
            value,
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), RiskConfigError> {
    if value <= 0.0 {
        return Err(RiskConfigError::NotPositive {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), RiskConfigError> {
    if value < 0.0 {
        return Err(RiskConfigError::Negative {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl RiskConfig {
    /// Validate all field ranges and cross-field consistency.
    ///
    /// Hard errors fail the batch before any processing. The soft
    /// condition `max_position_pct × max_positions > max_gross_leverage`
    /// is accepted but logged; see [`RiskConfig::warnings`].
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        check_fraction("max_position_pct", self.max_position_pct)?;
        if self.max_positions == 0 {
            return Err(RiskConfigError::NotPositive {
                field: "max_positions",
                value: "0".to_string(),
            });
        }
        if self.min_position_value < Decimal::ZERO {
            return Err(RiskConfigError::Negative {
                field: "min_position_value",
                value: self.min_position_value.to_string(),
            });
        }
        check_fraction("max_sector_pct", self.max_sector_pct)?;
        check_positive("max_gross_leverage", self.max_gross_leverage)?;
        check_positive("max_net_leverage", self.max_net_leverage)?;
        if let Some(c) = self.max_correlation {
            check_fraction("max_correlation", c)?;
        }
        check_fraction("risk_per_trade", self.risk_per_trade)?;
        check_fraction("kelly_fraction", self.kelly_fraction)?;
        if let Some(v) = self.vol_target {
            check_positive("vol_target", v)?;
        }
        check_positive("stop_loss_atr_mult", self.stop_loss_atr_mult)?;
        if let Some(m) = self.take_profit_atr_mult {
            check_positive("take_profit_atr_mult", m)?;
        }
        check_fraction("max_drawdown_halt", self.max_drawdown_halt)?;
        if let Some(l) = self.max_daily_loss_halt {
            check_fraction("max_daily_loss_halt", l)?;
        }
        check_non_negative("default_borrow_rate", self.default_borrow_rate)?;
        check_non_negative("default_slippage_pct", self.default_slippage_pct)?;
        check_non_negative("default_commission_pct", self.default_commission_pct)?;

        if self.max_net_leverage > self.max_gross_leverage {
            return Err(RiskConfigError::NetExceedsGross {
                net: self.max_net_leverage,
                gross: self.max_gross_leverage,
            });
        }

        for warning in self.warnings() {
            warn!("Config warning: {}", warning);
        }

        Ok(())
    }

    /// Soft consistency issues that do not fail validation.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let max_theoretical = self.max_position_pct * self.max_positions as f64;
        if max_theoretical > self.max_gross_leverage {
            warnings.push(format!(
                "max_position_pct ({}) * max_positions ({}) = {:.2} exceeds \
                 max_gross_leverage ({})",
                self.max_position_pct, self.max_positions, max_theoretical, self.max_gross_leverage
            ));
        }
        warnings
    }
}
