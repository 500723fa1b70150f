use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::{HaltMode, RiskConfig};
use crate::constraints::{Constraint, default_constraints, is_risk_increasing};
use crate::domain::errors::RiskConfigError;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::types::{OrderIntent, OrderSide, Signal};
use crate::sizers::{PositionSizer, VolatilitySizer};

/// Result of one batch through the risk engine.
///
/// Always fully formed: a halted engine or a batch with every order
/// rejected still returns a complete result for the caller to inspect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineResult {
    /// Sized and constrained orders, ready for execution.
    pub orders: Vec<OrderIntent>,
    /// Input signals whose symbol survived no order.
    pub rejected_signals: Vec<Signal>,
    /// Per-constraint violation details as "symbol: reason".
    pub constraint_violations: HashMap<String, Vec<String>>,
    /// Stop-loss price per final-order symbol.
    pub stop_losses: HashMap<String, Decimal>,
    /// Take-profit price per final-order symbol; empty unless configured.
    pub take_profits: HashMap<String, Decimal>,
    /// Whether a kill switch fired.
    pub halted: bool,
    pub halt_reason: Option<String>,
}

/// Core orchestrator for the signal-to-order pipeline.
///
/// Kill switches run first (equity floor, drawdown, daily loss), then
/// the sizer, halt gating per `config.halt_mode`, the constraint chain
/// in declared order, and finally protective price computation.
///
/// ```
/// use riskgate::RiskEngine;
///
/// let mut engine = RiskEngine::new();
/// # let (signals, portfolio, market, config) = riskgate::engine::doc_fixture();
/// let result = engine
///     .process_signals(&signals, &portfolio, &market, &config, None, None)
///     .unwrap();
/// for order in &result.orders {
///     // hand off to execution
///     let _ = order;
/// }
/// ```
pub struct RiskEngine {
    sizer: Box<dyn PositionSizer>,
    constraints: Vec<Box<dyn Constraint>>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    /// Default engine: `VolatilitySizer` plus the full default chain.
    pub fn new() -> Self {
        Self {
            sizer: Box::new(VolatilitySizer::default()),
            constraints: default_constraints(),
        }
    }

    /// Custom sizer with the default constraint chain.
    pub fn with_sizer(sizer: Box<dyn PositionSizer>) -> Self {
        Self {
            sizer,
            constraints: default_constraints(),
        }
    }

    /// Fully custom engine. Callers that need `record_fill` /
    /// `record_trade` keep their own stateful constraint instances and
    /// pass clones of the chain here, or drive constraints standalone.
    pub fn with_components(
        sizer: Box<dyn PositionSizer>,
        constraints: Vec<Box<dyn Constraint>>,
    ) -> Self {
        Self { sizer, constraints }
    }

    /// Process one batch of signals into a vetted order set.
    ///
    /// `high_water_mark` enables the drawdown kill switch and
    /// `day_start_equity` the daily-loss one. Fails fast with a
    /// configuration error before touching the batch; per-order
    /// problems never fail the call.
    pub fn process_signals(
        &mut self,
        signals: &[Signal],
        portfolio: &PortfolioState,
        market: &MarketState,
        config: &RiskConfig,
        high_water_mark: Option<Decimal>,
        day_start_equity: Option<Decimal>,
    ) -> Result<EngineResult, RiskConfigError> {
        config.validate()?;

        let equity = portfolio.equity();
        let (halted, halt_reason) = check_kill_switches(
            equity,
            config,
            high_water_mark,
            day_start_equity,
        );

        if signals.is_empty() {
            return Ok(EngineResult {
                halted,
                halt_reason,
                ..EngineResult::default()
            });
        }

        // Size positions and convert targets to order deltas.
        let targets = self
            .sizer
            .size_positions(signals, portfolio, market, config);
        let mut orders: Vec<OrderIntent> = targets
            .iter()
            .filter_map(|t| t.to_order_intent(market.timestamp, None))
            .collect();

        if halted {
            orders.retain(|order| match config.halt_mode {
                HaltMode::BuysOnly => order.side != OrderSide::Buy,
                HaltMode::AllRiskIncreasing => !is_risk_increasing(order, portfolio),
                HaltMode::AllTrades => false,
            });
        }

        // Run the chain; each constraint sees the previous one's output.
        let mut constraint_violations: HashMap<String, Vec<String>> = HashMap::new();
        for constraint in &mut self.constraints {
            let result = constraint.apply(&orders, portfolio, market, config);
            orders = result.orders;

            if !result.rejected.is_empty() {
                let entries = constraint_violations
                    .entry(constraint.name().to_string())
                    .or_default();
                for rejection in &result.rejected {
                    entries.push(format!("{}: {}", rejection.order.symbol, rejection.reason));
                }
            }
            for warning in result.warnings {
                warn!("{}: {}", constraint.name(), warning);
            }
        }

        let final_symbols: std::collections::HashSet<&str> =
            orders.iter().map(|o| o.symbol.as_str()).collect();
        let rejected_signals = signals
            .iter()
            .filter(|s| !final_symbols.contains(s.symbol.as_str()))
            .cloned()
            .collect();

        let stop_losses = protective_prices(&orders, market, config.stop_loss_atr_mult, false);
        let take_profits = match config.take_profit_atr_mult {
            Some(mult) => protective_prices(&orders, market, mult, true),
            None => HashMap::new(),
        };

        Ok(EngineResult {
            orders,
            rejected_signals,
            constraint_violations,
            stop_losses,
            take_profits,
            halted,
            halt_reason,
        })
    }

    /// Stop-loss price for a single position: `entry ∓ atr × multiplier`.
    pub fn stop_loss_price(
        side: OrderSide,
        entry_price: Decimal,
        atr: Decimal,
        atr_multiplier: f64,
    ) -> Decimal {
        let mult = Decimal::from_f64(atr_multiplier).unwrap_or(Decimal::ONE);
        let stop_distance = atr * mult;
        match side {
            OrderSide::Buy => entry_price - stop_distance,
            OrderSide::Sell => entry_price + stop_distance,
        }
    }
}

/// Evaluate the kill switches in order; the first to fire wins.
fn check_kill_switches(
    equity: Decimal,
    config: &RiskConfig,
    high_water_mark: Option<Decimal>,
    day_start_equity: Option<Decimal>,
) -> (bool, Option<String>) {
    if equity <= Decimal::ZERO {
        warn!("HALT: equity floor breached, equity is {}", equity);
        return (
            true,
            Some(format!("Equity floor breached: equity is {}", equity)),
        );
    }

    if let Some(hwm) = high_water_mark
        && hwm > Decimal::ZERO
    {
        let drawdown = (hwm - equity) / hwm;
        let limit = Decimal::from_f64(config.max_drawdown_halt).unwrap_or(Decimal::ONE);
        if drawdown >= limit {
            warn!(
                "HALT: drawdown {} exceeds limit {} (hwm={}, equity={})",
                drawdown, limit, hwm, equity
            );
            return (
                true,
                Some(format!(
                    "Drawdown of {:.1}% exceeds limit of {:.1}%",
                    drawdown * Decimal::ONE_HUNDRED,
                    config.max_drawdown_halt * 100.0
                )),
            );
        }
    }

    if let Some(max_daily_loss) = config.max_daily_loss_halt
        && let Some(day_start) = day_start_equity
        && day_start > Decimal::ZERO
    {
        let daily_loss = (day_start - equity) / day_start;
        let limit = Decimal::from_f64(max_daily_loss).unwrap_or(Decimal::ONE);
        if daily_loss >= limit {
            warn!("HALT: daily loss {} exceeds limit {}", daily_loss, limit);
            return (
                true,
                Some(format!(
                    "Daily loss of {:.1}% exceeds limit of {:.1}%",
                    daily_loss * Decimal::ONE_HUNDRED,
                    max_daily_loss * 100.0
                )),
            );
        }
    }

    (false, None)
}

/// ATR-based protective prices keyed by symbol.
///
/// Stops sit against the position (`buy → below entry`); take-profits
/// sit with it (`inverted = true` flips the offset). Orders without a
/// bar or volatility entry are omitted.
fn protective_prices(
    orders: &[OrderIntent],
    market: &MarketState,
    atr_mult: f64,
    inverted: bool,
) -> HashMap<String, Decimal> {
    let mult = Decimal::from_f64(atr_mult).unwrap_or(Decimal::ONE);
    let mut prices = HashMap::new();

    for order in orders {
        let Some(bar) = market.bar(&order.symbol) else {
            continue;
        };
        let Some(atr) = market.volatility.get(&order.symbol) else {
            continue;
        };

        let midrange = bar.midrange();
        let offset = atr * mult;
        let price = match (order.side, inverted) {
            (OrderSide::Buy, false) | (OrderSide::Sell, true) => midrange - offset,
            (OrderSide::Sell, false) | (OrderSide::Buy, true) => midrange + offset,
        };
        prices.insert(order.symbol.clone(), price);
    }

    debug!("protective prices computed for {} symbols", prices.len());
    prices
}

/// Fixture for the crate-level doc example. Hidden from docs.
#[doc(hidden)]
pub fn doc_fixture() -> (Vec<Signal>, PortfolioState, MarketState, RiskConfig) {
    use crate::domain::types::{Bar, SignalDirection};

    let now = Utc::now();
    let bar = Bar {
        symbol: "AAPL".to_string(),
        open: Decimal::ONE_HUNDRED,
        high: Decimal::ONE_HUNDRED,
        low: Decimal::ONE_HUNDRED,
        close: Decimal::ONE_HUNDRED,
        volume: Decimal::ONE_THOUSAND,
        timestamp: now,
    };
    let market = MarketState::new(
        HashMap::from([("AAPL".to_string(), bar)]),
        HashMap::from([("AAPL".to_string(), Decimal::TWO)]),
        HashMap::new(),
        now,
    );
    let portfolio = PortfolioState::new(Decimal::from(100_000), HashMap::new(), now);
    let signals = vec![Signal::new("AAPL", now, SignalDirection::Long, 1.0)];
    (signals, portfolio, market, RiskConfig::default())
}
