use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use tracing::debug;

use crate::config::RiskConfig;
use crate::constraints::Constraint;
use crate::domain::errors::RiskConfigError;
use crate::domain::market::MarketState;
use crate::domain::portfolio::PortfolioState;
use crate::domain::target::{ConstraintResult, RejectedOrder};
use crate::domain::types::{OrderIntent, OrderSide};

/// Window granularity for frequency caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    /// 30-day approximation.
    Month,
}

impl Timeframe {
    pub fn as_seconds(&self) -> i64 {
        match self {
            Timeframe::Second => 1,
            Timeframe::Minute => 60,
            Timeframe::Hour => 3_600,
            Timeframe::Day => 86_400,
            Timeframe::Week => 604_800,
            Timeframe::Month => 2_592_000,
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::seconds(self.as_seconds())
    }

    fn label(&self) -> &'static str {
        match self {
            Timeframe::Second => "second",
            Timeframe::Minute => "minute",
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl FromStr for Timeframe {
    type Err = RiskConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "second" | "sec" | "s" | "1s" => Ok(Timeframe::Second),
            "minute" | "min" | "m" | "1m" => Ok(Timeframe::Minute),
            "hour" | "hr" | "h" | "1h" => Ok(Timeframe::Hour),
            "day" | "d" | "1d" => Ok(Timeframe::Day),
            "week" | "wk" | "w" | "1w" => Ok(Timeframe::Week),
            "month" | "mo" | "1mo" => Ok(Timeframe::Month),
            other => Err(RiskConfigError::UnknownTimeframe {
                input: other.to_string(),
            }),
        }
    }
}

/// One frequency cap rule: at most `max_trades` per `timeframe`,
/// either per symbol or across the whole book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyCapConfig {
    pub max_trades: usize,
    pub timeframe: Timeframe,
    pub per_symbol: bool,
}

impl FrequencyCapConfig {
    pub fn new(max_trades: usize, timeframe: Timeframe) -> Self {
        Self {
            max_trades,
            timeframe,
            per_symbol: true,
        }
    }

    pub fn global(max_trades: usize, timeframe: Timeframe) -> Self {
        Self {
            max_trades,
            timeframe,
            per_symbol: false,
        }
    }
}

/// A confirmed trade, kept for window counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub quantity: Decimal,
}

/// Limit trade frequency to prevent over-trading.
///
/// Several caps can coexist (e.g. 3/minute per symbol and 100/day
/// global); an order must clear all of them, counting both confirmed
/// history and orders already accepted in the current batch.
/// Risk-reducing orders are not exempt. History moves only through
/// [`FrequencyCapConstraint::record_trade`] after fills confirm, and is
/// pruned on each `apply` to the longest window plus a small buffer.
#[derive(Debug, Clone)]
pub struct FrequencyCapConstraint {
    caps: Vec<FrequencyCapConfig>,
    trade_history: VecDeque<TradeRecord>,
    max_history_duration: Duration,
}

impl Default for FrequencyCapConstraint {
    fn default() -> Self {
        Self {
            caps: vec![FrequencyCapConfig::new(10, Timeframe::Minute)],
            trade_history: VecDeque::new(),
            max_history_duration: Timeframe::Minute.to_duration(),
        }
    }
}

impl FrequencyCapConstraint {
    /// `caps` must be non-empty with every `max_trades >= 1`.
    pub fn new(caps: Vec<FrequencyCapConfig>) -> Result<Self, RiskConfigError> {
        if caps.is_empty() {
            return Err(RiskConfigError::NotPositive {
                field: "caps",
                value: "0".to_string(),
            });
        }
        for cap in &caps {
            if cap.max_trades < 1 {
                return Err(RiskConfigError::NotPositive {
                    field: "max_trades",
                    value: cap.max_trades.to_string(),
                });
            }
        }
        let max_history_duration = caps
            .iter()
            .map(|c| c.timeframe.to_duration())
            .max()
            .unwrap_or_else(|| Timeframe::Minute.to_duration());
        Ok(Self {
            caps,
            trade_history: VecDeque::new(),
            max_history_duration,
        })
    }

    /// Restore a constraint with pre-existing history (recovery, tests).
    /// Records must be in chronological order.
    pub fn with_history(
        caps: Vec<FrequencyCapConfig>,
        trade_history: Vec<TradeRecord>,
    ) -> Result<Self, RiskConfigError> {
        let mut constraint = Self::new(caps)?;
        constraint.trade_history = trade_history.into();
        Ok(constraint)
    }

    pub fn caps(&self) -> &[FrequencyCapConfig] {
        &self.caps
    }

    /// Record a confirmed fill for window counting.
    pub fn record_trade(
        &mut self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        side: OrderSide,
        quantity: Decimal,
    ) {
        self.trade_history.push_back(TradeRecord {
            symbol: symbol.to_string(),
            timestamp,
            side,
            quantity,
        });
    }

    /// Count history records, optionally filtered by symbol and start.
    pub fn trade_count(&self, symbol: Option<&str>, since: Option<DateTime<Utc>>) -> usize {
        self.trade_history
            .iter()
            .filter(|r| symbol.is_none_or(|s| r.symbol == s))
            .filter(|r| since.is_none_or(|t| r.timestamp >= t))
            .count()
    }

    pub fn clear_history(&mut self) {
        self.trade_history.clear();
    }

    /// Snapshot of the retained history, e.g. for persistence.
    pub fn history(&self) -> Vec<TradeRecord> {
        self.trade_history.iter().cloned().collect()
    }

    fn prune_history(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.max_history_duration - Duration::minutes(1);
        while let Some(front) = self.trade_history.front() {
            if front.timestamp < cutoff {
                self.trade_history.pop_front();
            } else {
                break;
            }
        }
    }

    fn check_caps(
        &self,
        order: &OrderIntent,
        now: DateTime<Utc>,
        batch_by_symbol: &HashMap<String, usize>,
        batch_global: usize,
    ) -> Option<String> {
        for cap in &self.caps {
            let window_start = now - cap.timeframe.to_duration();

            if cap.per_symbol {
                let history_count = self
                    .trade_history
                    .iter()
                    .filter(|t| t.symbol == order.symbol && t.timestamp >= window_start)
                    .count();
                let total = history_count + batch_by_symbol.get(&order.symbol).copied().unwrap_or(0);
                if total >= cap.max_trades {
                    return Some(format!(
                        "Frequency cap exceeded for {}: {} trades in {} (max {})",
                        order.symbol,
                        total,
                        cap.timeframe.label(),
                        cap.max_trades
                    ));
                }
            } else {
                let history_count = self
                    .trade_history
                    .iter()
                    .filter(|t| t.timestamp >= window_start)
                    .count();
                let total = history_count + batch_global;
                if total >= cap.max_trades {
                    return Some(format!(
                        "Global frequency cap exceeded: {} trades in {} (max {})",
                        total,
                        cap.timeframe.label(),
                        cap.max_trades
                    ));
                }
            }
        }
        None
    }
}

impl Constraint for FrequencyCapConstraint {
    fn name(&self) -> &'static str {
        "FrequencyCapConstraint"
    }

    fn apply(
        &mut self,
        orders: &[OrderIntent],
        _portfolio: &PortfolioState,
        market: &MarketState,
        _config: &RiskConfig,
    ) -> ConstraintResult {
        let now = market.timestamp;
        self.prune_history(now);

        let mut result = ConstraintResult::default();
        let mut batch_by_symbol: HashMap<String, usize> = HashMap::new();
        let mut batch_global = 0usize;

        for order in orders {
            match self.check_caps(order, now, &batch_by_symbol, batch_global) {
                Some(violation) => {
                    debug!("FrequencyCapConstraint: {}", violation);
                    result
                        .rejected
                        .push(RejectedOrder::dropped(order.clone(), self.name(), violation));
                }
                None => {
                    *batch_by_symbol.entry(order.symbol.clone()).or_default() += 1;
                    batch_global += 1;
                    result.orders.push(order.clone());
                }
            }
        }

        result
    }
}
