//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use riskgate::{Bar, MarketState, PortfolioState, Position, Signal, SignalDirection};

pub fn bar(symbol: &str, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        open,
        high,
        low,
        close,
        volume: dec!(1000000),
        timestamp: Utc::now(),
    }
}

pub fn flat_bar(symbol: &str, price: Decimal) -> Bar {
    bar(symbol, price, price, price, price)
}

pub fn market_state(bars: Vec<Bar>, volatility: &[(&str, Decimal)]) -> MarketState {
    MarketState::new(
        bars.into_iter().map(|b| (b.symbol.clone(), b)).collect(),
        volatility
            .iter()
            .map(|(s, v)| (s.to_string(), *v))
            .collect(),
        HashMap::new(),
        Utc::now(),
    )
}

pub fn empty_portfolio(cash: Decimal) -> PortfolioState {
    PortfolioState::new(cash, HashMap::new(), Utc::now())
}

pub fn portfolio_with_positions(
    cash: Decimal,
    positions: Vec<(&str, Decimal, Decimal)>,
) -> PortfolioState {
    PortfolioState::new(
        cash,
        positions
            .into_iter()
            .map(|(symbol, quantity, price)| {
                (
                    symbol.to_string(),
                    Position::new(symbol, quantity, price, Utc::now()),
                )
            })
            .collect(),
        Utc::now(),
    )
}

pub fn long_signal(symbol: &str, strength: f64) -> Signal {
    Signal::new(symbol, Utc::now(), SignalDirection::Long, strength)
}

pub fn short_signal(symbol: &str, strength: f64) -> Signal {
    Signal::new(symbol, Utc::now(), SignalDirection::Short, strength)
}

pub fn at(timestamp: DateTime<Utc>, mut market: MarketState) -> MarketState {
    market.timestamp = timestamp;
    market
}
