//! Constraint chain walkthrough: five correlated signals squeezed
//! through sector, correlation and position-count limits.
//!
//! Run with: cargo run --example constraint_chain

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use riskgate::sizers::FixedFractionalSizer;
use riskgate::{
    Bar, MarketState, PortfolioState, RiskConfig, RiskEngine, Signal, SignalDirection,
};

fn flat_bar(symbol: &str, price: Decimal) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        open: price,
        high: price,
        low: price,
        close: price,
        volume: dec!(10000000),
        timestamp: Utc::now(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let now = Utc::now();
    let symbols = [
        ("AAPL", dec!(150)),
        ("MSFT", dec!(380)),
        ("GOOGL", dec!(140)),
        ("XOM", dec!(100)),
        ("JPM", dec!(180)),
    ];
    let sector_map = HashMap::from([
        ("AAPL".to_string(), "Technology".to_string()),
        ("MSFT".to_string(), "Technology".to_string()),
        ("GOOGL".to_string(), "Technology".to_string()),
        ("XOM".to_string(), "Energy".to_string()),
        ("JPM".to_string(), "Financials".to_string()),
    ]);
    let correlations = HashMap::from([
        (("AAPL".to_string(), "MSFT".to_string()), 0.85),
        (("AAPL".to_string(), "GOOGL".to_string()), 0.80),
        (("MSFT".to_string(), "GOOGL".to_string()), 0.82),
        (("AAPL".to_string(), "XOM".to_string()), 0.30),
        (("AAPL".to_string(), "JPM".to_string()), 0.45),
        (("XOM".to_string(), "JPM".to_string()), 0.35),
    ]);

    let market = MarketState::new(
        symbols
            .iter()
            .map(|(s, p)| (s.to_string(), flat_bar(s, *p)))
            .collect(),
        symbols.iter().map(|(s, _)| (s.to_string(), dec!(3))).collect(),
        symbols
            .iter()
            .map(|(s, _)| (s.to_string(), dec!(10000000)))
            .collect(),
        now,
    )
    .with_sector_map(sector_map.clone())
    .with_correlations(correlations);

    let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), now);

    let config = RiskConfig {
        max_position_pct: 0.10,
        max_positions: 3,
        max_sector_pct: 0.25,
        max_correlation: Some(0.70),
        risk_per_trade: 0.05,
        ..RiskConfig::default()
    };

    let signals = vec![
        Signal::new("AAPL", now, SignalDirection::Long, 0.9),
        Signal::new("MSFT", now, SignalDirection::Long, 0.85),
        Signal::new("GOOGL", now, SignalDirection::Long, 0.8),
        Signal::new("XOM", now, SignalDirection::Long, 0.7),
        Signal::new("JPM", now, SignalDirection::Long, 0.65),
    ];

    let mut engine =
        RiskEngine::with_sizer(Box::new(FixedFractionalSizer::new(0.08).expect("valid fraction")));
    let result = engine
        .process_signals(&signals, &portfolio, &market, &config, None, None)
        .expect("config is valid");

    println!("Input: 5 signals (AAPL, MSFT, GOOGL, XOM, JPM)");
    println!("Limits: 3 positions, 25% per sector, correlation cap 0.70");
    println!();
    println!("Resulting orders:");
    for order in &result.orders {
        let sector = sector_map
            .get(&order.symbol)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "  {} {} x {} (sector: {})",
            order.side, order.symbol, order.quantity, sector
        );
    }
    if !result.rejected_signals.is_empty() {
        println!();
        println!("Rejected signals:");
        for signal in &result.rejected_signals {
            println!("  {} (strength {})", signal.symbol, signal.strength);
        }
    }
    if !result.constraint_violations.is_empty() {
        println!();
        println!("Violations by constraint:");
        for (constraint, details) in &result.constraint_violations {
            for detail in details {
                println!("  {}: {}", constraint, detail);
            }
        }
    }
}
