//! Basic sizing walkthrough: one signal through the default engine.
//!
//! Run with: cargo run --example basic_sizing

use chrono::Utc;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use riskgate::{Bar, MarketState, PortfolioState, RiskConfig, RiskEngine, Signal, SignalDirection};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let now = Utc::now();
    let bar = Bar {
        symbol: "AAPL".to_string(),
        open: dec!(100),
        high: dec!(102),
        low: dec!(98),
        close: dec!(100),
        volume: dec!(50000000),
        timestamp: now,
    };
    let market = MarketState::new(
        HashMap::from([("AAPL".to_string(), bar)]),
        HashMap::from([("AAPL".to_string(), dec!(2))]),
        HashMap::from([("AAPL".to_string(), dec!(50000000))]),
        now,
    );
    let portfolio = PortfolioState::new(dec!(100000), HashMap::new(), now);
    let signals = vec![Signal::new("AAPL", now, SignalDirection::Long, 1.0)];

    let mut engine = RiskEngine::new();
    let result = engine
        .process_signals(&signals, &portfolio, &market, &RiskConfig::default(), None, None)
        .expect("default config is valid");

    println!("Orders:");
    for order in &result.orders {
        println!("  {} {} x {}", order.side, order.symbol, order.quantity);
        if let Some(stop) = result.stop_losses.get(&order.symbol) {
            println!("    stop-loss at {}", stop);
        }
    }
    println!();
    println!(
        "Full result as JSON:\n{}",
        serde_json::to_string_pretty(&result).expect("result serializes")
    );
}
