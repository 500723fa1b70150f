//! riskgate — the bridge between prediction and execution.
//!
//! Transforms a batch of trading signals, a portfolio snapshot and current
//! market state into a vetted batch of order intents with protective stop
//! and target prices. Sizing, the constraint chain and the engine are all
//! pure functions of their inputs; only the pyramiding and frequency-cap
//! constraints carry state, updated through explicit fill callbacks.

pub mod config;
pub mod constraints;
pub mod domain;
pub mod engine;
pub mod sizers;

pub use config::{HaltMode, PriceReference, RiskConfig, SizingMode};
pub use domain::errors::RiskConfigError;
pub use domain::market::MarketState;
pub use domain::portfolio::{PortfolioState, Position};
pub use domain::rounding::{RoundingDirection, RoundingPolicy};
pub use domain::target::{ConstraintResult, RejectedOrder, TargetPosition};
pub use domain::types::{
    Bar, OrderIntent, OrderSide, OrderType, Signal, SignalDirection, TimeInForce, Urgency,
};
pub use engine::{EngineResult, RiskEngine};
