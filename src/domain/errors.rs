use thiserror::Error;

/// Errors detected while validating configuration.
///
/// These fail fast, before any batch is processed. Per-order problems
/// (insufficient buying power, leverage limits, halts) are never errors:
/// they surface as `RejectedOrder` entries or as the engine's halt state.
#[derive(Debug, Error)]
pub enum RiskConfigError {
    #[error("max_net_leverage ({net}) cannot exceed max_gross_leverage ({gross})")]
    NetExceedsGross { net: f64, gross: f64 },

    #[error("{field} must be in range ({low}, {high}], got {value}")]
    FractionOutOfRange {
        field: &'static str,
        low: f64,
        high: f64,
        value: f64,
    },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: String },

    #[error("unknown timeframe: {input} (valid: second, minute, hour, day, week, month)")]
    UnknownTimeframe { input: String },
}
