use thiserror::Error;

/// Raised while building a generator or session from a configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("letter weight table is empty")]
    EmptyWeights,

    #[error("weight for '{symbol}' must be positive, got {weight}")]
    NonPositiveWeight { symbol: char, weight: f64 },

    #[error("same-finger penalty must be in (0, 1], got {0}")]
    PenaltyOutOfRange(f64),

    #[error("pattern insertion rate must be in [0, 1], got {0}")]
    InsertRateOutOfRange(f64),

    #[error("pattern list contains an empty pattern")]
    EmptyPattern,

    #[error("pattern insertion rate is {0} but no patterns are configured")]
    NoPatterns(f64),

    #[error("session duration must be at least one second")]
    ZeroDuration,

    #[error("ranking has no tiers")]
    EmptyRanking,

    #[error("ranking threshold for {tier} must be finite")]
    NonFiniteThreshold { tier: String },

    #[error("ranking threshold for {lower} ({lower_min}) exceeds the one for {upper} ({upper_min})")]
    RankingNotMonotonic {
        upper: String,
        upper_min: f64,
        lower: String,
        lower_min: f64,
    },
}

/// Failures of the on-disk history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("history record could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("history directory could not be created: {0}")]
    Io(#[from] std::io::Error),
}
