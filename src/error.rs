//! Crate-level error type.
//!
//! Configuration and lookup failures are raised before anything is sent to
//! the exchange. Everything else aborts the current run; the next scheduled
//! invocation reconciles against the exchange.

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Settings file missing, unreadable, or lacking a required key.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A command-line or settings value is outside what the bot accepts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("market {0} not offered by the exchange")]
    UnknownMarket(String),

    #[error("amount currency {currency} not in market {market}")]
    UnknownCurrency { currency: String, market: String },

    /// An exchange payload lacked a field the order record needs.
    #[error("exchange payload missing field `{0}`")]
    MissingField(&'static str),

    #[error("exchange error ({status}): {message}")]
    Exchange { status: u16, message: String },

    /// The exchange refused a new order for a reason other than price.
    #[error("could not place order: {0}")]
    PlacementFailed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("signing error: {0}")]
    Signing(String),
}
