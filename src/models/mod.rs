use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod order;

pub use order::{Order, OrderStatus};

/// Which side of the book the bot trades on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "buy" => Some(OrderSide::Buy),
            "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV candle as returned by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub low: Decimal,
    pub high: Decimal,
    pub open: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Supported candle widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneMinute,
    FifteenMinutes,
}

impl Granularity {
    pub fn seconds(&self) -> u32 {
        match self {
            Granularity::OneMinute => 60,
            Granularity::FifteenMinutes => 60 * 15,
        }
    }
}

/// Market metadata for a trading pair such as `BTC-USD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub base_min_size: Decimal,
    pub base_increment: Decimal,
    pub quote_increment: Decimal,
}

impl Product {
    /// Round a price to the quote currency's precision
    pub fn round_quote(&self, value: Decimal) -> Decimal {
        quantize(value, self.quote_increment)
    }

    /// Round a quantity to the base currency's precision
    pub fn round_base(&self, value: Decimal) -> Decimal {
        quantize(value, self.base_increment)
    }

    /// Work out which side of the pair `currency` names
    pub fn denomination_of(&self, currency: &str) -> Option<AmountDenomination> {
        if currency.eq_ignore_ascii_case(&self.quote_currency) {
            Some(AmountDenomination::Quote)
        } else if currency.eq_ignore_ascii_case(&self.base_currency) {
            Some(AmountDenomination::Base)
        } else {
            None
        }
    }
}

/// Currency the configured trade amount is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountDenomination {
    Quote,
    Base,
}

/// Balance of one currency in the trading account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub currency: String,
    pub balance: Decimal,
    pub hold: Decimal,
    pub available: Decimal,
}

/// 24 hour ticker statistics; `last` is the most recent trade price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats24h {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub last: Decimal,
    pub volume: Decimal,
}

/// Round `value` to the decimal exponent of `increment`, half to even.
///
/// Increments are powers of ten (`0.01`, `0.00000001`), so only the
/// exponent matters.
pub fn quantize(value: Decimal, increment: Decimal) -> Decimal {
    let dp = increment.normalize().scale();
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven);
    // pad so `9000` prints as `9000.00`
    rounded.rescale(dp);
    rounded
}
