// Trailing order strategy module
pub mod decision;
pub mod scanner;

pub use decision::{decide, order_size, target_price, ReplacementAction, ReplacementDecision};
pub use scanner::{ExtremeScan, ExtremeScanner};

use rust_decimal::Decimal;

use crate::{BotError, Result};

/// Which way the bot trails the market.
///
/// Derived from the sign of the percent offset: a negative offset buys
/// below a recent high, a positive one sells above a recent low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    DipBuy,
    PumpSell,
}

impl Direction {
    pub fn from_percent_diff(percent_diff: Decimal) -> Result<Self> {
        if percent_diff.is_sign_negative() && !percent_diff.is_zero() {
            Ok(Direction::DipBuy)
        } else if percent_diff.is_sign_positive() && !percent_diff.is_zero() {
            Ok(Direction::PumpSell)
        } else {
            Err(BotError::InvalidParameter(
                "percent_diff must be non-zero (negative buys a dip, positive sells a pump)"
                    .to_string(),
            ))
        }
    }

    /// Whether `candidate` is further in this direction than `reference`
    pub fn is_beyond(&self, candidate: Decimal, reference: Decimal) -> bool {
        match self {
            Direction::DipBuy => candidate > reference,
            Direction::PumpSell => candidate < reference,
        }
    }
}
