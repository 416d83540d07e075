use rust_decimal::Decimal;

use crate::models::{quantize, AmountDenomination};
use crate::strategy::Direction;
use crate::{BotError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementAction {
    /// The current order already sits at or beyond the new target
    Keep,
    /// Cancel whatever is open and place a fresh order at `target_price`
    Replace { target_price: Decimal },
}

#[derive(Debug, Clone)]
pub struct ReplacementDecision {
    pub action: ReplacementAction,
    pub reason: String,
}

/// Offset the recent extreme by `percent_diff` percent, rounded to the quote increment
pub fn target_price(recent_extreme: Decimal, percent_diff: Decimal, quote_increment: Decimal) -> Decimal {
    let hundred = Decimal::ONE_HUNDRED;
    quantize(recent_extreme * (hundred + percent_diff) / hundred, quote_increment)
}

/// Decide whether the tracked order has to move.
///
/// The target only ever trails in the bot's favour: a dip-buy follows a
/// rising high upward, a pump-sell follows a falling low downward. An
/// equal target keeps the existing order.
pub fn decide(existing_target: Option<Decimal>, new_target: Decimal, direction: Direction) -> ReplacementDecision {
    let Some(existing) = existing_target else {
        return ReplacementDecision {
            action: ReplacementAction::Replace {
                target_price: new_target,
            },
            reason: "No open order".to_string(),
        };
    };

    let keep = match direction {
        Direction::DipBuy => new_target <= existing,
        Direction::PumpSell => new_target >= existing,
    };

    if keep {
        ReplacementDecision {
            action: ReplacementAction::Keep,
            reason: format!("Existing order at {} already covers target {}", existing, new_target),
        }
    } else {
        ReplacementDecision {
            action: ReplacementAction::Replace {
                target_price: new_target,
            },
            reason: format!("Target moved from {} to {}", existing, new_target),
        }
    }
}

/// Base-currency size for an order at `target_price`
pub fn order_size(
    amount: Decimal,
    denomination: AmountDenomination,
    target_price: Decimal,
    base_increment: Decimal,
) -> Result<Decimal> {
    match denomination {
        AmountDenomination::Quote => {
            let size = amount.checked_div(target_price).ok_or_else(|| {
                BotError::InvalidParameter(format!("cannot size an order at price {}", target_price))
            })?;
            Ok(quantize(size, base_increment))
        }
        AmountDenomination::Base => Ok(quantize(amount, base_increment)),
    }
}
