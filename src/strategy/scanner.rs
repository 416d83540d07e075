use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{quantize, Candle};
use crate::strategy::Direction;

/// Result of scanning the candle window for the run's reference price
#[derive(Debug, Clone, PartialEq)]
pub struct ExtremeScan {
    /// Highest high (dip-buy) or lowest low (pump-sell) since the cutoff
    pub recent_extreme: Decimal,
    /// Moving-average cap that was in force, if any
    pub ma_limit: Option<Decimal>,
    /// No candle was newer than the cutoff; the current price stood in
    pub used_current_price: bool,
}

/// Finds the most extreme price the market reached since the last order
pub struct ExtremeScanner {
    direction: Direction,
    quote_increment: Decimal,
}

impl ExtremeScanner {
    pub fn new(direction: Direction, quote_increment: Decimal) -> Self {
        Self {
            direction,
            quote_increment,
        }
    }

    /// Scan `candles` (newest first) for the extreme since `cutoff`.
    ///
    /// Only candles strictly newer than `cutoff` count; `None` means the
    /// whole window. If none qualify, the order closed inside the candle
    /// lag and `current_price` is used. A current price further out than
    /// the candles supersedes them. `ma_limit` then caps the result.
    pub fn scan(
        &self,
        candles: &[Candle],
        cutoff: Option<DateTime<Utc>>,
        current_price: Decimal,
        ma_limit: Option<Decimal>,
    ) -> ExtremeScan {
        let current_price = quantize(current_price, self.quote_increment);

        let recent = candles
            .iter()
            .filter(|c| cutoff.map_or(true, |cutoff| c.time > cutoff));

        let window_extreme = match self.direction {
            Direction::DipBuy => recent.map(|c| c.high).max(),
            Direction::PumpSell => recent.map(|c| c.low).min(),
        };

        let (mut recent_extreme, used_current_price) = match window_extreme {
            None => {
                tracing::info!("Last order just closed; using current price for recent extreme");
                (current_price, true)
            }
            Some(extreme) => {
                let extreme = quantize(extreme, self.quote_increment);
                if self.direction.is_beyond(current_price, extreme) {
                    tracing::debug!(
                        "Price moved past candle extreme {} to {} during candle lag",
                        extreme,
                        current_price
                    );
                    (current_price, false)
                } else {
                    (extreme, false)
                }
            }
        };

        if let Some(limit) = ma_limit {
            if self.direction.is_beyond(recent_extreme, limit) {
                tracing::info!("Enforcing MA limit: {} capped at {}", recent_extreme, limit);
                recent_extreme = limit;
            }
        }

        ExtremeScan {
            recent_extreme,
            ma_limit,
            used_current_price,
        }
    }
}
