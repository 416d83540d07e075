use rust_decimal::Decimal;

use crate::models::{quantize, Candle};
use crate::strategy::Direction;

/// Number of 15-minute closes in the long moving average
pub const MA_PERIOD: usize = 200;

/// Calculate Simple Moving Average (SMA) over the last `period` prices
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices.iter().rev().take(period).sum();
    Some(sum / Decimal::from(period))
}

/// Find the moving-average value at the most recent candle that crossed it.
///
/// `candles` are newest first. Walking back from the newest candle, each
/// candle is compared against the SMA of closes over itself and the
/// `period - 1` candles before it; candles without a full window are not
/// considered. For a dip-buy the first candle whose high is above its SMA
/// wins, for a pump-sell the first whose low is below. The SMA is rounded
/// to `quote_increment`.
pub fn find_ma_limit(
    candles: &[Candle],
    period: usize,
    direction: Direction,
    quote_increment: Decimal,
) -> Option<Decimal> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

    for (index, candle) in candles.iter().enumerate() {
        if candles.len() - index < period {
            break;
        }

        let sma = quantize(calculate_sma(&closes[index..index + period], period)?, quote_increment);
        tracing::debug!("{}: {}-period MA {}", candle.time, period, sma);

        let breached = match direction {
            Direction::DipBuy => candle.high > sma,
            Direction::PumpSell => candle.low < sma,
        };
        if breached {
            tracing::info!("MA limit set at {} from {} (UTC)", sma, candle.time);
            return Some(sma);
        }
    }

    tracing::info!(
        "The {}-period MA was not breached through {} (UTC)",
        period,
        candles[candles.len() - period].time
    );
    None
}
