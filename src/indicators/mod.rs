// Technical indicators module
// Long moving average used to cap how far the trailing target may chase

pub mod moving_average;

pub use moving_average::{calculate_sma, find_ma_limit, MA_PERIOD};
