// Order lifecycle execution
pub mod driver;

pub use driver::{Driver, RunOutcome, TrailParams};
