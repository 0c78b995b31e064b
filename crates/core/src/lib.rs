#![forbid(unsafe_code)]

pub mod correction;
pub mod daily_target;
pub mod error;
pub mod ledger;
pub mod model;
pub mod pace;
pub mod remaining;
pub mod time;
pub mod units;
pub mod urgency;

pub use error::Error;
pub use time::Clock;
