pub mod alarm;
pub mod config;
pub mod error;

pub use alarm::*;
pub use config::{SchedulerConfig, TimerTierSetting};
pub use error::*;
