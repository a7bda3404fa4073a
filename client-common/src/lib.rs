pub mod config;
pub mod hibp;
pub mod mocked;
pub mod core;

pub use crate::core::{CheckOutcome, CheckReport, Checker, RenderSink, TextSource, check_once};
pub use config::Config;
pub use hibp::{HibpClient, RangeSource, check_exposure};
pub use mocked::MockedRangeSource;
