pub mod consts;
pub mod error;
pub mod hash;
pub mod range;
pub mod strength;
pub mod indication;

pub use error::{Error, Result};
