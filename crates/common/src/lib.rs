//! Types shared by every mmrag crate.

pub mod error;
pub mod types;

pub use error::{Error, Missing, Result};
