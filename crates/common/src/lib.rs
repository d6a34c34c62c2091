//! Error plumbing shared by the saju crates.

pub mod error;

pub use error::{Error, FromMessage, Result};
