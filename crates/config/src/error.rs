pub use saju_common::{Error, Result};

saju_common::impl_context!();
