//! Prelude for commonly used types and traits in strata.

pub use crate::config::SiteConfig;
pub use crate::constraints::{Constraint, Constraints, TimeConstraint};
pub use crate::core::{Cube, Loader};
pub use crate::error::{ErrorContext, Result, StrataError};
pub use crate::logging::LogConfig;
