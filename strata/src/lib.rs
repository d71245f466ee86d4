//! # Strata - Loading Multi-Dimensional Scientific Data
//!
//! Strata turns a mixed list of locations (local files, wildcard patterns,
//! `http`/`https` URLs) into cubes: named, multi-dimensional arrays with
//! coordinates and attributes. Cubes are produced lazily, selected by
//! constraints, and merged into larger cubes where they fit together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strata::prelude::*;
//!
//! # fn example() -> strata::Result<()> {
//! // Every cube in a set of files, merged where possible
//! let cubes = strata::load("/data/forecast_*.json", (), None)?;
//!
//! // Exactly one cube, or an error saying how many were found
//! let temperature = strata::load_cube("/data/forecast_*.json", "air_temperature", None)?;
//!
//! // One cube per constraint, in constraint order
//! let noon = TimeConstraint::new().hour(12);
//! let per_constraint = strata::load_cubes(
//!     "/data/forecast_*.json",
//!     vec![Constraint::name("air_temperature") & noon.into(), Constraint::name("precipitation")],
//!     None,
//! )?;
//! assert_eq!(per_constraint.len(), 2);
//! # let _ = (cubes, temperature);
//! # Ok(())
//! # }
//! ```
//!
//! ## Load modes
//!
//! | function        | merges | cardinality                        |
//! |-----------------|--------|------------------------------------|
//! | [`load`]        | yes    | none                               |
//! | [`load_cube`]   | yes    | one constraint, exactly one cube   |
//! | [`load_cubes`]  | yes    | exactly one cube per constraint    |
//! | [`load_raw`]    | no     | none                               |
//!
//! Every mode accepts one location or many, constraints as `()`, a single
//! constraint or name, or a list, and an optional [`Callback`] that may
//! edit or reject each cube as it is read.
//!
//! ## Architecture
//!
//! - **`sources`**: location decoding, the lazy record stream, scheme loaders
//!   and format decoders
//! - **`constraints`**: the predicates selecting cubes
//! - **`core`**: the cube model, partitioning, merging, the load modes and the
//!   scoped [`future`](crate::core::future) options
//! - **`config`**: site configuration
//! - **`logging`**: `tracing` configuration and subscriber setup
//!
//! Loading is synchronous: each call blocks the calling thread and reads one
//! cube at a time. Options set through [`future`](crate::core::future) are per thread.

pub mod config;
pub mod constraints;
pub mod core;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod sources;

pub use crate::error::{Result, StrataError};
pub use crate::sources::{Callback, IgnoreCube};

use crate::constraints::Constraints;
use crate::core::{Cube, Loader};
use crate::sources::Locations;
use once_cell::sync::Lazy;
use std::path::Path;

/// The library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static DEFAULT_LOADER: Lazy<Loader> = Lazy::new(Loader::default);

/// Loads every cube at `uris` matching any of `constraints`, merged.
///
/// See [`Loader::load`].
pub fn load(
    uris: impl Into<Locations>,
    constraints: impl Into<Constraints>,
    callback: Option<&Callback<'_>>,
) -> Result<Vec<Cube>> {
    DEFAULT_LOADER.load(uris, constraints, callback)
}

/// Loads the single cube at `uris` matching `constraint`.
///
/// See [`Loader::load_cube`].
pub fn load_cube(
    uris: impl Into<Locations>,
    constraint: impl Into<Constraints>,
    callback: Option<&Callback<'_>>,
) -> Result<Cube> {
    DEFAULT_LOADER.load_cube(uris, constraint, callback)
}

/// Loads exactly one merged cube per constraint.
///
/// See [`Loader::load_cubes`].
pub fn load_cubes(
    uris: impl Into<Locations>,
    constraints: impl Into<Constraints>,
    callback: Option<&Callback<'_>>,
) -> Result<Vec<Cube>> {
    DEFAULT_LOADER.load_cubes(uris, constraints, callback)
}

/// Loads matching cubes without merging.
///
/// See [`Loader::load_raw`].
pub fn load_raw(
    uris: impl Into<Locations>,
    constraints: impl Into<Constraints>,
    callback: Option<&Callback<'_>>,
) -> Result<Vec<Cube>> {
    DEFAULT_LOADER.load_raw(uris, constraints, callback)
}

/// Saves `cubes` to `target`, choosing the format by extension.
///
/// See [`Loader::save`].
pub fn save(cubes: &[Cube], target: impl AsRef<Path>) -> Result<()> {
    DEFAULT_LOADER.save(cubes, target)
}
