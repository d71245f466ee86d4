//! Core types of the loading pipeline.
//!
//! - **[`Cube`]**: the unit of loaded data, with its [`Coord`]s and attributes
//! - **[`FilterCollection`]**: a cube stream partitioned by constraint
//! - **[`Merge`]**: the strategy combining compatible cubes
//! - **[`Loader`]**: the four load modes over a configurable set of loaders
//! - **[`future`]**: thread-local run-time options with scoped overrides
//!
//! ## Architecture
//!
//! ```text
//! locations ──> RecordStream ──> FilterCollection ──> Merge ──> cubes
//!               (per scheme)     (one pair per          (skipped by
//!                                 constraint)            load_raw)
//! ```

pub mod collection;
pub mod cube;
pub mod future;
pub mod load;
pub mod merge;

pub use collection::{ConstraintPair, FilterCollection};
pub use cube::{AttributeValue, Cell, CellPoint, Coord, Cube, TimeUnits};
pub use future::{Future, FutureGuard, ScopedFuture};
pub use load::{Loader, LoaderBuilder};
pub use merge::{CoordMerge, Merge, NoMerge};
