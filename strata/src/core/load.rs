//! The public load modes and the [`Loader`] that runs them.
//!
//! Every mode builds a fresh [`RecordStream`] over the caller's locations,
//! partitions it with a [`FilterCollection`] and then applies its own
//! cardinality rule:
//!
//! | mode         | merge | result                                   |
//! |--------------|-------|------------------------------------------|
//! | `load`       | yes   | any number of cubes                      |
//! | `load_cube`  | yes   | exactly one cube from exactly one constraint |
//! | `load_cubes` | yes   | exactly one cube per constraint          |
//! | `load_raw`   | no    | any number of cubes                      |
//!
//! A decoder reporting a premature end of stream surfaces as
//! [`StrataError::Translation`].

use crate::constraints::Constraints;
use crate::core::collection::FilterCollection;
use crate::core::merge::{CoordMerge, Merge};
use crate::core::Cube;
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::sources::{Callback, FileLoader, FormatRegistry, HttpLoader, Locations, RecordStream, SchemeLoader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs load calls against a fixed set of loaders and a merge strategy.
///
/// `Loader::default()` reads files and (with the `http` feature) network
/// locations using the built-in formats, and merges with [`CoordMerge`].
///
/// ```rust,no_run
/// use strata::core::{Loader, NoMerge};
///
/// # fn example() -> strata::Result<()> {
/// let loader = Loader::builder().merger(NoMerge).build();
/// let cubes = loader.load("/data/*.json", "air_temperature", None)?;
/// # let _ = cubes;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Loader {
    file_loader: Arc<dyn SchemeLoader>,
    network_loader: Arc<dyn SchemeLoader>,
    formats: FormatRegistry,
    merger: Arc<dyn Merge>,
    log: LogConfig,
}

impl Default for Loader {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Loader {
    pub fn builder() -> LoaderBuilder {
        LoaderBuilder::default()
    }

    /// The lazy stream of every cube at `uris`, before any constraint.
    pub fn stream<'a>(&'a self, uris: impl Into<Locations>, callback: Option<&'a Callback<'a>>) -> RecordStream<'a> {
        RecordStream::new(uris, self.file_loader.as_ref(), self.network_loader.as_ref(), callback)
    }

    fn partition(
        &self,
        uris: Locations,
        constraints: Constraints,
        callback: Option<&Callback<'_>>,
    ) -> Result<FilterCollection> {
        FilterCollection::from_cubes(self.stream(uris, callback), constraints)
            .map_err(StrataError::into_translation)
    }

    /// Loads every cube matching any of `constraints`, merged.
    ///
    /// No cardinality check is made; an empty result is not an error.
    #[instrument(skip_all, fields(mode = "load"))]
    pub fn load(
        &self,
        uris: impl Into<Locations>,
        constraints: impl Into<Constraints>,
        callback: Option<&Callback<'_>>,
    ) -> Result<Vec<Cube>> {
        let collection = self
            .partition(uris.into(), constraints.into(), callback)?
            .merged(self.merger.as_ref())?;
        let pairs = collection.pairs().len();
        let cubes = collection.cubes();
        if self.log.log_data_operations {
            info!(pairs, cubes = cubes.len(), "Loaded cubes");
        }
        Ok(cubes)
    }

    /// Loads exactly one cube matching a single constraint.
    ///
    /// Anything other than one constraint fails with
    /// [`StrataError::Arity`] before any location is opened.
    #[instrument(skip_all, fields(mode = "load_cube"))]
    pub fn load_cube(
        &self,
        uris: impl Into<Locations>,
        constraint: impl Into<Constraints>,
        callback: Option<&Callback<'_>>,
    ) -> Result<Cube> {
        let constraints = constraint.into();
        if constraints.len() != 1 {
            return Err(StrataError::Arity {
                found: constraints.len(),
            });
        }

        let cubes = self
            .partition(uris.into(), constraints, callback)?
            .merged(self.merger.as_ref())?
            .cubes();
        match <[Cube; 1]>::try_from(cubes) {
            Ok([cube]) => {
                if self.log.log_data_operations {
                    info!(cube = %cube, "Loaded cube");
                }
                Ok(cube)
            }
            Err(cubes) => {
                warn!(found = cubes.len(), "Expected exactly one cube");
                Err(StrataError::ConstraintMismatch(format!(
                    "Expected exactly one cube, found {}.",
                    cubes.len()
                )))
            }
        }
    }

    /// Loads exactly one merged cube per constraint, in constraint order.
    ///
    /// Every constraint that produced some other count is reported.
    #[instrument(skip_all, fields(mode = "load_cubes"))]
    pub fn load_cubes(
        &self,
        uris: impl Into<Locations>,
        constraints: impl Into<Constraints>,
        callback: Option<&Callback<'_>>,
    ) -> Result<Vec<Cube>> {
        let collection = self
            .partition(uris.into(), constraints.into(), callback)?
            .merged(self.merger.as_ref())?;

        let failures: Vec<String> = collection
            .mismatched()
            .iter()
            .map(|pair| format!("   {} -> {} cubes", pair.constraint, pair.len()))
            .collect();
        if !failures.is_empty() {
            if self.log.log_constraint_details {
                let detail = truncate_field(failures.join("; ").trim(), self.log.max_field_length);
                warn!(failing = failures.len(), constraints = %detail, "Constraints did not each produce one cube");
            } else {
                warn!(failing = failures.len(), "Constraints did not each produce one cube");
            }
            return Err(StrataError::ConstraintMismatch(format!("\n{}", failures.join("\n"))));
        }

        let cubes = collection.cubes();
        if self.log.log_data_operations {
            info!(cubes = cubes.len(), "Loaded one cube per constraint");
        }
        Ok(cubes)
    }

    /// Loads matching cubes without merging them.
    #[instrument(skip_all, fields(mode = "load_raw"))]
    pub fn load_raw(
        &self,
        uris: impl Into<Locations>,
        constraints: impl Into<Constraints>,
        callback: Option<&Callback<'_>>,
    ) -> Result<Vec<Cube>> {
        let collection = self.partition(uris.into(), constraints.into(), callback)?;
        let pairs = collection.pairs().len();
        let cubes = collection.cubes();
        if self.log.log_data_operations {
            info!(pairs, cubes = cubes.len(), "Loaded raw cubes");
        }
        Ok(cubes)
    }

    /// Writes `cubes` to `target` in the format registered for its extension.
    #[instrument(skip_all, fields(cubes = cubes.len()))]
    pub fn save(&self, cubes: &[Cube], target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        let name = target.to_string_lossy();
        let encoder = self.formats.find(&name)?;
        debug!(path = %name, "Saving cubes");
        let file = File::create(target).with_context(|| format!("creating {name}"))?;
        let mut writer = BufWriter::new(file);
        encoder.encode(cubes, &mut writer)?;
        info!(format = encoder.name(), "Saved cubes");
        Ok(())
    }
}

/// Configures a [`Loader`].
#[derive(Debug, Default)]
pub struct LoaderBuilder {
    file_loader: Option<Arc<dyn SchemeLoader>>,
    network_loader: Option<Arc<dyn SchemeLoader>>,
    formats: Option<FormatRegistry>,
    merger: Option<Arc<dyn Merge>>,
    log: Option<LogConfig>,
}

impl LoaderBuilder {
    /// Replaces the loader used for `file` locations.
    pub fn file_loader(mut self, loader: impl SchemeLoader + 'static) -> Self {
        self.file_loader = Some(Arc::new(loader));
        self
    }

    /// Replaces the loader used for `http`/`https` locations.
    pub fn network_loader(mut self, loader: impl SchemeLoader + 'static) -> Self {
        self.network_loader = Some(Arc::new(loader));
        self
    }

    /// Sets the formats used by the default loaders and by `save`.
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Some(formats);
        self
    }

    /// Sets the merge strategy for `load`, `load_cube` and `load_cubes`.
    pub fn merger(mut self, merger: impl Merge + 'static) -> Self {
        self.merger = Some(Arc::new(merger));
        self
    }

    /// Sets how much load calls log.
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> Loader {
        let formats = self.formats.unwrap_or_default();
        Loader {
            file_loader: self
                .file_loader
                .unwrap_or_else(|| Arc::new(FileLoader::new(formats.clone()))),
            network_loader: self
                .network_loader
                .unwrap_or_else(|| Arc::new(HttpLoader::new(formats.clone()))),
            formats,
            merger: self.merger.unwrap_or_else(|| Arc::new(CoordMerge)),
            log: self.log.unwrap_or_default(),
        }
    }
}
