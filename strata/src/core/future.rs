//! Run-time configuration options with scoped, per-thread overrides.
//!
//! The option set is fixed when a [`Future`] is created; only the bound
//! values change. Currently the only option is `cell_time_objects`, which
//! controls whether [`Coord::cell`](crate::core::Coord::cell) returns time
//! coordinate values as raw numbers or as calendar datetimes.
//!
//! Every thread owns an independent copy of the options, initialised to the
//! defaults the first time that thread touches them. Temporary changes are
//! made through [`context`], whose guard restores the exact previous state
//! when it is dropped:
//!
//! ```rust
//! use strata::core::future;
//!
//! {
//!     let _guard = future::context(&[("cell_time_objects", true)]).unwrap();
//!     assert!(future::cell_time_objects());
//! }
//! assert!(!future::cell_time_objects());
//! ```

use crate::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Name of the option selecting time objects for time coordinate cells.
pub const CELL_TIME_OBJECTS: &str = "cell_time_objects";

const DEFAULTS: [(&str, bool); 1] = [(CELL_TIME_OBJECTS, false)];

/// A fixed set of named boolean options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Future {
    options: BTreeMap<&'static str, bool>,
}

impl Default for Future {
    fn default() -> Self {
        Self {
            options: DEFAULTS.into_iter().collect(),
        }
    }
}

impl Future {
    /// Creates the option set with its documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of option `name`.
    pub fn get(&self, name: &str) -> Result<bool> {
        self.options
            .get(name)
            .copied()
            .ok_or_else(|| unknown(name))
    }

    /// Sets option `name`, rejecting names outside the fixed set.
    pub fn set(&mut self, name: &str, value: bool) -> Result<()> {
        match self.options.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(unknown(name)),
        }
    }

    /// Applies every override, or none of them if any name is unknown.
    pub fn apply(&mut self, overrides: &[(&str, bool)]) -> Result<()> {
        if let Some((name, _)) = overrides.iter().find(|(n, _)| !self.options.contains_key(*n)) {
            return Err(unknown(name));
        }
        for (name, value) in overrides {
            self.set(name, *value)?;
        }
        Ok(())
    }

    pub fn cell_time_objects(&self) -> bool {
        self.options.get(CELL_TIME_OBJECTS).copied().unwrap_or(false)
    }

    /// The fixed option names, sorted.
    pub fn option_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.options.keys().copied()
    }

    /// Applies `overrides` to this value until the returned guard is dropped.
    pub fn context(&mut self, overrides: &[(&str, bool)]) -> Result<ScopedFuture<'_>> {
        let saved = self.clone();
        self.apply(overrides)?;
        Ok(ScopedFuture {
            target: self,
            saved: Some(saved),
        })
    }
}

impl fmt::Display for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .options
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write!(f, "Future({})", parts.join(", "))
    }
}

fn unknown(name: &str) -> StrataError {
    StrataError::UnknownOption {
        name: name.to_string(),
    }
}

/// Scoped override of an explicitly owned [`Future`].
#[derive(Debug)]
pub struct ScopedFuture<'a> {
    target: &'a mut Future,
    saved: Option<Future>,
}

impl Deref for ScopedFuture<'_> {
    type Target = Future;

    fn deref(&self) -> &Future {
        self.target
    }
}

impl DerefMut for ScopedFuture<'_> {
    fn deref_mut(&mut self) -> &mut Future {
        self.target
    }
}

impl Drop for ScopedFuture<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.target = saved;
        }
    }
}

thread_local! {
    static FUTURE: RefCell<Future> = RefCell::new(Future::default());
}

/// Returns a copy of the calling thread's options.
pub fn snapshot() -> Future {
    FUTURE.with(|f| f.borrow().clone())
}

/// Reads option `name` for the calling thread.
pub fn get(name: &str) -> Result<bool> {
    FUTURE.with(|f| f.borrow().get(name))
}

/// Sets option `name` for the calling thread.
pub fn set(name: &str, value: bool) -> Result<()> {
    FUTURE.with(|f| f.borrow_mut().set(name, value))
}

/// The calling thread's `cell_time_objects` option.
pub fn cell_time_objects() -> bool {
    FUTURE.with(|f| f.borrow().cell_time_objects())
}

/// Applies `overrides` to the calling thread's options until the guard drops.
///
/// The full option mapping is captured before any override is applied, and
/// restored when the guard is dropped, whether the scope ends normally, by
/// an early `?` return, or by unwinding. Guards must be dropped in reverse
/// order of creation, which ordinary lexical scoping guarantees.
pub fn context(overrides: &[(&str, bool)]) -> Result<FutureGuard> {
    FUTURE.with(|f| {
        let mut current = f.borrow_mut();
        let saved = current.clone();
        current.apply(overrides)?;
        Ok(FutureGuard {
            saved: Some(saved),
            _not_send: PhantomData,
        })
    })
}

/// Runs `f` with `overrides` applied to the calling thread's options.
pub fn with_context<T>(overrides: &[(&str, bool)], f: impl FnOnce() -> T) -> Result<T> {
    let _guard = context(overrides)?;
    Ok(f())
}

/// Restores the calling thread's options when dropped.
///
/// Bound to the thread that created it.
#[must_use = "the override is undone as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FutureGuard {
    saved: Option<Future>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FutureGuard {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            // The slot is already gone during thread teardown.
            let _ = FUTURE.try_with(|f| *f.borrow_mut() = saved);
        }
    }
}
