//! The lazy record stream spanning every location of a load call.

use super::{Callback, CubeStream, Locations, SchemeLoader, FILE_SCHEME, NETWORK_SCHEMES};
use crate::core::Cube;
use crate::prelude::*;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use tracing::debug;

/// A single-pass stream of cubes across heterogeneous locations.
///
/// On the first pull the locations are decoded, sorted and grouped by
/// scheme. Groups are then handed, strictly in sequence, to the loader for
/// their scheme: `file` identifiers go to the file loader unchanged, while
/// `http`/`https` identifiers have their scheme reattached for the network
/// loader. Any other scheme fails when its group is reached.
///
/// Only one cube is in flight at a time. The first error ends the stream.
pub struct RecordStream<'a> {
    locations: Option<Locations>,
    groups: VecDeque<(String, Vec<String>)>,
    current: Option<CubeStream<'a>>,
    file_loader: &'a dyn SchemeLoader,
    network_loader: &'a dyn SchemeLoader,
    callback: Option<&'a Callback<'a>>,
    done: bool,
}

impl<'a> RecordStream<'a> {
    pub fn new(
        locations: impl Into<Locations>,
        file_loader: &'a dyn SchemeLoader,
        network_loader: &'a dyn SchemeLoader,
        callback: Option<&'a Callback<'a>>,
    ) -> Self {
        Self {
            locations: Some(locations.into()),
            groups: VecDeque::new(),
            current: None,
            file_loader,
            network_loader,
            callback,
            done: false,
        }
    }

    fn dispatch(&self, scheme: &str, identifiers: Vec<String>) -> Result<CubeStream<'a>> {
        debug!(scheme = %scheme, sources = identifiers.len(), "Dispatching scheme group");
        if scheme == FILE_SCHEME {
            Ok(self.file_loader.load(identifiers, self.callback))
        } else if NETWORK_SCHEMES.contains(&scheme) {
            let uris = identifiers
                .into_iter()
                .map(|id| format!("{scheme}:{id}"))
                .collect();
            Ok(self.network_loader.load(uris, self.callback))
        } else {
            Err(StrataError::UnsupportedScheme {
                scheme: scheme.to_string(),
            })
        }
    }

    fn fail(&mut self, err: StrataError) -> Option<Result<Cube>> {
        self.done = true;
        self.current = None;
        self.groups.clear();
        Some(Err(err))
    }
}

impl std::fmt::Debug for RecordStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("locations", &self.locations)
            .field("groups", &self.groups)
            .field("file_loader", &self.file_loader)
            .field("network_loader", &self.network_loader)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Result<Cube>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(locations) = self.locations.take() {
            match locations.resolve() {
                Ok(groups) => self.groups = groups.into(),
                Err(e) => return self.fail(e),
            }
        }

        loop {
            if let Some(stream) = self.current.as_mut() {
                match stream.next() {
                    Some(Ok(cube)) => return Some(Ok(cube)),
                    Some(Err(e)) => return self.fail(e),
                    None => self.current = None,
                }
            }

            let Some((scheme, identifiers)) = self.groups.pop_front() else {
                self.done = true;
                return None;
            };
            match self.dispatch(&scheme, identifiers) {
                Ok(stream) => self.current = Some(stream),
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl FusedIterator for RecordStream<'_> {}
