//! Sources of cubes: location handling, scheme loaders and format decoders.
//!
//! A load call hands its locations to a [`RecordStream`], which groups them
//! by scheme and pulls cubes from the matching [`SchemeLoader`] one at a
//! time. Loaders open each source, pick a [`FormatDecoder`] by extension and
//! run the caller's [`Callback`] on every decoded cube.

mod file;
mod format;
mod http;
mod location;
mod stream;

pub use file::FileLoader;
pub use format::{FieldStream, FormatDecoder, FormatRegistry, JsonCubeFormat};
pub use http::HttpLoader;
pub use location::{decode_location, group_by_scheme, Location, Locations, FILE_SCHEME, NETWORK_SCHEMES};
pub use stream::RecordStream;

use crate::core::Cube;
use crate::prelude::*;
use std::collections::VecDeque;
use std::fmt::{self, Debug};
use tracing::debug;

/// The raw field a cube was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Position of the field within its source, starting at 1.
    pub index: usize,
    /// The field exactly as the decoder read it.
    pub raw: serde_json::Value,
}

/// Returned by a [`Callback`] to drop the current cube from the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreCube;

impl fmt::Display for IgnoreCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cube rejected by callback")
    }
}

impl std::error::Error for IgnoreCube {}

/// Per-cube hook run by loaders as each cube is produced.
///
/// Receives the cube (mutable), the field it came from and the source
/// identifier. Returning `Err(IgnoreCube)` removes the cube from the stream.
///
/// ```rust
/// use strata::sources::{Callback, IgnoreCube};
///
/// let keep_model_output: &Callback = &|cube, _field, source| {
///     cube.attributes.insert("source_file".into(), source.into());
///     if cube.attribute("source") == Some(&"obs".into()) {
///         return Err(IgnoreCube);
///     }
///     Ok(())
/// };
/// # let _ = keep_model_output;
/// ```
pub type Callback<'c> = dyn Fn(&mut Cube, &Field, &str) -> std::result::Result<(), IgnoreCube> + 'c;

/// A lazy, single-pass stream of cubes.
pub type CubeStream<'a> = Box<dyn Iterator<Item = Result<Cube>> + 'a>;

/// Loads cubes for every location of one scheme.
pub trait SchemeLoader: Debug + Send + Sync {
    /// Returns a lazy stream over all cubes at `locations`.
    ///
    /// Nothing is opened until the stream is pulled. Truncated or empty
    /// sources surface as [`StrataError::UnexpectedEof`].
    fn load<'a>(&'a self, locations: Vec<String>, callback: Option<&'a Callback<'a>>) -> CubeStream<'a>;
}

impl<T: SchemeLoader + ?Sized> SchemeLoader for std::sync::Arc<T> {
    fn load<'a>(&'a self, locations: Vec<String>, callback: Option<&'a Callback<'a>>) -> CubeStream<'a> {
        (**self).load(locations, callback)
    }
}

/// Runs `callback` on `cube`, returning `None` if the callback rejected it.
pub fn apply_callback(
    mut cube: Cube,
    field: &Field,
    source: &str,
    callback: Option<&Callback<'_>>,
) -> Option<Cube> {
    let Some(callback) = callback else {
        return Some(cube);
    };
    match callback(&mut cube, field, source) {
        Ok(()) => Some(cube),
        Err(IgnoreCube) => {
            debug!(source = %source, field = field.index, cube = %cube, "Callback rejected cube");
            None
        }
    }
}

type Resolve<'a> = Box<dyn FnOnce() -> Result<Vec<String>> + 'a>;
type Open<'a> = Box<dyn FnMut(&str) -> Result<FieldStream<'a>> + 'a>;

/// Walks a list of sources, decoding each in turn.
///
/// The source list is resolved on the first pull. After any error the
/// stream is exhausted.
pub(crate) struct DecodedCubes<'a> {
    resolve: Option<Resolve<'a>>,
    sources: VecDeque<String>,
    open: Open<'a>,
    current: Option<(String, FieldStream<'a>)>,
    callback: Option<&'a Callback<'a>>,
    done: bool,
}

impl<'a> DecodedCubes<'a> {
    pub(crate) fn new(resolve: Resolve<'a>, open: Open<'a>, callback: Option<&'a Callback<'a>>) -> Self {
        Self {
            resolve: Some(resolve),
            sources: VecDeque::new(),
            open,
            current: None,
            callback,
            done: false,
        }
    }

    fn fail(&mut self, err: StrataError) -> Option<Result<Cube>> {
        self.done = true;
        self.current = None;
        Some(Err(err))
    }
}

impl Iterator for DecodedCubes<'_> {
    type Item = Result<Cube>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(resolve) = self.resolve.take() {
            match resolve() {
                Ok(sources) => self.sources = sources.into(),
                Err(e) => return self.fail(e),
            }
        }

        loop {
            if let Some((source, fields)) = self.current.as_mut() {
                match fields.next() {
                    Some(Ok((field, cube))) => {
                        if let Some(cube) = apply_callback(cube, &field, source, self.callback) {
                            return Some(Ok(cube));
                        }
                        continue;
                    }
                    Some(Err(e)) => {
                        let err = e.in_context(&format!("reading {source}"));
                        return self.fail(err);
                    }
                    None => self.current = None,
                }
            }

            let Some(source) = self.sources.pop_front() else {
                self.done = true;
                return None;
            };
            debug!(source = %source, "Opening source");
            match (self.open)(&source) {
                Ok(fields) => self.current = Some((source, fields)),
                Err(e) => return self.fail(e),
            }
        }
    }
}

/// Expands `~`, `~user` and shell wildcards in file patterns.
///
/// A leading `//host` part is dropped first. Matches of each pattern are
/// sorted. A pattern matching no file is an error, as is a match whose path
/// is not valid UTF-8.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    use glob::glob;

    let mut paths = Vec::new();
    for pattern in patterns {
        let expanded = expand_user(strip_host(pattern));
        let matches = glob(&expanded).map_err(|e| {
            StrataError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        let mut found = Vec::new();
        for entry in matches {
            let path = entry
                .map_err(|e| StrataError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

            if path.is_file() {
                let path_str = path.to_str().ok_or_else(|| {
                    StrataError::data_source(
                        "file",
                        format!("Matched path is not valid UTF-8: {}", path.display()),
                    )
                })?;
                found.push(path_str.to_string());
            }
        }

        if found.is_empty() {
            return Err(StrataError::DataSource {
                source_type: "file".to_string(),
                message: format!("One or more of the files specified did not exist: {pattern}"),
                source: None,
            });
        }
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}

/// Drops the `//host` part of a `file://host/path` identifier.
fn strip_host(identifier: &str) -> &str {
    match identifier.strip_prefix("//") {
        Some(rest) => rest.find('/').map_or(rest, |i| &rest[i..]),
        None => identifier,
    }
}

/// Replaces a leading `~` or `~user` with that user's home directory.
///
/// The pattern is returned unchanged when the home directory is unknown.
fn expand_user(pattern: &str) -> String {
    let Some(rest) = pattern.strip_prefix('~') else {
        return pattern.to_string();
    };
    let (user, tail) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let home = if user.is_empty() {
        dirs::home_dir()
    } else {
        user_home(user)
    };
    match home {
        Some(home) => format!("{}{tail}", home.display()),
        None => pattern.to_string(),
    }
}

#[cfg(unix)]
fn user_home(user: &str) -> Option<std::path::PathBuf> {
    use uzers::os::unix::UserExt;

    uzers::get_user_by_name(user).map(|u| u.home_dir().to_path_buf())
}

#[cfg(not(unix))]
fn user_home(_user: &str) -> Option<std::path::PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn field(index: usize) -> Field {
        Field {
            index,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_apply_callback_mutates_and_rejects() {
        let callback: &Callback = &|cube, field, source| {
            if field.index == 2 {
                return Err(IgnoreCube);
            }
            cube.attributes.insert("origin".into(), source.into());
            Ok(())
        };

        let kept = apply_callback(Cube::new("a"), &field(1), "a.json", Some(callback)).unwrap();
        assert_eq!(kept.attribute("origin"), Some(&"a.json".into()));
        assert!(apply_callback(Cube::new("b"), &field(2), "a.json", Some(callback)).is_none());
        assert!(apply_callback(Cube::new("c"), &field(2), "a.json", None).is_some());
    }

    #[test]
    fn test_expand_globs_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "c.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let pattern = format!("{}/*.json", dir.path().display());
        let paths = expand_globs(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.json"));
        assert!(paths[1].ends_with("b.json"));
    }

    #[test]
    fn test_expand_globs_missing_file() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/nothing-*.json", dir.path().display());
        let err = expand_globs(&[pattern]).unwrap_err();
        assert!(err.to_string().contains("did not exist"));
    }

    #[test]
    fn test_expand_user() {
        assert_eq!(expand_user("/abs/path"), "/abs/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_user("~/x.json"), format!("{}/x.json", home.display()));
        }
        assert_eq!(expand_user("~no-such-user-xyz/a.json"), "~no-such-user-xyz/a.json");
    }

    #[cfg(unix)]
    #[test]
    fn test_expand_named_user_from_passwd() {
        let passwd = std::fs::read_to_string("/etc/passwd").unwrap();
        let (user, home) = passwd
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(|line| line.split(':').collect::<Vec<_>>())
            .find(|fields| fields.len() >= 6 && !fields[0].is_empty())
            .map(|fields| (fields[0].to_string(), fields[5].to_string()))
            .unwrap();

        assert_eq!(expand_user(&format!("~{user}/data.json")), format!("{home}/data.json"));
        assert_eq!(expand_user(&format!("~{user}")), home);
    }

    #[test]
    fn test_strip_host() {
        assert_eq!(strip_host("///data/a.json"), "/data/a.json");
        assert_eq!(strip_host("//localhost/x.json"), "/x.json");
        assert_eq!(strip_host("/data/a.json"), "/data/a.json");
        assert_eq!(strip_host("data/a.json"), "data/a.json");
    }

    #[test]
    fn test_expand_globs_file_uri_with_host() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.json")).unwrap();
        let path = format!("{}/a.json", dir.path().display());

        for identifier in [format!("//{path}"), format!("//localhost{path}")] {
            assert_eq!(expand_globs(&[identifier]).unwrap(), vec![path.clone()]);
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_expand_globs_rejects_non_utf8_match() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let name = std::ffi::OsStr::from_bytes(b"bad-\xff.json");
        File::create(dir.path().join(name)).unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let err = expand_globs(&[pattern]).unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"));
    }
}
