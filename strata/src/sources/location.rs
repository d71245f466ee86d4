//! Location decoding and grouping by scheme.

use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Scheme of local files, and of locations written without a scheme.
pub const FILE_SCHEME: &str = "file";

/// Schemes handed to the network loader.
pub const NETWORK_SCHEMES: [&str; 2] = ["http", "https"];

// At least two characters, so Windows drive letters are not schemes.
static SCHEME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]+):(.+)$").expect("Hard-coded regex pattern should be valid")
});

/// A location decomposed into scheme and identifier.
///
/// Ordering is by scheme first, then identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub scheme: String,
    pub identifier: String,
}

impl Location {
    /// The location text with its scheme reattached.
    pub fn to_uri(&self) -> String {
        format!("{}:{}", self.scheme, self.identifier)
    }
}

/// Splits `text` into `(scheme, identifier)`.
///
/// Text without a scheme prefix is a `file` location.
///
/// ```rust
/// use strata::sources::decode_location;
///
/// let loc = decode_location("http://example.com/a.json").unwrap();
/// assert_eq!(loc.scheme, "http");
/// assert_eq!(loc.identifier, "//example.com/a.json");
///
/// let loc = decode_location("C:/data/a.json").unwrap();
/// assert_eq!(loc.scheme, "file");
/// ```
pub fn decode_location(text: &str) -> Result<Location> {
    if text.trim().is_empty() {
        return Err(StrataError::InvalidLocation("empty location".to_string()));
    }
    Ok(match SCHEME.captures(text) {
        Some(caps) => Location {
            scheme: caps[1].to_ascii_lowercase(),
            identifier: caps[2].to_string(),
        },
        None => Location {
            scheme: FILE_SCHEME.to_string(),
            identifier: text.to_string(),
        },
    })
}

/// Sorts `locations` and splits them into maximal runs of one scheme.
///
/// Every input appears in exactly one group; groups come out in scheme order.
pub fn group_by_scheme(mut locations: Vec<Location>) -> Vec<(String, Vec<String>)> {
    locations.sort();
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for loc in locations {
        match groups.last_mut() {
            Some((scheme, ids)) if *scheme == loc.scheme => ids.push(loc.identifier),
            _ => groups.push((loc.scheme, vec![loc.identifier])),
        }
    }
    groups
}

/// One or more location strings supplied to a load call.
///
/// A single string is one location; it is never split into characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locations(Vec<String>);

impl Locations {
    pub fn new(locations: Vec<String>) -> Self {
        Self(locations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Decodes every location and groups the results by scheme.
    pub fn resolve(&self) -> Result<Vec<(String, Vec<String>)>> {
        let decoded = self
            .0
            .iter()
            .map(|text| decode_location(text))
            .collect::<Result<Vec<_>>>()?;
        Ok(group_by_scheme(decoded))
    }
}

impl From<&str> for Locations {
    fn from(location: &str) -> Self {
        Self(vec![location.to_string()])
    }
}

impl From<String> for Locations {
    fn from(location: String) -> Self {
        Self(vec![location])
    }
}

impl From<&String> for Locations {
    fn from(location: &String) -> Self {
        Self(vec![location.clone()])
    }
}

impl From<&Path> for Locations {
    fn from(path: &Path) -> Self {
        Self(vec![path.to_string_lossy().into_owned()])
    }
}

impl From<PathBuf> for Locations {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<&PathBuf> for Locations {
    fn from(path: &PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Locations {
    fn from(locations: Vec<S>) -> Self {
        Self(locations.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for Locations {
    fn from(locations: &[S]) -> Self {
        Self(locations.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Locations {
    fn from(locations: [S; N]) -> Self {
        Self(locations.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_schemes() {
        let loc = decode_location("https://host/x.json").unwrap();
        assert_eq!(loc.scheme, "https");
        assert_eq!(loc.to_uri(), "https://host/x.json");

        let loc = decode_location("/data/x.json").unwrap();
        assert_eq!(loc, Location { scheme: "file".into(), identifier: "/data/x.json".into() });

        let loc = decode_location("file:/data/x.json").unwrap();
        assert_eq!(loc.identifier, "/data/x.json");

        let loc = decode_location("ftp://host/x").unwrap();
        assert_eq!(loc.scheme, "ftp");

        assert!(decode_location("").is_err());
    }

    #[test]
    fn test_group_contiguous() {
        let locs = ["http://b", "/a", "ftp://c", "/b", "http://a"]
            .iter()
            .map(|t| decode_location(t).unwrap())
            .collect();
        let groups = group_by_scheme(locs);
        let schemes: Vec<&str> = groups.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(schemes, vec!["file", "ftp", "http"]);
        assert_eq!(groups[0].1, vec!["/a", "/b"]);
        assert_eq!(groups[2].1, vec!["//a", "//b"]);
    }

    #[test]
    fn test_single_string_is_one_location() {
        assert_eq!(Locations::from("abc").len(), 1);
        assert_eq!(Locations::from(vec!["a", "b"]).len(), 2);
        assert_eq!(Locations::from(["a", "b", "c"]).len(), 3);
        let owned = vec!["x".to_string()];
        assert_eq!(Locations::from(owned.as_slice()).len(), 1);
    }

    fn location_text() -> impl Strategy<Value = String> {
        prop_oneof![
            "/[a-z]{1,8}\\.json",
            "https?://[a-z]{1,8}/[a-z]{1,6}",
            "(ftp|s3)://[a-z]{1,8}",
        ]
    }

    proptest! {
        #[test]
        fn prop_grouping_preserves_every_location(texts in prop::collection::vec(location_text(), 0..24)) {
            let mut expected: Vec<Location> = texts.iter().map(|t| decode_location(t).unwrap()).collect();
            let groups = Locations::from(texts).resolve().unwrap();

            let mut seen = std::collections::HashSet::new();
            for (scheme, _) in &groups {
                prop_assert!(seen.insert(scheme.clone()), "scheme {} split across groups", scheme);
            }

            let mut actual: Vec<Location> = groups
                .into_iter()
                .flat_map(|(scheme, ids)| ids.into_iter().map(move |identifier| Location { scheme: scheme.clone(), identifier }))
                .collect();
            expected.sort();
            actual.sort();
            prop_assert_eq!(actual, expected);
        }
    }
}
