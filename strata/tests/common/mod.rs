//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use strata::core::{Coord, Cube};
use strata::sources::{apply_callback, Callback, CubeStream, Field, SchemeLoader};
use strata::StrataError;
use tempfile::TempDir;

/// What a [`ScriptedLoader`] produces for one identifier.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub cubes: Vec<Cube>,
    pub truncated: bool,
}

/// A loader serving canned cubes per identifier and recording every call.
///
/// Identifiers without a script yield nothing.
#[derive(Debug, Default)]
pub struct ScriptedLoader {
    scripts: BTreeMap<String, Script>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, identifier: &str, cubes: Vec<Cube>) -> Self {
        self.scripts.insert(
            identifier.to_string(),
            Script {
                cubes,
                truncated: false,
            },
        );
        self
    }

    pub fn truncated(mut self, identifier: &str, cubes: Vec<Cube>) -> Self {
        self.scripts.insert(
            identifier.to_string(),
            Script {
                cubes,
                truncated: true,
            },
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SchemeLoader for ScriptedLoader {
    fn load<'a>(&'a self, locations: Vec<String>, callback: Option<&'a Callback<'a>>) -> CubeStream<'a> {
        self.calls.lock().unwrap().push(locations.clone());
        let items = locations.into_iter().flat_map(move |id| {
            let script = self.scripts.get(&id).cloned().unwrap_or_default();
            let mut out: Vec<strata::Result<Cube>> = Vec::new();
            for (i, cube) in script.cubes.into_iter().enumerate() {
                let field = Field {
                    index: i + 1,
                    raw: serde_json::Value::Null,
                };
                if let Some(cube) = apply_callback(cube, &field, &id, callback) {
                    out.push(Ok(cube));
                }
            }
            if script.truncated {
                out.push(Err(StrataError::UnexpectedEof(format!("{id} ends mid-field"))));
            }
            out
        });
        Box::new(items)
    }
}

/// A temperature-like field at `hour`, on a two-point latitude axis.
pub fn field(name: &str, hour: f64) -> Cube {
    Cube::new(name)
        .with_attribute("source", "model")
        .with_coord(Coord::dimension("latitude", vec![-10.0, 10.0], 0))
        .with_coord(Coord::scalar("time", hour).with_units("hours since 1970-01-01 00:00:00"))
        .with_data(vec![2], vec![hour, hour + 0.5])
}

/// Cube names in order.
pub fn names(cubes: &[Cube]) -> Vec<&str> {
    cubes.iter().map(|c| c.name.as_str()).collect()
}

/// Writes `cubes` as a JSON cube stream file in `dir`.
pub fn write_cubes(dir: &TempDir, file_name: &str, cubes: &[Cube]) -> PathBuf {
    let path = dir.path().join(file_name);
    let mut file = File::create(&path).unwrap();
    for cube in cubes {
        serde_json::to_writer(&mut file, cube).unwrap();
        writeln!(file).unwrap();
    }
    file.flush().unwrap();
    path
}

/// Writes raw text to `file_name` in `dir`.
pub fn write_text(dir: &TempDir, file_name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    let mut file = File::create(&path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
    path
}
