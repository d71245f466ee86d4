//! Loading cubes from local files.

use super::{expand_globs, Callback, CubeStream, DecodedCubes, FieldStream, FormatRegistry, SchemeLoader};
use crate::prelude::*;
use std::fs::File;
use std::io::BufReader;

/// Loads `file`-scheme locations.
///
/// Identifiers are expanded (`~`, wildcards) when the stream is first
/// pulled, then opened one at a time and decoded by the format registered
/// for their extension.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    formats: FormatRegistry,
}

impl FileLoader {
    pub fn new(formats: FormatRegistry) -> Self {
        Self { formats }
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }
}

impl SchemeLoader for FileLoader {
    fn load<'a>(&'a self, locations: Vec<String>, callback: Option<&'a Callback<'a>>) -> CubeStream<'a> {
        let resolve = Box::new(move || expand_globs(&locations));
        let open = Box::new(move |path: &str| -> Result<FieldStream<'a>> {
            let decoder = self.formats.find(path)?;
            let file = File::open(path).with_context(|| format!("opening {path}"))?;
            Ok(decoder.decode(Box::new(BufReader::new(file)), path))
        });
        Box::new(DecodedCubes::new(resolve, open, callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::IgnoreCube;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_loads_files_in_order() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.json", r#"{"name": "a1"} {"name": "a2"}"#);
        let b = write(&dir, "b.json", r#"{"name": "b1"}"#);

        let loader = FileLoader::default();
        let names: Vec<String> = loader
            .load(vec![b, a], None)
            .map(|c| c.unwrap().name)
            .collect();
        assert_eq!(names, vec!["b1", "a1", "a2"]);
    }

    #[test]
    fn test_glob_pattern_expands_sorted() {
        let dir = TempDir::new().unwrap();
        write(&dir, "2.json", r#"{"name": "second"}"#);
        write(&dir, "1.json", r#"{"name": "first"}"#);

        let pattern = format!("{}/*.json", dir.path().display());
        let names: Vec<String> = FileLoader::default()
            .load(vec![pattern], None)
            .map(|c| c.unwrap().name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_callback_sees_source() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"name": "keep"} {"name": "drop"}"#);

        let callback: &Callback = &|cube, field, source| {
            if cube.name == "drop" {
                return Err(IgnoreCube);
            }
            cube.attributes.insert("source".into(), source.into());
            cube.attributes.insert("field".into(), (field.index as i64).into());
            Ok(())
        };
        let loader = FileLoader::default();
        let cubes: Vec<_> = loader.load(vec![path.clone()], Some(callback)).collect::<Result<_>>().unwrap();
        assert_eq!(cubes.len(), 1);
        assert_eq!(cubes[0].attribute("source"), Some(&path.as_str().into()));
        assert_eq!(cubes[0].attribute("field"), Some(&1i64.into()));
    }

    #[test]
    fn test_host_part_dropped_before_callback() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"name": "a"}"#);
        let callback: &Callback = &|cube, _field, source| {
            cube.attributes.insert("source".into(), source.into());
            Ok(())
        };

        let cubes: Vec<_> = FileLoader::default()
            .load(vec![format!("//{path}")], Some(callback))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(cubes[0].attribute("source"), Some(&path.as_str().into()));
    }

    #[test]
    fn test_missing_file_fails_on_first_pull() {
        let loader = FileLoader::default();
        let mut stream = loader.load(vec!["/definitely/not/here.json".to_string()], None);
        let err = stream.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("did not exist"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_file_is_eof() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.json", "");
        let err = FileLoader::default().load(vec![path], None).next().unwrap().unwrap_err();
        assert!(err.is_eof());
        assert!(err.to_string().contains("empty.json"));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.grib", "GRIB");
        let err = FileLoader::default().load(vec![path], None).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("No format specification"));
    }
}
