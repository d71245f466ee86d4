//! Format decoders and the registry that picks one per source.

use super::Field;
use crate::core::Cube;
use crate::prelude::*;
use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::{Read, Write};
use std::sync::Arc;

/// A lazy stream of decoded fields and the cubes built from them.
pub type FieldStream<'a> = Box<dyn Iterator<Item = Result<(Field, Cube)>> + 'a>;

/// Decodes one physical file format into cubes.
pub trait FormatDecoder: Debug + Send + Sync {
    /// Short human-readable format name.
    fn name(&self) -> &str;

    /// Lower-case file extensions (without the dot) this format handles.
    fn extensions(&self) -> &[&str];

    /// Starts decoding `reader`. `source` names the source in messages.
    ///
    /// Decoding must be lazy: one field per pull. A source that ends inside
    /// a field, or holds no fields at all, yields
    /// [`StrataError::UnexpectedEof`].
    fn decode<'a>(&self, reader: Box<dyn Read + 'a>, source: &str) -> FieldStream<'a>;

    /// Writes `cubes` in this format.
    fn encode(&self, cubes: &[Cube], writer: &mut dyn Write) -> Result<()> {
        let _ = (cubes, writer);
        Err(StrataError::NotSupported(format!(
            "saving is not supported by the {} format",
            self.name()
        )))
    }
}

/// Ordered set of decoders, looked up by file extension.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    decoders: Vec<Arc<dyn FormatDecoder>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::empty().with(JsonCubeFormat)
    }
}

impl FormatRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    /// Adds a decoder. Earlier registrations win on shared extensions.
    pub fn with(mut self, decoder: impl FormatDecoder + 'static) -> Self {
        self.decoders.push(Arc::new(decoder));
        self
    }

    /// Finds the decoder for `source` by its extension.
    pub fn find(&self, source: &str) -> Result<Arc<dyn FormatDecoder>> {
        let ext = std::path::Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        self.decoders
            .iter()
            .find(|d| d.extensions().iter().any(|e| *e == ext))
            .cloned()
            .ok_or_else(|| {
                StrataError::data_source("format", format!("No format specification matches {source}"))
            })
    }
}

/// A stream of JSON field objects, each describing one cube.
///
/// Fields are concatenated JSON objects (one per line by convention); a
/// top-level array of objects is also accepted. Each object deserialises
/// into a [`Cube`].
///
/// ```json
/// {"name": "air_temperature", "attributes": {"STASH": "m01s03i236"},
///  "coords": [{"name": "time", "points": [0.0], "units": "hours since 1970-01-01"}],
///  "shape": [2], "data": [280.1, 281.4]}
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCubeFormat;

impl FormatDecoder for JsonCubeFormat {
    fn name(&self) -> &str {
        "JSON cube stream"
    }

    fn extensions(&self) -> &[&str] {
        &["json", "jsonl", "cubes"]
    }

    fn decode<'a>(&self, reader: Box<dyn Read + 'a>, source: &str) -> FieldStream<'a> {
        Box::new(JsonFields {
            inner: serde_json::Deserializer::from_reader(reader).into_iter(),
            pending: VecDeque::new(),
            source: source.to_string(),
            index: 0,
            done: false,
        })
    }

    fn encode(&self, cubes: &[Cube], writer: &mut dyn Write) -> Result<()> {
        for cube in cubes {
            serde_json::to_writer(&mut *writer, cube)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

struct JsonFields<R: Read> {
    inner: StreamDeserializer<'static, IoRead<R>, Value>,
    pending: VecDeque<Value>,
    source: String,
    index: usize,
    done: bool,
}

impl<R: Read> JsonFields<R> {
    fn field(&mut self, raw: Value) -> Result<(Field, Cube)> {
        self.index += 1;
        let cube: Cube = serde_json::from_value(raw.clone()).map_err(|e| {
            StrataError::data_source_with_source(
                "json",
                format!("field {} of {} is not a cube", self.index, self.source),
                Box::new(e),
            )
        })?;
        cube.validate()?;
        Ok((
            Field {
                index: self.index,
                raw,
            },
            cube,
        ))
    }

    fn fail(&mut self, err: StrataError) -> Option<Result<(Field, Cube)>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: Read> Iterator for JsonFields<R> {
    type Item = Result<(Field, Cube)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(raw) = self.pending.pop_front() {
                let field = self.field(raw);
                if field.is_err() {
                    self.done = true;
                }
                return Some(field);
            }
            match self.inner.next() {
                Some(Ok(Value::Array(items))) => self.pending.extend(items),
                Some(Ok(raw)) => self.pending.push_back(raw),
                Some(Err(e)) if e.is_eof() => {
                    let msg = format!("{} ends inside field {}: {e}", self.source, self.index + 1);
                    return self.fail(StrataError::UnexpectedEof(msg));
                }
                Some(Err(e)) => {
                    let msg = format!("malformed field {} in {}", self.index + 1, self.source);
                    return self.fail(StrataError::data_source_with_source("json", msg, Box::new(e)));
                }
                None if self.index == 0 => {
                    let msg = format!("{} contains no fields", self.source);
                    return self.fail(StrataError::UnexpectedEof(msg));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &'static str) -> Vec<Result<(Field, Cube)>> {
        JsonCubeFormat.decode(Box::new(text.as_bytes()), "mem.json").collect()
    }

    #[test]
    fn test_decodes_concatenated_fields() {
        let fields = decode(
            r#"{"name": "a", "shape": [1], "data": [1.0]}
               {"name": "b", "shape": [2], "data": [1.0, 2.0]}"#,
        );
        assert_eq!(fields.len(), 2);
        let (field, cube) = fields[1].as_ref().unwrap();
        assert_eq!(field.index, 2);
        assert_eq!(cube.name, "b");
        assert_eq!(field.raw["name"], "b");
    }

    #[test]
    fn test_decodes_top_level_array() {
        let fields = decode(r#"[{"name": "a"}, {"name": "b"}]"#);
        let names: Vec<String> = fields.into_iter().map(|f| f.unwrap().1.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_truncated_source_is_eof() {
        let fields = decode(r#"{"name": "a"} {"name": "b", "data": [1.0,"#);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].is_ok());
        assert!(fields[1].as_ref().unwrap_err().is_eof());
    }

    #[test]
    fn test_empty_source_is_eof() {
        let fields = decode("   \n");
        assert_eq!(fields.len(), 1);
        assert!(fields[0].as_ref().unwrap_err().is_eof());
    }

    #[test]
    fn test_invalid_cube_is_data_error() {
        let fields = decode(r#"{"name": "a", "shape": [3], "data": [1.0]}"#);
        let err = fields[0].as_ref().unwrap_err();
        assert!(matches!(err, StrataError::DataSource { .. }));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.find("/data/a.JSON").unwrap().name(), "JSON cube stream");
        assert!(registry.find("/data/a.pp").is_err());
        assert!(FormatRegistry::empty().find("a.json").is_err());
    }

    #[test]
    fn test_encode_then_decode() {
        let cubes = vec![Cube::new("a").with_data(vec![2], vec![1.0, 2.0])];
        let mut buf = Vec::new();
        JsonCubeFormat.encode(&cubes, &mut buf).unwrap();
        let decoded: Vec<Cube> = JsonCubeFormat
            .decode(Box::new(std::io::Cursor::new(buf)), "saved.json")
            .map(|f| f.unwrap().1)
            .collect();
        assert_eq!(decoded, cubes);
    }
}
