//! The in-memory cube model handed between decoders, constraints and merges.

use crate::core::future;
use crate::prelude::*;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A dynamically-typed attribute value attached to a cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

static TIME_UNITS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\s*(seconds?|minutes?|hours?|days?)\s+since\s+(.+?)\s*$")
        .expect("Hard-coded regex pattern should be valid")
});

/// Parsed `"<step> since <epoch>"` units of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    step_seconds: i64,
    epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parses units such as `"hours since 1970-01-01 00:00:00"`.
    ///
    /// Returns `None` for anything that is not a recognised time unit.
    pub fn parse(units: &str) -> Option<Self> {
        let caps = TIME_UNITS.captures(units)?;
        let step_seconds = match caps.get(1)?.as_str().trim_end_matches('s') {
            "second" => 1,
            "minute" => 60,
            "hour" => 3_600,
            "day" => 86_400,
            _ => return None,
        };
        let epoch = parse_epoch(caps.get(2)?.as_str())?;
        Some(Self {
            step_seconds,
            epoch,
        })
    }

    /// Converts a raw coordinate value into a calendar datetime.
    pub fn to_datetime(&self, value: f64) -> Option<NaiveDateTime> {
        let millis = value * self.step_seconds as f64 * 1000.0;
        if !millis.is_finite() {
            return None;
        }
        let delta = chrono::Duration::try_milliseconds(millis.round() as i64)?;
        self.epoch.checked_add_signed(delta)
    }

    /// The reference epoch.
    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }
}

fn parse_epoch(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// The value of one coordinate cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellPoint {
    /// A raw number, as stored.
    Number(f64),
    /// A calendar datetime, produced when `cell_time_objects` is enabled.
    Time(NaiveDateTime),
}

impl CellPoint {
    /// The numeric value, if this point is a raw number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellPoint::Number(v) => Some(*v),
            CellPoint::Time(_) => None,
        }
    }

    /// The datetime, if this point is a time object.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellPoint::Time(t) => Some(*t),
            CellPoint::Number(_) => None,
        }
    }
}

impl fmt::Display for CellPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellPoint::Number(v) => write!(f, "{v}"),
            CellPoint::Time(t) => write!(f, "{t}"),
        }
    }
}

/// One cell of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub point: CellPoint,
}

/// A named coordinate describing one or more data dimensions.
///
/// A coordinate with no `dims` and a single point is scalar: it describes
/// the whole cube rather than one of its axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub name: String,
    pub points: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dims: Vec<usize>,
}

impl Coord {
    /// Creates a coordinate spanning data dimension `dim`.
    pub fn dimension(name: impl Into<String>, points: Vec<f64>, dim: usize) -> Self {
        Self {
            name: name.into(),
            points,
            units: None,
            dims: vec![dim],
        }
    }

    /// Creates a scalar coordinate.
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            points: vec![value],
            units: None,
            dims: Vec::new(),
        }
    }

    /// Sets the units string.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty() && self.points.len() == 1
    }

    /// The parsed time units, if this is a time coordinate.
    pub fn time_units(&self) -> Option<TimeUnits> {
        self.units.as_deref().and_then(TimeUnits::parse)
    }

    /// Returns cell `index`.
    ///
    /// Time coordinates produce [`CellPoint::Time`] only while the calling
    /// thread has `cell_time_objects` enabled.
    pub fn cell(&self, index: usize) -> Option<Cell> {
        let value = *self.points.get(index)?;
        let point = match self.time_units() {
            Some(units) if future::cell_time_objects() => match units.to_datetime(value) {
                Some(t) => CellPoint::Time(t),
                None => CellPoint::Number(value),
            },
            _ => CellPoint::Number(value),
        };
        Some(Cell { point })
    }

    /// Iterates over every cell in point order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.points.len()).filter_map(move |i| self.cell(i))
    }
}

/// A unit of loaded multi-dimensional data with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coords: Vec<Coord>,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub data: Vec<f64>,
}

impl Cube {
    /// Creates a scalar-shaped cube with no data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            coords: Vec::new(),
            shape: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_coord(mut self, coord: Coord) -> Self {
        self.coords.push(coord);
        self
    }

    pub fn with_data(mut self, shape: Vec<usize>, data: Vec<f64>) -> Self {
        self.shape = shape;
        self.data = data;
        self
    }

    /// Looks up a coordinate by name.
    pub fn coord(&self, name: &str) -> Option<&Coord> {
        self.coords.iter().find(|c| c.name == name)
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Number of data values implied by the shape.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Checks that data and coordinates agree with the shape.
    pub fn validate(&self) -> Result<()> {
        let metadata_only = self.shape.is_empty() && self.data.is_empty();
        if !metadata_only && self.data.len() != self.size() {
            return Err(StrataError::data_source(
                "cube",
                format!(
                    "cube '{}' has shape {:?} but {} data values",
                    self.name,
                    self.shape,
                    self.data.len()
                ),
            ));
        }
        for coord in &self.coords {
            match coord.dims.as_slice() {
                [] if coord.points.len() == 1 => {}
                [dim] if self.shape.get(*dim) == Some(&coord.points.len()) => {}
                _ => {
                    return Err(StrataError::data_source(
                        "cube",
                        format!(
                            "coordinate '{}' of cube '{}' does not fit shape {:?}",
                            coord.name, self.name, self.shape
                        ),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        if dims.is_empty() {
            write!(f, "{} / (scalar cube)", self.name)
        } else {
            write!(f, "{} / ({})", self.name, dims.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_coord() -> Coord {
        Coord::dimension("time", vec![0.0, 12.0, 36.0], 0).with_units("hours since 1970-01-01 00:00:00")
    }

    #[test]
    fn test_time_units_parse() {
        let units = TimeUnits::parse("days since 2000-01-01").unwrap();
        let t = units.to_datetime(1.5).unwrap();
        assert_eq!(t.to_string(), "2000-01-02 12:00:00");

        assert!(TimeUnits::parse("K").is_none());
        assert!(TimeUnits::parse("fortnights since 2000-01-01").is_none());
    }

    #[test]
    fn test_cells_are_numbers_by_default() {
        let coord = time_coord();
        let cell = coord.cell(1).unwrap();
        assert_eq!(cell.point, CellPoint::Number(12.0));
        assert!(coord.cell(3).is_none());
    }

    #[test]
    fn test_cells_become_times_in_context() {
        let coord = time_coord();
        let _guard = future::context(&[("cell_time_objects", true)]).unwrap();
        let cell = coord.cell(2).unwrap();
        assert_eq!(cell.point.as_datetime().unwrap().to_string(), "1970-01-02 12:00:00");
    }

    #[test]
    fn test_non_time_coord_ignores_option() {
        let coord = Coord::scalar("model_level_number", 1.0).with_units("1");
        let _guard = future::context(&[("cell_time_objects", true)]).unwrap();
        assert_eq!(coord.cell(0).unwrap().point, CellPoint::Number(1.0));
    }

    #[test]
    fn test_cube_validate() {
        let cube = Cube::new("air_temperature")
            .with_coord(Coord::dimension("latitude", vec![0.0, 10.0], 0))
            .with_coord(Coord::scalar("height", 1.5))
            .with_data(vec![2], vec![280.0, 281.0]);
        assert!(cube.validate().is_ok());

        let bad = cube.clone().with_data(vec![3], vec![1.0, 2.0, 3.0]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_attribute_values_deserialize() {
        let cube: Cube = serde_json::from_str(
            r#"{"name": "x", "attributes": {"STASH": "m01s00i004", "level": 3, "scale": 0.5, "ok": true}}"#,
        )
        .unwrap();
        assert_eq!(cube.attribute("STASH"), Some(&AttributeValue::from("m01s00i004")));
        assert_eq!(cube.attribute("level"), Some(&AttributeValue::Integer(3)));
        assert_eq!(cube.attribute("scale"), Some(&AttributeValue::Float(0.5)));
        assert_eq!(cube.attribute("ok"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_display() {
        let cube = Cube::new("air_temperature").with_data(vec![2, 3], vec![0.0; 6]);
        assert_eq!(cube.to_string(), "air_temperature / (2; 3)");
        assert_eq!(Cube::new("t").to_string(), "t / (scalar cube)");
    }
}
