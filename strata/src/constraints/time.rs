//! Calendar-field constraints on time coordinates.

use crate::core::Cube;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;

/// Selects cubes whose time coordinate falls on the given calendar fields.
///
/// Unset fields match anything. Every point of the coordinate must match.
/// Time points are converted through the coordinate's units regardless of
/// the thread's `cell_time_objects` option.
///
/// ```rust
/// use strata::constraints::TimeConstraint;
///
/// let midday_in_2000 = TimeConstraint::new().year(2000).hour(12);
/// assert_eq!(midday_in_2000.to_string(), "TimeConstraint(year=2000, hour=12)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeConstraint {
    coord: String,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
}

impl Default for TimeConstraint {
    fn default() -> Self {
        Self {
            coord: "time".to_string(),
            year: None,
            month: None,
            day: None,
            hour: None,
        }
    }
}

impl TimeConstraint {
    /// Creates a constraint on the `time` coordinate with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a differently named time coordinate.
    pub fn on_coord(mut self, name: impl Into<String>) -> Self {
        self.coord = name.into();
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    fn accepts(&self, t: &NaiveDateTime) -> bool {
        self.year.map_or(true, |y| t.year() == y)
            && self.month.map_or(true, |m| t.month() == m)
            && self.day.map_or(true, |d| t.day() == d)
            && self.hour.map_or(true, |h| t.hour() == h)
    }

    /// Tests `cube` against this constraint.
    pub fn matches(&self, cube: &Cube) -> bool {
        let Some(coord) = cube.coord(&self.coord) else {
            return false;
        };
        let Some(units) = coord.time_units() else {
            return false;
        };
        coord
            .points
            .iter()
            .all(|p| units.to_datetime(*p).map_or(false, |t| self.accepts(&t)))
    }
}

impl fmt::Display for TimeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.coord != "time" {
            parts.push(format!("coord='{}'", self.coord));
        }
        if let Some(y) = self.year {
            parts.push(format!("year={y}"));
        }
        if let Some(m) = self.month {
            parts.push(format!("month={m}"));
        }
        if let Some(d) = self.day {
            parts.push(format!("day={d}"));
        }
        if let Some(h) = self.hour {
            parts.push(format!("hour={h}"));
        }
        write!(f, "TimeConstraint({})", parts.join(", "))
    }
}
