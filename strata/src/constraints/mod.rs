//! Selection constraints over loaded cubes.
//!
//! A [`Constraint`] is a predicate with several concrete shapes:
//!
//! - **Name**: a plain string selects cubes by name (`"air_temperature"`)
//! - **Attributes**: every listed attribute must be present and equal
//! - **Coordinate**: every cell of a named coordinate must satisfy a test
//! - **Time**: calendar fields of a time coordinate ([`TimeConstraint`])
//! - **Predicate**: an arbitrary function of the whole cube
//!
//! Shapes combine with `&`. Every shape answers the same question through
//! [`Constraint::matches`].
//!
//! Load calls accept constraints as anything convertible to [`Constraints`]:
//! `()` for "everything", a single constraint or name, or a vector of them.
//!
//! ```rust
//! use strata::constraints::{Constraint, Constraints};
//! use strata::core::{Coord, Cube};
//!
//! let level_one = Constraint::coord("model_level_number", |cell| cell.point.as_f64() == Some(1.0));
//! let wanted = Constraint::name("air_temperature") & level_one;
//!
//! let cube = Cube::new("air_temperature").with_coord(Coord::scalar("model_level_number", 1.0));
//! assert!(wanted.matches(&cube));
//!
//! assert_eq!(Constraints::from(()).len(), 1);
//! assert_eq!(Constraints::from(vec!["a", "b"]).len(), 2);
//! ```

mod time;

pub use time::TimeConstraint;

use crate::core::{AttributeValue, Cell, Cube};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitAnd;
use std::sync::Arc;

/// A test applied to each cell of a coordinate.
pub type CellPredicate = Arc<dyn Fn(&Cell) -> bool + Send + Sync>;

/// A test applied to a whole cube.
pub type CubePredicate = Arc<dyn Fn(&Cube) -> bool + Send + Sync>;

/// A predicate selecting cubes of interest.
#[derive(Clone)]
pub enum Constraint {
    /// Matches every cube.
    Any,
    /// Matches cubes with this name.
    Name(String),
    /// Matches cubes carrying every listed attribute with an equal value.
    Attributes(BTreeMap<String, AttributeValue>),
    /// Matches cubes whose named coordinate passes `test` at every cell.
    Coord {
        name: String,
        test: CellPredicate,
    },
    /// Matches cubes by the calendar fields of a time coordinate.
    Time(TimeConstraint),
    /// Matches cubes accepted by an arbitrary function.
    Predicate {
        label: String,
        test: CubePredicate,
    },
    /// Matches cubes accepted by every member.
    All(Vec<Constraint>),
}

impl Constraint {
    /// The catch-all constraint.
    pub fn any() -> Self {
        Self::Any
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// An attribute constraint on a single attribute.
    pub fn attribute(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::attributes([(key.into(), value.into())])
    }

    /// An attribute constraint on several attributes at once.
    pub fn attributes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Self::Attributes(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A constraint testing every cell of coordinate `name`.
    pub fn coord<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Cell) -> bool + Send + Sync + 'static,
    {
        Self::Coord {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    /// A constraint requiring coordinate `name` to equal `value` numerically.
    pub fn coord_equals(name: impl Into<String>, value: f64) -> Self {
        Self::coord(name, move |cell| cell.point.as_f64() == Some(value))
    }

    /// A constraint backed by an arbitrary cube function.
    ///
    /// `label` identifies the constraint in error messages.
    pub fn predicate<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Cube) -> bool + Send + Sync + 'static,
    {
        Self::Predicate {
            label: label.into(),
            test: Arc::new(test),
        }
    }

    /// Tests `cube` against this constraint.
    pub fn matches(&self, cube: &Cube) -> bool {
        match self {
            Constraint::Any => true,
            Constraint::Name(name) => cube.name == *name,
            Constraint::Attributes(wanted) => wanted
                .iter()
                .all(|(k, v)| cube.attribute(k).map_or(false, |found| found == v)),
            Constraint::Coord { name, test } => match cube.coord(name) {
                Some(coord) => coord.cells().all(|cell| test(&cell)),
                None => false,
            },
            Constraint::Time(time) => time.matches(cube),
            Constraint::Predicate { test, .. } => test(cube),
            Constraint::All(members) => members.iter().all(|c| c.matches(cube)),
        }
    }
}

impl BitAnd for Constraint {
    type Output = Constraint;

    fn bitand(self, rhs: Constraint) -> Constraint {
        let mut members = match self {
            Constraint::All(members) => members,
            other => vec![other],
        };
        match rhs {
            Constraint::All(more) => members.extend(more),
            other => members.push(other),
        }
        Constraint::All(members)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => write!(f, "Constraint()"),
            Constraint::Name(name) => write!(f, "Constraint(name='{name}')"),
            Constraint::Attributes(attrs) => {
                let parts: Vec<String> = attrs.iter().map(|(k, v)| format!("'{k}': {v}")).collect();
                write!(f, "AttributeConstraint({{{}}})", parts.join(", "))
            }
            Constraint::Coord { name, .. } => {
                write!(f, "Constraint(coord_values={{'{name}': <function>}})")
            }
            Constraint::Time(time) => write!(f, "{time}"),
            Constraint::Predicate { label, .. } => write!(f, "Constraint(cube_func={label})"),
            Constraint::All(members) => {
                let parts: Vec<String> = members.iter().map(|c| c.to_string()).collect();
                write!(f, "ConstraintCombination({})", parts.join(" & "))
            }
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<&str> for Constraint {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for Constraint {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<TimeConstraint> for Constraint {
    fn from(time: TimeConstraint) -> Self {
        Self::Time(time)
    }
}

/// An ordered list of constraints, normalised from the caller's input.
///
/// "No constraint" becomes a single [`Constraint::Any`]; an explicit empty
/// list stays empty.
#[derive(Debug, Clone)]
pub struct Constraints(Vec<Constraint>);

impl Constraints {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self(constraints)
    }

    /// The single catch-all constraint.
    pub fn unconstrained() -> Self {
        Self(vec![Constraint::Any])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Constraint> {
        self.0
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Self::unconstrained()
    }
}

impl From<()> for Constraints {
    fn from(_: ()) -> Self {
        Self::unconstrained()
    }
}

impl From<Option<Constraint>> for Constraints {
    fn from(constraint: Option<Constraint>) -> Self {
        constraint.map_or_else(Self::unconstrained, |c| Self(vec![c]))
    }
}

impl From<Constraint> for Constraints {
    fn from(constraint: Constraint) -> Self {
        Self(vec![constraint])
    }
}

impl From<TimeConstraint> for Constraints {
    fn from(time: TimeConstraint) -> Self {
        Self(vec![Constraint::Time(time)])
    }
}

impl From<&str> for Constraints {
    fn from(name: &str) -> Self {
        Self(vec![Constraint::name(name)])
    }
}

impl From<String> for Constraints {
    fn from(name: String) -> Self {
        Self(vec![Constraint::Name(name)])
    }
}

impl<C: Into<Constraint>> From<Vec<C>> for Constraints {
    fn from(constraints: Vec<C>) -> Self {
        Self(constraints.into_iter().map(Into::into).collect())
    }
}

impl<C: Into<Constraint>, const N: usize> From<[C; N]> for Constraints {
    fn from(constraints: [C; N]) -> Self {
        Self(constraints.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for Constraints {
    type Item = Constraint;
    type IntoIter = std::vec::IntoIter<Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
