//! Merge strategies combining compatible cubes into higher-dimensional ones.
//!
//! The loading pipeline only orchestrates merging: it hands each constraint's
//! matches to a [`Merge`] implementation and keeps whatever comes back.
//! Deciding what is combinable is entirely up to the strategy.

use crate::core::{Coord, Cube};
use crate::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A strategy combining cubes into fewer, higher-dimensional cubes.
///
/// Implementations must not lose data: every input cube's values appear in
/// some output cube.
pub trait Merge: Debug + Send + Sync {
    fn merge(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>>;
}

/// Returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMerge;

impl Merge for NoMerge {
    fn merge(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        Ok(cubes)
    }
}

/// Stacks cubes that differ only in the value of one scalar coordinate.
///
/// Cubes are grouped by name, attributes, shape, dimension coordinates and
/// the names and units of their scalar coordinates. A group whose members differ in
/// exactly one scalar coordinate, with no repeated values, becomes a single
/// cube with a new leading dimension ordered by that coordinate. Any other
/// group passes through unchanged. Output follows first-seen group order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordMerge;

#[derive(Debug, PartialEq)]
struct Signature {
    name: String,
    attributes: BTreeMap<String, crate::core::AttributeValue>,
    shape: Vec<usize>,
    dim_coords: Vec<Coord>,
    /// Name and units of every scalar coordinate, sorted by name.
    scalars: Vec<(String, Option<String>)>,
}

impl Signature {
    fn of(cube: &Cube) -> Self {
        let mut scalars: Vec<(String, Option<String>)> = cube
            .coords
            .iter()
            .filter(|c| c.is_scalar())
            .map(|c| (c.name.clone(), c.units.clone()))
            .collect();
        scalars.sort();
        Self {
            name: cube.name.clone(),
            attributes: cube.attributes.clone(),
            shape: cube.shape.clone(),
            dim_coords: cube.coords.iter().filter(|c| !c.is_scalar()).cloned().collect(),
            scalars,
        }
    }

    fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.iter().map(|(name, _)| name.as_str())
    }
}

fn scalar_value(cube: &Cube, name: &str) -> Option<f64> {
    cube.coord(name).and_then(|c| c.points.first().copied())
}

impl CoordMerge {
    fn stack(group: &[Cube], signature: &Signature) -> Option<Cube> {
        let first = group.first()?;
        if group.iter().any(|c| c.data.len() != c.size()) {
            return None;
        }

        let varying: Vec<&str> = signature
            .scalar_names()
            .filter(|name| {
                let v0 = scalar_value(first, name);
                group.iter().any(|c| scalar_value(c, name) != v0)
            })
            .collect();
        let [axis] = varying.as_slice() else {
            return None;
        };

        let mut order: Vec<(f64, &Cube)> = group
            .iter()
            .map(|c| scalar_value(c, axis).map(|v| (v, c)))
            .collect::<Option<_>>()?;
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        if order.windows(2).any(|w| w[0].0 == w[1].0) {
            return None;
        }

        let template = first.coord(axis)?;
        let mut coords = vec![Coord {
            name: template.name.clone(),
            points: order.iter().map(|(v, _)| *v).collect(),
            units: template.units.clone(),
            dims: vec![0],
        }];
        coords.extend(first.coords.iter().filter(|c| c.name != *axis).map(|c| {
            let mut c = c.clone();
            for d in &mut c.dims {
                *d += 1;
            }
            c
        }));

        let mut shape = Vec::with_capacity(first.shape.len() + 1);
        shape.push(order.len());
        shape.extend_from_slice(&first.shape);

        Some(Cube {
            name: first.name.clone(),
            attributes: first.attributes.clone(),
            coords,
            shape,
            data: order.iter().flat_map(|(_, c)| c.data.iter().copied()).collect(),
        })
    }
}

impl Merge for CoordMerge {
    fn merge(&self, cubes: Vec<Cube>) -> Result<Vec<Cube>> {
        let mut groups: Vec<(Signature, Vec<Cube>)> = Vec::new();
        for cube in cubes {
            let signature = Signature::of(&cube);
            match groups.iter_mut().find(|(s, _)| *s == signature) {
                Some((_, members)) => members.push(cube),
                None => groups.push((signature, vec![cube])),
            }
        }

        let mut merged = Vec::new();
        for (signature, members) in groups {
            if members.len() > 1 {
                if let Some(stacked) = Self::stack(&members, &signature) {
                    merged.push(stacked);
                    continue;
                }
            }
            merged.extend(members);
        }
        Ok(merged)
    }
}
