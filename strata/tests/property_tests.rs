//! Property-based tests for the loading pipeline.

mod common;

use common::ScriptedLoader;
use proptest::prelude::*;
use strata::constraints::Constraint;
use strata::core::{future, Cube, Loader};
use strata::StrataError;

const NAMES: [&str; 3] = ["a", "b", "c"];

fn cube_names() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..NAMES.len(), 0..20)
}

fn constraint_picks() -> impl Strategy<Value = Vec<Option<usize>>> {
    prop::collection::vec(prop::option::of(0..NAMES.len()), 0..4)
}

fn constraint(pick: Option<usize>) -> Constraint {
    match pick {
        Some(i) => Constraint::name(NAMES[i]),
        None => Constraint::Any,
    }
}

proptest! {
    #[test]
    fn prop_load_raw_counts_every_match(generated in cube_names(), picks in constraint_picks()) {
        let cubes: Vec<Cube> = generated.iter().map(|&i| Cube::new(NAMES[i])).collect();
        let loader = Loader::builder()
            .file_loader(ScriptedLoader::new().serve("/a.json", cubes.clone()))
            .build();
        let constraints: Vec<Constraint> = picks.iter().map(|&p| constraint(p)).collect();

        let raw = loader.load_raw("/a.json", constraints.clone(), None).unwrap();

        let expected: Vec<&str> = constraints
            .iter()
            .flat_map(|c| cubes.iter().filter(move |cube| c.matches(cube)))
            .map(|cube| cube.name.as_str())
            .collect();
        let actual: Vec<&str> = raw.iter().map(|c| c.name.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_load_cube_rejects_wrong_arity(picks in constraint_picks()) {
        prop_assume!(picks.len() != 1);
        let loader = Loader::builder()
            .file_loader(ScriptedLoader::new().serve("/a.json", vec![Cube::new("a")]))
            .build();
        let constraints: Vec<Constraint> = picks.iter().map(|&p| constraint(p)).collect();

        let err = loader.load_cube("/a.json", constraints, None).unwrap_err();
        let is_arity = matches!(err, StrataError::Arity { found } if found == picks.len());
        prop_assert!(is_arity);
    }

    #[test]
    fn prop_scoped_override_always_restored(values in prop::collection::vec(any::<bool>(), 1..6)) {
        let before = future::cell_time_objects();
        {
            let mut guards = Vec::new();
            for &value in &values {
                guards.push(future::context(&[("cell_time_objects", value)]).unwrap());
                prop_assert_eq!(future::cell_time_objects(), value);
            }
            while let Some(guard) = guards.pop() {
                drop(guard);
            }
        }
        prop_assert_eq!(future::cell_time_objects(), before);
    }
}

#[test]
fn test_override_undone_when_error_propagates() {
    #[derive(Debug)]
    struct SomeError;

    fn failing_block() -> Result<(), SomeError> {
        let _guard = future::context(&[("cell_time_objects", true)]).unwrap();
        assert!(future::cell_time_objects());
        Err(SomeError)
    }

    assert!(!future::cell_time_objects());
    assert!(failing_block().is_err());
    assert!(!future::cell_time_objects());
}
