//! Property tests for watch-set delta computation.

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;

use buildloop::watch_delta;

fn path_set() -> impl Strategy<Value = Vec<PathBuf>> {
    // Small printable path segments keep the sets overlapping often enough
    // to exercise the interesting intersections.
    proptest::collection::vec(
        proptest::string::string_regex("[a-e]{1,3}(/[a-e]{1,3}){0,2}")
            .unwrap()
            .prop_map(PathBuf::from),
        0..=12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Added paths are never already subscribed, and removed paths
    /// always were.
    #[test]
    fn property_delta_sets_are_disjoint_from_their_opposites(
        previous in path_set(),
        current in path_set(),
    ) {
        let previous: BTreeSet<PathBuf> = previous.into_iter().collect();
        let delta = watch_delta(&previous, &current);

        prop_assert!(delta.added.is_disjoint(&previous));
        prop_assert!(delta.removed.is_subset(&previous));
    }

    /// PROPERTY: Applying the delta to the previous set reproduces exactly
    /// the deduplicated current set.
    #[test]
    fn property_applying_the_delta_reaches_the_current_set(
        previous in path_set(),
        current in path_set(),
    ) {
        let previous: BTreeSet<PathBuf> = previous.into_iter().collect();
        let expected: BTreeSet<PathBuf> = current.iter().cloned().collect();
        let delta = watch_delta(&previous, &current);

        let mut applied = previous.clone();
        for path in &delta.removed {
            applied.remove(path);
        }
        applied.extend(delta.added.iter().cloned());

        prop_assert_eq!(applied, expected);
    }

    /// PROPERTY: A second delta from the reached set is empty.
    #[test]
    fn property_delta_is_idempotent(
        previous in path_set(),
        current in path_set(),
    ) {
        let previous: BTreeSet<PathBuf> = previous.into_iter().collect();
        let delta = watch_delta(&previous, &current);

        let mut reached = previous;
        for path in &delta.removed {
            reached.remove(path);
        }
        reached.extend(delta.added.iter().cloned());

        let again = watch_delta(&reached, &current);
        prop_assert!(again.added.is_empty());
        prop_assert!(again.removed.is_empty());
    }

    /// PROPERTY: An unchanged watch set produces no churn.
    #[test]
    fn property_identical_sets_produce_no_delta(paths in path_set()) {
        let previous: BTreeSet<PathBuf> = paths.iter().cloned().collect();
        let delta = watch_delta(&previous, &paths);

        prop_assert!(delta.added.is_empty());
        prop_assert!(delta.removed.is_empty());
    }
}
