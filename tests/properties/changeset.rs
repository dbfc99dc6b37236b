//! Property tests for change-set construction and description.

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;

use buildloop::ChangeSet;

fn raw_paths() -> impl Strategy<Value = Vec<PathBuf>> {
    proptest::collection::vec(
        proptest::string::string_regex("[a-f0-9]{1,4}(/[a-f0-9]{1,4}){0,2}")
            .unwrap()
            .prop_map(PathBuf::from),
        0..=16,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Construction sorts and deduplicates, losing no distinct path.
    #[test]
    fn property_changeset_is_sorted_and_deduplicated(raw in raw_paths()) {
        let distinct: BTreeSet<PathBuf> = raw.iter().cloned().collect();
        let changes = ChangeSet::new(raw);

        prop_assert_eq!(changes.len(), distinct.len());
        prop_assert!(changes.paths().windows(2).all(|w| w[0] < w[1]));
        for path in changes.paths() {
            prop_assert!(distinct.contains(path));
        }
    }

    /// PROPERTY: Construction is idempotent.
    #[test]
    fn property_changeset_construction_is_idempotent(raw in raw_paths()) {
        let once = ChangeSet::new(raw);
        let twice = ChangeSet::new(once.paths().to_vec());
        prop_assert_eq!(once.paths(), twice.paths());
    }

    /// PROPERTY: The description never panics and always carries the count.
    #[test]
    fn property_describe_reports_the_count(raw in raw_paths()) {
        let changes = ChangeSet::new(raw);
        let line = changes.describe();

        if changes.len() == 1 {
            prop_assert!(line.starts_with("1 file changed"));
        } else {
            let expected_prefix = format!("{} files changed", changes.len());
            prop_assert!(line.starts_with(&expected_prefix));
        }
    }
}
