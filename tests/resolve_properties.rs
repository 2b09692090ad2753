// tests/resolve_properties.rs

use std::collections::BTreeMap;

use fstrigger::resolve::pattern::normalize;
use fstrigger::resolve::resolve;
use proptest::prelude::*;

proptest! {
    #[test]
    fn directory_and_glob_rebuild_the_pattern(
        dirs in proptest::collection::vec("[a-z0-9_.-]{1,8}", 1..4),
        glob in "[a-z*?.]{0,10}",
    ) {
        let pattern = format!("/{}/{}", dirs.join("/"), glob);
        let parts = resolve(&pattern, &BTreeMap::new()).unwrap();

        prop_assert!(!parts.glob.contains('/'));
        prop_assert_eq!(format!("{}/{}", parts.directory, parts.glob), normalize(&pattern));
    }

    #[test]
    fn backslashes_behave_like_slashes(
        dirs in proptest::collection::vec("[a-z0-9]{1,8}", 1..4),
        glob in "[a-z*]{1,6}",
    ) {
        let unix = format!("/{}/{}", dirs.join("/"), glob);
        let windows = format!("\\{}\\{}", dirs.join("\\"), glob);
        prop_assert_eq!(
            resolve(&unix, &BTreeMap::new()).unwrap(),
            resolve(&windows, &BTreeMap::new()).unwrap()
        );
    }

    #[test]
    fn patterns_without_a_separator_are_rejected(name in "[a-z*?.]{0,12}") {
        prop_assert!(resolve(&name, &BTreeMap::new()).is_err());
    }
}
