//! Property-based tests for the prefixing and pattern-expansion algebra.

use plugible::prelude::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_prefixed_name_format(
        group in "[a-z][a-z0-9_]{0,15}",
        prefix in "[a-z][a-z0-9]{0,7}",
    ) {
        prop_assert_eq!(prefixed_name(&group, &prefix), format!("{prefix}_{group}"));
    }

    #[test]
    fn prop_empty_prefix_is_identity(group in "[a-z][a-z0-9_]{0,15}") {
        prop_assert_eq!(prefixed_name(&group, ""), group);
    }

    #[test]
    fn prop_numeric_range_count(lo in 0u64..200, span in 0u64..50, step in 1usize..5) {
        let hi = lo + span;
        let (hosts, port) = expand(&format!("node[{lo}:{hi}:{step}]")).unwrap();
        prop_assert_eq!(hosts.len(), (span as usize) / step + 1);
        prop_assert!(hosts.iter().all(|h| h.starts_with("node")));
        prop_assert_eq!(port, None);
    }

    #[test]
    fn prop_port_suffix_round_trip(port in 1u16..u16::MAX) {
        let (hosts, parsed) = expand(&format!("node:{port}")).unwrap();
        prop_assert_eq!(hosts, vec!["node".to_string()]);
        prop_assert_eq!(parsed, Some(port));
    }

    #[test]
    fn prop_literal_names_pass_through(name in "[a-z][a-z0-9.-]{0,20}[a-z0-9]") {
        let (hosts, port) = expand(&name).unwrap();
        prop_assert_eq!(hosts, vec![name]);
        prop_assert_eq!(port, None);
    }
}
