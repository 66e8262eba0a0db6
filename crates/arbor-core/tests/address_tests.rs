//! Address normalization properties

use arbor_core::address::PathAddress;
use arbor_core::template::ResolutionContext;
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,8}"
}

proptest! {
    #[test]
    fn prop_separator_noise_does_not_change_address(
        segments in prop::collection::vec(segment(), 0..6),
        leading in 0usize..3,
        trailing in 0usize..3,
        doubled in 1usize..3,
    ) {
        let clean = PathAddress::from_parts(&segments);
        let noisy = format!(
            "{}{}{}",
            "/".repeat(leading),
            segments.join("/".repeat(doubled).as_str()),
            "/".repeat(trailing)
        );
        prop_assert_eq!(PathAddress::parse(&noisy), clean.clone());
        prop_assert_eq!(clean.len(), segments.len());
    }

    #[test]
    fn prop_display_parses_back(segments in prop::collection::vec(segment(), 0..6)) {
        let address = PathAddress::from_parts(&segments);
        prop_assert_eq!(PathAddress::parse(&address.to_string()), address);
    }

    #[test]
    fn prop_append_then_parent(
        segments in prop::collection::vec(segment(), 0..5),
        extra in segment(),
    ) {
        let address = PathAddress::from_parts(&segments);
        let child = address.append_segment(&extra);
        prop_assert_eq!(child.parent(), Some(address));
        prop_assert_eq!(child.last_segment(), Some(extra.as_str()));
    }

    #[test]
    fn prop_sub_addresses_concatenate(
        segments in prop::collection::vec(segment(), 1..6),
        split in 0usize..6,
    ) {
        let address = PathAddress::from_parts(&segments);
        let split = split.min(address.len());
        let head = address.sub_address_range(0, split).unwrap();
        let tail = address.sub_address(split).unwrap();
        prop_assert_eq!(head.append(&tail.to_string()), address);
    }
}

#[test]
fn test_normalization_forms() {
    let expected = PathAddress::parse("/a/b/c");
    assert_eq!(PathAddress::parse("a/b/c"), expected);
    assert_eq!(PathAddress::parse("/a/b/c/"), expected);
    assert_eq!(PathAddress::parse("a/b").append("c"), expected);
    assert_eq!(expected.to_string(), "/a/b/c");
}

#[test]
fn test_templates_resolved_only_when_bound() {
    // GIVEN an address with two template slots and one binding
    let address = PathAddress::parse("/content/{site-type}/{site-name}");
    let resolution = ResolutionContext::new().with_binding("site-type", "portal");

    // WHEN templates are resolved
    let resolved = address.resolve_templates(&resolution);

    // THEN only the bound slot is replaced and the original is untouched
    assert_eq!(resolved.to_string(), "/content/portal/{site-name}");
    assert_eq!(address.to_string(), "/content/{site-type}/{site-name}");
    assert_ne!(resolved, address);
}
