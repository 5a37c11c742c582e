use kvstash::adapters::memory::glob_match;
use kvstash::{KeyBuilder, TypeDescriptor};
use proptest::prelude::*;

/// Segments drawn from an alphabet rich in delimiters and glob characters.
fn segment() -> impl Strategy<Value = String> {
    "[ab:%*?<>,\\[\\]]{0,5}"
}

fn descriptor() -> impl Strategy<Value = TypeDescriptor> {
    let leaf = "[A-Za-z:<>,%]{1,6}".prop_map(TypeDescriptor::named);
    leaf.prop_recursive(3, 8, 3, |inner| {
        ("[A-Za-z]{1,4}", prop::collection::vec(inner, 1..3))
            .prop_map(|(name, args)| TypeDescriptor::named(name).with_args(args))
    })
}

proptest! {
    /// Property: key derivation is deterministic
    #[test]
    fn prop_same_inputs_same_key(
        raw in segment(),
        ty in descriptor(),
        bucket in prop::option::of(segment()),
    ) {
        let first = KeyBuilder::new("app-1").unwrap().build_key(&raw, &ty, bucket.as_deref());
        let second = KeyBuilder::new("app-1").unwrap().build_key(&raw, &ty, bucket.as_deref());
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    /// Property: distinct (type, bucket, raw key) tuples never share a key
    #[test]
    fn prop_distinct_inputs_distinct_keys(
        a in (descriptor(), prop::option::of(segment()), segment()),
        b in (descriptor(), prop::option::of(segment()), segment()),
    ) {
        prop_assume!(a != b);
        let keys = KeyBuilder::new("app-1").unwrap();
        prop_assert_ne!(
            keys.build_key(&a.2, &a.0, a.1.as_deref()),
            keys.build_key(&b.2, &b.0, b.1.as_deref())
        );
    }
}

proptest! {
    /// Property: a scan of the whole scope matches exactly the keys of that scope
    #[test]
    fn prop_scan_scope_matches_only_own_keys(
        raw in segment(),
        own in (descriptor(), prop::option::of(segment())),
        other in (descriptor(), prop::option::of(segment())),
    ) {
        let keys = KeyBuilder::new("app-1").unwrap();
        let pattern = keys.scan_pattern("*", &own.0, own.1.as_deref());

        let own_key = keys.build_key(&raw, &own.0, own.1.as_deref());
        prop_assert!(glob_match(&pattern, &own_key));

        let other_key = keys.build_key(&raw, &other.0, other.1.as_deref());
        if own != other {
            prop_assert!(!glob_match(&pattern, &other_key));
        }
    }

    /// Property: a plain type name addresses the same entry as its descriptor
    #[test]
    fn prop_plain_key_matches_descriptor_key(
        name in "[A-Za-z:%]{1,8}",
        raw in segment(),
        bucket in prop::option::of(segment()),
    ) {
        let keys = KeyBuilder::new("app-1").unwrap();
        prop_assert_eq!(
            keys.build_plain_key(&raw, &name, bucket.as_deref()),
            keys.build_key(&raw, &TypeDescriptor::named(name.clone()), bucket.as_deref())
        );
    }
}
