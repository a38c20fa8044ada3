use proptest::prelude::*;
use strata_core::{
    is_valid_change_name, is_valid_tag_name, parse_reference, Direction, RefTarget, Reference,
    Symbol,
};

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn leaf_strategy() -> impl Strategy<Value = RefTarget> {
    prop_oneof![
        name_strategy().prop_map(RefTarget::Change),
        name_strategy().prop_map(RefTarget::Tag),
        (name_strategy(), name_strategy())
            .prop_map(|(change, tag)| RefTarget::ChangeAtTag { change, tag }),
        "[0-9a-f]{40}".prop_map(RefTarget::Sha1),
        prop_oneof![Just(Symbol::Head), Just(Symbol::Root)].prop_map(RefTarget::Symbolic),
    ]
}

fn target_strategy() -> impl Strategy<Value = RefTarget> {
    leaf_strategy().prop_recursive(3, 8, 1, |inner| {
        (
            inner,
            prop_oneof![Just(Direction::Caret), Just(Direction::Tilde)],
            1u32..50,
        )
            .prop_map(|(base, direction, count)| RefTarget::Relative {
                base: Box::new(base),
                direction,
                count,
            })
    })
}

proptest! {
    #[test]
    fn forbidden_characters_invalidate_names(
        prefix in "[a-z]{0,5}",
        forbidden in prop::sample::select(vec!['@', ':', '\\', '#', ' ', '\t', '\n']),
        suffix in "[a-z]{0,5}",
    ) {
        let candidate = format!("{prefix}{forbidden}{suffix}");
        prop_assert!(!is_valid_change_name(&candidate));
        prop_assert!(!is_valid_tag_name(&candidate));
    }

    #[test]
    fn caret_suffix_never_forms_a_name(name in name_strategy(), count in 1u32..100_000) {
        prop_assume!(is_valid_change_name(&name));
        let candidate = format!("{name}^{count}");
        prop_assert!(!is_valid_change_name(&candidate));
    }

    #[test]
    fn every_reference_has_a_parseable_spelling(
        project in prop::option::of("[a-z]{1,6}"),
        target in target_strategy(),
    ) {
        let reference = Reference { project, target };
        let rendered = reference.to_string();
        prop_assert_eq!(parse_reference(&rendered), Some(reference));
    }
}

#[test]
fn documented_examples_parse() {
    assert_eq!(
        parse_reference("users_table@v1.0").map(|r| r.target),
        Some(RefTarget::ChangeAtTag {
            change: "users_table".to_string(),
            tag: "v1.0".to_string(),
        })
    );
    assert_eq!(parse_reference("foo:bar:baz"), None);
    assert_eq!(
        parse_reference("@HEAD^^"),
        Some(Reference::local(RefTarget::Relative {
            base: Box::new(RefTarget::Symbolic(Symbol::Head)),
            direction: Direction::Caret,
            count: 2,
        }))
    );
    assert_eq!(
        parse_reference("project:foo~3"),
        Some(Reference {
            project: Some("project".to_string()),
            target: RefTarget::Relative {
                base: Box::new(RefTarget::Change("foo".to_string())),
                direction: Direction::Tilde,
                count: 3,
            },
        })
    );
}
