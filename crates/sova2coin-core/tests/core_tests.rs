use proptest::prelude::*;
use sova2coin_core::{FlatMap, MetaTree, MetaValue, PluginOptions, merge, merge_all, unflatten};

/// Strategy for scalar leaves.
fn leaf() -> impl Strategy<Value = MetaValue> {
    prop_oneof![
        any::<bool>().prop_map(MetaValue::Bool),
        any::<i64>().prop_map(MetaValue::Integer),
        (-1.0e6f64..1.0e6).prop_map(MetaValue::Float),
        "[a-z0-9]{0,8}".prop_map(MetaValue::String),
        Just(MetaValue::NotApplicable),
    ]
}

/// Strategy for trees whose subtrees are never empty.
fn tree() -> impl Strategy<Value = MetaTree> {
    let value = leaf().prop_recursive(3, 32, 4, |inner| {
        prop::collection::vec(("[a-z]{1,4}", inner), 1..4)
            .prop_map(|pairs| MetaValue::Tree(pairs.into_iter().collect()))
    });
    prop::collection::vec(("[a-z]{1,4}", value), 0..5)
        .prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #[test]
    fn merge_with_empty_is_identity(t in tree()) {
        prop_assert_eq!(merge(&t, &MetaTree::new()).flatten(), t.flatten());
        prop_assert_eq!(merge(&MetaTree::new(), &t).flatten(), t.flatten());
    }

    #[test]
    fn merge_keeps_every_leaf_of_the_right_side(a in tree(), b in tree()) {
        let merged = merge(&a, &b).flatten();
        for (key, value) in b.flatten().iter() {
            prop_assert_eq!(merged.get(key), Some(value));
        }
    }

    #[test]
    fn flatten_keys_address_their_leaf(t in tree()) {
        let flat = t.flatten();
        for (key, value) in flat.iter() {
            prop_assert!(value.is_scalar());
            prop_assert_eq!(t.get_path(key), Some(value));
        }
        let longest = flat.keys().map(|k| k.split('.').count()).max().unwrap_or(0);
        prop_assert_eq!(longest, t.depth());
    }

    #[test]
    fn unflatten_inverts_flatten(t in tree()) {
        prop_assert_eq!(unflatten(&t.flatten()).unwrap(), t);
    }
}

#[test]
fn test_uniform_depth_produces_uniform_keys() {
    let t = merge_all(vec![
        MetaTree::from_dotted("a.b.c", 1).unwrap(),
        MetaTree::from_dotted("a.d.e", 2).unwrap(),
        MetaTree::from_dotted("f.g.h", 3).unwrap(),
    ]);

    assert_eq!(t.depth(), 3);
    let flat = t.flatten();
    assert_eq!(flat.len(), 3);
    assert!(flat.keys().all(|k| k.split('.').count() == 3));
}

#[test]
fn test_instrument_then_rules_precedence() {
    let mut instrument = FlatMap::new();
    instrument.insert("sidecar.SamplingFrequency", 2500.0);
    instrument.insert("sidecar.PowerLineFrequency", MetaValue::NotApplicable);

    let rules = merge_all(vec![
        MetaTree::from_dotted("sidecar.PowerLineFrequency", 50).unwrap(),
        MetaTree::from_dotted("entities.subject", "01").unwrap(),
    ]);

    let mut combined = instrument.clone();
    combined.overlay(rules.flatten());

    assert_eq!(combined.lookup("sidecar.SamplingFrequency"), MetaValue::Float(2500.0));
    assert_eq!(combined.lookup("sidecar.PowerLineFrequency"), MetaValue::Integer(50));
    assert_eq!(combined.lookup("entities.subject"), MetaValue::from("01"));
    assert!(combined.lookup("entities.session").is_not_applicable());
}

#[test]
fn test_run_attributes_rebuild_entities() {
    let attributes: FlatMap = serde_yaml::from_str(
        "entities.subject: '010003'\n\
         entities.session: '001'\n\
         entities.task: resting\n\
         sidecar.SamplingFrequency: 2500.0\n",
    )
    .unwrap();

    let tree = attributes.unflatten().unwrap();
    let entities = tree.subtree("entities").unwrap();
    assert_eq!(entities.len(), 3);
    assert_eq!(entities.get("subject"), Some(&MetaValue::from("010003")));
    assert_eq!(tree.get_path("sidecar.SamplingFrequency"), Some(&MetaValue::Float(2500.0)));
}

#[test]
fn test_options_from_bidsmap_yaml() {
    let options: PluginOptions = serde_yaml::from_str(
        "rules_file: /rules/lemon.yml\n\
         extensions: ['.vhdr', '.edf']\n\
         sidecar:\n  PowerLineFrequency: 50\n",
    )
    .unwrap();

    assert!(options.has_rules());
    assert_eq!(options.extensions.unwrap(), vec![".vhdr", ".edf"]);
    assert_eq!(
        options.overrides.get_path("sidecar.PowerLineFrequency"),
        Some(&MetaValue::Integer(50))
    );
}
