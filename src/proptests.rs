use super::*;

use crate::node::Node;
use proptest::prelude::*;

/// Structural invariants of a built node table.
fn validate_table(t: &NodeTable, case: CaseMode) {
    let nodes = &t.nodes;
    let mut reached = vec![false; nodes.len()];
    let mut results = vec![0usize; t.keys.len()];

    let mut stack = vec![(0usize, t.root().skip as usize)];
    reached[0] = true;
    while let Some((index, depth)) = stack.pop() {
        let node = nodes[index];
        if let Some(r) = node.result() {
            results[r as usize] += 1;
            if node.has_children() {
                assert_eq!(t.key(r).len(), depth, "key must end at its node's split");
            }
        }
        if !node.has_children() {
            continue;
        }

        assert!(node.mask == 0 || (node.mask as usize + 1).is_power_of_two());
        assert!(node.shift <= crate::jump_table::MAX_SHIFT);
        let base = node.base as usize;
        assert!(base > index, "child block must follow its parent");
        assert!(base + node.fanout() <= nodes.len(), "child block out of bounds");

        for slot in 0..node.fanout() {
            let child = nodes[base + slot];
            assert!(!reached[base + slot], "slot shared by two parents");
            reached[base + slot] = true;
            if child.is_blank() {
                continue;
            }
            assert!(child.skip >= 1, "children consume their dispatch byte");
            // Every key below the slot dispatches to it.
            let mut below = Vec::new();
            collect_results(nodes, base + slot, &mut below);
            for r in below {
                let key = t.key(r);
                assert_eq!(node.slot(case.fold(key[depth])), slot);
            }
            stack.push((base + slot, depth + child.skip as usize));
        }
    }

    assert!(results.iter().all(|&n| n == 1), "each key must end at exactly one node");
    for (i, node) in nodes.iter().enumerate() {
        if !reached[i] {
            assert!(node.is_blank(), "unreachable node {i} is not blank");
        }
    }
}

fn collect_results(nodes: &[Node], index: usize, out: &mut Vec<u32>) {
    let node = nodes[index];
    out.extend(node.result());
    for slot in 0..node.fanout() {
        collect_results(nodes, node.base as usize + slot, out);
    }
}

/// Small alphabet with folding punctuation so keys share prefixes and
/// collide under the case fold.
fn key_strategy() -> impl Strategy<Value = String> + Clone {
    "[abAB@`_{\\[0\u{e9}]{0,7}"
}

fn pairs_strategy() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec((key_strategy(), any::<u32>()), 0..=120)
}

/// Equality key under `case`.
fn normalize(case: CaseMode, key: &str) -> Vec<u8> {
    match case {
        CaseMode::Sensitive => key.as_bytes().to_vec(),
        CaseMode::Insensitive => key.as_bytes().to_ascii_lowercase(),
    }
}

fn folded(case: CaseMode, key: &str) -> Vec<u8> {
    key.bytes().map(|b| case.fold(b)).collect()
}

/// Pairs whose keys dispatch apart, dropping any key that shares a branch
/// with an earlier key it is not equal to.
fn distinguishable(pairs: &[(String, u32)], case: CaseMode) -> Vec<(String, u32)> {
    let mut first: HashMap<Vec<u8>, &str> = HashMap::new();
    let mut out = Vec::new();
    for (k, v) in pairs {
        let keep = match first.entry(folded(case, k)) {
            Entry::Occupied(e) => case.equals(e.get().as_bytes(), k.as_bytes()),
            Entry::Vacant(e) => {
                e.insert(k.as_str());
                true
            }
        };
        if keep {
            out.push((k.clone(), *v));
        }
    }
    out
}

fn reference(pairs: &[(String, u32)], case: CaseMode) -> HashMap<Vec<u8>, u32> {
    pairs
        .iter()
        .map(|(k, v)| (normalize(case, k), *v))
        .collect()
}

/// Spellings that share a branch with `key`: case flips and swaps of the
/// punctuation pairs the dispatch fold merges.
fn fold_variants(key: &str) -> Vec<String> {
    let swapped: String = key
        .chars()
        .map(|c| match c {
            '@' => '`',
            '`' => '@',
            '[' => '{',
            '{' => '[',
            c => c,
        })
        .collect();
    vec![
        key.to_ascii_uppercase(),
        key.to_ascii_lowercase(),
        swapped.to_ascii_uppercase(),
        swapped,
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_round_trip(pairs in pairs_strategy(), options in any::<Options>()) {
        let pairs = distinguishable(&pairs, options.case);
        let t = FrozenTrie::from_pairs(pairs.clone(), options).unwrap();
        let m = reference(&pairs, options.case);
        prop_assert_eq!(t.len(), m.len());
        validate_table(&t.table, options.case);

        for (key, _) in &pairs {
            prop_assert_eq!(t.get(key), m.get(&normalize(options.case, key)));
        }
        for (key, value) in t.iter() {
            prop_assert_eq!(Some(value), m.get(&normalize(options.case, key)));
        }
    }

    #[test]
    fn prop_negative_containment(
        pairs in pairs_strategy(),
        probes in prop::collection::vec(key_strategy(), 0..200),
        options in any::<Options>(),
    ) {
        let pairs = distinguishable(&pairs, options.case);
        let t = FrozenTrie::from_pairs(pairs.clone(), options).unwrap();
        let m = reference(&pairs, options.case);
        let variants = pairs.iter().flat_map(|(k, _)| fold_variants(k));
        for probe in probes.iter().cloned().chain(variants) {
            prop_assert_eq!(t.get(&probe), m.get(&normalize(options.case, &probe)), "{:?}", probe);
        }
    }

    #[test]
    fn prop_fold_collisions_are_reported(pairs in pairs_strategy(), options in any::<Options>()) {
        let kept = distinguishable(&pairs, options.case).len();
        match FrozenTrie::from_pairs(pairs.clone(), options) {
            Ok(_) => prop_assert_eq!(kept, pairs.len()),
            Err(e) => {
                prop_assert!(kept < pairs.len());
                prop_assert!(matches!(e, BuildError::FoldCollision { .. }), "{:?}", e);
            }
        }
    }

    #[test]
    fn prop_engines_agree(
        pairs in pairs_strategy(),
        probes in prop::collection::vec(key_strategy(), 0..200),
        case in any::<CaseMode>(),
    ) {
        let pairs = distinguishable(&pairs, case);
        let options = Options::new().case_mode(case);
        let interp = FrozenTrie::from_pairs(pairs.clone(), options).unwrap();
        let comp = FrozenTrie::from_pairs(pairs.clone(), options.engine(Engine::Compiled)).unwrap();

        let edits = pairs.iter().flat_map(|(k, _)| {
            let mut out = fold_variants(k);
            out.push(k.clone());
            let chars: Vec<char> = k.chars().collect();
            for i in 0..chars.len() {
                let mut dropped = chars.clone();
                dropped.remove(i);
                out.push(dropped.into_iter().collect());
                let mut doubled = chars.clone();
                doubled.insert(i, chars[i]);
                out.push(doubled.into_iter().collect());
                let mut replaced = chars.clone();
                replaced[i] = 'Z';
                out.push(replaced.into_iter().collect());
            }
            out
        });

        for probe in probes.iter().cloned().chain(edits) {
            prop_assert_eq!(interp.get(&probe), comp.get(&probe), "{:?}", probe);
        }
    }

    #[test]
    fn prop_case_modes_agree(
        pairs in pairs_strategy(),
        probes in prop::collection::vec(key_strategy(), 0..100),
        engine in any::<Engine>(),
    ) {
        // One spelling per branch, so both modes accept the same key list.
        let mut seen = HashMap::new();
        let unique: Vec<(String, u32)> = pairs
            .iter()
            .filter(|(k, _)| seen.insert(folded(CaseMode::Insensitive, k), ()).is_none())
            .cloned()
            .collect();
        let keys: Vec<String> = unique.iter().map(|(k, _)| k.clone()).collect();
        let values: Vec<u32> = unique.iter().map(|(_, v)| *v).collect();

        let sensitive =
            FrozenTrie::build(keys.clone(), values.clone(), Options::new().engine(engine)).unwrap();
        let insensitive = FrozenTrie::build(
            keys,
            values,
            Options::new().ignore_case(true).engine(engine),
        ).unwrap();

        let variants = unique.iter().flat_map(|(k, _)| fold_variants(k));
        let stored = unique.iter().map(|(k, _)| k.clone());
        for probe in probes.iter().cloned().chain(variants).chain(stored) {
            let exact = unique.iter().find(|(k, _)| *k == probe).map(|(_, v)| v);
            let variant = unique
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(&probe))
                .map(|(_, v)| v);
            prop_assert_eq!(sensitive.get(&probe), exact, "{:?}", probe);
            prop_assert_eq!(insensitive.get(&probe), variant, "{:?}", probe);
            if variant.is_none() {
                prop_assert_eq!(sensitive.get(&probe), insensitive.get(&probe), "{:?}", probe);
            }
        }
    }

    #[test]
    fn prop_construction_is_deterministic(pairs in pairs_strategy(), options in any::<Options>()) {
        let pairs = distinguishable(&pairs, options.case);
        let a = FrozenTrie::from_pairs(pairs.clone(), options).unwrap();
        let b = FrozenTrie::from_pairs(pairs.clone(), options).unwrap();
        prop_assert_eq!(&a.table.nodes, &b.table.nodes);
        prop_assert_eq!(a.program().map(Program::ops), b.program().map(Program::ops));
    }
}

fn for_each_subset<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    for bits in 0u32..(1 << items.len()) {
        let subset = items
            .iter()
            .enumerate()
            .filter(|(i, _)| bits & (1 << i) != 0)
            .map(|(_, item)| item.clone())
            .collect();
        f(subset);
    }
}

#[test]
fn exhaustive_small_key_subsets() {
    let keys = ["", "a", "b", "A", "aa", "ab", "ba", "a@", "a`", "bab"];
    let probes = [
        "", "a", "b", "c", "A", "B", "aa", "aA", "ab", "AB", "ba", "bb", "a@", "a`", "bab", "baB",
        "abc", "aaa",
    ];

    for_each_subset(&keys, |subset| {
        for case in [CaseMode::Sensitive, CaseMode::Insensitive] {
            let pairs: Vec<(&str, usize)> = subset.iter().copied().zip(0..).collect();
            if case == CaseMode::Insensitive && subset.contains(&"a@") && subset.contains(&"a`") {
                let err = FrozenTrie::from_pairs(pairs, Options::new().case_mode(case)).unwrap_err();
                assert!(matches!(err, BuildError::FoldCollision { .. }), "{subset:?}");
                continue;
            }
            let interp = FrozenTrie::from_pairs(pairs.clone(), Options::new().case_mode(case))
                .unwrap();
            let comp = FrozenTrie::from_pairs(
                pairs.clone(),
                Options::new().case_mode(case).engine(Engine::Compiled),
            )
            .unwrap();
            validate_table(&interp.table, case);

            for probe in probes {
                let want = pairs
                    .iter()
                    .rev()
                    .find(|(k, _)| case.equals(k.as_bytes(), probe.as_bytes()))
                    .map(|(_, v)| v);
                assert_eq!(interp.get(probe), want, "{subset:?} {case:?} {probe:?}");
                assert_eq!(comp.get(probe), want, "{subset:?} {case:?} {probe:?}");
            }
        }
    });
}
