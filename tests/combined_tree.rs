use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::Index;
use sidebar_tree::model::{TreePath, Value, ValueKind};
use sidebar_tree::store::TreeStore;
use sidebar_tree::tree::{
    ColumnSet, CombinedTree, FixedList, NodeKey, SegmentId, SourceRef, TreeError, TreeEvent,
    TreeSource,
};
use std::cell::RefCell;
use std::rc::Rc;

fn columns() -> ColumnSet<String> {
    ColumnSet::single(ValueKind::Text, |s: &String| Value::from(s.as_str()))
}

fn store(labels: &[&str]) -> Rc<TreeStore<String>> {
    let store = Rc::new(TreeStore::new());
    for label in labels {
        store.append(None, label.to_string()).unwrap();
    }
    store
}

fn source(store: &Rc<TreeStore<String>>) -> SourceRef<String> {
    store.clone()
}

fn segment_of(tree: &CombinedTree<String>, store: &Rc<TreeStore<String>>) -> SegmentId {
    tree.segments().segment_for_source(&source(store)).unwrap().id()
}

fn range_of(tree: &CombinedTree<String>, store: &Rc<TreeStore<String>>) -> (usize, usize) {
    let segment = tree.segments().segment_for_source(&source(store)).unwrap();
    (segment.start(), segment.end())
}

fn record(tree: &mut CombinedTree<String>) -> Rc<RefCell<Vec<TreeEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    tree.connect(move |event, _| {
        log.borrow_mut().push(event.clone());
        Ok(())
    });
    seen
}

/// Every virtual path of `tree`, depth first
fn all_paths(tree: &CombinedTree<String>) -> Vec<TreePath> {
    fn walk(tree: &CombinedTree<String>, parent: &TreePath, out: &mut Vec<TreePath>) {
        let n = tree.n_children_at(parent).unwrap();
        for i in 0..n {
            let path = parent.child(i);
            out.push(path.clone());
            walk(tree, &path, out);
        }
    }
    let mut out = Vec::new();
    walk(tree, &TreePath::root(), &mut out);
    out
}

#[test]
fn two_sources_then_insert_into_first() {
    let s1 = store(&["a", "b", "c"]);
    let s2 = store(&["d", "e"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s1), source(&s2)]).unwrap();

    let id1 = segment_of(&tree, &s1);
    let id2 = segment_of(&tree, &s2);
    for index in 0..=2 {
        assert_eq!(tree.segments().segment_for_index(index).unwrap().id(), id1);
    }
    for index in 3..=4 {
        assert_eq!(tree.segments().segment_for_index(index).unwrap().id(), id2);
    }
    assert_eq!(tree.segments().total_size(), 5);

    let seen = record(&mut tree);
    s1.insert(None, Some(1), "new".to_string()).unwrap();
    tree.pump().unwrap();

    assert_eq!(range_of(&tree, &s1), (0, 4));
    assert_eq!(range_of(&tree, &s2), (4, 6));
    assert_eq!(seen.borrow().len(), 1);
    match &seen.borrow()[0] {
        TreeEvent::RowInserted { path, iter } => {
            assert_eq!(*path, TreePath::from([1]));
            assert_eq!(tree.row(iter).unwrap(), "new");
        }
        other => panic!("expected an insert, got {other:?}"),
    }
}

#[test]
fn root_reorder_spans_the_whole_root_level() {
    let a = store(&["a0", "a1", "a2"]);
    let b = store(&["y", "x"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&a), source(&b)]).unwrap();
    let seen = record(&mut tree);

    b.sort_children(None, |l, r| l.cmp(r)).unwrap();
    tree.pump().unwrap();

    let events = seen.borrow();
    let TreeEvent::RowsReordered { path, new_order, .. } = &events[0] else {
        panic!("expected a reorder, got {:?}", events[0]);
    };
    assert!(path.is_root());
    assert_eq!(*new_order, vec![0, 1, 2, 4, 3]);
    assert_eq!(tree.row_at(&TreePath::from([3])).unwrap(), "x");
}

#[test]
fn deleting_only_row_empties_segment() {
    let before = store(&["p0", "p1"]);
    let middle = store(&["m"]);
    let after = store(&["f0", "f1"]);
    let mut tree = CombinedTree::with_sources(
        columns(),
        [source(&before), source(&middle), source(&after)],
    )
    .unwrap();

    let key = middle.lookup(&TreePath::from([0])).unwrap();
    middle.remove(key).unwrap();
    tree.pump().unwrap();

    assert_eq!(range_of(&tree, &before), (0, 2));
    assert_eq!(range_of(&tree, &middle), (2, 2));
    assert_eq!(range_of(&tree, &after), (2, 4));
    assert_eq!(tree.row_at(&TreePath::from([2])).unwrap(), "f0");

    // An empty segment can grow again
    middle.append(None, "m2".to_string()).unwrap();
    tree.pump().unwrap();
    assert_eq!(tree.row_at(&TreePath::from([2])).unwrap(), "m2");
    tree.check_consistency().unwrap();
}

#[test]
fn source_and_virtual_paths_round_trip() {
    let fixed: SourceRef<String> = Rc::new(FixedList::new(
        ["f0".to_string(), "f1".to_string()],
        columns(),
    ));
    let nested = store(&["n0", "n1"]);
    let n0 = nested.children(None)[0];
    let n00 = nested.append(Some(n0), "n00".to_string()).unwrap();
    nested.append(Some(n00), "n000".to_string()).unwrap();
    let tree = CombinedTree::with_sources(columns(), [fixed, source(&nested)]).unwrap();

    let paths = all_paths(&tree);
    assert_eq!(paths.len(), 6);
    for path in paths {
        let (segment, local) = tree.segments().to_source_path(&path).unwrap().unwrap();
        assert_eq!(tree.segments().to_virtual_path(segment, &local).unwrap(), path);
    }
}

#[test]
fn resolving_twice_gives_equal_handles() {
    let s = store(&["a", "b"]);
    let tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    let path = TreePath::from([1]);
    let first = tree.get_iter(&path).unwrap();
    let second = tree.get_iter(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.node(), NodeKey(1));
}

#[test]
fn mutations_advance_stamp_and_invalidate_handles() {
    let s = store(&["a", "b"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();

    let mut handles = vec![tree.get_iter(&TreePath::from([0])).unwrap()];
    let mut stamp = tree.stamp();
    for label in ["c", "d", "e"] {
        s.append(None, label.to_string()).unwrap();
        tree.pump().unwrap();

        assert!(tree.stamp().get() > stamp.get());
        stamp = tree.stamp();
        for handle in &handles {
            assert!(!tree.is_valid(handle));
            assert!(matches!(tree.row(handle), Err(TreeError::StaleIter { .. })));
        }
        handles.push(tree.get_iter(&TreePath::from([0])).unwrap());
    }
}

#[test]
fn value_changes_keep_handles() {
    let s = store(&["a"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    let iter = tree.get_iter(&TreePath::from([0])).unwrap();

    s.set(iter.node(), "A".to_string()).unwrap();
    tree.pump().unwrap();

    assert!(tree.is_valid(&iter));
    assert_eq!(tree.value(&iter, 0).unwrap(), Value::Text("A".into()));
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "already registered"))]
fn registering_twice_violates_contract() {
    let s = store(&["a"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    assert!(matches!(
        tree.register(source(&s), 0),
        Err(TreeError::DuplicateSource(_))
    ));
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "not registered"))]
fn unregistering_a_stranger_violates_contract() {
    let s = store(&["a"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    assert!(matches!(
        tree.unregister(&source(&store(&[]))),
        Err(TreeError::UnknownSource)
    ));
}

#[test]
fn registering_past_the_end_is_rejected() {
    let s = store(&["a"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    assert!(matches!(
        tree.register(source(&store(&["x"])), 5),
        Err(TreeError::InvalidPosition { position: 5, len: 1 })
    ));
    tree.check_consistency().unwrap();
}

#[test]
fn queued_root_inserts_resolve_to_their_own_rows() {
    let s = store(&["a"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&s)]).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    tree.connect(move |event, tree| {
        if let TreeEvent::RowInserted { path, iter } = event {
            assert_eq!(tree.get_path(iter)?, *path);
            log.borrow_mut().push(tree.row(iter)?);
        }
        Ok(())
    });

    s.insert(None, Some(0), "b".to_string()).unwrap();
    s.insert(None, Some(0), "c".to_string()).unwrap();
    assert_eq!(tree.pump().unwrap(), 2);

    assert_eq!(*seen.borrow(), vec!["b", "c"]);
    tree.check_consistency().unwrap();
    let labels: Vec<_> = (0..3)
        .map(|i| tree.row_at(&TreePath::from([i])).unwrap())
        .collect();
    assert_eq!(labels, vec!["c", "b", "a"]);
}

#[test]
fn queued_mixed_events_settle_in_one_pump() {
    let a = store(&["a0"]);
    let b = store(&["b0", "b1"]);
    let mut tree = CombinedTree::with_sources(columns(), [source(&a), source(&b)]).unwrap();
    let seen = record(&mut tree);

    let a0 = a.children(None)[0];
    a.append(Some(a0), "a0.0".to_string()).unwrap();
    b.insert(None, Some(0), "b-first".to_string()).unwrap();
    a.remove(a0).unwrap();
    b.sort_children(None, |l, r| r.cmp(l)).unwrap();
    tree.pump().unwrap();

    let paths: Vec<_> = seen.borrow().iter().map(|e| e.path().clone()).collect();
    assert_eq!(
        paths,
        vec![
            TreePath::from([0, 0]),
            TreePath::from([0]),
            TreePath::from([1]),
            TreePath::from([0]),
            TreePath::root(),
        ]
    );
    assert_eq!(range_of(&tree, &a), (0, 0));
    assert_eq!(range_of(&tree, &b), (0, 3));
    tree.check_consistency().unwrap();
}

#[test]
fn shared_source_feeds_every_composite() {
    let shared = store(&["a"]);
    let mut first = CombinedTree::with_sources(columns(), [source(&shared)]).unwrap();
    let mut second =
        CombinedTree::with_sources(columns(), [source(&store(&["x"])), source(&shared)]).unwrap();

    shared.append(None, "b".to_string()).unwrap();
    assert_eq!(first.pump().unwrap(), 1);
    assert_eq!(second.pump().unwrap(), 1);
    assert_eq!(first.row_at(&TreePath::from([1])).unwrap(), "b");
    assert_eq!(second.row_at(&TreePath::from([2])).unwrap(), "b");
}

#[test]
fn unregistering_a_shared_source_leaves_other_composites_connected() {
    let shared = store(&["a"]);
    let mut first = CombinedTree::with_sources(columns(), [source(&shared)]).unwrap();
    let mut second = CombinedTree::with_sources(columns(), [source(&shared)]).unwrap();
    // both composites numbered the segment the same
    assert_eq!(segment_of(&first, &shared), segment_of(&second, &shared));

    first.unregister(&source(&shared)).unwrap();
    shared.append(None, "b".to_string()).unwrap();

    assert_eq!(first.pump().unwrap(), 0);
    assert_eq!(second.pump().unwrap(), 1);
    assert_eq!(second.segments().total_size(), 2);
    second.check_consistency().unwrap();
    first.check_consistency().unwrap();
}

// ---------------------------------------------------------------------------
// Generated layouts and mutation sequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Mutation {
    InsertRoot { source: Index, at: Index },
    AppendChild { source: Index, parent: Index },
    RemoveRoot { source: Index, row: Index },
    RemoveChild { source: Index, parent: Index },
    Rename { source: Index, row: Index },
    SortRoots { source: Index },
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (any::<Index>(), any::<Index>())
            .prop_map(|(source, at)| Mutation::InsertRoot { source, at }),
        2 => (any::<Index>(), any::<Index>())
            .prop_map(|(source, parent)| Mutation::AppendChild { source, parent }),
        2 => (any::<Index>(), any::<Index>())
            .prop_map(|(source, row)| Mutation::RemoveRoot { source, row }),
        1 => (any::<Index>(), any::<Index>())
            .prop_map(|(source, parent)| Mutation::RemoveChild { source, parent }),
        1 => (any::<Index>(), any::<Index>())
            .prop_map(|(source, row)| Mutation::Rename { source, row }),
        1 => any::<Index>().prop_map(|source| Mutation::SortRoots { source }),
    ]
}

/// Source sizes plus, for each source, where among the already registered
/// ones it goes
fn layout() -> impl Strategy<Value = (Vec<usize>, Vec<Index>)> {
    (
        prop::collection::vec(0usize..4, 1..5),
        prop::collection::vec(any::<Index>(), 4),
    )
}

/// Batches of mutations; every batch is queued up before one pump
fn batches() -> impl Strategy<Value = Vec<Vec<Mutation>>> {
    prop::collection::vec(prop::collection::vec(mutation(), 1..5), 1..25)
}

/// Register one store per size, store `i` at `positions[i]`. Returns the
/// stores in creation order and the expected segment order.
fn build(
    sizes: &[usize],
    positions: &[Index],
) -> (CombinedTree<String>, Vec<Rc<TreeStore<String>>>, Vec<usize>) {
    let mut tree = CombinedTree::new(columns());
    let mut stores = Vec::new();
    let mut order = Vec::new();
    for (i, size) in sizes.iter().enumerate() {
        let labels: Vec<String> = (0..*size).map(|n| format!("s{i}r{n}")).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        let s = store(&labels);
        let position = positions[i].index(i + 1);
        tree.register(source(&s), position).unwrap();
        order.insert(position, i);
        stores.push(s);
    }
    (tree, stores, order)
}

fn apply(stores: &[Rc<TreeStore<String>>], mutation: &Mutation, step: usize) {
    match mutation {
        Mutation::InsertRoot { source, at } => {
            let target = source.get(stores);
            let at = at.index(target.n_children(None) + 1);
            target.insert(None, Some(at), format!("r{step}")).unwrap();
        }
        Mutation::AppendChild { source, parent } => {
            let target = source.get(stores);
            let roots = target.children(None);
            if !roots.is_empty() {
                target.append(Some(*parent.get(&roots)), format!("c{step}")).unwrap();
            }
        }
        Mutation::RemoveRoot { source, row } => {
            let target = source.get(stores);
            let roots = target.children(None);
            if !roots.is_empty() {
                target.remove(*row.get(&roots)).unwrap();
            }
        }
        Mutation::RemoveChild { source, parent } => {
            let target = source.get(stores);
            let roots = target.children(None);
            if roots.is_empty() {
                return;
            }
            let children = target.children(Some(*parent.get(&roots)));
            if let Some(child) = children.first() {
                target.remove(*child).unwrap();
            }
        }
        Mutation::Rename { source, row } => {
            let target = source.get(stores);
            let roots = target.children(None);
            if !roots.is_empty() {
                target.set(*row.get(&roots), format!("renamed{step}")).unwrap();
            }
        }
        Mutation::SortRoots { source } => {
            source.get(stores).sort_children(None, |l, r| l.cmp(r)).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn partition_holds_for_any_layout_and_mutations(
        (sizes, positions) in layout(),
        batches in batches(),
    ) {
        let (mut tree, stores, order) = build(&sizes, &positions);
        tree.check_consistency().unwrap();
        let registered: Vec<usize> = tree
            .segments()
            .iter()
            .map(|segment| {
                stores
                    .iter()
                    .position(|s| tree.segments().segment_for_source(&source(s)).unwrap().id() == segment.id())
                    .unwrap()
            })
            .collect();
        prop_assert_eq!(registered, order);

        let mut step = 0;
        for batch in &batches {
            for mutation in batch {
                apply(&stores, mutation, step);
                step += 1;
            }
            tree.pump().unwrap();
            prop_assert!(tree.check_consistency().is_ok());
        }

        let expected: usize = stores.iter().map(|s| s.n_children(None)).sum();
        prop_assert_eq!(tree.segments().total_size(), expected);
    }

    #[test]
    fn every_path_round_trips(
        (sizes, positions) in layout(),
        batches in batches(),
    ) {
        let (mut tree, stores, _) = build(&sizes, &positions);
        for (step, mutation) in batches.iter().flatten().enumerate() {
            apply(&stores, mutation, step);
        }
        tree.pump().unwrap();

        for path in all_paths(&tree) {
            let (segment, local) = tree.segments().to_source_path(&path).unwrap().unwrap();
            prop_assert_eq!(tree.segments().to_virtual_path(segment, &local).unwrap(), path.clone());
            let iter = tree.get_iter(&path).unwrap();
            prop_assert_eq!(tree.get_path(&iter).unwrap(), path);
        }
    }
}
