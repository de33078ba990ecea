use proptest::prelude::*;
use ropey::Rope;
use std::sync::Arc;

use super::{Bias, Change, ChangeSet, Effect, Operation, Transaction};
use crate::entity::Entity;
use crate::token::Span;

#[test]
fn test_from_changes_builds_canonical_ops() {
    let cs = ChangeSet::from_changes(5, [Change::new(1..3, "xyz")]);
    assert_eq!(cs.len(), 5);
    assert_eq!(cs.len_after(), 6);
    assert!(matches!(cs.operations()[0], Operation::Retain(1)));
    assert!(matches!(cs.operations()[1], Operation::Insert(_)));
    assert!(matches!(cs.operations()[2], Operation::Delete(2)));
    assert!(matches!(cs.operations()[3], Operation::Retain(2)));
}

#[test]
fn test_apply_replacements() {
    let mut doc = Rope::from("hello world");
    let cs = ChangeSet::from_changes(
        11,
        [Change::new(6..11, "there"), Change::new(0..5, "hi")],
    );
    cs.apply(&mut doc);
    assert_eq!(doc.to_string(), "hi there");
}

#[test]
fn test_overlapping_changes_are_clipped() {
    let mut doc = Rope::from("abcdef");
    let cs = ChangeSet::from_changes(6, [Change::new(0..4, "X"), Change::new(2..5, "Y")]);
    cs.apply(&mut doc);
    assert_eq!(doc.to_string(), "XYf");
}

#[test]
fn test_invert_restores() {
    let original = Rope::from("query Rome now");
    let mut doc = original.clone();
    let cs = ChangeSet::from_changes(14, [Change::delete(6..10), Change::insert(0, ">")]);
    let inverse = cs.invert(&original);
    cs.apply(&mut doc);
    assert_eq!(doc.to_string(), ">query  now");
    inverse.apply(&mut doc);
    assert_eq!(doc, original);
}

#[test]
fn test_map_pos_biases() {
    let cs = ChangeSet::from_changes(10, [Change::insert(4, "ab")]);
    assert_eq!(cs.map_pos(4, Bias::Left), 4);
    assert_eq!(cs.map_pos(4, Bias::Right), 6);
    assert_eq!(cs.map_pos(3, Bias::Right), 3);
    assert_eq!(cs.map_pos(8, Bias::Left), 10);
}

#[test]
fn test_map_pos_inside_replacement() {
    let cs = ChangeSet::from_changes(10, [Change::new(2..6, "xyz")]);
    assert_eq!(cs.map_pos(4, Bias::Left), 2);
    assert_eq!(cs.map_pos(4, Bias::Right), 5);
    assert_eq!(cs.map_pos(6, Bias::Left), 5);
    assert_eq!(cs.map_pos(9, Bias::Left), 8);
}

#[test]
fn test_changed_ranges() {
    let cs = ChangeSet::from_changes(
        10,
        [Change::insert(0, "ab"), Change::delete(4..6), Change::new(8..9, "q")],
    );
    assert_eq!(cs.changed_ranges(), vec![0..2, 6..6, 8..9]);
    assert!(ChangeSet::identity(10).changed_ranges().is_empty());
}

#[test]
fn test_compose_sequential_edits() {
    let mut expected = Rope::from("the cat");
    let first = ChangeSet::from_changes(7, [Change::new(4..7, "dog")]);
    first.apply(&mut expected);
    let second = ChangeSet::from_changes(7, [Change::insert(7, "s"), Change::delete(0..4)]);
    second.apply(&mut expected);

    let mut doc = Rope::from("the cat");
    first.compose(second).apply(&mut doc);
    assert_eq!(doc, expected);
    assert_eq!(doc.to_string(), "dogs");
}

#[test]
fn test_identity_and_noop() {
    let tx = Transaction::identity(3);
    assert!(tx.is_noop());
    assert!(!tx.changes_text());

    let entity = Arc::new(Entity::new("Q1", "Place", "Rome"));
    let tx = tx.register(Span::new(0, 3), entity);
    assert!(!tx.is_noop());
    assert_eq!(tx.registrations().count(), 1);
}

#[test]
fn test_transaction_compose_maps_registrations() {
    let entity = Arc::new(Entity::new("Q1", "Place", "Rome"));
    let first = Transaction::replace(2, 0..2, "Rome")
        .register(Span::new(0, 4), entity)
        .with_cursor(4);
    let second = Transaction::insert(4, 0, ">> ");
    let tx = first.compose(second);

    assert_eq!(tx.changes().len(), 2);
    assert_eq!(tx.changes().len_after(), 7);
    assert_eq!(tx.cursor(), Some(7));
    match &tx.effects()[0] {
        Effect::Register(reg) => assert_eq!(reg.span, Span::new(3, 7)),
        Effect::Restore(_) => panic!("expected a registration"),
    }
}

fn change_strategy(len: usize) -> impl Strategy<Value = Change> {
    (0..=len, 0usize..5, "[a-z]{0,3}")
        .prop_map(move |(start, del, text)| Change::new(start..(start + del).min(len), text))
}

proptest! {
    #[test]
    fn prop_compose_matches_sequential_apply(
        a in change_strategy(12),
        b in change_strategy(10),
    ) {
        let base = Rope::from("abcdefghijkl");
        let first = ChangeSet::from_changes(12, [a]);
        let mut mid = base.clone();
        first.apply(&mut mid);

        let len = mid.len_chars();
        let b = Change::new(b.start.min(len)..b.end.min(len), b.text);
        let second = ChangeSet::from_changes(len, [b]);
        let mut expected = mid.clone();
        second.apply(&mut expected);

        let mut doc = base.clone();
        first.compose(second).apply(&mut doc);
        prop_assert_eq!(doc, expected);
    }

    #[test]
    fn prop_invert_round_trips(change in change_strategy(12)) {
        let base = Rope::from("abcdefghijkl");
        let cs = ChangeSet::from_changes(12, [change]);
        let inverse = cs.invert(&base);
        let mut doc = base.clone();
        cs.apply(&mut doc);
        inverse.apply(&mut doc);
        prop_assert_eq!(doc, base);
    }

    #[test]
    fn prop_map_pos_is_monotonic(change in change_strategy(12), a in 0usize..=12, b in 0usize..=12) {
        let cs = ChangeSet::from_changes(12, [change]);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(cs.map_pos(lo, Bias::Left) <= cs.map_pos(hi, Bias::Left));
        prop_assert!(cs.map_pos(lo, Bias::Right) <= cs.map_pos(hi, Bias::Right));
        prop_assert!(cs.map_pos(lo, Bias::Left) <= cs.map_pos(lo, Bias::Right));
        prop_assert!(cs.map_pos(hi, Bias::Right) <= cs.len_after());
    }
}
