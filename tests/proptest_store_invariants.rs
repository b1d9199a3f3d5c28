//! Property-based invariant tests for the entity store and undo history.
//!
//! 1. Shapes stay within the size and coordinate bounds, even for infinite input.
//! 2. No connector outlives either endpoint, whatever the edit sequence.
//! 3. Undo followed by redo restores identical shapes and connectors.
//! 4. History never grows past its capacity.

use flowsketch::history::HISTORY_CAPACITY;
use flowsketch::model::{
    ConnectorKind, MAX_COORD, MAX_SHAPE_SIZE, MIN_SHAPE_SIZE, ShapeId, ShapeKind,
};
use flowsketch::persist::MemoryStorage;
use flowsketch::session::DiagramSession;
use flowsketch::store::{EntityStore, ShapeUpdate};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Op {
    Add(usize),
    Duplicate(usize),
    Move(usize, f32, f32),
    Resize(usize, f32, f32),
    Delete(usize),
    Connect(usize, usize, usize),
    DeleteConnector(usize),
    Undo,
    Redo,
}

fn coord() -> impl Strategy<Value = f32> {
    prop_oneof![
        -500.0f32..2000.0,
        Just(f32::NAN),
        Just(-0.0f32),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5).prop_map(Op::Add),
        any::<usize>().prop_map(Op::Duplicate),
        (any::<usize>(), coord(), coord()).prop_map(|(i, x, y)| Op::Move(i, x, y)),
        (any::<usize>(), coord(), coord()).prop_map(|(i, w, h)| Op::Resize(i, w, h)),
        any::<usize>().prop_map(Op::Delete),
        (any::<usize>(), any::<usize>(), 0usize..4).prop_map(|(a, b, k)| Op::Connect(a, b, k)),
        any::<usize>().prop_map(Op::DeleteConnector),
        Just(Op::Undo),
        Just(Op::Redo),
    ]
}

fn session(snap: bool) -> DiagramSession {
    let mut s =
        DiagramSession::with_store(EntityStore::with_seed(7), Box::new(MemoryStorage::new()));
    s.set_snap(snap);
    s
}

fn pick(s: &DiagramSession, i: usize) -> Option<ShapeId> {
    let shapes = s.shapes();
    (!shapes.is_empty()).then(|| shapes[i % shapes.len()].id.clone())
}

fn apply(s: &mut DiagramSession, op: &Op) {
    match op {
        Op::Add(k) => {
            s.add_shape(ShapeKind::ALL[*k]);
        }
        Op::Duplicate(i) => {
            if let Some(id) = pick(s, *i) {
                s.duplicate_shape(&id);
            }
        }
        Op::Move(i, x, y) => {
            if let Some(id) = pick(s, *i) {
                s.update_shape(&id, ShapeUpdate::position(*x, *y));
            }
        }
        Op::Resize(i, w, h) => {
            if let Some(id) = pick(s, *i) {
                s.update_shape(&id, ShapeUpdate::size(*w, *h));
            }
        }
        Op::Delete(i) => {
            if let Some(id) = pick(s, *i) {
                s.delete_shape(&id);
            }
        }
        Op::Connect(a, b, k) => {
            if let (Some(from), Some(to)) = (pick(s, *a), pick(s, *b)) {
                s.add_connector(&from, &to, ConnectorKind::ALL[*k]);
            }
        }
        Op::DeleteConnector(i) => {
            let connectors = s.connectors();
            if !connectors.is_empty() {
                let id = connectors[i % connectors.len()].id.clone();
                s.delete_connector(&id);
            }
        }
        Op::Undo => {
            s.undo();
        }
        Op::Redo => {
            s.redo();
        }
    }
}

fn assert_consistent(s: &DiagramSession) -> Result<(), TestCaseError> {
    for shape in s.shapes() {
        prop_assert!(shape.width >= MIN_SHAPE_SIZE, "width {} too small", shape.width);
        prop_assert!(shape.height >= MIN_SHAPE_SIZE, "height {} too small", shape.height);
        prop_assert!(shape.x >= 0.0, "negative x {}", shape.x);
        prop_assert!(shape.y >= 0.0, "negative y {}", shape.y);
        prop_assert!(shape.width <= MAX_SHAPE_SIZE, "width {} too large", shape.width);
        prop_assert!(shape.height <= MAX_SHAPE_SIZE, "height {} too large", shape.height);
        prop_assert!(shape.x <= MAX_COORD && shape.y <= MAX_COORD);
    }
    for conn in s.connectors() {
        prop_assert!(conn.from_shape_id != conn.to_shape_id);
        prop_assert!(s.store().shape(&conn.from_shape_id).is_some());
        prop_assert!(s.store().shape(&conn.to_shape_id).is_some());
    }
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Shape bounds and referential integrity hold after every step
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_step_leaves_a_consistent_diagram(
        snap in any::<bool>(),
        ops in prop::collection::vec(op_strategy(), 1..80),
    ) {
        let mut s = session(snap);
        for op in &ops {
            apply(&mut s, op);
            assert_consistent(&s)?;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Undo then redo is the identity on live state
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undo_then_redo_restores_live_state(
        ops in prop::collection::vec(op_strategy(), 2..40),
    ) {
        let mut s = session(true);
        for op in &ops {
            apply(&mut s, op);
        }
        prop_assume!(s.can_undo());
        let shapes = s.shapes().to_vec();
        let connectors = s.connectors().to_vec();
        let cursor = s.history().cursor();

        prop_assert!(s.undo());
        prop_assert!(s.redo());
        prop_assert_eq!(s.shapes(), &shapes[..]);
        prop_assert_eq!(s.connectors(), &connectors[..]);
        prop_assert_eq!(s.history().cursor(), cursor);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. History stays bounded
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn history_never_exceeds_capacity(
        ops in prop::collection::vec(op_strategy(), 0..150),
    ) {
        let mut s = session(false);
        for op in &ops {
            apply(&mut s, op);
            prop_assert!(s.history().len() <= HISTORY_CAPACITY);
        }
    }
}
