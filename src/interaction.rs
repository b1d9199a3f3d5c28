use tracing::debug;

use crate::model::{
    self, ConnectorId, ConnectorKind, ConnectorPath, Point, Rect, Shape, ShapeId,
};
use crate::store::{EntityStore, Selection, ShapeUpdate};

/// Side of the square grip at a selected shape's bottom-right corner.
pub const RESIZE_HANDLE_SIZE: f32 = 12.0;
/// How close (in diagram units) a click must be to a connector to pick it.
pub const CONNECTOR_HIT_TOLERANCE: f32 = 6.0;

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.25;

pub const HINT_PICK_SOURCE: &str = "Click on the source shape to start connecting";
pub const HINT_PICK_TARGET: &str = "Click on the destination shape";

/// Viewport scale factor, kept within `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom(f32);

impl Default for Zoom {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Zoom {
    pub fn new(factor: f32) -> Self {
        if factor.is_nan() {
            return Self::default();
        }
        Self(factor.clamp(MIN_ZOOM, MAX_ZOOM))
    }

    pub fn factor(self) -> f32 {
        self.0
    }

    pub fn zoomed_in(self) -> Self {
        Self::new(self.0 + ZOOM_STEP)
    }

    pub fn zoomed_out(self) -> Self {
        Self::new(self.0 - ZOOM_STEP)
    }

    pub fn can_zoom_in(self) -> bool {
        self.0 < MAX_ZOOM
    }

    pub fn can_zoom_out(self) -> bool {
        self.0 > MIN_ZOOM
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    pub fn to_diagram(self, viewport: Point) -> Point {
        Point::new(viewport.x / self.0, viewport.y / self.0)
    }

    pub fn to_viewport(self, diagram: Point) -> Point {
        Point::new(diagram.x * self.0, diagram.y * self.0)
    }
}

pub fn resize_handle(shape: &Shape) -> Rect {
    let corner = shape.bounds().max;
    Rect::from_center_size(corner, RESIZE_HANDLE_SIZE)
}

/// What lies under a diagram-space point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Hit {
    ResizeHandle(ShapeId),
    Shape(ShapeId),
    Connector(ConnectorId),
    Canvas,
}

/// Shapes paint above connectors, and later shapes above earlier ones; the resize grip of
/// the selected shape sits above everything.
pub fn hit_test(store: &EntityStore, p: Point) -> Hit {
    if let Some(shape) = store.selected_shape() {
        if resize_handle(shape).contains(p) {
            return Hit::ResizeHandle(shape.id.clone());
        }
    }
    if let Some(shape) = store.shapes().iter().rev().find(|s| s.bounds().contains(p)) {
        return Hit::Shape(shape.id.clone());
    }
    for connector in store.connectors().iter().rev() {
        let (Some(from), Some(to)) = (
            store.shape(&connector.from_shape_id),
            store.shape(&connector.to_shape_id),
        ) else {
            continue;
        };
        let path = ConnectorPath::between(from, to, connector.kind);
        if model::distance_to_segment(p, path.start, path.end) <= CONNECTOR_HIT_TOLERANCE {
            return Hit::Connector(connector.id.clone());
        }
    }
    Hit::Canvas
}

/// The active pointer session. Exactly one mode is active at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Mode {
    #[default]
    Idle,
    Dragging {
        shape_id: ShapeId,
        /// Pointer position relative to the shape origin when the drag began.
        offset: Point,
        moved: bool,
    },
    Resizing {
        shape_id: ShapeId,
        resized: bool,
    },
    Connecting {
        pending_from: Option<ShapeId>,
    },
}

/// What an event did to the diagram, so the owner knows whether to record history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Ignored,
    /// Selection or mode changed; shapes and connectors did not.
    Selection,
    /// Live state changed mid-gesture; the gesture commits when it ends.
    Preview,
    Commit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    Undo,
    Redo,
    Duplicate,
    Delete,
}

/// Turns pointer events into store mutations.
#[derive(Debug, Default)]
pub struct InteractionController {
    mode: Mode,
    zoom: Zoom,
    connector_kind: ConnectorKind,
}

impl InteractionController {
    pub fn new(connector_kind: ConnectorKind) -> Self {
        Self {
            connector_kind,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: Zoom) {
        self.zoom = zoom;
    }

    pub fn connector_kind(&self) -> ConnectorKind {
        self.connector_kind
    }

    pub fn set_connector_kind(&mut self, kind: ConnectorKind) {
        self.connector_kind = kind;
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.mode, Mode::Connecting { .. })
    }

    pub fn pending_from(&self) -> Option<&ShapeId> {
        match &self.mode {
            Mode::Connecting { pending_from } => pending_from.as_ref(),
            _ => None,
        }
    }

    pub fn connect_hint(&self) -> Option<&'static str> {
        match &self.mode {
            Mode::Connecting { pending_from: None } => Some(HINT_PICK_SOURCE),
            Mode::Connecting { pending_from: Some(_) } => Some(HINT_PICK_TARGET),
            _ => None,
        }
    }

    /// Enters connect mode, or leaves it without creating anything.
    pub fn toggle_connect(&mut self, store: &EntityStore) -> Outcome {
        let ended = self.end_gesture(store);
        self.mode = if self.is_connecting() {
            debug!("connect mode off");
            Mode::Idle
        } else {
            debug!("connect mode on");
            Mode::Connecting { pending_from: None }
        };
        ended.max(Outcome::Selection)
    }

    /// Ends a drag or resize. Returns `Commit` if the gesture changed a shape that still exists.
    pub fn end_gesture(&mut self, store: &EntityStore) -> Outcome {
        let changed = match &self.mode {
            Mode::Dragging {
                shape_id, moved, ..
            } => *moved && store.shape(shape_id).is_some(),
            Mode::Resizing { shape_id, resized } => *resized && store.shape(shape_id).is_some(),
            Mode::Idle | Mode::Connecting { .. } => return Outcome::Ignored,
        };
        self.mode = Mode::Idle;
        if changed {
            Outcome::Commit
        } else {
            Outcome::Ignored
        }
    }

    /// Drops any active mode, including connect mode.
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
    }

    pub fn pointer_down(&mut self, store: &mut EntityStore, viewport: Point) -> Outcome {
        let ended = self.end_gesture(store);
        let p = self.zoom.to_diagram(viewport);
        let hit = hit_test(store, p);

        if let Mode::Connecting { pending_from } = &mut self.mode {
            let clicked = match hit {
                Hit::Shape(id) | Hit::ResizeHandle(id) => id,
                Hit::Connector(_) | Hit::Canvas => {
                    store.select(Selection::Nothing);
                    return ended.max(Outcome::Selection);
                }
            };
            let Some(from) = pending_from.take() else {
                debug!(from = %clicked, "connect source picked");
                *pending_from = Some(clicked);
                return ended.max(Outcome::Selection);
            };
            if from == clicked {
                *pending_from = Some(from);
                return ended;
            }
            return match store.add_connector(&from, &clicked, self.connector_kind) {
                Some(_) => {
                    self.mode = Mode::Idle;
                    Outcome::Commit
                }
                None => {
                    // the source vanished since it was picked; start over from this shape
                    *pending_from = Some(clicked);
                    ended.max(Outcome::Selection)
                }
            };
        }

        let outcome = match hit {
            Hit::ResizeHandle(shape_id) => {
                store.select(Selection::Shape(shape_id.clone()));
                self.mode = Mode::Resizing {
                    shape_id,
                    resized: false,
                };
                Outcome::Selection
            }
            Hit::Shape(shape_id) => {
                let Some(shape) = store.shape(&shape_id) else {
                    return ended;
                };
                let offset = p.sub(shape.position());
                store.select(Selection::Shape(shape_id.clone()));
                self.mode = Mode::Dragging {
                    shape_id,
                    offset,
                    moved: false,
                };
                Outcome::Selection
            }
            Hit::Connector(id) => {
                store.select(Selection::Connector(id));
                Outcome::Selection
            }
            Hit::Canvas => {
                if store.selection().is_empty() {
                    Outcome::Ignored
                } else {
                    store.select(Selection::Nothing);
                    Outcome::Selection
                }
            }
        };
        ended.max(outcome)
    }

    pub fn pointer_move(&mut self, store: &mut EntityStore, viewport: Point) -> Outcome {
        let p = self.zoom.to_diagram(viewport);
        match &mut self.mode {
            Mode::Dragging {
                shape_id,
                offset,
                moved,
            } => {
                let Some(before) = store.shape(shape_id).map(|s| s.position()) else {
                    self.mode = Mode::Idle;
                    return Outcome::Ignored;
                };
                let target = p.sub(*offset);
                store.update_shape(shape_id, ShapeUpdate::position(target.x, target.y));
                let after = store.shape(shape_id).map(|s| s.position());
                if after == Some(before) {
                    return Outcome::Ignored;
                }
                *moved = true;
                Outcome::Preview
            }
            Mode::Resizing { shape_id, resized } => {
                let Some(shape) = store.shape(shape_id) else {
                    self.mode = Mode::Idle;
                    return Outcome::Ignored;
                };
                let before = (shape.width, shape.height);
                let (width, height) = (p.x - shape.x, p.y - shape.y);
                store.update_shape(shape_id, ShapeUpdate::size(width, height));
                let after = store.shape(shape_id).map(|s| (s.width, s.height));
                if after == Some(before) {
                    return Outcome::Ignored;
                }
                *resized = true;
                Outcome::Preview
            }
            Mode::Idle | Mode::Connecting { .. } => Outcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, store: &EntityStore) -> Outcome {
        self.end_gesture(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShapeKind;

    fn setup() -> (EntityStore, InteractionController) {
        let mut store = EntityStore::with_seed(3);
        store.set_snap(false);
        (store, InteractionController::default())
    }

    fn place(store: &mut EntityStore, kind: ShapeKind, x: f32, y: f32) -> ShapeId {
        let id = store.add_shape(kind).id;
        store.update_shape(&id, ShapeUpdate::position(x, y));
        id
    }

    #[test]
    fn zoom_steps_and_clamps() {
        let mut zoom = Zoom::default();
        for _ in 0..10 {
            zoom = zoom.zoomed_in();
        }
        assert_eq!(zoom.factor(), MAX_ZOOM);
        assert!(!zoom.can_zoom_in());
        for _ in 0..10 {
            zoom = zoom.zoomed_out();
        }
        assert_eq!(zoom.factor(), MIN_ZOOM);
        assert_eq!(zoom.percent(), 25);
        assert_eq!(Zoom::new(f32::NAN), Zoom::default());
    }

    #[test]
    fn hit_test_prefers_topmost_shape_then_connectors() {
        let (mut store, _) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        let b = place(&mut store, ShapeKind::Rectangle, 60.0, 0.0);
        let far = place(&mut store, ShapeKind::Rectangle, 400.0, 0.0);
        let conn = store.add_connector(&a, &far, ConnectorKind::Line).unwrap();
        store.select(Selection::Nothing);

        assert_eq!(hit_test(&store, Point::new(100.0, 10.0)), Hit::Shape(b));
        assert_eq!(hit_test(&store, Point::new(10.0, 10.0)), Hit::Shape(a));
        assert_eq!(hit_test(&store, Point::new(300.0, 42.0)), Hit::Connector(conn.id));
        assert_eq!(hit_test(&store, Point::new(300.0, 300.0)), Hit::Canvas);
    }

    #[test]
    fn resize_handle_only_on_selected_shape() {
        let (mut store, _) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        let corner = Point::new(123.0, 83.0);
        assert_eq!(hit_test(&store, corner), Hit::ResizeHandle(a.clone()));
        store.select(Selection::Nothing);
        assert_eq!(hit_test(&store, corner), Hit::Canvas);
    }

    #[test]
    fn drag_moves_by_pointer_minus_offset_in_diagram_space() {
        let (mut store, mut ctl) = setup();
        let id = place(&mut store, ShapeKind::Rectangle, 100.0, 100.0);
        ctl.set_zoom(Zoom::new(2.0));

        // viewport (220, 220) is diagram (110, 110): offset (10, 10)
        assert_eq!(ctl.pointer_down(&mut store, Point::new(220.0, 220.0)), Outcome::Selection);
        assert!(matches!(ctl.mode(), Mode::Dragging { .. }));
        assert_eq!(ctl.pointer_move(&mut store, Point::new(420.0, 320.0)), Outcome::Preview);
        assert_eq!(store.shape(&id).unwrap().position(), Point::new(200.0, 150.0));

        // dragging past the origin clamps to zero
        ctl.pointer_move(&mut store, Point::new(0.0, 0.0));
        assert_eq!(store.shape(&id).unwrap().position(), Point::ZERO);

        assert_eq!(ctl.pointer_up(&store), Outcome::Commit);
        assert_eq!(ctl.mode(), &Mode::Idle);
    }

    #[test]
    fn click_without_motion_commits_nothing() {
        let (mut store, mut ctl) = setup();
        place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.pointer_down(&mut store, Point::new(20.0, 20.0));
        assert_eq!(ctl.pointer_up(&store), Outcome::Ignored);
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let (mut store, mut ctl) = setup();
        let id = place(&mut store, ShapeKind::Rectangle, 100.0, 100.0);
        assert_eq!(ctl.pointer_down(&mut store, Point::new(220.0, 180.0)), Outcome::Selection);
        assert!(matches!(ctl.mode(), Mode::Resizing { .. }));

        ctl.pointer_move(&mut store, Point::new(300.0, 260.0));
        let s = store.shape(&id).unwrap();
        assert_eq!((s.width, s.height), (200.0, 160.0));

        ctl.pointer_move(&mut store, Point::new(90.0, 120.0));
        let s = store.shape(&id).unwrap();
        assert_eq!((s.width, s.height), (50.0, 50.0));
        assert_eq!(ctl.pointer_up(&store), Outcome::Commit);
    }

    #[test]
    fn clicking_selects_and_empty_canvas_clears() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        let b = place(&mut store, ShapeKind::Rectangle, 400.0, 0.0);
        let conn = store.add_connector(&a, &b, ConnectorKind::Arrow).unwrap();

        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        ctl.pointer_up(&store);
        assert_eq!(store.selection(), &Selection::Shape(a));

        ctl.pointer_down(&mut store, Point::new(260.0, 40.0));
        assert_eq!(store.selection(), &Selection::Connector(conn.id));

        assert_eq!(ctl.pointer_down(&mut store, Point::new(260.0, 400.0)), Outcome::Selection);
        assert!(store.selection().is_empty());
        assert_eq!(ctl.pointer_down(&mut store, Point::new(260.0, 400.0)), Outcome::Ignored);
    }

    #[test]
    fn connect_mode_creates_one_connector_then_exits() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        let b = place(&mut store, ShapeKind::Circle, 300.0, 0.0);
        ctl.set_connector_kind(ConnectorKind::Dashed);

        ctl.toggle_connect(&store);
        assert_eq!(ctl.connect_hint(), Some(HINT_PICK_SOURCE));
        assert_eq!(ctl.pointer_down(&mut store, Point::new(10.0, 10.0)), Outcome::Selection);
        assert_eq!(ctl.pending_from(), Some(&a));
        assert_eq!(ctl.connect_hint(), Some(HINT_PICK_TARGET));

        assert_eq!(ctl.pointer_down(&mut store, Point::new(310.0, 10.0)), Outcome::Commit);
        assert!(!ctl.is_connecting());
        let conn = &store.connectors()[0];
        assert_eq!((&conn.from_shape_id, &conn.to_shape_id), (&a, &b));
        assert_eq!(conn.kind, ConnectorKind::Dashed);
    }

    #[test]
    fn connect_mode_ignores_second_click_on_same_shape() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.toggle_connect(&store);
        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        assert_eq!(ctl.pointer_down(&mut store, Point::new(20.0, 20.0)), Outcome::Ignored);
        assert!(store.connectors().is_empty());
        assert!(ctl.is_connecting());
        assert_eq!(ctl.pending_from(), Some(&a));
    }

    #[test]
    fn toggling_connect_off_discards_pending_source() {
        let (mut store, mut ctl) = setup();
        place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.toggle_connect(&store);
        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        ctl.toggle_connect(&store);
        assert_eq!(ctl.mode(), &Mode::Idle);
        ctl.toggle_connect(&store);
        assert_eq!(ctl.pending_from(), None);
        assert!(store.connectors().is_empty());
    }

    #[test]
    fn connect_mode_does_not_start_drags() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.toggle_connect(&store);
        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        assert_eq!(ctl.pointer_move(&mut store, Point::new(200.0, 200.0)), Outcome::Ignored);
        assert_eq!(store.shape(&a).unwrap().position(), Point::ZERO);
    }

    #[test]
    fn drag_of_deleted_shape_is_dropped() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        store.delete_shape(&a);
        assert_eq!(ctl.pointer_move(&mut store, Point::new(50.0, 50.0)), Outcome::Ignored);
        assert_eq!(ctl.mode(), &Mode::Idle);
        assert_eq!(ctl.pointer_up(&store), Outcome::Ignored);
    }

    #[test]
    fn release_after_deleting_the_dragged_shape_commits_nothing() {
        let (mut store, mut ctl) = setup();
        let a = place(&mut store, ShapeKind::Rectangle, 0.0, 0.0);
        ctl.pointer_down(&mut store, Point::new(10.0, 10.0));
        assert_eq!(ctl.pointer_move(&mut store, Point::new(90.0, 90.0)), Outcome::Preview);
        store.delete_shape(&a);
        assert_eq!(ctl.pointer_up(&store), Outcome::Ignored);
        assert_eq!(ctl.mode(), &Mode::Idle);
    }

    #[test]
    fn resize_past_the_minimum_twice_previews_once() {
        let (mut store, mut ctl) = setup();
        place(&mut store, ShapeKind::Rectangle, 100.0, 100.0);
        ctl.pointer_down(&mut store, Point::new(220.0, 180.0));
        assert_eq!(ctl.pointer_move(&mut store, Point::new(110.0, 110.0)), Outcome::Preview);
        assert_eq!(ctl.pointer_move(&mut store, Point::new(105.0, 105.0)), Outcome::Ignored);
    }
}
