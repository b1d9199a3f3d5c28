use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::history::HistorySnapshot;
use crate::model::{
    self, Connector, ConnectorId, ConnectorKind, Rgba, Shape, ShapeId, ShapeKind, TextStyle,
};
use crate::snap::Grid;

/// New shapes land somewhere in `[SPAWN_ORIGIN, SPAWN_ORIGIN + SPAWN_SPREAD)` on each axis.
pub const SPAWN_ORIGIN: f32 = 100.0;
pub const SPAWN_SPREAD: f32 = 200.0;
pub const DUPLICATE_OFFSET: f32 = 30.0;

/// At most one entity is selected, and it is either a shape or a connector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Nothing,
    Shape(ShapeId),
    Connector(ConnectorId),
}

impl Selection {
    pub fn shape(&self) -> Option<&ShapeId> {
        match self {
            Selection::Shape(id) => Some(id),
            _ => None,
        }
    }

    pub fn connector(&self) -> Option<&ConnectorId> {
        match self {
            Selection::Connector(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Nothing)
    }
}

/// Partial update of a shape. Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub color: Option<Rgba>,
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub text_color: Option<Rgba>,
}

impl ShapeUpdate {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Pins a coordinate into `[0, MAX_COORD]`. NaN becomes 0.
fn clamp_coord(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, model::MAX_COORD)
}

/// Pins a side length into `[MIN_SHAPE_SIZE, MAX_SHAPE_SIZE]`. NaN becomes the minimum.
fn clamp_size(v: f32) -> f32 {
    if v.is_nan() {
        return model::MIN_SHAPE_SIZE;
    }
    v.clamp(model::MIN_SHAPE_SIZE, model::MAX_SHAPE_SIZE)
}

/// Canonical shapes and connectors, plus the current selection.
///
/// Every mutation keeps the invariants of the data model: shapes are at least
/// [`model::MIN_SHAPE_SIZE`] on each side and never at negative coordinates, and no
/// connector outlives either of its endpoints.
pub struct EntityStore {
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
    selection: Selection,
    grid: Grid,
    rng: StdRng,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Store with a deterministic spawn position sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            shapes: Vec::new(),
            connectors: Vec::new(),
            selection: Selection::Nothing,
            grid: Grid::default(),
            rng,
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| &s.id == id)
    }

    pub fn connector(&self, id: &ConnectorId) -> Option<&Connector> {
        self.connectors.iter().find(|c| &c.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_shape(&self) -> Option<&Shape> {
        self.selection.shape().and_then(|id| self.shape(id))
    }

    /// Selects `selection`, falling back to nothing when it names a missing entity.
    pub fn select(&mut self, selection: Selection) {
        let exists = match &selection {
            Selection::Nothing => true,
            Selection::Shape(id) => self.shape(id).is_some(),
            Selection::Connector(id) => self.connector(id).is_some(),
        };
        self.selection = if exists {
            selection
        } else {
            Selection::Nothing
        };
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn set_snap(&mut self, snap: bool) {
        self.grid.snap = snap;
    }

    pub fn add_shape(&mut self, kind: ShapeKind) -> Shape {
        let (width, height) = kind.default_size();
        let x = SPAWN_ORIGIN + self.rng.random_range(0.0..SPAWN_SPREAD);
        let y = SPAWN_ORIGIN + self.rng.random_range(0.0..SPAWN_SPREAD);
        let shape = Shape {
            id: ShapeId::generate(),
            kind,
            x: self.grid.snap(x),
            y: self.grid.snap(y),
            width,
            height,
            color: model::DEFAULT_SHAPE_COLOR,
            text: String::new(),
            text_style: TextStyle::default(),
        };
        debug!(id = %shape.id, ?kind, x = shape.x, y = shape.y, "shape added");
        self.shapes.push(shape.clone());
        self.selection = Selection::Shape(shape.id.clone());
        shape
    }

    pub fn duplicate_shape(&mut self, id: &ShapeId) -> Option<Shape> {
        let source = self.shape(id)?;
        let copy = Shape {
            id: ShapeId::generate(),
            x: self.grid.snap(source.x + DUPLICATE_OFFSET),
            y: self.grid.snap(source.y + DUPLICATE_OFFSET),
            ..source.clone()
        };
        debug!(source = %id, id = %copy.id, "shape duplicated");
        self.shapes.push(copy.clone());
        self.selection = Selection::Shape(copy.id.clone());
        Some(copy)
    }

    /// Applies the supplied fields. Returns `false` when the shape does not exist.
    pub fn update_shape(&mut self, id: &ShapeId, update: ShapeUpdate) -> bool {
        let grid = self.grid;
        let Some(shape) = self.shapes.iter_mut().find(|s| &s.id == id) else {
            debug!(%id, "update of missing shape ignored");
            return false;
        };
        if let Some(x) = update.x {
            shape.x = grid.snap(clamp_coord(x));
        }
        if let Some(y) = update.y {
            shape.y = grid.snap(clamp_coord(y));
        }
        if let Some(width) = update.width {
            shape.width = clamp_size(width);
        }
        if let Some(height) = update.height {
            shape.height = clamp_size(height);
        }
        if let Some(color) = update.color {
            shape.color = color;
        }
        if let Some(text) = update.text {
            shape.text = text;
        }
        if let Some(family) = update.font_family {
            shape.text_style.font_family = family;
        }
        if let Some(size) = update.font_size {
            shape.text_style.font_size = model::clamp_font_size(size);
        }
        if let Some(color) = update.text_color {
            shape.text_style.color = color;
        }
        true
    }

    /// Removes the shape and every connector attached to it.
    pub fn delete_shape(&mut self, id: &ShapeId) -> bool {
        let before = self.shapes.len();
        self.shapes.retain(|s| &s.id != id);
        if self.shapes.len() == before {
            debug!(%id, "delete of missing shape ignored");
            return false;
        }
        let connectors_before = self.connectors.len();
        self.connectors.retain(|c| !c.references(id));
        debug!(
            %id,
            cascaded = connectors_before - self.connectors.len(),
            "shape deleted"
        );
        self.drop_stale_selection();
        true
    }

    /// Connects two distinct, existing shapes.
    pub fn add_connector(
        &mut self,
        from: &ShapeId,
        to: &ShapeId,
        kind: ConnectorKind,
    ) -> Option<Connector> {
        if from == to {
            debug!(%from, "self-connector rejected");
            return None;
        }
        if self.shape(from).is_none() || self.shape(to).is_none() {
            debug!(%from, %to, "connector to missing shape rejected");
            return None;
        }
        let connector = Connector {
            id: ConnectorId::generate(),
            kind,
            from_shape_id: from.clone(),
            to_shape_id: to.clone(),
            color: model::DEFAULT_CONNECTOR_COLOR,
        };
        debug!(id = %connector.id, %from, %to, ?kind, "connector added");
        self.connectors.push(connector.clone());
        Some(connector)
    }

    pub fn delete_connector(&mut self, id: &ConnectorId) -> bool {
        let before = self.connectors.len();
        self.connectors.retain(|c| &c.id != id);
        if self.connectors.len() == before {
            debug!(%id, "delete of missing connector ignored");
            return false;
        }
        debug!(%id, "connector deleted");
        self.drop_stale_selection();
        true
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::new(self.shapes.clone(), self.connectors.clone())
    }

    /// Installs a snapshot as live state. The selection survives if its entity still exists.
    pub fn restore(&mut self, snapshot: &HistorySnapshot) {
        self.shapes = snapshot.shapes().to_vec();
        self.connectors = snapshot.connectors().to_vec();
        self.drop_stale_selection();
    }

    /// Replaces all entities with externally supplied ones, repairing anything that breaks
    /// the store invariants.
    pub fn replace(&mut self, shapes: Vec<Shape>, connectors: Vec<Connector>) {
        self.shapes = shapes
            .into_iter()
            .map(|mut s| {
                s.x = clamp_coord(s.x);
                s.y = clamp_coord(s.y);
                s.width = clamp_size(s.width);
                s.height = clamp_size(s.height);
                s.text_style.font_size = model::clamp_font_size(s.text_style.font_size);
                s
            })
            .collect();
        let total = connectors.len();
        self.connectors = connectors
            .into_iter()
            .filter(|c| {
                c.from_shape_id != c.to_shape_id
                    && self.shape(&c.from_shape_id).is_some()
                    && self.shape(&c.to_shape_id).is_some()
            })
            .collect();
        if self.connectors.len() != total {
            warn!(
                dropped = total - self.connectors.len(),
                "dropped connectors with missing or identical endpoints"
            );
        }
        self.selection = Selection::Nothing;
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.connectors.clear();
        self.selection = Selection::Nothing;
    }

    fn drop_stale_selection(&mut self) {
        let stale = match &self.selection {
            Selection::Nothing => false,
            Selection::Shape(id) => self.shape(id).is_none(),
            Selection::Connector(id) => self.connector(id).is_none(),
        };
        if stale {
            self.selection = Selection::Nothing;
        }
    }
}
