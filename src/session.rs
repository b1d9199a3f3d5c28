use tracing::{debug, info, warn};

use crate::export::ExportSurface;
use crate::history::{History, HistorySnapshot};
use crate::interaction::{InteractionController, KeyCommand, Outcome, Zoom};
use crate::model::{
    self, Connector, ConnectorId, ConnectorKind, Diagram, Point, Rgba, Shape, ShapeId, ShapeKind,
};
use crate::persist::{STORAGE_KEY, Storage, StorageError};
use crate::store::{EntityStore, Selection, ShapeUpdate};

/// A user-initiated change to the shapes or connectors.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    AddShape(ShapeKind),
    DuplicateShape(ShapeId),
    UpdateShape(ShapeId, ShapeUpdate),
    DeleteShape(ShapeId),
    AddConnector {
        from: ShapeId,
        to: ShapeId,
        kind: ConnectorKind,
    },
    DeleteConnector(ConnectorId),
}

/// What [`DiagramSession::apply_user_edit`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    /// Stale ids or a no-op change. Nothing was recorded.
    Unchanged,
    Changed,
    AddedShape(Shape),
    AddedConnector(Connector),
}

impl Applied {
    pub fn changed(&self) -> bool {
        !matches!(self, Applied::Unchanged)
    }

    pub fn into_shape(self) -> Option<Shape> {
        match self {
            Applied::AddedShape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn into_connector(self) -> Option<Connector> {
        match self {
            Applied::AddedConnector(connector) => Some(connector),
            _ => None,
        }
    }
}

/// One open diagram: entities, undo history, pointer state and the backing store.
///
/// User edits go through [`DiagramSession::apply_user_edit`] and are recorded in history;
/// undo and redo go through [`DiagramSession::apply_replay`], which never records.
pub struct DiagramSession {
    name: String,
    background: Rgba,
    store: EntityStore,
    history: History,
    controller: InteractionController,
    storage: Box<dyn Storage>,
}

impl DiagramSession {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self::with_store(EntityStore::new(), storage)
    }

    pub fn with_store(store: EntityStore, storage: Box<dyn Storage>) -> Self {
        Self {
            name: model::DEFAULT_DIAGRAM_NAME.to_string(),
            background: model::DEFAULT_BACKGROUND,
            store,
            history: History::default(),
            controller: InteractionController::default(),
            storage,
        }
    }

    /// Opens a session on whatever diagram `storage` holds, or an empty one.
    pub fn open(storage: Box<dyn Storage>) -> Self {
        let mut session = Self::new(storage);
        session.restore_persisted();
        session
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn set_background(&mut self, color: Rgba) {
        self.background = color;
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn shapes(&self) -> &[Shape] {
        self.store.shapes()
    }

    pub fn connectors(&self) -> &[Connector] {
        self.store.connectors()
    }

    pub fn selection(&self) -> &Selection {
        self.store.selection()
    }

    pub fn select(&mut self, selection: Selection) {
        self.store.select(selection);
    }

    pub fn snap_enabled(&self) -> bool {
        self.store.grid().snap
    }

    pub fn set_snap(&mut self, snap: bool) {
        self.store.set_snap(snap);
    }

    pub fn zoom(&self) -> Zoom {
        self.controller.zoom()
    }

    pub fn zoom_in(&mut self) {
        let zoom = self.controller.zoom().zoomed_in();
        self.controller.set_zoom(zoom);
    }

    pub fn zoom_out(&mut self) {
        let zoom = self.controller.zoom().zoomed_out();
        self.controller.set_zoom(zoom);
    }

    pub fn connector_kind(&self) -> ConnectorKind {
        self.controller.connector_kind()
    }

    pub fn set_connector_kind(&mut self, kind: ConnectorKind) {
        self.controller.set_connector_kind(kind);
    }

    pub fn diagram(&self) -> Diagram {
        Diagram {
            name: self.name.clone(),
            background_color: self.background,
            shapes: self.store.shapes().to_vec(),
            connectors: self.store.connectors().to_vec(),
        }
    }

    /// Records live state unless it matches the current history entry.
    fn record(&mut self) -> bool {
        let snapshot = self.store.snapshot();
        if self.history.current() == Some(&snapshot) {
            return false;
        }
        self.history.record(snapshot);
        true
    }

    fn record_if(&mut self, outcome: Outcome) -> Outcome {
        if outcome == Outcome::Commit {
            self.record();
        }
        outcome
    }

    /// Applies a user edit and records it. An active drag or resize is ended and recorded
    /// first, so the edit never lands inside a gesture.
    pub fn apply_user_edit(&mut self, edit: Edit) -> Applied {
        let ended = self.controller.end_gesture(&self.store);
        self.record_if(ended);
        let applied = match edit {
            Edit::AddShape(kind) => Applied::AddedShape(self.store.add_shape(kind)),
            Edit::DuplicateShape(id) => self
                .store
                .duplicate_shape(&id)
                .map_or(Applied::Unchanged, Applied::AddedShape),
            Edit::UpdateShape(id, update) => changed(self.store.update_shape(&id, update)),
            Edit::DeleteShape(id) => changed(self.store.delete_shape(&id)),
            Edit::AddConnector { from, to, kind } => self
                .store
                .add_connector(&from, &to, kind)
                .map_or(Applied::Unchanged, Applied::AddedConnector),
            Edit::DeleteConnector(id) => changed(self.store.delete_connector(&id)),
        };
        if applied.changed() && self.record() {
            applied
        } else {
            Applied::Unchanged
        }
    }

    /// Installs a history snapshot as live state without recording it.
    pub fn apply_replay(&mut self, snapshot: &HistorySnapshot) {
        self.store.restore(snapshot);
    }

    pub fn add_shape(&mut self, kind: ShapeKind) -> Option<Shape> {
        self.apply_user_edit(Edit::AddShape(kind)).into_shape()
    }

    pub fn duplicate_shape(&mut self, id: &ShapeId) -> Option<Shape> {
        self.apply_user_edit(Edit::DuplicateShape(id.clone())).into_shape()
    }

    pub fn update_shape(&mut self, id: &ShapeId, update: ShapeUpdate) -> bool {
        self.apply_user_edit(Edit::UpdateShape(id.clone(), update)).changed()
    }

    pub fn delete_shape(&mut self, id: &ShapeId) -> bool {
        self.apply_user_edit(Edit::DeleteShape(id.clone())).changed()
    }

    pub fn add_connector(
        &mut self,
        from: &ShapeId,
        to: &ShapeId,
        kind: ConnectorKind,
    ) -> Option<Connector> {
        self.apply_user_edit(Edit::AddConnector {
            from: from.clone(),
            to: to.clone(),
            kind,
        })
        .into_connector()
    }

    pub fn delete_connector(&mut self, id: &ConnectorId) -> bool {
        self.apply_user_edit(Edit::DeleteConnector(id.clone())).changed()
    }

    /// Deletes whichever entity is selected.
    pub fn delete_selection(&mut self) -> bool {
        match self.store.selection().clone() {
            Selection::Shape(id) => self.delete_shape(&id),
            Selection::Connector(id) => self.delete_connector(&id),
            Selection::Nothing => false,
        }
    }

    pub fn duplicate_selection(&mut self) -> Option<Shape> {
        let id = self.store.selection().shape()?.clone();
        self.duplicate_shape(&id)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let ended = self.controller.end_gesture(&self.store);
        self.record_if(ended);
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        debug!(cursor = ?self.history.cursor(), "undo");
        self.apply_replay(&snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let ended = self.controller.end_gesture(&self.store);
        self.record_if(ended);
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        debug!(cursor = ?self.history.cursor(), "redo");
        self.apply_replay(&snapshot);
        true
    }

    pub fn handle_key(&mut self, command: KeyCommand) -> bool {
        match command {
            KeyCommand::Undo => self.undo(),
            KeyCommand::Redo => self.redo(),
            KeyCommand::Duplicate => self.duplicate_selection().is_some(),
            KeyCommand::Delete => self.delete_selection(),
        }
    }

    pub fn pointer_down(&mut self, viewport: Point) -> Outcome {
        let outcome = self.controller.pointer_down(&mut self.store, viewport);
        self.record_if(outcome)
    }

    pub fn pointer_move(&mut self, viewport: Point) -> Outcome {
        let outcome = self.controller.pointer_move(&mut self.store, viewport);
        self.record_if(outcome)
    }

    pub fn pointer_up(&mut self) -> Outcome {
        let outcome = self.controller.pointer_up(&self.store);
        self.record_if(outcome)
    }

    pub fn toggle_connect(&mut self) -> Outcome {
        let outcome = self.controller.toggle_connect(&self.store);
        self.record_if(outcome)
    }

    /// Replaces the diagram with a serialized one. Anything unreadable falls back to an
    /// empty default diagram.
    pub fn load(&mut self, serialized: &str) {
        let diagram = match serde_json::from_str::<Diagram>(serialized) {
            Ok(diagram) => diagram,
            Err(e) => {
                warn!(error = %e, "failed to load diagram, starting empty");
                Diagram::default()
            }
        };
        self.install(diagram);
    }

    fn install(&mut self, diagram: Diagram) {
        self.name = if diagram.name.is_empty() {
            model::DEFAULT_DIAGRAM_NAME.to_string()
        } else {
            diagram.name
        };
        self.background = diagram.background_color;
        self.store.replace(diagram.shapes, diagram.connectors);
        self.history.clear();
        self.controller.reset();
        info!(
            name = %self.name,
            shapes = self.store.shapes().len(),
            connectors = self.store.connectors().len(),
            "diagram loaded"
        );
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.diagram())
    }

    /// Serializes the diagram and writes it to storage.
    pub fn save(&mut self) -> Result<String, StorageError> {
        let serialized = self.serialize()?;
        self.storage.set(STORAGE_KEY, &serialized)?;
        info!(name = %self.name, "diagram saved");
        Ok(serialized)
    }

    /// Loads the stored diagram, if there is one. Read failures leave the session as is.
    pub fn restore_persisted(&mut self) {
        match self.storage.get(STORAGE_KEY) {
            Ok(Some(serialized)) => self.load(&serialized),
            Ok(None) => debug!("no stored diagram"),
            Err(e) => warn!(error = %e, "failed to read stored diagram"),
        }
    }

    /// Empties the diagram, its history, and the stored record. Name and background stay.
    pub fn clear(&mut self) {
        self.store.clear();
        self.history.clear();
        self.controller.reset();
        if let Err(e) = self.storage.remove(STORAGE_KEY) {
            warn!(error = %e, "failed to remove stored diagram");
        }
        info!("diagram cleared");
    }

    pub fn export_surface(&self) -> ExportSurface {
        ExportSurface::capture(&self.name, self.background, self.shapes(), self.connectors())
    }
}

fn changed(applied: bool) -> Applied {
    if applied {
        Applied::Changed
    } else {
        Applied::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_CAPACITY;
    use crate::persist::MemoryStorage;

    fn session() -> DiagramSession {
        DiagramSession::with_store(EntityStore::with_seed(11), Box::new(MemoryStorage::new()))
    }

    #[test]
    fn every_edit_is_recorded() {
        let mut s = session();
        assert!(s.history().is_empty());
        let a = s.add_shape(ShapeKind::Rectangle).unwrap();
        let b = s.add_shape(ShapeKind::Circle).unwrap();
        s.add_connector(&a.id, &b.id, ConnectorKind::Line).unwrap();
        s.update_shape(&a.id, ShapeUpdate::position(40.0, 40.0));
        assert_eq!(s.history().len(), 4);
        assert!(s.can_undo());
    }

    #[test]
    fn stale_edits_record_nothing() {
        let mut s = session();
        s.add_shape(ShapeKind::Rectangle);
        let ghost = ShapeId::from("ghost");
        assert!(!s.update_shape(&ghost, ShapeUpdate::position(1.0, 1.0)));
        assert!(!s.delete_shape(&ghost));
        assert!(!s.delete_connector(&ConnectorId::from("ghost")));
        assert!(s.duplicate_shape(&ghost).is_none());
        let applied = s.apply_user_edit(Edit::AddConnector {
            from: ghost.clone(),
            to: ghost,
            kind: ConnectorKind::Arrow,
        });
        assert_eq!(applied, Applied::Unchanged);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn undo_then_redo_restores_identical_state() {
        let mut s = session();
        let a = s.add_shape(ShapeKind::Rectangle).unwrap();
        let b = s.add_shape(ShapeKind::Hexagon).unwrap();
        s.add_connector(&a.id, &b.id, ConnectorKind::Arrow);
        let shapes = s.shapes().to_vec();
        let connectors = s.connectors().to_vec();

        assert!(s.undo());
        assert!(s.connectors().is_empty());
        assert!(s.redo());
        assert_eq!(s.shapes(), &shapes[..]);
        assert_eq!(s.connectors(), &connectors[..]);
        // replays are not recorded
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn first_mutation_cannot_be_undone() {
        let mut s = session();
        s.add_shape(ShapeKind::Rectangle);
        assert!(!s.undo());
        assert_eq!(s.shapes().len(), 1);
    }

    #[test]
    fn editing_after_undo_drops_redo() {
        let mut s = session();
        s.add_shape(ShapeKind::Rectangle);
        s.add_shape(ShapeKind::Rectangle);
        s.undo();
        s.add_shape(ShapeKind::Diamond);
        assert!(!s.can_redo());
        assert_eq!(s.shapes().len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let mut s = session();
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        s.set_snap(false);
        for i in 0..(HISTORY_CAPACITY + 20) {
            s.update_shape(&id, ShapeUpdate::position(i as f32, 0.0));
        }
        assert_eq!(s.history().len(), HISTORY_CAPACITY);
        let mut undone = 0;
        while s.undo() {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_CAPACITY - 1);
        // the oldest retained state is the 50th from last
        assert_eq!(s.shapes()[0].x, 20.0);
    }

    #[test]
    fn drag_gesture_records_once_on_release() {
        let mut s = session();
        s.set_snap(false);
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        s.update_shape(&id, ShapeUpdate::position(0.0, 0.0));
        let recorded = s.history().len();

        s.pointer_down(Point::new(10.0, 10.0));
        for step in 1..=5 {
            assert_eq!(s.pointer_move(Point::new(10.0 + step as f32 * 10.0, 10.0)), Outcome::Preview);
        }
        assert_eq!(s.history().len(), recorded);
        assert_eq!(s.pointer_up(), Outcome::Commit);
        assert_eq!(s.history().len(), recorded + 1);

        s.undo();
        assert_eq!(s.shapes()[0].position(), Point::ZERO);
    }

    #[test]
    fn undo_mid_drag_reverts_the_whole_gesture() {
        let mut s = session();
        s.set_snap(false);
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        s.update_shape(&id, ShapeUpdate::position(0.0, 0.0));
        s.pointer_down(Point::new(10.0, 10.0));
        s.pointer_move(Point::new(90.0, 90.0));
        assert!(s.undo());
        assert_eq!(s.shapes()[0].position(), Point::ZERO);
        assert_eq!(s.pointer_up(), Outcome::Ignored);
    }

    #[test]
    fn deleting_the_dragged_shape_keeps_undo_steps_distinct() {
        let mut s = session();
        s.set_snap(false);
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        s.update_shape(&id, ShapeUpdate::position(0.0, 0.0));
        s.pointer_down(Point::new(10.0, 10.0));
        s.pointer_move(Point::new(90.0, 90.0));
        assert!(s.handle_key(KeyCommand::Delete));
        assert!(s.shapes().is_empty());

        let recorded = s.history().len();
        assert_eq!(s.pointer_up(), Outcome::Ignored);
        assert_eq!(s.history().len(), recorded);

        // the first undo brings the shape back where the drag left it
        assert!(s.undo());
        assert_eq!(s.shapes().len(), 1);
        assert_eq!(s.shapes()[0].position(), Point::new(80.0, 80.0));
        assert!(s.undo());
        assert_eq!(s.shapes()[0].position(), Point::ZERO);
    }

    #[test]
    fn edits_that_change_nothing_are_not_recorded() {
        let mut s = session();
        s.set_snap(false);
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        assert!(s.update_shape(&id, ShapeUpdate::position(40.0, 40.0)));
        let recorded = s.history().len();
        assert!(!s.update_shape(&id, ShapeUpdate::position(40.0, 40.0)));
        assert_eq!(s.history().len(), recorded);
        assert!(s.undo());
        assert_ne!(s.shapes()[0].position(), Point::new(40.0, 40.0));
    }

    #[test]
    fn keyboard_commands_act_on_selection() {
        let mut s = session();
        let a = s.add_shape(ShapeKind::Rectangle).unwrap();
        assert!(s.handle_key(KeyCommand::Duplicate));
        assert_eq!(s.shapes().len(), 2);
        assert!(s.handle_key(KeyCommand::Delete));
        assert_eq!(s.shapes().len(), 1);
        assert_eq!(s.shapes()[0].id, a.id);
        assert!(!s.handle_key(KeyCommand::Delete));
        assert!(!s.handle_key(KeyCommand::Duplicate));
        assert!(s.handle_key(KeyCommand::Undo));
        assert_eq!(s.shapes().len(), 2);
        assert!(s.handle_key(KeyCommand::Redo));
        assert_eq!(s.shapes().len(), 1);
    }

    #[test]
    fn save_then_load_restores_the_diagram() {
        let mut s = session();
        s.set_name("Order flow");
        s.set_background(Rgba::rgb(1, 2, 3));
        let a = s.add_shape(ShapeKind::Rectangle).unwrap();
        let b = s.add_shape(ShapeKind::Triangle).unwrap();
        s.add_connector(&a.id, &b.id, ConnectorKind::Dotted);
        let saved = s.save().unwrap();

        let mut other = session();
        other.load(&saved);
        assert_eq!(other.diagram(), s.diagram());
        assert!(other.history().is_empty());
        assert!(other.selection().is_empty());
    }

    #[test]
    fn infinite_input_survives_save_and_load() {
        let mut s = session();
        let id = s.add_shape(ShapeKind::Rectangle).unwrap().id;
        s.update_shape(
            &id,
            ShapeUpdate {
                x: Some(f32::INFINITY),
                width: Some(f32::INFINITY),
                ..ShapeUpdate::default()
            },
        );
        let saved = s.save().unwrap();
        assert!(!saved.contains("null"));

        let mut other = session();
        other.load(&saved);
        assert_eq!(other.shapes().len(), 1);
        assert_eq!(other.shapes()[0].x, model::MAX_COORD);
        assert_eq!(other.shapes()[0].width, model::MAX_SHAPE_SIZE);
        assert_eq!(other.diagram(), s.diagram());
        assert!(other.export_surface().width <= model::MAX_COORD + model::MAX_SHAPE_SIZE + 40.0);
    }

    #[test]
    fn malformed_load_falls_back_to_defaults() {
        let mut s = session();
        s.add_shape(ShapeKind::Rectangle);
        s.set_name("Keep?");
        s.load("{not json");
        assert_eq!(s.diagram(), Diagram::default());

        s.load(r##"{"name":"","backgroundColor":"#000000"}"##);
        assert_eq!(s.name(), model::DEFAULT_DIAGRAM_NAME);
        assert_eq!(s.background(), Rgba::rgb(0, 0, 0));
        assert!(s.shapes().is_empty());
    }

    #[test]
    fn open_reads_the_stored_record() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                STORAGE_KEY,
                r##"{"name":"Stored","backgroundColor":"#ffffff","shapes":[],"connectors":[]}"##,
            )
            .unwrap();
        let s = DiagramSession::open(Box::new(storage));
        assert_eq!(s.name(), "Stored");
        assert_eq!(s.background(), Rgba::rgb(255, 255, 255));
    }

    #[test]
    fn clear_resets_entities_history_and_storage() {
        let mut s = session();
        s.set_name("Named");
        s.add_shape(ShapeKind::Rectangle);
        s.add_shape(ShapeKind::Rectangle);
        s.save().unwrap();
        s.clear();
        assert!(s.shapes().is_empty());
        assert!(s.history().is_empty());
        assert!(!s.can_undo());
        assert!(s.selection().is_empty());
        assert_eq!(s.name(), "Named");

        s.restore_persisted();
        assert!(s.shapes().is_empty());
        assert_eq!(s.name(), "Named");
    }
}
