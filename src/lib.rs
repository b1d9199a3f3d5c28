//! Core of a process-flow diagram editor: shapes and connectors on a snapping grid, a bounded
//! undo history, pointer-driven editing, persistence and PDF export.
//!
//! The core never touches a UI toolkit; the `flowsketch` binary renders a
//! [`session::DiagramSession`] with egui and forwards pointer and keyboard events to it.

pub mod export;
pub mod history;
pub mod interaction;
pub mod model;
pub mod persist;
pub mod session;
pub mod settings;
pub mod snap;
pub mod store;

pub use history::{History, HistorySnapshot};
pub use interaction::{InteractionController, KeyCommand, Mode, Outcome, Zoom};
pub use model::{Connector, ConnectorKind, Diagram, Point, Rgba, Shape, ShapeKind};
pub use persist::{FileStorage, MemoryStorage, Storage};
pub use session::{DiagramSession, Edit};
pub use store::{EntityStore, Selection, ShapeUpdate};
