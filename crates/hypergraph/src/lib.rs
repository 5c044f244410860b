// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editor engine.
//!
//! `hypergraph` provides the pieces of an interactive node-graph editor:
//! - An element model of nodes, items, connectors and connections
//! - A [`GraphModel`] that owns the graph, checks connection legality and
//!   keeps a revision index
//! - Layout of rectangular, circular and collapsed nodes and sub-graph boxes
//! - Tapered Bezier routing of connections for painting and hit-testing
//! - A [`GraphController`] that turns pointer and keyboard input into model
//!   edits, selections and transient render states
//! - A [`GraphView`] egui widget tying it all together
//!
//! ## Architecture
//!
//! Input flows from the view into the controller, which hit-tests against
//! the current layout, runs its command-mode state machine and mutates the
//! model. Model mutations bump the revision; every frame re-runs layout and
//! paints from the laid-out geometry. Observers registered on the model or
//! the selection may veto changes.

pub mod compatibility;
pub mod connection;
pub mod connector;
pub mod constants;
pub mod control;
pub mod element;
pub mod events;
pub mod geometry;
pub mod item;
pub mod items;
pub mod layout;
pub mod model;
pub mod node;
pub mod render;
pub mod routing;
pub mod selection;
pub mod settings;
pub mod state;
pub mod ui;

pub use compatibility::{AlwaysCompatible, CompatibilityStrategy, TagCompatibility};
pub use connection::{ConnectionId, NodeConnection};
pub use connector::{ConnectionType, ConnectorDirection, ConnectorRef, NodeConnector};
pub use control::{CommandMode, ControlEvent, DragPreview, GraphController};
pub use element::{Element, ElementType, NodeSelection};
pub use events::{GraphObserver, RevisionSequence, Verdict};
pub use geometry::ViewTransform;
pub use item::{
    FixedTextMeasure, ItemDock, ItemId, ItemPaint, ItemRef, ItemSide, ItemWidget, NodeItem,
    TextMeasure,
};
pub use items::{ButtonItem, DropDownItem, LabelItem, TextBoxItem};
pub use layout::perform_layout;
pub use model::{ConnectError, GraphModel};
pub use node::{Node, NodeId, NodeLayout};
pub use routing::{ConnectionPath, RouteStyle};
pub use selection::{GraphSelection, SelectionObserver};
pub use settings::{GraphSettings, SettingsError};
pub use state::{ElementKey, RenderState, RenderStates};
pub use ui::{GraphView, GraphViewResponse};
