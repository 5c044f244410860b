// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layout and rendering constants, all in graph-space units.

use egui::Vec2;

/// Chrome above the first item of an expanded node.
pub const TOP_HEIGHT: f32 = 4.0;
/// Chrome below the last item of an expanded node.
pub const BOTTOM_HEIGHT: f32 = 4.0;
/// Chrome above the title of a collapsed node.
pub const TOP_HEIGHT_COLLAPSED: f32 = 2.0;
/// Chrome below the title of a collapsed node.
pub const BOTTOM_HEIGHT_COLLAPSED: f32 = 2.0;
/// Vertical gap between stacked items.
pub const ITEM_SPACING: f32 = 2.0;
/// Horizontal inset of items inside the node box.
pub const HORIZONTAL_SPACING: f32 = 2.0;
/// Extra width added to the center column for the box border.
pub const NODE_EXTRA_WIDTH: f32 = 2.0 * HORIZONTAL_SPACING;

/// Padding around title text.
pub const TITLE_PADDING: Vec2 = Vec2::new(8.0, 4.0);
/// Padding around item text.
pub const ITEM_PADDING: Vec2 = Vec2::new(6.0, 4.0);
/// Font size of node titles.
pub const TITLE_FONT_SIZE: f32 = 12.0;
/// Font size of item text.
pub const ITEM_FONT_SIZE: f32 = 11.0;
/// Font size of connection labels.
pub const LABEL_FONT_SIZE: f32 = 10.0;

/// Corner radius of node boxes.
pub const CORNER_SIZE: f32 = 4.0;
/// Corner radius of connector boxes.
pub const CONNECTOR_CORNER_SIZE: f32 = 3.0;
/// Fixed width reserved next to a connector's status indicator.
pub const CONNECTOR_STATUS_WIDTH: f32 = 12.0;
/// The status indicator is a square this much smaller than the connector height.
pub const CONNECTOR_STATUS_INSET: f32 = 8.0;
/// Diameter of the connector dots drawn on collapsed nodes.
pub const COLLAPSED_CONNECTOR_SIZE: f32 = 8.0;

/// Side of the square box of a circular node.
pub const CIRCULAR_NODE_SIZE: f32 = 192.0;

/// Border around the members of a sub-graph box.
pub const SUBGRAPH_BORDER: f32 = 16.0;
/// Size of a sub-graph box without members.
pub const SUBGRAPH_DEFAULT_SIZE: Vec2 = Vec2::new(256.0, 192.0);

/// Half thickness of a connection at rest.
pub const CONNECTION_WIDTH: f32 = 3.0;
/// Half thickness of a hovered, dragged or focused connection.
pub const CONNECTION_WIDTH_HIGHLIGHT: f32 = 4.0;
/// Extra half thickness used when hit-testing connections.
pub const CONNECTION_HIT_MARGIN: f32 = 5.0;
/// Minimum horizontal offset of the Bezier control points.
pub const CONTROL_POINT_MIN_OFFSET: f32 = 30.0;
/// Consecutive path points closer than this are merged.
pub const DUPLICATE_POINT_DISTANCE: f32 = 1.0;
/// Target length of one flattened curve segment.
pub const FLATTEN_STEP: f32 = 12.0;
/// Half height of the arrowhead at the destination.
pub const ARROW_SIZE: f32 = 6.0;
/// Horizontal offset of a binding label from its connector anchor.
pub const LABEL_OFFSET: f32 = 16.0;

/// Pointer travel (screen pixels) that turns a press into a drag.
pub const DRAG_THRESHOLD: f32 = 1.0;
