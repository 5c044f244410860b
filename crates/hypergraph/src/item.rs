// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node items: the positionable slots inside a node.
//!
//! A [`NodeItem`] is the slot the engine lays out and wires up. What the slot
//! shows and how it reacts to the pointer is decided by its [`ItemWidget`].

use crate::connector::{ConnectorDirection, ConnectorRef, NodeConnector};
use crate::geometry::ViewTransform;
use crate::node::NodeId;
use crate::state::RenderState;
use egui::{Align2, Color32, FontId, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    /// Create a new random item ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of an item inside a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Owning node
    pub node: NodeId,
    /// The item
    pub item: ItemId,
}

/// Where a non-connector item sits inside its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemDock {
    /// Above the center items
    Top,
    /// Regular content
    #[default]
    Center,
    /// Below the center items, only shown while the node is hovered
    Bottom,
}

/// Layout column of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSide {
    /// Left of the node box
    Input,
    /// Inside the node box
    Center,
    /// Right of the node box
    Output,
}

/// Text measurement used by layout.
pub trait TextMeasure {
    /// Size of a single line of text at a font size.
    fn measure_text(&self, text: &str, font_size: f32) -> Vec2;
}

/// Monospace-style measurement with fixed glyph metrics.
///
/// Used for headless layout; metrics scale linearly with the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTextMeasure {
    /// Advance of one character, as a fraction of the font size
    pub char_width: f32,
    /// Line height, as a fraction of the font size
    pub line_height: f32,
}

impl Default for FixedTextMeasure {
    fn default() -> Self {
        Self {
            char_width: 0.5,
            line_height: 1.25,
        }
    }
}

impl TextMeasure for FixedTextMeasure {
    fn measure_text(&self, text: &str, font_size: f32) -> Vec2 {
        let chars = text.chars().count() as f32;
        Vec2::new(chars * self.char_width * font_size, self.line_height * font_size)
    }
}

impl TextMeasure for egui::Context {
    fn measure_text(&self, text: &str, font_size: f32) -> Vec2 {
        self.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_owned(), FontId::proportional(font_size), Color32::WHITE)
                .size()
        })
    }
}

/// Default text color of items.
pub const ITEM_TEXT_COLOR: Color32 = Color32::from_rgb(20, 20, 20);

/// Painting context handed to item widgets.
pub struct ItemPaint<'a> {
    /// Painter clipped to the graph view
    pub painter: &'a egui::Painter,
    /// Current view transform
    pub view: &'a ViewTransform,
    /// Render state of the item (or its connector)
    pub state: RenderState,
}

impl ItemPaint<'_> {
    /// Map a graph-space rectangle to the screen.
    pub fn to_screen(&self, rect: Rect) -> Rect {
        self.view.rect_to_screen(rect)
    }

    /// Font scaled by the current zoom.
    pub fn font(&self, size: f32) -> FontId {
        FontId::proportional(size * self.view.zoom())
    }

    /// Draw a line of text anchored at a graph-space point.
    pub fn text(&self, pos: Pos2, anchor: Align2, text: &str, size: f32, color: Color32) {
        self.painter
            .text(self.view.to_screen(pos), anchor, text, self.font(size), color);
    }
}

/// Behavior of one kind of node item.
///
/// Hooks that return `bool` report whether the item consumed the interaction.
pub trait ItemWidget: fmt::Debug + Any {
    /// Preferred size in graph units.
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2;

    /// Draw the item inside the node box.
    fn render(&self, _paint: &ItemPaint<'_>, _bounds: Rect) {}

    /// Draw the item's content inside its connector box.
    fn render_connector(&self, _paint: &ItemPaint<'_>, _bounds: Rect) {}

    /// Single click at a graph-space location.
    fn on_click(&mut self, _location: Pos2) -> bool {
        false
    }

    /// Double click.
    fn on_double_click(&mut self) -> bool {
        false
    }

    /// Start of a drag; returns the location the drag is measured from.
    fn on_start_drag(&mut self, _location: Pos2) -> Option<Pos2> {
        None
    }

    /// Drag to a graph-space location.
    fn on_drag(&mut self, _location: Pos2) -> bool {
        false
    }

    /// End of a drag.
    fn on_end_drag(&mut self) -> bool {
        false
    }

    /// Upcast for inspecting concrete widgets.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for inspecting concrete widgets.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A slot inside a node with an input and an output connector facet.
#[derive(Debug)]
pub struct NodeItem {
    id: ItemId,
    pub(crate) node: Option<NodeId>,
    /// Input facet
    pub input: NodeConnector,
    /// Output facet
    pub output: NodeConnector,
    /// Placement of non-connector items
    pub dock: ItemDock,
    /// Opaque tag, e.g. the value type carried by the connectors
    pub tag: Option<String>,
    pub(crate) bounds: Rect,
    widget: Box<dyn ItemWidget>,
}

impl NodeItem {
    /// Create an item around a widget, with both facets disabled.
    pub fn new(widget: impl ItemWidget) -> Self {
        Self::from_boxed(Box::new(widget))
    }

    /// Create an item around an already boxed widget.
    pub fn from_boxed(widget: Box<dyn ItemWidget>) -> Self {
        Self {
            id: ItemId::new(),
            node: None,
            input: NodeConnector::new(false),
            output: NodeConnector::new(false),
            dock: ItemDock::Center,
            tag: None,
            bounds: Rect::NOTHING,
            widget,
        }
    }

    /// Enable or disable the input facet
    pub fn with_input(mut self, enabled: bool) -> Self {
        self.input.enabled = enabled;
        self
    }

    /// Enable or disable the output facet
    pub fn with_output(mut self, enabled: bool) -> Self {
        self.output.enabled = enabled;
        self
    }

    /// Set the dock
    pub fn with_dock(mut self, dock: ItemDock) -> Self {
        self.dock = dock;
        self
    }

    /// Set the tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Item ID
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Owning node, once the item has been added to one.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Laid-out bounds in graph space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// One of the two facets.
    pub fn connector(&self, direction: ConnectorDirection) -> &NodeConnector {
        match direction {
            ConnectorDirection::Input => &self.input,
            ConnectorDirection::Output => &self.output,
        }
    }

    pub(crate) fn connector_mut(&mut self, direction: ConnectorDirection) -> &mut NodeConnector {
        match direction {
            ConnectorDirection::Input => &mut self.input,
            ConnectorDirection::Output => &mut self.output,
        }
    }

    /// Address of one facet, once the item belongs to a node.
    pub fn connector_ref(&self, direction: ConnectorDirection) -> Option<ConnectorRef> {
        self.node.map(|node| ConnectorRef {
            node,
            item: self.id,
            direction,
        })
    }

    /// Layout column: input items left, output-only items right, the rest inside.
    pub fn side(&self) -> ItemSide {
        if self.input.enabled {
            ItemSide::Input
        } else if self.output.enabled {
            ItemSide::Output
        } else {
            ItemSide::Center
        }
    }

    /// The widget
    pub fn widget(&self) -> &dyn ItemWidget {
        self.widget.as_ref()
    }

    /// The widget, mutably
    pub fn widget_mut(&mut self) -> &mut dyn ItemWidget {
        self.widget.as_mut()
    }

    /// The widget as a concrete type.
    pub fn downcast_ref<T: ItemWidget>(&self) -> Option<&T> {
        self.widget.as_any().downcast_ref::<T>()
    }

    /// The widget as a concrete type, mutably.
    pub fn downcast_mut<T: ItemWidget>(&mut self) -> Option<&mut T> {
        self.widget.as_any_mut().downcast_mut::<T>()
    }

    pub(crate) fn reset_layout(&mut self) {
        self.bounds = Rect::NOTHING;
        self.input.reset();
        self.output.reset();
    }
}
