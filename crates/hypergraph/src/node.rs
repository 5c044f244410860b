// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.

use crate::connection::ConnectionId;
use crate::connector::ConnectorDirection;
use crate::item::{ItemId, ItemRef, NodeItem};
use crate::state::RenderState;
use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of a node's layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeLayout {
    /// Box with item columns
    #[default]
    Rectangular,
    /// Fixed square box with items arranged around it
    Circular,
}

/// A node: a titled box of items.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    /// Title shown in the header
    pub title: String,
    /// Top-left corner in graph space
    pub location: Pos2,
    /// Layout shape
    pub layout: NodeLayout,
    /// Opaque tag for the host
    pub tag: Option<String>,
    /// Groups the node into the sub-graph with the same tag
    pub sub_graph_tag: Option<String>,
    collapsed: bool,
    items: Vec<NodeItem>,
    pub(crate) connections: Vec<ConnectionId>,
    pub(crate) bounds: Rect,
    pub(crate) title_bounds: Rect,
    pub(crate) items_bounds: Rect,
    pub(crate) input_bounds: Rect,
    pub(crate) output_bounds: Rect,
}

impl Node {
    /// Create an empty node
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            title: title.into(),
            location: Pos2::ZERO,
            layout: NodeLayout::Rectangular,
            tag: None,
            sub_graph_tag: None,
            collapsed: false,
            items: Vec::new(),
            connections: Vec::new(),
            bounds: Rect::NOTHING,
            title_bounds: Rect::NOTHING,
            items_bounds: Rect::NOTHING,
            input_bounds: Rect::NOTHING,
            output_bounds: Rect::NOTHING,
        }
    }

    /// Set location
    pub fn with_location(mut self, x: f32, y: f32) -> Self {
        self.location = Pos2::new(x, y);
        self
    }

    /// Set layout shape
    pub fn with_layout(mut self, layout: NodeLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set sub-graph tag
    pub fn with_sub_graph_tag(mut self, tag: impl Into<String>) -> Self {
        self.sub_graph_tag = Some(tag.into());
        self
    }

    /// Add an item, builder style
    pub fn with_item(mut self, item: NodeItem) -> Self {
        self.add_item(item);
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Append an item and take ownership of it.
    pub fn add_item(&mut self, mut item: NodeItem) -> ItemRef {
        item.node = Some(self.id);
        let item_ref = ItemRef {
            node: self.id,
            item: item.id(),
        };
        self.items.push(item);
        item_ref
    }

    /// Detach an item. Connections to it are the model's business, see
    /// `GraphModel::remove_item`.
    pub(crate) fn take_item(&mut self, id: ItemId) -> Option<NodeItem> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        let mut item = self.items.remove(index);
        item.node = None;
        Some(item)
    }

    /// Items in order
    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [NodeItem] {
        &mut self.items
    }

    /// Look up an item
    pub fn item(&self, id: ItemId) -> Option<&NodeItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Look up an item mutably
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut NodeItem> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Items with the given facet enabled
    pub fn connectors(&self, direction: ConnectorDirection) -> impl Iterator<Item = &NodeItem> + '_ {
        self.items
            .iter()
            .filter(move |item| item.connector(direction).enabled)
    }

    /// Stored collapsed flag, without the automatic rules
    pub fn is_collapsed_flag_set(&self) -> bool {
        self.collapsed
    }

    /// Set the stored collapsed flag
    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    /// Whether the node is collapsed when not dragged over.
    pub fn collapsed(&self) -> bool {
        self.collapsed_in(RenderState::NONE)
    }

    /// Whether the node is collapsed in a render state.
    ///
    /// A node without items is always collapsed. A node with items is
    /// expanded while a connection drag is over it, so its connectors can be
    /// targeted.
    pub fn collapsed_in(&self, state: RenderState) -> bool {
        self.items.is_empty() || (self.collapsed && !state.contains(RenderState::DRAGGED_OVER))
    }

    /// Connections touching this node, most recently raised first
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Laid-out box in graph space
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Laid-out title row
    pub fn title_bounds(&self) -> Rect {
        self.title_bounds
    }

    /// Laid-out area of the center items
    pub fn items_bounds(&self) -> Rect {
        self.items_bounds
    }

    /// Union of the laid-out input connectors
    pub fn input_bounds(&self) -> Rect {
        self.input_bounds
    }

    /// Union of the laid-out output connectors
    pub fn output_bounds(&self) -> Rect {
        self.output_bounds
    }

    /// Box plus connector columns
    pub fn total_bounds(&self) -> Rect {
        self.bounds.union(self.input_bounds).union(self.output_bounds)
    }
}
