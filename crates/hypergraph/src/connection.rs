// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::connector::ConnectorRef;
use crate::node::NodeId;
use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection from an output connector to an input connector.
///
/// Either endpoint may be absent: a connection with only `to` binds the input
/// to a constant or variable named by the label, one with only `from` exports
/// the output under that name.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConnection {
    id: ConnectionId,
    pub(crate) from: Option<ConnectorRef>,
    pub(crate) to: Option<ConnectorRef>,
    /// Display label, or the bound name when one endpoint is absent
    pub name: String,
    pub(crate) bounds: Rect,
    pub(crate) text_bounds: Rect,
    pub(crate) center: Pos2,
}

impl NodeConnection {
    pub(crate) fn new(from: Option<ConnectorRef>, to: Option<ConnectorRef>, name: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            from,
            to,
            name: name.into(),
            bounds: Rect::NOTHING,
            text_bounds: Rect::NOTHING,
            center: Pos2::ZERO,
        }
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Output side
    pub fn from(&self) -> Option<ConnectorRef> {
        self.from
    }

    /// Input side
    pub fn to(&self) -> Option<ConnectorRef> {
        self.to
    }

    /// Whether both endpoints have been cleared
    pub fn is_severed(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// The single connector of a binding connection
    pub fn binding_connector(&self) -> Option<ConnectorRef> {
        match (self.from, self.to) {
            (Some(from), None) => Some(from),
            (None, Some(to)) => Some(to),
            _ => None,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.is_some_and(|c| c.node == node_id) || self.to.is_some_and(|c| c.node == node_id)
    }

    /// Check if this connection involves a specific connector
    pub fn involves_connector(&self, connector: ConnectorRef) -> bool {
        self.from == Some(connector) || self.to == Some(connector)
    }

    /// Text drawn for the label: bindings are shown as `= name`
    pub fn label_text(&self) -> String {
        if self.binding_connector().is_some() {
            format!("= {}", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Path bounds, including the hit-test margin
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Bounds of the label text
    pub fn text_bounds(&self) -> Rect {
        self.text_bounds
    }

    /// Label anchor: the path midpoint, or next to the bound connector
    pub fn center(&self) -> Pos2 {
        self.center
    }

    pub(crate) fn sever(&mut self) -> (Option<ConnectorRef>, Option<ConnectorRef>) {
        (self.from.take(), self.to.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemId;

    #[test]
    fn test_binding_connector_and_label() {
        let input = ConnectorRef::input(NodeId::new(), ItemId::new());
        let binding = NodeConnection::new(None, Some(input), "time");
        assert_eq!(binding.binding_connector(), Some(input));
        assert_eq!(binding.label_text(), "= time");
        assert!(binding.involves_node(input.node));

        let output = ConnectorRef::output(NodeId::new(), ItemId::new());
        let edge = NodeConnection::new(Some(output), Some(input), "uv");
        assert_eq!(edge.binding_connector(), None);
        assert_eq!(edge.label_text(), "uv");
        assert!(edge.involves_connector(output));
    }

    #[test]
    fn test_sever_clears_endpoints() {
        let input = ConnectorRef::input(NodeId::new(), ItemId::new());
        let output = ConnectorRef::output(NodeId::new(), ItemId::new());
        let mut edge = NodeConnection::new(Some(output), Some(input), "");
        assert_eq!(edge.sever(), (Some(output), Some(input)));
        assert!(edge.is_severed());
        assert!(!edge.involves_node(input.node));
    }
}
