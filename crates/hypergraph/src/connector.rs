// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connector facets of node items.

use crate::item::ItemId;
use crate::node::NodeId;
use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

/// Connector direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorDirection {
    /// Receives a connection (drawn on the left)
    Input,
    /// Sends a connection (drawn on the right)
    Output,
}

impl ConnectorDirection {
    /// The other polarity.
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Address of one connector facet: node, item and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    /// Owning node
    pub node: NodeId,
    /// Item the facet belongs to
    pub item: ItemId,
    /// Which facet
    pub direction: ConnectorDirection,
}

impl ConnectorRef {
    /// Input facet of an item.
    pub fn input(node: NodeId, item: ItemId) -> Self {
        Self {
            node,
            item,
            direction: ConnectorDirection::Input,
        }
    }

    /// Output facet of an item.
    pub fn output(node: NodeId, item: ItemId) -> Self {
        Self {
            node,
            item,
            direction: ConnectorDirection::Output,
        }
    }

    /// Whether this is an input facet.
    pub fn is_input(&self) -> bool {
        self.direction == ConnectorDirection::Input
    }

    /// Whether this is an output facet.
    pub fn is_output(&self) -> bool {
        self.direction == ConnectorDirection::Output
    }
}

/// One connector facet of an item.
///
/// Every item carries an input and an output facet; only enabled facets take
/// part in layout, hit-testing and connections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeConnector {
    /// Whether the facet is shown and connectable
    pub enabled: bool,
    /// Laid-out bounds in graph space
    pub bounds: Rect,
    /// Point connections attach to, in graph space
    pub anchor: Pos2,
}

impl NodeConnector {
    /// A facet with no layout yet.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bounds: Rect::NOTHING,
            anchor: Pos2::ZERO,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.bounds = Rect::NOTHING;
        self.anchor = Pos2::ZERO;
    }
}

impl Default for NodeConnector {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Result of asking whether two connectors may be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Types match
    Compatible,
    /// Types differ but convert automatically
    Conversion,
    /// Connection is not allowed
    Incompatible,
}

impl ConnectionType {
    /// Whether a connection of this type may be created.
    pub fn is_allowed(self) -> bool {
        self != Self::Incompatible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(ConnectorDirection::Input.opposite(), ConnectorDirection::Output);
        assert_eq!(ConnectorDirection::Output.opposite(), ConnectorDirection::Input);
    }

    #[test]
    fn test_connector_ref_constructors() {
        let node = NodeId::new();
        let item = ItemId::new();
        assert!(ConnectorRef::input(node, item).is_input());
        assert!(ConnectorRef::output(node, item).is_output());
        assert_ne!(ConnectorRef::input(node, item), ConnectorRef::output(node, item));
    }

    #[test]
    fn test_connection_type_allowed() {
        assert!(ConnectionType::Compatible.is_allowed());
        assert!(ConnectionType::Conversion.is_allowed());
        assert!(!ConnectionType::Incompatible.is_allowed());
    }
}
