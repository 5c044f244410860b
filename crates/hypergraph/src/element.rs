// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed set of element kinds the interaction layer addresses.

use crate::connection::ConnectionId;
use crate::connector::{ConnectorDirection, ConnectorRef};
use crate::item::ItemRef;
use crate::node::NodeId;
use crate::state::ElementKey;

/// Discriminant of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// A node
    Node,
    /// A node item
    NodeItem,
    /// An input connector
    InputConnector,
    /// An output connector
    OutputConnector,
    /// A connection
    Connection,
    /// A group of nodes
    NodeSelection,
}

/// Ephemeral, non-owning group of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeSelection {
    nodes: Vec<NodeId>,
}

impl NodeSelection {
    /// Create a selection, dropping repeated nodes
    pub fn new(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut selection = Self::default();
        for node in nodes {
            selection.insert(node);
        }
        selection
    }

    /// Member nodes in selection order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Whether a node is a member
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Add a node if absent
    pub fn insert(&mut self, node: NodeId) -> bool {
        if self.contains(node) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node if present
    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        self.nodes.len() != before
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the selection is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The element addressing these nodes: nothing, a single node, or the group.
    pub fn into_element(self) -> Option<Element> {
        match self.nodes.as_slice() {
            [] => None,
            [node] => Some(Element::Node(*node)),
            _ => Some(Element::Selection(self)),
        }
    }
}

/// Anything the pointer can hit, drag or select.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    /// A node
    Node(NodeId),
    /// A node item
    Item(ItemRef),
    /// A connector facet
    Connector(ConnectorRef),
    /// A connection
    Connection(ConnectionId),
    /// A group of nodes
    Selection(NodeSelection),
}

impl Element {
    /// Discriminant
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Node(_) => ElementType::Node,
            Self::Item(_) => ElementType::NodeItem,
            Self::Connector(c) => match c.direction {
                ConnectorDirection::Input => ElementType::InputConnector,
                ConnectorDirection::Output => ElementType::OutputConnector,
            },
            Self::Connection(_) => ElementType::Connection,
            Self::Selection(_) => ElementType::NodeSelection,
        }
    }

    /// Node this element belongs to, for nodes, items and connectors.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node(node) => Some(*node),
            Self::Item(item) => Some(item.node),
            Self::Connector(connector) => Some(connector.node),
            Self::Connection(_) | Self::Selection(_) => None,
        }
    }

    /// The connector, for connector elements.
    pub fn connector(&self) -> Option<ConnectorRef> {
        match self {
            Self::Connector(connector) => Some(*connector),
            _ => None,
        }
    }

    /// Overlay key; a selection has none of its own.
    pub fn key(&self) -> Option<ElementKey> {
        match self {
            Self::Node(node) => Some(ElementKey::Node(*node)),
            Self::Item(item) => Some(ElementKey::Item(item.item)),
            Self::Connector(connector) => Some(ElementKey::Connector(*connector)),
            Self::Connection(connection) => Some(ElementKey::Connection(*connection)),
            Self::Selection(_) => None,
        }
    }
}
