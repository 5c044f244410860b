// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph model: owns nodes, sub-graphs and connections.
//!
//! Index 0 of the node list is the topmost node. Every structural change
//! draws a new revision index; z-order changes do not.

use crate::compatibility::{AlwaysCompatible, CompatibilityStrategy};
use crate::connection::{ConnectionId, NodeConnection};
use crate::connector::{ConnectionType, ConnectorRef, NodeConnector};
use crate::element::Element;
use crate::events::{ask, tell, GraphObserver, RevisionSequence};
use crate::geometry::union_rects;
use crate::item::{ItemRef, NodeItem};
use crate::node::{Node, NodeId};
use egui::Rect;
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Why a connection was not created
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Neither endpoint given
    #[error("connection has no endpoints")]
    NoEndpoints,
    /// Endpoint node not in the model
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    /// Endpoint item not in its node
    #[error("connector not found: {0:?}")]
    ConnectorNotFound(ConnectorRef),
    /// Endpoint facet disabled
    #[error("connector disabled: {0:?}")]
    ConnectorDisabled(ConnectorRef),
    /// Same pair already connected
    #[error("connection already exists")]
    Duplicate,
    /// An observer vetoed the new connection
    #[error("connection vetoed")]
    Vetoed,
}

/// Put an output in `from` and an input in `to`, swapping when needed.
///
/// Two inputs or two outputs violate the contract; debug builds assert.
pub fn normalize_endpoints(
    from: Option<ConnectorRef>,
    to: Option<ConnectorRef>,
) -> (Option<ConnectorRef>, Option<ConnectorRef>) {
    let reversed = from.is_some_and(|c| c.is_input()) || to.is_some_and(|c| c.is_output());
    let (from, to) = if reversed { (to, from) } else { (from, to) };
    debug_assert!(
        from.map_or(true, |c| c.is_output()) && to.map_or(true, |c| c.is_input()),
        "a connection joins one output and one input"
    );
    (from, to)
}

/// The graph model.
pub struct GraphModel {
    nodes: IndexMap<NodeId, Node>,
    sub_graphs: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, NodeConnection>,
    compatibility: Box<dyn CompatibilityStrategy>,
    observers: Vec<Box<dyn GraphObserver>>,
    revisions: RevisionSequence,
    revision: u32,
}

impl GraphModel {
    /// Create an empty model on the process-wide revision sequence.
    pub fn new() -> Self {
        Self::with_revisions(RevisionSequence::global())
    }

    /// Create an empty model drawing revisions from `revisions`.
    pub fn with_revisions(revisions: RevisionSequence) -> Self {
        let revision = revisions.next();
        Self {
            nodes: IndexMap::new(),
            sub_graphs: IndexMap::new(),
            connections: IndexMap::new(),
            compatibility: Box::new(AlwaysCompatible),
            observers: Vec::new(),
            revisions,
            revision,
        }
    }

    /// Use a compatibility strategy, builder style.
    pub fn with_compatibility(mut self, strategy: impl CompatibilityStrategy + 'static) -> Self {
        self.set_compatibility(strategy);
        self
    }

    /// Replace the compatibility strategy.
    pub fn set_compatibility(&mut self, strategy: impl CompatibilityStrategy + 'static) {
        self.compatibility = Box::new(strategy);
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: impl GraphObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Revision index of the last structural change.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// The sequence revisions are drawn from.
    pub fn revisions(&self) -> &RevisionSequence {
        &self.revisions
    }

    /// Mark the model changed: new revision, views invalidated.
    pub fn invalidate(&mut self) {
        self.bump_revision();
        self.invalidate_views();
    }

    fn bump_revision(&mut self) {
        self.revision = self.revisions.next();
        trace!(revision = self.revision, "revision bumped");
    }

    fn invalidate_views(&mut self) {
        tell(&mut self.observers, |o| o.invalidate_views());
    }

    // ---- nodes ----

    /// Graph nodes, topmost first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Graph node IDs, topmost first.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of graph nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Sub-graph nodes, topmost first.
    pub fn sub_graphs(&self) -> impl Iterator<Item = &Node> {
        self.sub_graphs.values()
    }

    /// Graph nodes grouped under a sub-graph tag.
    pub fn sub_graph_members<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .values()
            .filter(move |node| node.sub_graph_tag.as_deref() == Some(tag))
    }

    /// Whether a node is in either list.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id) || self.sub_graphs.contains_key(&id)
    }

    /// Whether a node is a sub-graph node.
    pub fn is_sub_graph(&self, id: NodeId) -> bool {
        self.sub_graphs.contains_key(&id)
    }

    /// Look up a graph or sub-graph node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).or_else(|| self.sub_graphs.get(&id))
    }

    /// Look up a graph or sub-graph node mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        match self.nodes.get_mut(&id) {
            Some(node) => Some(node),
            None => self.sub_graphs.get_mut(&id),
        }
    }

    /// Z-order position of a graph node, 0 being the top.
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub(crate) fn sub_graphs_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.sub_graphs.values_mut()
    }

    /// Look up an item.
    pub fn item(&self, item: ItemRef) -> Option<&NodeItem> {
        self.node(item.node)?.item(item.item)
    }

    /// Look up an item mutably.
    pub fn item_mut(&mut self, item: ItemRef) -> Option<&mut NodeItem> {
        self.node_mut(item.node)?.item_mut(item.item)
    }

    /// Item owning a connector facet.
    pub fn connector_item(&self, connector: ConnectorRef) -> Option<&NodeItem> {
        self.node(connector.node)?.item(connector.item)
    }

    /// A connector facet.
    pub fn connector(&self, connector: ConnectorRef) -> Option<&NodeConnector> {
        self.connector_item(connector)
            .map(|item| item.connector(connector.direction))
    }

    fn insert_node(&mut self, node: Node, sub_graph: bool, index: usize) -> bool {
        let id = node.id();
        if self.contains_node(id) {
            warn!(node = ?id, "node is already part of the model");
            return false;
        }
        let list = if sub_graph { &mut self.sub_graphs } else { &mut self.nodes };
        let (position, _) = list.insert_full(id, node);
        list.move_index(position, index.min(position));
        let node = &list[&id];
        if ask(&mut self.observers, |o| o.node_added(node)).is_veto() {
            list.shift_remove(&id);
            debug!(node = ?id, "node add vetoed");
            return false;
        }
        true
    }

    /// Insert a node at the top. Returns false when vetoed or already present.
    pub fn add_node(&mut self, node: Node) -> bool {
        let id = node.id();
        if !self.insert_node(node, false, 0) {
            return false;
        }
        self.raise_node(id);
        self.bump_revision();
        self.invalidate_views();
        debug!(node = ?id, "node added");
        true
    }

    /// Insert several nodes on top, keeping their relative order; the last
    /// added node is raised to the very top. Returns whether any was added.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) -> bool {
        let mut index = 0;
        let mut last = None;
        for node in nodes {
            let id = node.id();
            if self.insert_node(node, false, index) {
                index += 1;
                last = Some(id);
            }
        }
        let Some(last) = last else {
            return false;
        };
        self.raise_node(last);
        self.bump_revision();
        self.invalidate_views();
        debug!(count = index, "nodes added");
        true
    }

    /// Insert a sub-graph node. Its members are the graph nodes sharing its
    /// sub-graph tag.
    pub fn add_sub_graph(&mut self, node: Node) -> bool {
        let id = node.id();
        if !self.insert_node(node, true, 0) {
            return false;
        }
        self.bump_revision();
        self.invalidate_views();
        debug!(node = ?id, "sub-graph added");
        true
    }

    /// Remove a node after disconnecting everything attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id).or_else(|| self.sub_graphs.get(&id)) else {
            return false;
        };
        if ask(&mut self.observers, |o| o.node_removing(node)).is_veto() {
            debug!(node = ?id, "node removal vetoed");
            return false;
        }

        self.disconnect_all(id);
        // A removed node keeps no edges, even those whose removal was vetoed.
        let remaining = self
            .node(id)
            .map(|node| node.connections.clone())
            .unwrap_or_default();
        for connection in remaining {
            self.force_disconnect(connection);
        }

        let removed = self
            .nodes
            .shift_remove(&id)
            .or_else(|| self.sub_graphs.shift_remove(&id));
        self.bump_revision();
        self.invalidate_views();
        if let Some(node) = removed {
            tell(&mut self.observers, |o| o.node_removed(&node));
        }
        debug!(node = ?id, "node removed");
        true
    }

    /// Remove several nodes. Returns whether any was removed.
    pub fn remove_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let mut modified = false;
        for id in ids {
            modified |= self.remove_node(id);
        }
        modified
    }

    /// Append an item to a node.
    pub fn add_item(&mut self, node: NodeId, item: NodeItem) -> Option<ItemRef> {
        let item_ref = self.node_mut(node)?.add_item(item);
        self.bump_revision();
        self.invalidate_views();
        Some(item_ref)
    }

    /// Remove an item after disconnecting both of its facets.
    pub fn remove_item(&mut self, item: ItemRef) -> bool {
        let Some(node) = self.node(item.node) else {
            return false;
        };
        if node.item(item.item).is_none() {
            return false;
        }
        let attached: Vec<ConnectionId> = node
            .connections
            .iter()
            .copied()
            .filter(|id| {
                self.connections.get(id).is_some_and(|c| {
                    c.from.is_some_and(|e| e.item == item.item) || c.to.is_some_and(|e| e.item == item.item)
                })
            })
            .collect();
        for connection in attached {
            if !self.disconnect(connection) {
                self.force_disconnect(connection);
            }
        }
        if let Some(node) = self.node_mut(item.node) {
            node.take_item(item.item);
        }
        self.bump_revision();
        self.invalidate_views();
        true
    }

    // ---- connections ----

    /// All connections.
    pub fn connections(&self) -> impl Iterator<Item = &NodeConnection> {
        self.connections.values()
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Look up a connection.
    pub fn connection(&self, id: ConnectionId) -> Option<&NodeConnection> {
        self.connections.get(&id)
    }

    pub(crate) fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut NodeConnection> {
        self.connections.get_mut(&id)
    }

    /// Change the label of a connection.
    pub fn set_connection_label(&mut self, id: ConnectionId, name: impl Into<String>) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };
        connection.name = name.into();
        self.invalidate_views();
        true
    }

    /// Existing connection with exactly these endpoints, searched on the
    /// endpoint nodes' lists.
    pub fn find_connection(&self, from: Option<ConnectorRef>, to: Option<ConnectorRef>) -> Option<ConnectionId> {
        [from, to]
            .into_iter()
            .flatten()
            .filter_map(|endpoint| self.node(endpoint.node))
            .flat_map(|node| node.connections.iter().copied())
            .find(|id| {
                self.connections
                    .get(id)
                    .is_some_and(|c| c.from == from && c.to == to)
            })
    }

    fn check_endpoint(&self, connector: ConnectorRef) -> Result<(), ConnectError> {
        let node = self
            .node(connector.node)
            .ok_or(ConnectError::NodeNotFound(connector.node))?;
        let item = node
            .item(connector.item)
            .ok_or(ConnectError::ConnectorNotFound(connector))?;
        if !item.connector(connector.direction).enabled {
            return Err(ConnectError::ConnectorDisabled(connector));
        }
        Ok(())
    }

    /// Connect two connectors; see [`GraphModel::try_connect`].
    pub fn connect(
        &mut self,
        from: Option<ConnectorRef>,
        to: Option<ConnectorRef>,
        name: impl Into<String>,
    ) -> Option<ConnectionId> {
        match self.try_connect(from, to, name) {
            Ok(id) => Some(id),
            Err(error) => {
                debug!(%error, "connection not created");
                None
            }
        }
    }

    /// Connect two connectors, or bind a single connector to a name.
    ///
    /// Endpoints are normalized so `to` is the input. The new connection is
    /// attached to both endpoint nodes before observers see it; a veto
    /// detaches it again without a revision change.
    pub fn try_connect(
        &mut self,
        from: Option<ConnectorRef>,
        to: Option<ConnectorRef>,
        name: impl Into<String>,
    ) -> Result<ConnectionId, ConnectError> {
        let (from, to) = normalize_endpoints(from, to);
        if from.is_none() && to.is_none() {
            return Err(ConnectError::NoEndpoints);
        }
        for endpoint in [from, to].into_iter().flatten() {
            self.check_endpoint(endpoint)?;
        }
        if self.find_connection(from, to).is_some() {
            return Err(ConnectError::Duplicate);
        }

        let connection = NodeConnection::new(from, to, name);
        let id = connection.id();
        self.connections.insert(id, connection);
        for endpoint in [from, to].into_iter().flatten() {
            if let Some(node) = self.node_mut(endpoint.node) {
                if !node.connections.contains(&id) {
                    node.connections.push(id);
                }
            }
        }

        let connection = &self.connections[&id];
        if ask(&mut self.observers, |o| o.connection_added(connection)).is_veto() {
            self.force_disconnect(id);
            return Err(ConnectError::Vetoed);
        }

        self.bump_revision();
        self.invalidate_views();
        debug!(connection = ?id, "connected");
        Ok(id)
    }

    fn detach(&mut self, id: ConnectionId) -> Option<NodeConnection> {
        let connection = self.connections.shift_remove(&id)?;
        for endpoint in [connection.from, connection.to].into_iter().flatten() {
            if let Some(node) = self.node_mut(endpoint.node) {
                node.connections.retain(|c| *c != id);
            }
        }
        Some(connection)
    }

    fn force_disconnect(&mut self, id: ConnectionId) {
        if let Some(mut connection) = self.detach(id) {
            let (from, to) = connection.sever();
            tell(&mut self.observers, |o| o.connection_removed(from, to, &connection));
        }
    }

    /// Remove a connection; its endpoints are cleared.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.get(&id) else {
            return false;
        };
        if ask(&mut self.observers, |o| o.connection_removing(connection)).is_veto() {
            debug!(connection = ?id, "disconnect vetoed");
            return false;
        }
        let Some(mut connection) = self.detach(id) else {
            return false;
        };
        let (from, to) = connection.sever();
        tell(&mut self.observers, |o| o.connection_removed(from, to, &connection));
        self.bump_revision();
        self.invalidate_views();
        debug!(connection = ?id, "disconnected");
        true
    }

    /// Disconnect every connection of a node. Returns whether any went away.
    pub fn disconnect_all(&mut self, node: NodeId) -> bool {
        let Some(ids) = self.node(node).map(|n| n.connections.clone()) else {
            return false;
        };
        let mut modified = false;
        for id in ids {
            modified |= self.disconnect(id);
        }
        modified
    }

    fn order_pair(a: ConnectorRef, b: ConnectorRef) -> (ConnectorRef, ConnectorRef) {
        if a.is_input() || b.is_output() {
            (b, a)
        } else {
            (a, b)
        }
    }

    /// Compatibility of two connectors according to the strategy.
    pub fn connection_type(&self, a: ConnectorRef, b: ConnectorRef) -> ConnectionType {
        let (from, to) = Self::order_pair(a, b);
        if !from.is_output() || !to.is_input() {
            return ConnectionType::Incompatible;
        }
        match (self.connector_item(from), self.connector_item(to)) {
            (Some(from), Some(to)) => self.compatibility.can_connect(from, to),
            _ => ConnectionType::Incompatible,
        }
    }

    /// Whether a connection between two connectors would be accepted: the
    /// strategy must not report `Incompatible` and no observer may veto.
    pub fn connection_is_allowed(&mut self, a: ConnectorRef, b: ConnectorRef) -> bool {
        let (from, to) = Self::order_pair(a, b);
        if !self.connection_type(from, to).is_allowed() {
            return false;
        }
        !ask(&mut self.observers, |o| o.connection_adding(from, to)).is_veto()
    }

    // ---- z-order ----

    fn raise_node(&mut self, id: NodeId) -> bool {
        for list in [&mut self.nodes, &mut self.sub_graphs] {
            if let Some(index) = list.get_index_of(&id) {
                if index != 0 {
                    list.move_index(index, 0);
                    return true;
                }
                return false;
            }
        }
        false
    }

    fn raise_connection(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.get(&id) else {
            return false;
        };
        let endpoints = [connection.from, connection.to];
        let mut changed = false;
        for endpoint in endpoints.into_iter().flatten() {
            changed |= self.raise_node(endpoint.node);
            if let Some(node) = self.node_mut(endpoint.node) {
                if let Some(index) = node.connections.iter().position(|c| *c == id) {
                    if index != 0 {
                        let id = node.connections.remove(index);
                        node.connections.insert(0, id);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Move an element's nodes to the top. Views are invalidated only when
    /// the order changed; the revision never changes.
    pub fn bring_element_to_front(&mut self, element: &Element) {
        let changed = match element {
            Element::Node(id) => self.raise_node(*id),
            Element::Item(item) => self.raise_node(item.node),
            Element::Connector(connector) => self.raise_node(connector.node),
            Element::Connection(id) => self.raise_connection(*id),
            Element::Selection(selection) => {
                let mut changed = false;
                for id in selection.nodes().iter().rev() {
                    changed |= self.raise_node(*id);
                }
                changed
            }
        };
        if changed {
            self.invalidate_views();
        }
    }

    /// Laid-out bounds of an element.
    pub fn element_bounds(&self, element: &Element) -> Rect {
        match element {
            Element::Node(id) => self.node(*id).map_or(Rect::NOTHING, Node::bounds),
            Element::Item(item) => self.item(*item).map_or(Rect::NOTHING, NodeItem::bounds),
            Element::Connector(connector) => self.connector(*connector).map_or(Rect::NOTHING, |c| c.bounds),
            Element::Connection(id) => self.connection(*id).map_or(Rect::NOTHING, NodeConnection::bounds),
            Element::Selection(selection) => union_rects(
                selection
                    .nodes()
                    .iter()
                    .filter_map(|id| self.node(*id))
                    .map(Node::bounds),
            ),
        }
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphModel")
            .field("nodes", &self.nodes.len())
            .field("sub_graphs", &self.sub_graphs.len())
            .field("connections", &self.connections.len())
            .field("observers", &self.observers.len())
            .field("revision", &self.revision)
            .finish()
    }
}
