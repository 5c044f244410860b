// SPDX-License-Identifier: MIT OR Apache-2.0
//! Current selection with change notifications.

use crate::element::{Element, NodeSelection};
use crate::events::Verdict;
use crate::model::GraphModel;
use crate::node::NodeId;
use std::fmt;

/// Receives selection change notifications.
pub trait SelectionObserver {
    /// The selection is about to change; a veto keeps the old one.
    fn selection_changing(&mut self, _old: &[Element], _new: &[Element]) -> Verdict {
        Verdict::Proceed
    }

    /// The selection has changed.
    fn selection_changed(&mut self, _selection: &[Element]) {}
}

/// The set of selected elements.
#[derive(Default)]
pub struct GraphSelection {
    elements: Vec<Element>,
    observers: Vec<Box<dyn SelectionObserver>>,
}

impl GraphSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: impl SelectionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Selected elements, in selection order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Replace the selection. Node selections are flattened into their
    /// nodes and repeats dropped. Returns whether the selection changed.
    pub fn update(&mut self, elements: impl IntoIterator<Item = Element>) -> bool {
        let mut new = Vec::new();
        for element in elements {
            match element {
                Element::Selection(selection) => {
                    new.extend(selection.nodes().iter().copied().map(Element::Node));
                }
                other => new.push(other),
            }
        }
        let mut unique: Vec<Element> = Vec::with_capacity(new.len());
        for element in new {
            if !unique.contains(&element) {
                unique.push(element);
            }
        }
        if unique == self.elements {
            return false;
        }

        let mut verdict = Verdict::Proceed;
        for observer in &mut self.observers {
            if observer.selection_changing(&self.elements, &unique).is_veto() {
                verdict = Verdict::Veto;
            }
        }
        if verdict.is_veto() {
            return false;
        }

        self.elements = unique;
        for observer in &mut self.observers {
            observer.selection_changed(&self.elements);
        }
        true
    }

    /// Select a single element, or nothing.
    pub fn set(&mut self, element: Option<Element>) -> bool {
        self.update(element)
    }

    /// Clear the selection.
    pub fn clear(&mut self) -> bool {
        self.update(None)
    }

    /// Selected nodes; other element kinds are ignored.
    pub fn nodes(&self) -> NodeSelection {
        NodeSelection::new(self.elements.iter().filter_map(|element| match element {
            Element::Node(id) => Some(*id),
            _ => None,
        }))
    }

    /// The selection as one element: nothing, the single element, or the
    /// group of selected nodes.
    pub fn focus_element(&self) -> Option<Element> {
        match self.elements.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            _ => self.nodes().into_element(),
        }
    }

    /// Whether `element` is covered by any selected element.
    ///
    /// A connection covers its endpoint connectors and their nodes, an item
    /// or connector covers its node, and a node selection covers its members.
    pub fn contains(&self, model: &GraphModel, element: &Element) -> bool {
        self.elements
            .iter()
            .any(|selected| covers(model, selected, element))
    }

    /// Whether a node is covered by the selection.
    pub fn contains_node(&self, model: &GraphModel, node: NodeId) -> bool {
        self.contains(model, &Element::Node(node))
    }
}

fn covers(model: &GraphModel, selected: &Element, element: &Element) -> bool {
    if selected == element {
        return true;
    }
    match (selected, element) {
        (Element::Connection(id), Element::Connector(connector)) => model
            .connection(*id)
            .is_some_and(|c| c.involves_connector(*connector)),
        (Element::Connection(id), Element::Node(node)) => {
            model.connection(*id).is_some_and(|c| c.involves_node(*node))
        }
        (Element::Item(item), Element::Node(node)) => item.node == *node,
        (Element::Connector(connector), Element::Node(node)) => connector.node == *node,
        (Element::Selection(selection), Element::Node(node)) => selection.contains(*node),
        _ => false,
    }
}

impl fmt::Debug for GraphSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphSelection")
            .field("elements", &self.elements)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorDirection;
    use crate::item::ItemRef;
    use crate::model::tests::{connector, typed_node};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Watch {
        changed: Rc<RefCell<u32>>,
        veto: Rc<RefCell<bool>>,
    }

    impl SelectionObserver for Watch {
        fn selection_changing(&mut self, _old: &[Element], _new: &[Element]) -> Verdict {
            if *self.veto.borrow() {
                Verdict::Veto
            } else {
                Verdict::Proceed
            }
        }

        fn selection_changed(&mut self, _selection: &[Element]) {
            *self.changed.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_update_flattens_and_notifies_once() {
        let watch = Watch::default();
        let mut selection = GraphSelection::new();
        selection.add_observer(watch.clone());
        let a = NodeId::new();
        let b = NodeId::new();

        assert!(selection.update([Element::Selection(NodeSelection::new([a, b])), Element::Node(a)]));
        assert_eq!(selection.elements(), &[Element::Node(a), Element::Node(b)]);
        assert!(!selection.update([Element::Node(a), Element::Node(b)]));
        assert_eq!(*watch.changed.borrow(), 1);

        *watch.veto.borrow_mut() = true;
        assert!(!selection.clear());
        assert_eq!(selection.elements().len(), 2);
    }

    #[test]
    fn test_focus_element_shapes() {
        let mut selection = GraphSelection::new();
        assert_eq!(selection.focus_element(), None);
        let a = NodeId::new();
        let b = NodeId::new();
        selection.set(Some(Element::Node(a)));
        assert_eq!(selection.focus_element(), Some(Element::Node(a)));
        selection.update([Element::Node(a), Element::Node(b)]);
        assert_eq!(
            selection.focus_element(),
            Some(Element::Selection(NodeSelection::new([a, b])))
        );
    }

    #[test]
    fn test_contains_scans_every_selected_element() {
        let mut model = GraphModel::new();
        let source = typed_node("Source", &[], &["float"]);
        let sink = typed_node("Sink", &["float"], &[]);
        let other = typed_node("Other", &["float"], &[]);
        let (source_id, sink_id, other_id) = (source.id(), sink.id(), other.id());
        model.add_nodes([source, sink, other]);
        let output = connector(&model, source_id, ConnectorDirection::Output, 0);
        let input = connector(&model, sink_id, ConnectorDirection::Input, 0);
        let edge = model.connect(Some(output), Some(input), "").expect("edge");
        let other_input = connector(&model, other_id, ConnectorDirection::Input, 0);

        let mut selection = GraphSelection::new();
        selection.update([
            Element::Connector(other_input),
            Element::Connection(edge),
        ]);

        // Only the second selected element covers these.
        assert!(selection.contains(&model, &Element::Connector(output)));
        assert!(selection.contains_node(&model, sink_id));
        assert!(selection.contains_node(&model, source_id));
        // Connector covers its node.
        assert!(selection.contains_node(&model, other_id));
        assert!(!selection.contains(&model, &Element::Item(ItemRef { node: sink_id, item: input.item })));
    }

    #[test]
    fn test_nodes_ignores_other_kinds() {
        let mut model = GraphModel::new();
        let node = typed_node("N", &["float"], &[]);
        let id = node.id();
        model.add_node(node);
        let input = connector(&model, id, ConnectorDirection::Input, 0);
        let mut selection = GraphSelection::new();
        selection.update([Element::Connector(input), Element::Node(id)]);
        assert_eq!(selection.nodes().nodes(), &[id]);
        assert!(!selection.contains(&model, &Element::Selection(NodeSelection::new([id]))));
    }
}
