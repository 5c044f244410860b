// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction controller: command modes, hit-testing, drags and selection.
//!
//! The controller does not own the model. Every input method takes the
//! model, works in screen coordinates and maps them through its
//! [`ViewTransform`]. Visual state lives in the controller's
//! [`RenderStates`] overlay.

use crate::connection::ConnectionId;
use crate::connector::{ConnectionType, ConnectorDirection, ConnectorRef};
use crate::constants::DRAG_THRESHOLD;
use crate::element::{Element, NodeSelection};
use crate::geometry::ViewTransform;
use crate::item::{FixedTextMeasure, ItemRef, ItemSide, TextMeasure};
use crate::layout::perform_layout;
use crate::model::GraphModel;
use crate::node::{Node, NodeId};
use crate::routing::hit_test;
use crate::selection::GraphSelection;
use crate::settings::GraphSettings;
use crate::state::{ElementKey, RenderState, RenderStates};
use egui::{Key, Modifiers, PointerButton, Pos2, Rect, Vec2};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, trace};

/// What a pointer drag currently does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandMode {
    /// Drag elements, create connections
    #[default]
    Edit,
    /// Rubber-band selection
    MarqueSelection,
    /// Pan the view
    TranslateView,
    /// Zoom the view by dragging vertically
    ScaleView,
}

/// Notifications queued for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The focus (selection) changed
    FocusChanged(Option<Element>),
    /// A connector was double-clicked
    ConnectorDoubleClick(ConnectorRef),
    /// A connection was double-clicked; its label should be edited
    EditConnectionLabel(ConnectionId),
    /// An item consumed a click
    ItemClicked(ItemRef),
    /// An item consumed a double click
    ItemDoubleClicked(ItemRef),
    /// Right click without movement; the host may show a context menu
    ShowElementMenu {
        /// Element under the pointer, if any
        element: Option<Element>,
        /// Screen location of the click
        location: Pos2,
    },
}

/// Rubber band from a dragged connector to the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    /// Connector the drag started from
    pub connector: ConnectorRef,
    /// Free end in graph space, snapped to a target connector when hovering one
    pub location: Pos2,
    /// Render state of the preview
    pub state: RenderState,
}

#[derive(Debug, Clone, Copy, Default)]
struct Buttons {
    primary: bool,
    secondary: bool,
    other: bool,
}

impl Buttons {
    fn set(&mut self, button: PointerButton, down: bool) {
        match button {
            PointerButton::Primary => self.primary = down,
            PointerButton::Secondary => self.secondary = down,
            _ => self.other = down,
        }
    }

    fn is_empty(self) -> bool {
        !(self.primary || self.secondary || self.other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectModifier {
    Replace,
    Add,
    Toggle,
    Remove,
}

impl SelectModifier {
    fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.alt {
            Self::Remove
        } else if modifiers.ctrl || modifiers.command {
            Self::Toggle
        } else if modifiers.shift {
            Self::Add
        } else {
            Self::Replace
        }
    }
}

fn compatibility_flag(connection_type: ConnectionType) -> RenderState {
    match connection_type {
        ConnectionType::Compatible => RenderState::COMPATIBLE,
        ConnectionType::Conversion => RenderState::CONVERSION,
        ConnectionType::Incompatible => RenderState::INCOMPATIBLE,
    }
}

/// Interactive editing of a [`GraphModel`].
pub struct GraphController {
    view: ViewTransform,
    settings: GraphSettings,
    states: RenderStates,
    selection: GraphSelection,
    measure: Box<dyn TextMeasure>,
    mode: CommandMode,
    buttons: Buttons,
    modifiers: Modifiers,
    dragging: bool,
    abort_drag: bool,
    mouse_moved: bool,
    ignore_double_click: bool,
    /// Last pointer location, screen space
    last_location: Pos2,
    /// Free end of the drag, screen space
    snapped_location: Pos2,
    /// Where the drag is measured from, graph space
    original_location: Pos2,
    start_locations: Vec<(NodeId, Pos2)>,
    marquee_selected: Vec<NodeId>,
    marquee_unselected: Vec<NodeId>,
    drag_element: Option<Element>,
    hover_element: Option<Element>,
    dragged_over: Option<NodeId>,
    drop_node: Option<NodeId>,
    events: Vec<ControlEvent>,
}

impl GraphController {
    /// Create a controller with default settings and headless text metrics.
    pub fn new() -> Self {
        Self::with_settings(GraphSettings::default())
    }

    /// Create a controller with settings.
    pub fn with_settings(settings: GraphSettings) -> Self {
        let (min_zoom, max_zoom) = settings.zoom_limits();
        Self {
            view: ViewTransform::default().with_zoom_limits(min_zoom, max_zoom),
            settings,
            states: RenderStates::new(),
            selection: GraphSelection::new(),
            measure: Box::new(FixedTextMeasure::default()),
            mode: CommandMode::Edit,
            buttons: Buttons::default(),
            modifiers: Modifiers::NONE,
            dragging: false,
            abort_drag: false,
            mouse_moved: false,
            ignore_double_click: false,
            last_location: Pos2::ZERO,
            snapped_location: Pos2::ZERO,
            original_location: Pos2::ZERO,
            start_locations: Vec::new(),
            marquee_selected: Vec::new(),
            marquee_unselected: Vec::new(),
            drag_element: None,
            hover_element: None,
            dragged_over: None,
            drop_node: None,
            events: Vec::new(),
        }
    }

    /// Use other text metrics for layout, builder style.
    pub fn with_text_measure(mut self, measure: impl TextMeasure + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    /// Replace the text metrics used for layout.
    pub fn set_text_measure(&mut self, measure: impl TextMeasure + 'static) {
        self.measure = Box::new(measure);
    }

    /// Current settings
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Replace the settings; zoom limits apply immediately.
    pub fn set_settings(&mut self, settings: GraphSettings) {
        let (min_zoom, max_zoom) = settings.zoom_limits();
        self.view = self.view.with_zoom_limits(min_zoom, max_zoom);
        self.settings = settings;
    }

    /// View transform
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Mutable view transform
    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    /// Set the screen rectangle the graph is shown in.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.view.viewport = viewport;
    }

    /// Render-state overlay
    pub fn states(&self) -> &RenderStates {
        &self.states
    }

    /// Current selection
    pub fn selection(&self) -> &GraphSelection {
        &self.selection
    }

    /// Mutable selection, e.g. to register observers
    pub fn selection_mut(&mut self) -> &mut GraphSelection {
        &mut self.selection
    }

    /// The focused element: nothing, one element or a node group.
    pub fn focus_element(&self) -> Option<Element> {
        self.selection.focus_element()
    }

    /// Element under the pointer
    pub fn hover_element(&self) -> Option<&Element> {
        self.hover_element.as_ref()
    }

    /// Element being dragged
    pub fn drag_element(&self) -> Option<&Element> {
        self.drag_element.as_ref()
    }

    /// Current command mode
    pub fn mode(&self) -> CommandMode {
        self.mode
    }

    /// Modifier keys used by the next pointer events
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    /// Drain queued notifications.
    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        std::mem::take(&mut self.events)
    }

    /// Re-run layout with the controller's render states and text metrics.
    pub fn layout(&self, model: &mut GraphModel) {
        perform_layout(model, &self.states, self.measure.as_ref());
    }

    fn set_mode(&mut self, mode: CommandMode) {
        if self.mode != mode {
            debug!(from = ?self.mode, to = ?mode, "command mode");
            self.mode = mode;
        }
    }

    // ---- render-state flags ----

    /// Set or clear a flag on an element. Selections flag their nodes;
    /// with `propagate`, connectors and items also flag their node.
    fn set_flag(&mut self, element: &Element, flag: RenderState, value: bool, propagate: bool) {
        match element {
            Element::Selection(selection) => {
                for node in selection.nodes() {
                    self.states.set(ElementKey::Node(*node), flag, value);
                }
            }
            Element::Node(node) => self.states.set(ElementKey::Node(*node), flag, value),
            Element::Connector(connector) => {
                self.states.set(ElementKey::Connector(*connector), flag, value);
                if propagate {
                    self.states.set(ElementKey::Node(connector.node), flag, value);
                }
            }
            Element::Item(item) => {
                self.states.set(ElementKey::Item(item.item), flag, value);
                if propagate {
                    self.states.set(ElementKey::Node(item.node), flag, value);
                }
            }
            Element::Connection(id) => self.states.set(ElementKey::Connection(*id), flag, value),
        }
    }

    /// Change the focus. Returns false when unchanged or vetoed.
    pub fn set_focus(&mut self, element: Option<Element>) -> bool {
        let old = self.selection.elements().to_vec();
        if !self.selection.set(element) {
            return false;
        }
        for element in &old {
            self.set_flag(element, RenderState::FOCUS, false, false);
        }
        for element in self.selection.elements().to_vec() {
            self.set_flag(&element, RenderState::FOCUS, true, false);
        }
        self.events
            .push(ControlEvent::FocusChanged(self.selection.focus_element()));
        true
    }

    fn set_hover(&mut self, element: Option<Element>) -> bool {
        if self.hover_element == element {
            return false;
        }
        if let Some(old) = self.hover_element.take() {
            self.set_flag(&old, RenderState::HOVER, false, true);
        }
        if let Some(new) = &element {
            self.set_flag(new, RenderState::HOVER, true, true);
        }
        self.hover_element = element;
        true
    }

    fn set_drag_element(&mut self, element: Option<Element>) {
        if let Some(old) = self.drag_element.take() {
            self.set_flag(&old, RenderState::DRAGGING, false, false);
        }
        if let Some(new) = &element {
            self.set_flag(new, RenderState::DRAGGING, true, false);
        }
        self.drag_element = element;
    }

    fn set_dragged_over(&mut self, node: Option<NodeId>) {
        if self.dragged_over == node {
            return;
        }
        if let Some(old) = self.dragged_over {
            self.states.set(ElementKey::Node(old), RenderState::DRAGGED_OVER, false);
        }
        if let Some(new) = node {
            self.states.set(ElementKey::Node(new), RenderState::DRAGGED_OVER, true);
        }
        self.dragged_over = node;
    }

    // ---- hit-testing ----

    fn connector_at(
        &self,
        node: &Node,
        direction: ConnectorDirection,
        location: Pos2,
    ) -> Option<ConnectorRef> {
        if node.collapsed_in(self.states.get(ElementKey::Node(node.id()))) {
            return None;
        }
        node.connectors(direction)
            .find(|item| item.connector(direction).bounds.contains(location))
            .and_then(|item| item.connector_ref(direction))
    }

    fn item_at(node: &Node, location: Pos2) -> Option<ItemRef> {
        node.items()
            .iter()
            .filter(|item| item.side() == ItemSide::Center)
            .find(|item| item.bounds().contains(location))
            .map(|item| ItemRef {
                node: node.id(),
                item: item.id(),
            })
    }

    /// Topmost element at a graph-space location.
    ///
    /// Per node, topmost first: input connectors, output connectors, then
    /// the node's items and the node itself. Sub-graph boxes answer with
    /// their connectors and title. Connections come last: label bounds
    /// first, then the stroke, each connection tested once.
    pub fn find_element_at(&self, model: &GraphModel, location: Pos2) -> Option<Element> {
        for node in model.nodes() {
            for direction in [ConnectorDirection::Input, ConnectorDirection::Output] {
                if let Some(connector) = self.connector_at(node, direction, location) {
                    return Some(Element::Connector(connector));
                }
            }
            if node.bounds().contains(location) {
                if let Some(item) = Self::item_at(node, location) {
                    return Some(Element::Item(item));
                }
                return Some(Element::Node(node.id()));
            }
        }

        for node in model.sub_graphs() {
            for direction in [ConnectorDirection::Input, ConnectorDirection::Output] {
                if let Some(connector) = self.connector_at(node, direction, location) {
                    return Some(Element::Connector(connector));
                }
            }
            if node.title_bounds().contains(location) {
                return Some(Element::Node(node.id()));
            }
        }

        let mut seen = HashSet::new();
        let mut found: Vec<ConnectionId> = Vec::new();
        for node in model.nodes().chain(model.sub_graphs()) {
            for id in node.connections() {
                if !seen.insert(*id) {
                    continue;
                }
                if model.connection(*id).is_some_and(|c| c.bounds().contains(location)) {
                    found.insert(0, *id);
                }
            }
        }
        if let Some(id) = found.iter().find(|id| {
            model
                .connection(**id)
                .is_some_and(|c| c.text_bounds().contains(location))
        }) {
            return Some(Element::Connection(*id));
        }
        found
            .into_iter()
            .find(|id| {
                let Some(connection) = model.connection(*id) else {
                    return false;
                };
                let anchor = |c: Option<ConnectorRef>| c.and_then(|c| model.connector(c)).map(|c| c.anchor);
                match (anchor(connection.from()), anchor(connection.to())) {
                    (Some(from), Some(to)) => hit_test(from, to, location),
                    _ => false,
                }
            })
            .map(Element::Connection)
    }

    // ---- pointer input ----

    fn transformed(&self, location: Pos2) -> (Pos2, Pos2) {
        if self.abort_drag {
            (self.view.to_screen(self.original_location), self.original_location)
        } else {
            (location, self.view.to_graph(location))
        }
    }

    /// Combine a pressed node with the current selection.
    fn compose_selection(&self, node: NodeId) -> Option<Element> {
        let mut current = self.selection.nodes();
        match SelectModifier::from_modifiers(self.modifiers) {
            SelectModifier::Replace => {
                if current.len() > 1 && current.contains(node) {
                    Some(Element::Selection(current))
                } else {
                    Some(Element::Node(node))
                }
            }
            SelectModifier::Add => {
                current.insert(node);
                current.into_element()
            }
            SelectModifier::Toggle => {
                if !current.remove(node) {
                    current.insert(node);
                }
                current.into_element()
            }
            SelectModifier::Remove => {
                current.remove(node);
                current.into_element()
            }
        }
    }

    fn highlight_compatible(&mut self, model: &GraphModel, element: &Element) {
        let source = match element {
            Element::Connector(connector) => Some(*connector),
            Element::Connection(id) => model.connection(*id).and_then(|c| c.from()),
            _ => None,
        };
        let Some(source) = source else {
            return;
        };
        let direction = source.direction.opposite();
        let targets: Vec<ConnectorRef> = model
            .nodes()
            .chain(model.sub_graphs())
            .flat_map(|node| node.connectors(direction).filter_map(|item| item.connector_ref(direction)))
            .collect();
        for target in targets {
            let flag = compatibility_flag(model.connection_type(source, target));
            self.states.set_compatibility(ElementKey::Connector(target), flag);
        }
    }

    /// A pointer button went down at a screen location.
    pub fn mouse_down(&mut self, model: &mut GraphModel, location: Pos2, button: PointerButton) {
        let idle = self.buttons.is_empty();
        self.buttons.set(button, true);
        if !idle {
            return;
        }
        self.layout(model);

        self.marquee_selected.clear();
        self.marquee_unselected.clear();
        self.start_locations.clear();
        self.dragging = true;
        self.abort_drag = false;
        self.mouse_moved = false;
        self.snapped_location = location;
        self.last_location = location;
        let graph_location = self.view.to_graph(location);
        self.original_location = graph_location;

        if button != PointerButton::Primary {
            self.set_drag_element(None);
            self.set_mode(CommandMode::TranslateView);
            return;
        }

        let Some(mut element) = self.find_element_at(model, graph_location) else {
            self.set_mode(CommandMode::MarqueSelection);
            return;
        };

        let mut target = Some(element.clone());
        if let Element::Node(node) = element {
            target = self.compose_selection(node);
        }
        match target.clone() {
            Some(Element::Item(item)) => {
                let origin = model
                    .item_mut(item)
                    .and_then(|i| i.widget_mut().on_start_drag(graph_location));
                match origin {
                    Some(origin) => self.original_location = origin,
                    None => target = Some(Element::Node(item.node)),
                }
            }
            Some(Element::Connection(id)) => {
                if let Some(anchor) = model
                    .connection(id)
                    .and_then(|c| c.to())
                    .and_then(|to| model.connector(to))
                    .map(|c| c.anchor)
                {
                    self.original_location = anchor;
                }
            }
            _ => {}
        }
        if let Some(resolved) = &target {
            element = resolved.clone();
            if self.settings.highlight_compatible {
                self.highlight_compatible(model, &element);
            }
            self.start_locations = match &element {
                Element::Node(id) => model.node(*id).map(|n| (*id, n.location)).into_iter().collect(),
                Element::Selection(selection) => selection
                    .nodes()
                    .iter()
                    .filter_map(|id| model.node(*id).map(|n| (*id, n.location)))
                    .collect(),
                _ => Vec::new(),
            };
            model.bring_element_to_front(&element);
        }

        self.set_focus(target.clone());
        self.set_drag_element(target);
        self.set_mode(CommandMode::Edit);
    }

    fn update_marquee(&mut self, model: &GraphModel, rect: Rect) {
        self.revert_marquee();
        if self.abort_drag {
            return;
        }
        let remove = self.modifiers.alt;
        let exclusive = self.modifiers.is_none();
        for node in model.nodes() {
            let key = ElementKey::Node(node.id());
            let focused = self.states.get(key).contains(RenderState::FOCUS);
            if rect.contains_rect(node.bounds()) {
                if !focused && !remove {
                    self.states.set(key, RenderState::FOCUS, true);
                    self.marquee_selected.push(node.id());
                }
                if focused && remove {
                    self.states.set(key, RenderState::FOCUS, false);
                    self.marquee_unselected.push(node.id());
                }
            } else if focused && exclusive {
                self.states.set(key, RenderState::FOCUS, false);
                self.marquee_unselected.push(node.id());
            }
        }
    }

    fn revert_marquee(&mut self) {
        for node in self.marquee_selected.drain(..) {
            self.states.set(ElementKey::Node(node), RenderState::FOCUS, false);
        }
        for node in self.marquee_unselected.drain(..) {
            self.states.set(ElementKey::Node(node), RenderState::FOCUS, true);
        }
    }

    fn exceeds_threshold(delta: Vec2) -> bool {
        delta.x.abs() > DRAG_THRESHOLD || delta.y.abs() > DRAG_THRESHOLD
    }

    fn move_nodes(model: &mut GraphModel, nodes: &[NodeId], delta: Vec2) {
        for id in nodes {
            if let Some(node) = model.node_mut(*id) {
                node.location -= delta;
            }
        }
    }

    /// The pointer moved to a screen location.
    pub fn mouse_move(&mut self, model: &mut GraphModel, location: Pos2) {
        self.layout(model);
        if self.drag_element.is_none()
            && self.mode != CommandMode::MarqueSelection
            && self.buttons.secondary
        {
            let mode = if self.buttons.primary {
                CommandMode::ScaleView
            } else {
                CommandMode::TranslateView
            };
            self.set_mode(mode);
        }

        let (current, graph_location) = self.transformed(location);
        let screen_delta = self.last_location - current;
        let delta = screen_delta / self.view.zoom();

        match self.mode {
            CommandMode::ScaleView => {
                if !self.mouse_moved && screen_delta.y.abs() > DRAG_THRESHOLD {
                    self.mouse_moved = true;
                }
                if self.mouse_moved && screen_delta.y != 0.0 {
                    let factor = 2f32.powf(screen_delta.y / self.settings.drag_zoom_divisor);
                    self.view.scale_zoom(factor);
                    self.snapped_location = current;
                    self.last_location = current;
                }
                return;
            }
            CommandMode::TranslateView => {
                if !self.mouse_moved && Self::exceeds_threshold(screen_delta) {
                    self.mouse_moved = true;
                }
                if self.mouse_moved && screen_delta != Vec2::ZERO {
                    self.view.translation -= screen_delta;
                    self.snapped_location = current;
                    self.last_location = current;
                }
                return;
            }
            CommandMode::MarqueSelection => {
                if !self.mouse_moved && Self::exceeds_threshold(screen_delta) {
                    self.mouse_moved = true;
                }
                if self.mouse_moved && screen_delta != Vec2::ZERO {
                    let rect = Rect::from_two_pos(self.original_location, graph_location);
                    self.update_marquee(model, rect);
                    self.snapped_location = current;
                    self.last_location = current;
                }
                return;
            }
            CommandMode::Edit => {}
        }

        if self.dragging {
            if !self.mouse_moved && Self::exceeds_threshold(screen_delta) {
                self.mouse_moved = true;
            }
            if self.mouse_moved && screen_delta != Vec2::ZERO {
                if let Some(drag) = self.drag_element.clone() {
                    model.bring_element_to_front(&drag);
                    match drag {
                        Element::Selection(selection) => {
                            Self::move_nodes(model, selection.nodes(), delta);
                            self.snapped_location = current;
                            self.last_location = current;
                            return;
                        }
                        Element::Node(node) => {
                            Self::move_nodes(model, &[node], delta);
                            self.snapped_location = current;
                            self.last_location = current;
                            return;
                        }
                        Element::Item(item) => {
                            if let Some(item) = model.item_mut(item) {
                                item.widget_mut().on_drag(graph_location);
                            }
                            self.snapped_location = current;
                            self.last_location = current;
                        }
                        Element::Connection(id) => {
                            // Pick the connection up at its input end.
                            let from = model.connection(id).and_then(|c| c.from());
                            match from {
                                Some(output) => {
                                    self.set_focus(Some(Element::Node(output.node)));
                                    if model.disconnect(id) {
                                        self.set_drag_element(Some(Element::Connector(output)));
                                    } else {
                                        self.set_drag_element(None);
                                    }
                                }
                                None => self.set_drag_element(None),
                            }
                            self.snapped_location = current;
                            self.last_location = current;
                        }
                        Element::Connector(_) => {
                            self.snapped_location = current;
                            self.last_location = current;
                        }
                    }
                }
            }
        }

        self.update_hover(model, graph_location);
    }

    /// Resolve the element under the pointer against the current drag.
    fn update_hover(&mut self, model: &mut GraphModel, location: Pos2) {
        let drag_connector = self.drag_element.as_ref().and_then(Element::connector);
        if let Some(dragged) = drag_connector {
            self.states
                .set(ElementKey::Connector(dragged), RenderState::COMPATIBILITY, false);
        }
        let dragging = self.drag_element.is_some();

        let mut element = self.find_element_at(model, location);
        let mut destination = None;
        let mut dragged_over = None;

        if dragging {
            if let Some(Element::Item(item)) = element {
                element = Some(Element::Node(item.node));
            }
        }
        match element.clone() {
            Some(Element::Node(node)) if dragging => {
                if let Some(dragged) = drag_connector {
                    let direction = dragged.direction.opposite();
                    let candidates: Vec<ConnectorRef> = model
                        .node(node)
                        .map(|n| {
                            n.connectors(direction)
                                .filter_map(|item| item.connector_ref(direction))
                                .collect()
                        })
                        .unwrap_or_default();
                    let single = match candidates.as_slice() {
                        [single] if single.node != dragged.node => Some(*single),
                        _ => None,
                    };
                    match single.filter(|target| model.connection_is_allowed(dragged, *target)) {
                        Some(target) => {
                            element = Some(Element::Connector(target));
                            destination = Some(target);
                            dragged_over = Some(node);
                        }
                        None if node != dragged.node => dragged_over = Some(node),
                        None => {}
                    }
                }
            }
            Some(Element::Connector(connector)) => {
                if let Some(dragged) = drag_connector {
                    if dragged.node == connector.node || dragged.direction == connector.direction {
                        element = None;
                    } else {
                        destination = Some(connector);
                        dragged_over = Some(connector.node);
                    }
                } else if dragging {
                    element = None;
                }
            }
            Some(_) if dragging => element = None,
            _ => {}
        }

        if let (Some(dragged), Some(target)) = (drag_connector, destination) {
            let flag = if model.connection_is_allowed(dragged, target) {
                compatibility_flag(model.connection_type(dragged, target))
            } else {
                RenderState::INCOMPATIBLE
            };
            self.states.set(ElementKey::Connector(dragged), flag, true);
            if let Some(anchor) = model.connector(target).map(|c| c.anchor) {
                self.snapped_location = self.view.to_screen(anchor);
            }
        }

        if self.set_hover(element) {
            trace!(hover = ?self.hover_element, "hover changed");
        }
        self.set_dragged_over(dragged_over);
    }

    /// A pointer button was released at a screen location.
    pub fn mouse_up(&mut self, model: &mut GraphModel, location: Pos2, button: PointerButton) {
        self.buttons.set(button, false);
        if !self.dragging {
            return;
        }
        self.layout(model);

        match self.mode {
            CommandMode::MarqueSelection => {
                if self.abort_drag {
                    self.revert_marquee();
                } else {
                    let focused: Vec<NodeId> = model
                        .node_ids()
                        .filter(|id| self.states.get(ElementKey::Node(*id)).contains(RenderState::FOCUS))
                        .collect();
                    self.marquee_selected.clear();
                    self.marquee_unselected.clear();
                    self.set_focus(NodeSelection::new(focused).into_element());
                }
            }
            CommandMode::ScaleView | CommandMode::TranslateView => {}
            CommandMode::Edit => match self.drag_element.clone() {
                Some(Element::Connector(_)) if self.abort_drag => {}
                Some(Element::Connector(dragged)) => {
                    let hovered = self.hover_element.as_ref().and_then(Element::connector);
                    let accepted = self
                        .states
                        .get(ElementKey::Connector(dragged))
                        .intersects(RenderState::COMPATIBLE | RenderState::CONVERSION);
                    if let Some(target) = hovered {
                        if target.direction != dragged.direction && target.node != dragged.node && accepted {
                            if let Some(id) = model.connect(Some(dragged), Some(target), "") {
                                self.set_focus(Some(Element::Connection(id)));
                            }
                        }
                    }
                }
                Some(_) => {}
                None => {
                    if !self.selection.is_empty() {
                        self.set_focus(None);
                    }
                }
            },
        }

        self.states.clear_all(RenderState::COMPATIBILITY);
        if let Some(Element::Item(item)) = self.drag_element.clone() {
            if let Some(item) = model.item_mut(item) {
                item.widget_mut().on_end_drag();
            }
        }
        self.set_drag_element(None);
        self.set_dragged_over(None);
        self.dragging = false;
        self.set_mode(CommandMode::Edit);
        self.marquee_selected.clear();
        self.marquee_unselected.clear();

        if !self.mouse_moved {
            self.click(model, location, button);
        }
    }

    fn click(&mut self, model: &mut GraphModel, location: Pos2, button: PointerButton) {
        self.ignore_double_click = false;
        let graph_location = self.view.to_graph(location);
        let element = self.find_element_at(model, graph_location);

        if button == PointerButton::Secondary {
            self.events.push(ControlEvent::ShowElementMenu { element, location });
            return;
        }

        match element {
            None => {
                self.ignore_double_click = true;
                if self.modifiers.is_none() {
                    self.set_focus(None);
                }
            }
            Some(Element::Item(item)) if self.modifiers.is_none() => {
                let consumed = model
                    .item_mut(item)
                    .is_some_and(|i| i.widget_mut().on_click(graph_location));
                if consumed {
                    self.ignore_double_click = true;
                    self.events.push(ControlEvent::ItemClicked(item));
                    model.invalidate();
                }
            }
            Some(_) => {}
        }
    }

    /// A double click at a screen location.
    pub fn double_click(&mut self, model: &mut GraphModel, location: Pos2) {
        if self.mouse_moved || self.ignore_double_click || !self.modifiers.is_none() {
            return;
        }
        self.layout(model);
        let Some(element) = self.find_element_at(model, self.view.to_graph(location)) else {
            return;
        };
        let node = match element {
            Element::Connection(id) => {
                self.events.push(ControlEvent::EditConnectionLabel(id));
                return;
            }
            Element::Connector(connector) => {
                self.events.push(ControlEvent::ConnectorDoubleClick(connector));
                return;
            }
            Element::Item(item) => {
                let consumed = model
                    .item_mut(item)
                    .is_some_and(|i| i.widget_mut().on_double_click());
                if consumed {
                    self.events.push(ControlEvent::ItemDoubleClicked(item));
                    return;
                }
                item.node
            }
            Element::Node(node) => node,
            Element::Selection(_) => return,
        };
        if let Some(node) = model.node_mut(node) {
            let collapsed = node.is_collapsed_flag_set();
            node.set_collapsed(!collapsed);
        }
        self.set_focus(Some(Element::Node(node)));
    }

    /// Zoom by a wheel delta; `delta` equal to the divisor doubles the zoom.
    pub fn wheel(&mut self, delta: f32) {
        let factor = 2f32.powf(delta / self.settings.wheel_zoom_divisor);
        self.view.scale_zoom(factor);
    }

    // ---- keyboard ----

    /// A key was pressed.
    pub fn key_down(&mut self, model: &mut GraphModel, key: Key) {
        match key {
            Key::Escape => self.abort(model),
            Key::Delete => {
                self.delete_selection(model);
            }
            _ => {}
        }
    }

    fn abort(&mut self, model: &mut GraphModel) {
        if !self.dragging {
            return;
        }
        self.abort_drag = true;
        match self.mode {
            CommandMode::Edit => {
                for (id, location) in std::mem::take(&mut self.start_locations) {
                    if let Some(node) = model.node_mut(id) {
                        node.location = location;
                    }
                }
                let origin = self.view.to_screen(self.original_location);
                self.last_location = origin;
                self.snapped_location = origin;
                self.set_hover(None);
                self.set_dragged_over(None);
                self.states.clear_all(RenderState::COMPATIBILITY);
            }
            CommandMode::MarqueSelection => self.revert_marquee(),
            CommandMode::ScaleView | CommandMode::TranslateView => {}
        }
        debug!(mode = ?self.mode, "drag aborted");
    }

    /// Remove every selected node and disconnect every selected connection,
    /// then clear the selection. Returns whether the model changed.
    pub fn delete_selection(&mut self, model: &mut GraphModel) -> bool {
        let elements = self.selection.elements().to_vec();
        let mut changed = false;
        for element in &elements {
            if let Element::Connection(id) = element {
                changed |= model.disconnect(*id);
            }
        }
        for element in &elements {
            match element {
                Element::Node(id) => changed |= model.remove_node(*id),
                Element::Selection(selection) => {
                    changed |= model.remove_nodes(selection.nodes().iter().copied());
                }
                _ => {}
            }
        }
        self.set_focus(None);
        self.set_hover(None);
        changed
    }

    // ---- external drag-and-drop ----

    /// A node is dragged into the view; it is added to the model and
    /// follows the pointer until dropped or dragged out.
    pub fn drag_enter(&mut self, model: &mut GraphModel, node: Node, location: Pos2) -> Option<NodeId> {
        let id = node.id();
        self.drop_node = None;
        if !model.add_node(node) {
            debug!(node = ?id, "dropped node rejected");
            return None;
        }
        self.drop_node = Some(id);
        self.drag_over(model, location);
        Some(id)
    }

    /// Whether a node from an external drag is currently in the model.
    pub fn is_drop_pending(&self) -> bool {
        self.drop_node.is_some()
    }

    /// The external drag moved; keeps the node centered on the pointer.
    pub fn drag_over(&mut self, model: &mut GraphModel, location: Pos2) -> bool {
        let Some(id) = self.drop_node else {
            return false;
        };
        self.layout(model);
        let pointer = self.view.to_graph(location);
        let Some(node) = model.node_mut(id) else {
            return false;
        };
        let offset = Vec2::new(
            node.bounds().width() / 2.0,
            node.title_bounds().height() / 2.0,
        );
        let target = pointer - offset;
        if node.location == target {
            return false;
        }
        node.location = target;
        true
    }

    /// The external drag left the view without dropping.
    pub fn drag_leave(&mut self, model: &mut GraphModel) {
        if let Some(id) = self.drop_node.take() {
            model.remove_node(id);
        }
    }

    /// The external drag was dropped; the node stays.
    pub fn drag_drop(&mut self, model: &mut GraphModel, location: Pos2) -> Option<NodeId> {
        self.drag_over(model, location);
        self.drop_node.take()
    }

    // ---- queries for rendering ----

    /// Rubber band of a connector drag, in graph space.
    pub fn drag_preview(&self) -> Option<DragPreview> {
        if self.mode != CommandMode::Edit || !self.dragging {
            return None;
        }
        let connector = self.drag_element.as_ref().and_then(Element::connector)?;
        let location = if self.abort_drag {
            self.original_location
        } else {
            self.view.to_graph(self.snapped_location)
        };
        let state = RenderState::DRAGGING
            | RenderState::HOVER
            | (self.states.get(ElementKey::Connector(connector)) & RenderState::COMPATIBILITY);
        Some(DragPreview {
            connector,
            location,
            state,
        })
    }

    /// Marquee rectangle in graph space while selecting.
    pub fn marquee_rect(&self) -> Option<Rect> {
        if self.mode != CommandMode::MarqueSelection || !self.dragging {
            return None;
        }
        let current = if self.abort_drag {
            self.original_location
        } else {
            self.view.to_graph(self.snapped_location)
        };
        Some(Rect::from_two_pos(self.original_location, current))
    }
}

impl Default for GraphController {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphController")
            .field("mode", &self.mode)
            .field("view", &self.view)
            .field("selection", &self.selection)
            .field("drag_element", &self.drag_element)
            .field("hover_element", &self.hover_element)
            .finish_non_exhaustive()
    }
}
