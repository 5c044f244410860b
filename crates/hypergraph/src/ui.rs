// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph view widget.
//!
//! [`GraphView`] owns a [`GraphController`], feeds it egui input and paints
//! the model with [`GraphPainter`]. Notifications the host should react to
//! (context menus, label editing, focus changes) are returned per frame.

use crate::connector::ConnectorDirection;
use crate::control::{CommandMode, ControlEvent, GraphController};
use crate::element::Element;
use crate::model::GraphModel;
use crate::node::{Node, NodeId};
use crate::render::GraphPainter;
use crate::settings::GraphSettings;
use egui::{Color32, Event, EventFilter, Rect, Vec2};
use std::any::Any;

/// What happened in the view during one frame.
#[derive(Debug)]
pub struct GraphViewResponse {
    /// Response of the allocated area
    pub response: egui::Response,
    /// Controller notifications, in order
    pub events: Vec<ControlEvent>,
}

/// Interactive view over a [`GraphModel`].
#[derive(Debug)]
pub struct GraphView {
    controller: GraphController,
    /// Show the status line at the bottom
    pub show_status_bar: bool,
}

impl GraphView {
    /// Create a view with default settings
    pub fn new() -> Self {
        Self::with_settings(GraphSettings::default())
    }

    /// Create a view with settings
    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            controller: GraphController::with_settings(settings),
            show_status_bar: true,
        }
    }

    /// The controller driving this view
    pub fn controller(&self) -> &GraphController {
        &self.controller
    }

    /// Mutable controller, for focus changes and settings
    pub fn controller_mut(&mut self) -> &mut GraphController {
        &mut self.controller
    }

    /// Show the view filling the available space.
    pub fn show(&mut self, ui: &mut egui::Ui, model: &mut GraphModel) -> GraphViewResponse {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.controller.set_viewport(rect);
        self.controller.set_text_measure(ui.ctx().clone());

        self.handle_input(ui, &response, rect, model);
        self.controller.layout(model);

        let controller = &self.controller;
        GraphPainter::new(&painter, controller.view(), controller.states(), controller.settings())
            .paint(model, controller);

        if self.show_status_bar {
            self.draw_status_bar(&painter, rect, model);
        }

        GraphViewResponse {
            response,
            events: self.controller.take_events(),
        }
    }

    /// Accept egui drag-and-drop payloads of type `P` as new nodes.
    ///
    /// While a payload hovers the view, the node built by `make_node` is part
    /// of the model and follows the pointer; it is removed again when the
    /// payload leaves without being released.
    pub fn accept_drops<P: Any + Send + Sync>(
        &mut self,
        response: &egui::Response,
        model: &mut GraphModel,
        make_node: impl FnOnce(&P) -> Node,
    ) -> Option<NodeId> {
        let pointer = response.hover_pos();
        if let (Some(payload), Some(pos)) = (response.dnd_release_payload::<P>(), pointer) {
            if !self.controller.is_drop_pending() {
                self.controller.drag_enter(model, make_node(&payload), pos);
            }
            return self.controller.drag_drop(model, pos);
        }
        match (response.dnd_hover_payload::<P>(), pointer) {
            (Some(payload), Some(pos)) => {
                if self.controller.is_drop_pending() {
                    self.controller.drag_over(model, pos);
                } else {
                    self.controller.drag_enter(model, make_node(&payload), pos);
                }
            }
            _ => {
                if self.controller.is_drop_pending() {
                    self.controller.drag_leave(model);
                }
            }
        }
        None
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect, model: &mut GraphModel) {
        let (events, modifiers, scroll, double_click) = ui.input(|i| {
            (
                i.events.clone(),
                i.modifiers,
                i.raw_scroll_delta.y,
                i.pointer
                    .button_double_clicked(egui::PointerButton::Primary)
                    .then(|| i.pointer.interact_pos())
                    .flatten(),
            )
        });
        self.controller.set_modifiers(modifiers);
        let focused = response.has_focus();
        if focused {
            // Escape would otherwise drop the focus before a drag can be aborted.
            let filter = EventFilter {
                escape: true,
                ..Default::default()
            };
            ui.memory_mut(|m| m.set_focus_lock_filter(response.id, filter));
        }

        for event in events {
            match event {
                Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    ..
                } => {
                    if rect.contains(pos) {
                        response.request_focus();
                        self.controller.mouse_down(model, pos, button);
                    }
                }
                Event::PointerButton {
                    pos,
                    button,
                    pressed: false,
                    ..
                } => self.controller.mouse_up(model, pos, button),
                Event::PointerMoved(pos) => self.controller.mouse_move(model, pos),
                Event::Key {
                    key, pressed: true, ..
                } if focused => {
                    self.controller.key_down(model, key);
                }
                _ => {}
            }
        }

        if let Some(pos) = double_click.filter(|pos| rect.contains(*pos)) {
            self.controller.double_click(model, pos);
        }
        if scroll != 0.0 && response.hovered() {
            self.controller.wheel(scroll);
        }
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, model: &GraphModel) {
        let font = egui::FontId::monospace(10.0);
        let galley = painter.layout_no_wrap(status_text(&self.controller, model), font, Color32::from_gray(170));
        let anchor = rect.right_bottom() - Vec2::new(6.0, 4.0);
        let text_rect = Rect::from_min_size(anchor - galley.size(), galley.size());
        painter.rect_filled(text_rect.expand(3.0), 2.0, Color32::from_black_alpha(140));
        painter.galley(text_rect.min, galley, Color32::from_gray(170));
    }
}

/// One-line summary of what the controller is doing.
fn status_text(controller: &GraphController, model: &GraphModel) -> String {
    let mode = match controller.mode() {
        CommandMode::Edit if controller.drag_element().is_some() => "drag",
        CommandMode::Edit => "edit",
        CommandMode::MarqueSelection => "select",
        CommandMode::TranslateView => "pan",
        CommandMode::ScaleView => "zoom",
    };
    let mut text = format!("{mode} {:.0}%", controller.view().zoom() * 100.0);
    if let Some(element) = controller.hover_element() {
        text.push_str(" | ");
        text.push_str(&describe(element, model));
    }
    let selected = controller.selection().elements().len();
    if selected > 0 {
        text.push_str(&format!(" | {selected} selected"));
    }
    text
}

fn describe(element: &Element, model: &GraphModel) -> String {
    let title = |id: NodeId| model.node(id).map_or_else(|| "?".to_owned(), |n| n.title.clone());
    match element {
        Element::Node(id) => format!("'{}'", title(*id)),
        Element::Item(item) => format!("'{}' item", title(item.node)),
        Element::Connector(connector) => match connector.direction {
            ConnectorDirection::Input => format!("'{}' input", title(connector.node)),
            ConnectorDirection::Output => format!("'{}' output", title(connector.node)),
        },
        Element::Connection(_) => "connection".to_owned(),
        Element::Selection(nodes) => format!("{} nodes", nodes.len()),
    }
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{connector, typed_node};
    use egui::{CentralPanel, Context, Key, Modifiers, PointerButton, Pos2, RawInput};

    struct Host {
        text: String,
        focus_text: bool,
        view: GraphView,
        model: GraphModel,
    }

    impl Host {
        fn new(node: Node) -> Self {
            let mut model = GraphModel::new();
            model.add_node(node);
            Self {
                text: "label".to_owned(),
                focus_text: false,
                view: GraphView::new(),
                model,
            }
        }

        fn frame(&mut self, ctx: &Context, events: Vec<Event>) {
            let input = RawInput {
                screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| {
                CentralPanel::default().show(ctx, |ui| {
                    let text = ui.text_edit_singleline(&mut self.text);
                    if std::mem::take(&mut self.focus_text) {
                        text.request_focus();
                    }
                    self.view.show(ui, &mut self.model);
                });
            });
        }
    }

    fn key(key: Key) -> Event {
        Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: Modifiers::NONE,
        }
    }

    fn button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn test_keys_stay_with_focused_text_edit() {
        let node = Node::new("Keep").with_location(200.0, 200.0);
        let id = node.id();
        let mut host = Host::new(node);
        host.view.controller_mut().set_focus(Some(Element::Node(id)));
        let ctx = Context::default();

        host.focus_text = true;
        host.frame(&ctx, Vec::new());
        let over_graph = Pos2::new(650.0, 520.0);
        host.frame(
            &ctx,
            vec![Event::PointerMoved(over_graph), key(Key::Backspace), key(Key::Delete)],
        );
        assert!(host.model.contains_node(id));
        assert_eq!(host.view.controller().selection().elements(), &[Element::Node(id)]);
    }

    #[test]
    fn test_click_gives_view_the_keyboard() {
        let node = Node::new("Drop").with_location(200.0, 200.0);
        let id = node.id();
        let mut host = Host::new(node);
        let ctx = Context::default();

        host.focus_text = true;
        host.frame(&ctx, Vec::new());
        let title = host
            .model
            .node(id)
            .map(|n| n.title_bounds().center())
            .expect("node");
        let at = host.view.controller().view().to_screen(title);
        host.frame(&ctx, vec![Event::PointerMoved(at), button(at, true)]);
        host.frame(&ctx, vec![button(at, false)]);
        assert_eq!(host.view.controller().selection().elements(), &[Element::Node(id)]);

        host.frame(&ctx, vec![key(Key::Delete)]);
        assert!(!host.model.contains_node(id));
    }

    #[test]
    fn test_status_text_follows_interaction() {
        let mut model = GraphModel::new();
        let node = typed_node("Blend", &["color"], &[]).with_location(0.0, 0.0);
        let id = node.id();
        model.add_node(node);
        let mut controller = GraphController::new();
        controller.layout(&mut model);
        assert_eq!(status_text(&controller, &model), "edit 100%");

        let input = connector(&model, id, ConnectorDirection::Input, 0);
        let at = model.connector(input).map(|c| c.anchor).expect("anchor");
        controller.mouse_move(&mut model, at);
        assert_eq!(status_text(&controller, &model), "edit 100% | 'Blend' input");

        controller.set_focus(Some(Element::Node(id)));
        controller.wheel(-480.0);
        assert_eq!(status_text(&controller, &model), "edit 50% | 'Blend' input | 1 selected");
    }
}
