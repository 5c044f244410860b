// SPDX-License-Identifier: MIT OR Apache-2.0
//! Painting of a laid-out graph with egui.
//!
//! Everything here reads geometry computed by [`crate::layout`] and maps it
//! through the view transform; nothing is measured while painting.

use crate::connector::{ConnectorDirection, ConnectorRef};
use crate::constants::{
    ARROW_SIZE, CONNECTOR_CORNER_SIZE, CONNECTOR_STATUS_INSET, CORNER_SIZE, LABEL_FONT_SIZE,
    TITLE_FONT_SIZE,
};
use crate::control::{DragPreview, GraphController};
use crate::geometry::{is_laid_out, ViewTransform};
use crate::item::{ItemPaint, ItemSide, NodeItem, ITEM_TEXT_COLOR};
use crate::model::GraphModel;
use crate::node::Node;
use crate::routing::{route, RouteStyle};
use crate::settings::GraphSettings;
use crate::state::{ElementKey, RenderState, RenderStates};
use egui::{Align2, Color32, Pos2, Rect, Shape, Stroke, Vec2};
use std::collections::HashSet;

const BACKGROUND: Color32 = Color32::from_rgb(32, 32, 36);
const NODE_FILL: Color32 = Color32::from_rgb(245, 245, 245);
const NODE_BORDER: Color32 = Color32::from_gray(90);
const FOCUS_BORDER: Color32 = Color32::from_rgb(100, 150, 255);
const SUBGRAPH_FILL: Color32 = Color32::from_rgba_premultiplied(60, 70, 90, 60);
const GRID_MINOR: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 100);
const GRID_MAJOR: Color32 = Color32::from_rgba_premultiplied(70, 70, 70, 150);
/// Small grid lines closer than this on screen are skipped.
const MIN_GRID_SPACING: f32 = 4.0;

/// Fill color of an element in a render state.
///
/// Hovered and dragged elements use the bright variants; compatibility
/// flags take precedence over the plain colors.
pub fn state_color(state: RenderState) -> Color32 {
    if state.intersects(RenderState::HOVER | RenderState::DRAGGING) {
        if state.contains(RenderState::INCOMPATIBLE) {
            Color32::RED
        } else if state.contains(RenderState::CONVERSION) {
            Color32::from_rgb(222, 184, 135)
        } else {
            Color32::from_rgb(255, 250, 205)
        }
    } else if state.contains(RenderState::INCOMPATIBLE) {
        Color32::from_rgb(128, 128, 128)
    } else if state.contains(RenderState::COMPATIBLE) {
        Color32::from_rgb(0, 128, 0)
    } else if state.contains(RenderState::CONVERSION) {
        Color32::from_rgb(173, 216, 230)
    } else {
        Color32::from_rgb(211, 211, 211)
    }
}

/// Graph-space coordinates of grid lines between `min` and `max`.
pub fn grid_lines(min: f32, max: f32, step: f32) -> Vec<f32> {
    if step <= 0.0 || !min.is_finite() || !max.is_finite() || max < min {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut value = (min / step).floor() * step;
    while value <= max {
        if value >= min {
            lines.push(value);
        }
        value += step;
    }
    lines
}

/// Text area of a connector box, beside its status square.
pub fn connector_text_rect(bounds: Rect, direction: ConnectorDirection) -> Rect {
    let status = (bounds.height() - CONNECTOR_STATUS_INSET).max(0.0);
    match direction {
        ConnectorDirection::Input => Rect::from_min_max(
            Pos2::new(bounds.left() + status + 8.0, bounds.top()),
            Pos2::new(bounds.right() - 4.0, bounds.bottom()),
        ),
        ConnectorDirection::Output => Rect::from_min_max(
            Pos2::new(bounds.left() + 4.0, bounds.top()),
            Pos2::new(bounds.right() - status - 8.0, bounds.bottom()),
        ),
    }
}

/// Status square of a connector, centered on its anchor.
pub fn connector_status_rect(bounds: Rect, anchor: Pos2) -> Rect {
    let status = (bounds.height() - CONNECTOR_STATUS_INSET).max(0.0);
    Rect::from_center_size(anchor, Vec2::splat(status))
}

/// Paints one frame of a graph view.
pub struct GraphPainter<'a> {
    painter: &'a egui::Painter,
    view: &'a ViewTransform,
    states: &'a RenderStates,
    settings: &'a GraphSettings,
    connected: HashSet<ConnectorRef>,
}

impl<'a> GraphPainter<'a> {
    /// Create a painter for the current frame.
    pub fn new(
        painter: &'a egui::Painter,
        view: &'a ViewTransform,
        states: &'a RenderStates,
        settings: &'a GraphSettings,
    ) -> Self {
        Self {
            painter,
            view,
            states,
            settings,
            connected: HashSet::new(),
        }
    }

    /// Paint everything the controller shows: grid, sub-graphs,
    /// connections, nodes back to front, drag preview and marquee.
    pub fn paint(mut self, model: &GraphModel, controller: &GraphController) {
        self.connected = model
            .connections()
            .flat_map(|c| [c.from(), c.to()])
            .flatten()
            .collect();

        self.painter
            .rect_filled(self.view.viewport, 0.0, BACKGROUND);
        if self.settings.show_grid {
            self.grid();
        }
        for node in model.sub_graphs() {
            self.sub_graph(node);
        }
        self.connections(model);
        let nodes: Vec<&Node> = model.nodes().collect();
        for node in nodes.into_iter().rev() {
            self.node(node);
        }
        if let Some(preview) = controller.drag_preview() {
            self.drag_preview(model, &preview);
        }
        if let Some(rect) = controller.marquee_rect() {
            self.marquee(rect);
        }
    }

    fn state(&self, key: ElementKey) -> RenderState {
        self.states.get(key)
    }

    fn item_paint(&self, state: RenderState) -> ItemPaint<'_> {
        ItemPaint {
            painter: self.painter,
            view: self.view,
            state,
        }
    }

    fn grid(&self) {
        let visible = self.view.rect_to_graph(self.view.viewport);
        let zoom = self.view.zoom();
        let viewport = self.view.viewport;
        let mut steps = Vec::with_capacity(2);
        if self.settings.small_grid_step * zoom >= MIN_GRID_SPACING {
            steps.push((self.settings.small_grid_step, GRID_MINOR));
        }
        steps.push((self.settings.large_grid_step, GRID_MAJOR));

        for (step, color) in steps {
            let stroke = Stroke::new(1.0, color);
            for x in grid_lines(visible.left(), visible.right(), step) {
                let sx = self.view.to_screen(Pos2::new(x, 0.0)).x;
                self.painter.line_segment(
                    [Pos2::new(sx, viewport.top()), Pos2::new(sx, viewport.bottom())],
                    stroke,
                );
            }
            for y in grid_lines(visible.top(), visible.bottom(), step) {
                let sy = self.view.to_screen(Pos2::new(0.0, y)).y;
                self.painter.line_segment(
                    [Pos2::new(viewport.left(), sy), Pos2::new(viewport.right(), sy)],
                    stroke,
                );
            }
        }
    }

    fn title(&self, node: &Node, state: RenderState) {
        let rect = self.view.rect_to_screen(node.title_bounds());
        let rounding = CORNER_SIZE * self.view.zoom();
        self.painter.rect_filled(rect, rounding, state_color(state));
        self.item_paint(state).text(
            node.title_bounds().center(),
            Align2::CENTER_CENTER,
            &node.title,
            TITLE_FONT_SIZE,
            ITEM_TEXT_COLOR,
        );
    }

    fn border(&self, rect: Rect, rounding: f32, state: RenderState) {
        let stroke = if state.contains(RenderState::FOCUS) {
            Stroke::new(2.0, FOCUS_BORDER)
        } else {
            Stroke::new(1.0, NODE_BORDER)
        };
        self.painter.rect_stroke(rect, rounding, stroke);
    }

    fn node(&self, node: &Node) {
        if !is_laid_out(node.bounds()) {
            return;
        }
        let screen = self.view.rect_to_screen(node.bounds());
        if !screen.intersects(self.view.viewport) {
            return;
        }
        let state = self.state(ElementKey::Node(node.id()));
        let rounding = CORNER_SIZE * self.view.zoom();

        if node.collapsed_in(state) {
            self.painter.rect_filled(screen, rounding, state_color(state));
            self.border(screen, rounding, state);
            self.item_paint(state).text(
                node.bounds().center(),
                Align2::CENTER_CENTER,
                &node.title,
                TITLE_FONT_SIZE,
                ITEM_TEXT_COLOR,
            );
            for item in node.items() {
                for direction in [ConnectorDirection::Input, ConnectorDirection::Output] {
                    self.collapsed_connector(item, direction);
                }
            }
            return;
        }

        self.painter.rect_filled(screen, rounding, NODE_FILL);
        self.title(node, state);
        for item in node.items() {
            let item_state = self.state(ElementKey::Item(item.id()));
            if item.side() == ItemSide::Center {
                item.widget().render(&self.item_paint(item_state), item.bounds());
            }
            for direction in [ConnectorDirection::Input, ConnectorDirection::Output] {
                self.connector(item, direction);
            }
        }
        self.border(screen, rounding, state);
    }

    fn connector_state(&self, item: &NodeItem, direction: ConnectorDirection) -> Option<(ConnectorRef, RenderState)> {
        let connector = item.connector_ref(direction)?;
        let mut state = self.state(ElementKey::Connector(connector));
        if self.connected.contains(&connector) {
            state |= RenderState::CONNECTED;
        }
        Some((connector, state))
    }

    fn collapsed_connector(&self, item: &NodeItem, direction: ConnectorDirection) {
        let Some((_, state)) = self.connector_state(item, direction) else {
            return;
        };
        let facet = item.connector(direction);
        if !is_laid_out(facet.bounds) {
            return;
        }
        let center = self.view.to_screen(facet.anchor);
        let radius = facet.bounds.width() / 2.0 * self.view.zoom();
        self.painter.circle_filled(center, radius, state_color(state));
        self.painter
            .circle_stroke(center, radius, Stroke::new(1.0, NODE_BORDER));
    }

    fn connector(&self, item: &NodeItem, direction: ConnectorDirection) {
        let Some((_, state)) = self.connector_state(item, direction) else {
            return;
        };
        let facet = item.connector(direction);
        if !is_laid_out(facet.bounds) {
            return;
        }
        let zoom = self.view.zoom();
        let rect = self.view.rect_to_screen(facet.bounds);
        self.painter
            .rect_filled(rect, CONNECTOR_CORNER_SIZE * zoom, state_color(state));
        self.painter
            .rect_stroke(rect, CONNECTOR_CORNER_SIZE * zoom, Stroke::new(1.0, NODE_BORDER));

        let status = self
            .view
            .rect_to_screen(connector_status_rect(facet.bounds, facet.anchor));
        if state.contains(RenderState::CONNECTED) {
            self.painter.rect_filled(status, 0.0, NODE_BORDER);
        } else {
            self.painter
                .rect_stroke(status, 0.0, Stroke::new(1.0, NODE_BORDER));
        }

        item.widget().render_connector(
            &self.item_paint(state),
            connector_text_rect(facet.bounds, direction),
        );
    }

    fn sub_graph(&self, node: &Node) {
        if !is_laid_out(node.bounds()) {
            return;
        }
        let state = self.state(ElementKey::Node(node.id()));
        let rounding = CORNER_SIZE * self.view.zoom();
        let screen = self.view.rect_to_screen(node.bounds());
        self.painter.rect_filled(screen, rounding, SUBGRAPH_FILL);
        self.border(screen, rounding, state);
        self.title(node, state);
        for item in node.items() {
            for direction in [ConnectorDirection::Input, ConnectorDirection::Output] {
                self.connector(item, direction);
            }
        }
    }

    fn curve(&self, from: Pos2, to: Pos2, state: RenderState) {
        let style = if state.intersects(RenderState::HOVER | RenderState::DRAGGING | RenderState::FOCUS) {
            RouteStyle::highlighted()
        } else {
            RouteStyle::normal()
        };
        let path = route(from, to, &style);
        if path.centerline.len() < 2 {
            return;
        }
        let zoom = self.view.zoom();
        let color = state_color(state);
        let points: Vec<Pos2> = path.centerline.iter().map(|p| self.view.to_screen(*p)).collect();
        self.painter
            .add(Shape::line(points, Stroke::new(style.start_width * 2.0 * zoom, color)));
        if style.arrow {
            let tip = [
                Pos2::new(to.x - ARROW_SIZE, to.y + ARROW_SIZE),
                Pos2::new(to.x + 1.0, to.y),
                Pos2::new(to.x - ARROW_SIZE, to.y - ARROW_SIZE),
            ]
            .map(|p| self.view.to_screen(p));
            self.painter
                .add(Shape::convex_polygon(tip.to_vec(), color, Stroke::NONE));
        }
    }

    fn label(&self, text_bounds: Rect, text: &str, state: RenderState) {
        if !is_laid_out(text_bounds) || text.is_empty() {
            return;
        }
        let rect = self.view.rect_to_screen(text_bounds);
        let rounding = CONNECTOR_CORNER_SIZE * self.view.zoom();
        self.painter.rect_filled(rect, rounding, state_color(state));
        self.painter
            .rect_stroke(rect, rounding, Stroke::new(1.0, NODE_BORDER));
        self.item_paint(state).text(
            text_bounds.center(),
            Align2::CENTER_CENTER,
            text,
            LABEL_FONT_SIZE,
            ITEM_TEXT_COLOR,
        );
    }

    fn connections(&self, model: &GraphModel) {
        let anchor = |c: Option<ConnectorRef>| c.and_then(|c| model.connector(c)).map(|c| c.anchor);
        for connection in model.connections() {
            let state = self.state(ElementKey::Connection(connection.id()));
            match (anchor(connection.from()), anchor(connection.to())) {
                (Some(from), Some(to)) => {
                    self.curve(from, to, state);
                    if self.settings.show_labels {
                        self.label(connection.text_bounds(), &connection.label_text(), state);
                    }
                }
                // Bindings only show their label.
                _ => self.label(connection.text_bounds(), &connection.label_text(), state),
            }
        }
    }

    fn drag_preview(&self, model: &GraphModel, preview: &DragPreview) {
        let Some(anchor) = model.connector(preview.connector).map(|c| c.anchor) else {
            return;
        };
        match preview.connector.direction {
            ConnectorDirection::Output => self.curve(anchor, preview.location, preview.state),
            ConnectorDirection::Input => self.curve(preview.location, anchor, preview.state),
        }
    }

    fn marquee(&self, rect: Rect) {
        let rect = self.view.rect_to_screen(rect);
        self.painter
            .rect_filled(rect, 0.0, Color32::from_rgba_unmultiplied(100, 150, 255, 30));
        self.painter
            .rect_stroke(rect, 0.0, Stroke::new(1.0, FOCUS_BORDER));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_colors() {
        assert_eq!(state_color(RenderState::NONE), Color32::from_rgb(211, 211, 211));
        assert_eq!(state_color(RenderState::COMPATIBLE), Color32::from_rgb(0, 128, 0));
        assert_eq!(
            state_color(RenderState::HOVER | RenderState::INCOMPATIBLE),
            Color32::RED
        );
        assert_eq!(
            state_color(RenderState::DRAGGING | RenderState::CONVERSION),
            Color32::from_rgb(222, 184, 135)
        );
        // Incompatible wins over compatible at rest.
        assert_eq!(
            state_color(RenderState::COMPATIBLE | RenderState::INCOMPATIBLE),
            Color32::from_rgb(128, 128, 128)
        );
    }

    #[test]
    fn test_grid_lines_cover_range() {
        assert_eq!(grid_lines(-20.0, 40.0, 16.0), vec![-16.0, 0.0, 16.0, 32.0]);
        assert_eq!(grid_lines(0.0, 0.0, 16.0), vec![0.0]);
        assert!(grid_lines(0.0, 100.0, 0.0).is_empty());
        assert!(grid_lines(10.0, 0.0, 16.0).is_empty());
    }

    #[test]
    fn test_connector_text_beside_status() {
        let bounds = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(60.0, 20.0));
        let input = connector_text_rect(bounds, ConnectorDirection::Input);
        assert_eq!(input.left(), 20.0);
        assert_eq!(input.right(), 56.0);
        let output = connector_text_rect(bounds, ConnectorDirection::Output);
        assert_eq!(output.left(), 4.0);
        assert_eq!(output.right(), 40.0);

        let status = connector_status_rect(bounds, Pos2::new(10.0, 10.0));
        assert_eq!(status.size(), Vec2::splat(12.0));
    }
}
