// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layout of nodes, items, sub-graph boxes and connection geometry.
//!
//! Layout is a pure function of the model, the render-state overlay and the
//! text metrics: running it twice yields the same bounds.

use crate::connection::ConnectionId;
use crate::connector::ConnectorDirection;
use crate::constants::{
    BOTTOM_HEIGHT, BOTTOM_HEIGHT_COLLAPSED, CIRCULAR_NODE_SIZE, COLLAPSED_CONNECTOR_SIZE,
    CONNECTOR_STATUS_INSET, CONNECTOR_STATUS_WIDTH, HORIZONTAL_SPACING, ITEM_SPACING,
    LABEL_FONT_SIZE, LABEL_OFFSET, NODE_EXTRA_WIDTH, SUBGRAPH_BORDER, SUBGRAPH_DEFAULT_SIZE,
    TITLE_FONT_SIZE, TITLE_PADDING, TOP_HEIGHT, TOP_HEIGHT_COLLAPSED,
};
use crate::geometry::union_rects;
use crate::item::{ItemDock, ItemSide, NodeItem, TextMeasure};
use crate::model::GraphModel;
use crate::node::{Node, NodeLayout};
use crate::routing::{route, RouteStyle};
use crate::state::{ElementKey, RenderState, RenderStates};
use egui::{Pos2, Rect, Vec2};
use std::collections::HashMap;
use std::f32::consts::{PI, SQRT_2};

/// Padding around connection label text.
const LABEL_PADDING: Vec2 = Vec2::new(4.0, 2.0);

/// Stacking column of items.
#[derive(Debug, Clone, Copy, Default)]
struct Column {
    width: f32,
    height: f32,
    count: usize,
}

impl Column {
    fn add(&mut self, size: Vec2) {
        self.width = self.width.max(size.x);
        if self.count > 0 {
            self.height += ITEM_SPACING;
        }
        self.height += size.y;
        self.count += 1;
    }
}

/// Size of a node title row.
pub fn title_size(node: &Node, measure: &dyn TextMeasure) -> Vec2 {
    measure.measure_text(&node.title, TITLE_FONT_SIZE) + TITLE_PADDING
}

/// Size of an item drawn as a connector: room for the status indicator
/// is added to its measured size.
pub fn connector_size(size: Vec2) -> Vec2 {
    Vec2::new(
        size.x + CONNECTOR_STATUS_WIDTH + (size.y - CONNECTOR_STATUS_INSET).max(0.0),
        size.y,
    )
}

fn measured(item: &NodeItem, measure: &dyn TextMeasure) -> Vec2 {
    let size = item.widget().measure(measure);
    if item.side() == ItemSide::Center {
        size
    } else {
        connector_size(size)
    }
}

/// Anchor of a connector box: the center of its status indicator, on the
/// outer side of the box.
pub fn connector_anchor(bounds: Rect, direction: ConnectorDirection) -> Pos2 {
    let status = (bounds.height() - CONNECTOR_STATUS_INSET).max(0.0);
    let x = match direction {
        ConnectorDirection::Input => bounds.left() + status / 2.0 + CONNECTOR_STATUS_INSET / 2.0,
        ConnectorDirection::Output => bounds.right() - status / 2.0 - CONNECTOR_STATUS_INSET / 2.0,
    };
    Pos2::new(x, bounds.center().y)
}

fn place_connector(item: &mut NodeItem, direction: ConnectorDirection, bounds: Rect) {
    let connector = item.connector_mut(direction);
    connector.bounds = bounds;
    connector.anchor = connector_anchor(bounds, direction);
}

fn place_side_item(item: &mut NodeItem, input: Rect, output: Rect) {
    if item.input.enabled {
        place_connector(item, ConnectorDirection::Input, input);
        item.bounds = input;
    }
    if item.output.enabled {
        place_connector(item, ConnectorDirection::Output, output);
        if !item.input.enabled {
            item.bounds = output;
        }
    }
}

/// Center items in dock order; bottom items only while hovered.
fn center_order(items: &[NodeItem], hovered: bool) -> Vec<usize> {
    let mut order = Vec::new();
    for dock in [ItemDock::Top, ItemDock::Center, ItemDock::Bottom] {
        if dock == ItemDock::Bottom && !hovered {
            continue;
        }
        order.extend(
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.side() == ItemSide::Center && item.dock == dock)
                .map(|(index, _)| index),
        );
    }
    order
}

fn side_order(items: &[NodeItem], side: ItemSide) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.side() == side)
        .map(|(index, _)| index)
        .collect()
}

/// Lay out one graph node.
pub fn layout_node(node: &mut Node, state: RenderState, measure: &dyn TextMeasure) {
    for item in node.items_mut() {
        item.reset_layout();
    }
    let hovered = state.contains(RenderState::HOVER);
    if node.collapsed_in(state) {
        layout_collapsed(node, measure);
    } else {
        match node.layout {
            NodeLayout::Rectangular => layout_rectangular(node, hovered, measure),
            NodeLayout::Circular => layout_circular(node, hovered, measure),
        }
    }
    update_connector_bounds(node);
}

fn update_connector_bounds(node: &mut Node) {
    node.input_bounds = union_rects(
        node.connectors(ConnectorDirection::Input)
            .map(|item| item.input.bounds),
    );
    node.output_bounds = union_rects(
        node.connectors(ConnectorDirection::Output)
            .map(|item| item.output.bounds),
    );
}

fn layout_rectangular(node: &mut Node, hovered: bool, measure: &dyn TextMeasure) {
    let title = title_size(node, measure);
    let center = center_order(node.items(), hovered);
    let inputs = side_order(node.items(), ItemSide::Input);
    let outputs = side_order(node.items(), ItemSide::Output);
    let sizes: Vec<Vec2> = node.items().iter().map(|item| measured(item, measure)).collect();

    let mut columns = [Column::default(); 3];
    columns[1].add(title);
    for &index in &center {
        columns[1].add(sizes[index]);
    }
    for &index in &inputs {
        columns[0].add(sizes[index]);
    }
    for &index in &outputs {
        columns[2].add(sizes[index]);
    }

    let width = columns[1].width + NODE_EXTRA_WIDTH;
    let content = columns.iter().map(|c| c.height).fold(0.0, f32::max);
    let height = TOP_HEIGHT + content + BOTTOM_HEIGHT;
    let bounds = Rect::from_min_size(node.location, Vec2::new(width, height));
    node.bounds = bounds;

    let inner_left = bounds.left() + HORIZONTAL_SPACING;
    let mut y = bounds.top() + TOP_HEIGHT;
    node.title_bounds = Rect::from_min_size(Pos2::new(inner_left, y), Vec2::new(columns[1].width, title.y));
    y += title.y + ITEM_SPACING;

    let items = node.items_mut();
    let mut items_bounds = Rect::NOTHING;
    for &index in &center {
        let rect = Rect::from_min_size(Pos2::new(inner_left, y), Vec2::new(columns[1].width, sizes[index].y));
        items[index].bounds = rect;
        items_bounds = items_bounds.union(rect);
        y += sizes[index].y + ITEM_SPACING;
    }

    let mut y = bounds.top() + TOP_HEIGHT;
    for &index in &inputs {
        let size = Vec2::new(columns[0].width, sizes[index].y);
        let input = Rect::from_min_size(Pos2::new(bounds.left() - size.x, y), size);
        let output = Rect::from_min_size(Pos2::new(bounds.right(), y), size);
        place_side_item(&mut items[index], input, output);
        y += size.y + ITEM_SPACING;
    }

    let mut y = bounds.top() + TOP_HEIGHT;
    for &index in &outputs {
        let size = Vec2::new(columns[2].width, sizes[index].y);
        let output = Rect::from_min_size(Pos2::new(bounds.right(), y), size);
        place_side_item(&mut items[index], Rect::NOTHING, output);
        y += size.y + ITEM_SPACING;
    }
    node.items_bounds = items_bounds;
}

/// Point on the half circle at the edge of a collapsed node.
fn arc_point(center: Pos2, radius: f32, index: usize, count: usize, direction: ConnectorDirection) -> Pos2 {
    let angle = (index as f32 + 0.5) / count as f32 * PI;
    let dx = radius * angle.sin();
    let dy = -radius * angle.cos();
    match direction {
        ConnectorDirection::Input => Pos2::new(center.x - dx, center.y + dy),
        ConnectorDirection::Output => Pos2::new(center.x + dx, center.y + dy),
    }
}

fn layout_collapsed(node: &mut Node, measure: &dyn TextMeasure) {
    let title = title_size(node, measure);
    let size = Vec2::new(
        title.x + NODE_EXTRA_WIDTH,
        TOP_HEIGHT_COLLAPSED + title.y + BOTTOM_HEIGHT_COLLAPSED,
    );
    let bounds = Rect::from_min_size(node.location, size);
    node.bounds = bounds;
    node.title_bounds = Rect::from_min_size(
        bounds.min + Vec2::new(HORIZONTAL_SPACING, TOP_HEIGHT_COLLAPSED),
        title,
    );
    node.items_bounds = Rect::NOTHING;

    let radius = bounds.height() / 2.0;
    for (direction, edge_x) in [
        (ConnectorDirection::Input, bounds.left()),
        (ConnectorDirection::Output, bounds.right()),
    ] {
        let center = Pos2::new(edge_x, bounds.center().y);
        let count = node.connectors(direction).count();
        let mut index = 0;
        for item in node.items_mut() {
            if !item.connector(direction).enabled {
                continue;
            }
            let point = arc_point(center, radius, index, count, direction);
            let connector = item.connector_mut(direction);
            connector.bounds = Rect::from_center_size(point, Vec2::splat(COLLAPSED_CONNECTOR_SIZE));
            connector.anchor = point;
            index += 1;
        }
    }
}

fn layout_circular(node: &mut Node, hovered: bool, measure: &dyn TextMeasure) {
    let title = title_size(node, measure);
    let sizes: Vec<Vec2> = node.items().iter().map(|item| measured(item, measure)).collect();
    let bounds = Rect::from_min_size(node.location, Vec2::splat(CIRCULAR_NODE_SIZE));
    let center = bounds.center();
    node.bounds = bounds;

    let docked = |dock: ItemDock| -> Vec<usize> {
        node.items()
            .iter()
            .enumerate()
            .filter(|(_, item)| item.side() == ItemSide::Center && item.dock == dock)
            .map(|(index, _)| index)
            .collect()
    };
    let top = docked(ItemDock::Top);
    let middle = docked(ItemDock::Center);
    let bottom = if hovered { docked(ItemDock::Bottom) } else { Vec::new() };
    let inputs = side_order(node.items(), ItemSide::Input);
    let outputs = side_order(node.items(), ItemSide::Output);

    let stack_height = |indices: &[usize]| -> f32 {
        let mut column = Column::default();
        for &index in indices {
            column.add(sizes[index]);
        }
        column.height
    };

    // Title and top items sit above the box, title first.
    let top_height = title.y + ITEM_SPACING + stack_height(&top);
    let mut y = bounds.top() - ITEM_SPACING - top_height;
    node.title_bounds = Rect::from_min_size(Pos2::new(center.x - title.x / 2.0, y), title);
    y += title.y + ITEM_SPACING;

    let items = node.items_mut();
    for &index in &top {
        let size = sizes[index];
        items[index].bounds = Rect::from_min_size(Pos2::new(center.x - size.x / 2.0, y), size);
        y += size.y + ITEM_SPACING;
    }

    let mut items_bounds = Rect::NOTHING;
    let mut y = center.y - stack_height(&middle) / 2.0;
    for &index in &middle {
        let size = sizes[index];
        let rect = Rect::from_min_size(Pos2::new(center.x - size.x / 2.0, y), size);
        let rect = rect.expand((SQRT_2 - 1.0) / 2.0 * size.x.max(size.y));
        items[index].bounds = rect;
        items_bounds = items_bounds.union(rect);
        y += size.y + ITEM_SPACING;
    }

    let mut y = bounds.bottom() + ITEM_SPACING;
    for &index in &bottom {
        let size = sizes[index];
        items[index].bounds = Rect::from_min_size(Pos2::new(center.x - size.x / 2.0, y), size);
        y += size.y + ITEM_SPACING;
    }

    let mut y = center.y - stack_height(&inputs) / 2.0;
    for &index in &inputs {
        let size = sizes[index];
        let input = Rect::from_min_size(Pos2::new(bounds.left() - size.x, y), size);
        let output = Rect::from_min_size(Pos2::new(bounds.right(), y), size);
        place_side_item(&mut items[index], input, output);
        y += size.y + ITEM_SPACING;
    }

    let mut y = center.y - stack_height(&outputs) / 2.0;
    for &index in &outputs {
        let size = sizes[index];
        let output = Rect::from_min_size(Pos2::new(bounds.right(), y), size);
        place_side_item(&mut items[index], Rect::NOTHING, output);
        y += size.y + ITEM_SPACING;
    }
    node.items_bounds = items_bounds;
}

/// Lay out a sub-graph box around the bounds of its members.
///
/// Without members the box keeps its location and a default size. The
/// output column is placed outside the member bounds.
pub fn layout_sub_graph(node: &mut Node, members: Option<Rect>, measure: &dyn TextMeasure) {
    for item in node.items_mut() {
        item.reset_layout();
    }
    let title = title_size(node, measure);
    let sizes: Vec<Vec2> = node.items().iter().map(|item| measured(item, measure)).collect();
    let inputs = side_order(node.items(), ItemSide::Input);
    let outputs = side_order(node.items(), ItemSide::Output);

    let mut input_column = Column::default();
    for &index in &inputs {
        input_column.add(sizes[index]);
    }
    let mut output_column = Column::default();
    for &index in &outputs {
        output_column.add(sizes[index]);
    }

    let left = SUBGRAPH_BORDER + input_column.width;
    let right = SUBGRAPH_BORDER + output_column.width;
    let top = SUBGRAPH_BORDER + title.y;
    let bottom = SUBGRAPH_BORDER;

    let mut inner = members
        .unwrap_or_else(|| Rect::from_min_size(node.location + Vec2::new(left, top), SUBGRAPH_DEFAULT_SIZE));
    let column_height = input_column.height.max(output_column.height);
    if inner.height() < column_height {
        inner.max.y = inner.min.y + column_height;
    }

    let bounds = Rect::from_min_max(inner.min - Vec2::new(left, top), inner.max + Vec2::new(right, bottom));
    node.location = bounds.min;
    node.bounds = bounds;
    node.title_bounds = Rect::from_min_size(bounds.min + Vec2::splat(SUBGRAPH_BORDER / 2.0), title);
    node.items_bounds = Rect::NOTHING;

    let items = node.items_mut();
    let mut y = inner.top();
    for &index in &inputs {
        let size = Vec2::new(input_column.width, sizes[index].y);
        let input = Rect::from_min_size(Pos2::new(bounds.left() + SUBGRAPH_BORDER / 2.0, y), size);
        let output = Rect::from_min_size(Pos2::new(inner.right() + SUBGRAPH_BORDER / 2.0, y), size);
        place_side_item(&mut items[index], input, output);
        y += size.y + ITEM_SPACING;
    }
    let mut y = inner.top();
    for &index in &outputs {
        let size = Vec2::new(output_column.width, sizes[index].y);
        let output = Rect::from_min_size(Pos2::new(inner.right() + SUBGRAPH_BORDER / 2.0, y), size);
        place_side_item(&mut items[index], Rect::NOTHING, output);
        y += size.y + ITEM_SPACING;
    }
    update_connector_bounds(node);
}

/// Label box: right-aligned on `anchor`, or left-aligned when `leading`.
fn label_bounds(anchor: Pos2, text: &str, leading: bool, measure: &dyn TextMeasure) -> Rect {
    if text.is_empty() {
        return Rect::NOTHING;
    }
    let size = measure.measure_text(text, LABEL_FONT_SIZE) + LABEL_PADDING;
    let min_x = if leading { anchor.x } else { anchor.x - size.x };
    Rect::from_min_size(Pos2::new(min_x, anchor.y - size.y / 2.0), size)
}

struct ConnectionGeometry {
    id: ConnectionId,
    bounds: Rect,
    text_bounds: Rect,
    center: Pos2,
}

fn layout_connections(model: &mut GraphModel, measure: &dyn TextMeasure) {
    let geometry: Vec<ConnectionGeometry> = model
        .connections()
        .map(|connection| {
            let anchor = |endpoint: Option<crate::connector::ConnectorRef>| {
                endpoint.and_then(|c| model.connector(c)).map(|c| c.anchor)
            };
            let text = connection.label_text();
            match (anchor(connection.from()), anchor(connection.to())) {
                (Some(from), Some(to)) => {
                    let path = route(from, to, &RouteStyle::hit_test());
                    let text_bounds = label_bounds(path.center, &text, false, measure);
                    ConnectionGeometry {
                        id: connection.id(),
                        bounds: path.bounds(),
                        text_bounds,
                        center: path.center,
                    }
                }
                (None, Some(to)) => {
                    let center = to - Vec2::new(LABEL_OFFSET, 0.0);
                    let text_bounds = label_bounds(center, &text, false, measure);
                    ConnectionGeometry {
                        id: connection.id(),
                        bounds: text_bounds,
                        text_bounds,
                        center,
                    }
                }
                (Some(from), None) => {
                    let center = from + Vec2::new(LABEL_OFFSET, 0.0);
                    let text_bounds = label_bounds(center, &text, true, measure);
                    ConnectionGeometry {
                        id: connection.id(),
                        bounds: text_bounds,
                        text_bounds,
                        center,
                    }
                }
                (None, None) => ConnectionGeometry {
                    id: connection.id(),
                    bounds: Rect::NOTHING,
                    text_bounds: Rect::NOTHING,
                    center: Pos2::ZERO,
                },
            }
        })
        .collect();

    for entry in geometry {
        if let Some(connection) = model.connection_mut(entry.id) {
            connection.bounds = entry.bounds;
            connection.text_bounds = entry.text_bounds;
            connection.center = entry.center;
        }
    }
}

/// Lay out the whole model: graph nodes, then sub-graph boxes around their
/// members, then connection geometry.
pub fn perform_layout(model: &mut GraphModel, states: &RenderStates, measure: &dyn TextMeasure) {
    for node in model.nodes_mut() {
        let state = states.get(ElementKey::Node(node.id()));
        layout_node(node, state, measure);
    }

    let mut groups: HashMap<String, Rect> = HashMap::new();
    for node in model.nodes() {
        if let Some(tag) = &node.sub_graph_tag {
            let bounds = groups.entry(tag.clone()).or_insert(Rect::NOTHING);
            *bounds = bounds.union(node.bounds());
        }
    }
    for node in model.sub_graphs_mut() {
        let members = node
            .sub_graph_tag
            .as_ref()
            .and_then(|tag| groups.get(tag))
            .copied();
        layout_sub_graph(node, members, measure);
    }

    layout_connections(model, measure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{FixedTextMeasure, ItemWidget};
    use crate::items::LabelItem;
    use crate::model::tests::{connector, typed_node};

    const MEASURE: FixedTextMeasure = FixedTextMeasure {
        char_width: 0.5,
        line_height: 1.25,
    };

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_rectangular_columns() {
        // Title "Add": 3 * 6 + 8 = 26 wide, 15 + 4 = 19 tall.
        // Item "a": 5.5 + 6 = 11.5 wide, 13.75 + 4 = 17.75 tall;
        // as a connector 11.5 + 12 + 9.75 = 33.25 wide.
        let mut node = typed_node("Add", &["a", "b"], &["result"]).with_location(100.0, 50.0);
        layout_node(&mut node, RenderState::NONE, &MEASURE);

        let bounds = node.bounds();
        assert_eq!(bounds.min, Pos2::new(100.0, 50.0));
        assert!(close(bounds.width(), 26.0 + NODE_EXTRA_WIDTH));
        // Input column: 2 * 17.75 + 2 spacing
        assert!(close(bounds.height(), TOP_HEIGHT + 37.5 + BOTTOM_HEIGHT));

        let first = &node.items()[0];
        assert!(close(first.input.bounds.width(), 33.25));
        assert!(close(first.input.bounds.right(), 100.0));
        assert!(close(first.input.bounds.top(), 54.0));
        assert!(close(first.input.anchor.x, 100.0 - 33.25 + 17.75 / 2.0));
        assert!(close(first.input.anchor.y, 54.0 + 17.75 / 2.0));
        assert_eq!(first.bounds(), first.input.bounds);

        let output = &node.items()[2];
        assert!(close(output.output.bounds.left(), bounds.right()));
        assert!(close(output.output.anchor.x, output.output.bounds.right() - 17.75 / 2.0));
        assert!(!output.input.bounds.is_positive());
        assert!(node.input_bounds().is_positive());
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut node = typed_node("Multiply", &["x", "y"], &["out"])
            .with_item(NodeItem::new(LabelItem::new("note")))
            .with_location(-20.0, 7.5);
        layout_node(&mut node, RenderState::HOVER, &MEASURE);
        let first: Vec<Rect> = node.items().iter().map(NodeItem::bounds).collect();
        let first_bounds = node.bounds();
        layout_node(&mut node, RenderState::HOVER, &MEASURE);
        let second: Vec<Rect> = node.items().iter().map(NodeItem::bounds).collect();
        assert_eq!(first, second);
        assert_eq!(first_bounds, node.bounds());
    }

    #[test]
    fn test_zero_item_node_uses_collapsed_chrome() {
        let mut node = Node::new("Empty");
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        let title = title_size(&node, &MEASURE);
        assert!(close(
            node.bounds().height(),
            TOP_HEIGHT_COLLAPSED + title.y + BOTTOM_HEIGHT_COLLAPSED
        ));
        assert!(close(node.bounds().width(), title.x + NODE_EXTRA_WIDTH));
    }

    #[test]
    fn test_collapsed_connectors_sit_on_arc() {
        let mut node = typed_node("Sum", &["a"], &["x", "y"]);
        node.set_collapsed(true);
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        let bounds = node.bounds();
        let radius = bounds.height() / 2.0;

        // A single input sits at angle pi/2: straight left of the edge.
        let input = node.items()[0].input.anchor;
        assert!(close(input.x, bounds.left() - radius));
        assert!(close(input.y, bounds.center().y));
        assert!(!node.items()[0].bounds().is_positive());

        // Two outputs at pi/4 and 3pi/4, mirrored around the center line.
        let upper = node.items()[1].output.anchor;
        let lower = node.items()[2].output.anchor;
        assert!(upper.y < bounds.center().y && lower.y > bounds.center().y);
        assert!(close(upper.x, lower.x));
        assert!(close(upper.x, bounds.right() + radius * (PI / 4.0).sin()));
    }

    #[test]
    fn test_dragged_over_expands_collapsed_node() {
        let mut node = typed_node("Sum", &["a", "b"], &[]);
        node.set_collapsed(true);
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        let collapsed = node.bounds().height();
        layout_node(&mut node, RenderState::DRAGGED_OVER, &MEASURE);
        assert!(node.bounds().height() > collapsed);
        assert!(node.items()[0].input.bounds.width() > COLLAPSED_CONNECTOR_SIZE);
    }

    #[test]
    fn test_bottom_items_only_when_hovered() {
        let mut node = Node::new("Preview")
            .with_item(NodeItem::new(LabelItem::new("body")))
            .with_item(NodeItem::new(LabelItem::new("footer")).with_dock(ItemDock::Bottom));
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        let resting = node.bounds().height();
        assert!(!node.items()[1].bounds().is_positive());

        layout_node(&mut node, RenderState::HOVER, &MEASURE);
        assert!(node.bounds().height() > resting);
        assert!(node.items()[1].bounds().top() > node.items()[0].bounds().bottom());
    }

    #[test]
    fn test_top_items_come_before_center_items() {
        let mut node = Node::new("Docked")
            .with_item(NodeItem::new(LabelItem::new("center")))
            .with_item(NodeItem::new(LabelItem::new("top")).with_dock(ItemDock::Top));
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        assert!(node.items()[1].bounds().top() < node.items()[0].bounds().top());
        assert!(node.title_bounds().bottom() <= node.items()[1].bounds().top());
    }

    #[test]
    fn test_circular_layout() {
        let mut node = typed_node("Mix", &["a", "b"], &["out"])
            .with_layout(NodeLayout::Circular)
            .with_item(NodeItem::new(LabelItem::new("body")));
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        let bounds = node.bounds();
        assert_eq!(bounds.size(), Vec2::splat(CIRCULAR_NODE_SIZE));

        let a = node.items()[0].input.bounds;
        let b = node.items()[1].input.bounds;
        assert!(close(a.right(), bounds.left()));
        assert!(close((a.top() + b.bottom()) / 2.0, bounds.center().y));

        let out = node.items()[2].output.bounds;
        assert!(close(out.left(), bounds.right()));
        assert!(close(out.center().y, bounds.center().y));

        let body = node.items()[3].bounds();
        let size = LabelItem::new("body").measure(&MEASURE);
        let grow = (SQRT_2 - 1.0) / 2.0 * size.x.max(size.y);
        assert!(close(body.width(), size.x + 2.0 * grow));
        assert!(close(body.center().x, bounds.center().x));
        assert!(node.title_bounds().bottom() < bounds.top());
    }

    #[test]
    fn test_collapsed_circular_falls_back_to_rectangular() {
        let mut node = typed_node("Mix", &["a"], &[]).with_layout(NodeLayout::Circular);
        node.set_collapsed(true);
        layout_node(&mut node, RenderState::NONE, &MEASURE);
        assert!(node.bounds().width() < CIRCULAR_NODE_SIZE);
    }

    #[test]
    fn test_sub_graph_wraps_members() {
        let mut model = GraphModel::new();
        let mut group = typed_node("Group", &["in"], &["out"]).with_sub_graph_tag("g");
        group.location = Pos2::new(-500.0, -500.0);
        let group_id = group.id();
        model.add_sub_graph(group);
        model.add_node(typed_node("M1", &["x"], &["y"]).with_location(0.0, 0.0).with_sub_graph_tag("g"));
        model.add_node(typed_node("M2", &["x"], &["y"]).with_location(200.0, 100.0).with_sub_graph_tag("g"));

        perform_layout(&mut model, &RenderStates::new(), &MEASURE);
        let members = union_rects(model.sub_graph_members("g").map(Node::bounds));
        let group = model.node(group_id).expect("group");
        assert!(group.bounds().contains_rect(members));
        assert_eq!(group.location, group.bounds().min);

        let out = &group.items()[1].output.bounds;
        assert!(out.left() > members.right());
        let input = &group.items()[0].input.bounds;
        assert!(input.right() < members.left());
    }

    #[test]
    fn test_empty_sub_graph_default_size() {
        let mut group = Node::new("Group").with_location(10.0, 20.0);
        layout_sub_graph(&mut group, None, &MEASURE);
        let title = title_size(&group, &MEASURE);
        assert_eq!(group.bounds().min, Pos2::new(10.0, 20.0));
        assert!(close(
            group.bounds().width(),
            SUBGRAPH_DEFAULT_SIZE.x + 2.0 * SUBGRAPH_BORDER
        ));
        assert!(close(
            group.bounds().height(),
            SUBGRAPH_DEFAULT_SIZE.y + 2.0 * SUBGRAPH_BORDER + title.y
        ));
    }

    #[test]
    fn test_connection_geometry() {
        let mut model = GraphModel::new();
        let source = typed_node("Source", &[], &["value"]).with_location(0.0, 0.0);
        let sink = typed_node("Sink", &["value", "bias"], &[]).with_location(300.0, 0.0);
        let (source_id, sink_id) = (source.id(), sink.id());
        model.add_nodes([source, sink]);
        let output = connector(&model, source_id, ConnectorDirection::Output, 0);
        let input = connector(&model, sink_id, ConnectorDirection::Input, 0);
        let bias = connector(&model, sink_id, ConnectorDirection::Input, 1);
        let edge = model.connect(Some(output), Some(input), "uv").expect("edge");
        let binding = model.connect(None, Some(bias), "0.5").expect("binding");

        perform_layout(&mut model, &RenderStates::new(), &MEASURE);
        let from = model.connector(output).map(|c| c.anchor).expect("from anchor");
        let to = model.connector(input).map(|c| c.anchor).expect("to anchor");

        let edge = model.connection(edge).expect("edge");
        assert!(edge.bounds().contains(from) && edge.bounds().contains(to));
        assert!((edge.center().x - (from.x + to.x) / 2.0).abs() < 0.05);
        assert!(close(edge.text_bounds().right(), edge.center().x));

        let binding = model.connection(binding).expect("binding");
        let bias_anchor = model.connector(bias).map(|c| c.anchor).expect("bias anchor");
        assert!(close(binding.center().x, bias_anchor.x - LABEL_OFFSET));
        assert!(binding.text_bounds().right() <= bias_anchor.x);
        assert_eq!(binding.bounds(), binding.text_bounds());
    }
}
