// SPDX-License-Identifier: MIT OR Apache-2.0
//! Construction of shader nodes from fragment archives.

use crate::archive::{FragmentArchive, ParameterSource, ShaderParameter};
use crate::items::{AddParameterItem, ParameterItem, PreviewGeometry, PreviewItem};
use hypergraph::{
    ConnectorDirection, DropDownItem, GraphModel, ItemDock, ItemRef, LabelItem, Node, NodeId, NodeItem,
    TextBoxItem,
};
use indexmap::IndexMap;
use tracing::debug;

/// Item tag of the preview geometry drop-down
pub const GEOMETRY_ITEM_TAG: &str = "preview-geometry";
/// Item tag of the visualized output text box
pub const OUTPUT_ITEM_TAG: &str = "preview-output";
/// Item tag of the parameter source drop-down
pub const SOURCE_ITEM_TAG: &str = "parameter-source";

const SOURCE_NAMES: [&str; 2] = ["Input", "Output"];

/// What a shader node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderNodeKind {
    /// Call of an archive function
    Procedure,
    /// Group of parameters with a common source
    Parameter(ParameterSource),
    /// Captured values with semantics; parameters can be added
    Captures,
}

/// Bookkeeping the factory keeps for each node it made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderNodeTag {
    /// Numeric id, unique within the factory
    pub id: u32,
    /// Full archive name, e.g. `lib/basic.sh:Add`
    pub archive_name: String,
    /// Node kind
    pub kind: ShaderNodeKind,
}

/// Title for an archive name: the template argument of `X<Y>` names,
/// otherwise the part after the last `:`.
pub fn visible_name(archive_name: &str) -> &str {
    if let Some(open) = archive_name.find('<') {
        if let Some(inner) = archive_name[open + 1..].strip_suffix('>') {
            if !inner.is_empty() {
                return visible_name(inner);
            }
        }
    }
    match archive_name.rfind(':') {
        Some(i) if i > 0 => &archive_name[i + 1..],
        _ => archive_name,
    }
}

fn parameter_direction(source: ParameterSource) -> ConnectorDirection {
    if source == ParameterSource::Output {
        ConnectorDirection::Input
    } else {
        ConnectorDirection::Output
    }
}

fn source_from_name(name: &str) -> ParameterSource {
    if name == SOURCE_NAMES[1] {
        ParameterSource::Output
    } else {
        ParameterSource::System
    }
}

fn parameter_item(parameter: &ShaderParameter, archive_name: &str, direction: ConnectorDirection) -> NodeItem {
    let mut widget = ParameterItem::new(&parameter.name, &parameter.type_name, archive_name);
    widget.semantic = parameter.semantic.clone();
    widget.into_item(direction)
}

/// Creates shader nodes and remembers what each one stands for.
#[derive(Debug, Default)]
pub struct NodeFactory {
    next_id: u32,
    tags: IndexMap<NodeId, ShaderNodeTag>,
}

impl NodeFactory {
    /// Create a factory
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, node: &Node, archive_name: String, kind: ShaderNodeKind) {
        self.next_id += 1;
        debug!(id = self.next_id, %archive_name, ?kind, "shader node created");
        self.tags.insert(
            node.id(),
            ShaderNodeTag {
                id: self.next_id,
                archive_name,
                kind,
            },
        );
    }

    /// Node for a call of `function` from `archive`, with a preview and
    /// its controls, the function inputs on the left and outputs on the right.
    pub fn create_procedure_node(&mut self, archive: &FragmentArchive, function: &str) -> Option<Node> {
        let function = archive.function(function)?;
        let archive_name = archive.parameter_path(&function.name);
        let mut node = Node::new(visible_name(&archive_name)).with_tag(archive_name.clone());

        node.add_item(NodeItem::new(PreviewItem::new()));
        let mut geometry = DropDownItem::new(PreviewGeometry::ALL.map(PreviewGeometry::name));
        geometry.selected = PreviewGeometry::ALL
            .iter()
            .position(|g| *g == PreviewGeometry::default())
            .unwrap_or_default();
        node.add_item(
            NodeItem::new(geometry)
                .with_dock(ItemDock::Bottom)
                .with_tag(GEOMETRY_ITEM_TAG),
        );
        node.add_item(
            NodeItem::new(TextBoxItem::new("Output", ""))
                .with_dock(ItemDock::Bottom)
                .with_tag(OUTPUT_ITEM_TAG),
        );

        for input in &function.inputs {
            node.add_item(parameter_item(input, &archive.name, ConnectorDirection::Input));
        }
        for output in &function.outputs {
            node.add_item(parameter_item(output, &archive.name, ConnectorDirection::Output));
        }

        self.register(&node, archive_name, ShaderNodeKind::Procedure);
        Some(node)
    }

    /// Parameter node without parameters; the host fills it in.
    pub fn create_empty_parameter_node(&mut self, source: ParameterSource) -> Node {
        let mut node = Node::new("Parameters");
        node.add_item(source_item(source));
        self.register(&node, String::new(), ShaderNodeKind::Parameter(source));
        node
    }

    /// Node with the members of a parameter struct.
    ///
    /// Parameters written by the shader have inputs, all other sources
    /// provide values through outputs.
    pub fn create_parameter_node(
        &mut self,
        archive: &FragmentArchive,
        parameters: &str,
        source: ParameterSource,
    ) -> Option<Node> {
        let parameters = archive.parameter_struct(parameters)?;
        let archive_name = archive.parameter_path(&parameters.name);
        let mut node = Node::new(visible_name(&archive_name)).with_tag(archive_name.clone());
        node.add_item(source_item(source));
        let direction = parameter_direction(source);
        for parameter in &parameters.parameters {
            node.add_item(parameter_item(parameter, &archive.name, direction));
        }
        self.register(&node, archive_name, ShaderNodeKind::Parameter(source));
        Some(node)
    }

    /// Node of captured values with semantics and a button to add more.
    pub fn create_captures_node(&mut self, name: &str, parameters: &[ShaderParameter]) -> Node {
        let mut node = Node::new(name).with_tag(name);
        for parameter in parameters {
            node.add_item(parameter_item(parameter, "", ConnectorDirection::Output));
        }
        node.add_item(NodeItem::new(AddParameterItem::new(ConnectorDirection::Output)));
        self.register(&node, name.to_owned(), ShaderNodeKind::Captures);
        node
    }

    /// Add a parameter to a captures node, keeping the add button last.
    pub fn add_capture_parameter(&self, model: &mut GraphModel, node: NodeId, parameter: &ShaderParameter) -> Option<ItemRef> {
        if self.tag(node)?.kind != ShaderNodeKind::Captures {
            return None;
        }
        let button = model.node(node)?.items().iter().find_map(|item| {
            item.downcast_ref::<AddParameterItem>()
                .map(|b| (ItemRef { node, item: item.id() }, b.direction))
        });
        let direction = button.map_or(ConnectorDirection::Output, |(_, d)| d);
        if let Some((button, _)) = button {
            model.remove_item(button);
        }
        let added = model.add_item(node, parameter_item(parameter, "", direction));
        model.add_item(node, NodeItem::new(AddParameterItem::new(direction)));
        added
    }

    /// Change the source of a parameter node.
    ///
    /// Parameters on the wrong side are recreated on the other side, which
    /// drops their connections. Returns whether anything changed.
    pub fn set_parameter_source(&mut self, model: &mut GraphModel, node: NodeId, source: ParameterSource) -> bool {
        let Some(tag) = self.tags.get_mut(&node) else {
            return false;
        };
        let ShaderNodeKind::Parameter(old) = tag.kind else {
            return false;
        };
        if old == source {
            return false;
        }
        tag.kind = ShaderNodeKind::Parameter(source);

        let direction = parameter_direction(source);
        let Some(current) = model.node_mut(node) else {
            return false;
        };
        for item in current.items().iter().map(NodeItem::id).collect::<Vec<_>>() {
            if let Some(drop_down) = current.item_mut(item).and_then(|i| i.downcast_mut::<DropDownItem>()) {
                drop_down.selected = usize::from(source == ParameterSource::Output);
            }
        }
        let flipped: Vec<(ItemRef, ParameterItem)> = current
            .items()
            .iter()
            .filter(|item| !item.connector(direction).enabled)
            .filter_map(|item| {
                item.downcast_ref::<ParameterItem>()
                    .map(|p| (ItemRef { node, item: item.id() }, p.clone()))
            })
            .collect();
        debug!(?node, ?source, flipped = flipped.len(), "parameter source changed");
        for (item, parameter) in flipped {
            model.remove_item(item);
            model.add_item(node, parameter.into_item(direction));
        }
        model.invalidate();
        true
    }

    /// Apply the value of a node's source drop-down, after the user clicked it.
    pub fn sync_parameter_source(&mut self, model: &mut GraphModel, node: NodeId) -> bool {
        let selected = model.node(node).and_then(|n| {
            n.items()
                .iter()
                .filter(|item| item.tag.as_deref() == Some(SOURCE_ITEM_TAG))
                .find_map(|item| item.downcast_ref::<DropDownItem>())
                .and_then(|d| d.selected_value().map(source_from_name))
        });
        match selected {
            Some(source) => self.set_parameter_source(model, node, source),
            None => false,
        }
    }

    /// Tag of a node made by this factory
    pub fn tag(&self, node: NodeId) -> Option<&ShaderNodeTag> {
        self.tags.get(&node)
    }

    /// Node with a numeric id, if it is still in the model.
    pub fn find_node_from_id(&self, model: &GraphModel, id: u32) -> Option<NodeId> {
        self.tags
            .iter()
            .find(|(node, tag)| tag.id == id && model.contains_node(**node))
            .map(|(node, _)| *node)
    }

    /// Forget nodes that are no longer in the model.
    pub fn retain_existing(&mut self, model: &GraphModel) {
        self.tags.retain(|node, _| model.contains_node(*node));
    }

    /// Procedure nodes, in creation order
    pub fn procedure_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tags
            .iter()
            .filter(|(_, tag)| tag.kind == ShaderNodeKind::Procedure)
            .map(|(node, _)| *node)
    }

    /// One-line description of an item for tooltips and status text.
    ///
    /// Parameters list their connections as `<===> [name] in Title`, or the
    /// bound name for single-ended connections.
    pub fn describe_item(&self, model: &GraphModel, item: ItemRef) -> String {
        let Some(node_item) = model.item(item) else {
            return String::new();
        };
        if let Some(parameter) = node_item.downcast_ref::<ParameterItem>() {
            let direction = if node_item.input.enabled {
                ConnectorDirection::Input
            } else {
                ConnectorDirection::Output
            };
            let side = match direction {
                ConnectorDirection::Input => "Input",
                ConnectorDirection::Output => "Output",
            };
            let mut result = format!("{side} [{} ({})]", parameter.name, parameter.type_name);
            let Some(connector) = node_item.connector_ref(direction) else {
                return result;
            };
            for connection in model.connections().filter(|c| c.involves_connector(connector)) {
                let other = match direction {
                    ConnectorDirection::Input => connection.from(),
                    ConnectorDirection::Output => connection.to(),
                };
                let other = other.and_then(|o| Some((model.connector_item(o)?, model.node(o.node)?)));
                match other {
                    Some((other, other_node)) => {
                        let name = other
                            .downcast_ref::<ParameterItem>()
                            .map_or("?", |p| p.name.as_str());
                        result.push_str(&format!(" <===> [{}] in {}", name, other_node.title));
                    }
                    None => result.push_str(&format!(" <===> {}", connection.name)),
                }
            }
            return result;
        }
        if node_item.downcast_ref::<PreviewItem>().is_some() {
            return "preview".to_owned();
        }
        if let Some(drop_down) = node_item.downcast_ref::<DropDownItem>() {
            return drop_down.selected_value().unwrap_or_default().to_owned();
        }
        if let Some(text_box) = node_item.downcast_ref::<TextBoxItem>() {
            return text_box.text.clone();
        }
        if let Some(label) = node_item.downcast_ref::<LabelItem>() {
            return label.text.clone();
        }
        String::new()
    }
}

fn source_item(source: ParameterSource) -> NodeItem {
    let mut drop_down = DropDownItem::new(SOURCE_NAMES);
    drop_down.selected = usize::from(source == ParameterSource::Output);
    NodeItem::new(drop_down).with_tag(SOURCE_ITEM_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::sample;
    use crate::types::ShaderCompatibility;

    fn parameter_names(model: &GraphModel, node: NodeId, direction: ConnectorDirection) -> Vec<String> {
        model
            .node(node)
            .expect("node")
            .connectors(direction)
            .filter_map(|item| item.downcast_ref::<ParameterItem>())
            .map(|p| p.name.clone())
            .collect()
    }

    #[test]
    fn test_visible_name() {
        assert_eq!(visible_name("lib/basic.sh:Add"), "Add");
        assert_eq!(visible_name("Add"), "Add");
        assert_eq!(visible_name("lib/t.sh:Blend<lib/basic.sh:Add>"), "Add");
        assert_eq!(visible_name(":odd"), ":odd");
    }

    #[test]
    fn test_procedure_node_layout() {
        let archive = sample();
        let mut factory = NodeFactory::new();
        let node = factory.create_procedure_node(&archive, "Add").expect("Add node");
        assert_eq!(node.title, "Add");
        assert_eq!(node.tag.as_deref(), Some("lib/basic.sh:Add"));

        let items = node.items();
        assert!(items[0].downcast_ref::<PreviewItem>().is_some());
        let geometry = items[1].downcast_ref::<DropDownItem>().expect("geometry drop-down");
        assert_eq!(geometry.selected_value(), Some("Sphere"));
        assert_eq!(items[2].tag.as_deref(), Some(OUTPUT_ITEM_TAG));

        let inputs: Vec<_> = node.connectors(ConnectorDirection::Input).collect();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].tag.as_deref(), Some("float3"));
        assert_eq!(node.connectors(ConnectorDirection::Output).count(), 1);

        let tag = factory.tag(node.id()).expect("tag");
        assert_eq!((tag.id, tag.kind), (1, ShaderNodeKind::Procedure));
        assert!(factory.create_procedure_node(&archive, "Missing").is_none());
    }

    #[test]
    fn test_find_node_from_id() {
        let archive = sample();
        let mut factory = NodeFactory::new();
        let mut model = GraphModel::new();
        let add = factory.create_procedure_node(&archive, "Add").expect("Add node");
        let saturate = factory.create_procedure_node(&archive, "Saturate").expect("Saturate node");
        let saturate_id = saturate.id();
        model.add_nodes([add, saturate]);

        assert_eq!(factory.find_node_from_id(&model, 2), Some(saturate_id));
        assert_eq!(factory.find_node_from_id(&model, 9), None);

        model.remove_node(saturate_id);
        assert_eq!(factory.find_node_from_id(&model, 2), None);
        factory.retain_existing(&model);
        assert!(factory.tag(saturate_id).is_none());
        assert_eq!(factory.procedure_nodes().count(), 1);
    }

    #[test]
    fn test_parameter_source_flips_connectors() {
        let archive = sample();
        let mut factory = NodeFactory::new();
        let mut model = GraphModel::new().with_compatibility(ShaderCompatibility);
        let node = factory
            .create_parameter_node(&archive, "Surface", ParameterSource::Material)
            .expect("Surface node");
        let id = node.id();
        model.add_node(node);
        assert_eq!(
            parameter_names(&model, id, ConnectorDirection::Output),
            ["albedo", "roughness"]
        );

        assert!(factory.set_parameter_source(&mut model, id, ParameterSource::Output));
        assert!(parameter_names(&model, id, ConnectorDirection::Output).is_empty());
        assert_eq!(
            parameter_names(&model, id, ConnectorDirection::Input),
            ["albedo", "roughness"]
        );
        assert_eq!(
            factory.tag(id).map(|t| t.kind),
            Some(ShaderNodeKind::Parameter(ParameterSource::Output))
        );
        assert!(!factory.set_parameter_source(&mut model, id, ParameterSource::Output));
    }

    #[test]
    fn test_sync_parameter_source_from_drop_down() {
        let mut factory = NodeFactory::new();
        let mut model = GraphModel::new();
        let node = factory.create_empty_parameter_node(ParameterSource::System);
        let id = node.id();
        let source = node.items()[0].id();
        model.add_node(node);
        assert!(!factory.sync_parameter_source(&mut model, id));

        let item = model.item_mut(ItemRef { node: id, item: source }).expect("source item");
        item.widget_mut().on_click(egui::Pos2::ZERO);
        assert!(factory.sync_parameter_source(&mut model, id));
        assert_eq!(
            factory.tag(id).map(|t| t.kind),
            Some(ShaderNodeKind::Parameter(ParameterSource::Output))
        );
    }

    #[test]
    fn test_captures_keep_add_button_last() {
        let mut factory = NodeFactory::new();
        let mut model = GraphModel::new();
        let position = ShaderParameter {
            semantic: Some("SV_Position".into()),
            ..ShaderParameter::new("position", "float4")
        };
        let node = factory.create_captures_node("Captures", &[position]);
        let id = node.id();
        model.add_node(node);

        let added = factory
            .add_capture_parameter(&mut model, id, &ShaderParameter::new("normal", "float3"))
            .expect("capture parameter");
        let items = model.node(id).expect("node").items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].id(), added.item);
        assert!(items[2].downcast_ref::<AddParameterItem>().is_some());
        assert_eq!(
            parameter_names(&model, id, ConnectorDirection::Output),
            ["position", "normal"]
        );
        assert_eq!(
            items[0].downcast_ref::<ParameterItem>().expect("parameter item").type_text(),
            ": SV_Position (f4)"
        );
    }

    #[test]
    fn test_describe_item_lists_connections() {
        let archive = sample();
        let mut factory = NodeFactory::new();
        let mut model = GraphModel::new().with_compatibility(ShaderCompatibility);
        let add = factory.create_procedure_node(&archive, "Add").expect("Add node");
        let surface = factory
            .create_parameter_node(&archive, "Surface", ParameterSource::Material)
            .expect("Surface node");
        let (add_id, surface_id) = (add.id(), surface.id());
        let a = add.connectors(ConnectorDirection::Input).next().expect("first input").connector_ref(ConnectorDirection::Input);
        let b = add.connectors(ConnectorDirection::Input).nth(1).expect("second input").connector_ref(ConnectorDirection::Input);
        let albedo = surface
            .connectors(ConnectorDirection::Output)
            .next()
            .expect("albedo output")
            .connector_ref(ConnectorDirection::Output);
        model.add_nodes([add, surface]);
        model.connect(albedo, a, "").expect("connect albedo");
        model.connect(None, b, "tint").expect("connect tint");

        let a = a.expect("first input ref");
        let b = b.expect("second input ref");
        assert_eq!(
            factory.describe_item(&model, ItemRef { node: add_id, item: a.item }),
            "Input [a (float3)] <===> [albedo] in Surface"
        );
        assert_eq!(
            factory.describe_item(&model, ItemRef { node: add_id, item: b.item }),
            "Input [b (float3)] <===> tint"
        );
        let preview = model.node(add_id).expect("Add node").items()[0].id();
        assert_eq!(factory.describe_item(&model, ItemRef { node: add_id, item: preview }), "preview");
        let source = model.node(surface_id).expect("surface node").items()[0].id();
        assert_eq!(factory.describe_item(&model, ItemRef { node: surface_id, item: source }), "Input");
    }
}
