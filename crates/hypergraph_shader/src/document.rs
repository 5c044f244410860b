// SPDX-License-Identifier: MIT OR Apache-2.0
//! A shader graph being edited: the model, the factory bookkeeping, material
//! parameter values and preview upkeep.

use crate::archive::{FragmentArchive, ParameterSource};
use crate::factory::{NodeFactory, ShaderNodeKind, GEOMETRY_ITEM_TAG, OUTPUT_ITEM_TAG, SOURCE_ITEM_TAG};
use crate::items::{AddParameterItem, PreviewGeometry, PreviewItem, PREVIEW_SIZE};
use crate::types::ShaderCompatibility;
use egui::{ColorImage, Pos2, Vec2};
use hypergraph::{ConnectorDirection, ControlEvent, DropDownItem, GraphModel, NodeId, TextBoxItem};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// How one preview should be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSettings {
    /// Geometry
    pub geometry: PreviewGeometry,
    /// Output shown; empty means the first output
    pub output_to_visualize: String,
    /// Camera orbit
    pub orbit: Vec2,
}

/// Everything a host needs to render one preview.
#[derive(Debug)]
pub struct PreviewRequest<'a> {
    /// Node being previewed
    pub node: NodeId,
    /// Numeric id of the node
    pub node_id: u32,
    /// Archive name of the previewed function
    pub archive_name: &'a str,
    /// Render settings
    pub settings: PreviewSettings,
    /// Material parameter values
    pub parameters: &'a IndexMap<String, String>,
    /// Image size in pixels
    pub size: [usize; 2],
    /// Structure hash the image belongs to
    pub structure_hash: u32,
}

/// Renders preview images; implemented by the host.
pub trait PreviewBuilder {
    /// Render a preview, or `None` when it cannot be built.
    fn build(&mut self, request: &PreviewRequest<'_>) -> Option<ColorImage>;
}

impl<F> PreviewBuilder for F
where
    F: FnMut(&PreviewRequest<'_>) -> Option<ColorImage>,
{
    fn build(&mut self, request: &PreviewRequest<'_>) -> Option<ColorImage> {
        self(request)
    }
}

/// A shader graph document.
#[derive(Debug)]
pub struct ShaderDocument {
    /// Graph model, using shader type compatibility
    pub model: GraphModel,
    /// Factory that made the nodes
    pub factory: NodeFactory,
    parameters: IndexMap<String, String>,
}

impl ShaderDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            model: GraphModel::new().with_compatibility(ShaderCompatibility),
            factory: NodeFactory::new(),
            parameters: IndexMap::new(),
        }
    }

    /// Hash of the shader structure; moves whenever the graph changes.
    pub fn shader_structure_hash(&self) -> u32 {
        self.model.revision()
    }

    /// Add a procedure node at a location.
    pub fn add_procedure(&mut self, archive: &FragmentArchive, function: &str, location: Pos2) -> Option<NodeId> {
        let mut node = self.factory.create_procedure_node(archive, function)?;
        node.location = location;
        let id = node.id();
        self.model.add_node(node).then_some(id)
    }

    /// Add a parameter node at a location.
    pub fn add_parameter_node(
        &mut self,
        archive: &FragmentArchive,
        parameters: &str,
        source: ParameterSource,
        location: Pos2,
    ) -> Option<NodeId> {
        let mut node = self.factory.create_parameter_node(archive, parameters, source)?;
        node.location = location;
        let id = node.id();
        self.model.add_node(node).then_some(id)
    }

    /// Material parameter values
    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    /// Set a material parameter; previews are redrawn, the structure is unchanged.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if self.parameters.get(&name) == Some(&value) {
            return;
        }
        trace!(%name, %value, "material parameter set");
        self.parameters.insert(name, value);
        for node in self.factory.procedure_nodes().collect::<Vec<_>>() {
            if let Some(preview) = self.preview_mut(node) {
                preview.invalidate();
            }
        }
    }

    /// The preview of a procedure node
    pub fn preview(&self, node: NodeId) -> Option<&PreviewItem> {
        self.model
            .node(node)?
            .items()
            .iter()
            .find_map(|item| item.downcast_ref::<PreviewItem>())
    }

    fn preview_mut(&mut self, node: NodeId) -> Option<&mut PreviewItem> {
        let node = self.model.node_mut(node)?;
        let item = node
            .items()
            .iter()
            .find(|item| item.downcast_ref::<PreviewItem>().is_some())?
            .id();
        node.item_mut(item)?.downcast_mut::<PreviewItem>()
    }

    fn preview_controls(&self, node: NodeId) -> Option<(PreviewGeometry, String)> {
        let node = self.model.node(node)?;
        let mut geometry = PreviewGeometry::default();
        let mut output = String::new();
        for item in node.items() {
            match item.tag.as_deref() {
                Some(GEOMETRY_ITEM_TAG) => {
                    if let Some(selected) = item
                        .downcast_ref::<DropDownItem>()
                        .and_then(DropDownItem::selected_value)
                        .and_then(PreviewGeometry::from_name)
                    {
                        geometry = selected;
                    }
                }
                Some(OUTPUT_ITEM_TAG) => {
                    if let Some(text) = item.downcast_ref::<TextBoxItem>() {
                        output = text.text.clone();
                    }
                }
                _ => {}
            }
        }
        Some((geometry, output))
    }

    /// Bring every preview up to date, building images for stale ones.
    ///
    /// Returns the number of previews rebuilt.
    pub fn refresh_previews(&mut self, builder: &mut dyn PreviewBuilder) -> usize {
        let structure_hash = self.shader_structure_hash();
        let size = [PREVIEW_SIZE as usize; 2];
        let mut rebuilt = 0;
        for node in self.factory.procedure_nodes().collect::<Vec<_>>() {
            let Some((geometry, output)) = self.preview_controls(node) else {
                continue;
            };
            let Some(preview) = self.preview_mut(node) else {
                continue;
            };
            preview.set_geometry(geometry);
            preview.set_output_to_visualize(output);
            if !preview.needs_refresh(structure_hash) {
                continue;
            }
            let settings = PreviewSettings {
                geometry: preview.geometry(),
                output_to_visualize: preview.output_to_visualize().to_owned(),
                orbit: preview.orbit,
            };

            let Some(tag) = self.factory.tag(node) else {
                continue;
            };
            let request = PreviewRequest {
                node,
                node_id: tag.id,
                archive_name: &tag.archive_name,
                settings,
                parameters: &self.parameters,
                size,
                structure_hash,
            };
            let image = builder.build(&request);
            if image.is_none() {
                debug!(?node, "preview not built");
            }
            if let Some(preview) = self.preview_mut(node) {
                preview.set_image(structure_hash, image);
                rebuilt += 1;
            }
        }
        rebuilt
    }

    /// Upload freshly built preview images as textures.
    pub fn upload_previews(&mut self, ctx: &egui::Context) {
        for node in self.factory.procedure_nodes().collect::<Vec<_>>() {
            let name = format!("shader-preview-{}", node.0);
            if let Some(preview) = self.preview_mut(node) {
                preview.upload(ctx, &name);
            }
        }
    }

    /// React to controller notifications.
    ///
    /// Clicks on a parameter node's source drop-down change its source.
    /// Returns the add-parameter requests raised by clicks on "+" buttons.
    pub fn handle_events(&mut self, events: &[ControlEvent]) -> Vec<(NodeId, ConnectorDirection)> {
        let mut requests = Vec::new();
        for event in events {
            let ControlEvent::ItemClicked(item) = event else {
                continue;
            };
            let Some(kind) = self.factory.tag(item.node).map(|t| t.kind) else {
                continue;
            };
            match kind {
                ShaderNodeKind::Parameter(_) => {
                    let is_source = self
                        .model
                        .item(*item)
                        .is_some_and(|i| i.tag.as_deref() == Some(SOURCE_ITEM_TAG));
                    if is_source {
                        self.factory.sync_parameter_source(&mut self.model, item.node);
                    }
                }
                ShaderNodeKind::Captures => {
                    let pending = self
                        .model
                        .item_mut(*item)
                        .and_then(|i| i.downcast_mut::<AddParameterItem>())
                        .and_then(|button| button.take_pending().then_some(button.direction));
                    if let Some(direction) = pending {
                        requests.push((item.node, direction));
                    }
                }
                ShaderNodeKind::Procedure => {}
            }
        }
        self.factory.retain_existing(&self.model);
        requests
    }
}

impl Default for ShaderDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::sample;
    use crate::archive::ShaderParameter;
    use egui::Color32;
    use hypergraph::ItemRef;

    fn solid(request: &PreviewRequest<'_>) -> Option<ColorImage> {
        Some(ColorImage::new(request.size, Color32::GRAY))
    }

    fn item_tagged(document: &ShaderDocument, node: NodeId, tag: &str) -> ItemRef {
        let item = document
            .model
            .node(node)
            .expect("node")
            .items()
            .iter()
            .find(|item| item.tag.as_deref() == Some(tag))
            .expect("tagged item")
            .id();
        ItemRef { node, item }
    }

    #[test]
    fn test_structure_hash_is_model_revision() {
        let mut document = ShaderDocument::new();
        let before = document.shader_structure_hash();
        assert_eq!(before, document.model.revision());
        document.add_procedure(&sample(), "Add", Pos2::ZERO).expect("Add node");
        assert_ne!(document.shader_structure_hash(), before);
        assert_eq!(document.shader_structure_hash(), document.model.revision());
    }

    #[test]
    fn test_previews_rebuild_only_when_stale() {
        let archive = sample();
        let mut document = ShaderDocument::new();
        let add = document.add_procedure(&archive, "Add", Pos2::ZERO).expect("Add node");
        document.add_procedure(&archive, "Saturate", Pos2::new(300.0, 0.0)).expect("Saturate node");

        let mut builds = Vec::new();
        let mut builder = |request: &PreviewRequest<'_>| {
            builds.push(request.archive_name.to_owned());
            solid(request)
        };
        assert_eq!(document.refresh_previews(&mut builder), 2);
        assert_eq!(document.refresh_previews(&mut builder), 0);

        document.set_parameter("tint", "1 0 0");
        assert_eq!(document.refresh_previews(&mut builder), 2);
        document.set_parameter("tint", "1 0 0");
        assert_eq!(document.refresh_previews(&mut builder), 0);

        document.model.invalidate();
        assert_eq!(document.refresh_previews(&mut builder), 2);
        assert_eq!(builds[0], "lib/basic.sh:Add");
        assert_eq!(builds.len(), 6);
        assert_eq!(
            document.preview(add).and_then(|p| p.image()).map(|i| i.size),
            Some([196, 196])
        );
    }

    #[test]
    fn test_preview_controls_feed_settings() {
        let archive = sample();
        let mut document = ShaderDocument::new();
        let add = document.add_procedure(&archive, "Add", Pos2::ZERO).expect("Add node");
        document.refresh_previews(&mut solid);

        let geometry = item_tagged(&document, add, GEOMETRY_ITEM_TAG);
        // Sphere -> Model
        document
            .model
            .item_mut(geometry)
            .expect("geometry item")
            .widget_mut()
            .on_click(Pos2::ZERO);
        let output = item_tagged(&document, add, OUTPUT_ITEM_TAG);
        if let Some(text) = document.model.item_mut(output).expect("output item").downcast_mut::<TextBoxItem>() {
            text.text = "result".into();
        }

        let mut seen = None;
        let rebuilt = document.refresh_previews(&mut |request: &PreviewRequest<'_>| {
            seen = Some(request.settings.clone());
            None
        });
        assert_eq!(rebuilt, 1);
        let seen = seen.expect("preview request");
        assert_eq!(seen.geometry, PreviewGeometry::Model);
        assert_eq!(seen.output_to_visualize, "result");
        assert!(document.preview(add).expect("preview").image().is_none());
    }

    #[test]
    fn test_source_drop_down_click_flips_parameters() {
        let archive = sample();
        let mut document = ShaderDocument::new();
        let surface = document
            .add_parameter_node(&archive, "Surface", ParameterSource::Material, Pos2::ZERO)
            .expect("Surface node");
        let source = item_tagged(&document, surface, SOURCE_ITEM_TAG);
        document.model.item_mut(source).expect("source item").widget_mut().on_click(Pos2::ZERO);

        let requests = document.handle_events(&[ControlEvent::ItemClicked(source)]);
        assert!(requests.is_empty());
        let node = document.model.node(surface).expect("surface node");
        assert_eq!(node.connectors(ConnectorDirection::Input).count(), 2);
        assert_eq!(node.connectors(ConnectorDirection::Output).count(), 0);
    }

    #[test]
    fn test_add_button_click_raises_request() {
        let mut document = ShaderDocument::new();
        let node = document.factory.create_captures_node("Captures", &[]);
        let id = node.id();
        let button = ItemRef {
            node: id,
            item: node.items()[0].id(),
        };
        document.model.add_node(node);
        document.model.item_mut(button).expect("button item").widget_mut().on_click(Pos2::ZERO);

        let requests = document.handle_events(&[ControlEvent::ItemClicked(button)]);
        assert_eq!(requests, [(id, ConnectorDirection::Output)]);
        assert!(document.handle_events(&[ControlEvent::ItemClicked(button)]).is_empty());

        let added = document
            .factory
            .add_capture_parameter(&mut document.model, id, &ShaderParameter::new("uv", "float2"));
        assert!(added.is_some());
    }

    #[test]
    fn test_removed_nodes_are_forgotten() {
        let mut document = ShaderDocument::new();
        let add = document.add_procedure(&sample(), "Add", Pos2::ZERO).expect("Add node");
        document.model.remove_node(add);
        document.handle_events(&[]);
        assert!(document.factory.tag(add).is_none());
        assert_eq!(document.refresh_previews(&mut solid), 0);
    }
}
