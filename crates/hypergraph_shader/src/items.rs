// SPDX-License-Identifier: MIT OR Apache-2.0
//! Item widgets of shader nodes.

use crate::types::ShaderType;
use egui::{Align2, Color32, ColorImage, Pos2, Rect, Stroke, TextureHandle, TextureOptions, Vec2};
use hypergraph::constants::{CORNER_SIZE, ITEM_FONT_SIZE, ITEM_PADDING};
use hypergraph::item::ITEM_TEXT_COLOR;
use hypergraph::{ConnectorDirection, ItemPaint, ItemWidget, NodeItem, RenderState, TextMeasure};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Gap between a parameter name and its type text
const TYPE_GAP: f32 = 8.0;

/// Side length of preview images
pub const PREVIEW_SIZE: f32 = 196.0;

const TYPE_TEXT_COLOR: Color32 = Color32::from_gray(110);

/// A typed parameter of a procedure, parameter or interface node.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterItem {
    /// Parameter name
    pub name: String,
    /// Shader type name
    pub type_name: String,
    /// Archive the parameter belongs to
    pub archive_name: String,
    /// Semantic of interface parameters
    pub semantic: Option<String>,
}

impl ParameterItem {
    /// Create a parameter
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, archive_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            archive_name: archive_name.into(),
            semantic: None,
        }
    }

    /// Set the semantic
    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    /// Wrap the parameter in a node item with one enabled facet, tagged
    /// with its type.
    pub fn into_item(self, direction: ConnectorDirection) -> NodeItem {
        let tag = self.type_name.clone();
        NodeItem::new(self)
            .with_input(direction == ConnectorDirection::Input)
            .with_output(direction == ConnectorDirection::Output)
            .with_tag(tag)
    }

    /// Type text shown after the name: `(f3)`, or `: SEMANTIC (f3)`.
    pub fn type_text(&self) -> String {
        let short = ShaderType::short_name(&self.type_name);
        match self.semantic.as_deref() {
            Some(semantic) if !semantic.is_empty() => format!(": {semantic} ({short})"),
            _ => format!("({short})"),
        }
    }
}

impl ItemWidget for ParameterItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        let name = measure.measure_text(&self.name, ITEM_FONT_SIZE);
        let kind = measure.measure_text(&self.type_text(), ITEM_FONT_SIZE);
        Vec2::new(name.x + TYPE_GAP + kind.x, name.y.max(kind.y)) + ITEM_PADDING
    }

    fn render_connector(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        let left = Pos2::new(bounds.left() + ITEM_PADDING.x / 2.0, bounds.center().y);
        paint.text(left, Align2::LEFT_CENTER, &self.name, ITEM_FONT_SIZE, ITEM_TEXT_COLOR);
        let right = Pos2::new(bounds.right() - ITEM_PADDING.x / 2.0, bounds.center().y);
        paint.text(right, Align2::RIGHT_CENTER, &self.type_text(), ITEM_FONT_SIZE, TYPE_TEXT_COLOR);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// "+" button on interface nodes; a click asks the host to add a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AddParameterItem {
    /// Side the new parameter goes on
    pub direction: ConnectorDirection,
    /// Set by a click, taken by the document
    pub pending: bool,
}

impl AddParameterItem {
    /// Create the button
    pub fn new(direction: ConnectorDirection) -> Self {
        Self {
            direction,
            pending: false,
        }
    }

    /// Take the pending request, if any.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl ItemWidget for AddParameterItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        measure.measure_text("+", ITEM_FONT_SIZE) + ITEM_PADDING
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        let rect = paint.to_screen(bounds.shrink(1.0));
        if paint.state.contains(RenderState::HOVER) {
            paint.painter.rect_filled(rect, CORNER_SIZE, Color32::from_gray(235));
        }
        paint
            .painter
            .rect_stroke(rect, CORNER_SIZE, Stroke::new(1.0, Color32::from_gray(120)));
        paint.text(bounds.center(), Align2::CENTER_CENTER, "+", ITEM_FONT_SIZE, ITEM_TEXT_COLOR);
    }

    fn on_click(&mut self, _location: Pos2) -> bool {
        self.pending = true;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Geometry a preview is rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewGeometry {
    /// Value plotted as a chart
    Chart,
    /// Flat full-frame quad
    Plane2D,
    /// Cube
    Box,
    /// Sphere
    #[default]
    Sphere,
    /// Host-provided model
    Model,
}

impl PreviewGeometry {
    /// All geometries in menu order
    pub const ALL: [PreviewGeometry; 5] = [
        PreviewGeometry::Chart,
        PreviewGeometry::Plane2D,
        PreviewGeometry::Box,
        PreviewGeometry::Sphere,
        PreviewGeometry::Model,
    ];

    /// Menu name
    pub fn name(self) -> &'static str {
        match self {
            PreviewGeometry::Chart => "Chart",
            PreviewGeometry::Plane2D => "2D",
            PreviewGeometry::Box => "Box",
            PreviewGeometry::Sphere => "Sphere",
            PreviewGeometry::Model => "Model",
        }
    }

    /// Geometry by menu name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

/// Rendered preview of a procedure's output.
///
/// The image is produced by the host and cached against the shader
/// structure hash; it is rebuilt when the hash moves, when the geometry or
/// visualized output changes, or when the user orbits the camera.
pub struct PreviewItem {
    geometry: PreviewGeometry,
    output_to_visualize: String,
    /// Camera orbit accumulated from drags, in graph units
    pub orbit: Vec2,
    last_drag: Option<Pos2>,
    structure_hash: Option<u32>,
    stale: bool,
    image: Option<Arc<ColorImage>>,
    texture: Option<TextureHandle>,
}

impl PreviewItem {
    /// Create an empty preview
    pub fn new() -> Self {
        Self {
            geometry: PreviewGeometry::default(),
            output_to_visualize: String::new(),
            orbit: Vec2::ZERO,
            last_drag: None,
            structure_hash: None,
            stale: true,
            image: None,
            texture: None,
        }
    }

    /// Geometry
    pub fn geometry(&self) -> PreviewGeometry {
        self.geometry
    }

    /// Change the geometry; stales the image when it differs.
    pub fn set_geometry(&mut self, geometry: PreviewGeometry) {
        if self.geometry != geometry {
            self.geometry = geometry;
            self.stale = true;
        }
    }

    /// Output shown; empty means the first output
    pub fn output_to_visualize(&self) -> &str {
        &self.output_to_visualize
    }

    /// Change the visualized output; stales the image when it differs.
    pub fn set_output_to_visualize(&mut self, output: impl Into<String>) {
        let output = output.into();
        if self.output_to_visualize != output {
            self.output_to_visualize = output;
            self.stale = true;
        }
    }

    /// Whether the image must be rebuilt for a structure hash.
    pub fn needs_refresh(&self, structure_hash: u32) -> bool {
        self.stale || self.structure_hash != Some(structure_hash)
    }

    /// Drop the cached image at the next refresh.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Store a freshly built image for a structure hash.
    pub fn set_image(&mut self, structure_hash: u32, image: Option<ColorImage>) {
        self.structure_hash = Some(structure_hash);
        self.stale = false;
        self.image = image.map(Arc::new);
        self.texture = None;
    }

    /// Cached image
    pub fn image(&self) -> Option<&ColorImage> {
        self.image.as_deref()
    }

    /// Upload the cached image to the GPU if it has not been yet.
    pub fn upload(&mut self, ctx: &egui::Context, name: &str) {
        if self.texture.is_some() {
            return;
        }
        if let Some(image) = &self.image {
            self.texture = Some(ctx.load_texture(name, (**image).clone(), TextureOptions::LINEAR));
        }
    }
}

impl Default for PreviewItem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PreviewItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewItem")
            .field("geometry", &self.geometry)
            .field("output_to_visualize", &self.output_to_visualize)
            .field("orbit", &self.orbit)
            .field("structure_hash", &self.structure_hash)
            .field("stale", &self.stale)
            .field("has_image", &self.image.is_some())
            .field("uploaded", &self.texture.is_some())
            .finish()
    }
}

impl ItemWidget for PreviewItem {
    fn measure(&self, _measure: &dyn TextMeasure) -> Vec2 {
        Vec2::splat(PREVIEW_SIZE)
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        let rect = paint.to_screen(bounds);
        match &self.texture {
            Some(texture) => {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                paint.painter.image(texture.id(), rect, uv, Color32::WHITE);
            }
            None => {
                paint.painter.rect_filled(rect, 0.0, Color32::from_gray(60));
                paint.text(
                    bounds.center(),
                    Align2::CENTER_CENTER,
                    self.geometry.name(),
                    ITEM_FONT_SIZE,
                    Color32::from_gray(200),
                );
            }
        }
    }

    fn on_start_drag(&mut self, location: Pos2) -> Option<Pos2> {
        self.last_drag = Some(location);
        Some(location)
    }

    fn on_drag(&mut self, location: Pos2) -> bool {
        let Some(last) = self.last_drag else {
            return false;
        };
        self.orbit += location - last;
        self.last_drag = Some(location);
        self.stale = true;
        true
    }

    fn on_end_drag(&mut self) -> bool {
        self.last_drag.take().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph::{FixedTextMeasure, ItemSide};

    #[test]
    fn test_parameter_item_facets_and_tag() {
        let item = ParameterItem::new("uv", "float2", "lib/basic.sh").into_item(ConnectorDirection::Input);
        assert!(item.input.enabled);
        assert!(!item.output.enabled);
        assert_eq!(item.tag.as_deref(), Some("float2"));
        assert_eq!(item.side(), ItemSide::Input);

        let item = ParameterItem::new("result", "float4", "").into_item(ConnectorDirection::Output);
        assert_eq!(item.side(), ItemSide::Output);
    }

    #[test]
    fn test_parameter_type_text() {
        let plain = ParameterItem::new("albedo", "float3", "");
        assert_eq!(plain.type_text(), "(f3)");
        let interface = ParameterItem::new("position", "float4", "").with_semantic("SV_Position");
        assert_eq!(interface.type_text(), ": SV_Position (f4)");
    }

    #[test]
    fn test_parameter_measure_includes_type() {
        let measure = FixedTextMeasure::default();
        let item = ParameterItem::new("ab", "float", "");
        let size = item.measure(&measure);
        // "ab" and "(f)" at 11pt with half-width glyphs
        let expected = 2.0 * 5.5 + TYPE_GAP + 3.0 * 5.5 + ITEM_PADDING.x;
        assert!((size.x - expected).abs() < 1e-3);
    }

    #[test]
    fn test_add_parameter_click() {
        let mut button = AddParameterItem::new(ConnectorDirection::Output);
        assert!(!button.take_pending());
        assert!(button.on_click(Pos2::ZERO));
        assert!(button.take_pending());
        assert!(!button.take_pending());
    }

    #[test]
    fn test_preview_size_is_fixed() {
        let preview = PreviewItem::new();
        assert_eq!(preview.measure(&FixedTextMeasure::default()), Vec2::splat(PREVIEW_SIZE));
        assert_eq!(preview.geometry(), PreviewGeometry::Sphere);
    }

    #[test]
    fn test_preview_cache_follows_structure_hash() {
        let mut preview = PreviewItem::new();
        assert!(preview.needs_refresh(3));
        preview.set_image(3, Some(ColorImage::new([2, 2], Color32::RED)));
        assert!(!preview.needs_refresh(3));
        assert!(preview.needs_refresh(4));
        assert_eq!(preview.image().map(|i| i.size), Some([2, 2]));

        preview.set_geometry(PreviewGeometry::Sphere);
        assert!(!preview.needs_refresh(3));
        preview.set_geometry(PreviewGeometry::Box);
        assert!(preview.needs_refresh(3));

        preview.set_image(3, None);
        preview.set_output_to_visualize("result");
        assert!(preview.needs_refresh(3));
    }

    #[test]
    fn test_preview_drag_orbits_camera() {
        let mut preview = PreviewItem::new();
        preview.set_image(1, None);
        assert!(!preview.on_drag(Pos2::new(5.0, 5.0)));
        assert_eq!(preview.on_start_drag(Pos2::new(10.0, 10.0)), Some(Pos2::new(10.0, 10.0)));
        assert!(preview.on_drag(Pos2::new(14.0, 7.0)));
        assert!(preview.on_drag(Pos2::new(20.0, 7.0)));
        assert_eq!(preview.orbit, Vec2::new(10.0, -3.0));
        assert!(preview.needs_refresh(1));
        assert!(preview.on_end_drag());
        assert!(!preview.on_end_drag());
    }

    #[test]
    fn test_geometry_names() {
        assert_eq!(PreviewGeometry::Plane2D.name(), "2D");
        for geometry in PreviewGeometry::ALL {
            assert_eq!(PreviewGeometry::from_name(geometry.name()), Some(geometry));
        }
        assert_eq!(PreviewGeometry::from_name("Torus"), None);
    }
}
