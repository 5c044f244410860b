// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in item widgets.

use crate::constants::{CORNER_SIZE, ITEM_FONT_SIZE, ITEM_PADDING};
use crate::item::{ItemPaint, ItemWidget, TextMeasure, ITEM_TEXT_COLOR};
use crate::state::RenderState;
use egui::{Align2, Color32, Pos2, Rect, Stroke, Vec2};
use std::any::Any;

fn text_size(measure: &dyn TextMeasure, text: &str) -> Vec2 {
    measure.measure_text(text, ITEM_FONT_SIZE) + ITEM_PADDING
}

fn left_text(paint: &ItemPaint<'_>, bounds: Rect, text: &str) {
    let pos = Pos2::new(bounds.left() + ITEM_PADDING.x / 2.0, bounds.center().y);
    paint.text(pos, Align2::LEFT_CENTER, text, ITEM_FONT_SIZE, ITEM_TEXT_COLOR);
}

fn field_frame(paint: &ItemPaint<'_>, bounds: Rect) {
    let rect = paint.to_screen(bounds.shrink(1.0));
    let fill = if paint.state.contains(RenderState::HOVER) {
        Color32::from_rgb(250, 250, 250)
    } else {
        Color32::from_rgb(235, 235, 235)
    };
    paint.painter.rect_filled(rect, CORNER_SIZE, fill);
    paint
        .painter
        .rect_stroke(rect, CORNER_SIZE, Stroke::new(1.0, Color32::from_gray(120)));
}

/// Plain text; the usual content of title rows and connectors.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelItem {
    /// Displayed text
    pub text: String,
}

impl LabelItem {
    /// Create a label
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ItemWidget for LabelItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        text_size(measure, &self.text)
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        left_text(paint, bounds, &self.text);
    }

    fn render_connector(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        left_text(paint, bounds, &self.text);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Labeled editable text.
///
/// Editing happens in the host: a double click marks the box as editing and
/// the controller reports the double click.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBoxItem {
    /// Field label
    pub label: String,
    /// Field value
    pub text: String,
    /// Set by a double click, cleared by the host when editing ends
    pub editing: bool,
}

impl TextBoxItem {
    /// Create a text box
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            editing: false,
        }
    }

    fn display(&self) -> String {
        if self.label.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.label, self.text)
        }
    }
}

impl ItemWidget for TextBoxItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        text_size(measure, &self.display())
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        field_frame(paint, bounds);
        left_text(paint, bounds, &self.display());
    }

    fn render_connector(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        left_text(paint, bounds, &self.display());
    }

    fn on_double_click(&mut self) -> bool {
        self.editing = true;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Choice between fixed values; a click advances to the next value.
#[derive(Debug, Clone, PartialEq)]
pub struct DropDownItem {
    /// Available values
    pub values: Vec<String>,
    /// Index of the selected value
    pub selected: usize,
}

impl DropDownItem {
    /// Create a drop-down with the first value selected
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            selected: 0,
        }
    }

    /// Currently selected value
    pub fn selected_value(&self) -> Option<&str> {
        self.values.get(self.selected).map(String::as_str)
    }
}

impl ItemWidget for DropDownItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        let widest = self
            .values
            .iter()
            .map(|value| text_size(measure, value))
            .fold(text_size(measure, ""), |acc, size| acc.max(size));
        widest + Vec2::new(ITEM_FONT_SIZE, 0.0)
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        field_frame(paint, bounds);
        left_text(paint, bounds, self.selected_value().unwrap_or_default());
        let arrow = Pos2::new(bounds.right() - ITEM_PADDING.x / 2.0, bounds.center().y);
        paint.text(arrow, Align2::RIGHT_CENTER, "▾", ITEM_FONT_SIZE, ITEM_TEXT_COLOR);
    }

    fn on_click(&mut self, _location: Pos2) -> bool {
        if self.values.is_empty() {
            return false;
        }
        self.selected = (self.selected + 1) % self.values.len();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Push button; clicks are reported by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonItem {
    /// Button caption
    pub text: String,
    /// Number of clicks received
    pub clicks: u32,
}

impl ButtonItem {
    /// Create a button
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            clicks: 0,
        }
    }
}

impl ItemWidget for ButtonItem {
    fn measure(&self, measure: &dyn TextMeasure) -> Vec2 {
        text_size(measure, &self.text) + Vec2::new(ITEM_PADDING.x, 0.0)
    }

    fn render(&self, paint: &ItemPaint<'_>, bounds: Rect) {
        field_frame(paint, bounds);
        paint.text(
            bounds.center(),
            Align2::CENTER_CENTER,
            &self.text,
            ITEM_FONT_SIZE,
            ITEM_TEXT_COLOR,
        );
    }

    fn on_click(&mut self, _location: Pos2) -> bool {
        self.clicks += 1;
        true
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
    use crate::item::FixedTextMeasure;

    #[test]
    fn test_label_measure_includes_padding() {
        let measure = FixedTextMeasure::default();
        let size = LabelItem::new("abcd").measure(&measure);
        let text = measure.measure_text("abcd", ITEM_FONT_SIZE);
        assert_eq!(size, text + ITEM_PADDING);
    }

    #[test]
    fn test_dropdown_click_cycles() {
        let mut dropdown = DropDownItem::new(["a", "b", "c"]);
        assert_eq!(dropdown.selected_value(), Some("a"));
        assert!(dropdown.on_click(Pos2::ZERO));
        assert!(dropdown.on_click(Pos2::ZERO));
        assert_eq!(dropdown.selected_value(), Some("c"));
        assert!(dropdown.on_click(Pos2::ZERO));
        assert_eq!(dropdown.selected_value(), Some("a"));

        let mut empty = DropDownItem::new(Vec::<String>::new());
        assert!(!empty.on_click(Pos2::ZERO));
    }

    #[test]
    fn test_dropdown_measures_widest_value() {
        let measure = FixedTextMeasure::default();
        let dropdown = DropDownItem::new(["x", "wider value"]);
        let widest = LabelItem::new("wider value").measure(&measure);
        assert!(dropdown.measure(&measure).x > widest.x);
    }

    #[test]
    fn test_textbox_double_click_starts_editing() {
        let mut text_box = TextBoxItem::new("Name", "value");
        assert!(text_box.on_double_click());
        assert!(text_box.editing);
        assert_eq!(text_box.display(), "Name: value");
    }

    #[test]
    fn test_button_counts_clicks() {
        let mut button = ButtonItem::new("+");
        assert!(button.on_click(Pos2::ZERO));
        assert_eq!(button.clicks, 1);
    }
}
