// SPDX-License-Identifier: MIT OR Apache-2.0
//! View transform and small geometry helpers shared by layout, routing and hit-testing.

use egui::{Pos2, Rect, Vec2};

/// Smallest zoom factor the view accepts unless configured otherwise.
pub const DEFAULT_MIN_ZOOM: f32 = 0.25;
/// Largest zoom factor the view accepts unless configured otherwise.
pub const DEFAULT_MAX_ZOOM: f32 = 5.0;

/// Pan and zoom between graph space and screen space.
///
/// Zooming is uniform and anchored on the viewport center:
/// `screen = translation + center + zoom * (graph - center)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Screen-space offset applied after scaling
    pub translation: Vec2,
    /// Screen rectangle the graph is shown in
    pub viewport: Rect,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl ViewTransform {
    /// Create an unscaled, untranslated view over a viewport.
    pub fn new(viewport: Rect) -> Self {
        Self {
            translation: Vec2::ZERO,
            viewport,
            zoom: 1.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Replace the zoom limits and re-clamp the current zoom.
    pub fn with_zoom_limits(mut self, min_zoom: f32, max_zoom: f32) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.set_zoom(self.zoom);
        self
    }

    /// Current zoom factor.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor, clamped to the configured limits.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Multiply the zoom factor, clamped to the configured limits.
    pub fn scale_zoom(&mut self, factor: f32) {
        self.set_zoom(self.zoom * factor);
    }

    /// Map a graph-space point to the screen.
    pub fn to_screen(&self, graph_pos: Pos2) -> Pos2 {
        let center = self.viewport.center();
        center + (graph_pos - center) * self.zoom + self.translation
    }

    /// Map a screen point to graph space.
    pub fn to_graph(&self, screen_pos: Pos2) -> Pos2 {
        let center = self.viewport.center();
        center + (screen_pos - self.translation - center) / self.zoom
    }

    /// Map a graph-space rectangle to the screen.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    /// Map a screen rectangle to graph space.
    pub fn rect_to_graph(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_graph(rect.min), self.to_graph(rect.max))
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)))
    }
}

/// Sample a cubic Bezier curve into `segments + 1` points.
pub fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(1);
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
        let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;

        points.push(Pos2::new(x, y));
    }
    points
}

/// Point-in-polygon test using the nonzero winding rule.
pub fn polygon_contains(polygon: &[Pos2], point: Pos2) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut winding = 0i32;
    for (i, &a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        let side = (b.x - a.x) * (point.y - a.y) - (point.x - a.x) * (b.y - a.y);
        if a.y <= point.y {
            if b.y > point.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= point.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding != 0
}

/// Union of a set of rectangles, `Rect::NOTHING` when empty.
pub fn union_rects(rects: impl IntoIterator<Item = Rect>) -> Rect {
    rects.into_iter().fold(Rect::NOTHING, |acc, rect| acc.union(rect))
}

/// Whether a rectangle has been laid out with a positive area.
pub fn is_laid_out(rect: Rect) -> bool {
    rect.is_positive()
}

/// Unit vector in the direction of `v`, zero for a zero vector.
pub(crate) fn normalized_or_zero(v: Vec2) -> Vec2 {
    let length = v.length();
    if length > f32::EPSILON {
        v / length
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_view_round_trip_with_pan_and_zoom() {
        let mut view = ViewTransform::new(Rect::from_min_size(Pos2::ZERO, Vec2::new(200.0, 100.0)));
        view.translation = Vec2::new(15.0, -7.0);
        view.set_zoom(2.0);

        let graph = Pos2::new(40.0, 80.0);
        let screen = view.to_screen(graph);
        // center (100,50) + 2 * (-60, 30) + (15, -7)
        assert!(approx(screen, Pos2::new(-5.0, 103.0)));
        assert!(approx(view.to_graph(screen), graph));
    }

    #[test]
    fn test_zoom_clamps_to_limits() {
        let mut view = ViewTransform::default();
        for _ in 0..100 {
            view.scale_zoom(2.0);
        }
        assert_eq!(view.zoom(), 5.0);
        for _ in 0..100 {
            view.scale_zoom(0.5);
        }
        assert_eq!(view.zoom(), 0.25);
        view.set_zoom(f32::INFINITY);
        assert_eq!(view.zoom(), 5.0);
    }

    #[test]
    fn test_custom_zoom_limits_reclamp() {
        let mut view = ViewTransform::default();
        view.set_zoom(4.0);
        let view = view.with_zoom_limits(0.5, 2.0);
        assert_eq!(view.zoom(), 2.0);
    }

    #[test]
    fn test_bezier_endpoints() {
        let points = bezier_points(
            Pos2::new(0.0, 0.0),
            Pos2::new(10.0, 0.0),
            Pos2::new(20.0, 10.0),
            Pos2::new(30.0, 10.0),
            8,
        );
        assert_eq!(points.len(), 9);
        assert!(approx(points[0], Pos2::new(0.0, 0.0)));
        assert!(approx(points[8], Pos2::new(30.0, 10.0)));
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Pos2::new(0.0, 0.0),
            Pos2::new(10.0, 0.0),
            Pos2::new(10.0, 10.0),
            Pos2::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, Pos2::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, Pos2::new(15.0, 5.0)));
        assert!(!polygon_contains(&square[..2], Pos2::new(5.0, 0.0)));
    }

    #[test]
    fn test_union_of_nothing_is_not_laid_out() {
        assert!(!is_laid_out(union_rects(std::iter::empty())));
        let union = union_rects([
            Rect::from_min_size(Pos2::ZERO, Vec2::splat(1.0)),
            Rect::from_min_size(Pos2::new(4.0, 4.0), Vec2::splat(1.0)),
        ]);
        assert_eq!(union, Rect::from_min_max(Pos2::ZERO, Pos2::new(5.0, 5.0)));
    }
}
