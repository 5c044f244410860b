// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection routing: tapered Bezier outlines between connector anchors.
//!
//! The same outline is used to paint a connection and, with an extra
//! margin, to hit-test it.

use crate::constants::{
    ARROW_SIZE, CONNECTION_HIT_MARGIN, CONNECTION_WIDTH, CONNECTION_WIDTH_HIGHLIGHT,
    CONTROL_POINT_MIN_OFFSET, DUPLICATE_POINT_DISTANCE, FLATTEN_STEP,
};
use crate::geometry::{bezier_points, normalized_or_zero, polygon_contains};
use egui::{Pos2, Rect, Vec2};

/// Thickness and decoration of a routed connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStyle {
    /// Half thickness at the source
    pub start_width: f32,
    /// Half thickness at the destination
    pub end_width: f32,
    /// Added to both widths, used as hit-test margin
    pub extra_thickness: f32,
    /// Draw an arrowhead at the destination
    pub arrow: bool,
}

impl RouteStyle {
    /// Connection at rest.
    pub fn normal() -> Self {
        Self {
            start_width: CONNECTION_WIDTH,
            end_width: CONNECTION_WIDTH,
            extra_thickness: 0.0,
            arrow: true,
        }
    }

    /// Hovered, dragged or focused connection.
    pub fn highlighted() -> Self {
        Self {
            start_width: CONNECTION_WIDTH_HIGHLIGHT,
            end_width: CONNECTION_WIDTH_HIGHLIGHT,
            ..Self::normal()
        }
    }

    /// Region used for hit-testing.
    pub fn hit_test() -> Self {
        Self {
            extra_thickness: CONNECTION_HIT_MARGIN,
            ..Self::normal()
        }
    }
}

impl Default for RouteStyle {
    fn default() -> Self {
        Self::normal()
    }
}

/// A routed connection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionPath {
    /// Flattened curve, duplicates removed
    pub centerline: Vec<Pos2>,
    /// Closed outline: left side, arrow or tip, right side reversed
    pub outline: Vec<Pos2>,
    /// Point halfway along the curve
    pub center: Pos2,
    /// Length of the centerline
    pub length: f32,
}

impl ConnectionPath {
    /// Bounding box of the outline.
    pub fn bounds(&self) -> Rect {
        if self.outline.is_empty() {
            return Rect::from_points(&self.centerline);
        }
        Rect::from_points(&self.outline)
    }

    /// Whether a point lies inside the outline.
    pub fn contains(&self, point: Pos2) -> bool {
        self.bounds().contains(point) && polygon_contains(&self.outline, point)
    }
}

/// Control points of the curve from `from` to `to`.
///
/// Both control points are offset horizontally so the curve leaves the
/// output to the right and enters the input from the left.
pub fn control_points(from: Pos2, to: Pos2) -> [Pos2; 4] {
    let offset = CONTROL_POINT_MIN_OFFSET.max((to.x - from.x).abs() / 2.0);
    [
        from,
        Pos2::new(from.x + offset, from.y),
        Pos2::new(to.x - offset, to.y),
        to,
    ]
}

fn segment_count(points: &[Pos2; 4]) -> usize {
    let hull = (points[1] - points[0]).length()
        + (points[2] - points[1]).length()
        + (points[3] - points[2]).length();
    let chord = (points[3] - points[0]).length();
    let estimate = (hull + chord) / 2.0;
    ((estimate / FLATTEN_STEP).ceil() as usize).clamp(4, 64)
}

fn far_apart(a: Pos2, b: Pos2) -> bool {
    (a.x - b.x).abs() > DUPLICATE_POINT_DISTANCE || (a.y - b.y).abs() > DUPLICATE_POINT_DISTANCE
}

/// Drop points within the duplicate distance of the previous kept point.
/// The final point always survives.
fn dedupe(points: Vec<Pos2>) -> Vec<Pos2> {
    let Some(&last) = points.last() else {
        return points;
    };
    let mut kept: Vec<Pos2> = Vec::with_capacity(points.len());
    for point in points {
        match kept.last() {
            Some(&previous) if !far_apart(previous, point) => {}
            _ => kept.push(point),
        }
    }
    if kept.len() > 1 {
        if let Some(end) = kept.last_mut() {
            *end = last;
        }
        while kept.len() > 1 && !far_apart(kept[kept.len() - 2], last) {
            kept.remove(kept.len() - 2);
        }
    }
    kept
}

/// Route a connection from an output anchor to an input anchor.
pub fn route(from: Pos2, to: Pos2, style: &RouteStyle) -> ConnectionPath {
    let controls = control_points(from, to);
    let centerline = dedupe(bezier_points(
        controls[0],
        controls[1],
        controls[2],
        controls[3],
        segment_count(&controls),
    ));
    if centerline.len() < 2 {
        return ConnectionPath {
            center: from,
            centerline,
            ..ConnectionPath::default()
        };
    }

    let mut distances = Vec::with_capacity(centerline.len());
    let mut length = 0.0;
    distances.push(0.0);
    for pair in centerline.windows(2) {
        length += (pair[1] - pair[0]).length();
        distances.push(length);
    }

    let mut left_side: Vec<Pos2> = Vec::with_capacity(centerline.len());
    let mut right_side: Vec<Pos2> = Vec::with_capacity(centerline.len());
    let start_width = style.start_width + style.extra_thickness;
    let end_width = style.end_width + style.extra_thickness;
    let last_index = centerline.len() - 1;
    for (i, &point) in centerline.iter().enumerate() {
        let incoming = if i > 0 { point - centerline[i - 1] } else { Vec2::ZERO };
        let outgoing = if i < last_index { centerline[i + 1] - point } else { Vec2::ZERO };
        let tangent = normalized_or_zero(normalized_or_zero(incoming) + normalized_or_zero(outgoing));
        let normal = Vec2::new(-tangent.y, tangent.x);
        let t = if length > 0.0 { distances[i] / length } else { 0.0 };
        let width = start_width + (end_width - start_width) * t;

        let left = point + normal * width;
        let right = point - normal * width;
        if left_side.last().map_or(true, |&p| far_apart(p, left)) {
            left_side.push(left);
        }
        if right_side.last().map_or(true, |&p| far_apart(p, right)) {
            right_side.push(right);
        }
    }

    let half = length / 2.0;
    let mut center = centerline[0];
    for (i, pair) in centerline.windows(2).enumerate() {
        if distances[i + 1] >= half {
            let span = distances[i + 1] - distances[i];
            let t = if span > 0.0 { (half - distances[i]) / span } else { 0.0 };
            center = pair[0] + (pair[1] - pair[0]) * t;
            break;
        }
    }

    let mut outline = left_side;
    let end = centerline[last_index];
    if style.arrow {
        let size = ARROW_SIZE + style.extra_thickness;
        outline.push(Pos2::new(end.x - size, end.y + size));
        outline.push(Pos2::new(end.x + 1.0 + style.extra_thickness, end.y));
        outline.push(Pos2::new(end.x - size, end.y - size));
    } else {
        outline.push(end);
    }
    outline.extend(right_side.into_iter().rev());

    ConnectionPath {
        centerline,
        outline,
        center,
        length,
    }
}

/// Whether `point` lies on the connection from `from` to `to`, with the
/// hit-test margin.
pub fn hit_test(from: Pos2, to: Pos2, point: Pos2) -> bool {
    route(from, to, &RouteStyle::hit_test()).contains(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_offset_has_minimum() {
        let [_, c1, c2, _] = control_points(Pos2::new(0.0, 0.0), Pos2::new(20.0, 50.0));
        assert_eq!(c1, Pos2::new(30.0, 0.0));
        assert_eq!(c2, Pos2::new(-10.0, 50.0));

        let [_, c1, _, _] = control_points(Pos2::new(0.0, 0.0), Pos2::new(200.0, 0.0));
        assert_eq!(c1, Pos2::new(100.0, 0.0));
    }

    #[test]
    fn test_route_endpoints_and_center() {
        let path = route(Pos2::new(0.0, 0.0), Pos2::new(200.0, 0.0), &RouteStyle::normal());
        assert_eq!(path.centerline.first(), Some(&Pos2::new(0.0, 0.0)));
        assert_eq!(path.centerline.last(), Some(&Pos2::new(200.0, 0.0)));
        assert!((path.length - 200.0).abs() < 0.5);
        assert!((path.center.x - 100.0).abs() < 1.0);
        assert!(path.center.y.abs() < 1e-3);
    }

    #[test]
    fn test_no_near_duplicate_points() {
        let path = route(Pos2::new(0.0, 0.0), Pos2::new(3.0, 0.5), &RouteStyle::normal());
        for pair in path.centerline.windows(2) {
            assert!(far_apart(pair[0], pair[1]));
        }
    }

    #[test]
    fn test_width_tapers_between_ends() {
        let style = RouteStyle {
            start_width: 2.0,
            end_width: 10.0,
            extra_thickness: 0.0,
            arrow: false,
        };
        let path = route(Pos2::new(0.0, 0.0), Pos2::new(300.0, 0.0), &style);
        let first = path.outline[0];
        let before_tip = path.outline[path.outline.len() / 2 - 1];
        assert!((first.y - 2.0).abs() < 1e-3);
        assert!(before_tip.y > 9.0);
    }

    #[test]
    fn test_hit_test_margin() {
        let from = Pos2::new(0.0, 0.0);
        let to = Pos2::new(200.0, 0.0);
        let path = route(from, to, &RouteStyle::normal());
        let near = Pos2::new(100.0, CONNECTION_WIDTH + 3.0);
        assert!(!path.contains(near));
        assert!(hit_test(from, to, near));
        assert!(!hit_test(from, to, Pos2::new(100.0, 40.0)));
    }
}
