//! Draggable rectangle with corner, edge and centre handles.
//!
//! Corners and edges are indexed as follows (edge `i` joins corner `i - 1`
//! and corner `i`):
//!
//! ```text
//!              edge 3
//!   corner 3 ---------- corner 2
//!      |                   |
//!   edge 0               edge 2
//!      |                   |
//!   corner 0 ---------- corner 1
//!              edge 1
//! ```
//!
//! The centre is tracked point 4.

use super::{
    ActiveInfo, CreateContext, InteractiveShape, MotionMode, ObjectKind, Picked, PressInfo,
    point_to_segment_dist, points_within,
};
use crate::error::Result;
use crate::host::{ArtifactSpec, SubregionId};
use crate::style::{LineStyle, MarkerSymbol, Paint, SerializableColor};
use kurbo::{Affine, Point, Vec2};
use std::time::Duration;

/// Tracked-point index of the centre.
const CENTER: usize = 4;

/// Construction options of a [`Rectangle`].
#[derive(Debug, Clone, PartialEq)]
pub struct RectangleOptions {
    pub subregion: Option<SubregionId>,
    pub color: Option<String>,
    pub pick_size: f64,
    pub marker: MarkerSymbol,
    pub marker_size: f64,
    pub line_style: LineStyle,
    pub line_width: f64,
    /// `(x0, y0, width, height)` in data coordinates; centred when `None`.
    pub position: Option<(f64, f64, f64, f64)>,
    pub blit: Option<bool>,
    pub block: bool,
    /// Blocking timeout; waits indefinitely when `None`.
    pub timeout: Option<Duration>,
}

impl Default for RectangleOptions {
    fn default() -> Self {
        Self {
            subregion: None,
            color: None,
            pick_size: 5.0,
            marker: MarkerSymbol::Dot,
            marker_size: 5.0,
            line_style: LineStyle::Solid,
            line_width: 1.0,
            position: None,
            blit: None,
            block: false,
            timeout: None,
        }
    }
}

/// Four corners, four edges and a centre marker.
#[derive(Debug, Clone)]
pub struct Rectangle {
    corners: [Point; 4],
    center: Point,
    color: SerializableColor,
    pick_size: f64,
    marker: MarkerSymbol,
    marker_size: f64,
    line_style: LineStyle,
    line_width: f64,
    requested: Option<(f64, f64, f64, f64)>,
}

impl Rectangle {
    /// Relative size of the default rectangle inside the subregion.
    const INITIAL_SIZE: f64 = 0.5;

    pub fn new(options: &RectangleOptions, color: SerializableColor) -> Self {
        Self {
            corners: [Point::ZERO; 4],
            center: Point::ZERO,
            color,
            pick_size: options.pick_size,
            marker: options.marker,
            marker_size: options.marker_size,
            line_style: options.line_style,
            line_width: options.line_width,
            requested: options.position,
        }
    }

    /// `(xmin, ymin, width, height)` in data coordinates.
    pub fn position(&self) -> (f64, f64, f64, f64) {
        let xs = self.corners.map(|c| c.x);
        let ys = self.corners.map(|c| c.y);
        let xmin = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let xmax = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ymin = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let ymax = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (xmin, ymin, xmax - xmin, ymax - ymin)
    }

    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    /// Corners joined by edge `i`.
    fn edge(&self, i: usize) -> (Point, Point) {
        (self.corners[(i + 3) % 4], self.corners[i])
    }

    fn set_from_pixels(&mut self, left_low: Point, right_high: Point, to_data: Affine) {
        let (l, r) = (left_low.x, right_high.x);
        let (lo, hi) = (left_low.y, right_high.y);
        self.corners = [
            to_data * Point::new(l, lo),
            to_data * Point::new(r, lo),
            to_data * Point::new(r, hi),
            to_data * Point::new(l, hi),
        ];
        self.center = to_data * left_low.midpoint(right_high);
    }

    /// Mode for a set of picked corners, `None` when it depends on edges.
    fn corner_mode(corners: &[usize]) -> Option<MotionMode> {
        match corners {
            [] => None,
            [c] => Some(MotionMode::Corner(*c)),
            [a, b] => {
                let (a, b) = ((*a).min(*b), (*a).max(*b));
                match (a, b) {
                    (0, 3) => Some(MotionMode::Edge(0)),
                    (a, b) if b - a == 1 => Some(MotionMode::Edge(b)),
                    _ => Some(MotionMode::Whole),
                }
            }
            _ => Some(MotionMode::Whole),
        }
    }

    fn edge_mode(edges: &[usize]) -> Option<MotionMode> {
        match edges {
            [] => None,
            [e] => Some(MotionMode::Edge(*e)),
            [a, b] => {
                let (a, b) = ((*a).min(*b), (*a).max(*b));
                match (a, b) {
                    (0, 3) => Some(MotionMode::Corner(3)),
                    (a, b) if b - a == 1 => Some(MotionMode::Corner(a)),
                    _ => Some(MotionMode::Whole),
                }
            }
            _ => Some(MotionMode::Whole),
        }
    }

    fn live_points(mode: MotionMode) -> Vec<usize> {
        match mode {
            MotionMode::Edge(i) => vec![(i + 3) % 4, i, CENTER],
            MotionMode::Corner(i) => vec![i, (i + 3) % 4, (i + 1) % 4, CENTER],
            _ => (0..=CENTER).collect(),
        }
    }
}

impl InteractiveShape for Rectangle {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Rectangle
    }

    fn create(&mut self, cx: &CreateContext) -> Result<Vec<ArtifactSpec>> {
        cx.check()?;
        let to_data = cx.to_px.inverse();
        let (left_low, right_high) = match self.requested {
            Some((x0, y0, w, h)) => (
                cx.to_px * Point::new(x0, y0),
                cx.to_px * Point::new(x0 + w, y0 + h),
            ),
            None => {
                let min_px = cx.to_px * Point::new(cx.limits.x0, cx.limits.y0);
                let max_px = cx.to_px * Point::new(cx.limits.x1, cx.limits.y1);
                let s = Self::INITIAL_SIZE;
                (
                    min_px.lerp(max_px, (1.0 - s) / 2.0),
                    min_px.lerp(max_px, (1.0 + s) / 2.0),
                )
            }
        };
        self.set_from_pixels(left_low, right_high, to_data);
        Ok(self.artifacts())
    }

    fn artifacts(&self) -> Vec<ArtifactSpec> {
        let corner_paint = Paint::marker(self.color, self.marker, self.marker_size);
        let edge_paint = Paint::stroke(self.color, self.line_style, self.line_width);
        let center_paint = Paint::marker(self.color, MarkerSymbol::Plus, self.marker_size);

        let mut specs: Vec<ArtifactSpec> = self
            .corners
            .iter()
            .map(|c| ArtifactSpec::marker(*c, corner_paint))
            .collect();
        specs.extend((0..4).map(|i| {
            let (a, b) = self.edge(i);
            ArtifactSpec::polyline(vec![a, b], edge_paint)
        }));
        specs.push(ArtifactSpec::marker(self.center, center_paint));
        specs
    }

    fn tracked_points(&self) -> Vec<Point> {
        let mut points = self.corners.to_vec();
        points.push(self.center);
        points
    }

    fn pick(&self, pointer_px: Point, to_px: Affine) -> Option<Picked> {
        let radius = self.pick_size + self.marker_size / 2.0;
        let points_px: Vec<Point> = self.tracked_points().iter().map(|p| to_px * *p).collect();
        let points = points_within(pointer_px, &points_px, radius);
        let segments: Vec<usize> = (0..4)
            .filter(|&i| {
                let (a, b) = self.edge(i);
                point_to_segment_dist(pointer_px, to_px * a, to_px * b) <= self.pick_size
            })
            .collect();
        let picked = Picked { points, segments };
        (!picked.is_empty()).then_some(picked)
    }

    fn capture_active_info(&self, picked: &Picked) -> Option<ActiveInfo> {
        if picked.is_empty() {
            return None;
        }
        let mode = if picked.points.contains(&CENTER) {
            MotionMode::Whole
        } else {
            let mut corners = picked.points.clone();
            corners.sort_unstable();
            let mut edges = picked.segments.clone();
            edges.sort_unstable();
            Self::corner_mode(&corners).or_else(|| Self::edge_mode(&edges))?
        };
        Some(ActiveInfo {
            mode,
            live: Self::live_points(mode),
        })
    }

    fn recompute_position(
        &mut self,
        pointer_px: Point,
        press: &PressInfo,
        active: &ActiveInfo,
        to_px: Affine,
    ) {
        let to_data = to_px.inverse();
        let delta = pointer_px - press.click_px(to_px);
        let moved = |i: usize, d: Vec2| to_data * (press.anchor_px(i, to_px) + d);

        match active.mode {
            MotionMode::Whole => {
                for i in 0..4 {
                    self.corners[i] = moved(i, delta);
                }
                self.center = moved(CENTER, delta);
            }
            MotionMode::Edge(i) => {
                let d = if i % 2 == 1 {
                    Vec2::new(0.0, delta.y)
                } else {
                    Vec2::new(delta.x, 0.0)
                };
                let a = (i + 3) % 4;
                self.corners[a] = moved(a, d);
                self.corners[i] = moved(i, d);
                self.center = moved(CENTER, d / 2.0);
            }
            MotionMode::Corner(i) => {
                let picked = moved(i, delta);
                let prev = (i + 3) % 4;
                let next = (i + 1) % 4;
                let opposite = self.corners[(i + 2) % 4];
                self.corners[i] = picked;
                if i % 2 == 1 {
                    self.corners[prev] = Point::new(press.anchors[prev].x, picked.y);
                    self.corners[next] = Point::new(picked.x, press.anchors[next].y);
                } else {
                    self.corners[prev] = Point::new(picked.x, press.anchors[prev].y);
                    self.corners[next] = Point::new(press.anchors[next].x, picked.y);
                }
                self.center = picked.midpoint(opposite);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn context() -> CreateContext {
        CreateContext {
            subregion: SubregionId(0),
            to_px: Affine::new([100.0, 0.0, 0.0, -100.0, 0.0, 400.0]),
            limits: Rect::new(0.0, 0.0, 4.0, 4.0),
            peers: Vec::new(),
        }
    }

    fn created(position: Option<(f64, f64, f64, f64)>) -> Rectangle {
        let options = RectangleOptions {
            position,
            ..RectangleOptions::default()
        };
        let mut rect = Rectangle::new(&options, SerializableColor::black());
        rect.create(&context()).unwrap();
        rect
    }

    fn assert_position(rect: &Rectangle, expected: (f64, f64, f64, f64)) {
        let (x, y, w, h) = rect.position();
        assert!((x - expected.0).abs() < 1e-9, "x {x} != {}", expected.0);
        assert!((y - expected.1).abs() < 1e-9, "y {y} != {}", expected.1);
        assert!((w - expected.2).abs() < 1e-9, "w {w} != {}", expected.2);
        assert!((h - expected.3).abs() < 1e-9, "h {h} != {}", expected.3);
    }

    fn drag(rect: &mut Rectangle, mode: MotionMode, from: Point, to: Point) {
        let to_px = context().to_px;
        let press = rect.capture_press_info(to_px * from, to_px);
        let active = ActiveInfo {
            mode,
            live: Rectangle::live_points(mode),
        };
        rect.recompute_position(to_px * to, &press, &active, to_px);
    }

    #[test]
    fn test_default_position_centered() {
        let rect = created(None);
        assert_position(&rect, (1.0, 1.0, 2.0, 2.0));
        assert!((rect.center().x - 2.0).abs() < 1e-9);
        assert_eq!(rect.artifacts().len(), 9);
    }

    #[test]
    fn test_explicit_position() {
        let rect = created(Some((0.5, 1.0, 1.0, 2.0)));
        assert_position(&rect, (0.5, 1.0, 1.0, 2.0));
        assert!((rect.corners()[2].y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_active_info_modes() {
        let rect = created(None);
        let mode = |points: Vec<usize>, segments: Vec<usize>| {
            rect.capture_active_info(&Picked { points, segments })
                .map(|a| a.mode)
        };
        assert_eq!(mode(vec![4], vec![]), Some(MotionMode::Whole));
        assert_eq!(mode(vec![2], vec![2, 3]), Some(MotionMode::Corner(2)));
        assert_eq!(mode(vec![0, 1], vec![1]), Some(MotionMode::Edge(1)));
        assert_eq!(mode(vec![3, 0], vec![]), Some(MotionMode::Edge(0)));
        assert_eq!(mode(vec![0, 2], vec![]), Some(MotionMode::Whole));
        assert_eq!(mode(vec![], vec![2]), Some(MotionMode::Edge(2)));
        assert_eq!(mode(vec![], vec![1, 2]), Some(MotionMode::Corner(1)));
        assert_eq!(mode(vec![], vec![0, 3]), Some(MotionMode::Corner(3)));
        assert_eq!(mode(vec![], vec![1, 3]), Some(MotionMode::Whole));
        assert_eq!(mode(vec![], vec![]), None);
    }

    #[test]
    fn test_pick_center_and_edge() {
        let rect = created(None);
        let to_px = context().to_px;
        let picked = rect.pick(to_px * Point::new(2.0, 2.0), to_px).unwrap();
        assert_eq!(picked.points, vec![CENTER]);

        // Middle of the bottom edge.
        let picked = rect.pick(to_px * Point::new(2.0, 1.0), to_px).unwrap();
        assert_eq!(picked.segments, vec![1]);
        assert!(picked.points.is_empty());

        assert!(rect.pick(to_px * Point::new(0.2, 0.2), to_px).is_none());
    }

    #[test]
    fn test_drag_odd_edge_moves_vertically() {
        let mut rect = created(None);
        drag(&mut rect, MotionMode::Edge(1), Point::new(2.0, 1.0), Point::new(2.7, 0.5));
        assert_position(&rect, (1.0, 0.5, 2.0, 2.5));
        assert!((rect.center().y - 1.75).abs() < 1e-9);
        assert!((rect.center().x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_even_edge_moves_horizontally() {
        let mut rect = created(None);
        drag(&mut rect, MotionMode::Edge(2), Point::new(3.0, 2.0), Point::new(3.5, 3.0));
        assert_position(&rect, (1.0, 1.0, 2.5, 2.0));
    }

    #[test]
    fn test_drag_corner() {
        let mut rect = created(None);
        drag(&mut rect, MotionMode::Corner(2), Point::new(3.0, 3.0), Point::new(3.5, 3.5));
        assert_position(&rect, (1.0, 1.0, 2.5, 2.5));
        let corners = rect.corners();
        assert!((corners[1].x - 3.5).abs() < 1e-9 && (corners[1].y - 1.0).abs() < 1e-9);
        assert!((corners[3].x - 1.0).abs() < 1e-9 && (corners[3].y - 3.5).abs() < 1e-9);
        assert!((rect.center().x - 2.25).abs() < 1e-9);

        drag(&mut rect, MotionMode::Corner(1), Point::new(3.5, 1.0), Point::new(3.0, 0.0));
        let corners = rect.corners();
        assert!((corners[0].y).abs() < 1e-9 && (corners[0].x - 1.0).abs() < 1e-9);
        assert!((corners[2].x - 3.0).abs() < 1e-9 && (corners[2].y - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_drag_whole() {
        let mut rect = created(None);
        drag(&mut rect, MotionMode::Whole, Point::new(2.0, 2.0), Point::new(2.5, 1.5));
        assert_position(&rect, (1.5, 0.5, 2.0, 2.0));
    }
}
