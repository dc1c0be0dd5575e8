//! Draggable two-point line.

use super::{
    ActiveInfo, CreateContext, InteractiveShape, MotionMode, ObjectKind, Picked, PressInfo,
    point_to_segment_dist, points_within,
};
use crate::error::Result;
use crate::host::{ArtifactSpec, SubregionId};
use crate::style::{LineStyle, MarkerSymbol, Paint, SerializableColor};
use kurbo::{Affine, Point, Vec2};
use std::time::Duration;

/// Construction options of a [`Line`].
#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    /// Subregion to draw in; the canvas's current one when `None`.
    pub subregion: Option<SubregionId>,
    /// Color name; the palette default when `None`.
    pub color: Option<String>,
    /// Picking tolerance of the link, in pixels.
    pub pick_size: f64,
    pub marker: MarkerSymbol,
    pub marker_size: f64,
    pub line_style: LineStyle,
    pub line_width: f64,
    /// Shift the initial position away from existing lines' endpoints.
    pub avoid_existing: bool,
    /// Blitting flag; the configured default when `None`.
    pub blit: Option<bool>,
    pub block: bool,
    /// Blocking timeout; waits indefinitely when `None`.
    pub timeout: Option<Duration>,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            subregion: None,
            color: None,
            pick_size: 5.0,
            marker: MarkerSymbol::Dot,
            marker_size: 5.0,
            line_style: LineStyle::Solid,
            line_width: 1.0,
            avoid_existing: true,
            blit: None,
            block: false,
            timeout: None,
        }
    }
}

/// Two endpoint markers joined by a link.
///
/// Pressing an endpoint drags it alone; pressing the link translates the
/// whole line.
#[derive(Debug, Clone)]
pub struct Line {
    start: Point,
    end: Point,
    color: SerializableColor,
    pick_size: f64,
    marker: MarkerSymbol,
    marker_size: f64,
    line_style: LineStyle,
    line_width: f64,
    avoid_existing: bool,
}

impl Line {
    /// Relative position of the endpoints inside the subregion.
    const INITIAL: (f64, f64) = (0.2, 0.8);

    pub fn new(options: &LineOptions, color: SerializableColor) -> Self {
        Self {
            start: Point::ZERO,
            end: Point::ZERO,
            color,
            pick_size: options.pick_size,
            marker: options.marker,
            marker_size: options.marker_size,
            line_style: options.line_style,
            line_width: options.line_width,
            avoid_existing: options.avoid_existing,
        }
    }

    /// Endpoints in data coordinates.
    pub fn position(&self) -> [Point; 2] {
        [self.start, self.end]
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    /// Initial endpoints in pixels, shifted away from `peers` if requested.
    fn initial_position(&self, cx: &CreateContext) -> (Point, Point) {
        let (a, b) = Self::INITIAL;
        let min_px = cx.to_px * Point::new(cx.limits.x0, cx.limits.y0);
        let max_px = cx.to_px * Point::new(cx.limits.x1, cx.limits.y1);
        let mut p1 = min_px.lerp(max_px, a);
        let mut p2 = min_px.lerp(max_px, b);

        if self.avoid_existing {
            let min_dist = 3.0 * self.pick_size;
            let taken: Vec<Point> = cx
                .peers
                .iter()
                .flatten()
                .map(|p| cx.to_px * *p)
                .collect();
            let shift = Vec2::new(-min_dist, min_dist);
            while taken
                .iter()
                .any(|t| t.distance(p1).min(t.distance(p2)) < min_dist)
            {
                p1 += shift;
                p2 += shift;
            }
        }
        (p1, p2)
    }

    fn marker_paint(&self) -> Paint {
        Paint::marker(self.color, self.marker, self.marker_size)
    }

    fn link_paint(&self) -> Paint {
        Paint::stroke(self.color, self.line_style, self.line_width)
    }
}

impl InteractiveShape for Line {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Line
    }

    fn create(&mut self, cx: &CreateContext) -> Result<Vec<ArtifactSpec>> {
        cx.check()?;
        let (p1, p2) = self.initial_position(cx);
        let to_data = cx.to_px.inverse();
        self.start = to_data * p1;
        self.end = to_data * p2;
        Ok(self.artifacts())
    }

    fn artifacts(&self) -> Vec<ArtifactSpec> {
        vec![
            ArtifactSpec::marker(self.start, self.marker_paint()),
            ArtifactSpec::marker(self.end, self.marker_paint()),
            ArtifactSpec::polyline(vec![self.start, self.end], self.link_paint()),
        ]
    }

    fn tracked_points(&self) -> Vec<Point> {
        vec![self.start, self.end]
    }

    fn pick(&self, pointer_px: Point, to_px: Affine) -> Option<Picked> {
        let ends = [to_px * self.start, to_px * self.end];
        let points = points_within(pointer_px, &ends, self.marker_size);
        let segments = if point_to_segment_dist(pointer_px, ends[0], ends[1]) <= self.pick_size {
            vec![0]
        } else {
            Vec::new()
        };
        let picked = Picked { points, segments };
        (!picked.is_empty()).then_some(picked)
    }

    fn capture_active_info(&self, picked: &Picked) -> Option<ActiveInfo> {
        if let Some(&i) = picked.points.first() {
            Some(ActiveInfo {
                mode: MotionMode::Endpoint(i),
                live: vec![i],
            })
        } else if !picked.segments.is_empty() {
            Some(ActiveInfo {
                mode: MotionMode::Whole,
                live: vec![0, 1],
            })
        } else {
            None
        }
    }

    fn recompute_position(
        &mut self,
        pointer_px: Point,
        press: &PressInfo,
        active: &ActiveInfo,
        to_px: Affine,
    ) {
        let to_data = to_px.inverse();
        match active.mode {
            MotionMode::Endpoint(i) => {
                let p = to_data * pointer_px;
                if i == 0 {
                    self.start = p;
                } else {
                    self.end = p;
                }
            }
            MotionMode::Whole => {
                let delta = pointer_px - press.click_px(to_px);
                self.start = to_data * (press.anchor_px(0, to_px) + delta);
                self.end = to_data * (press.anchor_px(1, to_px) + delta);
            }
            _ => {}
        }
    }
}
