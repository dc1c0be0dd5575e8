//! Interactive shape definitions.

mod cursor;
mod line;
mod rectangle;

pub use cursor::{Cursor, CursorOptions};
pub use line::{Line, LineOptions};
pub use rectangle::{Rectangle, RectangleOptions};

use crate::error::{DrapoError, Result};
use crate::event::EventKind;
use crate::host::{ArtifactSpec, SubregionId};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Variant tag of an interactive object, used as the registry index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Line,
    Rectangle,
    Cursor,
}

impl ObjectKind {
    /// Human-readable name, used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Line => "Draggable Line",
            ObjectKind::Rectangle => "Draggable Rectangle",
            ObjectKind::Cursor => "Cursor",
        }
    }

    /// Event kinds objects of this kind subscribe to.
    pub fn events(&self) -> &'static [EventKind] {
        const DRAGGABLE: &[EventKind] = &[
            EventKind::Press,
            EventKind::Release,
            EventKind::Motion,
            EventKind::Key,
            EventKind::Resize,
            EventKind::Close,
        ];
        const CURSOR: &[EventKind] = &[
            EventKind::Press,
            EventKind::Release,
            EventKind::Motion,
            EventKind::Key,
            EventKind::Enter,
            EventKind::Leave,
            EventKind::Resize,
            EventKind::Close,
        ];
        match self {
            ObjectKind::Line | ObjectKind::Rectangle => DRAGGABLE,
            ObjectKind::Cursor => CURSOR,
        }
    }
}

/// Parts of a shape found under the pointer.
///
/// `points` are tracked-point indices sorted nearest first; `segments` are
/// indices of pickable polylines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Picked {
    pub points: Vec<usize>,
    pub segments: Vec<usize>,
}

impl Picked {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty()
    }
}

/// How the tracked points move during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    /// Parallel translation of every tracked point.
    Whole,
    /// A single line endpoint follows the pointer.
    Endpoint(usize),
    /// A rectangle edge moves perpendicular to itself.
    Edge(usize),
    /// A rectangle corner follows the pointer, adjacent corners adjust.
    Corner(usize),
    /// The cursor jumps to the pointer.
    Follow,
}

/// Snapshot taken when a drag starts.
///
/// Positions are kept in data coordinates and converted with the transform
/// current at each motion step, so a resize during a drag stays consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct PressInfo {
    /// Pointer position at the press.
    pub click: Point,
    /// Tracked points at the press.
    pub anchors: Vec<Point>,
}

impl PressInfo {
    /// Pixel offset of each tracked point relative to the press position.
    pub fn offsets(&self, to_px: Affine) -> Vec<kurbo::Vec2> {
        let click = to_px * self.click;
        self.anchors.iter().map(|a| to_px * *a - click).collect()
    }

    /// Pixel position of the press.
    pub fn click_px(&self, to_px: Affine) -> Point {
        to_px * self.click
    }

    /// Pixel position of anchor `i`.
    pub fn anchor_px(&self, i: usize, to_px: Affine) -> Point {
        to_px * self.anchors[i]
    }
}

/// Motion mode and the tracked points it moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub mode: MotionMode,
    pub live: Vec<usize>,
}

/// Host information handed to a shape while it is created.
#[derive(Debug, Clone)]
pub struct CreateContext {
    pub subregion: SubregionId,
    pub to_px: Affine,
    pub limits: Rect,
    /// Tracked points of the other same-kind objects in the subregion.
    pub peers: Vec<Vec<Point>>,
}

impl CreateContext {
    /// Fails unless the transform can map pixels back to data.
    pub fn check(&self) -> Result<()> {
        if is_invertible(self.to_px) {
            Ok(())
        } else {
            Err(DrapoError::HostState(format!(
                "Subregion {:?} has a degenerate transform",
                self.subregion
            )))
        }
    }
}

/// Capability contract shared by every interactive variant.
pub trait InteractiveShape {
    fn kind(&self) -> ObjectKind;

    /// Compute the initial geometry; returns the artifacts to add, in draw order.
    fn create(&mut self, cx: &CreateContext) -> Result<Vec<ArtifactSpec>>;

    /// Current artifacts, in the same order as returned by `create`.
    fn artifacts(&self) -> Vec<ArtifactSpec>;

    /// Current tracked points in data coordinates.
    fn tracked_points(&self) -> Vec<Point>;

    /// Parts under `pointer_px`, `None` when nothing is picked.
    fn pick(&self, pointer_px: Point, to_px: Affine) -> Option<Picked>;

    /// Record the press position and the tracked points.
    fn capture_press_info(&self, pointer_px: Point, to_px: Affine) -> PressInfo {
        PressInfo {
            click: to_px.inverse() * pointer_px,
            anchors: self.tracked_points(),
        }
    }

    /// Derive the motion mode from what was picked.
    fn capture_active_info(&self, picked: &Picked) -> Option<ActiveInfo>;

    /// Move the live tracked points for a pointer at `pointer_px`.
    fn recompute_position(
        &mut self,
        pointer_px: Point,
        press: &PressInfo,
        active: &ActiveInfo,
        to_px: Affine,
    );
}

/// Enum wrapper for all interactive variants.
#[derive(Debug, Clone)]
pub enum Object {
    Line(Line),
    Rectangle(Rectangle),
    Cursor(Cursor),
}

impl Object {
    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Object::Line(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_rectangle(&self) -> Option<&Rectangle> {
        match self {
            Object::Rectangle(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_cursor(&self) -> Option<&Cursor> {
        match self {
            Object::Cursor(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_cursor_mut(&mut self) -> Option<&mut Cursor> {
        match self {
            Object::Cursor(c) => Some(c),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn InteractiveShape {
        match self {
            Object::Line(l) => l,
            Object::Rectangle(r) => r,
            Object::Cursor(c) => c,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn InteractiveShape {
        match self {
            Object::Line(l) => l,
            Object::Rectangle(r) => r,
            Object::Cursor(c) => c,
        }
    }
}

impl InteractiveShape for Object {
    fn kind(&self) -> ObjectKind {
        self.inner().kind()
    }

    fn create(&mut self, cx: &CreateContext) -> Result<Vec<ArtifactSpec>> {
        self.inner_mut().create(cx)
    }

    fn artifacts(&self) -> Vec<ArtifactSpec> {
        self.inner().artifacts()
    }

    fn tracked_points(&self) -> Vec<Point> {
        self.inner().tracked_points()
    }

    fn pick(&self, pointer_px: Point, to_px: Affine) -> Option<Picked> {
        self.inner().pick(pointer_px, to_px)
    }

    fn capture_press_info(&self, pointer_px: Point, to_px: Affine) -> PressInfo {
        self.inner().capture_press_info(pointer_px, to_px)
    }

    fn capture_active_info(&self, picked: &Picked) -> Option<ActiveInfo> {
        self.inner().capture_active_info(picked)
    }

    fn recompute_position(
        &mut self,
        pointer_px: Point,
        press: &PressInfo,
        active: &ActiveInfo,
        to_px: Affine,
    ) {
        self.inner_mut()
            .recompute_position(pointer_px, press, active, to_px)
    }
}

/// Whether `affine` maps pixels back to finite data coordinates.
pub fn is_invertible(affine: Affine) -> bool {
    let det = affine.determinant();
    det.is_finite() && det.abs() > f64::EPSILON && affine.as_coeffs().iter().all(|c| c.is_finite())
}

/// Distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Indices of `points` (in pixels) within `radius` of `pointer`, nearest first.
pub(crate) fn points_within(pointer: Point, points: &[Point], radius: f64) -> Vec<usize> {
    let mut hits: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, pointer.distance(*p)))
        .filter(|(_, d)| *d <= radius)
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits.into_iter().map(|(i, _)| i).collect()
}
