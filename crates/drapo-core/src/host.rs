//! Contract with the host windowing/plotting toolkit.

use crate::event::Event;
use crate::style::{Paint, SerializableColor};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier of a rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanvasId(pub u32);

/// Identifier of a coordinate frame inside a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubregionId(pub u32);

/// Identifier of a drawable primitive owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(pub u64);

/// Geometry of an artifact, in data coordinates of its subregion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A single point marker.
    Marker(Point),
    /// Connected line segments.
    Polyline(Vec<Point>),
}

impl Geometry {
    /// All vertices of the geometry.
    pub fn points(&self) -> &[Point] {
        match self {
            Geometry::Marker(p) => std::slice::from_ref(p),
            Geometry::Polyline(points) => points,
        }
    }
}

/// Everything the host needs to draw an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub geometry: Geometry,
    pub paint: Paint,
}

impl ArtifactSpec {
    /// A point marker.
    pub fn marker(at: Point, paint: Paint) -> Self {
        Self {
            geometry: Geometry::Marker(at),
            paint,
        }
    }

    /// A polyline through `points`.
    pub fn polyline(points: Vec<Point>, paint: Paint) -> Self {
        Self {
            geometry: Geometry::Polyline(points),
            paint,
        }
    }
}

/// Services the coordination layer requires from the host toolkit.
///
/// Implementations own canvases, subregions and artifacts, convert between
/// data and pixel coordinates, rasterise, and deliver input events. All calls
/// happen on the thread running the host's event loop.
pub trait Host {
    /// Stored pixel buffer of a rendered canvas.
    type Snapshot;

    /// Open canvases, in creation order.
    fn canvases(&self) -> Vec<CanvasId>;

    /// Make `canvas` current, and `subregion` (one of its subregions) its
    /// current subregion when given.
    fn set_current(&mut self, canvas: CanvasId, subregion: Option<SubregionId>);

    /// Paint the face of `canvas`, or of `subregion` on it, with `color`.
    ///
    /// `None` restores the face the canvas or subregion was created with.
    /// Takes effect on the next redraw.
    fn set_face(
        &mut self,
        canvas: CanvasId,
        subregion: Option<SubregionId>,
        color: Option<SerializableColor>,
    );

    /// Subregions hosted by `canvas`, in creation order.
    fn subregions(&self, canvas: CanvasId) -> Vec<SubregionId>;

    /// Subregion used when the caller does not name one.
    fn current_subregion(&self, canvas: CanvasId) -> Option<SubregionId> {
        self.subregions(canvas).first().copied()
    }

    /// Canvas hosting `subregion`.
    fn canvas_of(&self, subregion: SubregionId) -> Option<CanvasId>;

    /// Current data-to-pixel transform of `subregion`.
    fn data_to_pixel(&self, subregion: SubregionId) -> Option<Affine>;

    /// Current data limits of `subregion` (x0..x1 horizontally, y0..y1 vertically).
    fn data_limits(&self, subregion: SubregionId) -> Option<Rect>;

    /// Create a visible artifact in `subregion`.
    fn add_artifact(&mut self, subregion: SubregionId, spec: &ArtifactSpec) -> ArtifactId;

    /// Replace the geometry and paint of an artifact.
    fn update_artifact(&mut self, artifact: ArtifactId, spec: &ArtifactSpec);

    /// Show or hide an artifact.
    fn set_visible(&mut self, artifact: ArtifactId, visible: bool);

    /// Permanently remove an artifact.
    fn remove_artifact(&mut self, artifact: ArtifactId);

    /// Render the whole canvas and show it.
    fn redraw(&mut self, canvas: CanvasId);

    /// Render the whole canvas with `hidden` left out and return the pixels.
    fn capture_background(&mut self, canvas: CanvasId, hidden: &[ArtifactId]) -> Self::Snapshot;

    /// Copy a stored snapshot into the canvas back buffer.
    fn restore_background(&mut self, canvas: CanvasId, snapshot: &Self::Snapshot);

    /// Draw a single artifact over the back buffer.
    fn draw_artifact(&mut self, canvas: CanvasId, artifact: ArtifactId);

    /// Show the composed back buffer.
    fn present(&mut self, canvas: CanvasId);

    /// Wait for the next input event, servicing the host run loop meanwhile.
    ///
    /// Returns `None` when `timeout` elapsed (or the loop has nothing more to
    /// deliver). `timeout = None` waits indefinitely.
    fn next_event(&mut self, timeout: Option<Duration>) -> Option<Event>;
}

/// Pixel position of a data point under `to_px`.
pub fn to_pixel(to_px: Affine, data: Point) -> Point {
    to_px * data
}

/// Data position of a pixel point under `to_px`.
pub fn to_data(to_px: Affine, pixel: Point) -> Point {
    to_px.inverse() * pixel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_points() {
        let marker = Geometry::Marker(Point::new(1.0, 2.0));
        assert_eq!(marker.points(), &[Point::new(1.0, 2.0)]);

        let line = Geometry::Polyline(vec![Point::ZERO, Point::new(3.0, 4.0)]);
        assert_eq!(line.points().len(), 2);
    }

    #[test]
    fn test_pixel_data_roundtrip() {
        let to_px = Affine::new([20.0, 0.0, 0.0, -10.0, 5.0, 300.0]);
        let data = Point::new(3.5, -1.25);
        let back = to_data(to_px, to_pixel(to_px, data));
        assert!((back.x - data.x).abs() < 1e-10);
        assert!((back.y - data.y).abs() < 1e-10);
    }
}
