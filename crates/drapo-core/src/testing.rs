//! Recording host used by unit tests.

use crate::event::{Event, Location};
use crate::host::{ArtifactId, ArtifactSpec, CanvasId, Host, SubregionId};
use crate::style::SerializableColor;
use kurbo::{Affine, Point, Rect};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub const CANVAS: CanvasId = CanvasId(0);
pub const SUB: SubregionId = SubregionId(0);

/// Route `log` output through the test harness; `RUST_LOG=debug` shows it.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Host calls, in the order they were made.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Add(ArtifactId),
    Update(ArtifactId),
    SetVisible(ArtifactId, bool),
    Remove(ArtifactId),
    Redraw(CanvasId),
    Capture(CanvasId, Vec<ArtifactId>),
    Restore(CanvasId),
    Draw(CanvasId, ArtifactId),
    Present(CanvasId),
    Face(CanvasId, Option<SubregionId>, Option<SerializableColor>),
}

/// One 400x400 px canvas with a single subregion showing data 0..10 x 0..10.
#[derive(Debug, Default)]
pub struct MockHost {
    pub calls: Vec<MockCall>,
    pub artifacts: HashMap<ArtifactId, (ArtifactSpec, bool)>,
    pub events: VecDeque<Event>,
    /// Current canvas and subregion, once set.
    pub current: Option<(CanvasId, Option<SubregionId>)>,
    /// The canvas is gone; no canvas is listed.
    pub closed: bool,
    /// Squash the transform to zero, as a host does for a zero-sized canvas.
    pub collapsed: bool,
    next_id: u64,
}

impl MockHost {
    pub fn single() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, 400.0, 400.0)
    }

    pub fn to_px(&self, _subregion: SubregionId) -> Affine {
        if self.collapsed {
            Affine::new([0.0; 6])
        } else {
            Affine::new([40.0, 0.0, 0.0, -40.0, 0.0, 400.0])
        }
    }

    /// Location of a pixel position on the canvas.
    pub fn locate(&self, pixel: Point) -> Location {
        if self.bounds().contains(pixel) {
            Location::inside(CANVAS, SUB, pixel, self.to_px(SUB).inverse() * pixel)
        } else {
            Location::outside(CANVAS, pixel)
        }
    }

    pub fn live_artifacts(&self) -> usize {
        self.artifacts.len()
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

impl Host for MockHost {
    type Snapshot = u64;

    fn canvases(&self) -> Vec<CanvasId> {
        if self.closed { Vec::new() } else { vec![CANVAS] }
    }

    fn set_current(&mut self, canvas: CanvasId, subregion: Option<SubregionId>) {
        self.current = Some((canvas, subregion));
    }

    fn set_face(
        &mut self,
        canvas: CanvasId,
        subregion: Option<SubregionId>,
        color: Option<SerializableColor>,
    ) {
        self.calls.push(MockCall::Face(canvas, subregion, color));
    }

    fn subregions(&self, canvas: CanvasId) -> Vec<SubregionId> {
        if canvas == CANVAS { vec![SUB] } else { Vec::new() }
    }

    fn current_subregion(&self, canvas: CanvasId) -> Option<SubregionId> {
        match self.current {
            Some((current, Some(subregion))) if current == canvas => Some(subregion),
            _ => self.subregions(canvas).first().copied(),
        }
    }

    fn canvas_of(&self, subregion: SubregionId) -> Option<CanvasId> {
        (subregion == SUB).then_some(CANVAS)
    }

    fn data_to_pixel(&self, subregion: SubregionId) -> Option<Affine> {
        (subregion == SUB).then(|| self.to_px(subregion))
    }

    fn data_limits(&self, subregion: SubregionId) -> Option<Rect> {
        (subregion == SUB).then(|| Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    fn add_artifact(&mut self, _subregion: SubregionId, spec: &ArtifactSpec) -> ArtifactId {
        self.next_id += 1;
        let id = ArtifactId(self.next_id);
        self.artifacts.insert(id, (spec.clone(), true));
        self.calls.push(MockCall::Add(id));
        id
    }

    fn update_artifact(&mut self, artifact: ArtifactId, spec: &ArtifactSpec) {
        if let Some(entry) = self.artifacts.get_mut(&artifact) {
            entry.0 = spec.clone();
        }
        self.calls.push(MockCall::Update(artifact));
    }

    fn set_visible(&mut self, artifact: ArtifactId, visible: bool) {
        if let Some(entry) = self.artifacts.get_mut(&artifact) {
            entry.1 = visible;
        }
        self.calls.push(MockCall::SetVisible(artifact, visible));
    }

    fn remove_artifact(&mut self, artifact: ArtifactId) {
        self.artifacts.remove(&artifact);
        self.calls.push(MockCall::Remove(artifact));
    }

    fn redraw(&mut self, canvas: CanvasId) {
        self.calls.push(MockCall::Redraw(canvas));
    }

    fn capture_background(&mut self, canvas: CanvasId, hidden: &[ArtifactId]) -> u64 {
        self.calls.push(MockCall::Capture(canvas, hidden.to_vec()));
        self.calls.len() as u64
    }

    fn restore_background(&mut self, canvas: CanvasId, _snapshot: &u64) {
        self.calls.push(MockCall::Restore(canvas));
    }

    fn draw_artifact(&mut self, canvas: CanvasId, artifact: ArtifactId) {
        self.calls.push(MockCall::Draw(canvas, artifact));
    }

    fn present(&mut self, canvas: CanvasId) {
        self.calls.push(MockCall::Present(canvas));
    }

    fn next_event(&mut self, _timeout: Option<Duration>) -> Option<Event> {
        self.events.pop_front()
    }
}
