//! Headless software host: canvases and subregions backed by RGBA buffers.
//!
//! Each canvas keeps two buffers. The back buffer is where frames are
//! composed, the screen buffer is what was last shown. Artifacts are drawn in
//! creation order, so their ids double as z-order.

use crate::raster;
use drapo_core::{
    ArtifactId, ArtifactSpec, CanvasId, Event, Host, Location, MouseButton, SerializableColor,
    SubregionId,
};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point, Rect};
use peniko::Color;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the headless host.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Unknown canvas: {0:?}")]
    UnknownCanvas(CanvasId),
    #[error("Unknown subregion: {0:?}")]
    UnknownSubregion(SubregionId),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Export failed: {0}")]
    Export(String),
}

/// Result type for host operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Counters of rendering work, used to observe blitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Full canvas renders shown on screen.
    pub redraws: usize,
    /// Background snapshots taken.
    pub captures: usize,
    /// Snapshots copied back into a back buffer.
    pub restores: usize,
    /// Single artifacts drawn over a back buffer.
    pub artifact_draws: usize,
    /// Back buffers shown on screen.
    pub presents: usize,
}

#[derive(Debug)]
struct CanvasState {
    width: u32,
    height: u32,
    background: Rgba<u8>,
    /// Temporary face replacing `background`.
    highlight: Option<Rgba<u8>>,
    subregions: Vec<SubregionId>,
    current: Option<SubregionId>,
    screen: RgbaImage,
    back: RgbaImage,
    pointer: Option<SubregionId>,
}

impl CanvasState {
    fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            width,
            height,
            background,
            highlight: None,
            subregions: Vec::new(),
            current: None,
            screen: RgbaImage::from_pixel(width, height, background),
            back: RgbaImage::from_pixel(width, height, background),
            pointer: None,
        }
    }

    fn size(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }
}

#[derive(Debug, Clone)]
struct SubregionState {
    canvas: CanvasId,
    /// Area covered, as fractions of the canvas size.
    frac: Rect,
    /// Pixel area covered, derived from `frac`.
    bounds: Rect,
    /// Data area shown.
    limits: Rect,
    highlight: Option<Rgba<u8>>,
}

impl SubregionState {
    fn fit(&mut self, (width, height): (f64, f64)) {
        let f = self.frac;
        self.bounds = Rect::new(f.x0 * width, f.y0 * height, f.x1 * width, f.y1 * height);
    }

    /// Data-to-pixel transform; y grows upwards in data space.
    fn transform(&self) -> Affine {
        let (b, l) = (self.bounds, self.limits);
        let sx = b.width() / l.width();
        let sy = b.height() / l.height();
        Affine::new([sx, 0.0, 0.0, -sy, b.x0 - sx * l.x0, b.y1 + sy * l.y0])
    }
}

#[derive(Debug, Clone)]
struct ArtifactState {
    subregion: SubregionId,
    spec: ArtifactSpec,
    visible: bool,
}

/// Host rendering into in-memory pixel buffers.
///
/// Input comes from a queue filled by the embedder ([`HeadlessHost::push_event`]
/// and the pointer helpers), which makes sessions fully scriptable.
#[derive(Debug)]
pub struct HeadlessHost {
    canvases: BTreeMap<CanvasId, CanvasState>,
    subregions: BTreeMap<SubregionId, SubregionState>,
    artifacts: BTreeMap<ArtifactId, ArtifactState>,
    events: VecDeque<Event>,
    face: Rgba<u8>,
    /// Canvas under the pointer.
    pointer_canvas: Option<CanvasId>,
    current_canvas: Option<CanvasId>,
    next_canvas: u32,
    next_subregion: u32,
    next_artifact: u64,
    stats: RenderStats,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            canvases: BTreeMap::new(),
            subregions: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            events: VecDeque::new(),
            face: Rgba([255, 255, 255, 255]),
            pointer_canvas: None,
            current_canvas: None,
            next_canvas: 0,
            next_subregion: 0,
            next_artifact: 0,
            stats: RenderStats::default(),
        }
    }

    /// Create a canvas of `width` x `height` pixels with a light grey background.
    pub fn add_canvas(&mut self, width: u32, height: u32) -> CanvasId {
        self.add_canvas_with_background(width, height, Color::from_rgba8(250, 250, 250, 255))
    }

    pub fn add_canvas_with_background(
        &mut self,
        width: u32,
        height: u32,
        background: Color,
    ) -> CanvasId {
        let id = CanvasId(self.next_canvas);
        self.next_canvas += 1;
        let c = background.to_rgba8();
        self.canvases
            .insert(id, CanvasState::new(width, height, Rgba([c.r, c.g, c.b, c.a])));
        self.current_canvas = Some(id);
        log::debug!("Created {:?} ({}x{})", id, width, height);
        id
    }

    /// Add a subregion covering `bounds` (pixels) and showing `limits` (data).
    ///
    /// The subregion keeps its share of the canvas through resizes.
    pub fn add_subregion(
        &mut self,
        canvas: CanvasId,
        bounds: Rect,
        limits: Rect,
    ) -> RenderResult<SubregionId> {
        check_limits(limits)?;
        let state = self
            .canvases
            .get_mut(&canvas)
            .ok_or(RendererError::UnknownCanvas(canvas))?;
        let (width, height) = state.size();
        let id = SubregionId(self.next_subregion);
        self.next_subregion += 1;
        state.subregions.push(id);
        self.subregions.insert(
            id,
            SubregionState {
                canvas,
                frac: Rect::new(
                    bounds.x0 / width.max(1.0),
                    bounds.y0 / height.max(1.0),
                    bounds.x1 / width.max(1.0),
                    bounds.y1 / height.max(1.0),
                ),
                bounds,
                limits,
                highlight: None,
            },
        );
        Ok(id)
    }

    /// Canvas made current last, by creation or selection.
    pub fn current_canvas(&self) -> Option<CanvasId> {
        self.current_canvas
    }

    /// Change the data area shown by `subregion` (zoom or pan).
    ///
    /// Returns the resize notification objects need to pick up the new
    /// transform.
    pub fn set_limits(&mut self, subregion: SubregionId, limits: Rect) -> RenderResult<Event> {
        check_limits(limits)?;
        let state = self
            .subregions
            .get_mut(&subregion)
            .ok_or(RendererError::UnknownSubregion(subregion))?;
        state.limits = limits;
        Ok(Event::Resize {
            canvas: state.canvas,
        })
    }

    /// Resize a canvas; subregions keep their share of it.
    pub fn resize(&mut self, canvas: CanvasId, width: u32, height: u32) -> RenderResult<Event> {
        let state = self
            .canvases
            .get_mut(&canvas)
            .ok_or(RendererError::UnknownCanvas(canvas))?;
        *state = CanvasState {
            subregions: std::mem::take(&mut state.subregions),
            current: state.current,
            highlight: state.highlight,
            ..CanvasState::new(width, height, state.background)
        };
        let size = state.size();
        for id in &state.subregions {
            if let Some(sub) = self.subregions.get_mut(id) {
                sub.fit(size);
            }
        }
        log::debug!("Resized {:?} to {}x{}", canvas, width, height);
        Ok(Event::Resize { canvas })
    }

    /// Describe a pixel position on `canvas`.
    ///
    /// When subregions overlap, the most recently added one wins.
    pub fn locate(&self, canvas: CanvasId, pixel: Point) -> Location {
        let hit = self.canvases.get(&canvas).and_then(|state| {
            state
                .subregions
                .iter()
                .rev()
                .find(|id| {
                    self.subregions
                        .get(*id)
                        .is_some_and(|s| contains(s.bounds, pixel))
                })
                .copied()
        });
        match hit.and_then(|id| self.subregions.get(&id).map(|s| (id, s))) {
            Some((id, sub)) => Location::inside(canvas, id, pixel, sub.transform().inverse() * pixel),
            None => Location::outside(canvas, pixel),
        }
    }

    /// Pixel position of a data point in `subregion`.
    pub fn pixel_of(&self, subregion: SubregionId, data: Point) -> Option<Point> {
        self.subregions.get(&subregion).map(|s| s.transform() * data)
    }

    /// Queue an input event.
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Queue several input events.
    pub fn extend_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Pending input events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Queue a pointer move to `pixel`.
    ///
    /// Crossing a canvas or subregion border queues the matching leave and
    /// enter notifications before the motion itself.
    pub fn move_pointer(&mut self, canvas: CanvasId, pixel: Point) {
        if self.pointer_canvas != Some(canvas) {
            if let Some(previous) = self.pointer_canvas {
                self.leave_canvas(previous, pixel);
            }
            self.events.push_back(Event::CanvasEnter { canvas });
            self.pointer_canvas = Some(canvas);
        }
        let at = self.locate(canvas, pixel);
        let previous = self.canvases.get(&canvas).and_then(|s| s.pointer);
        if previous != at.subregion {
            if let Some(left) = previous {
                self.events.push_back(Event::Leave { at, subregion: left });
            }
            if at.subregion.is_some() {
                self.events.push_back(Event::Enter { at });
            }
            if let Some(state) = self.canvases.get_mut(&canvas) {
                state.pointer = at.subregion;
            }
        }
        self.events.push_back(Event::Motion { at });
    }

    /// Queue the pointer leaving `canvas` at `pixel`, just outside it.
    pub fn leave_canvas(&mut self, canvas: CanvasId, pixel: Point) {
        let left = self
            .canvases
            .get_mut(&canvas)
            .and_then(|state| state.pointer.take());
        if let Some(subregion) = left {
            self.events.push_back(Event::Leave {
                at: Location::outside(canvas, pixel),
                subregion,
            });
        }
        self.events.push_back(Event::CanvasLeave { canvas });
        if self.pointer_canvas == Some(canvas) {
            self.pointer_canvas = None;
        }
    }

    /// Queue a button press at `pixel`.
    pub fn press(&mut self, canvas: CanvasId, pixel: Point, button: MouseButton) {
        let at = self.locate(canvas, pixel);
        self.events.push_back(Event::Press { at, button });
    }

    /// Queue a button release at `pixel`.
    pub fn release(&mut self, canvas: CanvasId, pixel: Point, button: MouseButton) {
        let at = self.locate(canvas, pixel);
        self.events.push_back(Event::Release { at, button });
    }

    /// Queue a move, press and release at `pixel`.
    pub fn click(&mut self, canvas: CanvasId, pixel: Point, button: MouseButton) {
        self.move_pointer(canvas, pixel);
        self.press(canvas, pixel, button);
        self.release(canvas, pixel, button);
    }

    /// Queue a press at `from`, pointer motion in `steps` increments and a
    /// release at `to`, all with the left button.
    pub fn drag(&mut self, canvas: CanvasId, from: Point, to: Point, steps: usize) {
        self.move_pointer(canvas, from);
        self.press(canvas, from, MouseButton::Left);
        let steps = steps.max(1);
        for i in 1..=steps {
            self.move_pointer(canvas, from.lerp(to, i as f64 / steps as f64));
        }
        self.release(canvas, to, MouseButton::Left);
    }

    /// Queue a key press with the pointer at `pixel`.
    pub fn key(&mut self, canvas: CanvasId, pixel: Point, key: &str) {
        let at = self.locate(canvas, pixel);
        self.events.push_back(Event::Key {
            at,
            key: key.to_string(),
        });
    }

    /// Queue the closing of `canvas`.
    pub fn close(&mut self, canvas: CanvasId) {
        self.events.push_back(Event::Close { canvas });
    }

    /// Pixels last shown on `canvas`.
    pub fn screen(&self, canvas: CanvasId) -> Option<&RgbaImage> {
        self.canvases.get(&canvas).map(|s| &s.screen)
    }

    /// Geometry, paint and visibility of an artifact.
    pub fn artifact(&self, id: ArtifactId) -> Option<(&ArtifactSpec, bool)> {
        self.artifacts.get(&id).map(|a| (&a.spec, a.visible))
    }

    /// Number of artifacts currently owned by the host.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    /// Write the screen buffer of `canvas` as a PNG file.
    pub fn export_png(&self, canvas: CanvasId, path: impl AsRef<Path>) -> RenderResult<()> {
        let screen = self
            .screen(canvas)
            .ok_or(RendererError::UnknownCanvas(canvas))?;
        screen
            .save_with_format(path.as_ref(), image::ImageFormat::Png)
            .map_err(|e| RendererError::Export(e.to_string()))?;
        log::info!("Exported {:?} to {}", canvas, path.as_ref().display());
        Ok(())
    }

    fn canvas_checked(&self, subregion: SubregionId) -> RenderResult<CanvasId> {
        self.subregions
            .get(&subregion)
            .map(|s| s.canvas)
            .ok_or(RendererError::UnknownSubregion(subregion))
    }

    /// Full render of `canvas`, leaving out `hidden`.
    fn render(&self, canvas: CanvasId, hidden: &[ArtifactId]) -> Option<RgbaImage> {
        let state = self.canvases.get(&canvas)?;
        let background = state.highlight.unwrap_or(state.background);
        let mut img = RgbaImage::from_pixel(state.width, state.height, background);
        for id in &state.subregions {
            if let Some(sub) = self.subregions.get(id) {
                raster::fill_rect(&mut img, sub.bounds, sub.highlight.unwrap_or(self.face));
            }
        }
        for (id, artifact) in &self.artifacts {
            if !artifact.visible || hidden.contains(id) {
                continue;
            }
            if let Some(sub) = self.subregions.get(&artifact.subregion) {
                if sub.canvas == canvas {
                    raster::draw(&mut img, &artifact.spec, sub.transform(), sub.bounds);
                }
            }
        }
        Some(img)
    }
}

fn contains(bounds: Rect, pixel: Point) -> bool {
    pixel.x >= bounds.x0 && pixel.x < bounds.x1 && pixel.y >= bounds.y0 && pixel.y < bounds.y1
}

fn check_limits(limits: Rect) -> RenderResult<()> {
    if limits.width() == 0.0 || limits.height() == 0.0 || !limits.is_finite() {
        return Err(RendererError::InvalidGeometry(format!(
            "degenerate data limits {:?}",
            limits
        )));
    }
    Ok(())
}

impl Host for HeadlessHost {
    type Snapshot = RgbaImage;

    fn canvases(&self) -> Vec<CanvasId> {
        self.canvases.keys().copied().collect()
    }

    fn set_current(&mut self, canvas: CanvasId, subregion: Option<SubregionId>) {
        let Some(state) = self.canvases.get_mut(&canvas) else {
            log::warn!("Cannot make unknown {:?} current", canvas);
            return;
        };
        self.current_canvas = Some(canvas);
        match subregion {
            Some(sub) if state.subregions.contains(&sub) => state.current = Some(sub),
            Some(sub) => log::warn!("{:?} is not on {:?}, current subregion kept", sub, canvas),
            None => {}
        }
    }

    fn set_face(
        &mut self,
        canvas: CanvasId,
        subregion: Option<SubregionId>,
        color: Option<SerializableColor>,
    ) {
        let face = color.map(|c| Rgba([c.r, c.g, c.b, c.a]));
        match subregion {
            Some(id) => match self.subregions.get_mut(&id).filter(|s| s.canvas == canvas) {
                Some(sub) => sub.highlight = face,
                None => log::warn!("Face of unknown {:?} left unchanged", id),
            },
            None => match self.canvases.get_mut(&canvas) {
                Some(state) => state.highlight = face,
                None => log::warn!("Face of unknown {:?} left unchanged", canvas),
            },
        }
    }

    fn subregions(&self, canvas: CanvasId) -> Vec<SubregionId> {
        self.canvases
            .get(&canvas)
            .map(|s| s.subregions.clone())
            .unwrap_or_default()
    }

    fn current_subregion(&self, canvas: CanvasId) -> Option<SubregionId> {
        let state = self.canvases.get(&canvas)?;
        state.current.or_else(|| state.subregions.first().copied())
    }

    fn canvas_of(&self, subregion: SubregionId) -> Option<CanvasId> {
        self.canvas_checked(subregion).ok()
    }

    fn data_to_pixel(&self, subregion: SubregionId) -> Option<Affine> {
        self.subregions.get(&subregion).map(SubregionState::transform)
    }

    fn data_limits(&self, subregion: SubregionId) -> Option<Rect> {
        self.subregions.get(&subregion).map(|s| s.limits)
    }

    fn add_artifact(&mut self, subregion: SubregionId, spec: &ArtifactSpec) -> ArtifactId {
        if !self.subregions.contains_key(&subregion) {
            log::warn!("Artifact added to unknown {:?}, it will never be drawn", subregion);
        }
        self.next_artifact += 1;
        let id = ArtifactId(self.next_artifact);
        self.artifacts.insert(
            id,
            ArtifactState {
                subregion,
                spec: spec.clone(),
                visible: true,
            },
        );
        id
    }

    fn update_artifact(&mut self, artifact: ArtifactId, spec: &ArtifactSpec) {
        match self.artifacts.get_mut(&artifact) {
            Some(state) => state.spec = spec.clone(),
            None => log::warn!("Update of unknown {:?}", artifact),
        }
    }

    fn set_visible(&mut self, artifact: ArtifactId, visible: bool) {
        if let Some(state) = self.artifacts.get_mut(&artifact) {
            state.visible = visible;
        }
    }

    fn remove_artifact(&mut self, artifact: ArtifactId) {
        self.artifacts.remove(&artifact);
    }

    fn redraw(&mut self, canvas: CanvasId) {
        let Some(img) = self.render(canvas, &[]) else {
            return;
        };
        if let Some(state) = self.canvases.get_mut(&canvas) {
            state.screen = img.clone();
            state.back = img;
            self.stats.redraws += 1;
        }
    }

    fn capture_background(&mut self, canvas: CanvasId, hidden: &[ArtifactId]) -> RgbaImage {
        self.stats.captures += 1;
        match self.render(canvas, hidden) {
            Some(img) => img,
            None => {
                log::warn!("Capture of unknown {:?}", canvas);
                RgbaImage::new(0, 0)
            }
        }
    }

    fn restore_background(&mut self, canvas: CanvasId, snapshot: &RgbaImage) {
        let Some(state) = self.canvases.get_mut(&canvas) else {
            return;
        };
        if snapshot.dimensions() != (state.width, state.height) {
            log::warn!("Stale snapshot for {:?} ignored", canvas);
            return;
        }
        state.back.clone_from(snapshot);
        self.stats.restores += 1;
    }

    fn draw_artifact(&mut self, canvas: CanvasId, artifact: ArtifactId) {
        let Some(a) = self.artifacts.get(&artifact).filter(|a| a.visible) else {
            return;
        };
        let Some(sub) = self.subregions.get(&a.subregion).filter(|s| s.canvas == canvas) else {
            return;
        };
        let Some(state) = self.canvases.get_mut(&canvas) else {
            return;
        };
        raster::draw(&mut state.back, &a.spec, sub.transform(), sub.bounds);
        self.stats.artifact_draws += 1;
    }

    fn present(&mut self, canvas: CanvasId) {
        if let Some(state) = self.canvases.get_mut(&canvas) {
            state.screen.clone_from(&state.back);
            self.stats.presents += 1;
        }
    }

    /// Pop the next queued event. The queue never blocks, so the timeout is
    /// irrelevant and `None` means the script ran out.
    fn next_event(&mut self, _timeout: Option<Duration>) -> Option<Event> {
        self.events.pop_front()
    }
}
