//! Cursor following the pointer, with optional click recording.

use super::{
    ActiveInfo, CreateContext, InteractiveShape, MotionMode, ObjectKind, Picked, PressInfo,
};
use crate::config::ButtonBindings;
use crate::error::Result;
use crate::host::{ArtifactId, ArtifactSpec};
use crate::style::{LineStyle, MarkerSymbol, Paint, SerializableColor};
use kurbo::{Affine, Point, Rect};
use std::time::Duration;

/// Construction options of a [`Cursor`].
#[derive(Debug, Clone, PartialEq)]
pub struct CursorOptions {
    pub color: Option<String>,
    pub line_style: LineStyle,
    pub line_width: f64,
    /// Draw the horizontal line.
    pub horizontal: bool,
    /// Draw the vertical line.
    pub vertical: bool,
    pub blit: Option<bool>,
    /// Leave a mark at every recorded click.
    pub show_clicks: bool,
    /// Store the data position of every click.
    pub record_clicks: bool,
    /// Mouse button roles; the configured ones when `None`.
    pub buttons: Option<ButtonBindings>,
    /// Number of recorded clicks after which the cursor stops.
    pub n: usize,
    pub block: bool,
    /// Blocking timeout; waits indefinitely when `None`.
    pub timeout: Option<Duration>,
    pub mark_symbol: MarkerSymbol,
    pub mark_size: f64,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            color: None,
            line_style: LineStyle::Dotted,
            line_width: 1.0,
            horizontal: true,
            vertical: true,
            blit: None,
            show_clicks: false,
            record_clicks: false,
            buttons: None,
            n: 1000,
            block: false,
            timeout: None,
            mark_symbol: MarkerSymbol::Plus,
            mark_size: 10.0,
        }
    }
}

/// Horizontal and/or vertical lines spanning the current subregion.
#[derive(Debug, Clone)]
pub struct Cursor {
    position: Point,
    limits: Rect,
    color: SerializableColor,
    line_style: LineStyle,
    line_width: f64,
    horizontal: bool,
    vertical: bool,

    /// Lines are shown when the pointer is in a subregion.
    pub visible: bool,
    /// Pointer is inside a subregion.
    pub in_subregion: bool,
    /// A mouse button is held.
    pub pressed: bool,
    /// Data position of the last press.
    pub press_position: Option<Point>,

    show_clicks: bool,
    record_clicks: bool,
    buttons: ButtonBindings,
    max_clicks: usize,
    mark_symbol: MarkerSymbol,
    mark_size: f64,
    clicks: Vec<Point>,
    pub(crate) marks: Vec<ArtifactId>,
}

impl Cursor {
    /// Width change of a wider/narrower step, also the minimum width.
    pub const WIDTH_STEP: f64 = 0.5;

    pub fn new(options: &CursorOptions, color: SerializableColor, buttons: ButtonBindings) -> Self {
        Self {
            position: Point::ZERO,
            limits: Rect::ZERO,
            color,
            line_style: options.line_style,
            line_width: options.line_width,
            horizontal: options.horizontal,
            vertical: options.vertical,
            visible: true,
            in_subregion: false,
            pressed: false,
            press_position: None,
            show_clicks: options.show_clicks,
            record_clicks: options.record_clicks,
            buttons: options.buttons.unwrap_or(buttons),
            max_clicks: options.n,
            mark_symbol: options.mark_symbol,
            mark_size: options.mark_size,
            clicks: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Data position of the crosshair.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.color = color;
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn buttons(&self) -> ButtonBindings {
        self.buttons
    }

    pub fn shows_clicks(&self) -> bool {
        self.show_clicks
    }

    /// Recorded click positions, oldest first.
    pub fn clicks(&self) -> &[Point] {
        &self.clicks
    }

    /// Host ids of the click marks currently drawn.
    pub fn marks(&self) -> &[ArtifactId] {
        &self.marks
    }

    /// Jump to a data position.
    pub fn follow(&mut self, data: Point) {
        self.position = data;
    }

    /// Adopt new subregion limits, keeping the lines spanning it.
    pub fn set_limits(&mut self, limits: Rect) {
        self.limits = limits;
    }

    pub fn wider(&mut self) {
        self.line_width += Self::WIDTH_STEP;
    }

    pub fn narrower(&mut self) {
        self.line_width = (self.line_width - Self::WIDTH_STEP).max(Self::WIDTH_STEP);
    }

    /// Record a click; returns the paint of the mark to draw, if marks are shown.
    pub fn record(&mut self, at: Point) -> Option<ArtifactSpec> {
        if self.record_clicks {
            self.clicks.push(at);
        }
        self.show_clicks
            .then(|| ArtifactSpec::marker(at, Paint::marker(self.color, self.mark_symbol, self.mark_size)))
    }

    /// Drop the most recent click; returns the mark to remove, if any.
    pub fn pop(&mut self) -> Option<ArtifactId> {
        if self.record_clicks {
            self.clicks.pop();
        }
        if self.show_clicks {
            self.marks.pop()
        } else {
            None
        }
    }

    /// Number of recorded clicks reached the maximum.
    pub fn reached_limit(&self) -> bool {
        self.record_clicks && self.clicks.len() >= self.max_clicks
    }

    /// Forget recorded click positions (marks stay).
    pub fn erase_data(&mut self) {
        self.clicks.clear();
    }

    /// Cursor lines are drawn: visible, in a subregion.
    pub fn is_shown(&self) -> bool {
        self.visible && self.in_subregion
    }

    fn paint(&self) -> Paint {
        Paint::stroke(self.color, self.line_style, self.line_width)
    }
}

impl InteractiveShape for Cursor {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Cursor
    }

    fn create(&mut self, cx: &CreateContext) -> Result<Vec<ArtifactSpec>> {
        cx.check()?;
        self.limits = cx.limits;
        self.position = cx.limits.center();
        Ok(self.artifacts())
    }

    fn artifacts(&self) -> Vec<ArtifactSpec> {
        let Point { x, y } = self.position;
        let l = self.limits;
        let mut specs = Vec::with_capacity(2);
        if self.horizontal {
            specs.push(ArtifactSpec::polyline(
                vec![Point::new(l.x0, y), Point::new(l.x1, y)],
                self.paint(),
            ));
        }
        if self.vertical {
            specs.push(ArtifactSpec::polyline(
                vec![Point::new(x, l.y0), Point::new(x, l.y1)],
                self.paint(),
            ));
        }
        specs
    }

    fn tracked_points(&self) -> Vec<Point> {
        vec![self.position]
    }

    fn pick(&self, _pointer_px: Point, _to_px: Affine) -> Option<Picked> {
        None
    }

    fn capture_active_info(&self, _picked: &Picked) -> Option<ActiveInfo> {
        Some(ActiveInfo {
            mode: MotionMode::Follow,
            live: vec![0],
        })
    }

    fn recompute_position(
        &mut self,
        pointer_px: Point,
        _press: &PressInfo,
        _active: &ActiveInfo,
        to_px: Affine,
    ) {
        self.position = to_px.inverse() * pointer_px;
    }
}
