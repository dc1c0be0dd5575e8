//! Picking the current canvas and subregion by clicking on them.
//!
//! A selector listens on every open canvas. Left clicks make the clicked
//! canvas (and the subregion under the pointer, if any) current on the host;
//! a right click, or reaching the click limit, stops it. While active it can
//! light up the face of whatever lies under the pointer.

use crate::event::{EventKind, Location, MouseButton};
use crate::host::{CanvasId, SubregionId};
use crate::style::SerializableColor;
use serde::{Deserialize, Serialize};

/// Events a selector listens to on each canvas.
pub(crate) const EVENTS: &[EventKind] = &[
    EventKind::CanvasEnter,
    EventKind::CanvasLeave,
    EventKind::Enter,
    EventKind::Leave,
    EventKind::Press,
    EventKind::Close,
];

/// Face of a hovered canvas.
pub fn canvas_highlight() -> SerializableColor {
    SerializableColor::new(0xF3, 0xF8, 0xFA, 255)
}

/// Face of a hovered subregion.
pub fn subregion_highlight() -> SerializableColor {
    SerializableColor::new(0xEC, 0xF4, 0xF8, 255)
}

/// Options of [`crate::Context::click_select`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOptions {
    /// Stop after this many left clicks; `0` keeps going until a right click.
    pub n: usize,
    /// Light up the canvas and subregion under the pointer.
    pub highlight: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            n: 1,
            highlight: true,
        }
    }
}

/// A canvas, or one subregion of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub canvas: CanvasId,
    pub subregion: Option<SubregionId>,
}

impl Target {
    pub fn canvas(canvas: CanvasId) -> Self {
        Self {
            canvas,
            subregion: None,
        }
    }

    pub fn subregion(canvas: CanvasId, subregion: SubregionId) -> Self {
        Self {
            canvas,
            subregion: Some(subregion),
        }
    }

    /// What lies under a pointer location.
    pub fn at(location: &Location) -> Self {
        Self {
            canvas: location.canvas,
            subregion: location.subregion,
        }
    }

    /// Highlight color of this kind of target.
    pub fn highlight(&self) -> SerializableColor {
        match self.subregion {
            Some(_) => subregion_highlight(),
            None => canvas_highlight(),
        }
    }
}

/// State of a click selector. Host calls are made by the context.
#[derive(Debug, Clone)]
pub struct Selector {
    options: SelectOptions,
    canvases: Vec<CanvasId>,
    clicks: usize,
    active: bool,
    last: Option<Target>,
    /// Targets currently drawn with a highlighted face.
    lit: Vec<Target>,
}

impl Selector {
    pub fn new(options: SelectOptions, canvases: Vec<CanvasId>) -> Self {
        Self {
            options,
            canvases,
            clicks: 0,
            active: true,
            last: None,
            lit: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Left clicks counted so far.
    pub fn clicks(&self) -> usize {
        self.clicks
    }

    /// Most recent target made current.
    pub fn last(&self) -> Option<Target> {
        self.last
    }

    /// Canvases listened to.
    pub fn canvases(&self) -> &[CanvasId] {
        &self.canvases
    }

    pub fn lit(&self) -> &[Target] {
        &self.lit
    }

    /// Pointer entered `target`; returns whether its face must be lit.
    pub(crate) fn enter(&mut self, target: Target) -> bool {
        if !self.active || !self.options.highlight || self.lit.contains(&target) {
            return false;
        }
        self.lit.push(target);
        true
    }

    /// Pointer left `target`; returns whether its face must be restored.
    pub(crate) fn leave(&mut self, target: Target) -> bool {
        let before = self.lit.len();
        self.lit.retain(|t| *t != target);
        self.lit.len() != before
    }

    /// Count a press; returns the target to make current, if any.
    ///
    /// Deactivates on a right click or when the click limit is reached.
    pub(crate) fn press(&mut self, target: Target, button: MouseButton) -> Option<Target> {
        if !self.active {
            return None;
        }
        let mut chosen = None;
        if button == MouseButton::Left {
            self.clicks += 1;
            self.last = Some(target);
            chosen = Some(target);
        }
        if button == MouseButton::Right || (self.options.n > 0 && self.clicks >= self.options.n) {
            self.active = false;
        }
        chosen
    }

    /// Deactivate; returns the targets whose faces must be restored.
    pub(crate) fn stop(&mut self) -> Vec<Target> {
        self.active = false;
        std::mem::take(&mut self.lit)
    }

    /// Drop a closed canvas.
    pub(crate) fn forget_canvas(&mut self, canvas: CanvasId) {
        self.canvases.retain(|c| *c != canvas);
        self.lit.retain(|t| t.canvas != canvas);
    }
}
