//! Blitted redraw: one background snapshot per canvas, restored under the
//! moving artifacts on every motion frame.

use crate::host::{ArtifactId, CanvasId, Host};
use std::collections::HashMap;

/// Background snapshots and the global blitting flag.
#[derive(Debug)]
pub struct BlitManager<S> {
    enabled: bool,
    backgrounds: HashMap<CanvasId, S>,
    frames: u64,
    captures: u64,
}

impl<S> BlitManager<S> {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            backgrounds: HashMap::new(),
            frames: 0,
            captures: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Set the global flag. Every constructed object writes it, last one wins.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Blitting {}", if enabled { "enabled" } else { "disabled" });
            self.invalidate_all();
        }
        self.enabled = enabled;
    }

    /// Forget the background of `canvas`.
    pub fn invalidate(&mut self, canvas: CanvasId) {
        self.backgrounds.remove(&canvas);
    }

    /// Forget the backgrounds of every canvas.
    pub fn invalidate_all(&mut self) {
        self.backgrounds.clear();
    }

    pub fn has_background(&self, canvas: CanvasId) -> bool {
        self.backgrounds.contains_key(&canvas)
    }

    /// Motion frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Background snapshots taken so far.
    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// Render `canvas` without `hidden` and store the pixels.
    ///
    /// Does nothing when blitting is disabled.
    pub fn capture_background<H>(&mut self, host: &mut H, canvas: CanvasId, hidden: &[ArtifactId])
    where
        H: Host<Snapshot = S>,
    {
        if !self.enabled {
            return;
        }
        let snapshot = host.capture_background(canvas, hidden);
        self.backgrounds.insert(canvas, snapshot);
        self.captures += 1;
        log::trace!("Captured background of {:?}", canvas);
    }

    /// Draw one motion frame with `artifacts` over the stored background.
    ///
    /// The background is captured lazily, with `artifacts` hidden, on the
    /// first frame after an invalidation. Without blitting the whole canvas
    /// is redrawn.
    pub fn draw_frame<H>(&mut self, host: &mut H, canvas: CanvasId, artifacts: &[ArtifactId])
    where
        H: Host<Snapshot = S>,
    {
        self.frames += 1;
        if !self.enabled {
            host.redraw(canvas);
            return;
        }
        if !self.has_background(canvas) {
            self.capture_background(host, canvas, artifacts);
        }
        if let Some(background) = self.backgrounds.get(&canvas) {
            host.restore_background(canvas, background);
        }
        for artifact in artifacts {
            host.draw_artifact(canvas, *artifact);
        }
        host.present(canvas);
    }
}
