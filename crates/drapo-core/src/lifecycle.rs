//! Object lifecycle state and per-object bookkeeping.

use crate::host::{ArtifactId, CanvasId, SubregionId};
use crate::registry::ObjectId;
use crate::shapes::{ActiveInfo, ObjectKind, Picked, PressInfo};
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// Where an object is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Created, not being dragged.
    #[default]
    Idle,
    /// Leader or follower of a motion session.
    Active,
    /// Artifacts hidden, data and registration kept; ignores input.
    Erased,
    /// Unregistered, artifacts removed. Terminal.
    Deleted,
}

impl LifecycleState {
    /// Object reacts to input.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Idle | Self::Active)
    }

    /// Object is still registered.
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// Position stored when a draggable object is validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Recorded {
    /// Line endpoints.
    Line([Point; 2]),
    /// Rectangle `(xmin, ymin, width, height)`.
    Rectangle(f64, f64, f64, f64),
}

/// State every interactive object carries besides its geometry.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub canvas: CanvasId,
    pub subregion: SubregionId,
    /// Host artifacts, in draw order.
    pub artifacts: Vec<ArtifactId>,
    pub state: LifecycleState,
    /// Data-to-pixel transform, refreshed on press and resize.
    pub to_px: Affine,
    pub picked: Option<Picked>,
    pub press: Option<PressInfo>,
    pub active: Option<ActiveInfo>,
    pub block: bool,
    pub recorded: Option<Recorded>,
}

impl ObjectCore {
    pub fn new(
        id: ObjectId,
        kind: ObjectKind,
        canvas: CanvasId,
        subregion: SubregionId,
        to_px: Affine,
    ) -> Self {
        Self {
            id,
            kind,
            canvas,
            subregion,
            artifacts: Vec::new(),
            state: LifecycleState::Idle,
            to_px,
            picked: None,
            press: None,
            active: None,
            block: false,
            recorded: None,
        }
    }

    /// Drop everything captured for a drag.
    pub fn clear_motion(&mut self) {
        self.picked = None;
        self.press = None;
        self.active = None;
        if self.state == LifecycleState::Active {
            self.state = LifecycleState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(LifecycleState::Idle.is_live());
        assert!(LifecycleState::Active.is_live());
        assert!(!LifecycleState::Erased.is_live());
        assert!(LifecycleState::Erased.is_registered());
        assert!(!LifecycleState::Deleted.is_registered());
    }

    #[test]
    fn test_clear_motion() {
        let mut core = ObjectCore::new(
            ObjectId::new(),
            ObjectKind::Line,
            CanvasId(0),
            SubregionId(0),
            Affine::IDENTITY,
        );
        core.state = LifecycleState::Active;
        core.press = Some(PressInfo {
            click: Point::ZERO,
            anchors: Vec::new(),
        });
        core.clear_motion();
        assert_eq!(core.state, LifecycleState::Idle);
        assert!(core.press.is_none());

        core.state = LifecycleState::Erased;
        core.clear_motion();
        assert_eq!(core.state, LifecycleState::Erased);
    }
}
