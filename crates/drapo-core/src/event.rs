//! Input events delivered by the host.

use crate::host::{CanvasId, SubregionId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Event categories, used as keys of the subscription table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Press,
    Release,
    Motion,
    Key,
    Enter,
    Leave,
    CanvasEnter,
    CanvasLeave,
    Resize,
    Close,
}

/// Where a pointer event happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Canvas receiving the event.
    pub canvas: CanvasId,
    /// Subregion under the pointer, if any.
    pub subregion: Option<SubregionId>,
    /// Pointer position in pixels.
    pub pixel: Point,
    /// Pointer position in data coordinates of `subregion`.
    pub data: Option<Point>,
}

impl Location {
    /// A location outside every subregion.
    pub fn outside(canvas: CanvasId, pixel: Point) -> Self {
        Self {
            canvas,
            subregion: None,
            pixel,
            data: None,
        }
    }

    /// A location inside `subregion`.
    pub fn inside(canvas: CanvasId, subregion: SubregionId, pixel: Point, data: Point) -> Self {
        Self {
            canvas,
            subregion: Some(subregion),
            pixel,
            data: Some(data),
        }
    }
}

/// An input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Press { at: Location, button: MouseButton },
    Release { at: Location, button: MouseButton },
    Motion { at: Location },
    /// Key names follow the "modifier+key" convention, e.g. `"shift+up"`.
    Key { at: Location, key: String },
    /// Pointer entered a subregion (`at.subregion` is set).
    Enter { at: Location },
    /// Pointer left `subregion`.
    Leave { at: Location, subregion: SubregionId },
    /// Pointer entered the canvas.
    CanvasEnter { canvas: CanvasId },
    /// Pointer left the canvas.
    CanvasLeave { canvas: CanvasId },
    Resize { canvas: CanvasId },
    Close { canvas: CanvasId },
}

impl Event {
    /// Subscription key of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Press { .. } => EventKind::Press,
            Event::Release { .. } => EventKind::Release,
            Event::Motion { .. } => EventKind::Motion,
            Event::Key { .. } => EventKind::Key,
            Event::Enter { .. } => EventKind::Enter,
            Event::Leave { .. } => EventKind::Leave,
            Event::CanvasEnter { .. } => EventKind::CanvasEnter,
            Event::CanvasLeave { .. } => EventKind::CanvasLeave,
            Event::Resize { .. } => EventKind::Resize,
            Event::Close { .. } => EventKind::Close,
        }
    }

    /// Canvas the event was delivered to.
    pub fn canvas(&self) -> CanvasId {
        match self {
            Event::Press { at, .. }
            | Event::Release { at, .. }
            | Event::Motion { at }
            | Event::Key { at, .. }
            | Event::Enter { at }
            | Event::Leave { at, .. } => at.canvas,
            Event::CanvasEnter { canvas }
            | Event::CanvasLeave { canvas }
            | Event::Resize { canvas }
            | Event::Close { canvas } => *canvas,
        }
    }

    /// Pointer location, for pointer and key events.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Event::Press { at, .. }
            | Event::Release { at, .. }
            | Event::Motion { at }
            | Event::Key { at, .. }
            | Event::Enter { at }
            | Event::Leave { at, .. } => Some(at),
            Event::CanvasEnter { .. }
            | Event::CanvasLeave { .. }
            | Event::Resize { .. }
            | Event::Close { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let at = Location::outside(CanvasId(1), Point::new(10.0, 10.0));
        assert_eq!(
            Event::Press { at, button: MouseButton::Left }.kind(),
            EventKind::Press
        );
        assert_eq!(Event::Motion { at }.kind(), EventKind::Motion);
        assert_eq!(Event::Close { canvas: CanvasId(1) }.kind(), EventKind::Close);
    }

    #[test]
    fn test_event_canvas() {
        let at = Location::inside(CanvasId(3), SubregionId(7), Point::ZERO, Point::new(1.0, 1.0));
        let event = Event::Key { at, key: "enter".to_string() };
        assert_eq!(event.canvas(), CanvasId(3));
        assert_eq!(event.location().and_then(|l| l.subregion), Some(SubregionId(7)));

        let resize = Event::Resize { canvas: CanvasId(4) };
        assert_eq!(resize.canvas(), CanvasId(4));
        assert!(resize.location().is_none());

        let enter = Event::CanvasEnter { canvas: CanvasId(2) };
        assert_eq!(enter.kind(), EventKind::CanvasEnter);
        assert_eq!(enter.canvas(), CanvasId(2));
        assert!(enter.location().is_none());
    }
}
