//! drapo Core Library
//!
//! Interactive objects (a draggable two-point line, a draggable rectangle and
//! a pointer-following cursor) overlaid on a host canvas, together with the
//! coordination layer that lets them share one rendering surface: object
//! lifecycle, per-canvas motion sessions, blitted redraw and the registry
//! behind group operations. A click selector picks the current canvas and
//! subregion.
//!
//! The host toolkit (canvas creation, transforms, primitive drawing, event
//! delivery, pixel snapshots) is abstracted by the [`Host`] trait.

pub mod blit;
pub mod blocking;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod host;
pub mod lifecycle;
pub mod registry;
pub mod select;
pub mod session;
pub mod shapes;
pub mod style;

#[cfg(test)]
pub(crate) mod testing;

pub use blit::BlitManager;
pub use blocking::{GinputOptions, ginput, linput, rinput, select_target};
pub use config::{ButtonBindings, Config, KeyBindings};
pub use context::Context;
pub use dispatch::{Dispatch, IgnoreReason};
pub use error::{DrapoError, Result};
pub use event::{Event, EventKind, Location, MouseButton};
pub use host::{ArtifactId, ArtifactSpec, CanvasId, Geometry, Host, SubregionId};
pub use lifecycle::{LifecycleState, ObjectCore, Recorded};
pub use registry::{ObjectEntry, ObjectId, Registry, Scope};
pub use select::{SelectOptions, Selector, Target};
pub use session::{MotionSession, Phase};
pub use shapes::{
    ActiveInfo, CreateContext, Cursor, CursorOptions, InteractiveShape, Line, LineOptions,
    MotionMode, Object, ObjectKind, Picked, PressInfo, Rectangle, RectangleOptions,
};
pub use style::{LineStyle, MarkerSymbol, Paint, Palette, SerializableColor};
