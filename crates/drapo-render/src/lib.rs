//! drapo Render Library
//!
//! Headless software host for drapo. Canvases, subregions and artifacts live
//! in memory and are rasterised into RGBA buffers, which supports blitted
//! redraw through real pixel snapshots and lets whole interactive sessions
//! be scripted through an event queue.

mod host;
mod raster;

pub use host::{HeadlessHost, RenderResult, RenderStats, RendererError};
pub use raster::draw as rasterize;
