//! Blocking input helpers built on a local event loop.
//!
//! Each helper creates an object, services host events through
//! [`Context::run_until`] until the object stops, then reads its result.
//! Every event still goes through [`Context::dispatch`], so objects on other
//! canvases keep reacting meanwhile.

use crate::context::Context;
use crate::error::Result;
use crate::host::{CanvasId, Host};
use crate::lifecycle::Recorded;
use crate::select::{SelectOptions, Target};
use crate::shapes::{CursorOptions, LineOptions, RectangleOptions};
use kurbo::Point;
use std::time::Duration;

/// Options of [`ginput`].
#[derive(Debug, Clone, PartialEq)]
pub struct GinputOptions {
    /// Number of points to collect.
    pub n: usize,
    /// Give up after this long; wait for the host to run dry when `None`.
    pub timeout: Option<Duration>,
    /// Mark clicked points while collecting.
    pub show_clicks: bool,
    /// Cursor appearance and bindings; recording options are overridden.
    pub cursor: CursorOptions,
}

impl Default for GinputOptions {
    fn default() -> Self {
        Self {
            n: 1,
            timeout: None,
            show_clicks: true,
            cursor: CursorOptions::default(),
        }
    }
}

/// Collect up to `n` clicked points with a cursor on `canvas`.
///
/// Returns fewer points if the stop key or button is used, or the loop times
/// out. The cursor and its marks are removed afterwards.
pub fn ginput<H: Host>(
    ctx: &mut Context<H>,
    canvas: CanvasId,
    options: GinputOptions,
) -> Result<Vec<Point>> {
    let cursor = CursorOptions {
        record_clicks: true,
        show_clicks: options.show_clicks,
        n: options.n,
        block: false,
        timeout: None,
        ..options.cursor
    };
    let id = ctx.create_cursor(canvas, cursor)?;
    let finished = ctx.wait(id, options.timeout);
    let points = ctx
        .cursor(id)
        .map(|c| c.clicks().to_vec())
        .unwrap_or_default();
    if !finished {
        log::debug!("ginput ended before completion with {} point(s)", points.len());
    }
    if ctx.registry().contains(id) {
        ctx.erase_marks(id)?;
        ctx.delete(id)?;
    }
    Ok(points)
}

/// Let the user place a rectangle on `canvas` and validate it with the stop
/// key.
///
/// Returns `(xmin, ymin, width, height)`, or `None` if the rectangle was
/// deleted before validation or the loop ended first.
pub fn rinput<H: Host>(
    ctx: &mut Context<H>,
    canvas: CanvasId,
    options: RectangleOptions,
    timeout: Option<Duration>,
) -> Result<Option<(f64, f64, f64, f64)>> {
    let id = ctx.create_rectangle(
        canvas,
        RectangleOptions {
            block: false,
            ..options
        },
    )?;
    ctx.wait(id, timeout);
    let position = match ctx.recorded(id) {
        Some(Recorded::Rectangle(x, y, w, h)) => Some((x, y, w, h)),
        _ => {
            log::warn!("Rectangle deleted before validation, no position returned");
            None
        }
    };
    if ctx.registry().contains(id) {
        ctx.delete(id)?;
    }
    Ok(position)
}

/// Let the user place a line on `canvas` and validate it with the stop key.
///
/// Returns both endpoints, or `None` if the line was deleted before
/// validation or the loop ended first.
pub fn linput<H: Host>(
    ctx: &mut Context<H>,
    canvas: CanvasId,
    options: LineOptions,
    timeout: Option<Duration>,
) -> Result<Option<[Point; 2]>> {
    let id = ctx.create_line(
        canvas,
        LineOptions {
            block: false,
            ..options
        },
    )?;
    ctx.wait(id, timeout);
    let position = match ctx.recorded(id) {
        Some(Recorded::Line(points)) => Some(points),
        _ => {
            log::warn!("Line deleted before validation, no position returned");
            None
        }
    };
    if ctx.registry().contains(id) {
        ctx.delete(id)?;
    }
    Ok(position)
}

/// Wait for the user to click a canvas (and subregion) and make it current.
///
/// Returns the last target clicked, or `None` when the selector was stopped
/// by a right click first or the loop ended.
pub fn select_target<H: Host>(
    ctx: &mut Context<H>,
    options: SelectOptions,
    timeout: Option<Duration>,
) -> Result<Option<Target>> {
    let id = ctx.click_select(options)?;
    ctx.run_until(timeout, |ctx| !ctx.selector(id).is_some_and(|s| s.is_active()));
    let target = ctx.selector(id).and_then(|s| s.last());
    ctx.stop_selector(id)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, MouseButton};
    use crate::testing::{CANVAS, MockHost, SUB};

    fn queue(host: &mut MockHost, events: Vec<Event>) {
        host.events.extend(events);
    }

    fn click(host: &MockHost, pixel: Point, button: MouseButton) -> Vec<Event> {
        let at = host.locate(pixel);
        vec![
            Event::Motion { at },
            Event::Press { at, button },
            Event::Release { at, button },
        ]
    }

    #[test]
    fn test_ginput_exact_count() {
        let mut host = MockHost::single();
        let mut events = click(&host, Point::new(40.0, 360.0), MouseButton::Left);
        events.extend(click(&host, Point::new(80.0, 320.0), MouseButton::Left));
        events.extend(click(&host, Point::new(120.0, 280.0), MouseButton::Left));
        queue(&mut host, events);

        let mut ctx = Context::with_host(host);
        let points = ginput(
            &mut ctx,
            CANVAS,
            GinputOptions {
                n: 2,
                ..GinputOptions::default()
            },
        )
        .unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].x - 1.0).abs() < 1e-9);
        assert!((points[1].y - 2.0).abs() < 1e-9);
        assert!(ctx.all_instances().is_empty());
        assert_eq!(ctx.host().live_artifacts(), 0);
        // The third click is left for whoever services the loop next.
        assert_eq!(ctx.host().events.len(), 3);
    }

    #[test]
    fn test_ginput_runs_dry() {
        let mut host = MockHost::single();
        let events = click(&host, Point::new(40.0, 360.0), MouseButton::Left);
        queue(&mut host, events);
        let mut ctx = Context::with_host(host);
        let points = ginput(
            &mut ctx,
            CANVAS,
            GinputOptions {
                n: 3,
                ..GinputOptions::default()
            },
        )
        .unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_linput_validated() {
        let mut host = MockHost::single();
        let at = host.locate(Point::new(10.0, 10.0));
        queue(
            &mut host,
            vec![Event::Key {
                at,
                key: "enter".to_string(),
            }],
        );
        let mut ctx = Context::with_host(host);
        let points = linput(&mut ctx, CANVAS, LineOptions::default(), None)
            .unwrap()
            .unwrap();
        assert!((points[0].x - 2.0).abs() < 1e-9);
        assert!((points[1].x - 8.0).abs() < 1e-9);
        assert!(ctx.all_instances().is_empty());
    }

    #[test]
    fn test_rinput_not_validated() {
        let host = MockHost::single();
        let mut ctx = Context::with_host(host);
        let position = rinput(&mut ctx, CANVAS, RectangleOptions::default(), None).unwrap();
        assert!(position.is_none());
        assert!(ctx.all_instances().is_empty());
    }

    #[test]
    fn test_select_target_makes_current() {
        let mut host = MockHost::single();
        let events = click(&host, Point::new(200.0, 120.0), MouseButton::Left);
        queue(&mut host, events);
        let mut ctx = Context::with_host(host);

        let target = select_target(&mut ctx, SelectOptions::default(), None).unwrap();
        assert_eq!(target, Some(Target::subregion(CANVAS, SUB)));
        assert_eq!(ctx.host().current, Some((CANVAS, Some(SUB))));
        // Release is left in the queue.
        assert_eq!(ctx.host().events.len(), 1);
    }

    #[test]
    fn test_select_target_right_click() {
        let mut host = MockHost::single();
        let events = click(&host, Point::new(200.0, 120.0), MouseButton::Right);
        queue(&mut host, events);
        let mut ctx = Context::with_host(host);

        let target = select_target(&mut ctx, SelectOptions::default(), None).unwrap();
        assert_eq!(target, None);
        assert_eq!(ctx.host().current, None);
    }
}
