//! Scripted sessions against the headless host.

use drapo_core::{
    Config, Context, CursorOptions, DrapoError, EventKind, GinputOptions, Host, LifecycleState,
    LineOptions, MouseButton, ObjectKind, Phase, RectangleOptions, Scope, SelectOptions, Target,
    ginput, rinput, select_target,
};
use drapo_render::HeadlessHost;
use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 400x400 px canvas showing data 0..10 on both axes.
fn single() -> (HeadlessHost, drapo_core::CanvasId, drapo_core::SubregionId) {
    let mut host = HeadlessHost::new();
    let canvas = host.add_canvas(400, 400);
    let sub = host
        .add_subregion(
            canvas,
            Rect::new(0.0, 0.0, 400.0, 400.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    (host, canvas, sub)
}

fn pump(ctx: &mut Context<HeadlessHost>) {
    ctx.run_until(None, |_| false);
}

fn assert_near(actual: Point, expected: Point) {
    assert!(
        (actual.x - expected.x).abs() < 1e-9 && (actual.y - expected.y).abs() < 1e-9,
        "{actual:?} != {expected:?}"
    );
}

#[test]
fn test_drag_endpoint() {
    init_logger();
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 4);
    pump(&mut ctx);

    let [start, end] = ctx.line(id).unwrap().position();
    assert_near(start, Point::new(5.0, 5.0));
    assert_near(end, Point::new(8.0, 8.0));
    assert_eq!(ctx.phase(canvas), Phase::Idle);
    assert_eq!(ctx.state(id), LifecycleState::Idle);
}

#[test]
fn test_drag_whole_line() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    // Middle of the link, 40 px to the right.
    ctx.host_mut()
        .drag(canvas, Point::new(200.0, 200.0), Point::new(240.0, 200.0), 2);
    pump(&mut ctx);

    let [start, end] = ctx.line(id).unwrap().position();
    assert_near(start, Point::new(3.0, 2.0));
    assert_near(end, Point::new(9.0, 8.0));
}

#[test]
fn test_background_captured_once_per_drag() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    ctx.create_line(canvas, LineOptions::default()).unwrap();
    ctx.host_mut().reset_stats();

    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 6);
    pump(&mut ctx);

    let stats = ctx.host().stats();
    assert_eq!(stats.captures, 1);
    assert_eq!(stats.presents, 6);
    assert_eq!(stats.artifact_draws, 18);
    // Only the final redraw once the drag is resolved.
    assert_eq!(stats.redraws, 1);

    ctx.host_mut()
        .drag(canvas, Point::new(200.0, 200.0), Point::new(100.0, 300.0), 3);
    pump(&mut ctx);
    assert_eq!(ctx.host().stats().captures, 2);
}

fn scripted_frames(blit: bool) -> (Vec<RgbaImage>, [Point; 2]) {
    let (host, canvas, _) = single();
    let config = Config {
        blit,
        ..Config::default()
    };
    let mut ctx = Context::new(host, config);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();
    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 5);

    let mut screens = Vec::new();
    while let Some(event) = ctx.host_mut().next_event(None) {
        ctx.dispatch(&event);
        screens.push(ctx.host().screen(canvas).unwrap().clone());
    }
    (screens, ctx.line(id).unwrap().position())
}

#[test]
fn test_blit_matches_full_redraw() {
    let (blitted, blitted_position) = scripted_frames(true);
    let (plain, plain_position) = scripted_frames(false);
    assert_eq!(blitted_position, plain_position);
    assert_eq!(blitted.len(), plain.len());
    for (i, (a, b)) in blitted.iter().zip(&plain).enumerate() {
        assert!(a == b, "frame {i} differs");
    }
}

#[test]
fn test_blit_flag_last_writer_wins() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    ctx.create_line(canvas, LineOptions::default()).unwrap();
    assert!(ctx.blit_enabled());
    ctx.create_line(
        canvas,
        LineOptions {
            blit: Some(false),
            ..LineOptions::default()
        },
    )
    .unwrap();
    assert!(!ctx.blit_enabled());
    ctx.host_mut().reset_stats();

    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 3);
    pump(&mut ctx);
    let stats = ctx.host().stats();
    assert_eq!(stats.captures, 0);
    assert_eq!(stats.redraws, 4);
}

#[test]
fn test_delete_leader_mid_drag() {
    init_logger();
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    ctx.host_mut().move_pointer(canvas, Point::new(80.0, 320.0));
    ctx.host_mut()
        .press(canvas, Point::new(80.0, 320.0), MouseButton::Left);
    ctx.host_mut().move_pointer(canvas, Point::new(120.0, 300.0));
    pump(&mut ctx);
    assert_eq!(ctx.phase(canvas), Phase::Dragging);

    ctx.delete(id).unwrap();
    assert_eq!(ctx.phase(canvas), Phase::Idle);
    assert_eq!(ctx.state(id), LifecycleState::Deleted);
    assert_eq!(ctx.host().artifact_count(), 0);

    // A new drag can start right away.
    let other = ctx.create_line(canvas, LineOptions::default()).unwrap();
    ctx.host_mut()
        .release(canvas, Point::new(120.0, 300.0), MouseButton::Left);
    ctx.host_mut()
        .drag(canvas, Point::new(320.0, 80.0), Point::new(360.0, 40.0), 2);
    pump(&mut ctx);
    let [_, end] = ctx.line(other).unwrap().position();
    assert_near(end, Point::new(9.0, 9.0));
}

#[test]
fn test_press_outside_subregion_ignored() {
    let mut host = HeadlessHost::new();
    let canvas = host.add_canvas(500, 400);
    host.add_subregion(
        canvas,
        Rect::new(0.0, 0.0, 400.0, 400.0),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    )
    .unwrap();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    ctx.host_mut()
        .drag(canvas, Point::new(450.0, 200.0), Point::new(200.0, 200.0), 2);
    pump(&mut ctx);
    assert_eq!(ctx.phase(canvas), Phase::Idle);
    let [start, _] = ctx.line(id).unwrap().position();
    assert_near(start, Point::new(2.0, 2.0));
}

#[test]
fn test_avoid_existing_lines() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    ctx.create_line(canvas, LineOptions::default()).unwrap();
    let second = ctx.create_line(canvas, LineOptions::default()).unwrap();

    // Shifted by 15 px left and down: 0.375 data units on each axis.
    let [start, end] = ctx.line(second).unwrap().position();
    assert_near(start, Point::new(1.625, 1.625));
    assert_near(end, Point::new(7.625, 7.625));

    let overlapping = ctx
        .create_line(
            canvas,
            LineOptions {
                avoid_existing: false,
                ..LineOptions::default()
            },
        )
        .unwrap();
    let [start, _] = ctx.line(overlapping).unwrap().position();
    assert_near(start, Point::new(2.0, 2.0));
}

#[test]
fn test_one_cursor_per_canvas() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let first = ctx.create_cursor(canvas, Default::default()).unwrap();
    let second = ctx.create_cursor(canvas, Default::default()).unwrap();

    assert_eq!(ctx.instances_of(ObjectKind::Cursor).len(), 1);
    assert_eq!(ctx.state(first), LifecycleState::Deleted);
    assert_eq!(ctx.state(second), LifecycleState::Idle);
    // Only the live cursor's two lines remain.
    assert_eq!(ctx.host().artifact_count(), 2);
}

#[test]
fn test_cursor_follows_line_drag() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let line = ctx.create_line(canvas, LineOptions::default()).unwrap();
    let cursor = ctx.create_cursor(canvas, Default::default()).unwrap();

    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 4);
    pump(&mut ctx);

    assert_near(ctx.line(line).unwrap().position()[0], Point::new(5.0, 5.0));
    assert_near(ctx.cursor(cursor).unwrap().position(), Point::new(5.0, 5.0));
    assert_eq!(ctx.phase(canvas), Phase::Idle);
    assert_eq!(ctx.state(cursor), LifecycleState::Idle);
}

#[test]
fn test_delete_others_same_subregion() {
    let mut host = HeadlessHost::new();
    let canvas = host.add_canvas(800, 400);
    let left = host
        .add_subregion(
            canvas,
            Rect::new(0.0, 0.0, 400.0, 400.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let right = host
        .add_subregion(
            canvas,
            Rect::new(400.0, 0.0, 800.0, 400.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let mut ctx = Context::with_host(host);
    let in_sub = |sub| LineOptions {
        subregion: Some(sub),
        ..LineOptions::default()
    };
    let keep = ctx.create_line(canvas, in_sub(left)).unwrap();
    let removed = ctx.create_line(canvas, in_sub(left)).unwrap();
    let other_side = ctx.create_line(canvas, in_sub(right)).unwrap();
    let rect = ctx
        .create_rectangle(
            canvas,
            RectangleOptions {
                subregion: Some(left),
                ..RectangleOptions::default()
            },
        )
        .unwrap();

    assert_eq!(ctx.delete_others(keep, Scope::SameSubregion).unwrap(), 1);
    assert_eq!(ctx.state(removed), LifecycleState::Deleted);
    assert!(ctx.registry().contains(other_side));
    assert!(ctx.registry().contains(rect));

    assert_eq!(ctx.delete_others(keep, Scope::SameCanvas).unwrap(), 1);
    assert_eq!(ctx.instances_of(ObjectKind::Line).len(), 1);
}

#[test]
fn test_ginput_exact_count() {
    let (mut host, canvas, _) = single();
    host.click(canvas, Point::new(40.0, 360.0), MouseButton::Left);
    host.click(canvas, Point::new(80.0, 320.0), MouseButton::Left);
    host.click(canvas, Point::new(120.0, 280.0), MouseButton::Left);
    let mut ctx = Context::with_host(host);

    let points = ginput(
        &mut ctx,
        canvas,
        GinputOptions {
            n: 2,
            ..GinputOptions::default()
        },
    )
    .unwrap();
    assert_eq!(points.len(), 2);
    assert_near(points[0], Point::new(1.0, 1.0));
    assert_near(points[1], Point::new(2.0, 2.0));
    // Cursor lines and click marks are gone.
    assert_eq!(ctx.host().artifact_count(), 0);
    assert!(ctx.all_instances().is_empty());
    assert_eq!(ctx.host().pending_events(), 3);
}

#[test]
fn test_ginput_pop_removes_last_click() {
    let (mut host, canvas, _) = single();
    host.click(canvas, Point::new(40.0, 360.0), MouseButton::Left);
    host.click(canvas, Point::new(80.0, 320.0), MouseButton::Left);
    host.click(canvas, Point::new(300.0, 300.0), MouseButton::Right);
    host.click(canvas, Point::new(120.0, 280.0), MouseButton::Left);
    host.click(canvas, Point::new(160.0, 240.0), MouseButton::Left);
    let mut ctx = Context::with_host(host);

    let points = ginput(
        &mut ctx,
        canvas,
        GinputOptions {
            n: 3,
            ..GinputOptions::default()
        },
    )
    .unwrap();
    assert_eq!(points.len(), 3);
    assert_near(points[0], Point::new(1.0, 1.0));
    assert_near(points[1], Point::new(3.0, 3.0));
    assert_near(points[2], Point::new(4.0, 4.0));
}

#[test]
fn test_ginput_stopped_early() {
    let (mut host, canvas, _) = single();
    host.click(canvas, Point::new(40.0, 360.0), MouseButton::Left);
    host.click(canvas, Point::new(80.0, 320.0), MouseButton::Middle);
    host.click(canvas, Point::new(120.0, 280.0), MouseButton::Left);
    let mut ctx = Context::with_host(host);

    let points = ginput(
        &mut ctx,
        canvas,
        GinputOptions {
            n: 5,
            ..GinputOptions::default()
        },
    )
    .unwrap();
    assert_eq!(points, vec![ctx.host().locate(canvas, Point::new(40.0, 360.0)).data.unwrap()]);
    assert_eq!(ctx.host().pending_events(), 3);
}

#[test]
fn test_ginput_keeps_other_canvases_live() {
    init_logger();
    let mut host = HeadlessHost::new();
    let first = host.add_canvas(400, 400);
    host.add_subregion(
        first,
        Rect::new(0.0, 0.0, 400.0, 400.0),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    )
    .unwrap();
    let second = host.add_canvas(400, 400);
    host.add_subregion(
        second,
        Rect::new(0.0, 0.0, 400.0, 400.0),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    )
    .unwrap();
    let mut ctx = Context::with_host(host);
    let line = ctx.create_line(second, LineOptions::default()).unwrap();

    ctx.host_mut()
        .drag(second, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 3);
    ctx.host_mut()
        .click(first, Point::new(40.0, 360.0), MouseButton::Left);
    let points = ginput(&mut ctx, first, GinputOptions::default()).unwrap();

    assert_eq!(points.len(), 1);
    assert_near(ctx.line(line).unwrap().position()[0], Point::new(5.0, 5.0));
    assert_eq!(ctx.phase(second), Phase::Idle);
}

#[test]
fn test_rinput_after_edge_drag() {
    let (mut host, canvas, _) = single();
    // Left edge of the default rectangle (2.5..7.5 on both axes).
    host.drag(canvas, Point::new(100.0, 200.0), Point::new(140.0, 200.0), 2);
    host.key(canvas, Point::new(140.0, 200.0), "enter");
    let mut ctx = Context::with_host(host);

    let (x, y, w, h) = rinput(&mut ctx, canvas, RectangleOptions::default(), None)
        .unwrap()
        .unwrap();
    assert!((x - 3.5).abs() < 1e-9);
    assert!((y - 2.5).abs() < 1e-9);
    assert!((w - 4.0).abs() < 1e-9);
    assert!((h - 5.0).abs() < 1e-9);
    assert_eq!(ctx.host().artifact_count(), 0);
}

#[test]
fn test_zoom_refreshes_transform() {
    let (host, canvas, sub) = single();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    // Zoom out by two: the start endpoint (2, 2) is now at pixel (40, 360).
    let resize = ctx
        .host_mut()
        .set_limits(sub, Rect::new(0.0, 0.0, 20.0, 20.0))
        .unwrap();
    assert_eq!(resize.kind(), EventKind::Resize);
    ctx.host_mut().push_event(resize);
    ctx.host_mut()
        .drag(canvas, Point::new(40.0, 360.0), Point::new(100.0, 300.0), 2);
    pump(&mut ctx);

    assert_near(ctx.line(id).unwrap().position()[0], Point::new(5.0, 5.0));
}

#[test]
fn test_close_canvas_deletes_objects() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let line = ctx.create_line(canvas, LineOptions::default()).unwrap();
    let cursor = ctx.create_cursor(canvas, Default::default()).unwrap();

    ctx.host_mut().close(canvas);
    pump(&mut ctx);
    assert_eq!(ctx.state(line), LifecycleState::Deleted);
    assert_eq!(ctx.state(cursor), LifecycleState::Deleted);
    assert_eq!(ctx.host().artifact_count(), 0);
}

#[test]
fn test_export_after_drag() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    ctx.create_line(canvas, LineOptions::default()).unwrap();
    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 2);
    pump(&mut ctx);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drag.png");
    ctx.host().export_png(canvas, &path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_resize_through_zero_keeps_objects_usable() {
    init_logger();
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_line(canvas, LineOptions::default()).unwrap();

    let collapse = ctx.host_mut().resize(canvas, 0, 0).unwrap();
    assert!(ctx.dispatch(&collapse).is_handled());
    let restore = ctx.host_mut().resize(canvas, 400, 400).unwrap();
    assert!(ctx.dispatch(&restore).is_handled());
    assert_eq!(
        ctx.host().locate(canvas, Point::new(200.0, 200.0)).subregion,
        ctx.get(id).map(|e| e.core.subregion)
    );
    ctx.host_mut()
        .drag(canvas, Point::new(80.0, 320.0), Point::new(200.0, 200.0), 4);
    pump(&mut ctx);

    let [start, end] = ctx.line(id).unwrap().position();
    assert_near(start, Point::new(5.0, 5.0));
    assert_near(end, Point::new(8.0, 8.0));
}

#[test]
fn test_cursor_survives_failed_replacement() {
    let (host, canvas, _) = single();
    let mut ctx = Context::with_host(host);
    let first = ctx.create_cursor(canvas, CursorOptions::default()).unwrap();

    let collapse = ctx.host_mut().resize(canvas, 0, 0).unwrap();
    ctx.host_mut().push_event(collapse);
    pump(&mut ctx);
    let err = ctx
        .create_cursor(canvas, CursorOptions::default())
        .unwrap_err();
    assert!(matches!(err, DrapoError::HostState(_)));
    assert_eq!(ctx.state(first), LifecycleState::Idle);
    assert_eq!(ctx.instances_of(ObjectKind::Cursor).len(), 1);

    let restore = ctx.host_mut().resize(canvas, 400, 400).unwrap();
    ctx.host_mut().push_event(restore);
    pump(&mut ctx);
    let second = ctx.create_cursor(canvas, CursorOptions::default()).unwrap();
    assert_eq!(ctx.state(first), LifecycleState::Deleted);
    assert_eq!(ctx.state(second), LifecycleState::Idle);
}

#[test]
fn test_cursor_frozen_during_pan_from_margin() {
    let mut host = HeadlessHost::new();
    let canvas = host.add_canvas(500, 400);
    host.add_subregion(
        canvas,
        Rect::new(0.0, 0.0, 400.0, 400.0),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    )
    .unwrap();
    let mut ctx = Context::with_host(host);
    let id = ctx.create_cursor(canvas, CursorOptions::default()).unwrap();

    ctx.host_mut().move_pointer(canvas, Point::new(200.0, 200.0));
    ctx.host_mut().move_pointer(canvas, Point::new(450.0, 200.0));
    ctx.host_mut()
        .press(canvas, Point::new(450.0, 200.0), MouseButton::Left);
    ctx.host_mut().move_pointer(canvas, Point::new(300.0, 100.0));
    ctx.host_mut().move_pointer(canvas, Point::new(120.0, 80.0));
    pump(&mut ctx);

    let cursor = ctx.cursor(id).unwrap();
    assert!(cursor.pressed);
    let artifacts = ctx.get(id).unwrap().core.artifacts.clone();
    assert!(artifacts.iter().all(|a| ctx.host().artifact(*a).is_some_and(|(_, v)| !v)));

    ctx.host_mut()
        .release(canvas, Point::new(120.0, 80.0), MouseButton::Left);
    pump(&mut ctx);
    let cursor = ctx.cursor(id).unwrap();
    assert!(!cursor.pressed);
    assert_near(cursor.position(), Point::new(3.0, 8.0));
    assert!(cursor.clicks().is_empty());
    assert!(artifacts.iter().all(|a| ctx.host().artifact(*a).is_some_and(|(_, v)| v)));
}

#[test]
fn test_click_select_highlights_and_picks_subregion() {
    init_logger();
    let mut host = HeadlessHost::new();
    let first = host.add_canvas(800, 400);
    host.add_subregion(
        first,
        Rect::new(0.0, 0.0, 400.0, 400.0),
        Rect::new(0.0, 0.0, 10.0, 10.0),
    )
    .unwrap();
    let right = host
        .add_subregion(
            first,
            Rect::new(400.0, 0.0, 800.0, 400.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
    let second = host.add_canvas(100, 100);
    let mut ctx = Context::with_host(host);
    let id = ctx.click_select(SelectOptions::default()).unwrap();

    ctx.host_mut().move_pointer(second, Point::new(50.0, 50.0));
    pump(&mut ctx);
    assert_eq!(
        ctx.host().screen(second).unwrap().get_pixel(50, 50),
        &Rgba([0xF3, 0xF8, 0xFA, 255])
    );

    ctx.host_mut()
        .click(first, Point::new(600.0, 200.0), MouseButton::Left);
    pump(&mut ctx);
    assert_eq!(
        ctx.host().screen(second).unwrap().get_pixel(50, 50),
        &Rgba([250, 250, 250, 255])
    );
    assert_eq!(
        ctx.host().screen(first).unwrap().get_pixel(600, 200),
        &Rgba([255, 255, 255, 255])
    );
    let selector = ctx.selector(id).unwrap();
    assert!(!selector.is_active());
    assert_eq!(selector.last(), Some(Target::subregion(first, right)));
    assert_eq!(ctx.host().current_canvas(), Some(first));

    // New objects land in the selected subregion.
    let line = ctx.create_line(first, LineOptions::default()).unwrap();
    assert_eq!(ctx.get(line).unwrap().core.subregion, right);
}

#[test]
fn test_select_target_blocks_until_click() {
    let (mut host, canvas, sub) = single();
    host.click(canvas, Point::new(100.0, 100.0), MouseButton::Left);
    let mut ctx = Context::with_host(host);

    let target = select_target(&mut ctx, SelectOptions::default(), None).unwrap();
    assert_eq!(target, Some(Target::subregion(canvas, sub)));
    // The release is left for whoever services the loop next.
    assert_eq!(ctx.host().pending_events(), 1);
}
