//! Software rasterisation of artifacts into RGBA buffers.
//!
//! Pixels are overwritten, never blended, so drawing the same artifacts in
//! the same order always yields the same buffer.

use drapo_core::{ArtifactSpec, Geometry, LineStyle, MarkerSymbol, Paint};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point, Rect};
use peniko::Color;

/// Dash pattern as (period, on-length) in pixels.
fn pattern(style: LineStyle, width: f64) -> Option<(f64, f64)> {
    let w = width.max(1.0);
    match style {
        LineStyle::Solid => None,
        LineStyle::Dashed => Some((6.0 * w, 3.7 * w)),
        LineStyle::Dotted => Some((2.6 * w, w)),
    }
}

pub(crate) fn rgba(paint: &Paint) -> Rgba<u8> {
    let color: Color = paint.color.into();
    let c = color.to_rgba8();
    Rgba([c.r, c.g, c.b, c.a])
}

/// Fill `rect` (pixel coordinates, half-open) with `color`.
pub(crate) fn fill_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let x0 = rect.x0.floor().max(0.0) as u32;
    let y0 = rect.y0.floor().max(0.0) as u32;
    let x1 = (rect.x1.ceil().max(0.0) as u32).min(img.width());
    let y1 = (rect.y1.ceil().max(0.0) as u32).min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// Square brush of `radius` pixels around (x, y), clipped to `clip`.
fn stamp(img: &mut RgbaImage, x: i64, y: i64, radius: i64, clip: Rect, color: Rgba<u8>) {
    for py in (y - radius)..=(y + radius) {
        for px in (x - radius)..=(x + radius) {
            if px < 0 || py < 0 || px >= img.width() as i64 || py >= img.height() as i64 {
                continue;
            }
            let (fx, fy) = (px as f64, py as f64);
            if fx < clip.x0 || fx >= clip.x1 || fy < clip.y0 || fy >= clip.y1 {
                continue;
            }
            img.put_pixel(px as u32, py as u32, color);
        }
    }
}

/// Draw one artifact, mapping data to pixels with `to_px`, clipped to `clip`.
pub fn draw(img: &mut RgbaImage, spec: &ArtifactSpec, to_px: Affine, clip: Rect) {
    let color = rgba(&spec.paint);
    match &spec.geometry {
        Geometry::Marker(at) => draw_marker(img, to_px * *at, &spec.paint, clip, color),
        Geometry::Polyline(points) => {
            let mut travelled = 0.0;
            for pair in points.windows(2) {
                let (a, b) = (to_px * pair[0], to_px * pair[1]);
                draw_segment(img, a, b, &spec.paint, clip, color, travelled);
                travelled += a.distance(b);
            }
        }
    }
}

fn draw_marker(img: &mut RgbaImage, at: Point, paint: &Paint, clip: Rect, color: Rgba<u8>) {
    if !at.x.is_finite() || !at.y.is_finite() {
        return;
    }
    let (x, y) = (at.x.round() as i64, at.y.round() as i64);
    let half = (paint.marker_size / 2.0).round().max(1.0) as i64;
    match paint.marker {
        MarkerSymbol::Dot => stamp(img, x, y, (half / 2).max(1), clip, color),
        MarkerSymbol::Square => stamp(img, x, y, half, clip, color),
        MarkerSymbol::Circle => {
            for d in -half..=half {
                stamp(img, x + d, y - half, 0, clip, color);
                stamp(img, x + d, y + half, 0, clip, color);
                stamp(img, x - half, y + d, 0, clip, color);
                stamp(img, x + half, y + d, 0, clip, color);
            }
        }
        MarkerSymbol::Plus => {
            for d in -half..=half {
                stamp(img, x + d, y, 0, clip, color);
                stamp(img, x, y + d, 0, clip, color);
            }
        }
    }
}

fn draw_segment(
    img: &mut RgbaImage,
    a: Point,
    b: Point,
    paint: &Paint,
    clip: Rect,
    color: Rgba<u8>,
    offset: f64,
) {
    let finite = |p: Point| p.x.is_finite() && p.y.is_finite();
    if !finite(a) || !finite(b) {
        return;
    }
    // Keep the walk bounded for segments far outside the buffer.
    let a = clamp_point(a, img);
    let b = clamp_point(b, img);
    let radius = ((paint.line_width - 1.0) / 2.0).round().max(0.0) as i64;
    let dash = pattern(paint.line_style, paint.line_width);
    let length = a.distance(b);
    let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        if let Some((period, on)) = dash {
            if (offset + t * length).rem_euclid(period) >= on {
                continue;
            }
        }
        let p = a.lerp(b, t);
        stamp(img, p.x.round() as i64, p.y.round() as i64, radius, clip, color);
    }
}

fn clamp_point(p: Point, img: &RgbaImage) -> Point {
    let margin = 4.0 * f64::from(img.width().max(img.height()));
    Point::new(p.x.clamp(-margin, margin), p.y.clamp(-margin, margin))
}
