//! Stroke/fill helpers for sketches, all in logical coordinates.

use kurbo::{Circle, ParamCurve, ParamCurveArclen, PathEl, Point, RoundedRect, Shape};

use crate::foundation::error::{NoisefieldError, NoisefieldResult};

/// Flattening tolerance for shapes lowered to bezier paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Straight-alpha RGBA color.
pub type Rgba = [u8; 4];

/// Drawing handle over the surface's render context.
///
/// Issued per frame by the surface; every draw call carries the base
/// transform that maps logical sketch coordinates to physical pixels.
pub struct Pen<'a> {
    ctx: &'a mut vello_cpu::RenderContext,
    transform: vello_cpu::kurbo::Affine,
    width: f64,
    height: f64,
}

impl<'a> Pen<'a> {
    pub(crate) fn new(
        ctx: &'a mut vello_cpu::RenderContext,
        transform: vello_cpu::kurbo::Affine,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            ctx,
            transform,
            width,
            height,
        }
    }

    fn set_paint(&mut self, color: Rgba) {
        self.ctx.set_transform(self.transform);
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(
                color[0], color[1], color[2], color[3],
            ));
    }

    fn set_stroke(&mut self, color: Rgba, stroke_width: f64) {
        self.set_paint(color);
        self.ctx
            .set_stroke(vello_cpu::kurbo::Stroke::new(stroke_width));
    }

    /// Flood the whole surface with `color`.
    pub fn clear_background(&mut self, color: Rgba) {
        self.set_paint(color);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            self.width,
            self.height,
        ));
    }

    /// Straight line from `a` to `b`.
    pub fn line_between(&mut self, a: Point, b: Point, color: Rgba, stroke_width: f64) {
        let mut path = kurbo::BezPath::new();
        path.move_to(a);
        path.line_to(b);
        self.stroke_path(&path, color, stroke_width);
    }

    /// Cubic bezier from `a` to `b` through control points `cp1` and `cp2`.
    pub fn bezier_curve_between(
        &mut self,
        a: Point,
        cp1: Point,
        cp2: Point,
        b: Point,
        color: Rgba,
        stroke_width: f64,
    ) {
        let mut path = kurbo::BezPath::new();
        path.move_to(a);
        path.curve_to(cp1, cp2, b);
        self.stroke_path(&path, color, stroke_width);
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.fill_path(&Circle::new(center, radius).to_path(PATH_TOLERANCE), color);
    }

    pub fn stroke_circle(&mut self, center: Point, radius: f64, color: Rgba, stroke_width: f64) {
        self.stroke_path(
            &Circle::new(center, radius).to_path(PATH_TOLERANCE),
            color,
            stroke_width,
        );
    }

    /// Filled rectangle with rounded corners.
    pub fn rounded_rect(&mut self, rect: kurbo::Rect, radius: f64, color: Rgba) {
        let rr = RoundedRect::from_rect(rect, radius);
        self.fill_path(&rr.to_path(PATH_TOLERANCE), color);
    }

    pub fn fill_path(&mut self, path: &kurbo::BezPath, color: Rgba) {
        self.set_paint(color);
        self.ctx.fill_path(&bezpath_to_cpu(path));
    }

    pub fn stroke_path(&mut self, path: &kurbo::BezPath, color: Rgba, stroke_width: f64) {
        self.set_stroke(color, stroke_width);
        self.ctx.stroke_path(&bezpath_to_cpu(path));
    }
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// True for `#rgb`, `#rrggbb` and `#rrggbbaa` strings.
pub fn is_valid_hex(hex: &str) -> bool {
    hex.strip_prefix('#')
        .is_some_and(|d| matches!(d.len(), 3 | 6 | 8) && d.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` color into straight-alpha RGBA.
pub fn hex_to_rgba8(hex: &str) -> NoisefieldResult<Rgba> {
    let digits = hex
        .strip_prefix('#')
        .filter(|_| is_valid_hex(hex))
        .ok_or_else(|| NoisefieldError::validation(format!("invalid hex color '{hex}'")))?;

    let byte = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| NoisefieldError::validation(format!("invalid hex color '{hex}'")))
    };
    match digits.len() {
        3 => {
            let mut out = [0u8; 4];
            for i in 0..3 {
                let d = byte(&digits[i..i + 1])?;
                out[i] = d << 4 | d;
            }
            out[3] = 255;
            Ok(out)
        }
        6 => Ok([
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
            255,
        ]),
        _ => Ok([
            byte(&digits[0..2])?,
            byte(&digits[2..4])?,
            byte(&digits[4..6])?,
            byte(&digits[6..8])?,
        ]),
    }
}

/// Sample points roughly `step` logical units apart along `path`.
///
/// The sketch-facing stand-in for text-path sampling: build any path, sample
/// it, and let the sketch work with the resulting point cloud.
pub fn sample_path_points(path: &kurbo::BezPath, step: f64) -> Vec<Point> {
    let mut out = Vec::new();
    if step <= 0.0 {
        return out;
    }
    for seg in path.segments() {
        let len = seg.arclen(1e-3);
        if len <= 0.0 {
            continue;
        }
        let n = (len / step).ceil().max(1.0) as usize;
        for i in 0..n {
            out.push(seg.eval(i as f64 / n as f64));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_validation() {
        assert!(is_valid_hex("#fff"));
        assert!(is_valid_hex("#a1b2c3"));
        assert!(is_valid_hex("#a1b2c3d4"));
        assert!(!is_valid_hex("fff"));
        assert!(!is_valid_hex("#ffgg00"));
        assert!(!is_valid_hex("#ffff"));
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(hex_to_rgba8("#ffffff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(hex_to_rgba8("#102030").unwrap(), [16, 32, 48, 255]);
        assert_eq!(hex_to_rgba8("#10203040").unwrap(), [16, 32, 48, 64]);
        assert_eq!(hex_to_rgba8("#f0a").unwrap(), [255, 0, 170, 255]);
        assert!(hex_to_rgba8("nope").is_err());
    }

    #[test]
    fn path_sampling_spacing() {
        let mut path = kurbo::BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(100.0, 0.0));

        let points = sample_path_points(&path, 10.0);
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], Point::new(0.0, 0.0));
        for pair in points.windows(2) {
            assert!((pair[1].x - pair[0].x - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn path_sampling_guards_degenerate_step() {
        let mut path = kurbo::BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(1.0, 0.0));
        assert!(sample_path_points(&path, 0.0).is_empty());
    }

    #[test]
    fn circle_path_is_sampleable() {
        let circle = Circle::new(Point::new(0.0, 0.0), 50.0).to_path(0.01);
        let points = sample_path_points(&circle, 5.0);
        assert!(points.len() > 30);
        for p in points {
            let r = p.distance(Point::ORIGIN);
            assert!((r - 50.0).abs() < 1.0, "point off circle: {r}");
        }
    }
}
