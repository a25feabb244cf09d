//! CPU raster renderer on an RGBA8 buffer.
//!
//! Geometry is rasterized by the sparse-strips [`vello_cpu::RenderContext`]:
//! every stroke becomes one path stroked with round caps and joins, so
//! translucent ink is blended once even where the path overlaps itself.
//! The result is kept in an [`RgbaImage`] for pixel access and PNG export.

use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
use image::{Rgba, RgbaImage};
use inkleaf_core::stroke::{Segment, Stroke, StrokePoint};
use kurbo::{Affine, Rect, Size};
use peniko::Color;
use vello_cpu::kurbo::{
    Affine as CpuAffine, BezPath, Cap as CpuCap, Circle, Join as CpuJoin, Point as CpuPoint, Rect as CpuRect,
    Shape, Stroke as CpuStroke,
};
use vello_cpu::peniko::Color as CpuColor;
use vello_cpu::{Pixmap, RenderContext as CpuContext};

/// Tolerance used when flattening dots into paths.
const DOT_TOLERANCE: f64 = 0.1;

/// Software renderer backed by an [`RgbaImage`].
#[derive(Debug, Clone)]
pub struct RasterRenderer {
    buffer: RgbaImage,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self {
            buffer: RgbaImage::new(0, 0),
        }
    }
}

impl RasterRenderer {
    /// Create a renderer with a surface of the given device size.
    pub fn new(size: Size) -> RenderResult<Self> {
        let mut renderer = Self::default();
        renderer.resize(size)?;
        Ok(renderer)
    }

    /// The current surface contents.
    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Pixel at device coordinates, if inside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.buffer.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Surface size in the form the CPU context takes. `resize` keeps both
    /// dimensions within `u16`.
    fn dimensions(&self) -> Option<(u16, u16)> {
        let width = u16::try_from(self.buffer.width()).ok()?;
        let height = u16::try_from(self.buffer.height()).ok()?;
        (width > 0 && height > 0).then_some((width, height))
    }
}

impl Renderer for RasterRenderer {
    fn resize(&mut self, size: Size) -> RenderResult<()> {
        if !size.is_finite() || size.width < 1.0 || size.height < 1.0 {
            return Err(RendererError::Surface(format!("unusable surface size {size:?}")));
        }
        let (width, height) = (size.width.round(), size.height.round());
        if width > f64::from(u16::MAX) || height > f64::from(u16::MAX) {
            return Err(RendererError::Surface(format!("surface size {size:?} too large")));
        }
        let (width, height) = (width as u32, height as u32);
        self.buffer = RgbaImage::new(width, height);
        log::debug!("raster surface resized to {width}x{height}");
        Ok(())
    }

    fn size(&self) -> Size {
        Size::new(f64::from(self.buffer.width()), f64::from(self.buffer.height()))
    }

    fn render_full(&mut self, ctx: &RenderContext) {
        let Some((width, height)) = self.dimensions() else {
            return;
        };
        let surface = Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
        let mut cpu = CpuContext::new(width, height);

        cpu.set_paint(cpu_color(ctx.background_color));
        cpu.fill_rect(&CpuRect::new(0.0, 0.0, surface.x1, surface.y1));
        draw_grid(&mut cpu, ctx, surface);

        cpu.set_transform(affine_to_cpu(ctx.transform));
        let mut drawn = 0;
        for stroke in ctx.strokes.iter().filter(|s| on_surface(s, ctx, surface)) {
            draw_stroke(&mut cpu, stroke, ctx);
            drawn += 1;
        }

        let pixmap = rasterize(&mut cpu, width, height);
        for (dst, src) in self.buffer.pixels_mut().zip(pixmap.data_as_u8_slice().chunks_exact(4)) {
            *dst = Rgba(unpremultiply(src));
        }
        log::trace!("full render: {drawn} of {} strokes on surface", ctx.strokes.len());
    }

    fn render_segment(&mut self, segment: &Segment, ctx: &RenderContext) {
        // Rasterize only the segment's device bounds, then composite.
        let from = ctx.transform * point(&segment.from);
        let to = ctx.transform * point(&segment.to);
        let reach = segment_width(&segment.from, &segment.to, segment.width, ctx) * ctx.scale / 2.0 + 2.0;
        let bounds = Rect::from_points(from, to)
            .inflate(reach, reach)
            .expand()
            .intersect(Rect::from_origin_size((0.0, 0.0), self.size()));
        if bounds.width() < 1.0 || bounds.height() < 1.0 {
            return;
        }
        let (x0, y0) = (bounds.x0 as u32, bounds.y0 as u32);
        let (width, height) = (bounds.width() as u16, bounds.height() as u16);

        let mut cpu = CpuContext::new(width, height);
        let local = Affine::translate((-bounds.x0, -bounds.y0)) * ctx.transform;
        cpu.set_transform(affine_to_cpu(local));
        cpu.set_paint(cpu_color(segment.color.into()));
        draw_piece(&mut cpu, &segment.from, &segment.to, segment.width, ctx);

        let pixmap = rasterize(&mut cpu, width, height);
        for (i, src) in pixmap.data_as_u8_slice().chunks_exact(4).enumerate() {
            let x = x0 + (i % usize::from(width)) as u32;
            let y = y0 + (i / usize::from(width)) as u32;
            if let Some(dst) = self.buffer.get_pixel_mut_checked(x, y) {
                composite(dst, src);
            }
        }
    }

    fn snapshot_png(&self) -> RenderResult<Vec<u8>> {
        let png = encode_png(self.buffer.as_raw(), self.buffer.width(), self.buffer.height())?;
        log::info!("PNG snapshot: {} bytes", png.len());
        Ok(png)
    }
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(format!("header: {e}")))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| RendererError::Encode(format!("data: {e}")))?;
    }
    Ok(png_data)
}

/// Horizontal ruling, one device pixel thick, at `round(k * spacing * scale)`
/// for `k >= 1`. Drawn in device space.
fn draw_grid(cpu: &mut CpuContext, ctx: &RenderContext, surface: Rect) {
    if ctx.grid_style == GridStyle::None || !(ctx.grid_spacing > 0.0) || !(ctx.scale > 0.0) {
        return;
    }
    let step = ctx.grid_spacing * ctx.scale;
    if !step.is_finite() {
        return;
    }
    cpu.set_paint(cpu_color(ctx.grid_color));

    if step < 1.0 {
        // Consecutive rows are less than a pixel apart and cover every row.
        let first = step.round();
        if first < surface.y1 {
            cpu.fill_rect(&CpuRect::new(0.0, first, surface.x1, surface.y1));
        }
        return;
    }

    let mut k = 1.0;
    loop {
        let row = (k * step).round();
        if row >= surface.y1 {
            break;
        }
        cpu.fill_rect(&CpuRect::new(0.0, row, surface.x1, row + 1.0));
        k += 1.0;
    }
}

fn draw_stroke(cpu: &mut CpuContext, stroke: &Stroke, ctx: &RenderContext) {
    cpu.set_paint(cpu_color(stroke.color().into()));
    let points = stroke.points();
    let Some(first) = points.first() else {
        return;
    };

    if stroke.bounds().is_some_and(|b| b.width() == 0.0 && b.height() == 0.0) {
        fill_dot(cpu, first, stroke.width(), ctx);
    } else if ctx.pressure_width {
        for pair in points.windows(2) {
            draw_piece(cpu, &pair[0], &pair[1], stroke.width(), ctx);
        }
    } else {
        let mut path = BezPath::new();
        path.move_to(cpu_point(first));
        for p in &points[1..] {
            path.line_to(cpu_point(p));
        }
        cpu.set_stroke(round_stroke(stroke.width()));
        cpu.stroke_path(&path);
    }
}

/// One straight piece of ink; a zero-length piece is a dot.
fn draw_piece(cpu: &mut CpuContext, from: &StrokePoint, to: &StrokePoint, width: f64, ctx: &RenderContext) {
    let width = segment_width(from, to, width, ctx);
    if from.x == to.x && from.y == to.y {
        fill_dot(cpu, from, width, ctx);
        return;
    }
    let mut path = BezPath::new();
    path.move_to(cpu_point(from));
    path.line_to(cpu_point(to));
    cpu.set_stroke(round_stroke(width));
    cpu.stroke_path(&path);
}

fn fill_dot(cpu: &mut CpuContext, at: &StrokePoint, width: f64, ctx: &RenderContext) {
    let width = segment_width(at, at, width, ctx);
    let dot = Circle::new(cpu_point(at), width / 2.0);
    cpu.fill_path(&dot.to_path(DOT_TOLERANCE));
}

/// Ink width of one piece, scaled by mean pressure when enabled.
fn segment_width(from: &StrokePoint, to: &StrokePoint, width: f64, ctx: &RenderContext) -> f64 {
    if ctx.pressure_width {
        width * (from.pressure + to.pressure) / 2.0
    } else {
        width
    }
}

fn round_stroke(width: f64) -> CpuStroke {
    CpuStroke::new(width).with_caps(CpuCap::Round).with_join(CpuJoin::Round)
}

/// Whether any ink of the stroke can land on the surface.
fn on_surface(stroke: &Stroke, ctx: &RenderContext, surface: Rect) -> bool {
    stroke.bounds().is_some_and(|bounds| {
        let reach = stroke.width() * ctx.scale / 2.0 + 1.0;
        let device = ctx.transform.transform_rect_bbox(bounds).inflate(reach, reach);
        device.intersect(surface).area() > 0.0
    })
}

fn rasterize(cpu: &mut CpuContext, width: u16, height: u16) -> Pixmap {
    let mut pixmap = Pixmap::new(width, height);
    cpu.flush();
    cpu.render_to_pixmap(&mut pixmap);
    pixmap
}

fn affine_to_cpu(xf: Affine) -> CpuAffine {
    CpuAffine::new(xf.as_coeffs())
}

fn point(p: &StrokePoint) -> kurbo::Point {
    kurbo::Point::new(p.x, p.y)
}

fn cpu_point(p: &StrokePoint) -> CpuPoint {
    CpuPoint::new(p.x, p.y)
}

fn cpu_color(color: Color) -> CpuColor {
    let c = color.to_rgba8();
    CpuColor::from_rgba8(c.r, c.g, c.b, c.a)
}

/// Premultiplied RGBA8 to straight alpha.
fn unpremultiply(src: &[u8]) -> [u8; 4] {
    let a = src[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let channel = |c: u8| ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8;
    [channel(src[0]), channel(src[1]), channel(src[2]), a]
}

/// Source-over of a premultiplied pixel onto a straight-alpha one.
fn composite(dst: &mut Rgba<u8>, src: &[u8]) {
    let src_a = f32::from(src[3]) / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = f32::from(dst.0[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let s = f32::from(src[c]) / 255.0;
        let d = f32::from(dst.0[c]) / 255.0;
        let out = (s + d * dst_a * (1.0 - src_a)) / out_a;
        dst.0[c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
