use crate::draw::Pen;
use crate::foundation::error::{NoisefieldError, NoisefieldResult};

/// CPU drawing surface: a vello render context targeting an RGBA8 pixmap.
///
/// The pixmap is allocated at physical pixels (logical size x pixel ratio)
/// while sketches keep drawing in logical coordinates; the ratio is applied
/// as a base transform by [`Surface::pen`]. Rendered frames composite onto
/// the pixmap, so paint accumulates across frames until a sketch clears it.
pub struct Surface {
    ctx: vello_cpu::RenderContext,
    pixmap: vello_cpu::Pixmap,
    width: f64,
    height: f64,
    pixel_ratio: f64,
    physical_width: u16,
    physical_height: u16,
    frame_buffer: Vec<u32>,
}

impl Surface {
    /// Create a surface of `width x height` logical pixels.
    ///
    /// Fails fast when the dimensions are zero, the ratio is not a positive
    /// finite number, or the physical size overflows the rasterizer's u16
    /// limit. There is no partial setup and no retry.
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> NoisefieldResult<Self> {
        if width == 0 || height == 0 {
            return Err(NoisefieldError::surface(
                "surface dimensions must be non-zero",
            ));
        }
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(NoisefieldError::surface(
                "pixel ratio must be a positive finite number",
            ));
        }

        let physical_width = physical_extent(width, pixel_ratio)?;
        let physical_height = physical_extent(height, pixel_ratio)?;

        Ok(Self {
            ctx: vello_cpu::RenderContext::new(physical_width, physical_height),
            pixmap: vello_cpu::Pixmap::new(physical_width, physical_height),
            width: f64::from(width),
            height: f64::from(height),
            pixel_ratio,
            physical_width,
            physical_height,
            frame_buffer: vec![0; usize::from(physical_width) * usize::from(physical_height)],
        })
    }

    /// Logical width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Logical height.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn physical_width(&self) -> u16 {
        self.physical_width
    }

    pub fn physical_height(&self) -> u16 {
        self.physical_height
    }

    /// Borrow a pen drawing in logical coordinates.
    pub fn pen(&mut self) -> Pen<'_> {
        Pen::new(
            &mut self.ctx,
            vello_cpu::kurbo::Affine::scale(self.pixel_ratio),
            self.width,
            self.height,
        )
    }

    /// Rasterize pending draw commands onto the pixmap and return the packed
    /// `0RGB` buffer for window presentation.
    pub fn present(&mut self) -> &[u32] {
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut self.pixmap);
        self.ctx.reset();

        for (dst, px) in self
            .frame_buffer
            .iter_mut()
            .zip(self.pixmap.data_as_u8_slice().chunks_exact(4))
        {
            *dst = u32::from_be_bytes([0, px[0], px[1], px[2]]);
        }
        &self.frame_buffer
    }

    /// Premultiplied RGBA8 bytes of the last rendered frame (for PNG capture).
    pub fn rgba_bytes(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }
}

fn physical_extent(logical: u32, ratio: f64) -> NoisefieldResult<u16> {
    let scaled = (f64::from(logical) * ratio).round();
    if scaled < 1.0 {
        return Err(NoisefieldError::surface(
            "surface physical size rounds to zero",
        ));
    }
    let scaled = scaled as u64;
    u16::try_from(scaled)
        .map_err(|_| NoisefieldError::surface("surface physical size exceeds u16"))
}
