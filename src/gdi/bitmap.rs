// Pixel surfaces
//
// A `Bitmap` owns one premultiplied RGBA8 pixmap. New surfaces start fully
// transparent, `(0, 0, 0, 0)` in every pixel. Encoded export goes through
// the `image` crate with straight alpha; since premultiplying a demultiplied
// pixel gives the same pixel back, PNG export followed by `decode` reproduces
// the raw buffer exactly.

use super::color::Color;
use super::dib::{self, IndexedLayout};
use super::rop::{self, RasterOp};
use crate::common::error::{Error, Result};
use base64::Engine;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

/// Largest accepted edge length, matching GDI's 16-bit coordinate space.
pub const MAX_DIMENSION: u32 = 32767;

/// An owned pixel surface
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pixmap: Pixmap,
}

impl Bitmap {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::InvalidDimensions { width, height });
        }
        let pixmap = Pixmap::new(width, height).ok_or(Error::InvalidDimensions { width, height })?;
        Ok(Self { pixmap })
    }

    /// Decode an encoded image (PNG or BMP).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::DecodeError(format!("Failed to decode image: {}", e)))?
            .to_rgba8();

        let mut bitmap = Self::new(image.width(), image.height())
            .map_err(|e| Error::DecodeError(e.to_string()))?;
        for (dst, src) in bitmap.pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(bitmap)
    }

    /// Build a surface from palette-indexed DIB data.
    ///
    /// `info` is the info block holding the palette at byte 40; `bits` holds
    /// the padded scan lines.
    pub fn from_indexed(info: &[u8], bits: &[u8], layout: &IndexedLayout) -> Result<Self> {
        layout.validate(info, bits)?;
        let mut bitmap = Self::new(layout.width, layout.height)
            .map_err(|e| Error::MalformedBitmap(e.to_string()))?;
        dib::decode_into(&mut bitmap.pixmap, info, bits, layout)?;
        Ok(bitmap)
    }

    /// Load an encoded image from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Write the surface to disk as PNG.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.encode_png()?)?;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Raw premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Straight-alpha RGBA image.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width(), self.height());
        for (dst, src) in image.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
        }
        image
    }

    /// Straight-alpha RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.to_image().into_raw()
    }

    /// Color at a pixel, `None` off-surface or where nothing was drawn.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 {
            return None;
        }
        let p = self.pixmap.pixel(x as u32, y as u32)?;
        if p.alpha() == 0 {
            return None;
        }
        let c = p.demultiply();
        Some(Color::rgb(c.red(), c.green(), c.blue()))
    }

    /// Overwrite one pixel with an opaque color. Off-surface writes are dropped.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        let (w, h) = (self.width() as i32, self.height() as i32);
        if x < 0 || y < 0 || x >= w || y >= h {
            return false;
        }
        self.pixmap.pixels_mut()[(y * w + x) as usize] = color.to_pixel();
        true
    }

    /// Encode in the given format.
    pub fn encode(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.to_image()
            .write_to(&mut buffer, format)
            .map_err(|e| Error::EncodeError(format!("Failed to encode image: {}", e)))?;
        Ok(buffer.into_inner())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.encode(ImageFormat::Png)
    }

    /// `data:image/png;base64,...` form of the surface.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.encode_png()?;
        let engine = base64::engine::general_purpose::STANDARD;
        Ok(format!("data:image/png;base64,{}", engine.encode(png)))
    }

    /// Copy a rectangle out of the surface.
    ///
    /// Parts of the rectangle outside the surface come back transparent.
    pub fn region(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Bitmap> {
        let mut out = Bitmap::new(width, height)?;
        rop::composite_at(&mut out.pixmap, self.pixmap.as_ref(), -x, -y, RasterOp::CopyPen);
        Ok(out)
    }

    /// Draw this surface into `dest` at (x, y).
    ///
    /// With `size` the surface is scaled to that box using nearest-neighbour
    /// sampling, otherwise it is drawn 1:1.
    pub fn draw_into(&self, dest: &mut Bitmap, x: i32, y: i32, size: Option<(u32, u32)>, rop: RasterOp) {
        match size {
            Some((w, h)) if (w, h) != (self.width(), self.height()) => {
                if w == 0 || h == 0 {
                    return;
                }
                let sx = w as f32 / self.width() as f32;
                let sy = h as f32 / self.height() as f32;
                let transform = Transform::from_row(sx, 0.0, 0.0, sy, x as f32, y as f32);
                let paint = PixmapPaint {
                    quality: FilterQuality::Nearest,
                    ..PixmapPaint::default()
                };
                rop::rasterize(&mut dest.pixmap, rop, |target| {
                    target.draw_pixmap(0, 0, self.pixmap.as_ref(), &paint, transform, None);
                });
            },
            _ => rop::composite_at(&mut dest.pixmap, self.pixmap.as_ref(), x, y, rop),
        }
    }
}
