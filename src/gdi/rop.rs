// Binary raster operations (ROP2)
//
// Each mode is a per-channel bitwise function of the pen color P and the
// destination color D. The rasterizer only knows source-over, so non-copy
// modes draw into a scratch layer first; the layer's coverage then decides
// how much of the mixed color replaces the destination.

use serde::{Deserialize, Serialize};
use tiny_skia::{ColorU8, Pixmap, PixmapRef, PremultipliedColorU8};

/// Binary raster operation, numbered as `R2_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum RasterOp {
    Black = 1,
    NotMergePen = 2,
    MaskNotPen = 3,
    NotCopyPen = 4,
    MaskPenNot = 5,
    Not = 6,
    XorPen = 7,
    NotMaskPen = 8,
    MaskPen = 9,
    NotXorPen = 10,
    Nop = 11,
    MergeNotPen = 12,
    #[default]
    CopyPen = 13,
    MergePenNot = 14,
    MergePen = 15,
    White = 16,
}

impl RasterOp {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Black,
            2 => Self::NotMergePen,
            3 => Self::MaskNotPen,
            4 => Self::NotCopyPen,
            5 => Self::MaskPenNot,
            6 => Self::Not,
            7 => Self::XorPen,
            8 => Self::NotMaskPen,
            9 => Self::MaskPen,
            10 => Self::NotXorPen,
            11 => Self::Nop,
            12 => Self::MergeNotPen,
            13 => Self::CopyPen,
            14 => Self::MergePenNot,
            15 => Self::MergePen,
            16 => Self::White,
            _ => return None,
        })
    }

    /// Combine one channel of pen and destination.
    #[inline]
    pub fn mix(self, p: u8, d: u8) -> u8 {
        match self {
            Self::Black => 0,
            Self::NotMergePen => !(p | d),
            Self::MaskNotPen => !p & d,
            Self::NotCopyPen => !p,
            Self::MaskPenNot => p & !d,
            Self::Not => !d,
            Self::XorPen => p ^ d,
            Self::NotMaskPen => !(p & d),
            Self::MaskPen => p & d,
            Self::NotXorPen => !(p ^ d),
            Self::Nop => d,
            Self::MergeNotPen => !p | d,
            Self::CopyPen => p,
            Self::MergePenNot => p | !d,
            Self::MergePen => p | d,
            Self::White => 0xFF,
        }
    }
}

#[inline]
fn div255(v: u32) -> u32 {
    (v + 127) / 255
}

/// Combine one source pixel with one destination pixel.
///
/// Copy mode is plain source-over. Every other mode mixes the straight
/// colors and blends the result over the destination by source coverage.
/// Transparent destination pixels mix as black.
pub fn combine_pixel(src: PremultipliedColorU8, dst: PremultipliedColorU8, rop: RasterOp) -> PremultipliedColorU8 {
    let sa = src.alpha() as u32;
    if sa == 0 {
        return dst;
    }

    if rop == RasterOp::CopyPen {
        let inv = 255 - sa;
        let over = |s: u8, d: u8| (s as u32 + div255(d as u32 * inv)).min(255) as u8;
        return PremultipliedColorU8::from_rgba(
            over(src.red(), dst.red()),
            over(src.green(), dst.green()),
            over(src.blue(), dst.blue()),
            over(src.alpha(), dst.alpha()),
        )
        .unwrap_or(dst);
    }

    let s = src.demultiply();
    let d = dst.demultiply();
    let inv = 255 - sa;
    let blend = |p: u8, q: u8| div255(q as u32 * inv + rop.mix(p, q) as u32 * sa) as u8;
    let alpha = (sa + div255(dst.alpha() as u32 * inv)).min(255) as u8;

    ColorU8::from_rgba(
        blend(s.red(), d.red()),
        blend(s.green(), d.green()),
        blend(s.blue(), d.blue()),
        alpha,
    )
    .premultiply()
}

/// Combine a same-sized layer into `dest` pixel by pixel.
pub fn composite(dest: &mut Pixmap, layer: &Pixmap, rop: RasterOp) {
    if dest.width() != layer.width() || dest.height() != layer.height() {
        log::warn!(
            "layer {}x{} does not match surface {}x{}",
            layer.width(),
            layer.height(),
            dest.width(),
            dest.height()
        );
        return;
    }
    for (d, s) in dest.pixels_mut().iter_mut().zip(layer.pixels()) {
        *d = combine_pixel(*s, *d, rop);
    }
}

/// Combine `src` into `dest` at 1:1 with its top-left corner at (x, y).
///
/// Pixels falling outside `dest` are clipped.
pub fn composite_at(dest: &mut Pixmap, src: PixmapRef, x: i32, y: i32, rop: RasterOp) {
    let dw = dest.width() as i64;
    let dh = dest.height() as i64;
    let sw = src.width() as usize;

    let x0 = (x as i64).max(0);
    let y0 = (y as i64).max(0);
    let x1 = (x as i64 + src.width() as i64).min(dw);
    let y1 = (y as i64 + src.height() as i64).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let src_pixels = src.pixels();
    let dest_pixels = dest.pixels_mut();
    for dy in y0..y1 {
        let sy = (dy - y as i64) as usize;
        for dx in x0..x1 {
            let sx = (dx - x as i64) as usize;
            let di = (dy * dw + dx) as usize;
            dest_pixels[di] = combine_pixel(src_pixels[sy * sw + sx], dest_pixels[di], rop);
        }
    }
}

/// Run `draw` against `surface` under the given raster operation.
///
/// Copy mode draws straight onto the surface; other modes draw into a
/// transparent layer that is then combined with `composite`.
pub fn rasterize<F>(surface: &mut Pixmap, rop: RasterOp, draw: F)
where
    F: FnOnce(&mut Pixmap),
{
    if rop == RasterOp::CopyPen {
        draw(surface);
        return;
    }

    let Some(mut layer) = Pixmap::new(surface.width(), surface.height()) else {
        return;
    };
    draw(&mut layer);
    composite(surface, &layer, rop);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn opaque(r: u8, g: u8, b: u8) -> PremultipliedColorU8 {
        ColorU8::from_rgba(r, g, b, 255).premultiply()
    }

    #[test]
    fn test_mix_table() {
        assert_eq!(RasterOp::Black.mix(0xAA, 0x55), 0x00);
        assert_eq!(RasterOp::White.mix(0xAA, 0x55), 0xFF);
        assert_eq!(RasterOp::Not.mix(0xAA, 0x0F), 0xF0);
        assert_eq!(RasterOp::XorPen.mix(0xFF, 0x0F), 0xF0);
        assert_eq!(RasterOp::MaskPen.mix(0xF0, 0x3C), 0x30);
        assert_eq!(RasterOp::MergePen.mix(0xF0, 0x0F), 0xFF);
        assert_eq!(RasterOp::Nop.mix(0x12, 0x34), 0x34);
        assert_eq!(RasterOp::NotCopyPen.mix(0x00, 0x34), 0xFF);
    }

    #[test]
    fn test_from_u32() {
        assert_eq!(RasterOp::from_u32(13), Some(RasterOp::CopyPen));
        assert_eq!(RasterOp::from_u32(7), Some(RasterOp::XorPen));
        assert_eq!(RasterOp::from_u32(0), None);
        assert_eq!(RasterOp::from_u32(17), None);
    }

    #[test]
    fn test_combine_copy_is_source_over() {
        let red = opaque(255, 0, 0);
        let blue = opaque(0, 0, 255);
        assert_eq!(combine_pixel(red, blue, RasterOp::CopyPen), red);
        assert_eq!(
            combine_pixel(PremultipliedColorU8::TRANSPARENT, blue, RasterOp::CopyPen),
            blue
        );
    }

    #[test]
    fn test_combine_xor_and_not() {
        let white = opaque(255, 255, 255);
        let dst = opaque(0x12, 0x34, 0x56);
        let xored = combine_pixel(white, dst, RasterOp::XorPen);
        assert_eq!((xored.red(), xored.green(), xored.blue()), (0xED, 0xCB, 0xA9));

        let inverted = combine_pixel(opaque(1, 2, 3), dst, RasterOp::Not);
        assert_eq!((inverted.red(), inverted.green(), inverted.blue()), (0xED, 0xCB, 0xA9));
        assert_eq!(inverted.alpha(), 255);
    }

    #[test]
    fn test_rasterize_layer_only_touches_coverage() {
        let mut surface = Pixmap::new(4, 4).unwrap();
        surface.fill(tiny_skia::Color::from_rgba8(0x10, 0x20, 0x30, 255));
        rasterize(&mut surface, RasterOp::Black, |layer| {
            layer.pixels_mut()[0] = opaque(200, 200, 200);
        });
        let px = surface.pixels();
        assert_eq!((px[0].red(), px[0].green(), px[0].blue()), (0, 0, 0));
        assert_eq!((px[1].red(), px[1].green(), px[1].blue()), (0x10, 0x20, 0x30));
    }

    #[test]
    fn test_composite_at_clips() {
        let mut dest = Pixmap::new(4, 4).unwrap();
        let mut src = Pixmap::new(3, 3).unwrap();
        src.fill(tiny_skia::Color::from_rgba8(255, 0, 0, 255));
        composite_at(&mut dest, src.as_ref(), 2, -1, RasterOp::CopyPen);

        let px = dest.pixels();
        // rows 0 and 1 at columns 2 and 3 are covered
        for (i, p) in px.iter().enumerate() {
            let (x, y) = (i % 4, i / 4);
            let covered = x >= 2 && y <= 1;
            assert_eq!(p.alpha() == 255, covered, "pixel ({x}, {y})");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn test_xor_twice_restores(p in any::<u8>(), d in any::<u8>()) {
            prop_assert_eq!(RasterOp::XorPen.mix(p, RasterOp::XorPen.mix(p, d)), d);
        }

        #[test]
        fn test_opaque_pen_replaces_with_mix(
            rop in 1u32..=16,
            p in any::<(u8, u8, u8)>(),
            d in any::<(u8, u8, u8)>(),
        ) {
            let rop = RasterOp::from_u32(rop).unwrap();
            let out = combine_pixel(opaque(p.0, p.1, p.2), opaque(d.0, d.1, d.2), rop);
            prop_assert_eq!(out.alpha(), 255);
            prop_assert_eq!(out.red(), rop.mix(p.0, d.0));
            prop_assert_eq!(out.green(), rop.mix(p.1, d.1));
            prop_assert_eq!(out.blue(), rop.mix(p.2, d.2));
        }
    }
}
