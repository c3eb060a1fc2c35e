// Indexed-color DIB decoding
//
// Palette-indexed pixel data as it appears after a BITMAPINFOHEADER: the
// palette starts at byte 40 of the info block with one 4-byte RGBQUAD
// (B, G, R, reserved) per entry, and every scan line is padded to a 32-bit
// boundary. Bottom-up images store the last visual row first.

use crate::common::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tiny_skia::{ColorU8, Pixmap, PremultipliedColorU8};

/// Byte offset of the palette inside the info block.
pub const PALETTE_OFFSET: usize = 40;

/// Bytes per palette entry.
pub const PALETTE_ENTRY_SIZE: usize = 4;

/// Geometry and palette description of an indexed pixel block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedLayout {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    /// Palette size in bytes, four per entry.
    pub palette_size: u32,
    pub top_down: bool,
}

impl IndexedLayout {
    /// Bytes per scan line including padding.
    pub fn stride(&self) -> usize {
        (self.width as usize * self.bits_per_pixel as usize).div_ceil(32) * 4
    }

    /// Bytes of pixel data the last scan line actually uses.
    fn last_row_len(&self) -> usize {
        (self.width as usize * self.bits_per_pixel as usize).div_ceil(8)
    }

    /// Smallest pixel block the layout can be read from.
    pub fn required_bits_len(&self) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        (self.height as usize - 1) * self.stride() + self.last_row_len()
    }

    pub fn palette_entries(&self) -> usize {
        (self.palette_size as usize).div_ceil(PALETTE_ENTRY_SIZE)
    }

    /// Check bit depth and buffer lengths against the layout.
    pub(crate) fn validate(&self, info: &[u8], bits: &[u8]) -> Result<()> {
        if !matches!(self.bits_per_pixel, 1 | 4 | 8) {
            return Err(Error::MalformedBitmap(format!(
                "unsupported bit depth {}",
                self.bits_per_pixel
            )));
        }

        let entries = self.palette_entries();
        if entries > 0 {
            // The last entry only needs its B, G, R bytes
            let needed = PALETTE_OFFSET + (entries - 1) * PALETTE_ENTRY_SIZE + 3;
            if info.len() < needed {
                return Err(Error::MalformedBitmap(format!(
                    "palette of {} entries needs {} info bytes, got {}",
                    entries,
                    needed,
                    info.len()
                )));
            }
        }

        let needed = self.required_bits_len();
        if bits.len() < needed {
            return Err(Error::MalformedBitmap(format!(
                "{}x{} at {} bpp needs {} pixel bytes, got {}",
                self.width,
                self.height,
                self.bits_per_pixel,
                needed,
                bits.len()
            )));
        }
        Ok(())
    }
}

/// Read the palette as opaque premultiplied pixels.
fn read_palette(info: &[u8], entries: usize) -> Vec<PremultipliedColorU8> {
    (0..entries)
        .map(|i| {
            let offset = PALETTE_OFFSET + i * PALETTE_ENTRY_SIZE;
            let (b, g, r) = (info[offset], info[offset + 1], info[offset + 2]);
            ColorU8::from_rgba(r, g, b, 255).premultiply()
        })
        .collect()
}

/// Extract the palette index of pixel `x` from a scan line.
#[inline]
fn palette_index(row: &[u8], x: usize, bits_per_pixel: u16) -> usize {
    match bits_per_pixel {
        8 => row[x] as usize,
        4 => {
            let byte = row[x / 2];
            if x % 2 == 0 {
                (byte >> 4) as usize
            } else {
                (byte & 0x0F) as usize
            }
        },
        _ => ((row[x / 8] >> (7 - (x % 8))) & 0x01) as usize,
    }
}

/// Decode indexed pixels into `pixmap`, which must match the layout size.
///
/// Indices past the end of the palette resolve to entry 0. With an empty
/// palette nothing is written and the pixmap keeps its contents.
pub fn decode_into(pixmap: &mut Pixmap, info: &[u8], bits: &[u8], layout: &IndexedLayout) -> Result<()> {
    layout.validate(info, bits)?;
    if pixmap.width() != layout.width || pixmap.height() != layout.height {
        return Err(Error::MalformedBitmap(format!(
            "target is {}x{}, layout is {}x{}",
            pixmap.width(),
            pixmap.height(),
            layout.width,
            layout.height
        )));
    }

    let palette = read_palette(info, layout.palette_entries());
    if palette.is_empty() {
        log::debug!("indexed bitmap has an empty palette, leaving pixels untouched");
        return Ok(());
    }

    let width = layout.width as usize;
    let height = layout.height as usize;
    let stride = layout.stride();
    let pixels = pixmap.pixels_mut();

    for y in 0..height {
        let line = if layout.top_down { y } else { height - 1 - y };
        let row = &bits[line * stride..];
        let out = &mut pixels[y * width..(y + 1) * width];
        for (x, px) in out.iter_mut().enumerate() {
            let index = palette_index(row, x, layout.bits_per_pixel);
            *px = palette.get(index).copied().unwrap_or(palette[0]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info_with_palette(colors: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut info = vec![0u8; PALETTE_OFFSET];
        for &(r, g, b) in colors {
            info.extend_from_slice(&[b, g, r, 0]);
        }
        info
    }

    fn layout(width: u32, height: u32, bpp: u16, entries: u32, top_down: bool) -> IndexedLayout {
        IndexedLayout {
            width,
            height,
            bits_per_pixel: bpp,
            palette_size: entries * 4,
            top_down,
        }
    }

    fn rgba(p: PremultipliedColorU8) -> (u8, u8, u8, u8) {
        (p.red(), p.green(), p.blue(), p.alpha())
    }

    #[test]
    fn test_stride() {
        assert_eq!(layout(1, 1, 1, 2, true).stride(), 4);
        assert_eq!(layout(33, 1, 1, 2, true).stride(), 8);
        assert_eq!(layout(9, 1, 4, 16, true).stride(), 8);
        assert_eq!(layout(4, 1, 8, 256, true).stride(), 4);
        assert_eq!(layout(5, 1, 8, 256, true).stride(), 8);
    }

    #[test]
    fn test_one_bit_msb_first() {
        let info = info_with_palette(&[(0, 0, 0), (255, 255, 255)]);
        let bits = [0b1000_0000, 0, 0, 0];
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        decode_into(&mut pixmap, &info, &bits, &layout(2, 1, 1, 2, true)).unwrap();

        assert_eq!(rgba(pixmap.pixels()[0]), (255, 255, 255, 255));
        assert_eq!(rgba(pixmap.pixels()[1]), (0, 0, 0, 255));
    }

    #[test]
    fn test_four_bit_nibbles() {
        let info = info_with_palette(&[(0, 0, 0), (255, 0, 0), (0, 255, 0)]);
        let bits = [0x12, 0, 0, 0];
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        decode_into(&mut pixmap, &info, &bits, &layout(2, 1, 4, 3, true)).unwrap();

        assert_eq!(rgba(pixmap.pixels()[0]), (255, 0, 0, 255));
        assert_eq!(rgba(pixmap.pixels()[1]), (0, 255, 0, 255));
    }

    #[test]
    fn test_bottom_up_rows() {
        let info = info_with_palette(&[(0, 0, 0), (0, 0, 255)]);
        // First stored line is the bottom row
        let bits = [1, 0, 0, 0, 0, 0, 0, 0];
        let mut pixmap = Pixmap::new(1, 2).unwrap();
        decode_into(&mut pixmap, &info, &bits, &layout(1, 2, 8, 2, false)).unwrap();

        assert_eq!(rgba(pixmap.pixels()[0]), (0, 0, 0, 255));
        assert_eq!(rgba(pixmap.pixels()[1]), (0, 0, 255, 255));
    }

    #[test]
    fn test_out_of_range_index_uses_entry_zero() {
        let info = info_with_palette(&[(10, 20, 30), (40, 50, 60)]);
        let bits = [200, 1, 0, 0];
        let mut pixmap = Pixmap::new(2, 1).unwrap();
        decode_into(&mut pixmap, &info, &bits, &layout(2, 1, 8, 2, true)).unwrap();

        assert_eq!(rgba(pixmap.pixels()[0]), (10, 20, 30, 255));
        assert_eq!(rgba(pixmap.pixels()[1]), (40, 50, 60, 255));
    }

    #[test]
    fn test_empty_palette_leaves_pixels() {
        let info = vec![0u8; PALETTE_OFFSET];
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        decode_into(&mut pixmap, &info, &[0xFF; 8], &layout(2, 2, 8, 0, true)).unwrap();
        assert!(pixmap.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_rejects_short_buffers() {
        let info = info_with_palette(&[(0, 0, 0), (255, 255, 255)]);
        let mut pixmap = Pixmap::new(8, 2).unwrap();

        // Two rows need 4 + 1 bytes
        let err = decode_into(&mut pixmap, &info, &[0; 4], &layout(8, 2, 1, 2, true));
        assert!(matches!(err, Err(Error::MalformedBitmap(_))));
        assert!(decode_into(&mut pixmap, &info, &[0; 5], &layout(8, 2, 1, 2, true)).is_ok());

        // Palette claims more entries than the info block carries
        let err = decode_into(&mut pixmap, &info, &[0; 8], &layout(8, 2, 1, 4, true));
        assert!(matches!(err, Err(Error::MalformedBitmap(_))));
    }

    #[test]
    fn test_rejects_bit_depth() {
        let info = info_with_palette(&[(0, 0, 0)]);
        let mut pixmap = Pixmap::new(1, 1).unwrap();
        let err = decode_into(&mut pixmap, &info, &[0; 4], &layout(1, 1, 24, 1, true));
        assert!(matches!(err, Err(Error::MalformedBitmap(_))));
    }

    #[test]
    fn test_partial_palette_entry_rounds_up() {
        // Six bytes of palette describe two entries
        let info = info_with_palette(&[(1, 2, 3), (4, 5, 6)]);
        let mut l = layout(2, 1, 8, 0, true);
        l.palette_size = 6;
        assert_eq!(l.palette_entries(), 2);

        let mut pixmap = Pixmap::new(2, 1).unwrap();
        decode_into(&mut pixmap, &info, &[1, 0, 0, 0], &l).unwrap();
        assert_eq!(rgba(pixmap.pixels()[0]), (4, 5, 6, 255));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_decode_is_deterministic(
            width in 1u32..24,
            height in 1u32..12,
            bpp in prop::sample::select(vec![1u16, 4, 8]),
            entries in 0u32..20,
            top_down in any::<bool>(),
            seed in any::<u8>(),
        ) {
            let l = layout(width, height, bpp, entries, top_down);
            let colors: Vec<_> = (0..entries as u8)
                .map(|i| (i.wrapping_mul(37), seed, i ^ seed))
                .collect();
            let info = info_with_palette(&colors);
            let bits: Vec<u8> = (0..l.required_bits_len())
                .map(|i| (i as u8).wrapping_mul(31) ^ seed)
                .collect();

            let mut a = Pixmap::new(width, height).unwrap();
            let mut b = Pixmap::new(width, height).unwrap();
            decode_into(&mut a, &info, &bits, &l).unwrap();
            decode_into(&mut b, &info, &bits, &l).unwrap();
            prop_assert_eq!(a.data(), b.data());

            // Every pixel is either a palette color or untouched
            for p in a.pixels() {
                prop_assert!(p.alpha() == 255 || entries == 0);
            }
        }
    }
}
