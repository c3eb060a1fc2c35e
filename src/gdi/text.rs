// Text measurement and glyph outlines
//
// Faces are resolved through a process-wide fontdb database loaded on first
// use. When no face matches (or the `fonts` feature is off) text falls back
// to fixed proportional metrics and produces no outline, so background boxes
// and decorations are still placed deterministically.

use super::objects::Font;
use tiny_skia::Path;

/// Horizontal decoration bar, `offset` measured downward from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoration {
    pub offset: f32,
    pub thickness: f32,
}

/// Measured and outlined run of text.
///
/// The outline is in run space: the pen starts at x = 0 and the baseline is
/// y = 0, with y growing downward.
#[derive(Debug, Clone)]
pub struct TextLayout {
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
    pub underline: Decoration,
    pub strikeout: Decoration,
    pub outline: Option<Path>,
}

impl TextLayout {
    /// Metrics-only layout used when no face can be resolved.
    pub fn fallback(font: &Font, text: &str) -> Self {
        let size = font.size as f32;
        let thickness = (size / 14.0).max(1.0);
        Self {
            advance: text.chars().count() as f32 * size * 0.6,
            ascent: size * 0.8,
            descent: size * 0.2,
            underline: Decoration {
                offset: size * 0.1,
                thickness,
            },
            strikeout: Decoration {
                offset: -size * 0.3,
                thickness,
            },
            outline: None,
        }
    }

    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Lay out `text` in `font`.
pub fn layout(font: &Font, text: &str) -> TextLayout {
    #[cfg(feature = "fonts")]
    {
        if let Some(layout) = system::layout(font, text) {
            return layout;
        }
        log::warn!(
            "no usable face for '{}' (weight {}, italic {}), using fallback metrics",
            font.face,
            font.weight,
            font.italic
        );
    }
    TextLayout::fallback(font, text)
}

#[cfg(feature = "fonts")]
mod system {
    use super::{Decoration, TextLayout};
    use crate::gdi::objects::Font;
    use fontdb::{Database, Family, Query, Stretch, Style, Weight};
    use once_cell::sync::Lazy;
    use tiny_skia::PathBuilder;
    use ttf_parser::{Face, GlyphId, OutlineBuilder};

    static FONT_DB: Lazy<Database> = Lazy::new(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("font database loaded with {} faces", db.len());
        db
    });

    /// Feeds glyph outlines into a path, flipping y and offsetting by the pen.
    struct OutlineSink<'a> {
        builder: &'a mut PathBuilder,
        pen_x: f32,
        scale: f32,
    }

    impl OutlineSink<'_> {
        fn map(&self, x: f32, y: f32) -> (f32, f32) {
            (self.pen_x + x * self.scale, -y * self.scale)
        }
    }

    impl OutlineBuilder for OutlineSink<'_> {
        fn move_to(&mut self, x: f32, y: f32) {
            let (x, y) = self.map(x, y);
            self.builder.move_to(x, y);
        }

        fn line_to(&mut self, x: f32, y: f32) {
            let (x, y) = self.map(x, y);
            self.builder.line_to(x, y);
        }

        fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
            let (x1, y1) = self.map(x1, y1);
            let (x, y) = self.map(x, y);
            self.builder.quad_to(x1, y1, x, y);
        }

        fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
            let (x1, y1) = self.map(x1, y1);
            let (x2, y2) = self.map(x2, y2);
            let (x, y) = self.map(x, y);
            self.builder.cubic_to(x1, y1, x2, y2, x, y);
        }

        fn close(&mut self) {
            self.builder.close();
        }
    }

    pub(super) fn layout(font: &Font, text: &str) -> Option<TextLayout> {
        let families = [Family::Name(font.face.as_str()), Family::SansSerif];
        let query = Query {
            families: &families,
            weight: Weight(font.weight),
            stretch: Stretch::Normal,
            style: if font.italic { Style::Italic } else { Style::Normal },
        };
        let id = FONT_DB.query(&query)?;
        FONT_DB
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                Some(outline_run(&face, font, text))
            })
            .flatten()
    }

    fn outline_run(face: &Face, font: &Font, text: &str) -> TextLayout {
        let size = font.size as f32;
        let scale = size / face.units_per_em() as f32;
        let fallback = TextLayout::fallback(font, text);

        let decoration = |metrics: Option<ttf_parser::LineMetrics>, default: Decoration| {
            metrics.map_or(default, |m| Decoration {
                offset: -(m.position as f32) * scale,
                thickness: (m.thickness as f32 * scale).max(1.0),
            })
        };

        let mut builder = PathBuilder::new();
        let mut pen_x = 0.0;
        for ch in text.chars() {
            let glyph = face.glyph_index(ch).unwrap_or(GlyphId(0));
            let mut sink = OutlineSink {
                builder: &mut builder,
                pen_x,
                scale,
            };
            face.outline_glyph(glyph, &mut sink);
            pen_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }

        TextLayout {
            advance: pen_x,
            ascent: face.ascender() as f32 * scale,
            descent: -(face.descender() as f32) * scale,
            underline: decoration(face.underline_metrics(), fallback.underline),
            strikeout: decoration(face.strikeout_metrics(), fallback.strikeout),
            outline: builder.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_metrics() {
        let font = Font::new("Arial", 20, Font::NORMAL);
        let layout = TextLayout::fallback(&font, "abcd");
        assert_eq!(layout.advance, 48.0);
        assert_eq!(layout.ascent, 16.0);
        assert_eq!(layout.descent, 4.0);
        assert_eq!(layout.height(), 20.0);
        assert!(layout.outline.is_none());
        assert!(layout.underline.offset > 0.0);
        assert!(layout.strikeout.offset < 0.0);
    }

    #[test]
    fn test_layout_empty_text() {
        let layout = layout(&Font::default(), "");
        assert_eq!(layout.advance, 0.0);
        assert!(layout.ascent > 0.0);
    }

    #[test]
    fn test_layout_grows_with_text() {
        let font = Font::default();
        let short = layout(&font, "i");
        let long = layout(&font, "iiiiiiii");
        assert!(long.advance > short.advance);
    }
}
