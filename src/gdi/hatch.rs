// Hatch pattern tiles
//
// Hatched brushes fill with an 8x8 tile repeated across the shape. Tiles are
// built on demand; they are small enough that caching buys nothing.

use super::color::Color;
use super::objects::HatchStyle;
use tiny_skia::{
    FilterQuality, Paint, PathBuilder, Pattern, Pixmap, Shader, SpreadMode, Stroke, Transform,
};

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 8;

/// Build the tile for a hatch style.
///
/// Returns `None` for styles without a line pattern; callers fall back to a
/// flat fill in the brush color.
pub fn synthesize(hatch: HatchStyle, color: Color) -> Option<Pixmap> {
    let size = TILE_SIZE as f32;
    let mid = size / 2.0 + 0.5;

    let mut pb = PathBuilder::new();
    let horizontal = |pb: &mut PathBuilder| {
        pb.move_to(0.0, mid);
        pb.line_to(size, mid);
    };
    let vertical = |pb: &mut PathBuilder| {
        pb.move_to(mid, 0.0);
        pb.line_to(mid, size);
    };
    let forward = |pb: &mut PathBuilder| {
        pb.move_to(0.0, 0.0);
        pb.line_to(size, size);
    };
    let backward = |pb: &mut PathBuilder| {
        pb.move_to(size, 0.0);
        pb.line_to(0.0, size);
    };

    match hatch {
        HatchStyle::Horizontal => horizontal(&mut pb),
        HatchStyle::Vertical => vertical(&mut pb),
        HatchStyle::ForwardDiagonal => forward(&mut pb),
        HatchStyle::BackwardDiagonal => backward(&mut pb),
        HatchStyle::Cross => {
            horizontal(&mut pb);
            vertical(&mut pb);
        },
        HatchStyle::DiagonalCross => {
            forward(&mut pb);
            backward(&mut pb);
        },
        _ => return None,
    }

    let path = pb.finish()?;
    let mut tile = Pixmap::new(TILE_SIZE, TILE_SIZE)?;

    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = false;

    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    tile.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    Some(tile)
}

/// Shader that repeats `tile` across device space.
pub fn pattern_shader(tile: &Pixmap) -> Shader<'_> {
    Pattern::new(
        tile.as_ref(),
        SpreadMode::Repeat,
        FilterQuality::Nearest,
        1.0,
        Transform::identity(),
    )
}
