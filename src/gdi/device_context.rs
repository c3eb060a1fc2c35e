// Device context
//
// A device context pairs a `DcState` with a private fallback surface and the
// default pen, brush and font it falls back to. Resources themselves live in
// the session's object table; callers resolve the current selection and the
// bound bitmap before each primitive and hand them in, so the context never
// holds references into the table.

use super::bitmap::Bitmap;
use super::color::Color;
use super::hatch;
use super::objects::{Brush, BrushStyle, Font, ObjectId, ObjectKind, ObjectTable, Pen, PenStyle};
use super::rop::{self, RasterOp};
use super::state::{BkMode, DcState, DcStateStack, MapMode, Point, PolyFillMode, StretchMode, TextAlign};
use super::text;
use tiny_skia::{
    FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform,
};

/// Resolved pen, brush and font for one drawing call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub pen: Pen,
    pub brush: Brush,
    pub font: Font,
}

impl Selection {
    /// Look up the selected objects, substituting defaults for missing ones.
    pub fn resolve(objects: &ObjectTable, state: &DcState) -> Self {
        Self {
            pen: objects.pen(state.pen()).copied().unwrap_or_default(),
            brush: objects.brush(state.brush()).copied().unwrap_or_default(),
            font: objects.font(state.font()).cloned().unwrap_or_default(),
        }
    }
}

/// Handles of the objects a context falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub pen: ObjectId,
    pub brush: ObjectId,
    pub font: ObjectId,
}

/// Stateful drawing context
#[derive(Debug, Clone)]
pub struct DeviceContext {
    state: DcState,
    surface: Bitmap,
    defaults: Defaults,
    saved: DcStateStack,
}

fn solid_paint<'a>(color: Color, anti_alias: bool) -> Paint<'a> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = anti_alias;
    paint
}

fn pen_stroke(pen: &Pen) -> Stroke {
    let mut stroke = Stroke {
        width: pen.device_width() as f32,
        ..Stroke::default()
    };
    if let Some(intervals) = pen.style.dash_pattern() {
        stroke.dash = StrokeDash::new(intervals.to_vec(), 0.0);
    }
    stroke
}

/// Offset that puts an odd-width stroke on pixel centres.
fn pen_offset(pen: &Pen) -> f32 {
    if pen.device_width() % 2 == 1 { 0.5 } else { 0.0 }
}

fn ordered_rect(left: i32, top: i32, right: i32, bottom: i32) -> (f32, f32, f32, f32) {
    (
        left.min(right) as f32,
        top.min(bottom) as f32,
        left.max(right) as f32,
        top.max(bottom) as f32,
    )
}

fn polyline_path(points: &[Point], offset: f32, close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32 + offset, first.y as f32 + offset);
    for p in rest {
        pb.line_to(p.x as f32 + offset, p.y as f32 + offset);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

/// Fill `path` with the brush under the raster op.
fn fill_with_brush(pixmap: &mut Pixmap, brush: &Brush, path: &Path, rule: FillRule, rop: RasterOp) {
    if brush.style == BrushStyle::Null {
        return;
    }

    let tile = match brush.style {
        BrushStyle::Hatched => hatch::synthesize(brush.hatch, brush.color),
        _ => None,
    };
    let mut paint = solid_paint(brush.color, false);
    if let Some(tile) = &tile {
        paint.shader = hatch::pattern_shader(tile);
    }

    rop::rasterize(pixmap, rop, |target| {
        target.fill_path(path, &paint, rule, Transform::identity(), None);
    });
}

/// Stroke `path` with the pen under the raster op.
fn stroke_with_pen(pixmap: &mut Pixmap, pen: &Pen, path: &Path, rop: RasterOp) {
    if pen.style == PenStyle::Null {
        return;
    }
    let paint = solid_paint(pen.color, false);
    let stroke = pen_stroke(pen);
    rop::rasterize(pixmap, rop, |target| {
        target.stroke_path(path, &paint, &stroke, Transform::identity(), None);
    });
}

/// Fill a device rectangle ignoring the raster op.
fn fill_box(pixmap: &mut Pixmap, x: f32, y: f32, width: f32, height: f32, color: Color, anti_alias: bool) {
    if let Some(rect) = Rect::from_xywh(x, y, width, height) {
        pixmap.fill_rect(rect, &solid_paint(color, anti_alias), Transform::identity(), None);
    }
}

impl DeviceContext {
    /// Create a context drawing to a private surface.
    pub fn new(surface: Bitmap, defaults: Defaults) -> Self {
        Self {
            state: DcState::new(defaults.pen, defaults.brush, defaults.font),
            surface,
            defaults,
            saved: DcStateStack::new(),
        }
    }

    pub fn state(&self) -> &DcState {
        &self.state
    }

    pub fn defaults(&self) -> Defaults {
        self.defaults
    }

    /// The private surface, used while no bitmap is selected.
    pub fn private_surface(&self) -> &Bitmap {
        &self.surface
    }

    fn target<'a>(surface: &'a mut Bitmap, target: Option<&'a mut Bitmap>) -> &'a mut Pixmap {
        target.unwrap_or(surface).pixmap_mut()
    }

    // Selection

    /// Install `id` in the slot for `kind`, returning what it replaces.
    ///
    /// The previous bitmap is `None` when the private surface was bound.
    pub(crate) fn select(&mut self, kind: ObjectKind, id: ObjectId) -> Option<ObjectId> {
        let state = &mut self.state;
        match kind {
            ObjectKind::Pen => Some(std::mem::replace(&mut state.pen, id)),
            ObjectKind::Brush => Some(std::mem::replace(&mut state.brush, id)),
            ObjectKind::Font => Some(std::mem::replace(&mut state.font, id)),
            ObjectKind::Bitmap => state.bitmap.replace(id),
        }
    }

    /// Drop `id` from every slot holding it. Returns whether anything changed.
    pub(crate) fn release(&mut self, id: ObjectId) -> bool {
        let mut released = false;
        let state = &mut self.state;
        if state.pen == id && id != self.defaults.pen {
            state.pen = self.defaults.pen;
            released = true;
        }
        if state.brush == id && id != self.defaults.brush {
            state.brush = self.defaults.brush;
            released = true;
        }
        if state.font == id && id != self.defaults.font {
            state.font = self.defaults.font;
            released = true;
        }
        if state.bitmap == Some(id) {
            state.bitmap = None;
            released = true;
        }
        released
    }

    // State setters

    pub fn move_to(&mut self, x: i32, y: i32) -> Point {
        std::mem::replace(&mut self.state.current_pos, Point::new(x, y))
    }

    pub fn set_rop2(&mut self, rop: RasterOp) -> RasterOp {
        std::mem::replace(&mut self.state.raster_op, rop)
    }

    pub fn set_text_color(&mut self, color: Color) -> Color {
        std::mem::replace(&mut self.state.text_color, color)
    }

    pub fn set_bk_color(&mut self, color: Color) -> Color {
        std::mem::replace(&mut self.state.bk_color, color)
    }

    pub fn set_bk_mode(&mut self, mode: BkMode) -> BkMode {
        std::mem::replace(&mut self.state.bk_mode, mode)
    }

    pub fn set_text_align(&mut self, align: TextAlign) -> TextAlign {
        std::mem::replace(&mut self.state.text_align, align)
    }

    pub fn set_map_mode(&mut self, mode: MapMode) -> MapMode {
        std::mem::replace(&mut self.state.map_mode, mode)
    }

    pub fn set_viewport_org(&mut self, x: i32, y: i32) -> Point {
        std::mem::replace(&mut self.state.viewport_org, Point::new(x, y))
    }

    pub fn set_window_org(&mut self, x: i32, y: i32) -> Point {
        std::mem::replace(&mut self.state.window_org, Point::new(x, y))
    }

    pub fn set_stretch_mode(&mut self, mode: StretchMode) -> StretchMode {
        std::mem::replace(&mut self.state.stretch_mode, mode)
    }

    pub fn set_poly_fill_mode(&mut self, mode: PolyFillMode) -> PolyFillMode {
        std::mem::replace(&mut self.state.poly_fill_mode, mode)
    }

    /// Replace the whole state. Selections are expected to be valid.
    pub(crate) fn set_state(&mut self, state: DcState) {
        self.state = state;
    }

    /// Push the current state, returning the new save level.
    pub fn save_dc(&mut self) -> i32 {
        self.saved.push(self.state) as i32
    }

    /// Pop back to a save level. Returns the restored state, if any.
    pub(crate) fn restore_dc(&mut self, level: i32) -> Option<DcState> {
        self.saved.pop_to(level)
    }

    pub fn save_depth(&self) -> usize {
        self.saved.depth()
    }

    // Primitives

    pub(crate) fn line_to(&mut self, target: Option<&mut Bitmap>, sel: &Selection, x: i32, y: i32) {
        let state = self.state;
        let from = state.to_device(state.current_pos);
        let to = state.to_device(Point::new(x, y));
        self.state.current_pos = Point::new(x, y);
        log::trace!("LineTo ({}, {}) -> ({}, {})", from.x, from.y, to.x, to.y);

        let offset = pen_offset(&sel.pen);
        let Some(path) = polyline_path(&[from, to], offset, false) else {
            return;
        };
        let pixmap = Self::target(&mut self.surface, target);
        stroke_with_pen(pixmap, &sel.pen, &path, state.raster_op);
    }

    pub(crate) fn rectangle(
        &mut self,
        target: Option<&mut Bitmap>,
        sel: &Selection,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) {
        let state = self.state;
        let lt = state.to_device(Point::new(left, top));
        let rb = state.to_device(Point::new(right, bottom));
        let (l, t, r, b) = ordered_rect(lt.x, lt.y, rb.x, rb.y);
        log::trace!("Rectangle ({l}, {t}, {r}, {b})");

        let pixmap = Self::target(&mut self.surface, target);
        if let Some(rect) = Rect::from_ltrb(l, t, r, b) {
            let path = PathBuilder::from_rect(rect);
            fill_with_brush(pixmap, &sel.brush, &path, FillRule::Winding, state.raster_op);
        }

        let inset = pen_offset(&sel.pen);
        if let Some(rect) = Rect::from_ltrb(l + inset, t + inset, r - inset, b - inset) {
            let path = PathBuilder::from_rect(rect);
            stroke_with_pen(pixmap, &sel.pen, &path, state.raster_op);
        }
    }

    pub(crate) fn ellipse(
        &mut self,
        target: Option<&mut Bitmap>,
        sel: &Selection,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) {
        let state = self.state;
        let lt = state.to_device(Point::new(left, top));
        let rb = state.to_device(Point::new(right, bottom));
        let (l, t, r, b) = ordered_rect(lt.x, lt.y, rb.x, rb.y);
        log::trace!("Ellipse ({l}, {t}, {r}, {b})");

        let pixmap = Self::target(&mut self.surface, target);
        if let Some(path) = Rect::from_ltrb(l, t, r, b).and_then(PathBuilder::from_oval) {
            fill_with_brush(pixmap, &sel.brush, &path, FillRule::Winding, state.raster_op);
        }

        // Same centre, radii pulled in so odd-width outlines stay inside
        let inset = pen_offset(&sel.pen);
        if let Some(path) =
            Rect::from_ltrb(l + inset, t + inset, r - inset, b - inset).and_then(PathBuilder::from_oval)
        {
            stroke_with_pen(pixmap, &sel.pen, &path, state.raster_op);
        }
    }

    pub(crate) fn polygon(&mut self, target: Option<&mut Bitmap>, sel: &Selection, points: &[Point]) {
        if points.len() < 2 {
            return;
        }
        let state = self.state;
        let device: Vec<Point> = points.iter().map(|&p| state.to_device(p)).collect();
        log::trace!("Polygon with {} points", device.len());

        let pixmap = Self::target(&mut self.surface, target);
        if let Some(path) = polyline_path(&device, 0.0, true) {
            let rule = state.poly_fill_mode.to_fill_rule();
            fill_with_brush(pixmap, &sel.brush, &path, rule, state.raster_op);
        }
        if let Some(path) = polyline_path(&device, pen_offset(&sel.pen), true) {
            stroke_with_pen(pixmap, &sel.pen, &path, state.raster_op);
        }
    }

    pub(crate) fn polyline(&mut self, target: Option<&mut Bitmap>, sel: &Selection, points: &[Point]) {
        let state = self.state;
        let device: Vec<Point> = points.iter().map(|&p| state.to_device(p)).collect();
        log::trace!("Polyline with {} points", device.len());

        if let Some(path) = polyline_path(&device, pen_offset(&sel.pen), false) {
            let pixmap = Self::target(&mut self.surface, target);
            stroke_with_pen(pixmap, &sel.pen, &path, state.raster_op);
        }
    }

    /// Draw `text` with its anchor at (x, y); y is the baseline.
    pub(crate) fn text_out(&mut self, target: Option<&mut Bitmap>, sel: &Selection, x: i32, y: i32, text: &str) {
        let state = self.state;
        let origin = state.to_device(Point::new(x, y));
        let layout = text::layout(&sel.font, text);
        log::trace!("TextOut ({}, {}) {:?}", origin.x, origin.y, text);

        let left = origin.x as f32 - layout.advance * state.text_align.anchor_fraction();
        let baseline = origin.y as f32;
        let pixmap = Self::target(&mut self.surface, target);

        if state.bk_mode == BkMode::Opaque {
            fill_box(
                pixmap,
                left,
                baseline - layout.ascent,
                layout.advance,
                layout.height(),
                state.bk_color,
                false,
            );
        }

        if let Some(outline) = &layout.outline {
            let paint = solid_paint(state.text_color, true);
            let transform = Transform::from_translate(left, baseline);
            pixmap.fill_path(outline, &paint, FillRule::Winding, transform, None);
        }

        let decorations = [
            (sel.font.underline, layout.underline),
            (sel.font.strikeout, layout.strikeout),
        ];
        for (enabled, bar) in decorations {
            if enabled {
                let top = (baseline + bar.offset).round();
                fill_box(pixmap, left, top, layout.advance, bar.thickness.round(), state.text_color, false);
            }
        }
    }

    /// Write one pixel; raster ops do not apply.
    pub(crate) fn set_pixel(&mut self, target: Option<&mut Bitmap>, x: i32, y: i32, color: Color) -> Color {
        let p = self.state.to_device(Point::new(x, y));
        target.unwrap_or(&mut self.surface).set_pixel(p.x, p.y, color);
        color
    }

    /// Composite `source` into the bound surface at (x, y).
    ///
    /// `size` scales the source to that box; `rop` overrides the context's
    /// raster op for this call only.
    pub(crate) fn draw_bitmap(
        &mut self,
        target: Option<&mut Bitmap>,
        source: &Bitmap,
        x: i32,
        y: i32,
        size: Option<(u32, u32)>,
        rop: RasterOp,
    ) {
        let p = self.state.to_device(Point::new(x, y));
        self.blit(target, source, p, size, rop);
    }

    /// Composite `source` with its top-left corner at device point `at`.
    pub(crate) fn blit(
        &mut self,
        target: Option<&mut Bitmap>,
        source: &Bitmap,
        at: Point,
        size: Option<(u32, u32)>,
        rop: RasterOp,
    ) {
        log::trace!(
            "draw {}x{} bitmap at ({}, {}) size {:?} rop {:?}",
            source.width(),
            source.height(),
            at.x,
            at.y,
            size,
            rop
        );
        source.draw_into(target.unwrap_or(&mut self.surface), at.x, at.y, size, rop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gdi::objects::{GdiObject, HatchStyle};

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn context(width: u32, height: u32) -> DeviceContext {
        let defaults = Defaults {
            pen: ObjectId(1),
            brush: ObjectId(2),
            font: ObjectId(3),
        };
        DeviceContext::new(Bitmap::new(width, height).unwrap(), defaults)
    }

    fn selection(pen: Pen, brush: Brush) -> Selection {
        Selection {
            pen,
            brush,
            font: Font::default(),
        }
    }

    fn pixel(dc: &DeviceContext, x: i32, y: i32) -> Option<Color> {
        dc.private_surface().pixel(x, y)
    }

    #[test]
    fn test_setters_return_previous() {
        let mut dc = context(4, 4);
        assert_eq!(dc.set_text_color(RED), Color::BLACK);
        assert_eq!(dc.set_text_color(BLUE), RED);
        assert_eq!(dc.set_bk_color(RED), Color::WHITE);
        assert_eq!(dc.set_bk_mode(BkMode::Transparent), BkMode::Opaque);
        assert_eq!(dc.set_text_align(TextAlign::Center), TextAlign::Left);
        assert_eq!(dc.set_map_mode(MapMode::Twips), MapMode::Text);
        assert_eq!(dc.set_viewport_org(3, 4), Point::new(0, 0));
        assert_eq!(dc.set_window_org(1, 2), Point::new(0, 0));
        assert_eq!(dc.set_stretch_mode(StretchMode::Halftone), StretchMode::BlackOnWhite);
        assert_eq!(dc.set_poly_fill_mode(PolyFillMode::Alternate), PolyFillMode::Winding);
        assert_eq!(dc.set_rop2(RasterOp::XorPen), RasterOp::CopyPen);
        assert_eq!(dc.move_to(5, 6), Point::new(0, 0));
        assert_eq!(dc.move_to(0, 0), Point::new(5, 6));
    }

    #[test]
    fn test_setters_do_not_draw() {
        let mut dc = context(4, 4);
        dc.set_bk_color(RED);
        dc.set_rop2(RasterOp::White);
        dc.move_to(3, 3);
        assert!(dc.private_surface().data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_select_and_release() {
        let mut dc = context(4, 4);
        assert_eq!(dc.select(ObjectKind::Pen, ObjectId(10)), Some(ObjectId(1)));
        assert_eq!(dc.select(ObjectKind::Bitmap, ObjectId(11)), None);
        assert_eq!(dc.select(ObjectKind::Bitmap, ObjectId(12)), Some(ObjectId(11)));

        assert!(dc.release(ObjectId(10)));
        assert_eq!(dc.state().pen(), ObjectId(1));
        assert!(!dc.release(ObjectId(10)));

        assert!(dc.release(ObjectId(12)));
        assert_eq!(dc.state().bitmap(), None);

        // Releasing the default leaves it in place
        assert!(!dc.release(ObjectId(2)));
        assert_eq!(dc.state().brush(), ObjectId(2));
    }

    #[test]
    fn test_selection_resolve_falls_back() {
        let mut objects = ObjectTable::new();
        let pen = objects.create(GdiObject::Pen(Pen::new(PenStyle::Dash, 3, RED))).unwrap();
        let state = DcState::new(pen, ObjectId(999), ObjectId(998));
        let sel = Selection::resolve(&objects, &state);
        assert_eq!(sel.pen.width, 3);
        assert_eq!(sel.brush, Brush::default());
        assert_eq!(sel.font, Font::default());
    }

    #[test]
    fn test_rectangle_fill_and_outline() {
        let mut dc = context(10, 10);
        let sel = selection(Pen::new(PenStyle::Solid, 1, BLUE), Brush::solid(RED));
        dc.rectangle(None, &sel, 2, 2, 8, 8);

        // Outline on the bounding box edge, fill inside, nothing outside
        assert_eq!(pixel(&dc, 2, 5), Some(BLUE));
        assert_eq!(pixel(&dc, 7, 5), Some(BLUE));
        assert_eq!(pixel(&dc, 5, 2), Some(BLUE));
        assert_eq!(pixel(&dc, 5, 7), Some(BLUE));
        assert_eq!(pixel(&dc, 4, 4), Some(RED));
        assert_eq!(pixel(&dc, 1, 5), None);
        assert_eq!(pixel(&dc, 8, 5), None);
    }

    #[test]
    fn test_rectangle_null_pen() {
        let mut dc = context(10, 10);
        let sel = selection(Pen::new(PenStyle::Null, 1, BLUE), Brush::solid(RED));
        dc.rectangle(None, &sel, 2, 2, 8, 8);
        assert_eq!(pixel(&dc, 2, 5), Some(RED));
        assert_eq!(pixel(&dc, 7, 7), Some(RED));
        assert_eq!(pixel(&dc, 8, 8), None);
    }

    #[test]
    fn test_rectangle_hatched_brush() {
        let mut dc = context(16, 16);
        let sel = selection(
            Pen::new(PenStyle::Null, 1, Color::BLACK),
            Brush::hatched(HatchStyle::Horizontal, BLUE),
        );
        dc.rectangle(None, &sel, 0, 0, 16, 16);

        // The tile line sits on row 4 of every 8-row band
        assert_eq!(pixel(&dc, 3, 4), Some(BLUE));
        assert_eq!(pixel(&dc, 3, 12), Some(BLUE));
        assert_eq!(pixel(&dc, 3, 5), None);
    }

    #[test]
    fn test_unpatterned_hatch_fills_flat() {
        let mut dc = context(8, 8);
        let sel = selection(
            Pen::new(PenStyle::Null, 1, Color::BLACK),
            Brush::hatched(HatchStyle::Dense2, BLUE),
        );
        dc.rectangle(None, &sel, 0, 0, 8, 8);
        assert_eq!(pixel(&dc, 3, 3), Some(BLUE));
    }

    #[test]
    fn test_ellipse_fills_centre_not_corners() {
        let mut dc = context(20, 20);
        let sel = selection(Pen::new(PenStyle::Solid, 1, BLUE), Brush::solid(RED));
        dc.ellipse(None, &sel, 0, 0, 20, 20);
        assert_eq!(pixel(&dc, 10, 10), Some(RED));
        assert_eq!(pixel(&dc, 0, 0), None);
        assert_eq!(pixel(&dc, 19, 19), None);
    }

    #[test]
    fn test_line_to_moves_position() {
        let mut dc = context(10, 10);
        let sel = selection(Pen::new(PenStyle::Solid, 1, RED), Brush::default());
        dc.move_to(0, 5);
        dc.line_to(None, &sel, 9, 5);
        assert_eq!(dc.state().current_pos(), Point::new(9, 5));
        assert_eq!(pixel(&dc, 4, 5), Some(RED));
        assert_eq!(pixel(&dc, 4, 4), None);
        assert_eq!(pixel(&dc, 4, 6), None);
    }

    #[test]
    fn test_dashed_line_has_gaps() {
        let mut dc = context(40, 3);
        let sel = selection(Pen::new(PenStyle::Dash, 1, RED), Brush::default());
        dc.move_to(0, 1);
        dc.line_to(None, &sel, 40, 1);
        let drawn = (0..40).filter(|&x| pixel(&dc, x, 1).is_some()).count();
        assert!(drawn > 10 && drawn < 30, "drawn {drawn}");
    }

    #[test]
    fn test_null_pen_line_draws_nothing() {
        let mut dc = context(10, 10);
        let sel = selection(Pen::new(PenStyle::Null, 1, RED), Brush::default());
        dc.line_to(None, &sel, 9, 9);
        assert!(dc.private_surface().data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rop_black_and_not() {
        let mut dc = context(6, 6);
        let fill = selection(Pen::new(PenStyle::Null, 1, RED), Brush::solid(Color::rgb(0x12, 0x34, 0x56)));
        dc.rectangle(None, &fill, 0, 0, 6, 6);

        dc.set_rop2(RasterOp::Not);
        let box_sel = selection(Pen::new(PenStyle::Null, 1, RED), Brush::solid(RED));
        dc.rectangle(None, &box_sel, 0, 0, 3, 6);
        assert_eq!(pixel(&dc, 1, 1), Some(Color::rgb(0xED, 0xCB, 0xA9)));
        assert_eq!(pixel(&dc, 4, 1), Some(Color::rgb(0x12, 0x34, 0x56)));

        dc.set_rop2(RasterOp::Black);
        dc.rectangle(None, &box_sel, 3, 0, 6, 6);
        assert_eq!(pixel(&dc, 4, 1), Some(Color::BLACK));
    }

    #[test]
    fn test_polygon_fill_modes() {
        // Self-overlapping square traced twice: winding fills, alternate cancels
        let square = [
            Point::new(1, 1),
            Point::new(9, 1),
            Point::new(9, 9),
            Point::new(1, 9),
            Point::new(1, 1),
            Point::new(9, 1),
            Point::new(9, 9),
            Point::new(1, 9),
        ];
        let sel = selection(Pen::new(PenStyle::Null, 1, RED), Brush::solid(RED));

        let mut dc = context(10, 10);
        dc.polygon(None, &sel, &square);
        assert_eq!(pixel(&dc, 5, 5), Some(RED));

        let mut dc = context(10, 10);
        dc.set_poly_fill_mode(PolyFillMode::Alternate);
        dc.polygon(None, &sel, &square);
        assert_eq!(pixel(&dc, 5, 5), None);
    }

    #[test]
    fn test_polyline_keeps_position() {
        let mut dc = context(10, 10);
        let sel = selection(Pen::new(PenStyle::Solid, 1, RED), Brush::default());
        dc.move_to(7, 7);
        dc.polyline(None, &sel, &[Point::new(0, 2), Point::new(9, 2)]);
        assert_eq!(dc.state().current_pos(), Point::new(7, 7));
        assert_eq!(pixel(&dc, 5, 2), Some(RED));
    }

    #[test]
    fn test_set_pixel_maps_origin() {
        let mut dc = context(10, 10);
        dc.set_window_org(5, 5);
        assert_eq!(dc.set_pixel(None, 6, 7, RED), RED);
        assert_eq!(pixel(&dc, 1, 2), Some(RED));

        // Off-surface writes are clipped silently
        dc.set_pixel(None, -100, -100, RED);
    }

    #[test]
    fn test_text_out_opaque_background() {
        let mut dc = context(200, 40);
        let sel = selection(Pen::default(), Brush::default());
        dc.set_bk_color(BLUE);
        dc.text_out(None, &sel, 10, 30, "MMMM");

        // Left of the anchor and below the descent stay untouched
        assert_eq!(pixel(&dc, 5, 25), None);
        assert_eq!(pixel(&dc, 15, 39), None);
        let painted = (10..40).any(|x| matches!(pixel(&dc, x, 28), Some(c) if c == BLUE || c == Color::BLACK));
        assert!(painted);
    }

    #[test]
    fn test_text_out_transparent_background() {
        let mut dc = context(100, 40);
        let sel = selection(Pen::default(), Brush::default());
        dc.set_bk_mode(BkMode::Transparent);
        dc.set_bk_color(BLUE);
        dc.text_out(None, &sel, 10, 30, "ab");
        assert!((0..100).all(|x| (0..40).all(|y| pixel(&dc, x, y) != Some(BLUE))));
    }

    #[test]
    fn test_text_align_right_ends_at_anchor() {
        let mut dc = context(100, 40);
        let sel = selection(Pen::default(), Brush::default());
        dc.set_bk_color(BLUE);
        dc.set_text_align(TextAlign::Right);
        dc.text_out(None, &sel, 50, 30, "ab");
        assert_eq!(pixel(&dc, 55, 28), None);
    }

    #[test]
    fn test_draw_bitmap_into_selected_target() {
        let mut dc = context(4, 4);
        let mut target = Bitmap::new(4, 4).unwrap();
        let mut source = Bitmap::new(1, 1).unwrap();
        source.set_pixel(0, 0, RED);

        dc.draw_bitmap(Some(&mut target), &source, 2, 2, None, RasterOp::CopyPen);
        assert_eq!(target.pixel(2, 2), Some(RED));
        assert_eq!(pixel(&dc, 2, 2), None);
    }

    #[test]
    fn test_save_restore() {
        let mut dc = context(4, 4);
        assert_eq!(dc.save_dc(), 1);
        dc.set_text_color(RED);
        assert_eq!(dc.save_dc(), 2);
        dc.set_text_color(BLUE);

        let restored = dc.restore_dc(1).unwrap();
        assert_eq!(restored.text_color(), Color::BLACK);
        assert_eq!(dc.save_depth(), 0);
    }
}
