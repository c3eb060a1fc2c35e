// Drawing session
//
// The session is the handle-based surface of the engine: it owns the object
// table and every device context, hands out `ObjectId`s and `DcId`s, and
// resolves handles before delegating to `DeviceContext`. All operations are
// synchronous; a session is not meant to be shared between threads without
// external locking.

use super::bitmap::Bitmap;
use super::color::Color;
use super::device_context::{Defaults, DeviceContext, Selection};
use super::dib::IndexedLayout;
use super::objects::{
    Brush, BrushStyle, Font, GdiObject, HatchStyle, ObjectId, ObjectKind, ObjectTable, Pen,
    PenStyle,
};
use super::rop::RasterOp;
use super::state::{DcState, Point};
use crate::common::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Device context handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DcId(pub u32);

impl fmt::Display for DcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dc#{}", self.0)
    }
}

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Width of the private surface of a context created without a reference.
    pub default_width: u32,
    /// Height of the private surface of a context created without a reference.
    pub default_height: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
        }
    }
}

/// Predefined objects shared by every context of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum StockObject {
    WhiteBrush = 0,
    LtGrayBrush = 1,
    GrayBrush = 2,
    DkGrayBrush = 3,
    BlackBrush = 4,
    NullBrush = 5,
    WhitePen = 6,
    BlackPen = 7,
    NullPen = 8,
    SystemFont = 13,
}

impl StockObject {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::WhiteBrush),
            1 => Some(Self::LtGrayBrush),
            2 => Some(Self::GrayBrush),
            3 => Some(Self::DkGrayBrush),
            4 => Some(Self::BlackBrush),
            5 => Some(Self::NullBrush),
            6 => Some(Self::WhitePen),
            7 => Some(Self::BlackPen),
            8 => Some(Self::NullPen),
            13 => Some(Self::SystemFont),
            _ => None,
        }
    }

    fn object(self) -> GdiObject {
        let gray = |level| GdiObject::Brush(Brush::solid(Color::rgb(level, level, level)));
        match self {
            Self::WhiteBrush => GdiObject::Brush(Brush::solid(Color::WHITE)),
            Self::LtGrayBrush => gray(0xC0),
            Self::GrayBrush => gray(0x80),
            Self::DkGrayBrush => gray(0x40),
            Self::BlackBrush => GdiObject::Brush(Brush::solid(Color::BLACK)),
            Self::NullBrush => GdiObject::Brush(Brush::null()),
            Self::WhitePen => GdiObject::Pen(Pen::new(PenStyle::Solid, 1, Color::WHITE)),
            Self::BlackPen => GdiObject::Pen(Pen::default()),
            Self::NullPen => GdiObject::Pen(Pen::new(PenStyle::Null, 1, Color::BLACK)),
            Self::SystemFont => GdiObject::Font(Font::new("System", 16, Font::BOLD)),
        }
    }
}

/// Owner of all device contexts and GDI objects
#[derive(Debug)]
pub struct GdiSession {
    objects: ObjectTable,
    contexts: HashMap<DcId, DeviceContext>,
    stock: HashMap<StockObject, ObjectId>,
    next_dc: u32,
    options: SessionOptions,
    frames: u64,
}

impl Default for GdiSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GdiSession {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        Self {
            objects: ObjectTable::new(),
            contexts: HashMap::new(),
            stock: HashMap::new(),
            next_dc: 1,
            options,
            frames: 0,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    // Device contexts

    /// Create a context with a private surface.
    ///
    /// The surface matches the reference context's private surface, or the
    /// configured default size without one.
    pub fn create_dc(&mut self, reference: Option<DcId>) -> Result<DcId> {
        let (width, height) = match reference {
            Some(hdc) => {
                let surface = self.dc(hdc)?.private_surface();
                (surface.width(), surface.height())
            },
            None => (self.options.default_width, self.options.default_height),
        };
        let surface = Bitmap::new(width, height)?;

        let hdc = DcId(self.next_dc);
        self.next_dc = self.next_dc.checked_add(1).ok_or(Error::HandlesExhausted)?;
        let defaults = Defaults {
            pen: self.objects.create_stock(GdiObject::Pen(Pen::default()))?,
            brush: self.objects.create_stock(GdiObject::Brush(Brush::default()))?,
            font: self.objects.create_stock(GdiObject::Font(Font::default()))?,
        };
        self.contexts.insert(hdc, DeviceContext::new(surface, defaults));
        log::debug!("created {} with {}x{} surface", hdc, width, height);
        Ok(hdc)
    }

    /// Delete a context together with its fallback objects.
    pub fn delete_dc(&mut self, hdc: DcId) -> Result<()> {
        let dc = self.contexts.remove(&hdc).ok_or(Error::InvalidDc(hdc))?;
        let defaults = dc.defaults();
        for id in [defaults.pen, defaults.brush, defaults.font] {
            self.release_everywhere(id);
            self.objects.remove(id);
        }
        log::debug!("deleted {}", hdc);
        Ok(())
    }

    pub fn dc(&self, hdc: DcId) -> Result<&DeviceContext> {
        self.contexts.get(&hdc).ok_or(Error::InvalidDc(hdc))
    }

    /// Mutable access for the state setters.
    pub fn dc_mut(&mut self, hdc: DcId) -> Result<&mut DeviceContext> {
        self.contexts.get_mut(&hdc).ok_or(Error::InvalidDc(hdc))
    }

    pub fn dc_count(&self) -> usize {
        self.contexts.len()
    }

    /// Surface a context currently draws to.
    pub fn surface(&self, hdc: DcId) -> Result<&Bitmap> {
        let dc = self.dc(hdc)?;
        Ok(dc
            .state()
            .bitmap()
            .and_then(|id| self.objects.bitmap(id))
            .unwrap_or(dc.private_surface()))
    }

    // Objects

    pub fn create_pen(&mut self, style: PenStyle, width: u32, color: Color) -> Result<ObjectId> {
        self.objects.create(GdiObject::Pen(Pen::new(style, width, color)))
    }

    pub fn create_brush(&mut self, style: BrushStyle, color: Color, hatch: HatchStyle) -> Result<ObjectId> {
        self.objects.create(GdiObject::Brush(Brush::new(style, color, hatch)))
    }

    pub fn create_font(&mut self, font: Font) -> Result<ObjectId> {
        self.objects.create(GdiObject::Font(font))
    }

    pub fn create_bitmap(&mut self, width: u32, height: u32) -> Result<ObjectId> {
        let bitmap = Bitmap::new(width, height)?;
        self.objects.create(GdiObject::Bitmap(bitmap))
    }

    /// Bitmap for use with `hdc`. Every surface shares one pixel format, so
    /// this only checks the handle.
    pub fn create_compatible_bitmap(&mut self, hdc: DcId, width: u32, height: u32) -> Result<ObjectId> {
        self.dc(hdc)?;
        self.create_bitmap(width, height)
    }

    /// Register an already built bitmap.
    pub fn add_bitmap(&mut self, bitmap: Bitmap) -> Result<ObjectId> {
        self.objects.create(GdiObject::Bitmap(bitmap))
    }

    pub fn decode_bitmap(&mut self, bytes: &[u8]) -> Result<ObjectId> {
        let bitmap = Bitmap::decode(bytes)?;
        self.add_bitmap(bitmap)
    }

    pub fn bitmap_from_indexed(&mut self, info: &[u8], bits: &[u8], layout: &IndexedLayout) -> Result<ObjectId> {
        let bitmap = Bitmap::from_indexed(info, bits, layout)?;
        self.add_bitmap(bitmap)
    }

    pub fn bitmap(&self, id: ObjectId) -> Option<&Bitmap> {
        self.objects.bitmap(id)
    }

    /// Handle of a predefined object, created on first request.
    pub fn stock_object(&mut self, stock: StockObject) -> Result<ObjectId> {
        if let Some(&id) = self.stock.get(&stock) {
            return Ok(id);
        }
        let id = self.objects.create_stock(stock.object())?;
        self.stock.insert(stock, id);
        Ok(id)
    }

    pub fn mark_stock(&mut self, id: ObjectId) -> bool {
        self.objects.mark_stock(id)
    }

    pub fn is_stock(&self, id: ObjectId) -> bool {
        self.objects.is_stock(id)
    }

    /// Select an object into a context, returning the handle it replaces.
    ///
    /// For bitmaps the previous handle is `None` while the context drew to
    /// its private surface.
    pub fn select_object(&mut self, hdc: DcId, id: ObjectId) -> Result<Option<ObjectId>> {
        let kind = self.objects.kind(id).ok_or(Error::InvalidHandle(id))?;
        let dc = self.contexts.get_mut(&hdc).ok_or(Error::InvalidDc(hdc))?;
        let previous = dc.select(kind, id);
        log::debug!("{} selected {:?} {} (was {:?})", hdc, kind, id, previous);
        Ok(previous)
    }

    /// Select an object named together with its wire kind tag.
    ///
    /// Fails with `UnsupportedResource` when the tag is unknown or names a
    /// different kind than the object has.
    pub fn select_tagged(&mut self, hdc: DcId, tag: u8, id: ObjectId) -> Result<Option<ObjectId>> {
        let kind = ObjectKind::try_from(tag)?;
        let actual = self.objects.kind(id).ok_or(Error::InvalidHandle(id))?;
        if actual != kind {
            log::warn!("{} tagged as {:?} but is a {:?}", id, kind, actual);
            return Err(Error::UnsupportedResource(tag));
        }
        self.select_object(hdc, id)
    }

    /// Swap `id` out of a context for the context's default. No-op when it
    /// is not selected there.
    pub fn release_object(&mut self, hdc: DcId, id: ObjectId) -> Result<bool> {
        let released = self.dc_mut(hdc)?.release(id);
        if released {
            log::debug!("{} released {}", hdc, id);
        }
        Ok(released)
    }

    /// Delete an object, deselecting it from every context first.
    ///
    /// Stock and unknown objects are left alone and report `false`.
    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        if !self.objects.exists(id) {
            log::debug!("delete of unknown object {}", id);
            return false;
        }
        if self.objects.is_stock(id) {
            log::debug!("ignoring delete of stock object {}", id);
            return false;
        }
        self.release_everywhere(id);
        self.objects.remove(id);
        log::debug!("deleted object {}", id);
        true
    }

    fn release_everywhere(&mut self, id: ObjectId) {
        for dc in self.contexts.values_mut() {
            dc.release(id);
        }
    }

    // State

    pub fn get_dc_state(&self, hdc: DcId) -> Result<DcState> {
        Ok(*self.dc(hdc)?.state())
    }

    /// Restore a captured state.
    ///
    /// Selections that no longer name an object of the right kind fall back
    /// to the context's defaults.
    pub fn set_dc_state(&mut self, hdc: DcId, state: DcState) -> Result<()> {
        let dc = self.contexts.get_mut(&hdc).ok_or(Error::InvalidDc(hdc))?;
        let state = Self::sanitize(&self.objects, dc.defaults(), state);
        dc.set_state(state);
        Ok(())
    }

    fn sanitize(objects: &ObjectTable, defaults: Defaults, mut state: DcState) -> DcState {
        let check = |slot: &mut ObjectId, kind: ObjectKind, fallback: ObjectId| {
            if objects.kind(*slot) != Some(kind) {
                log::warn!("stale {:?} handle {} in restored state", kind, slot);
                *slot = fallback;
            }
        };
        check(&mut state.pen, ObjectKind::Pen, defaults.pen);
        check(&mut state.brush, ObjectKind::Brush, defaults.brush);
        check(&mut state.font, ObjectKind::Font, defaults.font);
        if let Some(id) = state.bitmap {
            if objects.kind(id) != Some(ObjectKind::Bitmap) {
                log::warn!("stale bitmap handle {} in restored state", id);
                state.bitmap = None;
            }
        }
        state
    }

    pub fn save_dc(&mut self, hdc: DcId) -> Result<i32> {
        Ok(self.dc_mut(hdc)?.save_dc())
    }

    /// Pop back to a SaveDC level; negative levels count back from the top.
    pub fn restore_dc(&mut self, hdc: DcId, level: i32) -> Result<bool> {
        match self.dc_mut(hdc)?.restore_dc(level) {
            Some(state) => {
                self.set_dc_state(hdc, state)?;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    // Drawing

    /// Run a primitive with the context's selection and bound surface.
    fn with_dc<T>(
        &mut self,
        hdc: DcId,
        f: impl FnOnce(&mut DeviceContext, Option<&mut Bitmap>, &Selection) -> T,
    ) -> Result<T> {
        let dc = self.contexts.get_mut(&hdc).ok_or(Error::InvalidDc(hdc))?;
        let selection = Selection::resolve(&self.objects, dc.state());
        let target = match dc.state().bitmap() {
            Some(id) => self.objects.bitmap_mut(id),
            None => None,
        };
        Ok(f(dc, target, &selection))
    }

    pub fn move_to(&mut self, hdc: DcId, x: i32, y: i32) -> Result<Point> {
        Ok(self.dc_mut(hdc)?.move_to(x, y))
    }

    pub fn line_to(&mut self, hdc: DcId, x: i32, y: i32) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.line_to(target, sel, x, y))
    }

    pub fn rectangle(&mut self, hdc: DcId, left: i32, top: i32, right: i32, bottom: i32) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.rectangle(target, sel, left, top, right, bottom))
    }

    pub fn ellipse(&mut self, hdc: DcId, left: i32, top: i32, right: i32, bottom: i32) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.ellipse(target, sel, left, top, right, bottom))
    }

    pub fn polygon(&mut self, hdc: DcId, points: &[Point]) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.polygon(target, sel, points))
    }

    pub fn polyline(&mut self, hdc: DcId, points: &[Point]) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.polyline(target, sel, points))
    }

    pub fn text_out(&mut self, hdc: DcId, x: i32, y: i32, text: &str) -> Result<()> {
        self.with_dc(hdc, |dc, target, sel| dc.text_out(target, sel, x, y, text))
    }

    pub fn set_pixel(&mut self, hdc: DcId, x: i32, y: i32, color: Color) -> Result<Color> {
        self.with_dc(hdc, |dc, target, _| dc.set_pixel(target, x, y, color))
    }

    pub fn get_pixel(&self, hdc: DcId, x: i32, y: i32) -> Result<Option<Color>> {
        let p = self.dc(hdc)?.state().to_device(Point::new(x, y));
        Ok(self.surface(hdc)?.pixel(p.x, p.y))
    }

    fn extent(width: i32, height: i32) -> Option<(u32, u32)> {
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// Copy a block 1:1 from `src` under `rop`.
    ///
    /// The block is clipped to both surfaces before anything is copied. The
    /// context's own raster op is untouched. `src` may be `hdc` itself.
    #[allow(clippy::too_many_arguments)]
    pub fn bit_blt(
        &mut self,
        hdc: DcId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        src: DcId,
        src_x: i32,
        src_y: i32,
        rop: RasterOp,
    ) -> Result<()> {
        let to = self.dc(hdc)?.state().to_device(Point::new(x, y));
        let from = self.dc(src)?.state().to_device(Point::new(src_x, src_y));
        let Some((w, h)) = Self::extent(width, height) else {
            return Ok(());
        };
        let source = self.surface(src)?;
        let dest = self.surface(hdc)?;
        let clip = |from: i32, to: i32, len: u32, src_limit: u32, dest_limit: u32| {
            let (skip, len) = clip_span(i64::from(from), len, src_limit)?;
            let (more, len) = clip_span(i64::from(to) + i64::from(skip), len, dest_limit)?;
            Some((skip + more, len))
        };
        let (Some((dx, cw)), Some((dy, ch))) = (
            clip(from.x, to.x, w, source.width(), dest.width()),
            clip(from.y, to.y, h, source.height(), dest.height()),
        ) else {
            log::trace!("bitblt {}x{} from {} falls outside the surfaces", w, h, src);
            return Ok(());
        };

        let block = source.region(offset(from.x, dx), offset(from.y, dy), cw, ch)?;
        let at = Point::new(offset(to.x, dx), offset(to.y, dy));
        self.with_dc(hdc, |dc, target, _| dc.blit(target, &block, at, None, rop))
    }

    /// Copy a block from `src`, scaling it to the destination size.
    ///
    /// Only the part of the source block that lies on the source surface is
    /// copied; it lands on the matching share of the destination box.
    #[allow(clippy::too_many_arguments)]
    pub fn stretch_blt(
        &mut self,
        hdc: DcId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        src: DcId,
        src_x: i32,
        src_y: i32,
        src_width: i32,
        src_height: i32,
        rop: RasterOp,
    ) -> Result<()> {
        let to = self.dc(hdc)?.state().to_device(Point::new(x, y));
        let from = self.dc(src)?.state().to_device(Point::new(src_x, src_y));
        let (Some((dw, dh)), Some((sw, sh))) =
            (Self::extent(width, height), Self::extent(src_width, src_height))
        else {
            return Ok(());
        };
        let source = self.surface(src)?;
        let (Some((sx, cw)), Some((sy, ch))) = (
            clip_span(i64::from(from.x), sw, source.width()),
            clip_span(i64::from(from.y), sh, source.height()),
        ) else {
            log::trace!("stretchblt {}x{} from {} falls outside the source", sw, sh, src);
            return Ok(());
        };

        let (ax, aw) = scale_span(to.x, sx, cw, sw, dw);
        let (ay, ah) = scale_span(to.y, sy, ch, sh, dh);
        if aw == 0 || ah == 0 {
            return Ok(());
        }
        let block = source.region(offset(from.x, sx), offset(from.y, sy), cw, ch)?;
        let at = Point::new(ax, ay);
        self.with_dc(hdc, |dc, target, _| dc.blit(target, &block, at, Some((aw, ah)), rop))
    }

    /// Draw a bitmap object into a context under the context's raster op.
    pub fn draw_bitmap(&mut self, hdc: DcId, bitmap: ObjectId, x: i32, y: i32, size: Option<(u32, u32)>) -> Result<()> {
        let source = self.objects.bitmap(bitmap).cloned().ok_or(Error::InvalidHandle(bitmap))?;
        self.with_dc(hdc, |dc, target, _| {
            let rop = dc.state().raster_op();
            dc.draw_bitmap(target, &source, x, y, size, rop)
        })
    }

    /// Decode indexed pixels straight into a context at (x, y).
    pub fn set_dibits(
        &mut self,
        hdc: DcId,
        x: i32,
        y: i32,
        info: &[u8],
        bits: &[u8],
        layout: &IndexedLayout,
    ) -> Result<()> {
        self.dc(hdc)?;
        let source = Bitmap::from_indexed(info, bits, layout)?;
        self.with_dc(hdc, |dc, target, _| {
            dc.draw_bitmap(target, &source, x, y, None, RasterOp::CopyPen)
        })
    }

    // Export

    pub fn export_png(&self, hdc: DcId) -> Result<Vec<u8>> {
        self.surface(hdc)?.encode_png()
    }

    /// Premultiplied RGBA bytes of the bound surface.
    pub fn export_raw(&self, hdc: DcId) -> Result<Vec<u8>> {
        Ok(self.surface(hdc)?.data().to_vec())
    }

    pub fn to_data_url(&self, hdc: DcId) -> Result<String> {
        self.surface(hdc)?.to_data_url()
    }

    /// Mark the end of a frame, returning the number of frames so far.
    pub fn frame_end(&mut self) -> u64 {
        self.frames += 1;
        log::debug!("frame {} complete", self.frames);
        self.frames
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Overlap of `start..start + len` with `0..limit`, as the distance from
/// `start` to the overlap and the overlap length.
fn clip_span(start: i64, len: u32, limit: u32) -> Option<(u32, u32)> {
    let lo = start.max(0);
    let hi = (start + i64::from(len)).min(i64::from(limit));
    (hi > lo).then(|| ((lo - start) as u32, (hi - lo) as u32))
}

/// Destination share of the source span `skip..skip + len` when `src_len`
/// pixels are stretched over `dest_len` pixels starting at `start`.
fn scale_span(start: i32, skip: u32, len: u32, src_len: u32, dest_len: u32) -> (i32, u32) {
    let at = |n: u32| (u64::from(n) * u64::from(dest_len) + u64::from(src_len) / 2) / u64::from(src_len);
    let lo = at(skip);
    let hi = at(skip + len);
    (saturate(i64::from(start) + lo as i64), (hi - lo) as u32)
}

/// `base + skip` for a clipped span; the sum always lands on a surface.
fn offset(base: i32, skip: u32) -> i32 {
    saturate(i64::from(base) + i64::from(skip))
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
