//! `Video`: four framebuffers, a palette, and the polygon pipeline wired
//! together (spec §4.7).

use thiserror::Error;

use crate::numeric::Point;
use crate::video::framebuffer::{DrawOperation, Framebuffer, BUFFER_SIZE, HEIGHT, WIDTH};
use crate::video::palette::{Palette, PaletteError, Rgba};
use crate::video::polygon::{Polygon, PolygonError};
use crate::video::rasterizer::{self, RasterizerError};

pub const BUFFER_COUNT: usize = 4;

/// Symbolic buffer identifiers understood wherever a bytecode operand names
/// a buffer (spec §4.7).
pub const FRONT_BUFFER_ID: u8 = 0xFE;
pub const BACK_BUFFER_ID: u8 = 0xFF;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("polygon error")]
    Polygon(PolygonError),
    #[error("rasterizer error")]
    Rasterizer(RasterizerError),
    #[error("palette error")]
    Palette(PaletteError),
    #[error("bitmap data length {got} does not match expected {expected}")]
    InvalidBitmapSize { got: usize, expected: usize },
    #[error("no palette has been selected yet")]
    PaletteNotSelected,
}

impl From<PolygonError> for VideoError {
    fn from(value: PolygonError) -> Self {
        VideoError::Polygon(value)
    }
}

impl From<RasterizerError> for VideoError {
    fn from(value: RasterizerError) -> Self {
        VideoError::Rasterizer(value)
    }
}

impl From<PaletteError> for VideoError {
    fn from(value: PaletteError) -> Self {
        VideoError::Palette(value)
    }
}

/// Resolves a raw draw color byte into the three drawing modes the
/// rasterizer understands: `0..15` solid, `0x10` same-buffer highlight,
/// anything else copies from buffer 0 (spec §4.7; mirrors the original
/// engine's color-byte convention).
fn operation_for_color(color: u8) -> DrawKind {
    if color < 0x10 {
        DrawKind::Solid(color)
    } else if color == 0x10 {
        DrawKind::Highlight
    } else {
        DrawKind::Mask
    }
}

#[derive(Debug, Clone, Copy)]
enum DrawKind {
    Solid(u8),
    Highlight,
    Mask,
}

pub struct Video {
    buffers: [Framebuffer; BUFFER_COUNT],
    palette: Palette,
    palette_selected: bool,
    front: u8,
    back: u8,
    target: u8,
}

impl Default for Video {
    fn default() -> Self {
        Video {
            buffers: Default::default(),
            palette: Palette::default(),
            palette_selected: false,
            front: 2,
            back: 1,
            target: 2,
        }
    }
}

impl Video {
    fn resolve(&self, id: u8) -> usize {
        match id {
            FRONT_BUFFER_ID => self.front as usize,
            BACK_BUFFER_ID => self.back as usize,
            n if (n as usize) < BUFFER_COUNT => n as usize,
            _ => 0,
        }
    }

    pub fn select_target_buffer(&mut self, id: u8) {
        self.target = id;
    }

    /// Resolves a raw id (a concrete buffer index or the `front`/`back`
    /// sentinel) to the physical buffer index it currently names, for
    /// reporting which buffer a mutation actually touched.
    pub fn resolve_buffer(&self, id: u8) -> u8 {
        self.resolve(id) as u8
    }

    /// The physical buffer index `draw_polygon` writes into right now.
    pub fn target_buffer(&self) -> u8 {
        self.resolve_buffer(self.target)
    }

    pub fn fill_buffer(&mut self, id: u8, color: u8) {
        let index = self.resolve(id);
        self.buffers[index].fill(color);
    }

    pub fn copy_buffer(&mut self, src_id: u8, dst_id: u8, y: i16) {
        let src = self.resolve(src_id);
        let dst = self.resolve(dst_id);
        if src == dst {
            return;
        }
        let (lower, higher, src_is_lower) = if src < dst { (src, dst, true) } else { (dst, src, false) };
        let (left, right) = self.buffers.split_at_mut(higher);
        let (src_buf, dst_buf) = if src_is_lower {
            (&left[lower], &mut right[0])
        } else {
            (&right[0], &mut left[lower])
        };
        dst_buf.copy_with_vertical_offset(src_buf, y);
    }

    pub fn select_palette(&mut self, resource: &[u8], palette_id: u8) -> Result<(), VideoError> {
        self.palette.select(resource, palette_id)?;
        self.palette_selected = true;
        Ok(())
    }

    /// Draws one polygon read from `bank` at `address` (already the raw
    /// operand, not yet doubled) into the currently selected target buffer
    /// (spec §4.7).
    pub fn draw_polygon(
        &mut self,
        bank: &[u8],
        address: u16,
        origin: Point,
        scale: u16,
        color: u8,
    ) -> Result<(), VideoError> {
        let offset = address as usize * 2;
        let polygon = Polygon::read(&mut &bank[offset..], origin, scale)?;
        let target = self.resolve(self.target);

        if polygon.is_dot() {
            let op = match operation_for_color(color) {
                DrawKind::Solid(c) => DrawOperation::SolidColor(c),
                DrawKind::Highlight => DrawOperation::Highlight,
                DrawKind::Mask => {
                    let mask = self.buffers[0].clone();
                    self.buffers[target].set_point(polygon.origin().x, polygon.origin().y, DrawOperation::Mask(&mask));
                    return Ok(());
                }
            };
            self.buffers[target].set_point(polygon.origin().x, polygon.origin().y, op);
            return Ok(());
        }

        match operation_for_color(color) {
            DrawKind::Solid(c) => {
                rasterizer::fill_trapezoids(&mut self.buffers[target], &polygon.points, DrawOperation::SolidColor(c))?
            }
            DrawKind::Highlight => {
                rasterizer::fill_trapezoids(&mut self.buffers[target], &polygon.points, DrawOperation::Highlight)?
            }
            DrawKind::Mask => {
                let mask = self.buffers[0].clone();
                rasterizer::fill_trapezoids(&mut self.buffers[target], &polygon.points, DrawOperation::Mask(&mask))?
            }
        }
        Ok(())
    }

    /// Reassembles a planar 4-bit bitmap into buffer 0 (spec §4.7, §6).
    pub fn load_bitmap(&mut self, data: &[u8]) -> Result<(), VideoError> {
        let expected = WIDTH * HEIGHT / 2;
        if data.len() != expected {
            return Err(VideoError::InvalidBitmapSize {
                got: data.len(),
                expected,
            });
        }
        let bytes_per_row = WIDTH / 8;
        let plane_size = HEIGHT * bytes_per_row;
        let mut out = [0u8; BUFFER_SIZE];
        for row in 0..HEIGHT {
            for col in 0..bytes_per_row {
                let mut planes = [
                    data[row * bytes_per_row + col + plane_size * 3],
                    data[row * bytes_per_row + col + plane_size * 2],
                    data[row * bytes_per_row + col + plane_size],
                    data[row * bytes_per_row + col],
                ];
                for byte in 0..4 {
                    let mut acc = 0u8;
                    for bit in 0..8 {
                        acc <<= 1;
                        acc |= (planes[bit & 3] & 0x80 != 0) as u8;
                        planes[bit & 3] <<= 1;
                    }
                    out[row * bytes_per_row + col + byte] = acc;
                }
            }
        }
        self.buffers[0] = Framebuffer::from_bytes(out);
        Ok(())
    }

    /// Swaps `front`/`back` if `id` names `back`, sets `front` directly for
    /// a concrete id, or leaves it alone for `front` (spec §4.7). Returns
    /// the buffer id now published as front.
    pub fn mark_buffer_ready(&mut self, id: u8) -> u8 {
        match id {
            BACK_BUFFER_ID => std::mem::swap(&mut self.front, &mut self.back),
            FRONT_BUFFER_ID => {}
            n if (n as usize) < BUFFER_COUNT => self.front = n,
            _ => {}
        }
        self.front
    }

    pub fn render_to_rgba(&self, buffer_id: u8, out: &mut [Rgba; WIDTH * HEIGHT]) -> Result<(), VideoError> {
        if !self.palette_selected {
            return Err(VideoError::PaletteNotSelected);
        }
        let index = self.resolve(buffer_id);
        let bytes = self.buffers[index].as_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            out[i * 2] = self.palette.color(byte >> 4);
            out[i * 2 + 1] = self.palette.color(byte & 0x0F);
        }
        Ok(())
    }
}
