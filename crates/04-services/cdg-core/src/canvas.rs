use crate::command::{
    ColorBank, Command, HScroll, Rgb, ScrollFill, TileOp, VScroll, TILE_HEIGHT, TILE_WIDTH,
};
use cdg_frame::PALETTE_ENTRIES;
use std::fmt;

/// Width of the full logical canvas in pixels.
pub const CDG_FULL_WIDTH: usize = 300;
/// Height of the full logical canvas in pixels.
pub const CDG_FULL_HEIGHT: usize = 216;
/// Tile columns addressable on the canvas.
pub const TILE_COLUMNS: usize = CDG_FULL_WIDTH / TILE_WIDTH;
/// Tile rows addressable on the canvas.
pub const TILE_ROWS: usize = CDG_FULL_HEIGHT / TILE_HEIGHT;
/// Highest valid palette index.
pub const MAX_COLOR: u8 = 15;

/// First visible column before scroll offsets.
pub const VISIBLE_ORIGIN_X: usize = 6;
/// First visible row before scroll offsets.
pub const VISIBLE_ORIGIN_Y: usize = 12;

const BORDER_TOP: usize = 12;
const BORDER_BOTTOM: usize = 14;
const BORDER_SIDE: usize = 6;
const MAX_H_OFFSET: u8 = 5;
const MAX_V_OFFSET: u8 = 11;

/// The previous command as far as the memory-preset dedup rule cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum LastCommand {
    #[default]
    None,
    MemoryPreset {
        color: u8,
    },
}

/// Indexed-color bitmap mutated in place by CD+G commands.
///
/// Every mutator returns whether the visible output changed.
#[derive(Clone, PartialEq, Eq)]
pub struct Canvas {
    pixels: Box<[u8]>,
    palette: [Rgb; PALETTE_ENTRIES],
    h_offset: u8,
    v_offset: u8,
    last: LastCommand,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            pixels: vec![0u8; CDG_FULL_WIDTH * CDG_FULL_HEIGHT].into_boxed_slice(),
            palette: [Rgb::BLACK; PALETTE_ENTRIES],
            h_offset: 0,
            v_offset: 0,
            last: LastCommand::None,
        }
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("palette", &self.palette)
            .field("h_offset", &self.h_offset)
            .field("v_offset", &self.v_offset)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Creates a black canvas with an all-black palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Palette index at logical coordinates, or `None` off-canvas.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= CDG_FULL_WIDTH || y >= CDG_FULL_HEIGHT {
            return None;
        }
        Some(self.pixels[y * CDG_FULL_WIDTH + x])
    }

    /// Full logical bitmap, row-major, `CDG_FULL_WIDTH` bytes per row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn palette(&self) -> &[Rgb; PALETTE_ENTRIES] {
        &self.palette
    }

    /// Current `(horizontal, vertical)` sub-tile scroll offsets.
    pub fn scroll_offsets(&self) -> (u8, u8) {
        (self.h_offset, self.v_offset)
    }

    /// Applies a decoded command.
    pub fn apply(&mut self, command: &Command) -> bool {
        match *command {
            Command::MemoryPreset { color, repeat } => self.memory_preset(color, repeat),
            Command::BorderPreset { color } => self.border_preset(color),
            Command::TileBlock {
                op,
                color0,
                color1,
                row,
                column,
                ref bits,
            } => self.tile_block(op, color0, color1, row, column, bits),
            Command::Scroll {
                fill,
                color,
                h,
                h_offset,
                v,
                v_offset,
            } => self.scroll(fill, color, h, h_offset, v, v_offset),
            Command::DefineTransparent => self.define_transparent(),
            Command::LoadColors { bank, ref colors } => self.load_colors(bank, colors),
        }
    }

    /// Fills the whole canvas with `color`.
    ///
    /// A preset flagged as a repeat that immediately follows a preset of the
    /// same color is a no-op.
    pub fn memory_preset(&mut self, color: u8, repeat: u8) -> bool {
        if color > MAX_COLOR {
            self.last = LastCommand::None;
            return false;
        }
        let previous = std::mem::replace(&mut self.last, LastCommand::MemoryPreset { color });
        if repeat != 0 && previous == (LastCommand::MemoryPreset { color }) {
            return false;
        }
        self.pixels.fill(color);
        true
    }

    /// Fills the top, bottom, left and right border bands with `color`.
    pub fn border_preset(&mut self, color: u8) -> bool {
        self.last = LastCommand::None;
        if color > MAX_COLOR {
            return false;
        }
        for (y, row) in self.pixels.chunks_exact_mut(CDG_FULL_WIDTH).enumerate() {
            if y < BORDER_TOP || y >= CDG_FULL_HEIGHT - BORDER_BOTTOM {
                row.fill(color);
            } else {
                row[..BORDER_SIDE].fill(color);
                row[CDG_FULL_WIDTH - BORDER_SIDE..].fill(color);
            }
        }
        true
    }

    /// Draws (or XORs) one tile. Tiles addressed off-canvas are dropped.
    pub fn tile_block(
        &mut self,
        op: TileOp,
        color0: u8,
        color1: u8,
        row: u8,
        column: u8,
        bits: &[u8; TILE_HEIGHT],
    ) -> bool {
        self.last = LastCommand::None;
        if color0 > MAX_COLOR || color1 > MAX_COLOR {
            return false;
        }
        let (row, column) = (usize::from(row), usize::from(column));
        if row >= TILE_ROWS || column >= TILE_COLUMNS {
            return false;
        }

        let top = row * TILE_HEIGHT;
        let left = column * TILE_WIDTH;
        for (dy, &mask) in bits.iter().enumerate() {
            let start = (top + dy) * CDG_FULL_WIDTH + left;
            let line = &mut self.pixels[start..start + TILE_WIDTH];
            for (dx, px) in line.iter_mut().enumerate() {
                let set = mask & (0x20 >> dx) != 0;
                let color = if set { color1 } else { color0 };
                match op {
                    TileOp::Replace => *px = color,
                    TileOp::Xor => *px ^= color,
                }
            }
        }
        true
    }

    /// Scrolls the canvas by whole tiles and latches the sub-tile offsets.
    pub fn scroll(
        &mut self,
        fill: ScrollFill,
        color: u8,
        h: HScroll,
        h_offset: u8,
        v: VScroll,
        v_offset: u8,
    ) -> bool {
        self.last = LastCommand::None;
        if fill == ScrollFill::Preset && color > MAX_COLOR {
            return false;
        }

        let dx: isize = match h {
            HScroll::None => 0,
            HScroll::Right => TILE_WIDTH as isize,
            HScroll::Left => -(TILE_WIDTH as isize),
        };
        let dy: isize = match v {
            VScroll::None => 0,
            VScroll::Down => TILE_HEIGHT as isize,
            VScroll::Up => -(TILE_HEIGHT as isize),
        };

        if dx != 0 || dy != 0 {
            let src = self.pixels.clone();
            let (w, h) = (CDG_FULL_WIDTH as isize, CDG_FULL_HEIGHT as isize);
            for y in 0..h {
                for x in 0..w {
                    let (sx, sy) = (x - dx, y - dy);
                    let inside = (0..w).contains(&sx) && (0..h).contains(&sy);
                    let value = match (inside, fill) {
                        (true, _) => src[(sy * w + sx) as usize],
                        (false, ScrollFill::Copy) => {
                            src[(sy.rem_euclid(h) * w + sx.rem_euclid(w)) as usize]
                        }
                        (false, ScrollFill::Preset) => color,
                    };
                    self.pixels[(y * w + x) as usize] = value;
                }
            }
        }

        self.h_offset = h_offset.min(MAX_H_OFFSET);
        self.v_offset = v_offset.min(MAX_V_OFFSET);
        true
    }

    /// Reserved instruction; never changes the output.
    pub fn define_transparent(&mut self) -> bool {
        self.last = LastCommand::None;
        false
    }

    /// Loads eight palette entries. Only reports a change if an entry differs.
    pub fn load_colors(&mut self, bank: ColorBank, colors: &[Rgb; 8]) -> bool {
        self.last = LastCommand::None;
        let slots = &mut self.palette[bank.base()..bank.base() + colors.len()];
        let changed = slots.iter().zip(colors).any(|(old, new)| old != new);
        slots.copy_from_slice(colors);
        changed
    }

    /// Packages the visible window into `slot` (see [`cdg_frame::write_frame`]).
    pub fn snapshot_into(&self, slot: &mut [u8]) -> bool {
        let mut palette = [[0u8; 3]; PALETTE_ENTRIES];
        for (dst, color) in palette.iter_mut().zip(&self.palette) {
            *dst = color.to_array();
        }
        cdg_frame::write_frame(
            slot,
            &self.pixels,
            CDG_FULL_WIDTH,
            VISIBLE_ORIGIN_X + usize::from(self.h_offset),
            VISIBLE_ORIGIN_Y + usize::from(self.v_offset),
            &palette,
        )
    }
}
