//! Instruction decoding: turns a [`Packet`] into a typed [`Command`].
//!
//! Decoding is pure. Applying a command is the canvas' job; keeping the two
//! apart lets tooling list what a stream does without mutating anything.

use crate::packet::Packet;

/// Fill the whole canvas with one color.
pub const INSTR_MEMORY_PRESET: u8 = 1;
/// Fill the border bands with one color.
pub const INSTR_BORDER_PRESET: u8 = 2;
/// Draw a 6x12 tile, replacing pixels.
pub const INSTR_TILE_BLOCK: u8 = 6;
/// Scroll, filling vacated pixels with a flat color.
pub const INSTR_SCROLL_PRESET: u8 = 20;
/// Scroll, wrapping scrolled-off pixels around.
pub const INSTR_SCROLL_COPY: u8 = 24;
/// Reserved; decoded but never changes the canvas.
pub const INSTR_DEFINE_TRANSPARENT: u8 = 28;
/// Load palette entries 0..8.
pub const INSTR_LOAD_COLORS_LOW: u8 = 30;
/// Load palette entries 8..16.
pub const INSTR_LOAD_COLORS_HIGH: u8 = 31;
/// Draw a 6x12 tile, XOR-ing into existing pixels.
pub const INSTR_TILE_BLOCK_XOR: u8 = 38;

/// Pixel rows per tile.
pub const TILE_HEIGHT: usize = 12;
/// Pixel columns per tile.
pub const TILE_WIDTH: usize = 6;

/// 24-bit palette color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from 4-bit channels, scaling each to 0..=255.
    pub const fn from_nibbles(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: (r & 0x0F) * 17,
            g: (g & 0x0F) * 17,
            b: (b & 0x0F) * 17,
        }
    }

    #[inline]
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// How a tile's colors combine with the existing pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileOp {
    Replace,
    Xor,
}

/// What fills the pixels a scroll vacates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollFill {
    /// A flat palette index.
    Preset,
    /// The pixels that scrolled off the opposite edge.
    Copy,
}

/// Horizontal scroll step (one tile, 6 px).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HScroll {
    None,
    Right,
    Left,
}

/// Vertical scroll step (one tile, 12 px).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VScroll {
    None,
    Down,
    Up,
}

/// Palette half targeted by a color-load command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorBank {
    Low,
    High,
}

impl ColorBank {
    /// First palette index written by this bank.
    #[inline]
    pub fn base(self) -> usize {
        match self {
            ColorBank::Low => 0,
            ColorBank::High => 8,
        }
    }
}

/// A decoded CD+G graphics instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    MemoryPreset {
        color: u8,
        /// Non-zero when the authoring tool resent an identical preset.
        repeat: u8,
    },
    BorderPreset {
        color: u8,
    },
    TileBlock {
        op: TileOp,
        color0: u8,
        color1: u8,
        /// Tile row (0..18 addresses the canvas).
        row: u8,
        /// Tile column (0..50 addresses the canvas).
        column: u8,
        /// One bitmask per pixel row; bit 5 is the leftmost pixel.
        bits: [u8; TILE_HEIGHT],
    },
    Scroll {
        fill: ScrollFill,
        color: u8,
        h: HScroll,
        /// Sub-tile horizontal offset, 0..=5.
        h_offset: u8,
        v: VScroll,
        /// Sub-tile vertical offset, 0..=11.
        v_offset: u8,
    },
    DefineTransparent,
    LoadColors {
        bank: ColorBank,
        colors: [Rgb; 8],
    },
}

impl Command {
    /// Decodes a packet. Non-graphics packets and unknown instructions yield `None`.
    pub fn decode(packet: &Packet) -> Option<Self> {
        if !packet.is_graphics() {
            return None;
        }
        let data = &packet.data;
        let command = match packet.instruction_code() {
            INSTR_MEMORY_PRESET => Command::MemoryPreset {
                color: data[0] & 0x0F,
                repeat: data[1] & 0x0F,
            },
            INSTR_BORDER_PRESET => Command::BorderPreset {
                color: data[0] & 0x0F,
            },
            INSTR_TILE_BLOCK => decode_tile(data, TileOp::Replace),
            INSTR_TILE_BLOCK_XOR => decode_tile(data, TileOp::Xor),
            INSTR_SCROLL_PRESET => decode_scroll(data, ScrollFill::Preset),
            INSTR_SCROLL_COPY => decode_scroll(data, ScrollFill::Copy),
            INSTR_DEFINE_TRANSPARENT => Command::DefineTransparent,
            INSTR_LOAD_COLORS_LOW => decode_colors(data, ColorBank::Low),
            INSTR_LOAD_COLORS_HIGH => decode_colors(data, ColorBank::High),
            _ => return None,
        };
        Some(command)
    }
}

fn decode_tile(data: &[u8; 16], op: TileOp) -> Command {
    let mut bits = [0u8; TILE_HEIGHT];
    bits.copy_from_slice(&data[4..4 + TILE_HEIGHT]);
    Command::TileBlock {
        op,
        color0: data[0] & 0x0F,
        color1: data[1] & 0x0F,
        row: data[2] & 0x1F,
        column: data[3] & 0x3F,
        bits,
    }
}

fn decode_scroll(data: &[u8; 16], fill: ScrollFill) -> Command {
    let h_scroll = data[1] & 0x3F;
    let v_scroll = data[2] & 0x3F;
    let h = match (h_scroll >> 4) & 0x03 {
        1 => HScroll::Right,
        2 => HScroll::Left,
        _ => HScroll::None,
    };
    let v = match (v_scroll >> 4) & 0x03 {
        1 => VScroll::Down,
        2 => VScroll::Up,
        _ => VScroll::None,
    };
    Command::Scroll {
        fill,
        color: data[0] & 0x0F,
        h,
        h_offset: h_scroll & 0x07,
        v,
        v_offset: v_scroll & 0x0F,
    }
}

fn decode_colors(data: &[u8; 16], bank: ColorBank) -> Command {
    let mut colors = [Rgb::BLACK; 8];
    for (color, pair) in colors.iter_mut().zip(data.chunks_exact(2)) {
        *color = unpack_color(pair[0], pair[1]);
    }
    Command::LoadColors { bank, colors }
}

/// Unpacks one 12-bit color spread over two 6-bit symbols.
///
/// `hi`: `--RRRRGG`, `lo`: `--GGBBBB`.
pub fn unpack_color(hi: u8, lo: u8) -> Rgb {
    let r = (hi >> 2) & 0x0F;
    let g = ((hi & 0x03) << 2) | ((lo >> 4) & 0x03);
    let b = lo & 0x0F;
    Rgb::from_nibbles(r, g, b)
}

/// Packs 4-bit channels into the two-symbol wire form read by [`unpack_color`].
pub fn pack_color(r: u8, g: u8, b: u8) -> [u8; 2] {
    let hi = ((r & 0x0F) << 2) | ((g & 0x0F) >> 2);
    let lo = ((g & 0x03) << 4) | (b & 0x0F);
    [hi, lo]
}
