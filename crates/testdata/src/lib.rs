//! Synthetic CD+G streams for decoder development and CI.
//!
//! Fixtures are assembled in code by [`StreamBuilder`] and cached on first
//! use, so tests across crates share identical bytes without vendoring
//! binary files.

mod builder;

pub use builder::{
    StreamBuilder, GRAPHICS, PACKET_SIZE, SCROLL_BACKWARD, SCROLL_FORWARD, SCROLL_NONE,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use sha2::{Digest, Sha256};

/// Name of the two-packet preset + tile fixture.
pub const SINGLE_TILE: &str = "single-tile";
/// Name of the lyric-style demo fixture.
pub const DEMO: &str = "demo";
/// Name of the fixture with no graphics packets at all.
pub const SILENT: &str = "silent";
/// Name of the palette-only fixture.
pub const PALETTE: &str = "palette";

/// Describes one generated fixture.
#[derive(Debug, Clone, Copy)]
pub struct FixtureMeta {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> StreamBuilder,
}

static FIXTURES: &[FixtureMeta] = &[
    FixtureMeta {
        name: SINGLE_TILE,
        description: "memory preset to color 1 followed by one solid tile at (0, 0)",
        build: single_tile,
    },
    FixtureMeta {
        name: DEMO,
        description: "palette, border, four lyric lines, XOR highlight and scrolls",
        build: demo,
    },
    FixtureMeta {
        name: SILENT,
        description: "non-graphics subchannel data with a truncated trailing record",
        build: silent,
    },
    FixtureMeta {
        name: PALETTE,
        description: "palette loads only, including a redundant reload",
        build: palette,
    },
];

static CACHE: Lazy<HashMap<&'static str, OnceCell<Arc<[u8]>>>> =
    Lazy::new(|| FIXTURES.iter().map(|meta| (meta.name, OnceCell::new())).collect());

/// Returns metadata for every fixture.
pub fn list() -> &'static [FixtureMeta] {
    FIXTURES
}

/// Looks up fixture metadata by name.
pub fn metadata(name: &str) -> Option<&'static FixtureMeta> {
    FIXTURES.iter().find(|meta| meta.name == name)
}

/// Returns the bytes of fixture `name`, building them on first use.
pub fn bytes(name: &str) -> Arc<[u8]> {
    let meta = metadata(name).unwrap_or_else(|| panic!("unknown fixture {name}"));
    CACHE[meta.name]
        .get_or_init(|| Arc::from((meta.build)().build().into_boxed_slice()))
        .clone()
}

/// Hex-encoded SHA-256 of `bytes`, used to compare frames across decodes.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Writes `bytes` to a per-process file under the system temp directory.
pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("cdg-testdata-{}-{name}.cdg", std::process::id()));
    std::fs::write(&path, bytes)
        .unwrap_or_else(|err| panic!("failed to write fixture {path:?}: {err}"));
    path
}

fn single_tile() -> StreamBuilder {
    let mut b = StreamBuilder::new();
    b.memory_preset(1, 0).tile_block(0, 0, 0, 2, [0xFF; 12]);
    b
}

fn silent() -> StreamBuilder {
    let mut b = StreamBuilder::new();
    b.idle(30).raw(&[GRAPHICS, 0x01, 0x00]);
    b
}

fn palette() -> StreamBuilder {
    let mut b = StreamBuilder::new();
    b.load_colors_low(LOW_COLORS)
        .idle(10)
        .load_colors_low(LOW_COLORS)
        .idle(10)
        .load_colors_high(HIGH_COLORS)
        .idle(10);
    b
}

const LOW_COLORS: [[u8; 3]; 8] = [
    [0, 0, 0],
    [15, 15, 15],
    [15, 0, 0],
    [0, 15, 0],
    [0, 0, 15],
    [15, 15, 0],
    [0, 15, 15],
    [15, 0, 15],
];

const HIGH_COLORS: [[u8; 3]; 8] = [
    [8, 8, 8],
    [4, 4, 4],
    [12, 6, 0],
    [0, 6, 12],
    [6, 12, 0],
    [12, 0, 6],
    [3, 9, 12],
    [12, 12, 12],
];

fn glyph(seed: u8) -> [u8; 12] {
    let mut bits = [0u8; 12];
    for (i, row) in bits.iter_mut().enumerate() {
        *row = (seed.wrapping_mul(7).wrapping_add(i as u8 * 13)) & 0x3F;
    }
    bits
}

fn demo() -> StreamBuilder {
    let mut b = StreamBuilder::new();
    b.load_colors_low(LOW_COLORS)
        .load_colors_high(HIGH_COLORS)
        .memory_preset(0, 0)
        .memory_preset(0, 1)
        .memory_preset(0, 2)
        .border_preset(4)
        .idle(20);

    for line in 0..4u8 {
        for column in 0..12u8 {
            b.tile_block(3 + line * 3, 4 + column, 0, 1, glyph(line * 12 + column))
                .idle(2);
        }
        b.idle(40);
    }

    // Sweep a highlight across the first line, then restore it.
    for column in 0..12u8 {
        b.tile_block_xor(3, 4 + column, 0, 3, [0x3F; 12]).idle(8);
    }
    for column in 0..12u8 {
        b.tile_block_xor(3, 4 + column, 0, 3, [0x3F; 12]).idle(1);
    }

    b.define_transparent()
        .idle(10)
        .scroll_copy(SCROLL_NONE, 0, SCROLL_BACKWARD, 0)
        .idle(30)
        .scroll_preset(0, SCROLL_FORWARD, 3, SCROLL_NONE, 5)
        .idle(60)
        .raw(&[GRAPHICS, 0x01, 0x00, 0x00, 0x00]);
    b
}
