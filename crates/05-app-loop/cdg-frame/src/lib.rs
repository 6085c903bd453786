//! Frame packaging utilities for paletted CD+G frames.
//!
//! This crate owns the fixed output layout handed to video consumers. It has
//! no dependency on the decoder and operates purely on byte slices, so a
//! consumer can pre-allocate `CDG_IMAGE_SIZE` bytes per frame.

/// Width of the visible (border-cropped) window in pixels.
pub const CDG_IMAGE_WIDTH: usize = 288;
/// Height of the visible (border-cropped) window in pixels.
pub const CDG_IMAGE_HEIGHT: usize = 192;
/// Number of palette entries carried by each frame.
pub const PALETTE_ENTRIES: usize = 16;
/// Bytes per serialized palette entry.
pub const PALETTE_ENTRY_SIZE: usize = 4;

/// Size of the pixel plane (one palette index per byte).
pub const PIXEL_PLANE_SIZE: usize = CDG_IMAGE_WIDTH * CDG_IMAGE_HEIGHT;
/// Size of the serialized palette trailer.
pub const PALETTE_SIZE: usize = PALETTE_ENTRIES * PALETTE_ENTRY_SIZE;
/// Total size of one packaged frame.
pub const CDG_IMAGE_SIZE: usize = PIXEL_PLANE_SIZE + PALETTE_SIZE;

/// Writes a cropped window of an indexed bitmap plus its palette into `slot`.
///
/// # Layout
/// - Bytes `0..PIXEL_PLANE_SIZE`: 288x192 palette indices, row-major
/// - Bytes `PIXEL_PLANE_SIZE..`: 16 palette entries, each a little-endian
///   `u32` of the form `0xFF_RR_GG_BB` (byte order B, G, R, 0xFF)
///
/// `bitmap` is row-major with `stride` bytes per row; the window starts at
/// `(origin_x, origin_y)`.
///
/// Returns `false` (leaving `slot` untouched) if the slot is too small or
/// the window does not fit inside `bitmap`.
pub fn write_frame(
    slot: &mut [u8],
    bitmap: &[u8],
    stride: usize,
    origin_x: usize,
    origin_y: usize,
    palette: &[[u8; 3]; PALETTE_ENTRIES],
) -> bool {
    if slot.len() < CDG_IMAGE_SIZE {
        return false;
    }
    if origin_x + CDG_IMAGE_WIDTH > stride {
        return false;
    }
    let last_row_end = (origin_y + CDG_IMAGE_HEIGHT) * stride;
    if bitmap.len() < last_row_end {
        return false;
    }

    for (row, dst) in slot[..PIXEL_PLANE_SIZE]
        .chunks_exact_mut(CDG_IMAGE_WIDTH)
        .enumerate()
    {
        let src = (origin_y + row) * stride + origin_x;
        dst.copy_from_slice(&bitmap[src..src + CDG_IMAGE_WIDTH]);
    }

    write_palette(&mut slot[PIXEL_PLANE_SIZE..CDG_IMAGE_SIZE], palette);
    true
}

fn write_palette(out: &mut [u8], palette: &[[u8; 3]; PALETTE_ENTRIES]) {
    for (dst, &[r, g, b]) in out.chunks_exact_mut(PALETTE_ENTRY_SIZE).zip(palette) {
        let argb = 0xFF00_0000u32 | u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b);
        dst.copy_from_slice(&argb.to_le_bytes());
    }
}

/// Returns the pixel plane of a packaged frame.
#[inline]
pub fn pixels(frame: &[u8]) -> Option<&[u8]> {
    frame.get(..PIXEL_PLANE_SIZE)
}

/// Decodes palette entry `idx` of a packaged frame as `[r, g, b]`.
pub fn palette_entry(frame: &[u8], idx: usize) -> Option<[u8; 3]> {
    if idx >= PALETTE_ENTRIES {
        return None;
    }
    let start = PIXEL_PLANE_SIZE + idx * PALETTE_ENTRY_SIZE;
    let raw: [u8; 4] = frame.get(start..start + PALETTE_ENTRY_SIZE)?.try_into().ok()?;
    let argb = u32::from_le_bytes(raw);
    Some([(argb >> 16) as u8, (argb >> 8) as u8, argb as u8])
}

/// Decodes the full palette trailer of a packaged frame.
pub fn decode_palette(frame: &[u8]) -> Option<[[u8; 3]; PALETTE_ENTRIES]> {
    let mut out = [[0u8; 3]; PALETTE_ENTRIES];
    for (idx, entry) in out.iter_mut().enumerate() {
        *entry = palette_entry(frame, idx)?;
    }
    Some(out)
}

/// Expands a packaged frame into RGBA8888 for consumers without paletted input.
///
/// `out` must hold `PIXEL_PLANE_SIZE * 4` bytes. Returns `false` if either
/// buffer is too small.
pub fn expand_rgba(frame: &[u8], out: &mut [u8]) -> bool {
    if out.len() < PIXEL_PLANE_SIZE * 4 {
        return false;
    }
    let (Some(indices), Some(palette)) = (pixels(frame), decode_palette(frame)) else {
        return false;
    };

    for (px, &index) in out.chunks_exact_mut(4).zip(indices) {
        let [r, g, b] = palette[usize::from(index & 0x0F)];
        px[0] = r;
        px[1] = g;
        px[2] = b;
        px[3] = 0xFF;
    }
    true
}
