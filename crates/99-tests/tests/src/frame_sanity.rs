//! Packaged frame sanity: cropping, palette trailer and RGBA expansion.

use cdg_core::{CdgReader, ReaderConfig};
use cdg_frame::{
    expand_rgba, palette_entry, pixels, CDG_IMAGE_HEIGHT, CDG_IMAGE_SIZE, CDG_IMAGE_WIDTH,
    PIXEL_PLANE_SIZE,
};
use testdata::StreamBuilder;

fn last_frame(bytes: Vec<u8>) -> Vec<u8> {
    let mut reader = CdgReader::from_bytes(bytes, ReaderConfig::default());
    let mut frame = None;
    while reader.move_to_next_frame() {
        frame = Some(reader.current_frame().to_vec());
    }
    frame.expect("stream has a frame")
}

#[test]
fn visible_window_crops_border() {
    // Tile (1, 1) is the first fully visible tile.
    let mut b = StreamBuilder::new();
    b.memory_preset(3, 0)
        .border_preset(5)
        .tile_block(1, 1, 0, 9, [0x3F; 12])
        .idle(10);
    let mut reader = CdgReader::from_bytes(b.build(), ReaderConfig::default());
    while reader.move_to_next_frame() {}
    let mut frame = vec![0u8; CDG_IMAGE_SIZE];
    assert!(reader.canvas().snapshot_into(&mut frame));

    let px = pixels(&frame).expect("pixel plane");
    assert_eq!(px.len(), PIXEL_PLANE_SIZE);
    // Top-left 6x12 of the window is the tile.
    for y in 0..12 {
        for x in 0..6 {
            assert_eq!(px[y * CDG_IMAGE_WIDTH + x], 9, "tile pixel ({x}, {y})");
        }
    }
    assert_eq!(px[6], 3);

    // The bottom band is 14 rows deep, so its top two rows reach into the window.
    let (body, bottom) = px.split_at((CDG_IMAGE_HEIGHT - 2) * CDG_IMAGE_WIDTH);
    assert!(body.iter().all(|&p| p != 5));
    assert!(bottom.iter().all(|&p| p == 5));
}

#[test]
fn rgba_expansion_follows_palette() {
    let mut b = StreamBuilder::new();
    let mut colors = [[0u8; 3]; 8];
    colors[2] = [15, 8, 1];
    colors[4] = [0, 15, 0];
    b.load_colors_low(colors)
        .memory_preset(2, 0)
        .tile_block(3, 3, 2, 4, [0b10_0000; 12])
        .idle(10);
    let frame = last_frame(b.build());
    assert_eq!(frame.len(), CDG_IMAGE_SIZE);
    assert_eq!(palette_entry(&frame, 2), Some([255, 136, 17]));

    let mut rgba = vec![0u8; PIXEL_PLANE_SIZE * 4];
    assert!(expand_rgba(&frame, &mut rgba));
    assert!(rgba.chunks_exact(4).all(|px| px[3] == 0xFF));

    // Tile (3, 3) starts at window pixel (12, 24); its first column is color1.
    let at = (24 * CDG_IMAGE_WIDTH + 12) * 4;
    assert_eq!(&rgba[at..at + 8], &[0, 255, 0, 255, 255, 136, 17, 255]);

    let px = pixels(&frame).expect("pixel plane");
    for (rgba_px, &index) in rgba.chunks_exact(4).zip(px).step_by(97) {
        let rgb = palette_entry(&frame, usize::from(index)).expect("palette entry");
        assert_eq!(&rgba_px[..3], &rgb);
    }
}

#[test]
fn expansion_rejects_short_buffers() {
    let frame = vec![0u8; CDG_IMAGE_SIZE];
    let mut rgba = vec![0u8; PIXEL_PLANE_SIZE * 4 - 1];
    assert!(!expand_rgba(&frame, &mut rgba));

    let mut rgba = vec![0u8; PIXEL_PLANE_SIZE * 4];
    assert!(!expand_rgba(&frame[..CDG_IMAGE_SIZE - 1], &mut rgba));
}
