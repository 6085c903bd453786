//! Byte-level builder for synthetic CD+G packet streams.

/// Size of one subcode packet.
pub const PACKET_SIZE: usize = 24;
/// Command byte marking graphics packets.
pub const GRAPHICS: u8 = 0x09;

/// Horizontal/vertical scroll command nibble: no movement.
pub const SCROLL_NONE: u8 = 0;
/// Scroll right (horizontal) or down (vertical).
pub const SCROLL_FORWARD: u8 = 1;
/// Scroll left (horizontal) or up (vertical).
pub const SCROLL_BACKWARD: u8 = 2;

/// Appends hand-assembled packets. Colors are 4-bit channel values.
#[derive(Clone, Debug, Default)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one raw packet; parity bytes are filled with a marker pattern.
    pub fn packet(&mut self, command: u8, instruction: u8, data: [u8; 16]) -> &mut Self {
        self.bytes.push(command);
        self.bytes.push(instruction);
        self.bytes.extend_from_slice(&[0xA5, 0x5A]);
        self.bytes.extend_from_slice(&data);
        self.bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        self
    }

    pub fn memory_preset(&mut self, color: u8, repeat: u8) -> &mut Self {
        self.packet(GRAPHICS, 1, data_with(&[color, repeat]))
    }

    pub fn border_preset(&mut self, color: u8) -> &mut Self {
        self.packet(GRAPHICS, 2, data_with(&[color]))
    }

    pub fn tile_block(
        &mut self,
        row: u8,
        column: u8,
        color0: u8,
        color1: u8,
        bits: [u8; 12],
    ) -> &mut Self {
        self.packet(GRAPHICS, 6, tile_data(row, column, color0, color1, bits))
    }

    pub fn tile_block_xor(
        &mut self,
        row: u8,
        column: u8,
        color0: u8,
        color1: u8,
        bits: [u8; 12],
    ) -> &mut Self {
        self.packet(GRAPHICS, 38, tile_data(row, column, color0, color1, bits))
    }

    pub fn scroll_preset(
        &mut self,
        color: u8,
        h_cmd: u8,
        h_offset: u8,
        v_cmd: u8,
        v_offset: u8,
    ) -> &mut Self {
        let data = scroll_data(color, h_cmd, h_offset, v_cmd, v_offset);
        self.packet(GRAPHICS, 20, data)
    }

    pub fn scroll_copy(&mut self, h_cmd: u8, h_offset: u8, v_cmd: u8, v_offset: u8) -> &mut Self {
        let data = scroll_data(0, h_cmd, h_offset, v_cmd, v_offset);
        self.packet(GRAPHICS, 24, data)
    }

    pub fn define_transparent(&mut self) -> &mut Self {
        self.packet(GRAPHICS, 28, [0u8; 16])
    }

    /// Loads palette entries 0..8 from 4-bit `[r, g, b]` triples.
    pub fn load_colors_low(&mut self, colors: [[u8; 3]; 8]) -> &mut Self {
        self.packet(GRAPHICS, 30, color_data(colors))
    }

    /// Loads palette entries 8..16 from 4-bit `[r, g, b]` triples.
    pub fn load_colors_high(&mut self, colors: [[u8; 3]; 8]) -> &mut Self {
        self.packet(GRAPHICS, 31, color_data(colors))
    }

    /// Appends `count` packets of non-graphics subchannel data.
    pub fn idle(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.packet(0x00, 0x00, [0u8; 16]);
        }
        self
    }

    /// Appends raw bytes, e.g. a truncated trailing record.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn packet_count(&self) -> usize {
        self.bytes.len() / PACKET_SIZE
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

fn data_with(prefix: &[u8]) -> [u8; 16] {
    let mut data = [0u8; 16];
    data[..prefix.len()].copy_from_slice(prefix);
    data
}

fn tile_data(row: u8, column: u8, color0: u8, color1: u8, bits: [u8; 12]) -> [u8; 16] {
    let mut data = data_with(&[color0, color1, row, column]);
    data[4..].copy_from_slice(&bits);
    data
}

fn scroll_data(color: u8, h_cmd: u8, h_offset: u8, v_cmd: u8, v_offset: u8) -> [u8; 16] {
    let h = ((h_cmd & 0x03) << 4) | (h_offset & 0x07);
    let v = ((v_cmd & 0x03) << 4) | (v_offset & 0x0F);
    data_with(&[color, h, v])
}

fn color_data(colors: [[u8; 3]; 8]) -> [u8; 16] {
    let mut data = [0u8; 16];
    for (pair, [r, g, b]) in data.chunks_exact_mut(2).zip(colors) {
        pair[0] = ((r & 0x0F) << 2) | ((g & 0x0F) >> 2);
        pair[1] = ((g & 0x03) << 4) | (b & 0x0F);
    }
    data
}
