//! Fixed-layout view over one 24-byte subcode packet.

/// Size of one subcode packet on the wire.
pub const CDG_PACKET_SIZE: usize = 24;
/// Only the low six bits of command and instruction carry meaning.
pub const CDG_MASK: u8 = 0x3F;
/// Command value marking a packet as CD+G graphics.
pub const CDG_COMMAND: u8 = 0x09;
/// Number of payload bytes per packet.
pub const CDG_DATA_SIZE: usize = 16;

const COMMAND_OFFSET: usize = 0;
const INSTRUCTION_OFFSET: usize = 1;
const PARITY_Q_OFFSET: usize = 2;
const DATA_OFFSET: usize = 4;
const PARITY_P_OFFSET: usize = 20;

/// One subcode record extracted field by field from its wire bytes.
///
/// Parity bytes are retained for inspection but never validated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Raw command byte (mask with [`CDG_MASK`] before use).
    pub command: u8,
    /// Raw instruction byte (mask with [`CDG_MASK`] before use).
    pub instruction: u8,
    pub parity_q: [u8; 2],
    /// Instruction payload.
    pub data: [u8; CDG_DATA_SIZE],
    pub parity_p: [u8; 4],
}

impl Packet {
    /// Parses the first [`CDG_PACKET_SIZE`] bytes of `bytes`.
    ///
    /// Returns `None` for a short slice; trailing partial records are
    /// treated as end-of-stream by callers.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let record = bytes.get(..CDG_PACKET_SIZE)?;

        let mut parity_q = [0u8; 2];
        parity_q.copy_from_slice(&record[PARITY_Q_OFFSET..DATA_OFFSET]);
        let mut data = [0u8; CDG_DATA_SIZE];
        data.copy_from_slice(&record[DATA_OFFSET..PARITY_P_OFFSET]);
        let mut parity_p = [0u8; 4];
        parity_p.copy_from_slice(&record[PARITY_P_OFFSET..CDG_PACKET_SIZE]);

        Some(Self {
            command: record[COMMAND_OFFSET],
            instruction: record[INSTRUCTION_OFFSET],
            parity_q,
            data,
            parity_p,
        })
    }

    /// Returns whether the packet carries CD+G graphics.
    #[inline]
    pub fn is_graphics(&self) -> bool {
        self.command & CDG_MASK == CDG_COMMAND
    }

    /// Masked instruction code.
    #[inline]
    pub fn instruction_code(&self) -> u8 {
        self.instruction & CDG_MASK
    }
}

/// Number of complete packets contained in a stream of `len` bytes.
#[inline]
pub fn packet_count(len: usize) -> usize {
    len / CDG_PACKET_SIZE
}

/// Returns packet `idx` of `stream`, or `None` past the last complete record.
#[inline]
pub fn packet_at(stream: &[u8], idx: usize) -> Option<Packet> {
    let start = idx.checked_mul(CDG_PACKET_SIZE)?;
    Packet::parse(stream.get(start..)?)
}
