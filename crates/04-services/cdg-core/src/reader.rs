use crate::canvas::Canvas;
use crate::command::Command;
use crate::error::{CdgError, CdgResult};
use crate::packet::{packet_at, packet_count};
use cdg_frame::CDG_IMAGE_SIZE;
use log::{debug, trace};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Subcode packets per second of playback (75 sectors x 4 packets).
pub const CDG_PACKETS_PER_SECOND: u64 = 300;
/// Default cap on emitted frames per second.
pub const DEFAULT_MAX_FPS: u32 = 60;

/// Converts a packet index to milliseconds.
#[inline]
pub fn packets_to_ms(packets: usize) -> u64 {
    packets as u64 * 1000 / CDG_PACKETS_PER_SECOND
}

/// Converts milliseconds to the packet index playing at that time.
#[inline]
pub fn ms_to_packets(ms: u64) -> usize {
    (ms.saturating_mul(CDG_PACKETS_PER_SECOND) / 1000) as usize
}

/// Reader configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Upper bound on frames emitted per second of stream time (1..=300).
    pub max_fps: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_fps: DEFAULT_MAX_FPS,
        }
    }
}

impl ReaderConfig {
    /// Minimum packets between two emitted frames.
    #[inline]
    pub fn min_packets(&self) -> usize {
        let fps = u64::from(self.max_fps.clamp(1, CDG_PACKETS_PER_SECOND as u32));
        (CDG_PACKETS_PER_SECOND / fps) as usize
    }
}

/// Sequential frame reader over an in-memory CD+G stream.
///
/// Two cursors track progress: `current_pkg_idx` is the boundary at which
/// the current frame was snapshotted, `next_pkg_idx` the next packet to read.
/// Visible changes are coalesced so frames are at least
/// [`ReaderConfig::min_packets`] apart.
pub struct CdgReader {
    stream: Arc<[u8]>,
    packet_count: usize,
    config: ReaderConfig,
    canvas: Canvas,
    frame: Box<[u8]>,
    current_pkg_idx: usize,
    next_pkg_idx: usize,
    last_change_pkg_idx: Option<usize>,
}

impl CdgReader {
    /// Reads the whole file into memory and prepares a reader at packet 0.
    pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> CdgResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CdgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("CdgReader::open path={path:?} bytes={}", bytes.len());
        Ok(Self::from_bytes(bytes, config))
    }

    /// Wraps an in-memory stream. Trailing partial packets are ignored.
    pub fn from_bytes(stream: impl Into<Arc<[u8]>>, config: ReaderConfig) -> Self {
        let stream = stream.into();
        let packet_count = packet_count(stream.len());
        Self {
            stream,
            packet_count,
            config,
            canvas: Canvas::new(),
            frame: vec![0u8; CDG_IMAGE_SIZE].into_boxed_slice(),
            current_pkg_idx: 0,
            next_pkg_idx: 0,
            last_change_pkg_idx: None,
        }
    }

    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    pub fn total_duration_ms(&self) -> u64 {
        packets_to_ms(self.packet_count)
    }

    /// Packaged image of the current frame (`CDG_IMAGE_SIZE` bytes).
    pub fn current_frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn current_frame_position_ms(&self) -> u64 {
        packets_to_ms(self.current_pkg_idx)
    }

    /// Time until the next frame boundary, converted from the packet delta.
    pub fn current_frame_duration_ms(&self) -> u64 {
        packets_to_ms(self.next_pkg_idx - self.current_pkg_idx)
    }

    /// Position of the last visible change, known only once the stream is exhausted.
    pub fn position_of_final_frame_ms(&self) -> Option<u64> {
        if !self.is_eof() {
            return None;
        }
        self.last_change_pkg_idx.map(packets_to_ms)
    }

    pub fn current_packet_index(&self) -> usize {
        self.current_pkg_idx
    }

    pub fn next_packet_index(&self) -> usize {
        self.next_pkg_idx
    }

    pub fn is_eof(&self) -> bool {
        self.next_pkg_idx >= self.packet_count
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Advances to the next frame boundary.
    ///
    /// On success the current frame holds the canvas as of
    /// `current_pkg_idx` and lasts until `next_pkg_idx`. At end of stream
    /// this returns `true` once more if packets remain after the last
    /// snapshot. The frame that reaches end of stream is re-taken from the
    /// canvas there, so the last emitted frame shows the final change.
    pub fn move_to_next_frame(&mut self) -> bool {
        if self.last_change_pkg_idx.is_none() {
            loop {
                if self.is_eof() {
                    return false;
                }
                if self.process_next_packet() {
                    break;
                }
            }
        }

        self.canvas.snapshot_into(&mut self.frame);
        self.current_pkg_idx = self.next_pkg_idx;

        if self.is_eof() {
            trace!("move_to_next_frame: eof at packet {}", self.next_pkg_idx);
            return false;
        }

        let min_packets = self.config.min_packets();
        let mut changed = false;
        loop {
            changed |= self.process_next_packet();
            if self.is_eof() {
                // Trailing frame: show the canvas as it stands at end of stream.
                if changed {
                    self.canvas.snapshot_into(&mut self.frame);
                }
                trace!(
                    "move_to_next_frame: trailing frame [{}, {}) changed={changed}",
                    self.current_pkg_idx,
                    self.next_pkg_idx
                );
                return true;
            }
            if changed && self.next_pkg_idx - self.current_pkg_idx >= min_packets {
                trace!(
                    "move_to_next_frame: frame [{}, {})",
                    self.current_pkg_idx,
                    self.next_pkg_idx
                );
                return true;
            }
        }
    }

    /// Repositions both cursors at `ms` without emitting a frame.
    ///
    /// Seeking backwards replays from packet 0. Returns `false`, leaving all
    /// state untouched, if `ms` lies past the end of the stream. Call
    /// [`move_to_next_frame`](Self::move_to_next_frame) afterwards to obtain
    /// the frame at the new position.
    pub fn seek(&mut self, ms: u64) -> bool {
        let total = self.total_duration_ms();
        if ms > total {
            debug!("CdgReader::seek rejected ms={ms} total_ms={total}");
            return false;
        }

        let target = ms_to_packets(ms).min(self.packet_count);
        if target < self.next_pkg_idx {
            debug!(
                "CdgReader::seek rewinding from packet {} to {target}",
                self.next_pkg_idx
            );
            self.rewind();
        }
        while self.next_pkg_idx < target {
            self.process_next_packet();
        }
        self.current_pkg_idx = self.next_pkg_idx;
        debug!("CdgReader::seek ms={ms} packet={target}");
        true
    }

    /// Restarts decoding from packet 0 with a fresh canvas.
    pub fn rewind(&mut self) {
        self.canvas = Canvas::new();
        self.frame.fill(0);
        self.current_pkg_idx = 0;
        self.next_pkg_idx = 0;
        self.last_change_pkg_idx = None;
    }

    fn process_next_packet(&mut self) -> bool {
        let idx = self.next_pkg_idx;
        let Some(packet) = packet_at(&self.stream, idx) else {
            return false;
        };
        self.next_pkg_idx += 1;

        let changed = Command::decode(&packet)
            .map(|command| self.canvas.apply(&command))
            .unwrap_or(false);
        if changed {
            self.last_change_pkg_idx = Some(idx);
        }
        changed
    }
}
