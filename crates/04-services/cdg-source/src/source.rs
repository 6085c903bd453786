use crate::error::{SourceError, SourceResult};
use crate::sink::{frame_channel, ChannelSink, FrameQueue, FrameSink, SinkPush, VideoBuffer};
use cdg_core::{CdgReader, ReaderConfig};
use log::{debug, trace};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

/// Default number of frames a [`ChannelSink`] can hold.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceConfig {
    pub reader: ReaderConfig,
    pub queue_depth: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Counters for the pull path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_pushed: u64,
    /// Frames discarded by a flush or by a seek/load racing a push.
    pub frames_dropped: u64,
    pub eos: bool,
}

/// Result of one [`CdgSource::need_data`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullOutcome {
    Pushed,
    /// The sink was full; the frame is retained and offered again on the next pull.
    Backpressure,
    /// No frame follows; reported once per position.
    EndOfStream,
    /// Nothing is loaded, or end of stream was already reported.
    NoData,
    Disconnected,
}

struct SourceState {
    reader: Option<CdgReader>,
    paused: bool,
    eos_sent: bool,
    pending: Option<VideoBuffer>,
    generation: u64,
    stats: SourceStats,
}

impl SourceState {
    fn new() -> Self {
        Self {
            reader: None,
            paused: false,
            eos_sent: false,
            pending: None,
            generation: 0,
            stats: SourceStats::default(),
        }
    }

    /// Marks a discontinuity: anything decoded for the old position is stale.
    fn discontinuity(&mut self) {
        if self.pending.take().is_some() {
            self.stats.frames_dropped += 1;
        }
        self.eos_sent = false;
        self.stats.eos = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

enum Next {
    Frame(VideoBuffer, u64),
    EndOfStream,
    Nothing,
}

/// Pull-driven frame source around a [`CdgReader`].
///
/// All decoder state sits behind one reentrant lock shared by the pull path
/// (`need_data`, `pump`) and the control path (`load`, `reset`, `seek_data`).
/// The sink runs with the lock held but without the state borrowed, so it
/// may call back into the source from the same thread.
pub struct CdgSource<S: FrameSink> {
    state: ReentrantMutex<RefCell<SourceState>>,
    sink: S,
    config: SourceConfig,
}

impl CdgSource<ChannelSink> {
    /// Creates a source feeding a bounded channel of `config.queue_depth` frames.
    pub fn with_channel(config: SourceConfig) -> (Self, FrameQueue) {
        let (sink, queue) = frame_channel(config.queue_depth);
        (Self::new(sink, config), queue)
    }
}

impl<S: FrameSink> CdgSource<S> {
    pub fn new(sink: S, config: SourceConfig) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(SourceState::new())),
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Opens `path` and replaces the current stream.
    ///
    /// The file is read before the lock is taken, so a slow load does not
    /// stall the pull path. On error the current stream is kept.
    pub fn load(&self, path: impl AsRef<Path>) -> SourceResult<()> {
        let reader = CdgReader::open(path.as_ref(), self.config.reader)?;
        debug!(
            "CdgSource::load path={:?} packets={}",
            path.as_ref(),
            reader.packet_count()
        );
        self.install(Some(reader));
        Ok(())
    }

    /// Replaces the current stream with an in-memory one.
    pub fn load_bytes(&self, bytes: impl Into<Arc<[u8]>>) {
        let reader = CdgReader::from_bytes(bytes, self.config.reader);
        debug!("CdgSource::load_bytes packets={}", reader.packet_count());
        self.install(Some(reader));
    }

    /// Drops the current stream. Later pulls report [`PullOutcome::NoData`].
    pub fn reset(&self) {
        debug!("CdgSource::reset");
        self.install(None);
    }

    fn install(&self, reader: Option<CdgReader>) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            state.discontinuity();
            state.reader = reader;
            state.paused = false;
        }
        let flushed = self.sink.flush();
        guard.borrow_mut().stats.frames_dropped += flushed as u64;
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().borrow().reader.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().borrow().paused
    }

    pub fn duration_ms(&self) -> Option<u64> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.reader.as_ref().map(CdgReader::total_duration_ms)
    }

    /// Position of the most recently decoded frame.
    pub fn position_ms(&self) -> Option<u64> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .reader
            .as_ref()
            .map(CdgReader::current_frame_position_ms)
    }

    pub fn stats(&self) -> SourceStats {
        self.state.lock().borrow().stats
    }

    /// Decodes the next frame and offers it to the sink. Clears a pause.
    pub fn need_data(&self) -> PullOutcome {
        self.pull(true)
    }

    fn pull(&self, resume: bool) -> PullOutcome {
        let guard = self.state.lock();
        let next = {
            let mut state = guard.borrow_mut();
            if resume {
                state.paused = false;
            }
            Self::next_buffer(&mut state)
        };

        let (buffer, generation) = match next {
            Next::Frame(buffer, generation) => (buffer, generation),
            Next::EndOfStream => {
                debug!("CdgSource::need_data: end of stream");
                self.sink.end_of_stream();
                return PullOutcome::EndOfStream;
            }
            Next::Nothing => return PullOutcome::NoData,
        };

        let pts_ms = buffer.pts_ms;
        let pushed = self.sink.push(buffer);

        let mut state = guard.borrow_mut();
        // A seek or load from inside the sink makes this buffer stale.
        let stale = state.generation != generation;
        match pushed {
            SinkPush::Ok => {
                trace!("CdgSource::need_data: pushed pts_ms={pts_ms}");
                state.stats.frames_pushed += 1;
                PullOutcome::Pushed
            }
            SinkPush::WouldBlock(buffer) => {
                trace!("CdgSource::need_data: sink full, holding pts_ms={pts_ms}");
                if stale {
                    state.stats.frames_dropped += 1;
                } else {
                    state.pending = Some(buffer);
                }
                PullOutcome::Backpressure
            }
            SinkPush::Disconnected => {
                debug!("CdgSource::need_data: sink disconnected");
                state.stats.frames_dropped += 1;
                PullOutcome::Disconnected
            }
        }
    }

    fn next_buffer(state: &mut SourceState) -> Next {
        let generation = state.generation;
        if let Some(buffer) = state.pending.take() {
            return Next::Frame(buffer, generation);
        }
        if state.eos_sent {
            return Next::Nothing;
        }
        let Some(reader) = state.reader.as_mut() else {
            return Next::Nothing;
        };
        if !reader.move_to_next_frame() {
            state.eos_sent = true;
            state.stats.eos = true;
            return Next::EndOfStream;
        }
        let buffer = VideoBuffer {
            data: Arc::from(reader.current_frame()),
            pts_ms: reader.current_frame_position_ms(),
            duration_ms: reader.current_frame_duration_ms(),
        };
        Next::Frame(buffer, generation)
    }

    /// Pauses delivery; [`pump`](Self::pump) pushes nothing until the next `need_data`.
    pub fn enough_data(&self) {
        trace!("CdgSource::enough_data");
        self.state.lock().borrow_mut().paused = true;
    }

    /// Pushes up to `max` frames, stopping early on pause, backpressure or
    /// end of stream. Returns the number of frames pushed.
    pub fn pump(&self, max: usize) -> SourceResult<usize> {
        let _guard = self.state.lock();
        let mut pushed = 0;
        while pushed < max && !self.is_paused() {
            match self.pull(false) {
                PullOutcome::Pushed => pushed += 1,
                PullOutcome::Disconnected => return Err(SourceError::Disconnected),
                PullOutcome::Backpressure | PullOutcome::EndOfStream | PullOutcome::NoData => {
                    break
                }
            }
        }
        Ok(pushed)
    }

    /// Repositions the stream at `ms`. The next pull delivers the frame there.
    ///
    /// Returns `false` if nothing is loaded or `ms` lies past the end.
    pub fn seek_data(&self, ms: u64) -> bool {
        let guard = self.state.lock();
        let sought = {
            let mut state = guard.borrow_mut();
            let Some(reader) = state.reader.as_mut() else {
                debug!("CdgSource::seek_data ms={ms}: nothing loaded");
                return false;
            };
            if !reader.seek(ms) {
                debug!(
                    "CdgSource::seek_data ms={ms}: past end ({} ms)",
                    reader.total_duration_ms()
                );
                return false;
            }
            state.discontinuity();
            true
        };
        let flushed = self.sink.flush();
        guard.borrow_mut().stats.frames_dropped += flushed as u64;
        debug!("CdgSource::seek_data ms={ms} flushed={flushed}");
        sought
    }
}
