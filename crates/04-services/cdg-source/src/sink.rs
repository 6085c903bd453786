use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One packaged frame with its presentation timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoBuffer {
    /// `CDG_IMAGE_SIZE` bytes: cropped pixel plane followed by the palette.
    pub data: Arc<[u8]>,
    pub pts_ms: u64,
    pub duration_ms: u64,
}

impl VideoBuffer {
    /// Palette indices of the visible window.
    pub fn pixels(&self) -> Option<&[u8]> {
        cdg_frame::pixels(&self.data)
    }

    pub fn palette(&self) -> Option<[[u8; 3]; cdg_frame::PALETTE_ENTRIES]> {
        cdg_frame::decode_palette(&self.data)
    }
}

/// Result of offering a buffer to a [`FrameSink`].
#[derive(Debug)]
pub enum SinkPush {
    Ok,
    /// The sink is full; the buffer is handed back so it can be retried.
    WouldBlock(VideoBuffer),
    Disconnected,
}

/// Downstream consumer of decoded frames.
///
/// Sinks are called with the source lock held. A sink may call back into the
/// same source from within `push` on the calling thread (for example to seek);
/// it must not block waiting for another thread that needs the source.
pub trait FrameSink: Send + Sync {
    fn push(&self, buffer: VideoBuffer) -> SinkPush;

    /// Signals that no further frames follow until the next seek or load.
    fn end_of_stream(&self);

    /// Discards queued frames after a discontinuity. Returns how many were dropped.
    fn flush(&self) -> usize {
        0
    }
}

/// Event observed by the consumer side of a [`ChannelSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Frame(VideoBuffer),
    EndOfStream,
}

/// Bounded channel sink; the consumer reads from the paired [`FrameQueue`].
pub struct ChannelSink {
    tx: Sender<VideoBuffer>,
    stale: Receiver<VideoBuffer>,
    eos: Arc<AtomicBool>,
}

/// Consumer end of a [`ChannelSink`].
pub struct FrameQueue {
    rx: Receiver<VideoBuffer>,
    eos: Arc<AtomicBool>,
}

/// Creates a sink/queue pair holding at most `depth` frames.
pub fn frame_channel(depth: usize) -> (ChannelSink, FrameQueue) {
    let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
    let eos = Arc::new(AtomicBool::new(false));
    (
        ChannelSink {
            tx,
            stale: rx.clone(),
            eos: Arc::clone(&eos),
        },
        FrameQueue { rx, eos },
    )
}

impl FrameSink for ChannelSink {
    fn push(&self, buffer: VideoBuffer) -> SinkPush {
        // `stale` keeps the channel open, so a dropped queue is detected here.
        if Arc::strong_count(&self.eos) < 2 {
            return SinkPush::Disconnected;
        }
        match self.tx.try_send(buffer) {
            Ok(()) => SinkPush::Ok,
            Err(TrySendError::Full(buffer)) => SinkPush::WouldBlock(buffer),
            Err(TrySendError::Disconnected(_)) => SinkPush::Disconnected,
        }
    }

    fn end_of_stream(&self) {
        self.eos.store(true, Ordering::Release);
    }

    fn flush(&self) -> usize {
        self.eos.store(false, Ordering::Release);
        self.stale.try_iter().count()
    }
}

impl ChannelSink {
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl FrameQueue {
    /// Takes up to `max` events without blocking.
    ///
    /// End of stream is reported once, after every queued frame was taken.
    pub fn drain(&self, max: usize) -> SmallVec<[SinkEvent; 8]> {
        let mut out = SmallVec::<[SinkEvent; 8]>::new();
        while out.len() < max {
            match self.rx.try_recv() {
                Ok(buffer) => out.push(SinkEvent::Frame(buffer)),
                Err(_) => {
                    if self.eos.swap(false, Ordering::AcqRel) {
                        out.push(SinkEvent::EndOfStream);
                    }
                    break;
                }
            }
        }
        out
    }

    /// Waits up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SinkEvent> {
        if let Ok(buffer) = self.rx.try_recv() {
            return Some(SinkEvent::Frame(buffer));
        }
        if self.eos.swap(false, Ordering::AcqRel) {
            return Some(SinkEvent::EndOfStream);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(buffer) => Some(SinkEvent::Frame(buffer)),
            Err(RecvTimeoutError::Timeout) => self
                .eos
                .swap(false, Ordering::AcqRel)
                .then_some(SinkEvent::EndOfStream),
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
