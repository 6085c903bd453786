//! Concurrent pull path vs. control path on a shared source.

use cdg_frame::{CDG_IMAGE_SIZE, PIXEL_PLANE_SIZE};
use cdg_source::{
    frame_channel, CdgSource, ChannelSink, FrameSink, PullOutcome, SinkEvent, SinkPush,
    SourceConfig, VideoBuffer,
};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    done()
}

#[test]
fn pull_and_control_threads_interleave_safely() {
    init_logging();
    let (source, queue) = CdgSource::with_channel(SourceConfig::default());
    let source = Arc::new(source);
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let source = Arc::clone(&source);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                match source.need_data() {
                    PullOutcome::Pushed => {}
                    PullOutcome::Disconnected => {
                        assert!(stop.load(Ordering::Acquire), "queue dropped while running");
                        break;
                    }
                    _ => thread::yield_now(),
                }
            }
        })
    };

    let consumer = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut frames = 0usize;
            while !stop.load(Ordering::Acquire) {
                match queue.recv_timeout(Duration::from_millis(1)) {
                    Some(SinkEvent::Frame(frame)) => {
                        assert_eq!(frame.data.len(), CDG_IMAGE_SIZE);
                        let pixels = &frame.data[..PIXEL_PLANE_SIZE];
                        assert!(pixels.iter().all(|&px| px < 16));
                        frames += 1;
                    }
                    Some(SinkEvent::EndOfStream) | None => {}
                }
            }
            frames
        })
    };

    let demo = testdata::bytes(testdata::DEMO);
    let palette = testdata::bytes(testdata::PALETTE);
    for step in 0..200 {
        match step % 5 {
            0 => source.load_bytes(demo.clone()),
            1 => {
                source.seek_data(500);
            }
            2 => source.reset(),
            3 => source.load_bytes(palette.clone()),
            _ => source.enough_data(),
        }
        if step % 16 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    source.load_bytes(testdata::bytes(testdata::SINGLE_TILE));
    let reached_end = wait_for(Duration::from_secs(5), || {
        source.stats().eos && source.sink().is_empty()
    });

    stop.store(true, Ordering::Release);
    producer.join().expect("producer thread");
    let frames = consumer.join().expect("consumer thread");

    assert!(reached_end, "final stream never reached end of stream");
    assert!(frames > 0);
    assert!(source.stats().frames_pushed as usize >= frames);
}

/// Sink that blocks inside `push` until released, to hold a pull in flight.
struct GateSink {
    inner: ChannelSink,
    entered: Sender<()>,
    release: crossbeam_channel::Receiver<()>,
    finished: AtomicBool,
}

impl FrameSink for GateSink {
    fn push(&self, buffer: VideoBuffer) -> SinkPush {
        let _ = self.entered.try_send(());
        let _ = self.release.recv_timeout(Duration::from_secs(5));
        let result = self.inner.push(buffer);
        self.finished.store(true, Ordering::Release);
        result
    }

    fn end_of_stream(&self) {
        self.inner.end_of_stream();
    }

    fn flush(&self) -> usize {
        self.inner.flush()
    }
}

#[test]
fn reset_during_pull_waits_then_yields_no_data() {
    init_logging();
    let (inner, queue) = frame_channel(4);
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let source = Arc::new(CdgSource::new(
        GateSink {
            inner,
            entered: entered_tx,
            release: release_rx,
            finished: AtomicBool::new(false),
        },
        SourceConfig::default(),
    ));
    source.load_bytes(testdata::bytes(testdata::DEMO));

    let puller = {
        let source = Arc::clone(&source);
        thread::spawn(move || source.need_data())
    };
    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("pull reached the sink");

    let order = Arc::new(Mutex::new(Vec::new()));
    let resetter = {
        let source = Arc::clone(&source);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            source.reset();
            order.lock().push(("reset", source.sink().finished.load(Ordering::Acquire)));
        })
    };

    thread::sleep(Duration::from_millis(20));
    assert!(order.lock().is_empty(), "reset must wait for the in-flight pull");
    release_tx.send(()).expect("release sink");

    assert_eq!(puller.join().expect("puller"), PullOutcome::Pushed);
    resetter.join().expect("resetter");
    assert_eq!(order.lock().as_slice(), &[("reset", true)]);

    assert!(!source.is_loaded());
    assert!(queue.is_empty(), "reset flushed the delivered frame");
    assert_eq!(source.need_data(), PullOutcome::NoData);
}
