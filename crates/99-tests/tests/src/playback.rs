//! Decoder playback across crates: reader timeline, seek and source delivery agree.

use anyhow::{ensure, Context, Result};
use cdg_core::{ms_to_packets, packets_to_ms, CdgReader, ReaderConfig};
use cdg_frame::{pixels, CDG_IMAGE_SIZE, CDG_IMAGE_WIDTH};
use cdg_source::{CdgSource, PullOutcome, SinkEvent, SourceConfig};
use pretty_assertions::assert_eq;
use testdata::{digest, StreamBuilder};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `(pts_ms, duration_ms, digest)` for every frame.
fn timeline(reader: &mut CdgReader) -> Vec<(u64, u64, String)> {
    let mut out = Vec::new();
    while reader.move_to_next_frame() {
        out.push((
            reader.current_frame_position_ms(),
            reader.current_frame_duration_ms(),
            digest(reader.current_frame()),
        ));
    }
    out
}

#[test]
fn source_delivers_reader_timeline() -> Result<()> {
    init_logging();
    let bytes = testdata::bytes(testdata::DEMO);
    let mut reader = CdgReader::from_bytes(bytes.clone(), ReaderConfig::default());
    let expected = timeline(&mut reader);
    ensure!(expected.len() > 10, "demo should span many frames");

    let (source, queue) = CdgSource::with_channel(SourceConfig {
        queue_depth: 4,
        ..SourceConfig::default()
    });
    source.load_bytes(bytes);

    let mut delivered = Vec::new();
    let mut ended = false;
    while !ended {
        match source.need_data() {
            PullOutcome::Pushed | PullOutcome::Backpressure | PullOutcome::EndOfStream => {}
            other => anyhow::bail!("unexpected pull outcome {other:?}"),
        }
        for event in queue.drain(8) {
            match event {
                SinkEvent::Frame(frame) => {
                    delivered.push((frame.pts_ms, frame.duration_ms, digest(&frame.data)))
                }
                SinkEvent::EndOfStream => ended = true,
            }
        }
    }

    assert_eq!(delivered, expected);
    Ok(())
}

#[test]
fn seek_then_read_matches_sequential_read() -> Result<()> {
    init_logging();
    let bytes = testdata::bytes(testdata::DEMO);
    let mut sequential = CdgReader::from_bytes(bytes.clone(), ReaderConfig::default());
    let mut boundaries = Vec::new();
    while sequential.move_to_next_frame() {
        boundaries.push((
            sequential.current_packet_index(),
            digest(sequential.current_frame()),
        ));
    }

    let mut checked = 0;
    for (packet, frame_digest) in boundaries.iter().skip(3) {
        let ms = packets_to_ms(*packet);
        // Some boundaries fall between whole milliseconds.
        if ms_to_packets(ms) != *packet {
            continue;
        }
        let mut reader = CdgReader::from_bytes(bytes.clone(), ReaderConfig::default());
        // Land past the end first so the seek has to rewind.
        while reader.move_to_next_frame() {}
        ensure!(reader.seek(ms), "seek to {ms} ms failed");
        ensure!(reader.move_to_next_frame(), "no frame after seek to {ms} ms");

        assert_eq!(reader.current_packet_index(), *packet);
        assert_eq!(&digest(reader.current_frame()), frame_digest);
        checked += 1;
    }
    ensure!(checked > 0, "no boundary was addressable");
    Ok(())
}

#[test]
fn rate_cap_bounds_frame_count() -> Result<()> {
    init_logging();
    let bytes = testdata::bytes(testdata::DEMO);
    let packets = bytes.len() / testdata::PACKET_SIZE;

    let mut previous = 0;
    for max_fps in [5, 12, 25, 60, 300] {
        let config = ReaderConfig { max_fps };
        let mut reader = CdgReader::from_bytes(bytes.clone(), config);
        let count = timeline(&mut reader).len();
        let bound = packets.div_ceil(config.min_packets()) + 1;
        ensure!(count <= bound, "{count} frames at {max_fps} fps exceeds {bound}");
        ensure!(count >= previous, "raising the cap must not lose frames");
        previous = count;
    }
    Ok(())
}

#[test]
fn two_packet_scenario_end_to_end() -> Result<()> {
    init_logging();
    let path = testdata::write_temp(
        "scenario",
        &StreamBuilder::new()
            .memory_preset(1, 0)
            .tile_block(0, 0, 0, 2, [0xFF; 12])
            .build(),
    );

    let mut reader = CdgReader::open(&path, ReaderConfig::default()).context("open scenario")?;
    assert_eq!(reader.packet_count(), 2);
    assert_eq!(reader.position_of_final_frame_ms(), None);

    let frames = timeline(&mut reader);
    assert_eq!(frames.len(), 1);
    assert_eq!((frames[0].0, frames[0].1), (3, 3));
    assert_eq!(reader.position_of_final_frame_ms(), Some(3));

    let canvas = reader.canvas();
    for y in 0..12 {
        for x in 0..6 {
            assert_eq!(canvas.pixel(x, y), Some(2), "tile pixel ({x}, {y})");
        }
    }
    assert_eq!(canvas.pixel(6, 0), Some(1));
    assert_eq!(canvas.pixel(0, 12), Some(1));

    let mut at_eof = vec![0u8; CDG_IMAGE_SIZE];
    ensure!(canvas.snapshot_into(&mut at_eof), "snapshot at end of stream");
    assert_eq!(frames[0].2, digest(&at_eof));

    std::fs::remove_file(&path).context("remove scenario file")?;
    Ok(())
}

#[test]
fn final_visible_tile_reaches_emitted_frame() -> Result<()> {
    init_logging();
    let path = testdata::write_temp(
        "visible-tile",
        &StreamBuilder::new()
            .memory_preset(1, 0)
            .tile_block(1, 1, 0, 2, [0xFF; 12])
            .build(),
    );

    let mut reader = CdgReader::open(&path, ReaderConfig::default()).context("open stream")?;
    ensure!(reader.move_to_next_frame(), "no frame emitted");
    let px = pixels(reader.current_frame()).context("pixel plane")?;
    for y in 0..12 {
        for x in 0..7 {
            let expected = if x < 6 { 2 } else { 1 };
            assert_eq!(px[y * CDG_IMAGE_WIDTH + x], expected, "window pixel ({x}, {y})");
        }
    }
    assert_eq!(px[12 * CDG_IMAGE_WIDTH], 1);
    assert!(!reader.move_to_next_frame());

    std::fs::remove_file(&path).context("remove stream file")?;
    Ok(())
}

#[test]
fn truncated_and_empty_streams_are_not_errors() {
    init_logging();
    for len in [0usize, 1, 23] {
        let mut reader = CdgReader::from_bytes(vec![0x09u8; len], ReaderConfig::default());
        assert_eq!(reader.packet_count(), 0);
        assert_eq!(reader.total_duration_ms(), 0);
        assert!(!reader.move_to_next_frame());
        assert!(reader.seek(0));
        assert!(!reader.seek(1));
        assert_eq!(reader.position_of_final_frame_ms(), None);
    }
}
