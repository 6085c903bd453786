//! Command-line utility for inspecting CD+G subchannel streams.

use anyhow::{bail, Context, Result};
use cdg_core::packet::{packet_at, packet_count};
use cdg_core::{CdgReader, Command as CdgCommand, ReaderConfig, DEFAULT_MAX_FPS};
use cdg_frame::{CDG_IMAGE_HEIGHT, CDG_IMAGE_WIDTH};
use clap::{Parser, Subcommand};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Text rendering helpers used by the CLI commands.
mod render {
    use cdg_core::{Command, HScroll, ScrollFill, TileOp, VScroll};
    use std::fmt::Write;

    /// Summary block for `info`.
    pub fn info(
        path: &str,
        packets: usize,
        graphics: usize,
        duration_ms: u64,
        frames: usize,
        final_ms: Option<u64>,
    ) -> String {
        let mut out = String::new();
        writeln!(out, "File: {path}").expect("write path");
        writeln!(out, "Packets: {packets} ({graphics} graphics)").expect("write packets");
        writeln!(out, "Duration: {duration_ms} ms").expect("write duration");
        writeln!(out, "Frames: {frames}").expect("write frames");
        match final_ms {
            Some(ms) => writeln!(out, "Final change: {ms} ms").expect("write final"),
            None => writeln!(out, "Final change: none").expect("write final"),
        }
        out
    }

    /// One timeline row for `frames`.
    pub fn frame_line(
        index: usize,
        pts_ms: u64,
        duration_ms: u64,
        start: usize,
        end: usize,
    ) -> String {
        format!("#{index:<4} pts={pts_ms:>7}ms dur={duration_ms:>5}ms packets=[{start}, {end})")
    }

    fn h_step(h: HScroll) -> &'static str {
        match h {
            HScroll::None => "0",
            HScroll::Right => "right",
            HScroll::Left => "left",
        }
    }

    fn v_step(v: VScroll) -> &'static str {
        match v {
            VScroll::None => "0",
            VScroll::Down => "down",
            VScroll::Up => "up",
        }
    }

    /// Describes one decoded command.
    pub fn command(command: &Command) -> String {
        match *command {
            Command::MemoryPreset { color, repeat } => {
                format!("memory-preset color={color} repeat={repeat}")
            }
            Command::BorderPreset { color } => format!("border-preset color={color}"),
            Command::TileBlock {
                op,
                color0,
                color1,
                row,
                column,
                ..
            } => {
                let name = match op {
                    TileOp::Replace => "tile",
                    TileOp::Xor => "tile-xor",
                };
                format!("{name} row={row} col={column} colors={color0}/{color1}")
            }
            Command::Scroll {
                fill,
                color,
                h,
                h_offset,
                v,
                v_offset,
            } => {
                let name = match fill {
                    ScrollFill::Preset => "scroll-preset",
                    ScrollFill::Copy => "scroll-copy",
                };
                format!(
                    "{name} color={color} h={}+{h_offset} v={}+{v_offset}",
                    h_step(h),
                    v_step(v)
                )
            }
            Command::DefineTransparent => "define-transparent".to_string(),
            Command::LoadColors { bank, colors } => {
                let mut out = format!("load-colors base={}", bank.base());
                for color in colors {
                    write!(out, " #{:02X}{:02X}{:02X}", color.r, color.g, color.b)
                        .expect("write color");
                }
                out
            }
        }
    }

    /// Palette dump, one entry per line.
    pub fn palette(entries: &[[u8; 3]]) -> String {
        let mut out = String::new();
        for (idx, [r, g, b]) in entries.iter().enumerate() {
            writeln!(out, "{idx:X}: #{r:02X}{g:02X}{b:02X}").expect("write entry");
        }
        out
    }

    /// Renders palette indices as hex digits, sampling every `scale`-th pixel.
    pub fn ascii(pixels: &[u8], width: usize, height: usize, scale: usize) -> String {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        let scale = scale.max(1);
        let mut out = String::new();
        for y in (0..height).step_by(scale) {
            for x in (0..width).step_by(scale) {
                let idx = pixels.get(y * width + x).copied().unwrap_or(0);
                out.push(char::from(DIGITS[usize::from(idx & 0x0F)]));
            }
            out.push('\n');
        }
        out
    }
}

/// Inspect CD+G streams.
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect CD+G subchannel streams", long_about = None)]
struct Cli {
    /// Path to the .cdg file.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Upper bound on emitted frames per second.
    #[arg(long, default_value_t = DEFAULT_MAX_FPS)]
    max_fps: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print packet count, duration and frame statistics.
    Info,
    /// List frame boundaries.
    Frames {
        /// Stop after this many frames.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Decode and list graphics commands.
    Commands {
        /// First packet index.
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Number of packets to scan.
        #[arg(long, default_value_t = 64)]
        count: usize,
    },
    /// Dump the palette of the frame at a position.
    Palette {
        /// Position in milliseconds (suffix `s` for seconds).
        #[arg(long, value_parser = parse_ms, default_value = "0")]
        at: u64,
    },
    /// Render the frame at a position as hex digits.
    Show {
        /// Position in milliseconds (suffix `s` for seconds).
        #[arg(long, value_parser = parse_ms, default_value = "0")]
        at: u64,
        /// Sample every N-th pixel.
        #[arg(long, default_value_t = 4)]
        scale: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = ReaderConfig {
        max_fps: cli.max_fps,
    };
    let bytes = load_stream_bytes(&cli.file)?;
    let mut reader = CdgReader::from_bytes(Arc::clone(&bytes), config);
    debug!(
        "loaded {:?}: {} packets, min {} packets per frame",
        cli.file,
        reader.packet_count(),
        config.min_packets()
    );

    match cli.command {
        Command::Info => handle_info(&cli.file, &bytes, &mut reader),
        Command::Frames { limit } => handle_frames(&mut reader, limit),
        Command::Commands { start, count } => handle_commands(&bytes, start, count),
        Command::Palette { at } => {
            seek_frame(&mut reader, at)?;
            let entries = cdg_frame::decode_palette(reader.current_frame())
                .context("frame has no palette")?;
            print!("{}", render::palette(&entries));
        }
        Command::Show { at, scale } => {
            seek_frame(&mut reader, at)?;
            let pixels = cdg_frame::pixels(reader.current_frame()).context("frame has no pixels")?;
            println!("pts={}ms", reader.current_frame_position_ms());
            print!(
                "{}",
                render::ascii(pixels, CDG_IMAGE_WIDTH, CDG_IMAGE_HEIGHT, scale)
            );
        }
    }

    Ok(())
}

fn load_stream_bytes(path: &Path) -> Result<Arc<[u8]>> {
    let data = fs::read(path).with_context(|| format!("failed to read CD+G stream {path:?}"))?;
    Ok(Arc::from(data.into_boxed_slice()))
}

fn handle_info(path: &Path, bytes: &[u8], reader: &mut CdgReader) {
    let graphics = (0..packet_count(bytes.len()))
        .filter_map(|idx| packet_at(bytes, idx))
        .filter(|packet| packet.is_graphics())
        .count();
    let mut frames = 0;
    while reader.move_to_next_frame() {
        frames += 1;
    }
    print!(
        "{}",
        render::info(
            &path.display().to_string(),
            reader.packet_count(),
            graphics,
            reader.total_duration_ms(),
            frames,
            reader.position_of_final_frame_ms(),
        )
    );
}

fn handle_frames(reader: &mut CdgReader, limit: Option<usize>) {
    let limit = limit.unwrap_or(usize::MAX);
    let mut index = 0;
    while index < limit && reader.move_to_next_frame() {
        println!(
            "{}",
            render::frame_line(
                index,
                reader.current_frame_position_ms(),
                reader.current_frame_duration_ms(),
                reader.current_packet_index(),
                reader.next_packet_index(),
            )
        );
        index += 1;
    }
}

fn handle_commands(bytes: &[u8], start: usize, count: usize) {
    let end = start.saturating_add(count).min(packet_count(bytes.len()));
    for idx in start..end {
        let Some(packet) = packet_at(bytes, idx) else {
            break;
        };
        if !packet.is_graphics() {
            continue;
        }
        match CdgCommand::decode(&packet) {
            Some(command) => println!("{idx:>7}: {}", render::command(&command)),
            None => println!(
                "{idx:>7}: unknown instruction {}",
                packet.instruction_code()
            ),
        }
    }
}

fn seek_frame(reader: &mut CdgReader, at: u64) -> Result<()> {
    if !reader.seek(at) {
        bail!(
            "position {at} ms is past the end ({} ms)",
            reader.total_duration_ms()
        );
    }
    if !reader.move_to_next_frame() {
        bail!("no frame at {at} ms");
    }
    Ok(())
}

fn parse_ms(input: &str) -> Result<u64, String> {
    if let Some(seconds) = input.strip_suffix('s') {
        if let Some(ms) = seconds.strip_suffix('m') {
            return ms
                .parse::<u64>()
                .map_err(|_| format!("invalid milliseconds '{input}'"));
        }
        seconds
            .parse::<u64>()
            .map(|s| s.saturating_mul(1000))
            .map_err(|_| format!("invalid seconds '{input}'"))
    } else {
        input
            .parse::<u64>()
            .map_err(|_| format!("invalid milliseconds '{input}'"))
    }
}
