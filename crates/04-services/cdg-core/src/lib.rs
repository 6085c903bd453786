#![deny(unsafe_op_in_unsafe_fn)]
#![allow(missing_docs)]

//! CD+Graphics subchannel decoder.
//!
//! Packets are parsed field by field, decoded into typed commands, and
//! applied to an indexed-color canvas. [`CdgReader`] drives the canvas over
//! an in-memory stream and coalesces visible changes into frame-rate-capped
//! frames with seek support.

pub mod canvas;
pub mod command;
pub mod error;
pub mod packet;
pub mod reader;

pub use canvas::{Canvas, CDG_FULL_HEIGHT, CDG_FULL_WIDTH, MAX_COLOR};
pub use command::{ColorBank, Command, HScroll, Rgb, ScrollFill, TileOp, VScroll};
pub use error::{CdgError, CdgResult};
pub use packet::{Packet, CDG_PACKET_SIZE};
pub use reader::{
    ms_to_packets, packets_to_ms, CdgReader, ReaderConfig, CDG_PACKETS_PER_SECOND,
    DEFAULT_MAX_FPS,
};
