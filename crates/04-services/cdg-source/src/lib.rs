#![deny(unsafe_op_in_unsafe_fn)]
#![allow(missing_docs)]

//! Pull-based CD+G video source.
//!
//! [`CdgSource`] owns a [`cdg_core::CdgReader`] and serves it to a media
//! pipeline through the usual push-on-demand contract: `need_data` decodes
//! and delivers one frame, `enough_data` pauses, `seek_data` repositions.
//! A control thread may `load` or `reset` at any time; the pull path then
//! sees the new stream or no data at all.

mod error;
mod sink;
mod source;

pub use cdg_core::{CdgError, ReaderConfig};
pub use error::{SourceError, SourceResult};
pub use sink::{
    frame_channel, ChannelSink, FrameQueue, FrameSink, SinkEvent, SinkPush, VideoBuffer,
};
pub use source::{CdgSource, PullOutcome, SourceConfig, SourceStats, DEFAULT_QUEUE_DEPTH};
