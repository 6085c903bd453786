//! Cross-crate test suite for the CD+G decoder and source.

#[cfg(test)]
mod playback;

#[cfg(test)]
mod source_e2e;

#[cfg(test)]
mod frame_sanity;
