//! Frame source and sink boundaries.

use anyhow::Result;

use crate::error::PipelineError;

#[cfg(feature = "desktop")]
mod capture;

#[cfg(feature = "desktop")]
pub use capture::{VideoFileSink, VideoFileSource};

/// Finite, seekable sequence of decoded frames.
pub trait FrameSource {
    type Frame;

    fn total_frames(&self) -> usize;

    fn fps(&self) -> f32;

    fn resolution(&self) -> (u32, u32);

    /// Reads the frame at an absolute index. `Ok(None)` is end of sequence.
    fn read(&mut self, index: usize) -> Result<Option<Self::Frame>>;
}

/// Sequential, append-only frame writer.
pub trait FrameSink<F> {
    fn write(&mut self, frame: &F) -> Result<()>;

    /// Flushes and closes the output.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Tries each codec in order and returns the first sink that opens, with its codec.
///
/// Fails with [`PipelineError::SinkInit`] listing every codec tried when none works.
pub fn open_with_fallback<S, O>(codecs: &[String], mut open: O) -> Result<(S, String), PipelineError>
where
    O: FnMut(&str) -> Result<S>,
{
    let mut tried = Vec::with_capacity(codecs.len());
    for codec in codecs {
        match open(codec) {
            Ok(sink) => {
                log::info!("output opened with codec {}", codec);
                return Ok((sink, codec.clone()));
            }
            Err(e) => {
                log::warn!("codec {} unavailable: {:#}", codec, e);
                tried.push(codec.clone());
            }
        }
    }
    Err(PipelineError::SinkInit { tried })
}
