use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoWriter},
};
use std::path::Path;

use super::{FrameSink, FrameSource};

/// OpenCVを使用した動画ファイル読み込み
pub struct VideoFileSource {
    capture: VideoCapture,
    total_frames: usize,
    fps: f32,
    width: u32,
    height: u32,
    /// 次に read() で返るフレーム番号。連続読み込み時はシークしない
    next_index: usize,
}

impl VideoFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().context("video path is not valid UTF-8")?;
        let capture = VideoCapture::from_file(path_str, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            anyhow::bail!("Video {} could not be opened", path.display());
        }

        let total_frames = capture.get(videoio::CAP_PROP_FRAME_COUNT)?.max(0.0) as usize;
        let fps = capture.get(videoio::CAP_PROP_FPS)? as f32;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        log::info!(
            "opened {}: {} frames, {:.2} fps, {}x{}",
            path.display(),
            total_frames,
            fps,
            width,
            height
        );

        Ok(Self {
            capture,
            total_frames,
            fps,
            width,
            height,
            next_index: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    type Frame = Mat;

    fn total_frames(&self) -> usize {
        self.total_frames
    }

    fn fps(&self) -> f32 {
        self.fps
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read(&mut self, index: usize) -> Result<Option<Mat>> {
        if index != self.next_index {
            self.capture
                .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
                .context("Failed to seek")?;
        }

        let mut frame = Mat::default();
        let ok = self.capture.read(&mut frame).context("Failed to read frame")?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        self.next_index = index + 1;
        Ok(Some(frame))
    }
}

/// OpenCVを使用した動画ファイル書き出し
pub struct VideoFileSink {
    writer: VideoWriter,
}

impl VideoFileSink {
    /// FourCC (例: "mp4v") を指定して開く。エンコーダが無い場合はエラー
    pub fn create<P: AsRef<Path>>(path: P, codec: &str, fps: f32, size: (u32, u32)) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().context("output path is not valid UTF-8")?;
        let mut chars = codec.chars();
        let (Some(c1), Some(c2), Some(c3), Some(c4), None) =
            (chars.next(), chars.next(), chars.next(), chars.next(), chars.next())
        else {
            anyhow::bail!("codec '{}' is not a 4-character FourCC", codec);
        };
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            fps as f64,
            Size::new(size.0 as i32, size.1 as i32),
            true,
        )?;

        if !writer.is_opened()? {
            anyhow::bail!("VideoWriter refused codec {} for {}", codec, path.display());
        }

        Ok(Self { writer })
    }
}

impl FrameSink<Mat> for VideoFileSink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame).context("Failed to write frame")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.release().context("Failed to finalize video")?;
        Ok(())
    }
}
