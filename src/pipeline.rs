//! Analysis run: detect, measure and annotate every frame, writing the result.

use crate::config::Settings;
use crate::error::{ConfigError, PipelineError};
use crate::playback::sweep;
use crate::pose::PoseDetector;
use crate::render::OverlayRenderer;
use crate::tracker::JointAnalyzer;
use crate::video::{open_with_fallback, FrameSink, FrameSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub frames_written: usize,
    pub measurements_valid: usize,
    pub measurements_gated: usize,
    /// Codec the output was opened with.
    pub codec: String,
}

/// Runs one full analysis sweep.
///
/// The sink is opened (with codec fallback) before any frame is read. A write
/// failure aborts the run and reports how many frames made it out. Frames with
/// no subject or low-confidence landmarks are written without annotation.
pub fn run_analysis<S, D, R, K, O, P>(
    settings: &Settings,
    source: &mut S,
    detector: &mut D,
    renderer: &mut R,
    open_sink: O,
    mut progress: P,
) -> Result<AnalysisReport, PipelineError>
where
    S: FrameSource,
    D: PoseDetector<S::Frame>,
    R: OverlayRenderer<S::Frame>,
    K: FrameSink<S::Frame>,
    O: FnMut(&str) -> anyhow::Result<K>,
    P: FnMut(usize, usize),
{
    if detector.scheme() != settings.joints.scheme() {
        return Err(ConfigError::SchemeMismatch {
            detector: detector.scheme().name(),
            joints: settings.joints.scheme().name(),
        }
        .into());
    }

    let (mut sink, codec) = open_with_fallback(&settings.codecs, open_sink)?;

    let mut analyzer = JointAnalyzer::new(settings.joints.clone(), settings.filter, settings.smoothing);
    let total = source.total_frames();
    let fps = source.fps();
    let mut report = AnalysisReport {
        codec,
        ..AnalysisReport::default()
    };

    sweep(source, |index, mut frame| {
        let pose = detector.detect(&frame).map_err(|e| PipelineError::Detector {
            index,
            source: e.into(),
        })?;
        match pose.center_of_mass() {
            Some((x, y)) => log::debug!(
                "frame {}: {} keypoints, avg confidence {:.2}, centre of mass ({:.1}, {:.1})",
                index,
                pose.keypoints.len(),
                pose.average_confidence(),
                x,
                y
            ),
            None => log::debug!("frame {}: {} keypoints, no hip landmarks", index, pose.keypoints.len()),
        }

        let t = settings.time_base.time(index, fps);
        for m in analyzer.process(t, &pose) {
            match (m.result.degrees(), m.points) {
                (Some(degrees), Some(points)) => {
                    report.measurements_valid += 1;
                    renderer
                        .draw(&mut frame, &points, degrees, m.color)
                        .map_err(|e| PipelineError::Render {
                            index,
                            source: e.into(),
                        })?;
                }
                _ => report.measurements_gated += 1,
            }
        }

        sink.write(&frame).map_err(|e| PipelineError::SinkWrite {
            frames_written: report.frames_written,
            source: e.into(),
        })?;
        report.frames_written += 1;
        progress(report.frames_written, total);
        Ok(())
    })?;

    sink.finish().map_err(|e| PipelineError::SinkWrite {
        frames_written: report.frames_written,
        source: e.into(),
    })?;

    log::info!(
        "analysis finished: {} frames written ({} measurements, {} gated)",
        report.frames_written,
        report.measurements_valid,
        report.measurements_gated
    );
    Ok(report)
}
