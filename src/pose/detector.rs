use anyhow::Result;

use super::keypoint::{LandmarkScheme, Pose};

/// 姿勢推定器 (ブラックボックス)
///
/// キーポイントはピクセル座標で、番号は検出器自身のランドマーク体系に従う。
/// 人物が見つからない場合は空の Pose を返す。
pub trait PoseDetector<F> {
    fn scheme(&self) -> LandmarkScheme;

    fn detect(&mut self, frame: &F) -> Result<Pose>;
}

#[cfg(feature = "desktop")]
pub use movenet::MoveNetDetector;

#[cfg(feature = "desktop")]
mod movenet {
    use anyhow::{Context, Result};
    use opencv::core::Mat;
    use opencv::prelude::*;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use std::path::Path;

    use super::PoseDetector;
    use crate::pose::keypoint::{Keypoint, KeypointIndex, LandmarkScheme, Pose};
    use crate::pose::preprocess::preprocess_for_movenet;

    /// MoveNet を使用した姿勢検出器
    pub struct MoveNetDetector {
        session: Session,
    }

    impl MoveNetDetector {
        /// ONNXモデルを読み込んで初期化
        pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .commit_from_file(model_path.as_ref())
                .context("Failed to load ONNX model")?;

            log::info!("MoveNet model loaded from {}", model_path.as_ref().display());
            Ok(Self { session })
        }
    }

    impl PoseDetector<Mat> for MoveNetDetector {
        fn scheme(&self) -> LandmarkScheme {
            LandmarkScheme::Coco17
        }

        fn detect(&mut self, frame: &Mat) -> Result<Pose> {
            let width = frame.cols() as u32;
            let height = frame.rows() as u32;

            let input = preprocess_for_movenet(frame)?;
            let input_tensor = Tensor::from_array(input)?;
            let outputs = self
                .session
                .run(ort::inputs!["serving_default_input_0" => input_tensor])
                .context("Inference failed")?;

            // MoveNet の出力は [1, 1, 17, 3] (y, x, confidence)
            let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
                .try_extract_array()
                .context("Failed to extract output tensor")?;

            let keypoints = (0..KeypointIndex::COUNT)
                .map(|i| {
                    let y = output[[0, 0, i, 0]];
                    let x = output[[0, 0, i, 1]];
                    let confidence = output[[0, 0, i, 2]];
                    Keypoint::from_normalized(x, y, confidence, width, height)
                })
                .collect();

            Ok(Pose::new(LandmarkScheme::Coco17, keypoints))
        }
    }
}
