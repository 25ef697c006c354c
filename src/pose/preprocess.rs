use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
};

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// OpenCV Mat (BGR) を MoveNet用の入力テンソルに変換
///
/// 出力は [1, 192, 192, 3] の RGB f32 テンソル (0.0-255.0)。
/// アスペクト比は保持しないため、正規化座標に元画像の幅・高さを掛ければピクセル座標になる。
pub fn preprocess_for_movenet(frame: &Mat) -> Result<Array4<f32>> {
    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(MOVENET_INPUT_SIZE, MOVENET_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    // 8bit 3ch の連続領域をそのまま NHWC に並べる
    let size = MOVENET_INPUT_SIZE as usize;
    let pixels: Vec<f32> = rgb.data_bytes()?.iter().map(|&v| v as f32).collect();
    Array4::from_shape_vec((1, size, size, 3), pixels).context("unexpected frame layout for MoveNet input")
}
