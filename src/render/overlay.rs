use anyhow::Result;
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
};

use super::{angle_label, OverlayRenderer};
use crate::joint::Rgb;
use crate::pose::JointPoints;

const LABEL_OFFSET_X: i32 = 30;
const LABEL_PADDING: i32 = 5;
const FONT_SCALE: f64 = 0.7;

fn white() -> Scalar {
    Scalar::new(255.0, 255.0, 255.0, 0.0)
}

fn bgr(color: Rgb) -> Scalar {
    Scalar::new(color.2 as f64, color.1 as f64, color.0 as f64, 0.0)
}

/// OpenCVで関節の骨格線・関節点・角度ラベルを描画
#[derive(Debug, Default)]
pub struct OpenCvOverlay;

impl OpenCvOverlay {
    pub fn new() -> Self {
        Self
    }
}

impl OverlayRenderer<Mat> for OpenCvOverlay {
    fn draw(&mut self, frame: &mut Mat, points: &JointPoints, degrees: f32, color: Rgb) -> Result<()> {
        let color = bgr(color);
        let to_point = |(x, y): (i32, i32)| Point::new(x, y);
        let a = to_point(points.a.to_pixel());
        let b = to_point(points.b.to_pixel());
        let c = to_point(points.c.to_pixel());

        // 白い下線の上に色線を重ねてコントラストを確保
        for (thickness, line_color) in [(4, white()), (2, color)] {
            imgproc::line(frame, a, b, line_color, thickness, imgproc::LINE_AA, 0)?;
            imgproc::line(frame, b, c, line_color, thickness, imgproc::LINE_AA, 0)?;
        }

        // 関節点 (同心円)
        for p in [a, b, c] {
            imgproc::circle(frame, p, 8, white(), imgproc::FILLED, imgproc::LINE_AA, 0)?;
            imgproc::circle(frame, p, 5, color, imgproc::FILLED, imgproc::LINE_AA, 0)?;
        }

        // 角度ラベル (黒背景)
        let label = angle_label(degrees);
        let origin = Point::new(b.x + LABEL_OFFSET_X, b.y);
        let mut baseline = 0;
        let text_size = imgproc::get_text_size(
            &label,
            imgproc::FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            2,
            &mut baseline,
        )?;
        imgproc::rectangle_points(
            frame,
            Point::new(origin.x - LABEL_PADDING, origin.y - text_size.height - LABEL_PADDING),
            Point::new(origin.x + text_size.width + LABEL_PADDING, origin.y + LABEL_PADDING),
            Scalar::new(0.0, 0.0, 0.0, 0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::put_text(
            frame,
            &label,
            origin,
            imgproc::FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            white(),
            2,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }
}
