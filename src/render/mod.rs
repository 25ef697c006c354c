use anyhow::Result;

use crate::joint::Rgb;
use crate::pose::JointPoints;

#[cfg(feature = "desktop")]
pub mod overlay;
#[cfg(feature = "desktop")]
pub mod window;

#[cfg(feature = "desktop")]
pub use minifb::Key;
#[cfg(feature = "desktop")]
pub use overlay::OpenCvOverlay;
#[cfg(feature = "desktop")]
pub use window::MinifbRenderer;

/// 1関節分の骨格線・関節点・角度ラベルをフレームに描画する
pub trait OverlayRenderer<F> {
    fn draw(&mut self, frame: &mut F, points: &JointPoints, degrees: f32, color: Rgb) -> Result<()>;
}

/// 角度ラベル (整数に切り捨て)
pub fn angle_label(degrees: f32) -> String {
    format!("{} deg", degrees as i32)
}

/// 表示サイズ。max_width を超える場合はアスペクト比を保って縮小
pub fn display_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scale = max_width as f32 / width as f32;
    (max_width, ((height as f32 * scale).round() as u32).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size() {
        assert_eq!(display_size(640, 480, 800), (640, 480));
        assert_eq!(display_size(1920, 1080, 800), (800, 450));
        assert_eq!(display_size(1920, 1080, 0), (1920, 1080));
    }

    #[test]
    fn test_angle_label_truncates() {
        assert_eq!(angle_label(179.9), "179 deg");
        assert_eq!(angle_label(0.0), "0 deg");
    }
}
