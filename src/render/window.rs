use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;

use super::display_size;

/// 進捗バーの高さ (px)
const PROGRESS_BAR_HEIGHT: usize = 4;
const PROGRESS_COLOR: u32 = 0x00FF00;
const PROGRESS_BACKGROUND: u32 = 0x333333;

/// minifbを使用した再生ウィンドウ
pub struct MinifbRenderer {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl MinifbRenderer {
    /// ウィンドウを作成。max_width より広いフレームは縮小表示
    pub fn new(title: &str, frame_width: u32, frame_height: u32, max_width: u32) -> Result<Self> {
        let (width, height) = display_size(frame_width, frame_height, max_width);
        let (width, height) = (width as usize, height as usize);
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        let buffer = vec![0u32; width * height];

        Ok(Self {
            window,
            buffer,
            width,
            height,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// このフレームで押されたキー
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    /// BGR Mat を表示サイズに合わせてバッファにコピー
    pub fn draw_frame(&mut self, frame: &Mat) -> Result<()> {
        let scaled;
        let frame = if frame.cols() as usize != self.width || frame.rows() as usize != self.height {
            let mut resized = Mat::default();
            imgproc::resize(
                frame,
                &mut resized,
                Size::new(self.width as i32, self.height as i32),
                0.0,
                0.0,
                imgproc::INTER_AREA,
            )?;
            scaled = resized;
            &scaled
        } else {
            frame
        };

        for y in 0..self.height {
            for x in 0..self.width {
                let pixel = frame.at_2d::<opencv::core::Vec3b>(y as i32, x as i32)?;
                // BGR から 0RGB の u32 へ詰める
                let r = pixel[2] as u32;
                let g = pixel[1] as u32;
                let b = pixel[0] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }

        Ok(())
    }

    /// 下端に再生位置 (0.0〜1.0) を描画
    pub fn draw_progress(&mut self, fraction: f32) {
        let filled = (fraction.clamp(0.0, 1.0) * self.width as f32) as usize;
        let top = self.height.saturating_sub(PROGRESS_BAR_HEIGHT);
        for y in top..self.height {
            for x in 0..self.width {
                let color = if x < filled { PROGRESS_COLOR } else { PROGRESS_BACKGROUND };
                self.buffer[y * self.width + x] = color;
            }
        }
    }

    /// バッファをウィンドウに表示
    pub fn update(&mut self) -> Result<()> {
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    /// 入力イベントだけ処理する (一時停止中)
    pub fn poll(&mut self) {
        self.window.update();
    }
}
