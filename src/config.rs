use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::joint::{self, JointDefinition, JointTable, Rgb};
use crate::playback::SpeedSet;
use crate::pose::LandmarkScheme;
use crate::tracker::FilterParams;

pub const DEFAULT_CONFIG_PATH: &str = "pose_angle.toml";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    /// 空の場合は COCO 17 点の標準関節セット
    #[serde(default)]
    pub joints: Vec<JointConfig>,
    /// 解析対象の関節名。空なら全関節
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// ランドマーク番号体系
    #[serde(default)]
    pub scheme: LandmarkScheme,
    /// 関節ごとの指定がない場合の信頼度閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 姿勢推定モデル (ONNX)
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_confidence_threshold() -> f32 { joint::DEFAULT_CONFIDENCE_THRESHOLD }
fn default_model() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scheme: LandmarkScheme::default(),
            confidence_threshold: default_confidence_threshold(),
            model: default_model(),
        }
    }
}

/// フィルタの時間軸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeBase {
    /// フレーム番号 (dt = 1)
    #[default]
    Frame,
    /// 秒 (index / fps)
    Seconds,
}

impl TimeBase {
    pub fn time(&self, frame_index: usize, fps: f32) -> f32 {
        match self {
            Self::Frame => frame_index as f32,
            Self::Seconds if fps > 0.0 => frame_index as f32 / fps,
            Self::Seconds => frame_index as f32,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// false の場合は生の座標で角度を計算
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_cutoff")]
    pub min_cutoff: f32,
    #[serde(default = "default_beta")]
    pub beta: f32,
    #[serde(default = "default_derivative_cutoff")]
    pub derivative_cutoff: f32,
    #[serde(default)]
    pub time_base: TimeBase,
}

fn default_filter_enabled() -> bool { true }
fn default_min_cutoff() -> f32 { 0.5 }
fn default_beta() -> f32 { 0.2 }
fn default_derivative_cutoff() -> f32 { 1.0 }

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
            min_cutoff: default_min_cutoff(),
            beta: default_beta(),
            derivative_cutoff: default_derivative_cutoff(),
            time_base: TimeBase::default(),
        }
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_cutoff", self.min_cutoff),
            ("derivative_cutoff", self.derivative_cutoff),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::FilterParameter { name, value });
            }
        }
        if !(self.beta >= 0.0 && self.beta.is_finite()) {
            return Err(ConfigError::FilterParameter { name: "beta", value: self.beta });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JointConfig {
    pub name: String,
    pub a: usize,
    /// 頂点
    pub b: usize,
    pub c: usize,
    #[serde(default = "default_joint_color")]
    pub color: Rgb,
    pub confidence_threshold: Option<f32>,
}

fn default_joint_color() -> Rgb { Rgb(0, 255, 0) }

#[derive(Debug, Deserialize, Clone)]
pub struct PlaybackConfig {
    /// 選択可能な再生速度
    #[serde(default = "default_speeds")]
    pub speeds: Vec<f32>,
    #[serde(default = "default_speed")]
    pub default_speed: f32,
    /// 終端で先頭に戻って再生を続けるか
    #[serde(default = "default_loop_on_end")]
    pub loop_on_end: bool,
    /// これより幅の広いフレームは表示時に縮小
    #[serde(default = "default_max_display_width")]
    pub max_display_width: u32,
}

fn default_speeds() -> Vec<f32> { vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0] }
fn default_speed() -> f32 { 0.5 }
fn default_loop_on_end() -> bool { true }
fn default_max_display_width() -> u32 { 800 }

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speeds: default_speeds(),
            default_speed: default_speed(),
            loop_on_end: default_loop_on_end(),
            max_display_width: default_max_display_width(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// 出力コーデック (FourCC)。先頭から順に試す
    #[serde(default = "default_codecs")]
    pub codecs: Vec<String>,
}

fn default_codecs() -> Vec<String> {
    ["mp4v", "avc1", "XVID", "MJPG"].iter().map(|s| s.to_string()).collect()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { codecs: default_codecs() }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// ファイルが存在しない場合はデフォルト設定。存在して不正な場合はエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let config = Self::load(path)?;
            log::info!("config loaded from {}", path.display());
            Ok(config)
        } else {
            log::info!("{} not found, using default config", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// 全項目を検証して実行時設定を組み立てる
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let scheme = self.detection.scheme;
        joint::validate_threshold("detection", self.detection.confidence_threshold)?;
        self.filter.validate()?;

        let table = if self.joints.is_empty() {
            let table = JointTable::coco17_default();
            if scheme != table.scheme() {
                return Err(ConfigError::SchemeMismatch {
                    detector: scheme.name(),
                    joints: table.scheme().name(),
                });
            }
            let threshold = self.detection.confidence_threshold;
            JointTable::new(
                scheme,
                table.iter().cloned().map(|j| j.with_threshold(threshold)).collect(),
            )?
        } else {
            let joints = self
                .joints
                .iter()
                .map(|j| {
                    JointDefinition::new(j.name.clone(), j.a, j.b, j.c, j.color).with_threshold(
                        j.confidence_threshold
                            .unwrap_or(self.detection.confidence_threshold),
                    )
                })
                .collect();
            JointTable::new(scheme, joints)?
        };
        let joints = if self.selected.is_empty() {
            table
        } else {
            table.select(&self.selected)?
        };

        let speeds = SpeedSet::new(self.playback.speeds.clone())?;
        let default_speed = speeds.select(self.playback.default_speed)?;

        if self.output.codecs.is_empty() {
            return Err(ConfigError::NoCodecs);
        }

        log::info!(
            "{} joints on scheme {}, smoothing {}",
            joints.len(),
            scheme.name(),
            if self.filter.enabled { "on" } else { "off" }
        );

        Ok(Settings {
            joints,
            filter: FilterParams::from_config(&self.filter),
            smoothing: self.filter.enabled,
            time_base: self.filter.time_base,
            speeds,
            default_speed,
            loop_on_end: self.playback.loop_on_end,
            max_display_width: self.playback.max_display_width,
            codecs: self.output.codecs.clone(),
        })
    }
}

/// 検証済みの実行時設定
#[derive(Debug, Clone)]
pub struct Settings {
    pub joints: JointTable,
    pub filter: FilterParams,
    pub smoothing: bool,
    pub time_base: TimeBase,
    pub speeds: SpeedSet,
    pub default_speed: f32,
    pub loop_on_end: bool,
    pub max_display_width: u32,
    pub codecs: Vec<String>,
}
