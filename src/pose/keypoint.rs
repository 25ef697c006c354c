use serde::Deserialize;

/// 検出器のランドマーク番号体系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LandmarkScheme {
    /// COCO / MoveNet / YOLOv8-pose の 17 点
    #[default]
    Coco17,
    /// MediaPipe BlazePose の 33 点
    BlazePose33,
}

impl LandmarkScheme {
    /// ランドマーク数
    pub fn count(&self) -> usize {
        match self {
            Self::Coco17 => 17,
            Self::BlazePose33 => 33,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Coco17 => "coco17",
            Self::BlazePose33 => "blazepose33",
        }
    }

    /// 左右の腰のランドマーク番号 (left, right)
    pub fn hips(&self) -> (usize, usize) {
        match self {
            Self::Coco17 => (KeypointIndex::LeftHip as usize, KeypointIndex::RightHip as usize),
            Self::BlazePose33 => (23, 24),
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        id < self.count()
    }
}

/// COCO 17 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;
}

/// 単一キーポイント (ピクセル座標)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X座標 (px)
    pub x: f32,
    /// Y座標 (px)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 正規化座標 (0.0〜1.0) からピクセル座標に変換して作成
    pub fn from_normalized(x: f32, y: f32, confidence: f32, width: u32, height: u32) -> Self {
        Self::new(x * width as f32, y * height as f32, confidence)
    }

    /// 信頼度が閾値を超えているか
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }

    /// 描画用の整数ピクセル座標
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// 関節を構成する3点 (a, 頂点 b, c)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPoints {
    pub a: Keypoint,
    pub b: Keypoint,
    pub c: Keypoint,
}

impl JointPoints {
    pub fn new(a: Keypoint, b: Keypoint, c: Keypoint) -> Self {
        Self { a, b, c }
    }

    /// 3点すべての信頼度が閾値を超えているか
    pub fn all_valid(&self, threshold: f32) -> bool {
        self.a.is_valid(threshold) && self.b.is_valid(threshold) && self.c.is_valid(threshold)
    }
}

/// 1フレーム分の検出結果
///
/// 検出器が人物を見つけられなかった場合は空になる。
#[derive(Debug, Clone)]
pub struct Pose {
    pub scheme: LandmarkScheme,
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(scheme: LandmarkScheme, keypoints: Vec<Keypoint>) -> Self {
        Self { scheme, keypoints }
    }

    pub fn empty(scheme: LandmarkScheme) -> Self {
        Self::new(scheme, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// ランドマーク番号でキーポイントを取得
    pub fn get(&self, id: usize) -> Option<&Keypoint> {
        self.keypoints.get(id)
    }

    /// 関節の3点をまとめて取得。どれか1点でも欠けていれば None
    pub fn triple(&self, a: usize, b: usize, c: usize) -> Option<JointPoints> {
        Some(JointPoints::new(*self.get(a)?, *self.get(b)?, *self.get(c)?))
    }

    /// 近似重心: 左右の腰の中点
    pub fn center_of_mass(&self) -> Option<(f32, f32)> {
        let (left, right) = self.scheme.hips();
        let l = self.get(left)?;
        let r = self.get(right)?;
        Some(((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
    }

    /// 全キーポイントの平均信頼度
    pub fn average_confidence(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / self.keypoints.len() as f32
    }
}
