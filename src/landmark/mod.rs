//! 输入数据模型 - 外部追踪器的每帧预测结果

use glam::{Quat, Vec2, Vec3};

/// 姿态关键点索引（BlazePose 33 点布局）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const COUNT: usize = 33;
}

impl From<PoseLandmark> for usize {
    fn from(landmark: PoseLandmark) -> usize {
        landmark as usize
    }
}

/// 手部关键点索引（21 点布局，腕 + 每指 4 点）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub const COUNT: usize = 21;
}

impl From<HandLandmark> for usize {
    fn from(landmark: HandLandmark) -> usize {
        landmark as usize
    }
}

/// 归一化显示空间中的关键点序列
///
/// x/y ∈ [0,1]（屏幕坐标），z 为相对深度。每帧由外部追踪器
/// 生成；整组缺失表示该帧追踪丢失。
#[derive(Clone, Debug)]
pub struct LandmarkSet {
    points: Vec<Vec3>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 读取关键点；越界返回零向量（不会 panic）
    pub fn get(&self, index: impl Into<usize>) -> Vec3 {
        self.points.get(index.into()).copied().unwrap_or(Vec3::ZERO)
    }

    /// 两个关键点之间的方向向量（to - from）
    pub fn diff(&self, from: impl Into<usize>, to: impl Into<usize>) -> Vec3 {
        self.get(to) - self.get(from)
    }
}

/// 姿态/手部预测结果；字段缺失是合法的常态（追踪器丢失该部位）
#[derive(Clone, Debug, Default)]
pub struct PosePrediction {
    pub pose: Option<LandmarkSet>,
    pub left_hand: Option<LandmarkSet>,
    pub right_hand: Option<LandmarkSet>,
}

/// 面部预测结果
#[derive(Clone, Debug)]
pub struct FacePrediction {
    /// blendshape 系数（_L/_R 后缀命名，值域 [0,1]）
    pub blendshapes: Vec<(String, f32)>,
    /// 头部朝向
    pub rotation: Quat,
    /// 面部包围盒中心（归一化图像坐标）
    pub image_position: Vec2,
    /// 面部包围盒尺度（归一化）
    pub image_scale: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_vector() {
        let set = LandmarkSet::new(vec![
            Vec3::new(0.1, 0.2, 0.0),
            Vec3::new(0.4, 0.6, 0.1),
        ]);
        let d = set.diff(0usize, 1usize);
        assert!((d.x - 0.3).abs() < 1e-6);
        assert!((d.y - 0.4).abs() < 1e-6);
        assert!((d.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_is_zero() {
        let set = LandmarkSet::new(vec![Vec3::ONE]);
        assert_eq!(set.get(5usize), Vec3::ZERO);
    }

    #[test]
    fn test_landmark_indices() {
        assert_eq!(usize::from(PoseLandmark::LeftShoulder), 11);
        assert_eq!(usize::from(PoseLandmark::RightAnkle), 28);
        assert_eq!(usize::from(HandLandmark::IndexMcp), 5);
        assert_eq!(usize::from(HandLandmark::PinkyTip), 20);
    }
}
