//! 帧驱动配置

use crate::skeleton::SkeletonConvention;
use crate::{AvatarError, Result};

/// 颈部欧拉角分量来源；按配置顺序填入 x/y/z 槽位
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeckAxis {
    X,
    NegX,
    Y,
    NegY,
    Z,
    NegZ,
}

impl NeckAxis {
    /// 从配置字符串解析（"X" / "-X" / "Y" / "-Y" / "Z" / "-Z"）
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "X" => Ok(NeckAxis::X),
            "-X" => Ok(NeckAxis::NegX),
            "Y" => Ok(NeckAxis::Y),
            "-Y" => Ok(NeckAxis::NegY),
            "Z" => Ok(NeckAxis::Z),
            "-Z" => Ok(NeckAxis::NegZ),
            _ => Err(AvatarError::Config(format!(
                "unknown neck axis token: {}",
                token
            ))),
        }
    }

    pub(crate) fn pick(&self, x: f32, y: f32, z: f32) -> f32 {
        match self {
            NeckAxis::X => x,
            NeckAxis::NegX => -x,
            NeckAxis::Y => y,
            NeckAxis::NegY => -y,
            NeckAxis::Z => z,
            NeckAxis::NegZ => -z,
        }
    }
}

/// 帧驱动配置（扁平化，直接改字段即可）
#[derive(Clone, Debug)]
pub struct AvatarConfig {
    /// jawOpen 放大倍数，让嘴部动作更明显
    pub jaw_open_magnification: f32,
    /// 颈部旋转分量顺序
    pub neck_rotation_order: [NeckAxis; 3],
    /// 颈部辅助偏移角（弧度），用于模型初始朝向修正
    pub neck_assist_x: f32,
    pub neck_assist_y: f32,
    pub neck_assist_z: f32,
    /// 头部角度 → 颈部欧拉角的倍数
    pub head_pitch_multiplier: f32,
    pub head_yaw_multiplier: f32,
    pub head_roll_multiplier: f32,
    /// 面部位置驱动模型平移
    pub free_move: bool,
    pub face_move_multiplier: f32,
    pub face_depth_multiplier: f32,
    /// 面部包围盒尺度基准值（距离原点）
    pub face_scale_reference: f32,
    /// 自动呼吸动作
    pub breathing: bool,
    /// 表情插值步长（每帧固定值）
    pub expression_step: f32,
    /// 全身追踪（含躯干与下半身）
    pub full_body: bool,
}

impl AvatarConfig {
    /// 各命名约定下的默认值
    pub fn for_convention(convention: SkeletonConvention) -> Self {
        match convention {
            SkeletonConvention::Standard => Self {
                jaw_open_magnification: 2.5,
                neck_rotation_order: [NeckAxis::X, NeckAxis::Y, NeckAxis::Z],
                neck_assist_x: 0.0,
                neck_assist_y: 0.0,
                neck_assist_z: 0.0,
                head_pitch_multiplier: 1.0,
                head_yaw_multiplier: 1.0,
                head_roll_multiplier: 1.0,
                free_move: true,
                face_move_multiplier: 1.5,
                face_depth_multiplier: 4.5,
                face_scale_reference: 0.4,
                breathing: true,
                expression_step: crate::expression::DEFAULT_EXPRESSION_STEP,
                full_body: false,
            },
            SkeletonConvention::VrmLike => Self {
                // VRM 模型不放大 jawOpen（ARKit blendshape 直通）
                jaw_open_magnification: 1.0,
                head_pitch_multiplier: -3.0,
                head_yaw_multiplier: 2.0,
                head_roll_multiplier: -2.0,
                face_move_multiplier: 0.5,
                face_depth_multiplier: 2.0,
                ..Self::for_convention(SkeletonConvention::Standard)
            },
        }
    }

    /// 解析配置来的颈部旋转顺序
    pub fn set_neck_rotation_order(&mut self, tokens: [&str; 3]) -> Result<()> {
        self.neck_rotation_order = [
            NeckAxis::parse(tokens[0])?,
            NeckAxis::parse(tokens[1])?,
            NeckAxis::parse(tokens[2])?,
        ];
        Ok(())
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self::for_convention(SkeletonConvention::Standard)
    }
}
