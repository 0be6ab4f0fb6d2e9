//! Avatar Engine - 实时虚拟形象驱动引擎
//!
//! 把外部感知模型（姿态/手部/面部追踪器）的每帧预测结果
//! 转换为骨骼旋转和 BlendShape 权重：
//! - 骨骼注册与绑定姿势缓存
//! - 基于向量对齐的骨骼重定向（含手指链和前臂+手两段求解）
//! - Morph 通道混合（按名称 O(k) 扇出）
//! - 表情叠加系统（逐帧定步长插值）
//! - 帧驱动器（glTF / VRM / Live2D 三种模型变体）

pub mod avatar;
pub mod expression;
pub mod face;
pub mod landmark;
pub mod morph;
pub mod retarget;
pub mod skeleton;

pub use avatar::{AvatarConfig, AvatarModel, BreathingMotor, ParametricAvatar, RiggedAvatar};
pub use expression::{ExpressionOverlay, ExpressionParam, ExpressionPreset};
pub use landmark::{FacePrediction, LandmarkSet, PosePrediction};
pub use morph::MorphTargetBlender;
pub use retarget::BodyRetargeter;
pub use skeleton::{
    BoneNode, JointId, SceneNode, Side, SkeletonConvention, SkeletonRegistry,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("skeleton registration error: {0}")]
    Skeleton(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AvatarError>;
