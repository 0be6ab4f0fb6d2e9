//! 帧驱动器 - 每个渲染帧驱动一次模型更新

mod breathing;
mod config;
mod parametric;
mod rigged;

pub use breathing::BreathingMotor;
pub use config::{AvatarConfig, NeckAxis};
pub use parametric::ParametricAvatar;
pub use rigged::RiggedAvatar;

use crate::landmark::{FacePrediction, PosePrediction};

/// 模型变体（封闭枚举，每帧只分发一次）
///
/// glTF 与 VRM 走骨骼管线（命名约定不同），Live2D 走参数管线。
pub enum AvatarModel {
    Gltf(RiggedAvatar),
    Vrm(RiggedAvatar),
    Live2d(ParametricAvatar),
}

impl AvatarModel {
    /// 每帧入口：拉取最新预测并依次执行 morph 混合 → 表情叠加
    /// → 骨骼重定向；任一预测缺失时对应子系统优雅回退
    pub fn update_frame(&mut self, face: Option<&FacePrediction>, body: Option<&PosePrediction>) {
        match self {
            AvatarModel::Gltf(avatar) | AvatarModel::Vrm(avatar) => {
                avatar.update_frame(face, body)
            }
            AvatarModel::Live2d(avatar) => avatar.update_frame(face),
        }
    }

    /// 音频口型强度
    pub fn update_lip_sync(&mut self, volume: f32) {
        match self {
            AvatarModel::Gltf(avatar) | AvatarModel::Vrm(avatar) => avatar.update_lip_sync(volume),
            AvatarModel::Live2d(avatar) => avatar.update_lip_sync(volume),
        }
    }

    /// 激活/停用表情集合
    pub fn activate_expressions(&mut self, names: &[&str]) {
        match self {
            AvatarModel::Gltf(avatar) | AvatarModel::Vrm(avatar) => {
                avatar.activate_expressions(names)
            }
            AvatarModel::Live2d(avatar) => avatar.activate_expressions(names),
        }
    }
}
