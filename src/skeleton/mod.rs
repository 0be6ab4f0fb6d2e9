//! 骨骼系统 - 关节注册、绑定姿势缓存与世界矩阵维护

mod bone;
mod names;
mod registry;

pub use bone::{BoneNode, SceneNode};
pub use names::{resolve_joint_name, FingerDigit, JointId, Side};
pub use registry::SkeletonRegistry;

pub(crate) use names::{hand_chain_joints, POSE_DRIVEN_JOINTS, REFERENCE_JOINTS};

use glam::{Mat3, Vec3};

/// 骨骼命名约定；同时决定显示空间 → 角色空间的坐标翻转
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkeletonConvention {
    /// Mixamo/glTF 风格（Hips / LeftArm / ...）
    Standard,
    /// VRM 风格（C_Hips / L_UpperArm / ...）
    VrmLike,
}

impl SkeletonConvention {
    /// 显示空间（摄像头画面：x 右、y 下、z 里）到角色世界空间的
    /// 符号翻转矩阵；两种约定只差一个轴的符号
    pub fn display_to_avatar(&self) -> Mat3 {
        match self {
            SkeletonConvention::Standard => {
                Mat3::from_diagonal(Vec3::new(1.0, -1.0, -1.0))
            }
            SkeletonConvention::VrmLike => {
                Mat3::from_diagonal(Vec3::new(-1.0, -1.0, 1.0))
            }
        }
    }

    pub(crate) fn vocabulary(&self) -> &'static [(&'static str, JointId)] {
        names::vocabulary(*self)
    }
}
