//! 重定向数学工具 - 坐标变换与向量对齐

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::skeleton::SkeletonRegistry;

/// 方向向量长度平方下限；低于该值视为退化几何
pub(crate) const MIN_DIRECTION_LEN_SQ: f32 = 1e-10;

/// 计算把 from 旋转到 to 的四元数（输入无需归一化）
///
/// 任一向量退化（接近零长度）时返回单位旋转，绝不向节点树
/// 传播 NaN。
pub fn align_vectors(from: Vec3, to: Vec3) -> Quat {
    if from.length_squared() < MIN_DIRECTION_LEN_SQ || to.length_squared() < MIN_DIRECTION_LEN_SQ {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from.normalize(), to.normalize())
}

/// 向量对齐重定向：显示空间的前后两段方向向量 → 关节局部旋转
///
/// 先用约定的符号翻转矩阵转到角色空间，再用父节点当前世界矩阵
/// 的逆（分解出的旋转）转到父节点局部坐标系，最后做单位向量对齐。
pub fn rotation_from_vector_pair(
    skeleton: &SkeletonRegistry,
    node_index: usize,
    parent_vec: Vec3,
    child_vec: Vec3,
) -> Quat {
    let flip = skeleton.convention().display_to_avatar();
    let parent_vec = flip * parent_vec;
    let child_vec = flip * child_vec;

    // 矩阵作用于向量而不是坐标系本身，这里要用逆矩阵
    let world_to_parent = skeleton.parent_world(node_index).inverse();
    let (_, parent_rotation, _) = world_to_parent.to_scale_rotation_translation();
    align_vectors(parent_rotation * parent_vec, parent_rotation * child_vec)
}

/// 由三个轴（列向量）构造旋转矩阵
pub(crate) fn frame_matrix(x: Vec3, y: Vec3, z: Vec3) -> Mat4 {
    Mat4::from_mat3(Mat3::from_cols(x, y, z))
}

/// 提取矩阵的旋转部分
pub(crate) fn rotation_of(matrix: Mat4) -> Quat {
    let (_, rotation, _) = matrix.to_scale_rotation_translation();
    rotation
}
