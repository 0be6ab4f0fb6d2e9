//! 骨骼注册表 - 加载时遍历一次节点树，缓存绑定姿势
//!
//! 重定向器只通过这里改写关节局部旋转；每次写入后从该节点向下
//! 刷新世界矩阵，链上后续关节总能看到最新的父坐标系。

use std::collections::HashMap;

use glam::{EulerRot, Mat4, Quat};

use crate::{AvatarError, Result};

use super::{
    resolve_joint_name, BoneNode, JointId, SceneNode, SkeletonConvention, REFERENCE_JOINTS,
};

/// 每个模型一份的骨骼注册表；模型卸载时随之销毁
pub struct SkeletonRegistry {
    nodes: Vec<BoneNode>,
    joints: HashMap<JointId, usize>,
    /// 脊柱链参考帧的第二份绑定快照（重定向时作参考坐标系）
    reference_world: HashMap<JointId, Mat4>,
    convention: SkeletonConvention,
}

impl SkeletonRegistry {
    /// 遍历节点树并解析关节
    ///
    /// 解析失败的节点不报错、此后每帧静默跳过；规范关节重名时
    /// 保留首个命中（后续重名节点当作未解析处理）。
    pub fn register(scene: &[SceneNode], convention: SkeletonConvention) -> Result<Self> {
        let mut nodes: Vec<BoneNode> = Vec::with_capacity(scene.len());
        let mut joints = HashMap::new();

        for (index, desc) in scene.iter().enumerate() {
            if let Some(parent) = desc.parent {
                if parent >= index {
                    return Err(AvatarError::Skeleton(format!(
                        "node '{}' references parent {} at or after itself ({})",
                        desc.name, parent, index
                    )));
                }
            }

            let local =
                Mat4::from_scale_rotation_translation(desc.scale, desc.rotation, desc.translation);
            let world = match desc.parent {
                Some(parent) => nodes[parent].world() * local,
                None => local,
            };

            let joint = if desc.is_bone {
                match resolve_joint_name(&desc.name, convention) {
                    Some(id) if joints.contains_key(&id) => {
                        log::debug!(
                            "duplicate joint {:?} on node '{}', keeping first occurrence",
                            id,
                            desc.name
                        );
                        None
                    }
                    resolved => resolved,
                }
            } else {
                None
            };
            if let Some(id) = joint {
                joints.insert(id, index);
            }

            if let Some(parent) = desc.parent {
                nodes[parent].children.push(index);
            }
            nodes.push(BoneNode::new(desc, joint, local, world));
        }

        let mut reference_world = HashMap::new();
        for id in REFERENCE_JOINTS {
            if let Some(&index) = joints.get(&id) {
                reference_world.insert(id, nodes[index].world());
            }
        }

        log::info!(
            "skeleton registered: {} nodes, {} joints resolved",
            nodes.len(),
            joints.len()
        );

        Ok(Self {
            nodes,
            joints,
            reference_world,
            convention,
        })
    }

    pub fn convention(&self) -> SkeletonConvention {
        self.convention
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn node(&self, index: usize) -> &BoneNode {
        &self.nodes[index]
    }

    /// 规范关节 → 节点下标；未解析的关节返回 None
    pub fn joint_index(&self, id: JointId) -> Option<usize> {
        self.joints.get(&id).copied()
    }

    pub fn joint_node(&self, id: JointId) -> Option<&BoneNode> {
        self.joint_index(id).map(|index| &self.nodes[index])
    }

    /// 脊柱链参考帧（绑定时快照）
    pub fn reference_world(&self, id: JointId) -> Option<Mat4> {
        self.reference_world.get(&id).copied()
    }

    /// 父节点当前世界矩阵；根节点返回单位矩阵
    pub fn parent_world(&self, index: usize) -> Mat4 {
        match self.nodes[index].parent {
            Some(parent) => self.nodes[parent].world(),
            None => Mat4::IDENTITY,
        }
    }

    /// 写入局部旋转（平移/缩放保持绑定值），并向下刷新世界矩阵
    pub fn set_rotation(&mut self, index: usize, rotation: Quat) {
        self.nodes[index].set_rotation(rotation);
        let parent_world = self.parent_world(index);
        self.propagate_world(index, parent_world);
    }

    /// 按关节写入局部旋转；关节未解析时返回 false
    pub fn set_joint_rotation(&mut self, id: JointId, rotation: Quat) -> bool {
        match self.joint_index(id) {
            Some(index) => {
                self.set_rotation(index, rotation);
                true
            }
            None => false,
        }
    }

    /// 按关节写入 XYZ 欧拉角旋转
    pub fn set_joint_euler(&mut self, id: JointId, x: f32, y: f32, z: f32) -> bool {
        self.set_joint_rotation(id, Quat::from_euler(EulerRot::XYZ, x, y, z))
    }

    /// 在当前旋转上叠加 XYZ 欧拉角增量（呼吸等附加动作用）
    pub fn additive_rotate_joint(&mut self, id: JointId, dx: f32, dy: f32, dz: f32) -> bool {
        let Some(index) = self.joint_index(id) else {
            return false;
        };
        let (x, y, z) = self.nodes[index].rotation().to_euler(EulerRot::XYZ);
        self.set_rotation(index, Quat::from_euler(EulerRot::XYZ, x + dx, y + dy, z + dz));
        true
    }

    /// 回退到绑定旋转
    pub fn reset_joint_to_bind(&mut self, id: JointId) -> bool {
        let Some(index) = self.joint_index(id) else {
            return false;
        };
        let bind = self.nodes[index].bind_rotation();
        self.set_rotation(index, bind);
        true
    }

    fn propagate_world(&mut self, index: usize, parent_world: Mat4) {
        let world = parent_world * self.nodes[index].local_matrix();
        self.nodes[index].world = world;
        let children = self.nodes[index].children.clone();
        for child in children {
            self.propagate_world(child, world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    fn two_bone_scene() -> Vec<SceneNode> {
        vec![
            SceneNode::bone("Hips", None, Vec3::new(0.0, 1.0, 0.0)),
            SceneNode::bone("Spine", Some(0), Vec3::new(0.0, 0.2, 0.0)),
            SceneNode::bone("LeftArm", Some(1), Vec3::new(0.3, 0.2, 0.0)),
        ]
    }

    #[test]
    fn test_register_resolves_joints() {
        let skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        assert_eq!(skeleton.node_count(), 3);
        assert_eq!(skeleton.joint_count(), 3);
        assert_eq!(skeleton.joint_index(JointId::Hips), Some(0));
        assert_eq!(skeleton.joint_index(JointId::Spine), Some(1));
        assert!(skeleton.joint_index(JointId::Neck).is_none());
    }

    #[test]
    fn test_duplicate_joint_keeps_first() {
        let mut scene = two_bone_scene();
        scene.push(SceneNode::bone("Spine_duplicate", Some(1), Vec3::ZERO));
        let skeleton =
            SkeletonRegistry::register(&scene, SkeletonConvention::Standard).unwrap();
        assert_eq!(skeleton.joint_index(JointId::Spine), Some(1));
        assert!(skeleton.node(3).joint.is_none());
    }

    #[test]
    fn test_forward_parent_rejected() {
        let scene = vec![SceneNode::bone("Hips", Some(0), Vec3::ZERO)];
        assert!(SkeletonRegistry::register(&scene, SkeletonConvention::Standard).is_err());
    }

    #[test]
    fn test_world_matrix_chain() {
        let skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        let spine_world = skeleton.node(1).world();
        let translation = spine_world.to_scale_rotation_translation().2;
        assert!((translation - Vec3::new(0.0, 1.2, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_rotation_propagates_to_children() {
        let mut skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        // 绕 z 转 90°：Spine 的子节点 LeftArm 应随之移动
        skeleton.set_joint_rotation(JointId::Spine, Quat::from_rotation_z(FRAC_PI_2));
        let arm_world = skeleton.node(2).world();
        let translation = arm_world.to_scale_rotation_translation().2;
        assert!((translation - Vec3::new(-0.2, 1.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_bind_translation_and_scale_untouched() {
        let mut skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        let position_before = skeleton.node(1).position();
        let scale_before = skeleton.node(1).scale();
        for _ in 0..10 {
            skeleton.set_joint_rotation(JointId::Spine, Quat::from_rotation_x(0.3));
            skeleton.additive_rotate_joint(JointId::Spine, 0.01, 0.0, 0.0);
        }
        // 逐位相等，不是近似相等
        assert_eq!(skeleton.node(1).position(), position_before);
        assert_eq!(skeleton.node(1).scale(), scale_before);
    }

    #[test]
    fn test_reset_to_bind() {
        let mut skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        skeleton.set_joint_rotation(JointId::Spine, Quat::from_rotation_y(1.0));
        skeleton.reset_joint_to_bind(JointId::Spine);
        let node = skeleton.node(1);
        assert_eq!(node.rotation(), node.bind_rotation());
        assert!((node.world() - node.bind_world()).abs_diff_eq(Mat4::ZERO, 1e-6));
    }

    #[test]
    fn test_reference_snapshot() {
        let skeleton =
            SkeletonRegistry::register(&two_bone_scene(), SkeletonConvention::Standard).unwrap();
        let reference = skeleton.reference_world(JointId::Spine).unwrap();
        assert!((reference - skeleton.node(1).bind_world()).abs_diff_eq(Mat4::ZERO, 1e-6));
    }
}
