//! 骨骼重定向器 - 每帧把关键点预测映射为关节旋转
//!
//! 每个关节取相邻两段关键点方向向量做对齐求解，链上关节按
//! 根→叶顺序写入。任何输入缺失都退化为绑定姿势，调用永不失败。

use std::f32::consts::PI;

use glam::{EulerRot, Quat, Vec3};

use crate::landmark::{LandmarkSet, PoseLandmark};
use crate::skeleton::{
    JointId, Side, SkeletonConvention, SkeletonRegistry, POSE_DRIVEN_JOINTS,
};

use super::hand;
use super::math::{align_vectors, frame_matrix, rotation_from_vector_pair, rotation_of};

const DEG: f32 = PI / 180.0;

/// 大腿左右摆动限制 ±45°
const UP_LEG_SWING_LIMIT: f32 = 45.0 * DEG;
/// Standard 约定下大腿前后摆动范围（先折算到 [0, 2π)）
const UP_LEG_PITCH_MIN: f32 = 80.0 * DEG;
const UP_LEG_PITCH_MAX: f32 = 280.0 * DEG;
/// VRM 约定下大腿前后摆动限制 ±100°
const VRM_UP_LEG_PITCH_LIMIT: f32 = 100.0 * DEG;
/// 髋部旋转的腿部竖直度阈值：双腿 y 分量都超过该值才转髋
const HIP_LEG_VERTICAL_THRESHOLD: f32 = 0.4;

/// 骨骼重定向器（BodyTracker）
///
/// 默认只追踪手臂和手；全身模式追加躯干与下半身。
pub struct BodyRetargeter {
    full_body: bool,
}

impl BodyRetargeter {
    pub fn new() -> Self {
        Self { full_body: false }
    }

    /// 开关下半身/躯干追踪
    pub fn set_full_body(&mut self, full_body: bool) {
        self.full_body = full_body;
    }

    pub fn is_full_body(&self) -> bool {
        self.full_body
    }

    /// 每帧入口，无返回值，副作用是关节旋转写入
    ///
    /// 姿态缺失时全部姿态驱动关节回退绑定姿势；手部缺失时该侧
    /// 腕与手指回退绑定姿势（不会停在上一帧的"爪形"）。
    pub fn apply_frame(
        &self,
        skeleton: &mut SkeletonRegistry,
        pose: Option<&LandmarkSet>,
        left_hand: Option<&LandmarkSet>,
        right_hand: Option<&LandmarkSet>,
    ) {
        match pose {
            Some(pose) => {
                if self.full_body {
                    self.apply_torso(skeleton, pose);
                    self.apply_legs(skeleton, pose);
                }
                self.apply_arms(skeleton, pose);
            }
            None => {
                for id in POSE_DRIVEN_JOINTS {
                    skeleton.reset_joint_to_bind(id);
                }
            }
        }

        hand::apply_hand_chain(skeleton, Side::Left, left_hand);
        hand::apply_hand_chain(skeleton, Side::Right, right_hand);
    }

    /// 躯干：髋/肩关键点估计上身平面，腿向量估计髋部朝向
    fn apply_torso(&self, skeleton: &mut SkeletonRegistry, pose: &LandmarkSet) {
        use PoseLandmark::*;
        let (Some(spine_index), Some(hips_index)) = (
            skeleton.joint_index(JointId::Spine),
            skeleton.joint_index(JointId::Hips),
        ) else {
            return;
        };

        let hip_up_left = pose.diff(LeftHip, LeftShoulder);
        let hip_up_right = pose.diff(RightHip, RightShoulder);
        let hip_left = pose.diff(RightHip, LeftHip);
        let leg_left = pose.diff(LeftHip, LeftKnee);
        let leg_right = pose.diff(RightHip, RightKnee);

        let mut leg_normal = leg_right.cross(leg_left);
        let leg_left_n = leg_left.normalize_or_zero();
        let leg_right_n = leg_right.normalize_or_zero();

        let mut body_x = hip_left;
        let body_y = hip_up_left + hip_up_right;
        let convention = skeleton.convention();
        let flip = convention.display_to_avatar();
        let body_z = match convention {
            SkeletonConvention::Standard => body_x.cross(body_y),
            SkeletonConvention::VrmLike => {
                // VRM 的 x 与 z 和 glTF 相反
                body_x = -body_x;
                leg_normal = -leg_normal;
                body_x.cross(body_y)
            }
        };
        let body_x = (flip * body_x).normalize_or_zero();
        let body_y = (flip * body_y).normalize_or_zero();
        let body_z = (flip * body_z).normalize_or_zero();
        let leg_normal = (flip * leg_normal).normalize_or_zero();

        // 髋部只做左右旋转；任一条腿超出画面底部时归零，防止虚假转髋
        let hips_qt = align_vectors(Vec3::Z, leg_normal);
        let (_, _, mut yaw) = hips_qt.to_euler(EulerRot::XZY);
        if pose.get(LeftKnee).y > 1.0 || pose.get(RightKnee).y > 1.0 {
            yaw = 0.0;
        }
        let hips_qt = Quat::from_euler(EulerRot::XZY, 0.0, 0.0, yaw);
        // 双腿接近水平（出画面）时不旋转髋部
        if leg_left_n.y.abs() > HIP_LEG_VERTICAL_THRESHOLD
            && leg_right_n.y.abs() > HIP_LEG_VERTICAL_THRESHOLD
            && convention == SkeletonConvention::Standard
        {
            skeleton.set_rotation(hips_index, hips_qt);
        }

        // 脊柱：髋部当前坐标系 → 上身平面估计的对齐
        // 上身轴退化（关键点重合）时跳过，不向节点树传播 NaN
        if body_x.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
            || body_y.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
            || body_z.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
        {
            return;
        }
        let target = frame_matrix(body_x, body_y, body_z);
        let local = skeleton.node(hips_index).world().inverse() * target;
        skeleton.set_rotation(spine_index, rotation_of(local));
    }

    fn apply_legs(&self, skeleton: &mut SkeletonRegistry, pose: &LandmarkSet) {
        use PoseLandmark::*;
        let up_parent = match skeleton.convention() {
            SkeletonConvention::Standard => Vec3::new(0.0, -1.0, 0.0),
            SkeletonConvention::VrmLike => Vec3::Y,
        };

        if let Some(index) = skeleton.joint_index(JointId::UpperLeg(Side::Left)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                up_parent,
                pose.diff(LeftHip, LeftKnee),
            );
            skeleton.set_rotation(index, clamp_upper_leg(q, skeleton.convention()));
        }
        if let Some(index) = skeleton.joint_index(JointId::LowerLeg(Side::Left)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                pose.diff(LeftHip, LeftKnee),
                pose.diff(LeftKnee, LeftAnkle),
            );
            skeleton.set_rotation(index, zero_leg_twist(q));
        }
        if let Some(index) = skeleton.joint_index(JointId::UpperLeg(Side::Right)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                up_parent,
                pose.diff(RightHip, RightKnee),
            );
            skeleton.set_rotation(index, clamp_upper_leg(q, skeleton.convention()));
        }
        if let Some(index) = skeleton.joint_index(JointId::LowerLeg(Side::Right)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                pose.diff(RightHip, RightKnee),
                pose.diff(RightKnee, RightAnkle),
            );
            skeleton.set_rotation(index, zero_leg_twist(q));
        }
    }

    fn apply_arms(&self, skeleton: &mut SkeletonRegistry, pose: &LandmarkSet) {
        use PoseLandmark::*;

        if let Some(index) = skeleton.joint_index(JointId::UpperArm(Side::Left)) {
            // 非全身模式下没有可靠的肩线，用固定的水平参考向量
            let parent_vec = if self.full_body {
                pose.diff(RightShoulder, LeftShoulder)
            } else {
                Vec3::X
            };
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                parent_vec,
                pose.diff(LeftShoulder, LeftElbow),
            );
            skeleton.set_rotation(index, q);
        }
        if let Some(index) = skeleton.joint_index(JointId::LowerArm(Side::Left)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                pose.diff(LeftShoulder, LeftElbow),
                pose.diff(LeftElbow, LeftWrist),
            );
            skeleton.set_rotation(index, q);
        }
        if let Some(index) = skeleton.joint_index(JointId::UpperArm(Side::Right)) {
            let parent_vec = if self.full_body {
                pose.diff(LeftShoulder, RightShoulder)
            } else {
                Vec3::NEG_X
            };
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                parent_vec,
                pose.diff(RightShoulder, RightElbow),
            );
            skeleton.set_rotation(index, q);
        }
        if let Some(index) = skeleton.joint_index(JointId::LowerArm(Side::Right)) {
            let q = rotation_from_vector_pair(
                skeleton,
                index,
                pose.diff(RightShoulder, RightElbow),
                pose.diff(RightElbow, RightWrist),
            );
            skeleton.set_rotation(index, q);
        }
    }
}

impl Default for BodyRetargeter {
    fn default() -> Self {
        Self::new()
    }
}

/// 大腿旋转约束：左右摆动限 ±45°，沿腿方向的扭转固定
pub(crate) fn clamp_upper_leg(q: Quat, convention: SkeletonConvention) -> Quat {
    let (mut x, mut z, mut y) = q.to_euler(EulerRot::XZY);
    z = z.clamp(-UP_LEG_SWING_LIMIT, UP_LEG_SWING_LIMIT);
    match convention {
        SkeletonConvention::Standard => {
            y = PI;
            x = (x + 2.0 * PI) % (2.0 * PI);
            x = x.clamp(UP_LEG_PITCH_MIN, UP_LEG_PITCH_MAX);
        }
        SkeletonConvention::VrmLike => {
            y = 0.0;
            x = x.clamp(-VRM_UP_LEG_PITCH_LIMIT, VRM_UP_LEG_PITCH_LIMIT);
        }
    }
    Quat::from_euler(EulerRot::XZY, x, z, y)
}

/// 小腿：只消除扭转分量
pub(crate) fn zero_leg_twist(q: Quat) -> Quat {
    let (x, z, _) = q.to_euler(EulerRot::XZY);
    Quat::from_euler(EulerRot::XZY, x, z, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::PoseLandmark;
    use crate::skeleton::SceneNode;
    use glam::Vec3;

    /// T 形上身骨架：Hips → Spine → 肩 → 臂链 → 手 → 食指链
    fn upper_body_scene() -> Vec<SceneNode> {
        let bend = Quat::from_rotation_x(0.05);
        vec![
            SceneNode::plain("Armature", None, Vec3::ZERO),
            SceneNode::bone("Hips", Some(0), Vec3::new(0.0, 1.0, 0.0)),
            SceneNode::bone("Spine", Some(1), Vec3::new(0.0, 0.2, 0.0)),
            SceneNode::bone("LeftArm", Some(2), Vec3::new(0.2, 0.2, 0.0)),
            SceneNode::bone("LeftForeArm", Some(3), Vec3::new(0.25, 0.0, 0.0)),
            SceneNode::bone("LeftHand", Some(4), Vec3::new(0.25, 0.0, 0.0))
                .with_rotation(bend),
            SceneNode::bone("LeftHandIndex1", Some(5), Vec3::new(0.08, 0.0, 0.0))
                .with_rotation(bend),
            SceneNode::bone("LeftHandIndex2", Some(6), Vec3::new(0.03, 0.0, 0.0))
                .with_rotation(bend),
            SceneNode::bone("LeftHandIndex3", Some(7), Vec3::new(0.02, 0.0, 0.0))
                .with_rotation(bend),
            SceneNode::bone("RightArm", Some(2), Vec3::new(-0.2, 0.2, 0.0)),
            SceneNode::bone("RightForeArm", Some(9), Vec3::new(-0.25, 0.0, 0.0)),
            SceneNode::bone("RightHand", Some(10), Vec3::new(-0.25, 0.0, 0.0))
                .with_rotation(bend),
        ]
    }

    fn arm_pose() -> LandmarkSet {
        let mut points = vec![Vec3::ZERO; PoseLandmark::COUNT];
        points[PoseLandmark::LeftShoulder as usize] = Vec3::new(0.6, 0.3, 0.0);
        points[PoseLandmark::RightShoulder as usize] = Vec3::new(0.4, 0.3, 0.0);
        points[PoseLandmark::LeftElbow as usize] = Vec3::new(0.7, 0.45, 0.0);
        points[PoseLandmark::RightElbow as usize] = Vec3::new(0.3, 0.45, 0.0);
        points[PoseLandmark::LeftWrist as usize] = Vec3::new(0.75, 0.6, 0.0);
        points[PoseLandmark::RightWrist as usize] = Vec3::new(0.25, 0.6, 0.0);
        points[PoseLandmark::LeftHip as usize] = Vec3::new(0.55, 0.6, 0.0);
        points[PoseLandmark::RightHip as usize] = Vec3::new(0.45, 0.6, 0.0);
        points[PoseLandmark::LeftKnee as usize] = Vec3::new(0.55, 0.75, 0.0);
        points[PoseLandmark::RightKnee as usize] = Vec3::new(0.45, 0.75, 0.0);
        points[PoseLandmark::LeftAnkle as usize] = Vec3::new(0.55, 0.9, 0.0);
        points[PoseLandmark::RightAnkle as usize] = Vec3::new(0.45, 0.9, 0.0);
        LandmarkSet::new(points)
    }

    fn register(scene: &[SceneNode]) -> SkeletonRegistry {
        SkeletonRegistry::register(scene, crate::skeleton::SkeletonConvention::Standard).unwrap()
    }

    #[test]
    fn test_pose_rotates_arms() {
        let mut skeleton = register(&upper_body_scene());
        let retargeter = BodyRetargeter::new();
        let pose = arm_pose();
        retargeter.apply_frame(&mut skeleton, Some(&pose), None, None);

        let arm = skeleton.joint_node(JointId::UpperArm(Side::Left)).unwrap();
        assert!(arm.rotation().angle_between(arm.bind_rotation()) > 0.01);
        // 所有世界矩阵保持有限
        for i in 0..skeleton.node_count() {
            assert!(skeleton.node(i).world().is_finite());
        }
    }

    #[test]
    fn test_missing_hands_revert_to_bind() {
        let mut skeleton = register(&upper_body_scene());
        let retargeter = BodyRetargeter::new();
        let pose = arm_pose();
        retargeter.apply_frame(&mut skeleton, Some(&pose), None, None);

        for id in [
            JointId::Hand(Side::Left),
            JointId::Finger(Side::Left, crate::skeleton::FingerDigit::Index, 1),
            JointId::Finger(Side::Left, crate::skeleton::FingerDigit::Index, 2),
            JointId::Finger(Side::Left, crate::skeleton::FingerDigit::Index, 3),
            JointId::Hand(Side::Right),
        ] {
            let node = skeleton.joint_node(id).unwrap();
            assert_eq!(node.rotation(), node.bind_rotation(), "{:?}", id);
        }
        // 手以外的关节仍然吃到姿态
        let arm = skeleton.joint_node(JointId::UpperArm(Side::Left)).unwrap();
        assert!(arm.rotation().angle_between(arm.bind_rotation()) > 0.01);
    }

    #[test]
    fn test_missing_pose_reverts_body_to_bind() {
        let mut skeleton = register(&upper_body_scene());
        let retargeter = BodyRetargeter::new();
        let pose = arm_pose();
        retargeter.apply_frame(&mut skeleton, Some(&pose), None, None);
        retargeter.apply_frame(&mut skeleton, None, None, None);

        for id in [
            JointId::UpperArm(Side::Left),
            JointId::LowerArm(Side::Left),
            JointId::UpperArm(Side::Right),
            JointId::LowerArm(Side::Right),
            JointId::Spine,
        ] {
            let node = skeleton.joint_node(id).unwrap();
            assert_eq!(node.rotation(), node.bind_rotation(), "{:?}", id);
        }
    }

    #[test]
    fn test_bind_translation_stable_over_frames() {
        let mut skeleton = register(&upper_body_scene());
        let retargeter = BodyRetargeter::new();
        let pose = arm_pose();
        let before: Vec<_> = (0..skeleton.node_count())
            .map(|i| (skeleton.node(i).position(), skeleton.node(i).scale()))
            .collect();
        for _ in 0..30 {
            retargeter.apply_frame(&mut skeleton, Some(&pose), None, None);
        }
        for (i, (position, scale)) in before.iter().enumerate() {
            assert_eq!(skeleton.node(i).position(), *position);
            assert_eq!(skeleton.node(i).scale(), *scale);
        }
    }

    #[test]
    fn test_upper_leg_swing_clamped_to_45_degrees() {
        // 70° 的原始摆动角必须被夹到恰好 45°
        let raw = Quat::from_euler(EulerRot::XZY, 0.0, 70.0 * DEG, 0.0);
        let clamped = clamp_upper_leg(raw, SkeletonConvention::VrmLike);
        let (_, z, y) = clamped.to_euler(EulerRot::XZY);
        assert!((z - 45.0 * DEG).abs() < 1e-5, "swing {} rad", z);
        assert!(y.abs() < 1e-5);
    }

    #[test]
    fn test_upper_leg_twist_pinned_standard() {
        let raw = Quat::from_euler(EulerRot::XZY, 100.0 * DEG, 0.2, 0.4);
        let clamped = clamp_upper_leg(raw, SkeletonConvention::Standard);
        let expected = Quat::from_euler(EulerRot::XZY, 100.0 * DEG, 0.2, PI);
        assert!(clamped.dot(expected).abs() > 0.999);
    }

    #[test]
    fn test_lower_leg_twist_zeroed() {
        let raw = Quat::from_euler(EulerRot::XZY, 0.5, 0.2, 0.7);
        let fixed = zero_leg_twist(raw);
        let (x, z, y) = fixed.to_euler(EulerRot::XZY);
        assert!(y.abs() < 1e-5);
        assert!((x - 0.5).abs() < 1e-4);
        assert!((z - 0.2).abs() < 1e-4);
    }
}
