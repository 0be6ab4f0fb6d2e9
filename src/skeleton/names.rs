//! 规范关节命名与两种骨骼命名约定的解析
//!
//! 节点名通过子串匹配解析到规范关节集合。词汇表按约定分表、
//! 特殊名在前（Spine2 先于 Spine，手指先于手），注册时解析一次，
//! 之后每帧不再做任何字符串扫描。

use super::SkeletonConvention;

/// 左右侧
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// 五根手指
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FingerDigit {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

/// 规范关节集合；两种命名约定都解析到这里
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointId {
    Hips,
    Spine,
    Spine1,
    Spine2,
    Neck,
    Head,
    Shoulder(Side),
    UpperArm(Side),
    LowerArm(Side),
    Hand(Side),
    /// 手指关节，segment ∈ 1..=3（近端→远端）
    Finger(Side, FingerDigit, u8),
    UpperLeg(Side),
    LowerLeg(Side),
}

use FingerDigit::{Index, Middle, Pinky, Ring, Thumb};
use JointId::*;
use Side::{Left, Right};

/// Mixamo/glTF 风格命名
static STANDARD_VOCABULARY: &[(&str, JointId)] = &[
    ("Spine2", Spine2),
    ("Spine1", Spine1),
    ("Spine", Spine),
    ("Hips", Hips),
    ("Neck", Neck),
    ("Head", Head),
    ("LeftShoulder", Shoulder(Left)),
    ("RightShoulder", Shoulder(Right)),
    ("LeftHandThumb1", Finger(Left, Thumb, 1)),
    ("LeftHandThumb2", Finger(Left, Thumb, 2)),
    ("LeftHandThumb3", Finger(Left, Thumb, 3)),
    ("LeftHandIndex1", Finger(Left, Index, 1)),
    ("LeftHandIndex2", Finger(Left, Index, 2)),
    ("LeftHandIndex3", Finger(Left, Index, 3)),
    ("LeftHandMiddle1", Finger(Left, Middle, 1)),
    ("LeftHandMiddle2", Finger(Left, Middle, 2)),
    ("LeftHandMiddle3", Finger(Left, Middle, 3)),
    ("LeftHandRing1", Finger(Left, Ring, 1)),
    ("LeftHandRing2", Finger(Left, Ring, 2)),
    ("LeftHandRing3", Finger(Left, Ring, 3)),
    ("LeftHandPinky1", Finger(Left, Pinky, 1)),
    ("LeftHandPinky2", Finger(Left, Pinky, 2)),
    ("LeftHandPinky3", Finger(Left, Pinky, 3)),
    ("RightHandThumb1", Finger(Right, Thumb, 1)),
    ("RightHandThumb2", Finger(Right, Thumb, 2)),
    ("RightHandThumb3", Finger(Right, Thumb, 3)),
    ("RightHandIndex1", Finger(Right, Index, 1)),
    ("RightHandIndex2", Finger(Right, Index, 2)),
    ("RightHandIndex3", Finger(Right, Index, 3)),
    ("RightHandMiddle1", Finger(Right, Middle, 1)),
    ("RightHandMiddle2", Finger(Right, Middle, 2)),
    ("RightHandMiddle3", Finger(Right, Middle, 3)),
    ("RightHandRing1", Finger(Right, Ring, 1)),
    ("RightHandRing2", Finger(Right, Ring, 2)),
    ("RightHandRing3", Finger(Right, Ring, 3)),
    ("RightHandPinky1", Finger(Right, Pinky, 1)),
    ("RightHandPinky2", Finger(Right, Pinky, 2)),
    ("RightHandPinky3", Finger(Right, Pinky, 3)),
    ("LeftForeArm", LowerArm(Left)),
    ("RightForeArm", LowerArm(Right)),
    ("LeftHand", Hand(Left)),
    ("RightHand", Hand(Right)),
    ("LeftArm", UpperArm(Left)),
    ("RightArm", UpperArm(Right)),
    ("LeftUpLeg", UpperLeg(Left)),
    ("RightUpLeg", UpperLeg(Right)),
    ("LeftLeg", LowerLeg(Left)),
    ("RightLeg", LowerLeg(Right)),
];

/// VRM 风格命名（L_/R_ 前缀）
static VRM_VOCABULARY: &[(&str, JointId)] = &[
    ("C_UpperChest", Spine2),
    ("C_Chest", Spine1),
    ("C_Spine", Spine),
    ("C_Hips", Hips),
    ("C_Neck", Neck),
    ("C_Head", Head),
    ("L_Shoulder", Shoulder(Left)),
    ("R_Shoulder", Shoulder(Right)),
    ("L_Thumb1", Finger(Left, Thumb, 1)),
    ("L_Thumb2", Finger(Left, Thumb, 2)),
    ("L_Thumb3", Finger(Left, Thumb, 3)),
    ("L_Index1", Finger(Left, Index, 1)),
    ("L_Index2", Finger(Left, Index, 2)),
    ("L_Index3", Finger(Left, Index, 3)),
    ("L_Middle1", Finger(Left, Middle, 1)),
    ("L_Middle2", Finger(Left, Middle, 2)),
    ("L_Middle3", Finger(Left, Middle, 3)),
    ("L_Ring1", Finger(Left, Ring, 1)),
    ("L_Ring2", Finger(Left, Ring, 2)),
    ("L_Ring3", Finger(Left, Ring, 3)),
    ("L_Little1", Finger(Left, Pinky, 1)),
    ("L_Little2", Finger(Left, Pinky, 2)),
    ("L_Little3", Finger(Left, Pinky, 3)),
    ("R_Thumb1", Finger(Right, Thumb, 1)),
    ("R_Thumb2", Finger(Right, Thumb, 2)),
    ("R_Thumb3", Finger(Right, Thumb, 3)),
    ("R_Index1", Finger(Right, Index, 1)),
    ("R_Index2", Finger(Right, Index, 2)),
    ("R_Index3", Finger(Right, Index, 3)),
    ("R_Middle1", Finger(Right, Middle, 1)),
    ("R_Middle2", Finger(Right, Middle, 2)),
    ("R_Middle3", Finger(Right, Middle, 3)),
    ("R_Ring1", Finger(Right, Ring, 1)),
    ("R_Ring2", Finger(Right, Ring, 2)),
    ("R_Ring3", Finger(Right, Ring, 3)),
    ("R_Little1", Finger(Right, Pinky, 1)),
    ("R_Little2", Finger(Right, Pinky, 2)),
    ("R_Little3", Finger(Right, Pinky, 3)),
    ("L_UpperArm", UpperArm(Left)),
    ("L_LowerArm", LowerArm(Left)),
    ("L_Hand", Hand(Left)),
    ("R_UpperArm", UpperArm(Right)),
    ("R_LowerArm", LowerArm(Right)),
    ("R_Hand", Hand(Right)),
    ("L_UpperLeg", UpperLeg(Left)),
    ("L_LowerLeg", LowerLeg(Left)),
    ("R_UpperLeg", UpperLeg(Right)),
    ("R_LowerLeg", LowerLeg(Right)),
];

pub(crate) fn vocabulary(convention: SkeletonConvention) -> &'static [(&'static str, JointId)] {
    match convention {
        SkeletonConvention::Standard => STANDARD_VOCABULARY,
        SkeletonConvention::VrmLike => VRM_VOCABULARY,
    }
}

/// 节点名 → 规范关节；子串匹配，首个命中生效
pub fn resolve_joint_name(name: &str, convention: SkeletonConvention) -> Option<JointId> {
    convention
        .vocabulary()
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|(_, joint)| *joint)
}

/// 脊柱链关节；注册时额外保留一份参考帧快照
pub(crate) const REFERENCE_JOINTS: [JointId; 6] = [
    Hips,
    Spine,
    Spine1,
    Spine2,
    Shoulder(Left),
    Shoulder(Right),
];

/// 由姿态关键点驱动的关节；姿态缺失时整组回退绑定姿势
pub(crate) const POSE_DRIVEN_JOINTS: [JointId; 10] = [
    Hips,
    Spine,
    UpperArm(Left),
    UpperArm(Right),
    LowerArm(Left),
    LowerArm(Right),
    UpperLeg(Left),
    UpperLeg(Right),
    LowerLeg(Left),
    LowerLeg(Right),
];

/// 单侧手链：腕 + 15 个手指关节
pub(crate) fn hand_chain_joints(side: Side) -> [JointId; 16] {
    [
        Hand(side),
        Finger(side, Thumb, 1),
        Finger(side, Thumb, 2),
        Finger(side, Thumb, 3),
        Finger(side, Index, 1),
        Finger(side, Index, 2),
        Finger(side, Index, 3),
        Finger(side, Middle, 1),
        Finger(side, Middle, 2),
        Finger(side, Middle, 3),
        Finger(side, Ring, 1),
        Finger(side, Ring, 2),
        Finger(side, Ring, 3),
        Finger(side, Pinky, 1),
        Finger(side, Pinky, 2),
        Finger(side, Pinky, 3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_resolution() {
        let conv = SkeletonConvention::Standard;
        assert_eq!(resolve_joint_name("mixamorig:Hips", conv), Some(Hips));
        assert_eq!(resolve_joint_name("Spine1", conv), Some(Spine1));
        assert_eq!(resolve_joint_name("Spine", conv), Some(Spine));
        assert_eq!(
            resolve_joint_name("LeftHandThumb2", conv),
            Some(Finger(Left, Thumb, 2))
        );
        assert_eq!(resolve_joint_name("LeftHand", conv), Some(Hand(Left)));
        assert_eq!(resolve_joint_name("LeftForeArm", conv), Some(LowerArm(Left)));
        assert_eq!(resolve_joint_name("LeftArm", conv), Some(UpperArm(Left)));
        assert_eq!(resolve_joint_name("RightUpLeg", conv), Some(UpperLeg(Right)));
        assert_eq!(resolve_joint_name("RightLeg", conv), Some(LowerLeg(Right)));
        assert_eq!(resolve_joint_name("Prop_Sword", conv), None);
    }

    #[test]
    fn test_vrm_resolution() {
        let conv = SkeletonConvention::VrmLike;
        assert_eq!(resolve_joint_name("J_Bip_C_Hips", conv), Some(Hips));
        assert_eq!(resolve_joint_name("J_Bip_C_UpperChest", conv), Some(Spine2));
        assert_eq!(resolve_joint_name("J_Bip_C_Chest", conv), Some(Spine1));
        assert_eq!(
            resolve_joint_name("J_Bip_L_Little3", conv),
            Some(Finger(Left, Pinky, 3))
        );
        assert_eq!(resolve_joint_name("J_Bip_R_Hand", conv), Some(Hand(Right)));
        assert_eq!(
            resolve_joint_name("J_Bip_L_LowerArm", conv),
            Some(LowerArm(Left))
        );
    }

    #[test]
    fn test_finger_before_hand() {
        // 手指名包含手名，必须先命中手指条目
        let conv = SkeletonConvention::Standard;
        assert_ne!(
            resolve_joint_name("RightHandIndex1", conv),
            Some(Hand(Right))
        );
    }
}
