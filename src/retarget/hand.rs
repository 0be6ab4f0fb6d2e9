//! 手部与手指求解 - 掌面坐标系、前臂+手两段求解、手指链

use glam::{EulerRot, Quat, Vec3};

use crate::landmark::{HandLandmark, LandmarkSet};
use crate::skeleton::{
    hand_chain_joints, FingerDigit, JointId, Side, SkeletonConvention, SkeletonRegistry,
};

use super::math::{frame_matrix, rotation_from_vector_pair, rotation_of};

const DEG: f32 = std::f32::consts::PI / 180.0;

/// 手指侧向/扭转限制 ±5°
const FINGER_SIDE_LIMIT: f32 = 5.0 * DEG;
/// 手指弯曲范围 -10°..90°
const FINGER_BEND_MIN: f32 = -10.0 * DEG;
const FINGER_BEND_MAX: f32 = 90.0 * DEG;

/// 掌面坐标系（角色空间）与手指近端参考向量（显示空间）
struct PalmFrame {
    x: Vec3,
    y: Vec3,
    z: Vec3,
    /// 腕→四指根部向量之和；显示空间，手指第一关节的参考方向
    finger_reference: Vec3,
}

/// 从手部关键点几何构造掌面坐标系
///
/// 轴由腕→指根向量的和与叉积给出；两种约定的轴排布不同，
/// 左右手的叉积顺序互为镜像。
fn palm_frame(hand: &LandmarkSet, side: Side, convention: SkeletonConvention) -> PalmFrame {
    use HandLandmark::*;
    let index = hand.diff(Wrist, IndexMcp);
    let middle = hand.diff(Wrist, MiddleMcp);
    let ring = hand.diff(Wrist, RingMcp);
    let pinky = hand.diff(Wrist, PinkyMcp);
    let spread = index + pinky + middle + ring;

    let flip = convention.display_to_avatar();
    let (x, y, z) = match convention {
        SkeletonConvention::Standard => {
            // y 沿四指平均方向，z 指向掌心外侧
            let y = spread;
            let z = match side {
                Side::Left => pinky.cross(index),
                Side::Right => index.cross(pinky),
            };
            let x = y.cross(z);
            (x, y, z)
        }
        SkeletonConvention::VrmLike => {
            // x 沿四指平均方向的反向（左手），y 指向掌心内侧
            let x = match side {
                Side::Left => -spread,
                Side::Right => spread,
            };
            let y = match side {
                Side::Left => index.cross(pinky),
                Side::Right => pinky.cross(index),
            };
            let z = x.cross(y);
            (x, y, z)
        }
    };

    PalmFrame {
        x: (flip * x).normalize_or_zero(),
        y: (flip * y).normalize_or_zero(),
        z: (flip * z).normalize_or_zero(),
        finger_reference: spread,
    }
}

impl PalmFrame {
    /// 关键点重合时轴退化为零向量；此时掌面帧不可用
    fn is_degenerate(&self) -> bool {
        self.x.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
            || self.y.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
            || self.z.length_squared() < super::math::MIN_DIRECTION_LEN_SQ
    }
}

/// 单侧手链入口
///
/// 手部关键点缺失时，腕与全部手指回退绑定旋转，避免停在
/// 上一帧的"爪形"。
pub(crate) fn apply_hand_chain(
    skeleton: &mut SkeletonRegistry,
    side: Side,
    hand: Option<&LandmarkSet>,
) {
    let Some(hand) = hand else {
        for id in hand_chain_joints(side) {
            skeleton.reset_joint_to_bind(id);
        }
        return;
    };

    let frame = palm_frame(hand, side, skeleton.convention());
    if let Some(hand_index) = skeleton.joint_index(JointId::Hand(side)) {
        if frame.is_degenerate() {
            // 退化几何回退单位旋转，不向节点树传播 NaN
            skeleton.set_rotation(hand_index, Quat::IDENTITY);
        } else {
            solve_forearm_then_hand(skeleton, hand_index, &frame);
        }
    }

    use HandLandmark::*;
    // 拇指不加角度约束（自由度本来就大）
    rotate_thumb(
        skeleton,
        side,
        hand,
        frame.finger_reference,
        [ThumbMcp, ThumbIp, ThumbTip],
    );
    rotate_finger(
        skeleton,
        side,
        FingerDigit::Index,
        hand,
        frame.finger_reference,
        [IndexMcp, IndexPip, IndexDip, IndexTip],
    );
    rotate_finger(
        skeleton,
        side,
        FingerDigit::Middle,
        hand,
        frame.finger_reference,
        [MiddleMcp, MiddlePip, MiddleDip, MiddleTip],
    );
    rotate_finger(
        skeleton,
        side,
        FingerDigit::Ring,
        hand,
        frame.finger_reference,
        [RingMcp, RingPip, RingDip, RingTip],
    );
    rotate_finger(
        skeleton,
        side,
        FingerDigit::Pinky,
        hand,
        frame.finger_reference,
        [PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
    );
}

/// 前臂+手两段求解
///
/// 顺序是硬性契约：先把掌面目标帧的扭转分量给前臂，再基于
/// 更新后的前臂世界矩阵解手腕。对着旧前臂坐标系解手腕会产生
/// 明显扭曲的手腕。
fn solve_forearm_then_hand(
    skeleton: &mut SkeletonRegistry,
    hand_index: usize,
    frame: &PalmFrame,
) {
    let target = frame_matrix(frame.x, frame.y, frame.z);

    let Some(forearm_index) = skeleton.node(hand_index).parent() else {
        let local = skeleton.parent_world(hand_index).inverse() * target;
        skeleton.set_rotation(hand_index, rotation_of(local));
        return;
    };

    // 掌面目标帧在前臂局部坐标系下的旋转
    let desired = rotation_of(skeleton.node(forearm_index).world().inverse() * target);
    let forearm_qt = match skeleton.convention() {
        SkeletonConvention::Standard => {
            // y 为前臂扭转轴
            let (_, _, desired_twist) = desired.to_euler(EulerRot::XZY);
            let (x, z, _) = skeleton.node(forearm_index).rotation().to_euler(EulerRot::XZY);
            Quat::from_euler(EulerRot::XZY, x, z, desired_twist)
        }
        SkeletonConvention::VrmLike => {
            // x 为前臂扭转轴
            let (_, _, desired_twist) = desired.to_euler(EulerRot::ZYX);
            let (z, y, _) = skeleton.node(forearm_index).rotation().to_euler(EulerRot::ZYX);
            Quat::from_euler(EulerRot::ZYX, z, y, desired_twist)
        }
    };
    skeleton.set_rotation(forearm_index, forearm_qt);

    // 前臂世界矩阵已更新，重新求手腕
    let local = skeleton.node(forearm_index).world().inverse() * target;
    skeleton.set_rotation(hand_index, rotation_of(local));
}

fn rotate_thumb(
    skeleton: &mut SkeletonRegistry,
    side: Side,
    hand: &LandmarkSet,
    reference: Vec3,
    landmarks: [HandLandmark; 3],
) {
    let joints = [
        JointId::Finger(side, FingerDigit::Thumb, 1),
        JointId::Finger(side, FingerDigit::Thumb, 2),
        JointId::Finger(side, FingerDigit::Thumb, 3),
    ];
    let Some(indices) = resolve_chain(skeleton, joints) else {
        return;
    };

    let seg1 = hand.diff(HandLandmark::Wrist, landmarks[0]);
    let seg2 = hand.diff(landmarks[0], landmarks[1]);
    let seg3 = hand.diff(landmarks[1], landmarks[2]);

    let q = rotation_from_vector_pair(skeleton, indices[0], reference, seg1);
    skeleton.set_rotation(indices[0], q);
    let q = rotation_from_vector_pair(skeleton, indices[1], seg1, seg2);
    skeleton.set_rotation(indices[1], q);
    let q = rotation_from_vector_pair(skeleton, indices[2], seg2, seg3);
    skeleton.set_rotation(indices[2], q);
}

fn rotate_finger(
    skeleton: &mut SkeletonRegistry,
    side: Side,
    digit: FingerDigit,
    hand: &LandmarkSet,
    reference: Vec3,
    landmarks: [HandLandmark; 4],
) {
    let joints = [
        JointId::Finger(side, digit, 1),
        JointId::Finger(side, digit, 2),
        JointId::Finger(side, digit, 3),
    ];
    let Some(indices) = resolve_chain(skeleton, joints) else {
        return;
    };

    let seg1 = hand.diff(landmarks[0], landmarks[1]);
    let seg2 = hand.diff(landmarks[1], landmarks[2]);
    let seg3 = hand.diff(landmarks[2], landmarks[3]);
    let convention = skeleton.convention();

    let q = rotation_from_vector_pair(skeleton, indices[0], reference, seg1);
    skeleton.set_rotation(indices[0], clamp_finger(q, convention, side));
    let q = rotation_from_vector_pair(skeleton, indices[1], seg1, seg2);
    skeleton.set_rotation(indices[1], clamp_finger(q, convention, side));
    let q = rotation_from_vector_pair(skeleton, indices[2], seg2, seg3);
    skeleton.set_rotation(indices[2], clamp_finger(q, convention, side));
}

/// 三关节链整链解析；缺任何一节就整链跳过
fn resolve_chain(skeleton: &SkeletonRegistry, joints: [JointId; 3]) -> Option<[usize; 3]> {
    Some([
        skeleton.joint_index(joints[0])?,
        skeleton.joint_index(joints[1])?,
        skeleton.joint_index(joints[2])?,
    ])
}

/// 手指角度约束：弯曲并入单轴并限 -10°..90°，其余轴限 ±5°
///
/// 防止噪声指尖关键点造成的过伸；右手在 VRM 约定下弯曲轴取反。
pub(crate) fn clamp_finger(q: Quat, convention: SkeletonConvention, side: Side) -> Quat {
    let (x, z, y) = q.to_euler(EulerRot::XZY);
    match convention {
        SkeletonConvention::Standard => {
            let y = y.clamp(-FINGER_SIDE_LIMIT, FINGER_SIDE_LIMIT);
            let bend = (x.abs() + z.abs()).clamp(FINGER_BEND_MIN, FINGER_BEND_MAX);
            let z = z.clamp(-FINGER_SIDE_LIMIT, FINGER_SIDE_LIMIT);
            Quat::from_euler(EulerRot::XZY, bend, z, y)
        }
        SkeletonConvention::VrmLike => {
            let x = x.clamp(-FINGER_SIDE_LIMIT, FINGER_SIDE_LIMIT);
            let mut bend = (z.abs() + y.abs()).clamp(FINGER_BEND_MIN, FINGER_BEND_MAX);
            if side == Side::Right {
                bend = -bend;
            }
            let y = y.clamp(-FINGER_SIDE_LIMIT, FINGER_SIDE_LIMIT);
            Quat::from_euler(EulerRot::XZY, x, bend, y)
        }
    }
}
