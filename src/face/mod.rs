//! 面部工具 - BlendShape 词汇表、名称变换、头部姿态换算与滤波

mod filter;

pub use filter::KalmanFilter;

use std::collections::HashMap;

use glam::{EulerRot, Quat};
use once_cell::sync::Lazy;

/// 线性区间映射 [in_a, in_b] → [out_a, out_b]，输入越界时停在端点
///
/// 源/目标区间相同时等价于截断。假定 in_a < in_b。
pub fn range_transform(in_a: f32, in_b: f32, out_a: f32, out_b: f32, value: f32) -> f32 {
    if value < in_a {
        return out_a;
    }
    if value > in_b {
        return out_b;
    }
    (value - in_a) / (in_b - in_a) * (out_b - out_a) + out_a
}

/// [min, max] → [0, 1]
pub fn remap(value: f32, min: f32, max: f32) -> f32 {
    (value.clamp(min, max) - min) / (max - min)
}

/// 头部姿态角；单位是半 π 的倍数，与 blendshape 数值同量级
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// 头部朝向四元数 → 偏航/俯仰/滚转
pub fn face_rotation_to_angles(rotation: Quat) -> HeadAngles {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    let half_pi = std::f32::consts::FRAC_PI_2;
    HeadAngles {
        yaw: y / half_pi,
        pitch: x / half_pi,
        roll: z / half_pi,
    }
}

/// ARKit 标准的 52 个 blendshape 系数名
pub const ARKIT_BLENDSHAPE_NAMES: &[&str] = &[
    "eyeBlinkLeft",
    "eyeLookDownLeft",
    "eyeLookInLeft",
    "eyeLookOutLeft",
    "eyeLookUpLeft",
    "eyeSquintLeft",
    "eyeWideLeft",
    "eyeBlinkRight",
    "eyeLookDownRight",
    "eyeLookInRight",
    "eyeLookOutRight",
    "eyeLookUpRight",
    "eyeSquintRight",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawRight",
    "jawOpen",
    "mouthClose",
    "mouthFunnel",
    "mouthPucker",
    "mouthLeft",
    "mouthRight",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "noseSneerLeft",
    "noseSneerRight",
    "tongueOut",
];

/// Apple 命名 → 重定向用命名（_L/_R 后缀风格）
static APPLE_TO_RETARGET: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("eyeBlinkLeft", "eyeBlink_L"),
        ("eyeSquintLeft", "eyeSquint_L"),
        ("eyeWideLeft", "eyeWide_L"),
        ("eyeLookUpLeft", "eyeLookUp_L"),
        ("eyeLookDownLeft", "eyeLookDown_L"),
        ("eyeLookInLeft", "eyeLookIn_L"),
        ("eyeLookOutLeft", "eyeLookOut_L"),
        ("eyeBlinkRight", "eyeBlink_R"),
        ("eyeSquintRight", "eyeSquint_R"),
        ("eyeWideRight", "eyeWide_R"),
        ("eyeLookUpRight", "eyeLookUp_R"),
        ("eyeLookDownRight", "eyeLookDown_R"),
        ("eyeLookInRight", "eyeLookIn_R"),
        ("eyeLookOutRight", "eyeLookOut_R"),
        ("jawOpen", "jawOpen"),
        ("jawLeft", "jawLeft"),
        ("jawRight", "jawRight"),
        ("mouthLeft", "mouthLeft"),
        ("mouthRight", "mouthRight"),
        ("mouthFunnel", "mouthFunnel"),
        ("mouthPucker", "mouthPucker"),
        ("mouthSmileLeft", "mouthSmile_L"),
        ("mouthSmileRight", "mouthSmile_R"),
        ("mouthFrownLeft", "mouthFrown_L"),
        ("mouthFrownRight", "mouthFrown_R"),
        ("mouthRollLower", "mouthRollLower"),
        ("mouthRollUpper", "mouthRollUpper"),
        ("mouthShrugUpper", "mouthShrugUpper"),
        ("mouthUpperUpLeft", "mouthUpperUp_L"),
        ("mouthUpperUpRight", "mouthUpperUp_R"),
        ("mouthLowerDownLeft", "mouthLowerDown_L"),
        ("mouthLowerDownRight", "mouthLowerDown_R"),
        ("browDownLeft", "browDown_L"),
        ("browDownRight", "browDown_R"),
        ("browInnerUp", "browInnerUp_L"),
        ("browOuterUpLeft", "browOuterUp_L"),
        ("browOuterUpRight", "browOuterUp_R"),
        ("cheekPuff", "cheekPuff"),
        ("noseSneerLeft", "noseSneer_L"),
        ("noseSneerRight", "noseSneer_R"),
    ])
});

/// 从网格 morph 名称字典抽取 ARKit 子集（原字典可以是超集）
pub fn extract_arkit_morph_targets(dict: &HashMap<String, usize>) -> HashMap<String, usize> {
    ARKIT_BLENDSHAPE_NAMES
        .iter()
        .filter_map(|name| dict.get(*name).map(|&index| ((*name).to_string(), index)))
        .collect()
}

/// Apple 命名字典 → 重定向命名字典；不在映射表里的名称丢弃
pub fn apple_dictionary_transform(dict: &HashMap<String, usize>) -> HashMap<String, usize> {
    dict.iter()
        .filter_map(|(name, &index)| {
            APPLE_TO_RETARGET
                .get(name.as_str())
                .map(|renamed| ((*renamed).to_string(), index))
        })
        .collect()
}

/// 镜像显示：互换 _L/_R 后缀系数的数值
///
/// 对侧系数缺失时保留自身数值（不产生空洞）。
pub fn flip_blendshapes(blendshapes: &[(String, f32)]) -> Vec<(String, f32)> {
    let dict: HashMap<&str, f32> = blendshapes
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();

    blendshapes
        .iter()
        .map(|(name, value)| {
            let mirrored = if let Some(base) = name.strip_suffix("_L") {
                dict.get(format!("{}_R", base).as_str()).copied()
            } else if let Some(base) = name.strip_suffix("_R") {
                dict.get(format!("{}_L", base).as_str()).copied()
            } else {
                None
            };
            (name.clone(), mirrored.unwrap_or(*value))
        })
        .collect()
}
