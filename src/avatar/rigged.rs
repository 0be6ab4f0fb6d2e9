//! 骨骼驱动模型运行时（glTF / VRM）
//!
//! 每帧顺序：morph 混合 → 表情叠加 → 骨骼重定向 → 呼吸附加。
//! 面部与身体预测互相独立，任何一路缺失都不会影响另一路。

use std::collections::HashMap;

use glam::Vec3;

use crate::expression::{ExpressionOverlay, ExpressionPreset};
use crate::face::{face_rotation_to_angles, flip_blendshapes};
use crate::landmark::{FacePrediction, PosePrediction};
use crate::morph::MorphTargetBlender;
use crate::retarget::BodyRetargeter;
use crate::skeleton::{JointId, SceneNode, SkeletonConvention, SkeletonRegistry};
use crate::Result;

use super::{AvatarConfig, BreathingMotor};

/// 骨骼驱动的模型运行时；持有注册表与全部混合子系统，
/// 模型卸载时整体销毁，不留进程级状态
pub struct RiggedAvatar {
    skeleton: SkeletonRegistry,
    retargeter: BodyRetargeter,
    morphs: MorphTargetBlender,
    expressions: ExpressionOverlay,
    breathing_motor: BreathingMotor,
    config: AvatarConfig,
    lip_sync_level: f32,
    model_offset: Vec3,
    pivot_rotation: Vec3,
}

impl RiggedAvatar {
    pub fn new(scene: &[SceneNode], convention: SkeletonConvention) -> Result<Self> {
        let config = AvatarConfig::for_convention(convention);
        Self::with_config(scene, convention, config)
    }

    pub fn with_config(
        scene: &[SceneNode],
        convention: SkeletonConvention,
        config: AvatarConfig,
    ) -> Result<Self> {
        let skeleton = SkeletonRegistry::register(scene, convention)?;
        let mut retargeter = BodyRetargeter::new();
        retargeter.set_full_body(config.full_body);
        Ok(Self {
            skeleton,
            retargeter,
            morphs: MorphTargetBlender::new(),
            expressions: ExpressionOverlay::with_step(Vec::new(), config.expression_step),
            breathing_motor: BreathingMotor::new(),
            config,
            lip_sync_level: 0.0,
            model_offset: Vec3::ZERO,
            pivot_rotation: Vec3::ZERO,
        })
    }

    /// 注册一个网格组件的 morph 名称字典；加载时每组件一次
    pub fn register_morph_component(
        &mut self,
        channel_count: usize,
        name_to_index: HashMap<String, usize>,
    ) -> usize {
        self.morphs.register_component(channel_count, name_to_index)
    }

    /// 加载表情预设；参数默认值取同名 morph 通道的当前权重
    pub fn load_expressions(&mut self, presets: Vec<ExpressionPreset>) {
        let mut overlay = ExpressionOverlay::with_step(presets, self.config.expression_step);
        let morphs = &self.morphs;
        overlay.assign_defaults(|id| morphs.channel_value(id));
        self.expressions = overlay;
    }

    /// 激活/停用表情集合
    pub fn activate_expressions(&mut self, names: &[&str]) {
        self.expressions.activate_set(names);
    }

    /// 音频口型强度（叠加到 jawOpen）
    pub fn update_lip_sync(&mut self, volume: f32) {
        self.lip_sync_level = volume;
    }

    pub fn set_full_body(&mut self, full_body: bool) {
        self.config.full_body = full_body;
        self.retargeter.set_full_body(full_body);
    }

    pub fn skeleton(&self) -> &SkeletonRegistry {
        &self.skeleton
    }

    pub fn morphs(&self) -> &MorphTargetBlender {
        &self.morphs
    }

    pub fn expressions(&self) -> &ExpressionOverlay {
        &self.expressions
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AvatarConfig {
        &mut self.config
    }

    /// 面部追踪产生的模型平移；由宿主施加到模型根节点
    /// （不写进骨骼平移，绑定位移保持逐位不变）
    pub fn model_offset(&self) -> Vec3 {
        self.model_offset
    }

    /// 颈部关节缺失时的整体旋转回退；由宿主施加到模型枢轴
    pub fn pivot_rotation(&self) -> Vec3 {
        self.pivot_rotation
    }

    /// 每帧入口
    pub fn update_frame(&mut self, face: Option<&FacePrediction>, body: Option<&PosePrediction>) {
        if let Some(face) = face {
            self.apply_face(face);
        }

        // 表情参数向目标推进并写回 morph 通道
        let morphs = &mut self.morphs;
        self.expressions.tick(|id, value| morphs.set_value(id, value));

        // 身体预测整体缺失视同所有关键点缺失：相应关节回退绑定姿势
        let empty = PosePrediction::default();
        let body = body.unwrap_or(&empty);
        self.retargeter.apply_frame(
            &mut self.skeleton,
            body.pose.as_ref(),
            body.left_hand.as_ref(),
            body.right_hand.as_ref(),
        );

        if self.config.breathing {
            self.apply_breathing();
        }
    }

    fn apply_face(&mut self, face: &FacePrediction) {
        // 镜像显示的左右互换后逐项写入
        for (name, value) in flip_blendshapes(&face.blendshapes) {
            self.morphs.set_value(&name, value);
        }
        // 嘴部动作放大
        self.morphs
            .magnify("jawOpen", self.config.jaw_open_magnification);
        // 音频口型叠加
        self.morphs.increment("jawOpen", self.lip_sync_level);

        // 颈部旋转：头部朝向 → 欧拉角，按配置顺序填槽
        let angles = face_rotation_to_angles(face.rotation);
        let rotate_x =
            angles.pitch * self.config.head_pitch_multiplier + self.config.neck_assist_x;
        let rotate_y = -angles.yaw * self.config.head_yaw_multiplier + self.config.neck_assist_y;
        let rotate_z = -angles.roll * self.config.head_roll_multiplier + self.config.neck_assist_z;
        let order = self.config.neck_rotation_order;
        let rotated = self.skeleton.set_joint_euler(
            JointId::Neck,
            order[0].pick(rotate_x, rotate_y, rotate_z),
            order[1].pick(rotate_x, rotate_y, rotate_z),
            order[2].pick(rotate_x, rotate_y, rotate_z),
        );
        if !rotated {
            // 没有颈部关节就导出整体旋转，让宿主转动整个模型
            self.pivot_rotation = Vec3::new(rotate_x, rotate_y, rotate_z);
        }

        // 面部位置驱动的模型平移
        if self.config.free_move {
            let dx = face.image_position.x - 0.5;
            let dy = face.image_position.y - 0.5;
            let dz = face.image_scale - self.config.face_scale_reference;
            self.model_offset = match self.skeleton.convention() {
                SkeletonConvention::Standard => Vec3::new(
                    -dx * self.config.face_move_multiplier,
                    dy * self.config.face_move_multiplier,
                    dz * self.config.face_depth_multiplier,
                ),
                SkeletonConvention::VrmLike => Vec3::new(
                    dx * self.config.face_move_multiplier,
                    dy * self.config.face_move_multiplier,
                    -dz * self.config.face_depth_multiplier,
                ),
            };
        }
    }

    /// 呼吸：脊柱/颈部的小幅正弦附加旋转
    fn apply_breathing(&mut self) {
        let spine_x = self.breathing_motor.sin_offset(800.0, false);
        let neck_x = self.breathing_motor.sin_offset(800.0, false);
        let neck_y = self.breathing_motor.sin_offset(1600.0, true);
        self.skeleton
            .additive_rotate_joint(JointId::Spine, 0.04 * spine_x, 0.0, 0.0);
        self.skeleton
            .additive_rotate_joint(JointId::Neck, 0.06 * neck_x, 0.03 * neck_y, 0.0);
    }
}
