//! 参数驱动模型运行时（Live2D 风格）
//!
//! 没有骨骼；同一份面部预测映射到命名参数表（眼开合、嘴形、
//! 头部角度等），表情叠加写的也是这张表。

use std::collections::HashMap;

use glam::Vec2;

use crate::expression::{ExpressionOverlay, ExpressionPreset};
use crate::face::{face_rotation_to_angles, range_transform, KalmanFilter};
use crate::landmark::FacePrediction;

// 头部角度 → 模型角度参数的倍数
const HEAD_YAW_MULTIPLIER: f32 = -200.0;
const HEAD_PITCH_MULTIPLIER: f32 = -400.0;
const HEAD_ROLL_MULTIPLIER: f32 = 200.0;
const BODY_YAW_MULTIPLIER: f32 = -30.0;
// 眼睛睁大的增益
const EYE_WIDE_GAIN: f32 = 7.0;
// 面部位置 → 画面位移
const FACE_MOVE_MULTIPLIER: f32 = 0.65;
const FACE_DEPTH_MULTIPLIER: f32 = 4.0;

/// 参数驱动的模型运行时
pub struct ParametricAvatar {
    params: HashMap<String, f32>,
    defaults: HashMap<String, f32>,
    expressions: ExpressionOverlay,
    head_yaw_filter: KalmanFilter,
    head_pitch_filter: KalmanFilter,
    head_roll_filter: KalmanFilter,
    lip_sync_level: f32,
    /// 模型是否支持睁大眼（参数最大值超过 1 的模型）
    eye_widenable: bool,
    free_move: bool,
    face_position: Vec2,
    face_factor: f32,
}

impl ParametricAvatar {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            defaults: HashMap::new(),
            expressions: ExpressionOverlay::new(Vec::new()),
            // R 为测量噪声，Q 为运动固有噪声
            head_yaw_filter: KalmanFilter::new(0.1, 0.5),
            head_pitch_filter: KalmanFilter::new(0.1, 0.5),
            head_roll_filter: KalmanFilter::new(0.1, 0.5),
            lip_sync_level: 0.0,
            eye_widenable: false,
            free_move: true,
            face_position: Vec2::new(0.5, 0.5),
            face_factor: 0.0,
        }
    }

    /// 注册模型暴露的参数及其默认值；加载时每参数一次
    pub fn register_parameter(&mut self, id: impl Into<String>, default: f32) {
        let id = id.into();
        self.defaults.insert(id.clone(), default);
        self.params.insert(id, default);
    }

    pub fn set_eye_widenable(&mut self, widenable: bool) {
        self.eye_widenable = widenable;
    }

    pub fn set_free_move(&mut self, free_move: bool) {
        self.free_move = free_move;
    }

    /// 加载表情预设；参数默认值取注册时的模型默认值
    pub fn load_expressions(&mut self, presets: Vec<ExpressionPreset>) {
        let mut overlay = ExpressionOverlay::new(presets);
        let defaults = &self.defaults;
        overlay.assign_defaults(|id| defaults.get(id).copied());
        self.expressions = overlay;
    }

    pub fn activate_expressions(&mut self, names: &[&str]) {
        self.expressions.activate_set(names);
    }

    pub fn expressions(&self) -> &ExpressionOverlay {
        &self.expressions
    }

    pub fn update_lip_sync(&mut self, volume: f32) {
        self.lip_sync_level = volume;
    }

    /// 读取参数当前值（渲染侧每帧回读）
    pub fn parameter(&self, id: &str) -> Option<f32> {
        self.params.get(id).copied()
    }

    /// 面部位置（归一化画面坐标）；宿主用来平移画面
    pub fn face_position(&self) -> Vec2 {
        self.face_position
    }

    /// 面部距离系数；宿主用来缩放画面
    pub fn face_factor(&self) -> f32 {
        self.face_factor
    }

    /// 未注册的参数名是静默空操作（模型没有这个参数）
    fn set_parameter(&mut self, id: &str, value: f32) {
        if let Some(slot) = self.params.get_mut(id) {
            *slot = value;
        }
    }

    /// 每帧入口：面部系数映射 → 头部角度 → 表情叠加
    pub fn update_frame(&mut self, face: Option<&FacePrediction>) {
        if let Some(face) = face {
            self.apply_face(face);
        }
        let params = &mut self.params;
        self.expressions.tick(|id, value| {
            if let Some(slot) = params.get_mut(id) {
                *slot = value;
            }
        });
    }

    fn apply_face(&mut self, face: &FacePrediction) {
        let shapes: HashMap<&str, f32> = face
            .blendshapes
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        let get = |name: &str| shapes.get(name).copied().unwrap_or(0.0);
        let clamp01 = |value: f32| range_transform(0.0, 1.0, 0.0, 1.0, value);

        // 眨眼：0..0.5 → 1..0，画面镜像所以左右互换
        let eye_blink_left = range_transform(0.0, 0.5, 1.0, 0.0, get("eyeBlink_R"));
        let eye_blink_right = range_transform(0.0, 0.5, 1.0, 0.0, get("eyeBlink_L"));
        let jaw_open = range_transform(0.0, 0.1, 0.0, 1.0, get("jawOpen"));
        let mouth_pucker = range_transform(0.0, 1.0, 0.0, 0.4, get("mouthPucker"));
        let mouth_funnel = clamp01(get("mouthFunnel"));
        let mouth_lower_down_left = clamp01(get("mouthLowerDown_L"));
        let mouth_lower_down_right = clamp01(get("mouthLowerDown_R"));
        let mouth_smile_left = clamp01(get("mouthSmile_L"));
        let mouth_smile_right = clamp01(get("mouthSmile_R"));
        let mouth_frown_left = clamp01(get("mouthFrown_L"));
        let mouth_frown_right = clamp01(get("mouthFrown_R"));
        let brow_inner_up_left = clamp01(get("browInnerUp_L"));
        let brow_inner_up_right = clamp01(get("browInnerUp_R"));
        let brow_down_left = clamp01(get("browDown_L"));
        let brow_down_right = clamp01(get("browDown_R"));
        let eye_wide_left = clamp01(get("eyeWide_L"));
        let eye_wide_right = clamp01(get("eyeWide_R"));
        let eye_squint_left = clamp01(get("eyeSquint_L"));
        let eye_squint_right = clamp01(get("eyeSquint_R"));
        let eye_look_in_left = clamp01(get("eyeLookIn_L"));
        let eye_look_in_right = clamp01(get("eyeLookIn_R"));
        let eye_look_out_left = clamp01(get("eyeLookOut_L"));
        let eye_look_out_right = clamp01(get("eyeLookOut_R"));
        let eye_look_up_left = clamp01(get("eyeLookUp_L"));
        let eye_look_up_right = clamp01(get("eyeLookUp_R"));
        let eye_look_down_left = clamp01(get("eyeLookDown_L"));
        let eye_look_down_right = clamp01(get("eyeLookDown_R"));

        // 眼睛开合
        if self.eye_widenable {
            self.set_parameter("ParamEyeLOpen", eye_blink_left + EYE_WIDE_GAIN * eye_wide_left);
            self.set_parameter(
                "ParamEyeROpen",
                eye_blink_right + EYE_WIDE_GAIN * eye_wide_right,
            );
        } else {
            self.set_parameter("ParamEyeLOpen", eye_blink_left);
            self.set_parameter("ParamEyeROpen", eye_blink_right);
        }

        // 嘴部开合：多个系数复合，外加音频口型
        let mouth_open_y = jaw_open
            + 0.5 * mouth_pucker
            + 2.0 * mouth_funnel
            + 4.0 * (mouth_lower_down_left + mouth_lower_down_right);
        self.set_parameter("ParamMouthOpenY", mouth_open_y + self.lip_sync_level);

        // 嘴形：撅嘴(-1) / 微笑(+1)
        let mouth_o_shape = (mouth_pucker + mouth_funnel) * 1.35;
        let mouth_deform = mouth_smile_left.max(mouth_smile_right)
            - mouth_frown_left.max(mouth_frown_right)
            - mouth_o_shape;
        self.set_parameter("ParamMouthForm", mouth_deform);

        // 眉毛位置与形状
        self.set_parameter("ParamBrowLY", brow_inner_up_left - brow_down_right);
        self.set_parameter("ParamBrowRY", brow_inner_up_right - brow_down_right);
        self.set_parameter("ParamBrowLForm", -brow_down_left);
        self.set_parameter("ParamBrowRForm", -brow_down_right);

        // 眼笑
        self.set_parameter("ParamEyeLSmile", eye_squint_left);
        self.set_parameter("ParamEyeRSmile", eye_squint_right);

        // 视线
        let iris_x =
            (eye_look_in_left - eye_look_out_left + eye_look_out_right - eye_look_in_right) / 2.0;
        let iris_y =
            (eye_look_up_left - eye_look_down_left + eye_look_up_right - eye_look_down_right) / 2.0;
        self.set_parameter("ParamEyeBallX", iris_x);
        self.set_parameter("ParamEyeBallY", iris_y);

        // 头部角度（卡尔曼平滑）
        let angles = face_rotation_to_angles(face.rotation);
        let yaw = self.head_yaw_filter.filter(angles.yaw);
        let pitch = self.head_pitch_filter.filter(angles.pitch);
        let roll = self.head_roll_filter.filter(angles.roll);
        self.set_parameter("ParamAngleX", HEAD_YAW_MULTIPLIER * yaw);
        self.set_parameter("ParamAngleY", HEAD_PITCH_MULTIPLIER * pitch);
        self.set_parameter("ParamAngleZ", HEAD_ROLL_MULTIPLIER * roll);
        self.set_parameter("ParamBodyAngleX", BODY_YAW_MULTIPLIER * yaw);

        // 面部位置驱动画面平移/缩放
        if self.free_move {
            self.face_position = Vec2::new(
                0.5 - (face.image_position.x - 0.5) * FACE_MOVE_MULTIPLIER,
                0.5 - (face.image_position.y - 0.5) * FACE_MOVE_MULTIPLIER,
            );
            self.face_factor = face.image_scale * FACE_DEPTH_MULTIPLIER - 1.0;
        }
    }
}

impl Default for ParametricAvatar {
    fn default() -> Self {
        Self::new()
    }
}
