//! 表情叠加管理器
//!
//! 状态机：Inactive → Activating → Active → Deactivating → Inactive。
//! 激活/停用只改每个参数的目标值，实际数值由 tick() 逐帧向目标
//! 推进一个固定步长；停用后所有参数都回到默认值的预设才会被移出
//! 激活集合。

use std::collections::HashMap;

use super::{ExpressionParam, ExpressionPreset};

/// 每帧插值步长（固定值，不随帧率缩放）
pub const DEFAULT_EXPRESSION_STEP: f32 = 0.05;

/// 每个模型一份的表情叠加状态
pub struct ExpressionOverlay {
    presets: HashMap<String, Vec<ExpressionParam>>,
    active: Vec<String>,
    defaults: HashMap<String, f32>,
    desired: HashMap<String, f32>,
    current: HashMap<String, f32>,
    step: f32,
}

impl ExpressionOverlay {
    pub fn new(presets: Vec<ExpressionPreset>) -> Self {
        Self::with_step(presets, DEFAULT_EXPRESSION_STEP)
    }

    /// 指定步长；需要帧率无关插值的调用方可以自行按帧时长换算
    pub fn with_step(presets: Vec<ExpressionPreset>, step: f32) -> Self {
        let mut overlay = Self {
            presets: presets
                .into_iter()
                .map(|preset| (preset.name, preset.params))
                .collect(),
            active: Vec::new(),
            defaults: HashMap::new(),
            desired: HashMap::new(),
            current: HashMap::new(),
            step,
        };
        overlay.assign_defaults(|_| None);
        overlay
    }

    /// 从模型读取各参数的默认值；未提供的参数默认为 0
    ///
    /// 同一参数出现在多个预设里时按（预设, 参数）分别记账。
    pub fn assign_defaults(&mut self, mut lookup: impl FnMut(&str) -> Option<f32>) {
        for (name, params) in &self.presets {
            for param in params {
                let key = Self::key(name, &param.id);
                let default = lookup(&param.id).unwrap_or(0.0);
                self.defaults.insert(key.clone(), default);
                self.desired.insert(key.clone(), default);
                self.current.insert(key, default);
            }
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn active(&self) -> &[String] {
        &self.active
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|active| active == name)
    }

    /// 激活给定集合：与当前激活集合取对称差 ——
    /// 退出的成员目标值重置为默认值（渐变回落由 tick 完成），
    /// 新进成员目标值设为预设给定值。传当前集合本身是幂等的。
    pub fn activate_set(&mut self, names: &[&str]) {
        let leaving: Vec<String> = self
            .active
            .iter()
            .filter(|active| !names.contains(&active.as_str()))
            .cloned()
            .collect();
        for name in leaving {
            if let Some(params) = self.presets.get(&name) {
                for param in params {
                    let key = Self::key(&name, &param.id);
                    if let Some(&default) = self.defaults.get(&key) {
                        self.desired.insert(key, default);
                    }
                }
            }
        }

        for name in names {
            if self.is_active(name) {
                continue;
            }
            // 不在预设表里的名称静默忽略
            let Some(params) = self.presets.get(*name) else {
                continue;
            };
            for param in params {
                self.desired.insert(Self::key(name, &param.id), param.value);
            }
            self.active.push((*name).to_string());
        }
    }

    /// 逐帧推进：每个激活预设的参数向目标值移动一个步长，
    /// min/max 夹紧保证不越过目标；每个参数的最新值通过回调
    /// 写给调用方（morph 通道或模型参数表）。
    ///
    /// 停用后全部参数都停在默认值的预设会被移出激活集合。
    pub fn tick(&mut self, mut apply: impl FnMut(&str, f32)) {
        if self.active.is_empty() {
            return;
        }

        let mut settled = Vec::new();
        for name in &self.active {
            let Some(params) = self.presets.get(name) else {
                continue;
            };
            let mut all_at_default = true;
            for param in params {
                let key = Self::key(name, &param.id);
                let current = self.current.get(&key).copied().unwrap_or(0.0);
                let desired = self.desired.get(&key).copied().unwrap_or(0.0);
                let default = self.defaults.get(&key).copied().unwrap_or(0.0);

                let next = if desired > current {
                    (current + self.step).min(desired)
                } else if desired < current {
                    (current - self.step).max(desired)
                } else {
                    current
                };

                apply(&param.id, next);
                self.current.insert(key, next);
                if next != default {
                    all_at_default = false;
                }
            }
            if all_at_default {
                settled.push(name.clone());
            }
        }

        for name in settled {
            self.active.retain(|active| active != &name);
        }
    }

    fn key(preset: &str, param: &str) -> String {
        format!("{}{}", preset, param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn happy_preset() -> Vec<ExpressionPreset> {
        vec![
            ExpressionPreset::new("happy", vec![ExpressionParam::new("browUp", 0.8)]),
            ExpressionPreset::new(
                "angry",
                vec![
                    ExpressionParam::new("browUp", 0.25),
                    ExpressionParam::new("mouthFrown", 0.5),
                ],
            ),
        ]
    }

    /// 步长取 0.25 让推进序列在二进制浮点下精确可数
    fn overlay() -> ExpressionOverlay {
        ExpressionOverlay::with_step(happy_preset(), 0.25)
    }

    #[test]
    fn test_activation_steps_toward_target() {
        let mut overlay = overlay();
        overlay.activate_set(&["happy"]);

        let mut last = 0.0;
        // ceil(0.8 / 0.25) = 4 帧到达目标
        for _ in 0..4 {
            overlay.tick(|_, value| last = value);
        }
        assert_eq!(last, 0.8);
        assert!(overlay.is_active("happy"));
    }

    #[test]
    fn test_step_never_overshoots() {
        let mut overlay = overlay();
        overlay.activate_set(&["happy"]);
        let mut previous = 0.0;
        for _ in 0..10 {
            let mut value = previous;
            overlay.tick(|_, v| value = v);
            assert!(value - previous <= 0.25 + f32::EPSILON);
            assert!(value <= 0.8);
            previous = value;
        }
        assert_eq!(previous, 0.8);
    }

    #[test]
    fn test_activate_same_set_is_idempotent() {
        let mut overlay = overlay();
        overlay.activate_set(&["happy"]);
        overlay.tick(|_, _| {});
        let desired_before = overlay.desired.clone();
        overlay.activate_set(&["happy"]);
        assert_eq!(overlay.desired, desired_before);
        assert_eq!(overlay.active().len(), 1);
    }

    #[test]
    fn test_round_trip_settles_and_prunes() {
        let mut overlay = overlay();
        overlay.activate_set(&["happy"]);
        for _ in 0..4 {
            overlay.tick(|_, _| {});
        }

        overlay.activate_set(&[]);
        // 停用后仍在激活集合里渐变回落
        assert!(overlay.is_active("happy"));
        let mut last = f32::NAN;
        for _ in 0..4 {
            overlay.tick(|_, value| last = value);
        }
        // ceil(0.8 / 0.25) = 4 帧精确回到默认值并被移出
        assert_eq!(last, 0.0);
        assert!(!overlay.is_active("happy"));
    }

    #[test]
    fn test_multi_param_preset_prunes_after_all_settle() {
        let mut overlay = overlay();
        overlay.activate_set(&["angry"]);
        for _ in 0..2 {
            overlay.tick(|_, _| {});
        }
        overlay.activate_set(&[]);
        // browUp 先到默认值，mouthFrown 还在回落，预设不能提前移出
        overlay.tick(|_, _| {});
        assert!(overlay.is_active("angry"));
        for _ in 0..2 {
            overlay.tick(|_, _| {});
        }
        assert!(!overlay.is_active("angry"));
    }

    #[test]
    fn test_unknown_preset_ignored() {
        let mut overlay = overlay();
        overlay.activate_set(&["missing"]);
        assert!(overlay.active().is_empty());
    }

    #[test]
    fn test_defaults_from_lookup() {
        let mut overlay = overlay();
        overlay.assign_defaults(|id| (id == "browUp").then_some(0.5));
        overlay.activate_set(&["happy"]);
        for _ in 0..4 {
            overlay.tick(|_, _| {});
        }
        overlay.activate_set(&[]);
        let mut last = f32::NAN;
        // 0.8 → 0.5 要 ceil(0.3 / 0.25) = 2 帧
        for _ in 0..2 {
            overlay.tick(|_, value| last = value);
        }
        assert_eq!(last, 0.5);
        assert!(!overlay.is_active("happy"));
    }
}
