//! Morph 混合器 - 命名系数到各网格组件权重的 O(k) 扇出
//!
//! 模型可以由多个网格组件组成（眼睑、上唇等），每个组件暴露的
//! BlendShape 通道各不相同。注册时为每个通道名建一次扇出索引，
//! 之后按名称写入只触达暴露该名称的 k 个组件（k 通常是 1~3），
//! 而不是全部组件。

use std::collections::HashMap;

use crate::face::range_transform;

/// 单个网格组件的权重数组与名称索引
#[derive(Clone, Debug, Default)]
pub struct MorphComponent {
    weights: Vec<f32>,
    name_to_index: HashMap<String, usize>,
}

impl MorphComponent {
    fn new(channel_count: usize, name_to_index: HashMap<String, usize>) -> Self {
        Self {
            weights: vec![0.0; channel_count],
            name_to_index,
        }
    }

    /// 权重数组（渲染侧每帧读取）
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn channel_count(&self) -> usize {
        self.weights.len()
    }

    pub fn name_to_index(&self) -> &HashMap<String, usize> {
        &self.name_to_index
    }
}

/// Morph 混合器（MorphTargetCache）
///
/// 每帧只改权重标量；通道扇出索引注册后只读。
pub struct MorphTargetBlender {
    components: Vec<MorphComponent>,
    /// 通道名 → (组件下标, 组件内权重下标)
    channels: HashMap<String, Vec<(usize, usize)>>,
}

impl MorphTargetBlender {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            channels: HashMap::new(),
        }
    }

    /// 注册一个网格组件；模型加载时每个组件调用一次
    ///
    /// 返回组件下标，供宿主回读权重数组。
    pub fn register_component(
        &mut self,
        channel_count: usize,
        name_to_index: HashMap<String, usize>,
    ) -> usize {
        let component_index = self.components.len();
        for (name, &index) in &name_to_index {
            if index >= channel_count {
                log::warn!(
                    "morph channel '{}' index {} out of range ({} channels), skipped",
                    name,
                    index,
                    channel_count
                );
                continue;
            }
            self.channels
                .entry(name.clone())
                .or_default()
                .push((component_index, index));
        }
        self.components.push(MorphComponent::new(channel_count, name_to_index));
        component_index
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, index: usize) -> Option<&MorphComponent> {
        self.components.get(index)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// 某通道当前权重（取第一个暴露该名称的组件）
    pub fn channel_value(&self, name: &str) -> Option<f32> {
        let &(component, index) = self.channels.get(name)?.first()?;
        Some(self.components[component].weights[index])
    }

    /// 直接设置；未知名称为静默空操作
    pub fn set_value(&mut self, name: &str, value: f32) {
        self.apply(name, |_| value);
    }

    /// 乘法放大当前权重
    pub fn magnify(&mut self, name: &str, factor: f32) {
        self.apply(name, |current| current * factor);
    }

    /// 加法叠加
    pub fn increment(&mut self, name: &str, delta: f32) {
        self.apply(name, |current| current + delta);
    }

    fn apply(&mut self, name: &str, op: impl Fn(f32) -> f32) {
        let Some(slots) = self.channels.get(name) else {
            return;
        };
        for &(component, index) in slots {
            let current = self.components[component].weights[index];
            // 源/目标区间相同，rangeTransform 的实际效果就是 [0,1] 截断
            self.components[component].weights[index] =
                range_transform(0.0, 1.0, 0.0, 1.0, op(current));
        }
    }
}

impl Default for MorphTargetBlender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_component_blender() -> MorphTargetBlender {
        let mut blender = MorphTargetBlender::new();
        blender.register_component(
            8,
            HashMap::from([("jawOpen".to_string(), 3), ("eyeBlink_L".to_string(), 0)]),
        );
        blender.register_component(8, HashMap::from([("jawOpen".to_string(), 7)]));
        blender
    }

    #[test]
    fn test_set_value_fans_out_to_exposing_components() {
        let mut blender = two_component_blender();
        blender.set_value("jawOpen", 0.5);

        let first = blender.component(0).unwrap().weights();
        let second = blender.component(1).unwrap().weights();
        assert_eq!(first[3], 0.5);
        assert_eq!(second[7], 0.5);
        // 其余槽位不动
        for (i, w) in first.iter().enumerate() {
            if i != 3 {
                assert_eq!(*w, 0.0);
            }
        }
        for (i, w) in second.iter().enumerate() {
            if i != 7 {
                assert_eq!(*w, 0.0);
            }
        }
    }

    #[test]
    fn test_unknown_name_is_noop() {
        let mut blender = two_component_blender();
        blender.set_value("tongueOut", 1.0);
        blender.magnify("tongueOut", 3.0);
        blender.increment("tongueOut", 0.2);
        assert!(blender.component(0).unwrap().weights().iter().all(|w| *w == 0.0));
        assert!(blender.component(1).unwrap().weights().iter().all(|w| *w == 0.0));
    }

    #[test]
    fn test_magnify_and_increment_clamp_to_unit() {
        let mut blender = two_component_blender();
        blender.set_value("jawOpen", 0.6);
        blender.magnify("jawOpen", 2.5);
        assert_eq!(blender.channel_value("jawOpen"), Some(1.0));

        blender.set_value("eyeBlink_L", 0.9);
        blender.increment("eyeBlink_L", 0.5);
        assert_eq!(blender.channel_value("eyeBlink_L"), Some(1.0));
        blender.increment("eyeBlink_L", -2.0);
        assert_eq!(blender.channel_value("eyeBlink_L"), Some(0.0));
    }

    #[test]
    fn test_out_of_range_channel_index_skipped() {
        let mut blender = MorphTargetBlender::new();
        blender.register_component(2, HashMap::from([("broken".to_string(), 5)]));
        blender.set_value("broken", 1.0);
        assert!(blender.component(0).unwrap().weights().iter().all(|w| *w == 0.0));
    }
}
