//! Morph 通道混合系统

mod blender;

pub use blender::{MorphComponent, MorphTargetBlender};
