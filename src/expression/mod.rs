//! 表情叠加系统 - 命名多参数预设的激活/停用与逐帧插值

mod overlay;

pub use overlay::{ExpressionOverlay, DEFAULT_EXPRESSION_STEP};

/// 表情参数目标值
#[derive(Clone, Debug)]
pub struct ExpressionParam {
    pub id: String,
    pub value: f32,
}

impl ExpressionParam {
    pub fn new(id: impl Into<String>, value: f32) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// 命名表情预设；每个模型加载一次
#[derive(Clone, Debug)]
pub struct ExpressionPreset {
    pub name: String,
    pub params: Vec<ExpressionParam>,
}

impl ExpressionPreset {
    pub fn new(name: impl Into<String>, params: Vec<ExpressionParam>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}
