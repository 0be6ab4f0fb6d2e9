//! 骨骼重定向 - 关键点到关节旋转的映射

mod body;
mod hand;
mod math;

pub use body::BodyRetargeter;
pub use math::{align_vectors, rotation_from_vector_pair};
