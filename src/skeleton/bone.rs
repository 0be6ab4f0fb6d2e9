//! 骨骼节点

use glam::{Mat4, Quat, Vec3};

use super::JointId;

/// 宿主场景节点描述；注册时一次性传入
///
/// 节点按父先子后排列（parent 下标小于自身下标），树的所有权
/// 留在宿主侧，这里只是一份快照。
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// 是否为骨骼节点；只有骨骼节点参与关节解析
    pub is_bone: bool,
}

impl SceneNode {
    /// 创建骨骼节点描述（单位旋转、单位缩放）
    pub fn bone(name: impl Into<String>, parent: Option<usize>, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            parent,
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            is_bone: true,
        }
    }

    /// 创建普通节点描述（网格、空节点等）
    pub fn plain(name: impl Into<String>, parent: Option<usize>, translation: Vec3) -> Self {
        Self {
            is_bone: false,
            ..Self::bone(name, parent, translation)
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

/// 骨骼节点 - 运行时只允许改写局部旋转
///
/// 平移/缩放保持注册时的绑定值，逐帧更新不会在位移和缩放上
/// 累积漂移。
#[derive(Clone, Debug)]
pub struct BoneNode {
    pub name: String,
    pub joint: Option<JointId>,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,

    // 绑定数据（注册后只读）
    position: Vec3,
    scale: Vec3,
    bind_rotation: Quat,
    bind_local: Mat4,
    bind_world: Mat4,

    // 运行时数据
    rotation: Quat,
    pub(crate) world: Mat4,
}

impl BoneNode {
    pub(crate) fn new(desc: &SceneNode, joint: Option<JointId>, local: Mat4, world: Mat4) -> Self {
        Self {
            name: desc.name.clone(),
            joint,
            parent: desc.parent,
            children: Vec::new(),
            position: desc.translation,
            scale: desc.scale,
            bind_rotation: desc.rotation,
            bind_local: local,
            bind_world: world,
            rotation: desc.rotation,
            world,
        }
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// 绑定平移（注册后不变）
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// 绑定缩放（注册后不变）
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// 当前局部旋转
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// 绑定时的局部旋转
    pub fn bind_rotation(&self) -> Quat {
        self.bind_rotation
    }

    /// 绑定时的局部变换
    pub fn bind_local(&self) -> Mat4 {
        self.bind_local
    }

    /// 绑定时的世界变换
    pub fn bind_world(&self) -> Mat4 {
        self.bind_world
    }

    /// 当前世界变换
    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub(crate) fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// 当前局部变换 = 绑定平移 × 当前旋转 × 绑定缩放
    pub(crate) fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
