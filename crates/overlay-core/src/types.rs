//! 关节空间与任务空间的基础数组类型
//!
//! 这些类型是纯数据容器，不携带单位标注；语义由使用方决定
//! （关节角为 rad，力矩为 N·m，刚度为 N·m/rad）。

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 机械臂关节数（7 轴冗余构型）
pub const JOINT_COUNT: usize = 7;

/// 关节空间向量
///
/// `[f64; 7]` 的薄包装，提供逐元素运算辅助方法。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointArray(pub [f64; JOINT_COUNT]);

impl JointArray {
    /// 全零向量
    pub const ZERO: JointArray = JointArray([0.0; JOINT_COUNT]);

    /// 所有关节取同一值
    pub fn uniform(value: f64) -> Self {
        JointArray([value; JOINT_COUNT])
    }

    /// 逐元素映射
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = [0.0; JOINT_COUNT];
        for (o, v) in out.iter_mut().zip(self.0.iter()) {
            *o = f(*v);
        }
        JointArray(out)
    }

    /// 与另一向量逐元素合并
    pub fn zip_map(&self, other: &JointArray, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = [0.0; JOINT_COUNT];
        for i in 0..JOINT_COUNT {
            out[i] = f(self.0[i], other.0[i]);
        }
        JointArray(out)
    }

    /// 迭代所有元素
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// 所有元素均有限
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<[f64; JOINT_COUNT]> for JointArray {
    fn from(values: [f64; JOINT_COUNT]) -> Self {
        JointArray(values)
    }
}

impl Index<usize> for JointArray {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for JointArray {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

// ==================== 笛卡尔轴 ====================

/// 笛卡尔自由度
///
/// 平移 X/Y/Z，旋转 A/B/C（绕 Z/Y/X 的欧拉角，沿用机械臂
/// 控制器的轴命名约定）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartAxis {
    X,
    Y,
    Z,
    A,
    B,
    C,
}

impl CartAxis {
    /// 全部六轴，按 X, Y, Z, A, B, C 排序
    pub const ALL: [CartAxis; 6] = [
        CartAxis::X,
        CartAxis::Y,
        CartAxis::Z,
        CartAxis::A,
        CartAxis::B,
        CartAxis::C,
    ];

    /// 是否为平移轴
    pub fn is_translational(&self) -> bool {
        matches!(self, CartAxis::X | CartAxis::Y | CartAxis::Z)
    }

    /// 轴在六维向量中的下标
    pub fn index(&self) -> usize {
        match self {
            CartAxis::X => 0,
            CartAxis::Y => 1,
            CartAxis::Z => 2,
            CartAxis::A => 3,
            CartAxis::B => 4,
            CartAxis::C => 5,
        }
    }
}

/// 任务空间六维向量（位姿误差、速度、力旋量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartVec(pub [f64; 6]);

impl CartVec {
    /// 全零向量
    pub const ZERO: CartVec = CartVec([0.0; 6]);

    /// 按轴取值
    pub fn get(&self, axis: CartAxis) -> f64 {
        self.0[axis.index()]
    }

    /// 按轴赋值
    pub fn set(&mut self, axis: CartAxis, value: f64) {
        self.0[axis.index()] = value;
    }

    /// 逐元素合并
    pub fn zip_map(&self, other: &CartVec, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = [0.0; 6];
        for i in 0..6 {
            out[i] = f(self.0[i], other.0[i]);
        }
        CartVec(out)
    }
}

impl From<[f64; 6]> for CartVec {
    fn from(values: [f64; 6]) -> Self {
        CartVec(values)
    }
}
