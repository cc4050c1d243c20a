//! 配置层错误类型定义

use std::time::Duration;
use thiserror::Error;

use crate::types::CartAxis;

/// 配置错误
///
/// 所有配置错误都在会话建立之前被拒绝；任何网络资源打开之后
/// 不会再出现此类错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 刚度为负或非有限值
    #[error("negative or non-finite stiffness {value} (joint/axis index {index})")]
    NegativeStiffness { index: usize, value: f64 },

    /// 阻尼超出 [0, 1.5] 约定范围（拒绝而非钳位，避免掩盖配置错误）
    #[error("damping {value} out of range [0, 1.5] (joint/axis index {index})")]
    DampingOutOfRange { index: usize, value: f64 },

    /// 笛卡尔轴参数缺失（NaN 视为缺失）
    #[error("missing parameter for cartesian axis {axis:?}")]
    MissingAxisParameter { axis: CartAxis },

    /// 命令模式与描述符不一致
    ///
    /// 典型情形：Torque 命令模式下阻抗阻尼非零（外部力矩命令
    /// 自带阻尼环，本地阻尼必须为零）。
    #[error("inconsistent command mode: {0}")]
    InconsistentCommandMode(String),

    /// 接收倍率必须 >= 1
    #[error("invalid receive multiplier {0} (must be >= 1)")]
    InvalidReceiveMultiplier(u32),

    /// 控制周期必须为正
    #[error("cycle period must be positive")]
    InvalidCyclePeriod,

    /// 命令新鲜度预算超限
    ///
    /// `cycle_period * receive_multiplier` 不得超过机械臂控制器
    /// 自身的命令过期容限，否则控制器会在会话中途自行中止。
    #[error("command staleness budget {budget:?} exceeds manipulator tolerance {tolerance:?}")]
    StalenessBudgetExceeded { budget: Duration, tolerance: Duration },
}
