//! 控制模式描述符
//!
//! 选择三种叠加控制律之一并携带其数值参数：
//! - **Position**: 纯位置跟踪，无阻抗参数
//! - **JointImpedance**: 关节空间弹簧-阻尼（每关节独立刚度/阻尼）
//! - **CartesianImpedance**: 任务空间弹簧-阻尼 + 零空间正则化
//!
//! 描述符是纯数据：除 [`ControlMode::validate`] 外没有任何行为，
//! 也不依赖网络或定时设施。会话存续期内描述符不可变，参数
//! 变更要求拆除并重建会话。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CartAxis, JOINT_COUNT, JointArray};

/// 阻尼约定上限
///
/// 阻尼比通常取 [0, 1]，按约定放宽到 1.5；超出者直接拒绝，
/// 不做静默钳位。
pub const DAMPING_MAX: f64 = 1.5;

/// 单轴阻抗增益
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisGains {
    /// 刚度（平移 N/m，旋转 N·m/rad）
    pub stiffness: f64,
    /// 阻尼比
    pub damping: f64,
}

/// 零空间增益
///
/// 冗余机械臂在不改变末端位姿的关节运动集合内的正则化参数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullspaceGains {
    /// 零空间刚度（>= 0）
    pub stiffness: f64,
    /// 零空间阻尼比
    pub damping: f64,
}

/// 外部命令流允许携带的载荷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    /// 外部叠加力矩命令
    ///
    /// 外部力矩命令自行闭合阻尼环，因此阻抗模式下本地阻尼
    /// 必须为零。
    Torque,
    /// 外部位置目标命令
    Position,
}

/// 控制模式描述符
///
/// 同一时刻只有一个 `kind` 生效；未用模式的参数不存在于类型中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ControlMode {
    /// 纯位置控制
    Position,
    /// 关节阻抗控制
    JointImpedance {
        /// 每关节刚度（N·m/rad，>= 0）
        stiffness: JointArray,
        /// 每关节阻尼比（[0, 1.5]）
        damping: JointArray,
    },
    /// 笛卡尔阻抗控制
    CartesianImpedance {
        /// 六轴增益，按 X, Y, Z, A, B, C 排序
        axes: [AxisGains; 6],
        /// 零空间正则化增益
        nullspace: NullspaceGains,
    },
}

impl ControlMode {
    /// 统一刚度的关节阻抗预设
    ///
    /// 所有关节取同一刚度，阻尼比取常用值 0.7。
    pub fn joint_impedance_uniform(stiffness: f64) -> Self {
        ControlMode::JointImpedance {
            stiffness: JointArray::uniform(stiffness),
            damping: JointArray::uniform(0.7),
        }
    }

    /// 平移/旋转分组的笛卡尔阻抗预设
    ///
    /// 平移三轴共享一组刚度/阻尼，旋转三轴共享另一组；
    /// 零空间刚度为 0，仅保留零空间阻尼。
    pub fn cartesian_impedance_preset(
        stiffness_trans: f64,
        stiffness_rot: f64,
        damping_trans: f64,
        damping_rot: f64,
        nullspace_damping: f64,
    ) -> Self {
        let mut axes = [AxisGains { stiffness: 0.0, damping: 0.0 }; 6];
        for axis in CartAxis::ALL {
            axes[axis.index()] = if axis.is_translational() {
                AxisGains { stiffness: stiffness_trans, damping: damping_trans }
            } else {
                AxisGains { stiffness: stiffness_rot, damping: damping_rot }
            };
        }
        ControlMode::CartesianImpedance {
            axes,
            nullspace: NullspaceGains { stiffness: 0.0, damping: nullspace_damping },
        }
    }

    /// 生成阻尼清零副本（Torque 命令模式要求）
    pub fn with_zero_damping(&self) -> Self {
        match self {
            ControlMode::Position => ControlMode::Position,
            ControlMode::JointImpedance { stiffness, .. } => ControlMode::JointImpedance {
                stiffness: *stiffness,
                damping: JointArray::ZERO,
            },
            ControlMode::CartesianImpedance { axes, nullspace } => {
                let mut axes = *axes;
                for g in axes.iter_mut() {
                    g.damping = 0.0;
                }
                ControlMode::CartesianImpedance {
                    axes,
                    nullspace: NullspaceGains { stiffness: nullspace.stiffness, damping: 0.0 },
                }
            },
        }
    }

    /// 校验描述符与命令模式的组合
    ///
    /// 检查项：
    /// - 刚度有限且非负
    /// - 阻尼有限且在 [0, 1.5] 内（拒绝而非钳位）
    /// - 笛卡尔轴参数齐备（NaN 视为缺失）
    /// - Torque 命令模式下阻抗阻尼必须全零
    ///
    /// 校验是纯函数，失败时不产生任何部分生效的配置。
    pub fn validate(&self, command_mode: CommandMode) -> Result<(), ConfigError> {
        match self {
            ControlMode::Position => Ok(()),
            ControlMode::JointImpedance { stiffness, damping } => {
                for i in 0..JOINT_COUNT {
                    check_stiffness(i, stiffness[i])?;
                    check_damping(i, damping[i])?;
                }
                if command_mode == CommandMode::Torque {
                    check_torque_damping_zero(damping.iter().copied())?;
                }
                Ok(())
            },
            ControlMode::CartesianImpedance { axes, nullspace } => {
                for axis in CartAxis::ALL {
                    let gains = &axes[axis.index()];
                    if gains.stiffness.is_nan() || gains.damping.is_nan() {
                        return Err(ConfigError::MissingAxisParameter { axis });
                    }
                    check_stiffness(axis.index(), gains.stiffness)?;
                    check_damping(axis.index(), gains.damping)?;
                }
                // 零空间增益沿用同一套界限（下标 6 = 零空间）
                check_stiffness(6, nullspace.stiffness)?;
                check_damping(6, nullspace.damping)?;
                if command_mode == CommandMode::Torque {
                    let all = axes.iter().map(|g| g.damping).chain([nullspace.damping]);
                    check_torque_damping_zero(all)?;
                }
                Ok(())
            },
        }
    }
}

fn check_stiffness(index: usize, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::NegativeStiffness { index, value });
    }
    Ok(())
}

fn check_damping(index: usize, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=DAMPING_MAX).contains(&value) {
        return Err(ConfigError::DampingOutOfRange { index, value });
    }
    Ok(())
}

fn check_torque_damping_zero(damping: impl IntoIterator<Item = f64>) -> Result<(), ConfigError> {
    if damping.into_iter().any(|d| d != 0.0) {
        return Err(ConfigError::InconsistentCommandMode(
            "nonzero impedance damping under torque command mode (external torque \
             closes its own damping loop)"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Position 模式在两种命令模式下均合法
    #[test]
    fn test_position_valid_for_both_command_modes() {
        assert!(ControlMode::Position.validate(CommandMode::Position).is_ok());
        assert!(ControlMode::Position.validate(CommandMode::Torque).is_ok());
    }

    #[test]
    fn test_joint_impedance_preset_valid_under_position() {
        let mode = ControlMode::joint_impedance_uniform(400.0);
        assert!(mode.validate(CommandMode::Position).is_ok());
    }

    /// Torque 命令模式下非零阻尼必须被拒绝，不允许静默回退
    #[test]
    fn test_joint_impedance_nonzero_damping_rejected_under_torque() {
        let mode = ControlMode::joint_impedance_uniform(400.0);
        let err = mode.validate(CommandMode::Torque).unwrap_err();
        assert!(matches!(err, ConfigError::InconsistentCommandMode(_)));
    }

    #[test]
    fn test_with_zero_damping_makes_torque_mode_valid() {
        let mode = ControlMode::joint_impedance_uniform(400.0).with_zero_damping();
        assert!(mode.validate(CommandMode::Torque).is_ok());
    }

    #[test]
    fn test_negative_stiffness_rejected() {
        let mut stiffness = JointArray::uniform(400.0);
        stiffness[2] = -1.0;
        let mode = ControlMode::JointImpedance { stiffness, damping: JointArray::ZERO };
        let err = mode.validate(CommandMode::Position).unwrap_err();
        assert_eq!(err, ConfigError::NegativeStiffness { index: 2, value: -1.0 });
    }

    #[test]
    fn test_infinite_stiffness_rejected() {
        let mut stiffness = JointArray::uniform(400.0);
        stiffness[0] = f64::INFINITY;
        let mode = ControlMode::JointImpedance { stiffness, damping: JointArray::ZERO };
        assert!(matches!(
            mode.validate(CommandMode::Position),
            Err(ConfigError::NegativeStiffness { index: 0, .. })
        ));
    }

    #[test]
    fn test_damping_above_convention_limit_rejected() {
        let mode = ControlMode::JointImpedance {
            stiffness: JointArray::uniform(100.0),
            damping: JointArray::uniform(1.6),
        };
        assert!(matches!(
            mode.validate(CommandMode::Position),
            Err(ConfigError::DampingOutOfRange { .. })
        ));
    }

    #[test]
    fn test_cartesian_preset_valid_under_position() {
        let mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        assert!(mode.validate(CommandMode::Position).is_ok());
    }

    /// 笛卡尔预设带非零阻尼，Torque 模式下同样拒绝
    #[test]
    fn test_cartesian_preset_rejected_under_torque() {
        let mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        assert!(matches!(
            mode.validate(CommandMode::Torque),
            Err(ConfigError::InconsistentCommandMode(_))
        ));
    }

    #[test]
    fn test_cartesian_nan_axis_reported_as_missing() {
        let mut mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        if let ControlMode::CartesianImpedance { axes, .. } = &mut mode {
            axes[CartAxis::B.index()].stiffness = f64::NAN;
        }
        assert_eq!(
            mode.validate(CommandMode::Position),
            Err(ConfigError::MissingAxisParameter { axis: CartAxis::B })
        );
    }

    #[test]
    fn test_cartesian_per_axis_override_supported() {
        let mut mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        if let ControlMode::CartesianImpedance { axes, .. } = &mut mode {
            // Z 轴单独放软
            axes[CartAxis::Z.index()] = AxisGains { stiffness: 50.0, damping: 1.0 };
        }
        assert!(mode.validate(CommandMode::Position).is_ok());
    }

    #[test]
    fn test_nullspace_negative_stiffness_rejected() {
        let mut mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        if let ControlMode::CartesianImpedance { nullspace, .. } = &mut mode {
            nullspace.stiffness = -5.0;
        }
        assert!(matches!(
            mode.validate(CommandMode::Position),
            Err(ConfigError::NegativeStiffness { .. })
        ));
    }
}
