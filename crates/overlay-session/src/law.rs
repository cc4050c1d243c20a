//! 周期控制律计算
//!
//! 把测量状态 + 当前保持的外部命令变换为本周期的执行器命令：
//! - 位置跟踪：外部位置目标直通
//! - 关节阻抗：`τ_i = k_i (q_ref_i − q_i) − d_i q̇_i`
//! - 笛卡尔阻抗：任务空间弹簧-阻尼力旋量 + 零空间正则化
//!
//! 计算是纯函数式的（不含 IO、不含定时），控制环每周期调用
//! 一次。Torque 命令模式下阻尼增益在构造时即为零（校验保证），
//! 外部力矩直接叠加在回复项上，不会被本地阻尼对抗。

use overlay_core::{CartVec, CommandMode, ControlMode, JointArray};
use tracing::debug;

use crate::executor::{CycleCommand, MeasuredState};
use crate::packet::ExternalCommand;

/// 当前生效的外部命令（零阶保持）
///
/// 两次外部接收之间，最近一条命令原样保持，不衰减也不清零。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeldCommand {
    /// 尚未收到任何外部命令：保持会话起始测量位置
    None,
    /// 保持中的关节命令
    Joints(JointArray),
    /// 保持中的笛卡尔命令
    Cartesian(CartVec),
}

impl HeldCommand {
    /// 用新收到的外部命令替换保持值
    pub fn supersede(&mut self, command: ExternalCommand) {
        *self = match command {
            ExternalCommand::Joints(j) => HeldCommand::Joints(j),
            ExternalCommand::Cartesian(c) => HeldCommand::Cartesian(c),
        };
    }
}

/// 预解析的控制律
pub struct ControlLaw {
    mode: ControlMode,
    command_mode: CommandMode,
    /// 会话起始测量位置（未收到外部命令前的保持目标）
    anchor: Option<JointArray>,
}

impl ControlLaw {
    /// 由已校验的描述符构造
    ///
    /// 调用方（生命周期状态机）保证 `mode.validate(command_mode)`
    /// 已通过；这里不重复校验。
    pub fn new(mode: ControlMode, command_mode: CommandMode) -> Self {
        ControlLaw { mode, command_mode, anchor: None }
    }

    /// 计算本周期命令
    pub fn compute(&mut self, measured: &MeasuredState, held: &HeldCommand) -> CycleCommand {
        // 首周期锚定当前位置，作为未收到外部命令时的保持目标
        let anchor = *self.anchor.get_or_insert_with(|| {
            debug!("anchoring hold target at first measured position");
            measured.joint_positions
        });

        match &self.mode {
            ControlMode::Position => {
                let target = match held {
                    HeldCommand::Joints(q_ref) => *q_ref,
                    _ => anchor,
                };
                CycleCommand::JointPositions(target)
            },
            ControlMode::JointImpedance { stiffness, damping } => {
                let (q_ref, external_torque) = match (self.command_mode, held) {
                    (CommandMode::Position, HeldCommand::Joints(q)) => (*q, JointArray::ZERO),
                    (CommandMode::Torque, HeldCommand::Joints(tau)) => (anchor, *tau),
                    _ => (anchor, JointArray::ZERO),
                };
                let mut torque = JointArray::ZERO;
                for i in 0..overlay_core::JOINT_COUNT {
                    let restoring = stiffness[i] * (q_ref[i] - measured.joint_positions[i])
                        - damping[i] * measured.joint_velocities[i];
                    // Torque 模式：外部力矩叠加在回复项上（阻尼已为零）
                    torque[i] = restoring + external_torque[i];
                }
                CycleCommand::JointTorques(torque)
            },
            ControlMode::CartesianImpedance { axes, nullspace } => {
                let x_ref = match held {
                    HeldCommand::Cartesian(x) => *x,
                    _ => measured.cartesian_pose,
                };
                let mut wrench = CartVec::ZERO;
                for i in 0..6 {
                    wrench.0[i] = axes[i].stiffness * (x_ref.0[i] - measured.cartesian_pose.0[i])
                        - axes[i].damping * measured.cartesian_velocity.0[i];
                }
                // 零空间：朝锚定位形回拉并抑制关节速度
                let mut nullspace_torque = JointArray::ZERO;
                for i in 0..overlay_core::JOINT_COUNT {
                    nullspace_torque[i] = nullspace.stiffness
                        * (anchor[i] - measured.joint_positions[i])
                        - nullspace.damping * measured.joint_velocities[i];
                }
                CycleCommand::CartesianWrench { wrench, nullspace_torque }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::{CartAxis, JOINT_COUNT};

    fn measured(q: f64, qd: f64) -> MeasuredState {
        MeasuredState {
            joint_positions: JointArray::uniform(q),
            joint_velocities: JointArray::uniform(qd),
            cartesian_pose: CartVec::ZERO,
            cartesian_velocity: CartVec::ZERO,
        }
    }

    /// τ = K (q_ref − q) − D q̇
    #[test]
    fn test_joint_impedance_spring_damper() {
        let mode = ControlMode::JointImpedance {
            stiffness: JointArray::uniform(100.0),
            damping: JointArray::uniform(0.5),
        };
        let mut law = ControlLaw::new(mode, CommandMode::Position);
        let state = measured(0.2, 0.1);
        let held = HeldCommand::Joints(JointArray::uniform(0.5));
        match law.compute(&state, &held) {
            CycleCommand::JointTorques(tau) => {
                // 100 * (0.5 - 0.2) - 0.5 * 0.1 = 29.95
                for i in 0..JOINT_COUNT {
                    assert!((tau[i] - 29.95).abs() < 1e-9);
                }
            },
            other => panic!("expected joint torques, got {other:?}"),
        }
    }

    /// Torque 模式：外部力矩叠加在回复项上，阻尼为零不对抗
    #[test]
    fn test_torque_superposition_on_restoring_term() {
        let mode = ControlMode::joint_impedance_uniform(400.0).with_zero_damping();
        let mut law = ControlLaw::new(mode, CommandMode::Torque);
        // 首周期锚定在 q = 0.1
        let state = measured(0.1, 0.3);
        let held = HeldCommand::Joints(JointArray::uniform(2.0));
        match law.compute(&state, &held) {
            CycleCommand::JointTorques(tau) => {
                // 回复项 400 * (0.1 - 0.1) = 0，阻尼为零，输出即外部力矩
                for i in 0..JOINT_COUNT {
                    assert!((tau[i] - 2.0).abs() < 1e-9);
                }
            },
            other => panic!("expected joint torques, got {other:?}"),
        }
    }

    /// 未收到外部命令时保持首周期测量位置
    #[test]
    fn test_anchor_holds_first_measured_position() {
        let mode = ControlMode::Position;
        let mut law = ControlLaw::new(mode, CommandMode::Position);
        let first = measured(0.7, 0.0);
        match law.compute(&first, &HeldCommand::None) {
            CycleCommand::JointPositions(target) => {
                assert_eq!(target, JointArray::uniform(0.7));
            },
            other => panic!("expected joint positions, got {other:?}"),
        }
        // 锚点不随后续测量漂移
        let later = measured(0.9, 0.0);
        match law.compute(&later, &HeldCommand::None) {
            CycleCommand::JointPositions(target) => {
                assert_eq!(target, JointArray::uniform(0.7));
            },
            other => panic!("expected joint positions, got {other:?}"),
        }
    }

    #[test]
    fn test_cartesian_wrench_and_nullspace() {
        let mode = ControlMode::cartesian_impedance_preset(1000.0, 100.0, 0.7, 0.7, 0.7);
        let mut law = ControlLaw::new(mode, CommandMode::Position);
        let mut state = measured(0.0, 0.2);
        state.cartesian_velocity = CartVec::from([0.1; 6]);
        let mut x_ref = CartVec::ZERO;
        x_ref.set(CartAxis::X, 0.01);
        match law.compute(&state, &HeldCommand::Cartesian(x_ref)) {
            CycleCommand::CartesianWrench { wrench, nullspace_torque } => {
                // X: 1000 * 0.01 - 0.7 * 0.1 = 9.93
                assert!((wrench.get(CartAxis::X) - 9.93).abs() < 1e-9);
                // A: 100 * 0 - 0.7 * 0.1 = -0.07
                assert!((wrench.get(CartAxis::A) + 0.07).abs() < 1e-9);
                // 零空间刚度为 0，仅阻尼项：-0.7 * 0.2
                for i in 0..JOINT_COUNT {
                    assert!((nullspace_torque[i] + 0.14).abs() < 1e-9);
                }
            },
            other => panic!("expected cartesian wrench, got {other:?}"),
        }
    }

    #[test]
    fn test_held_command_supersede() {
        let mut held = HeldCommand::None;
        held.supersede(ExternalCommand::Joints(JointArray::uniform(1.0)));
        assert_eq!(held, HeldCommand::Joints(JointArray::uniform(1.0)));
        held.supersede(ExternalCommand::Joints(JointArray::uniform(2.0)));
        assert_eq!(held, HeldCommand::Joints(JointArray::uniform(2.0)));
    }
}
