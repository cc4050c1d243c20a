//! Manipulator executor seam
//!
//! The safety-certified trajectory executor and collision monitor live in
//! the manipulator's own controller; this module only defines the boundary
//! the control loop talks to. Both calls must return well within the cycle
//! budget (no blocking IO, no locks held across cycles).

use overlay_core::{CartVec, JointArray};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Measured manipulator state, sampled once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasuredState {
    /// Joint positions (rad)
    pub joint_positions: JointArray,
    /// Joint velocities (rad/s)
    pub joint_velocities: JointArray,
    /// End-effector pose as a six-vector (m / rad, axis order X,Y,Z,A,B,C)
    pub cartesian_pose: CartVec,
    /// End-effector velocity six-vector
    pub cartesian_velocity: CartVec,
}

impl MeasuredState {
    /// State at rest in the zero configuration.
    pub fn at_rest() -> Self {
        MeasuredState {
            joint_positions: JointArray::ZERO,
            joint_velocities: JointArray::ZERO,
            cartesian_pose: CartVec::ZERO,
            cartesian_velocity: CartVec::ZERO,
        }
    }
}

/// One cycle's fully computed command, handed to the executor atomically.
///
/// A cycle either produces exactly one of these or the loop has already
/// exited; partial cycles are never dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleCommand {
    /// Joint position targets (position tracking law)
    JointPositions(JointArray),
    /// Joint torques (joint impedance law, optionally with superimposed
    /// external torque)
    JointTorques(JointArray),
    /// Task-space wrench plus null-space regularization torque
    /// (Cartesian impedance law; the joint mapping stays inside the
    /// manipulator's own servo)
    CartesianWrench {
        wrench: CartVec,
        nullspace_torque: JointArray,
    },
}

/// Command rejected by the manipulator executor.
///
/// Safety limit hit, command invalidated by a stale link, or any other
/// condition the underlying controller refuses. The loop never retries a
/// rejected command.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("manipulator rejected command: {reason}")]
pub struct CommandRejected {
    pub reason: String,
}

/// Boundary to the manipulator's trajectory executor.
pub trait MotionExecutor {
    /// Read the current measured state. Non-blocking relative to the cycle
    /// budget.
    fn current_state(&mut self) -> MeasuredState;

    /// Apply one cycle's command. Non-blocking relative to the cycle
    /// budget; a rejection terminates the session's control loop.
    fn apply(&mut self, command: &CycleCommand) -> Result<(), CommandRejected>;
}

// ==================== 内置演示执行器 ====================

/// Hold-in-place executor with a trivial first-order servo model.
///
/// Lets a host without vendor hardware exercise the full session path
/// (CLI demo, end-to-end tests). Never rejects a command.
#[derive(Debug, Clone)]
pub struct HoldInPlaceExecutor {
    state: MeasuredState,
    /// Position tracking gain per cycle, in (0, 1]
    tracking_gain: f64,
}

impl Default for HoldInPlaceExecutor {
    fn default() -> Self {
        HoldInPlaceExecutor { state: MeasuredState::at_rest(), tracking_gain: 0.2 }
    }
}

impl HoldInPlaceExecutor {
    pub fn new(initial: MeasuredState) -> Self {
        HoldInPlaceExecutor { state: initial, tracking_gain: 0.2 }
    }
}

impl MotionExecutor for HoldInPlaceExecutor {
    fn current_state(&mut self) -> MeasuredState {
        self.state
    }

    fn apply(&mut self, command: &CycleCommand) -> Result<(), CommandRejected> {
        match command {
            CycleCommand::JointPositions(target) => {
                let gain = self.tracking_gain;
                self.state.joint_positions = self
                    .state
                    .joint_positions
                    .zip_map(target, |q, q_ref| q + gain * (q_ref - q));
            },
            // 力矩和力旋量命令由真实控制器积分；演示模型保持原地
            CycleCommand::JointTorques(_) | CycleCommand::CartesianWrench { .. } => {},
        }
        Ok(())
    }
}
