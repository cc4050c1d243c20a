//! 会话逻辑报文
//!
//! 厂商实时协议的线上字节不在本 crate 范围内；这里定义的是
//! 协议可观察契约对应的逻辑报文（握手、命令、反馈），并用
//! bincode 做自有的替代编码。
//!
//! 节奏约定：
//! - 入站命令最多每 `receive_multiplier` 个周期一条
//! - 出站反馈每个周期一条

use overlay_core::{CartVec, CommandMode, JointArray};
use serde::{Deserialize, Serialize};

use crate::executor::MeasuredState;

/// 握手报文：向对端宣告会话时序
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    /// 控制周期（微秒）
    pub cycle_period_us: u64,
    /// 接收倍率
    pub receive_multiplier: u32,
}

/// 握手应答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HelloReply {
    /// 对端就绪，可以开始命令交换
    Ready,
    /// 对端拒绝本次会话
    Reject { reason: String },
}

/// 外部命令载荷
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExternalCommand {
    /// 关节空间命令（按命令模式解释为位置目标或叠加力矩）
    Joints(JointArray),
    /// 任务空间命令（笛卡尔目标位姿偏移）
    Cartesian(CartVec),
}

impl ExternalCommand {
    /// 载荷类型是否匹配会话的控制模式
    ///
    /// 关节空间载荷服务于 Position / JointImpedance 会话，
    /// 笛卡尔载荷服务于 CartesianImpedance 会话。
    pub fn fits(&self, mode: &overlay_core::ControlMode) -> bool {
        use overlay_core::ControlMode;
        matches!(
            (self, mode),
            (
                ExternalCommand::Joints(_),
                ControlMode::Position | ControlMode::JointImpedance { .. }
            ) | (ExternalCommand::Cartesian(_), ControlMode::CartesianImpedance { .. })
        )
    }
}

/// 入站命令报文
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandPacket {
    /// 对端视角的周期序号
    pub period_index: u64,
    /// 命令载荷
    pub command: ExternalCommand,
    /// 载荷的命令模式（必须与会话协定一致）
    pub command_mode: CommandMode,
}

/// 出站反馈报文（每周期一条）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPacket {
    /// 本地周期序号
    pub period_index: u64,
    /// 本周期的测量状态
    pub state: MeasuredState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_packet_roundtrip() {
        let packet = CommandPacket {
            period_index: 42,
            command: ExternalCommand::Joints(JointArray::uniform(0.5)),
            command_mode: CommandMode::Torque,
        };
        let bytes = bincode::serialize(&packet).unwrap();
        let decoded: CommandPacket = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_hello_reply_reject_carries_reason() {
        let reply = HelloReply::Reject { reason: "busy".to_string() };
        let bytes = bincode::serialize(&reply).unwrap();
        assert_eq!(bincode::deserialize::<HelloReply>(&bytes).unwrap(), reply);
    }
}
