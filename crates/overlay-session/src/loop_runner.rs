//! 叠加控制环
//!
//! 握手成功后的固定周期交换：每周期读测量状态、按接收倍率
//! 轮询外部命令（零阶保持补位）、按控制律计算命令并下发、回传
//! 反馈。使用绝对时间锚点机制消除累积漂移（`next_tick += period`，
//! 超时告警并重置锚点）。
//!
//! 周期内严格顺序：读状态 -> 计算 -> 下发 -> 反馈；周期之间严格
//! 串行，第 n 周期下发完成（或控制环已退出）之前第 n+1 周期不会
//! 开始读取。取消信号只在周期边界检查，从不打断进行中的周期。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{error, info, warn};

use overlay_core::{CommandMode, ControlMode, SessionConfig};

use crate::connection::{Connection, ConnectionError};
use crate::executor::MotionExecutor;
use crate::law::{ControlLaw, HeldCommand};
use crate::packet::FeedbackPacket;

// ==================== 协作式取消 ====================

/// 取消句柄（调用方持有）
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        StopHandle { flag: Arc::new(AtomicBool::new(false)) }
    }

    /// 请求停止
    ///
    /// 只阻止下一个周期开始，不打断进行中的周期。
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// 派生控制环侧的令牌
    pub fn token(&self) -> StopToken {
        StopToken { flag: self.flag.clone() }
    }
}

/// 取消令牌（控制环每周期边界检查一次）
#[derive(Debug, Clone)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// 永不触发的令牌
    pub fn never() -> Self {
        StopToken { flag: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

// ==================== 结果 ====================

/// 控制环终止原因
///
/// 对该会话而言是终止性的；原因原样上报调用方，从不降级。
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// 调用方通过取消令牌正常停止
    StoppedByCaller,
    /// 对端断开
    PeerDisconnected,
    /// 机械臂执行器拒绝命令（安全限位、命令过期等）
    ManipulatorRejectedCommand(String),
    /// 其他故障（连接 IO/编解码错误等）
    FaultDetected(String),
}

/// 运行固定周期叠加控制环（阻塞）
///
/// 每周期（period = `config.cycle_period`）：
/// 1. 周期边界检查取消令牌
/// 2. 读取测量状态
/// 3. 接收倍率边界上轮询外部命令；新命令总是取代保持值
///    （新鲜度严格优先于连续性），否则零阶保持；命令模式或
///    载荷类型与会话协定矛盾的报文按 `FaultDetected` 退出，
///    保持命令不被覆盖
/// 4. 按控制律计算本周期命令并交给执行器；拒绝即在本周期退出，
///    不再下发任何后续命令
/// 5. 回传反馈（每周期一条）
///
/// 一个周期要么完整地计算并下发，要么控制环在此之前退出；
/// 不存在部分生效的周期。
pub fn run<C, E>(
    connection: &mut C,
    executor: &mut E,
    mode: &ControlMode,
    command_mode: CommandMode,
    config: &SessionConfig,
    stop: &StopToken,
) -> LoopOutcome
where
    C: Connection,
    E: MotionExecutor,
{
    let period = config.cycle_period;
    // 配置校验保证 >= 1；直接调用方传入未校验配置时兜底
    let multiplier = u64::from(config.receive_multiplier).max(1);

    let mut law = ControlLaw::new(mode.clone(), command_mode);
    let mut held = HeldCommand::None;
    let mut period_index: u64 = 0;

    info!(
        cycle_period_ms = period.as_millis() as u64,
        receive_multiplier = multiplier,
        "overlay control loop started"
    );

    // 绝对时间锚点：消除累积漂移
    let mut next_tick = Instant::now();

    loop {
        // 1. 取消只在周期边界生效
        if stop.is_stopped() {
            info!(cycles = period_index, "overlay control loop stopped by caller");
            return LoopOutcome::StoppedByCaller;
        }

        next_tick += period;

        // 2. 读取测量状态
        let measured = executor.current_state();

        // 3. 接收倍率边界：轮询外部命令，新命令总是胜出
        if period_index % multiplier == 0 {
            match connection.try_recv_command() {
                Ok(Some(packet)) => {
                    // 违反会话协定的报文是故障，不做静默重解释，
                    // 也绝不覆盖仍然有效的保持命令
                    if packet.command_mode != command_mode {
                        let reason = format!(
                            "peer command mode {:?} contradicts negotiated {:?}",
                            packet.command_mode, command_mode
                        );
                        error!(cycle = period_index, reason = %reason, "protocol fault");
                        return LoopOutcome::FaultDetected(reason);
                    }
                    if !packet.command.fits(mode) {
                        let reason =
                            "peer command payload does not fit active control mode".to_string();
                        error!(cycle = period_index, reason = %reason, "protocol fault");
                        return LoopOutcome::FaultDetected(reason);
                    }
                    held.supersede(packet.command);
                },
                Ok(None) => {}, // 零阶保持
                Err(ConnectionError::PeerDisconnected) => {
                    warn!(cycle = period_index, "peer disconnected");
                    return LoopOutcome::PeerDisconnected;
                },
                Err(e) => {
                    error!(cycle = period_index, error = %e, "connection fault");
                    return LoopOutcome::FaultDetected(e.to_string());
                },
            }
        }

        // 4. 计算并下发
        let command = law.compute(&measured, &held);
        if let Err(rejected) = executor.apply(&command) {
            error!(cycle = period_index, reason = %rejected.reason, "command rejected, aborting");
            return LoopOutcome::ManipulatorRejectedCommand(rejected.reason);
        }

        // 5. 回传反馈
        let feedback = FeedbackPacket { period_index, state: measured };
        match connection.send_feedback(&feedback) {
            Ok(()) => {},
            Err(ConnectionError::PeerDisconnected) => {
                warn!(cycle = period_index, "peer disconnected on feedback send");
                return LoopOutcome::PeerDisconnected;
            },
            Err(e) => {
                error!(cycle = period_index, error = %e, "feedback send fault");
                return LoopOutcome::FaultDetected(e.to_string());
            },
        }

        // 6. 睡眠到下一个锚点（自动扣除本周期耗时）
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            // 任务超时（Overrun）：重置锚点避免后续追赶挤压周期
            warn!(
                cycle = period_index,
                late_by = ?now.duration_since(next_tick),
                "control loop overrun, resetting anchor"
            );
            next_tick = now;
        }

        period_index += 1;
    }
}
