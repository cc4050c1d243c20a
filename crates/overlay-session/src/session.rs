//! 会话生命周期状态机
//!
//! `Idle -> Connecting -> Ready -> Active -> Closing -> Closed`；
//! 任意状态可因不可恢复错误进入 `Failed(reason)`。`Closed` 与
//! `Failed` 是终态：[`OverlaySession::run`] 按值消耗状态机，新会话
//! 必须构造新实例。
//!
//! 状态机是唯一允许调用 `connect` / `run` / `close` 的组件；连接
//! 资源在 `Connecting` 获取，并保证在上报终态之前、每条离开
//! `Active` 的路径上（包括故障路径）恰好关闭一次。
//!
//! 其他组件通过 [`StateWatch`] 无锁读取当前状态，但从不直接
//! 修改它。

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{error, info};

use overlay_core::{CommandMode, ConfigError, ControlMode, SessionConfig};

use crate::connection::Connection;
use crate::error::SessionError;
use crate::executor::MotionExecutor;
use crate::handshake;
use crate::loop_runner::{self, LoopOutcome, StopToken};

/// 会话生命周期标签
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// 已构造，尚未连接
    Idle,
    /// 握手进行中
    Connecting,
    /// 握手成功，等待进入命令交换
    Ready,
    /// 控制环运行中
    Active,
    /// 控制环已退出，连接拆除中
    Closing,
    /// 正常终态
    Closed,
    /// 失败终态
    Failed(String),
}

/// 状态观察器
///
/// 廉价克隆；读取的是状态机发布的无锁快照。
#[derive(Clone)]
pub struct StateWatch {
    inner: Arc<ArcSwap<SessionState>>,
}

impl StateWatch {
    /// 当前状态快照
    pub fn get(&self) -> SessionState {
        SessionState::clone(&self.inner.load())
    }
}

/// 叠加控制会话
///
/// 每个会话持有一份不可变的配置与描述符；模式或参数变更要求
/// 拆除并重建会话，控制律绝不会在周期中途观察到不一致的参数。
#[derive(Debug)]
pub struct OverlaySession {
    config: SessionConfig,
    mode: ControlMode,
    command_mode: CommandMode,
    state: Arc<ArcSwap<SessionState>>,
}

impl OverlaySession {
    /// 构造新会话（`Idle`）
    ///
    /// 描述符与配置在此一次性校验；任何网络资源打开之前，
    /// 无效配置即被拒绝。
    pub fn new(
        config: SessionConfig,
        mode: ControlMode,
        command_mode: CommandMode,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        mode.validate(command_mode)?;
        Ok(OverlaySession {
            config,
            mode,
            command_mode,
            state: Arc::new(ArcSwap::from_pointee(SessionState::Idle)),
        })
    }

    /// 获取状态观察器
    pub fn watch(&self) -> StateWatch {
        StateWatch { inner: self.state.clone() }
    }

    /// 会话配置
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn publish(&self, state: SessionState) {
        self.state.store(Arc::new(state));
    }

    /// 运行完整会话：握手、控制环、拆除（阻塞）
    ///
    /// 握手失败发布 `Failed` 并返回错误；控制环的终止原因原样
    /// 通过 [`LoopOutcome`] 上报，从不降级。
    pub fn run<E>(self, executor: &mut E, stop: StopToken) -> Result<LoopOutcome, SessionError>
    where
        E: MotionExecutor,
    {
        self.publish(SessionState::Connecting);
        let connection = match handshake::connect(&self.config) {
            Ok(conn) => conn,
            Err(e) => {
                // 失败关闭：握手未完成的连接从不获得运动授权
                self.publish(SessionState::Failed(e.to_string()));
                return Err(SessionError::Handshake(e));
            },
        };
        self.publish(SessionState::Ready);
        self.run_with_connection(connection, executor, stop)
    }

    /// 在已建立的连接上运行会话（跳过握手）
    ///
    /// 供自定义传输的宿主使用；连接所有权移交状态机，`close()`
    /// 在每条退出路径上恰好调用一次。
    pub fn run_with_connection<C, E>(
        self,
        mut connection: C,
        executor: &mut E,
        stop: StopToken,
    ) -> Result<LoopOutcome, SessionError>
    where
        C: Connection,
        E: MotionExecutor,
    {
        self.publish(SessionState::Active);
        let outcome = loop_runner::run(
            &mut connection,
            executor,
            &self.mode,
            self.command_mode,
            &self.config,
            &stop,
        );

        // 每条离开 Active 的路径都经过这里：恰好一次 close
        self.publish(SessionState::Closing);
        connection.close();

        match &outcome {
            LoopOutcome::StoppedByCaller | LoopOutcome::PeerDisconnected => {
                info!(outcome = ?outcome, "session closed");
                self.publish(SessionState::Closed);
            },
            LoopOutcome::ManipulatorRejectedCommand(reason)
            | LoopOutcome::FaultDetected(reason) => {
                error!(reason = %reason, "session failed");
                self.publish(SessionState::Failed(reason.clone()));
            },
        }
        Ok(outcome)
    }
}
