//! # Overlay Session
//!
//! 实时叠加控制会话：
//! - 有界握手（[`handshake::connect`]）
//! - 固定周期命令/反馈环（[`loop_runner::run`]）
//! - 会话生命周期状态机（[`session::OverlaySession`]）
//!
//! 机械臂自身的安全控制器始终在底层监督运动；本 crate 只负责
//! 把外部关节/笛卡尔命令按所选控制律叠加到当前运动上。
//!
//! # 典型用法
//!
//! ```rust,no_run
//! use overlay_core::{CommandMode, ControlMode, SessionConfig};
//! use overlay_session::executor::HoldInPlaceExecutor;
//! use overlay_session::loop_runner::StopHandle;
//! use overlay_session::session::OverlaySession;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::new("192.170.10.1:30200".parse()?);
//! let mode = ControlMode::joint_impedance_uniform(400.0).with_zero_damping();
//!
//! let session = OverlaySession::new(config, mode, CommandMode::Torque)?;
//! let stop = StopHandle::new();
//!
//! let mut executor = HoldInPlaceExecutor::default();
//! let outcome = session.run(&mut executor, stop.token())?;
//! println!("session ended: {outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod executor;
pub mod handshake;
pub mod law;
pub mod loop_runner;
pub mod packet;
pub mod session;

pub use connection::{Connection, ConnectionError, UdpConnection};
pub use error::SessionError;
pub use executor::{CommandRejected, CycleCommand, MeasuredState, MotionExecutor};
pub use handshake::HandshakeError;
pub use loop_runner::{LoopOutcome, StopHandle, StopToken};
pub use session::{OverlaySession, SessionState, StateWatch};
